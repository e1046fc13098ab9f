//! JSON formatting for query results
//!
//! This module provides JSON formatting with BSON type simplification:
//! - Pretty-printed and compact JSON output
//! - BSON type conversion to plain JSON types
//! - Optional color highlighting for pretty output

use colored_json::prelude::*;
use mongodb::bson::Bson;
use serde::Serialize;
use serde_json::Value;

use crate::error::Result;

/// JSON formatter with pretty printing support
#[derive(Debug, Clone)]
pub struct JsonFormatter {
    /// Enable pretty printing
    pretty: bool,

    /// Indentation width
    indent: usize,

    /// Enable colored output
    use_colors: bool,
}

impl JsonFormatter {
    /// Create a new JSON formatter
    ///
    /// # Arguments
    /// * `pretty` - Enable pretty printing
    /// * `use_colors` - Enable colored output
    /// * `indent` - Indentation width for pretty output
    pub fn new(pretty: bool, use_colors: bool, indent: usize) -> Self {
        Self {
            pretty,
            indent,
            use_colors,
        }
    }

    /// Format BSON items as a JSON array
    pub fn format_items(&self, items: &[Bson]) -> Result<String> {
        let values: Vec<Value> = items.iter().map(simplify).collect();
        self.format_value(&values)
    }

    /// Format one BSON value
    pub fn format_bson(&self, value: &Bson) -> Result<String> {
        self.format_value(&simplify(value))
    }

    /// Serialize any value with this formatter's layout
    pub fn format_value<T: Serialize>(&self, value: &T) -> Result<String> {
        let json = if self.pretty {
            self.to_pretty_string(value)?
        } else {
            serde_json::to_string(value).map_err(|e| e.to_string())?
        };

        // Compact output stays plain for piping
        if self.use_colors && self.pretty {
            Ok(json.to_colored_json_auto().unwrap_or(json))
        } else {
            Ok(json)
        }
    }

    /// Pretty-print with the configured indentation
    fn to_pretty_string<T: Serialize>(&self, value: &T) -> Result<String> {
        let mut buf = Vec::new();
        let indent = " ".repeat(self.indent);
        let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        value.serialize(&mut ser).map_err(|e| e.to_string())?;
        Ok(String::from_utf8(buf).map_err(|e| e.to_string())?)
    }
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self::new(true, false, 2)
    }
}

/// Convert BSON to plain JSON
///
/// ObjectIds and dates become strings, 64-bit integers become numbers.
/// Regexes use the same `$regex`/`$options` shape as parsed literals.
/// Types with no plain JSON form fall back to relaxed extended JSON.
pub fn simplify(value: &Bson) -> Value {
    match value {
        Bson::Null | Bson::Undefined => Value::Null,
        Bson::Boolean(b) => Value::Bool(*b),
        Bson::Int32(n) => Value::from(*n),
        Bson::Int64(n) => Value::from(*n),
        Bson::Double(f) => serde_json::Number::from_f64(*f)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(f.to_string())),
        Bson::String(s) => Value::String(s.clone()),
        Bson::ObjectId(oid) => Value::String(oid.to_hex()),
        Bson::DateTime(dt) => Value::String(
            dt.try_to_rfc3339_string()
                .unwrap_or_else(|_| dt.timestamp_millis().to_string()),
        ),
        Bson::Decimal128(d) => Value::String(d.to_string()),
        Bson::RegularExpression(regex) => serde_json::json!({
            "$regex": regex.pattern,
            "$options": regex.options,
        }),
        Bson::Array(items) => Value::Array(items.iter().map(simplify).collect()),
        Bson::Document(doc) => Value::Object(
            doc.iter()
                .map(|(k, v)| (k.clone(), simplify(v)))
                .collect(),
        ),
        other => other.clone().into_relaxed_extjson(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::{DateTime, doc, oid::ObjectId};

    fn document(doc: mongodb::bson::Document) -> Bson {
        Bson::Document(doc)
    }

    #[test]
    fn test_json_formatter() {
        let formatter = JsonFormatter::new(false, false, 2);
        let result = formatter
            .format_bson(&document(doc! { "name": "test", "value": 42 }))
            .unwrap();
        assert_eq!(result, r#"{"name":"test","value":42}"#);
    }

    #[test]
    fn test_simplified_objectid() {
        let formatter = JsonFormatter::new(true, false, 2);
        let oid = ObjectId::parse_str("65705d84dfc3f3b5094e1f72").unwrap();
        let result = formatter.format_bson(&document(doc! { "_id": oid })).unwrap();
        assert!(result.contains("\"65705d84dfc3f3b5094e1f72\""));
        assert!(!result.contains("$oid"));
    }

    #[test]
    fn test_simplified_datetime_and_long() {
        let formatter = JsonFormatter::new(true, false, 2);
        let doc = doc! {
            "created": DateTime::from_millis(1701862788373),
            "user_id": 1i64,
        };
        let result = formatter.format_bson(&document(doc)).unwrap();
        assert!(result.contains("\"created\": \"2023-12-06"));
        assert!(result.contains("\"user_id\": 1"));
        assert!(!result.contains("$date"));
        assert!(!result.contains("$numberLong"));
    }

    #[test]
    fn test_simplified_regex() {
        let value = simplify(&Bson::RegularExpression(mongodb::bson::Regex {
            pattern: "^a".to_string(),
            options: "i".to_string(),
        }));
        assert_eq!(value, serde_json::json!({ "$regex": "^a", "$options": "i" }));
    }

    #[test]
    fn test_format_items_as_array() {
        let formatter = JsonFormatter::new(false, false, 2);
        let items = vec![document(doc! { "a": 1 }), document(doc! { "a": 2 })];
        assert_eq!(formatter.format_items(&items).unwrap(), r#"[{"a":1},{"a":2}]"#);
        assert_eq!(formatter.format_items(&[]).unwrap(), "[]");
    }

    #[test]
    fn test_compact_vs_pretty() {
        let compact = JsonFormatter::new(false, false, 2);
        let pretty = JsonFormatter::new(true, false, 4);
        let doc = document(doc! { "a": 1, "b": 2 });

        let compact_result = compact.format_bson(&doc).unwrap();
        let pretty_result = pretty.format_bson(&doc).unwrap();

        assert!(!compact_result.contains('\n'));
        assert!(pretty_result.contains("\n    \"a\": 1"));
    }
}
