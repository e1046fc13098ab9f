//! Literal value model
//!
//! `LiteralValue` is the tagged value tree produced by the argument parser.
//! It is immutable once parsed. `Display` renders a value back into the
//! literal grammar, so `parse(v.to_string()) == v` for every accepted input.

use std::fmt;

use mongodb::bson::{self, Bson, Document};

/// A value produced by the closed argument grammar
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Regex { pattern: String, flags: String },
    Array(Vec<LiteralValue>),
    Object(LiteralObject),
}

/// Object literal with insertion-ordered keys
///
/// A repeated key keeps its first position and takes the last value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LiteralObject {
    entries: Vec<(String, LiteralValue)>,
}

impl LiteralObject {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: LiteralValue) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&LiteralValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &LiteralValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, LiteralValue)> for LiteralObject {
    fn from_iter<I: IntoIterator<Item = (String, LiteralValue)>>(iter: I) -> Self {
        let mut object = LiteralObject::new();
        for (key, value) in iter {
            object.insert(key, value);
        }
        object
    }
}

impl LiteralValue {
    /// Short type name used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            LiteralValue::Null => "null",
            LiteralValue::Bool(_) => "boolean",
            LiteralValue::Number(_) => "number",
            LiteralValue::String(_) => "string",
            LiteralValue::Regex { .. } => "regex",
            LiteralValue::Array(_) => "array",
            LiteralValue::Object(_) => "object",
        }
    }

    pub fn as_object(&self) -> Option<&LiteralObject> {
        match self {
            LiteralValue::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            LiteralValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Convert to BSON; integral numbers become `Int64`, others `Double`.
    pub fn to_bson(&self) -> Bson {
        match self {
            LiteralValue::Null => Bson::Null,
            LiteralValue::Bool(b) => Bson::Boolean(*b),
            LiteralValue::Number(n) => number_to_bson(*n),
            LiteralValue::String(s) => Bson::String(s.clone()),
            LiteralValue::Regex { pattern, flags } => {
                let mut options: Vec<char> = flags.chars().collect();
                options.sort_unstable();
                Bson::RegularExpression(bson::Regex {
                    pattern: pattern.clone(),
                    options: options.into_iter().collect(),
                })
            }
            LiteralValue::Array(items) => Bson::Array(items.iter().map(Self::to_bson).collect()),
            LiteralValue::Object(obj) => Bson::Document(obj.to_document()),
        }
    }

    /// Convert to JSON; regexes use the extended-JSON `$regex` form.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;

        match self {
            LiteralValue::Null => Value::Null,
            LiteralValue::Bool(b) => Value::Bool(*b),
            LiteralValue::Number(n) => {
                if is_integral(*n) {
                    Value::from(*n as i64)
                } else {
                    serde_json::Number::from_f64(*n).map_or(Value::Null, Value::Number)
                }
            }
            LiteralValue::String(s) => Value::String(s.clone()),
            LiteralValue::Regex { pattern, flags } => serde_json::json!({
                "$regex": pattern,
                "$options": flags,
            }),
            LiteralValue::Array(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            LiteralValue::Object(obj) => Value::Object(
                obj.iter()
                    .map(|(k, v)| (k.to_string(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

impl LiteralObject {
    pub fn to_document(&self) -> Document {
        let mut doc = Document::new();
        for (key, value) in self.iter() {
            doc.insert(key, value.to_bson());
        }
        doc
    }
}

/// Integral and exactly representable; `-0` stays a double
fn is_integral(n: f64) -> bool {
    n.fract() == 0.0 && n.abs() < 9.007_199_254_740_992e15 && !(n == 0.0 && n.is_sign_negative())
}

fn number_to_bson(n: f64) -> Bson {
    if is_integral(n) {
        Bson::Int64(n as i64)
    } else {
        Bson::Double(n)
    }
}

/// True when `key` can be written as a bare object key
fn is_bare_key(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

fn write_string(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    let quoted = serde_json::to_string(s).map_err(|_| fmt::Error)?;
    f.write_str(&quoted)
}

impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiteralValue::Null => f.write_str("null"),
            LiteralValue::Bool(b) => write!(f, "{b}"),
            LiteralValue::Number(n) => {
                if is_integral(*n) {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{n}")
                }
            }
            LiteralValue::String(s) => write_string(f, s),
            LiteralValue::Regex { pattern, flags } => write!(f, "/{pattern}/{flags}"),
            LiteralValue::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            LiteralValue::Object(obj) => write!(f, "{obj}"),
        }
    }
}

impl fmt::Display for LiteralObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("{}");
        }
        f.write_str("{ ")?;
        for (i, (key, value)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            if is_bare_key(key) {
                f.write_str(key)?;
            } else {
                write_string(f, key)?;
            }
            write!(f, ": {value}")?;
        }
        f.write_str(" }")
    }
}
