//! Table formatting for query results using tabled
//!
//! This module provides table-style output:
//! - Builder pattern for dynamic columns, `_id` first
//! - BSON type handling with shell-style wrappers
//! - Single-column tables for non-document items
//! - Suggestion listings for the `complete` command
//! - Collection and database listings with human-readable sizes

use std::collections::BTreeSet;

use mongodb::bson::{Bson, Document};
use tabled::{
    Table,
    builder::Builder,
    settings::{
        Alignment, Color, Modify, Style,
        object::{Columns, Rows},
        width::Width,
    },
};

use super::stats::format_bytes;
use crate::completion::Suggestion;
use crate::executor::{CollectionInfo, DatabaseInfo};

/// Maximum width for a single column (characters)
const DEFAULT_MAX_COLUMN_WIDTH: usize = 40;

/// Arrays and documents up to this many entries are shown inline
const INLINE_LIMIT: usize = 3;

/// Table formatter for result items
#[derive(Debug, Clone)]
pub struct TableFormatter {
    /// Maximum column width
    max_column_width: usize,

    /// Enable colored header
    use_colors: bool,
}

impl TableFormatter {
    pub fn new(use_colors: bool) -> Self {
        Self {
            max_column_width: DEFAULT_MAX_COLUMN_WIDTH,
            use_colors,
        }
    }

    /// Set maximum column width
    pub fn with_max_column_width(mut self, width: usize) -> Self {
        self.max_column_width = width;
        self
    }

    /// Format result items as a table
    ///
    /// Documents get one column per top-level field. Any other item kind is
    /// shown in a single `value` column.
    pub fn format_items(&self, items: &[Bson]) -> String {
        if items.is_empty() {
            return "(empty result set)".to_string();
        }

        let docs: Vec<&Document> = items.iter().filter_map(Bson::as_document).collect();
        if docs.len() == items.len() {
            return self.format_documents(&docs);
        }

        let mut builder = Builder::default();
        builder.push_record(["value".to_string()]);
        for item in items {
            builder.push_record([format_bson_value(item)]);
        }
        self.finish(builder, 1)
    }

    /// Format completion suggestions
    pub fn format_suggestions(&self, suggestions: &[Suggestion]) -> String {
        if suggestions.is_empty() {
            return "(no suggestions)".to_string();
        }

        let mut builder = Builder::default();
        builder.push_record(["label", "category", "detail", "insert"].map(String::from));
        for s in suggestions {
            builder.push_record([
                s.label.clone(),
                s.category.to_string(),
                s.detail.clone(),
                s.insert_template.clone(),
            ]);
        }
        self.finish(builder, 4)
    }

    pub fn format_collections(&self, collections: &[CollectionInfo]) -> String {
        if collections.is_empty() {
            return "(no collections)".to_string();
        }

        let mut builder = Builder::default();
        builder.push_record(["collection", "documents", "size"].map(String::from));
        for c in collections {
            builder.push_record([
                c.name.clone(),
                c.document_count.to_string(),
                format_bytes(c.size_bytes),
            ]);
        }
        self.finish(builder, 3)
    }

    pub fn format_databases(&self, databases: &[DatabaseInfo]) -> String {
        if databases.is_empty() {
            return "(no databases)".to_string();
        }

        let mut builder = Builder::default();
        builder.push_record(["database", "size", "collections"].map(String::from));
        for db in databases {
            builder.push_record([
                db.name.clone(),
                format_bytes(db.size_on_disk),
                db.collections.join(", "),
            ]);
        }
        self.finish(builder, 3)
    }

    fn format_documents(&self, docs: &[&Document]) -> String {
        let fields = extract_field_names(docs);
        if fields.is_empty() {
            return "(no fields found)".to_string();
        }

        let mut builder = Builder::default();
        builder.push_record(fields.clone());
        for doc in docs {
            let row: Vec<String> = fields
                .iter()
                .map(|field| doc.get(field).map(format_bson_value).unwrap_or_default())
                .collect();
            builder.push_record(row);
        }
        self.finish(builder, fields.len())
    }

    /// Apply style, column wrapping and header styling
    fn finish(&self, builder: Builder, columns: usize) -> String {
        let mut table: Table = builder.build();
        table.with(Style::modern());

        // Wrap long values instead of truncating them
        for i in 0..columns {
            table.with(Modify::new(Columns::new(i..=i)).with(Width::wrap(self.max_column_width)));
        }

        table.with(Modify::new(Rows::first()).with(Alignment::center()));
        if self.use_colors {
            table.modify(Rows::first(), Color::FG_CYAN | Color::BOLD);
        }

        table.to_string()
    }
}

impl Default for TableFormatter {
    fn default() -> Self {
        Self::new(false)
    }
}

/// All top-level field names, sorted, with `_id` first
fn extract_field_names(docs: &[&Document]) -> Vec<String> {
    let fields: BTreeSet<&String> = docs.iter().copied().flat_map(Document::keys).collect();
    let mut fields: Vec<String> = fields.into_iter().cloned().collect();

    if let Some(pos) = fields.iter().position(|f| f == "_id") {
        let id = fields.remove(pos);
        fields.insert(0, id);
    }
    fields
}

/// Format a BSON value for a table cell
fn format_bson_value(value: &Bson) -> String {
    match value {
        Bson::ObjectId(oid) => format!("ObjectId('{}')", oid),
        Bson::DateTime(dt) => {
            let iso = dt
                .try_to_rfc3339_string()
                .unwrap_or_else(|_| dt.timestamp_millis().to_string());
            format!("ISODate('{}')", iso)
        }
        Bson::Int64(n) => format!("Long('{}')", n),
        Bson::Decimal128(d) => format!("NumberDecimal('{}')", d),
        Bson::String(s) => s.clone(),
        Bson::Int32(n) => n.to_string(),
        Bson::Double(f) => {
            if f.fract() == 0.0 && f.abs() < 1e10 {
                format!("{:.0}", f)
            } else {
                f.to_string()
            }
        }
        Bson::Boolean(b) => b.to_string(),
        Bson::Null => "null".to_string(),
        Bson::Array(arr) if arr.len() <= INLINE_LIMIT => {
            let items: Vec<String> = arr.iter().map(format_bson_value).collect();
            format!("[{}]", items.join(", "))
        }
        Bson::Array(arr) => format!("[Array({})]", arr.len()),
        Bson::Document(doc) if doc.len() <= INLINE_LIMIT => {
            let fields: Vec<String> = doc
                .iter()
                .map(|(k, v)| format!("{}: {}", k, format_bson_value(v)))
                .collect();
            format!("{{{}}}", fields.join(", "))
        }
        Bson::Document(doc) => format!("{{Object({})}}", doc.len()),
        Bson::Binary(bin) => format!("Binary({} bytes)", bin.bytes.len()),
        Bson::RegularExpression(regex) => format!("/{}/{}", regex.pattern, regex.options),
        Bson::Timestamp(ts) => format!("Timestamp({}, {})", ts.time, ts.increment),
        Bson::Undefined => "undefined".to_string(),
        Bson::MinKey => "MinKey".to_string(),
        Bson::MaxKey => "MaxKey".to_string(),
        other => format!("{:?}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::Category;
    use mongodb::bson::{doc, oid::ObjectId};

    fn documents(docs: Vec<Document>) -> Vec<Bson> {
        docs.into_iter().map(Bson::Document).collect()
    }

    #[test]
    fn test_format_empty_items() {
        assert_eq!(TableFormatter::default().format_items(&[]), "(empty result set)");
    }

    #[test]
    fn test_format_documents_with_missing_fields() {
        let items = documents(vec![
            doc! { "name": "Alice", "age": 25 },
            doc! { "name": "Bob" },
        ]);
        let result = TableFormatter::default().format_items(&items);
        assert!(result.contains("name"));
        assert!(result.contains("age"));
        assert!(result.contains("Alice"));
        assert!(result.contains("Bob"));
        assert!(result.contains("25"));
    }

    #[test]
    fn test_extract_field_names_with_id() {
        let a = doc! { "name": "Alice", "_id": 1, "age": 25 };
        let b = doc! { "_id": 2, "email": "b@example.com" };
        let fields = extract_field_names(&[&a, &b]);
        assert_eq!(fields, vec!["_id", "age", "email", "name"]);
    }

    #[test]
    fn test_format_distinct_values() {
        let items = vec![Bson::String("NYC".into()), Bson::String("LA".into())];
        let result = TableFormatter::default().format_items(&items);
        assert!(result.contains("value"));
        assert!(result.contains("NYC"));
        assert!(result.contains("LA"));
    }

    #[test]
    fn test_format_bson_values() {
        let oid = ObjectId::parse_str("507f1f77bcf86cd799439011").unwrap();
        assert_eq!(
            format_bson_value(&Bson::ObjectId(oid)),
            "ObjectId('507f1f77bcf86cd799439011')"
        );
        assert_eq!(format_bson_value(&Bson::Int64(7)), "Long('7')");
        assert_eq!(format_bson_value(&Bson::Double(3.0)), "3");
        assert_eq!(format_bson_value(&Bson::Null), "null");

        let small = Bson::Array(vec![Bson::Int32(1), Bson::Int32(2), Bson::Int32(3)]);
        assert_eq!(format_bson_value(&small), "[1, 2, 3]");
        let large = Bson::Array((0..5).map(Bson::Int32).collect());
        assert_eq!(format_bson_value(&large), "[Array(5)]");

        assert_eq!(format_bson_value(&Bson::Document(doc! { "x": 1 })), "{x: 1}");
        let big = Bson::Document(doc! { "a": 1, "b": 2, "c": 3, "d": 4 });
        assert_eq!(format_bson_value(&big), "{Object(4)}");
    }

    #[test]
    fn test_format_suggestions() {
        let suggestions = vec![Suggestion {
            label: "find".into(),
            category: Category::Method,
            detail: "Find documents".into(),
            insert_template: "find({ $1 })".into(),
            replace_range: 9..11,
        }];
        let result = TableFormatter::default().format_suggestions(&suggestions);
        assert!(result.contains("label"));
        assert!(result.contains("find"));
        assert!(result.contains("method"));
        assert_eq!(
            TableFormatter::default().format_suggestions(&[]),
            "(no suggestions)"
        );
    }

    #[test]
    fn test_format_collections_and_databases() {
        let formatter = TableFormatter::default();
        let collections = vec![CollectionInfo {
            name: "orders".into(),
            document_count: 1200,
            size_bytes: 1536,
        }];
        let result = formatter.format_collections(&collections);
        assert!(result.contains("documents"));
        assert!(result.contains("orders"));
        assert!(result.contains("1200"));
        assert!(result.contains("1.5 KB"));
        assert_eq!(formatter.format_collections(&[]), "(no collections)");

        let databases = vec![DatabaseInfo {
            name: "shop".into(),
            size_on_disk: 8192,
            collections: vec!["orders".into(), "users".into()],
        }];
        let result = formatter.format_databases(&databases);
        assert!(result.contains("shop"));
        assert!(result.contains("8 KB"));
        assert!(result.contains("orders, users"));
        assert_eq!(formatter.format_databases(&[]), "(no databases)");
    }

    #[test]
    fn test_with_max_column_width() {
        let formatter = TableFormatter::default().with_max_column_width(20);
        assert_eq!(formatter.max_column_width, 20);
    }
}
