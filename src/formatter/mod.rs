//! Output formatting for docshell
//!
//! This module renders everything the CLI prints:
//! - Execution results as JSON, pretty JSON or a table
//! - Parsed query chains
//! - Completion suggestions
//! - Inferred field paths
//! - Collection and database listings
//! - Errors, with structured JSON payloads for query errors

mod json;
mod stats;
mod table;

pub use json::{JsonFormatter, simplify};
pub use stats::{StatsFormatter, format_bytes};
pub use table::TableFormatter;

use mongodb::bson::Bson;
use serde_json::json;

use crate::completion::Suggestion;
use crate::config::{DisplayConfig, OutputFormat};
use crate::error::{DocshellError, ErrorInfo, Result};
use crate::executor::{CollectionInfo, DatabaseInfo, ExecutionResult, ResultKind};
use crate::parser::QueryChain;
use crate::schema::Schema;

/// Indentation for pretty JSON
const JSON_INDENT: usize = 2;

/// Main formatter for command output
pub struct Formatter {
    format: OutputFormat,
    show_timing: bool,
    json: JsonFormatter,
    table: TableFormatter,
}

impl Formatter {
    /// Create a new formatter
    ///
    /// # Arguments
    /// * `format` - Output format
    /// * `use_colors` - Enable colored output
    pub fn new(format: OutputFormat, use_colors: bool) -> Self {
        Self {
            format,
            show_timing: false,
            json: JsonFormatter::new(format.is_pretty(), use_colors, JSON_INDENT),
            table: TableFormatter::new(use_colors),
        }
    }

    pub fn from_config(config: &DisplayConfig) -> Self {
        Self::new(config.format, config.color_output).with_timing(config.show_timing)
    }

    /// Append a statistics line to execution results
    pub fn with_timing(mut self, show_timing: bool) -> Self {
        self.show_timing = show_timing;
        self
    }

    pub fn output_format(&self) -> OutputFormat {
        self.format
    }

    /// Format an execution result
    pub fn format(&self, result: &ExecutionResult) -> Result<String> {
        let mut output = match self.format {
            OutputFormat::Table => self.format_table(result),
            OutputFormat::Json | OutputFormat::JsonPretty => self.format_json(result)?,
        };

        if self.show_timing {
            output.push('\n');
            output.push_str(&StatsFormatter::new(true).format(result));
        }
        Ok(output)
    }

    fn format_json(&self, result: &ExecutionResult) -> Result<String> {
        match (result.kind, result.items.as_slice()) {
            (ResultKind::Empty, _) | (ResultKind::Document, []) => Ok("null".to_string()),
            (ResultKind::Document | ResultKind::Count, [single]) => self.json.format_bson(single),
            _ => self.json.format_items(&result.items),
        }
    }

    fn format_table(&self, result: &ExecutionResult) -> String {
        match (result.kind, result.items.as_slice()) {
            (ResultKind::Count, [Bson::Int64(n)]) => n.to_string(),
            _ => self.table.format_items(&result.items),
        }
    }

    /// Format a parsed chain
    ///
    /// JSON formats give the structure with byte spans. The table format
    /// gives the canonical query text.
    pub fn format_chain(&self, chain: &QueryChain) -> Result<String> {
        if !self.format.is_json() {
            return Ok(chain.to_string());
        }

        let calls: Vec<serde_json::Value> = chain
            .calls
            .iter()
            .map(|call| {
                json!({
                    "name": call.name,
                    "args": call.args.iter().map(|a| a.to_json()).collect::<Vec<_>>(),
                    "span": { "start": call.span.start, "end": call.span.end },
                })
            })
            .collect();

        self.json.format_value(&json!({
            "collection": chain.collection,
            "calls": calls,
        }))
    }

    /// Format completion suggestions
    pub fn format_suggestions(&self, suggestions: &[Suggestion]) -> Result<String> {
        match self.format {
            OutputFormat::Table => Ok(self.table.format_suggestions(suggestions)),
            _ => self.json.format_value(&suggestions),
        }
    }

    /// Format the inferred field paths of a collection
    pub fn format_schema(&self, schema: &Schema) -> Result<String> {
        match self.format {
            OutputFormat::Table => {
                let items: Vec<Bson> = schema
                    .fields()
                    .iter()
                    .map(|f| Bson::String(f.clone()))
                    .collect();
                Ok(self.table.format_items(&items))
            }
            _ => self.json.format_value(&json!({
                "collection": schema.collection(),
                "fields": schema.fields(),
            })),
        }
    }

    /// Format the collections of a database
    ///
    /// JSON output carries the raw byte count next to the readable size.
    pub fn format_collections(&self, collections: &[CollectionInfo]) -> Result<String> {
        match self.format {
            OutputFormat::Table => Ok(self.table.format_collections(collections)),
            _ => {
                let rows: Vec<serde_json::Value> = collections
                    .iter()
                    .map(|c| {
                        json!({
                            "name": c.name,
                            "documentCount": c.document_count,
                            "size": format_bytes(c.size_bytes),
                            "sizeBytes": c.size_bytes,
                        })
                    })
                    .collect();
                self.json.format_value(&rows)
            }
        }
    }

    pub fn format_databases(&self, databases: &[DatabaseInfo]) -> Result<String> {
        match self.format {
            OutputFormat::Table => Ok(self.table.format_databases(databases)),
            _ => {
                let rows: Vec<serde_json::Value> = databases
                    .iter()
                    .map(|db| {
                        json!({
                            "name": db.name,
                            "sizeOnDisk": db.size_on_disk,
                            "size": format_bytes(db.size_on_disk),
                            "collections": db.collections,
                        })
                    })
                    .collect();
                self.json.format_value(&rows)
            }
        }
    }

    /// Format an error for display
    ///
    /// Query errors carry their kind, offset and diagnostic as JSON when a
    /// JSON format is selected.
    pub fn format_error(&self, error: &DocshellError) -> String {
        if self.format.is_json() {
            if let Some(query_error) = error.as_query() {
                if let Ok(payload) = ErrorInfo::from(query_error).to_json() {
                    return payload;
                }
            }
        }
        format!("Error: {}", error)
    }
}

impl Default for Formatter {
    fn default() -> Self {
        Self::new(OutputFormat::JsonPretty, false)
    }
}
