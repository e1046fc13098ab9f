//! Candidate provider for completion suggestions
//!
//! Turns a [`CompletionContext`] into ranked candidates drawn from the static
//! tables, the collection catalog or the active schema.

use serde::Serialize;

use super::context::CompletionContext;
use super::tables::{self, TableEntry};
use crate::error::Result;
use crate::executor::DocumentStore;
use crate::schema::Schema;

/// Lexical category of a suggestion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Category {
    Collection,
    Method,
    QueryOperator,
    AggregationStage,
    Accumulator,
    Field,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Category::Collection => "collection",
            Category::Method => "method",
            Category::QueryOperator => "operator",
            Category::AggregationStage => "stage",
            Category::Accumulator => "accumulator",
            Category::Field => "field",
        };
        write!(f, "{}", name)
    }
}

/// A candidate before it is bound to a replace range
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub label: String,
    pub category: Category,
    pub detail: String,
    pub insert_template: String,
}

impl Candidate {
    fn from_entry(entry: &TableEntry, category: Category) -> Self {
        Self {
            label: entry.label.to_string(),
            category,
            detail: entry.detail.to_string(),
            insert_template: entry.insert_text.to_string(),
        }
    }
}

/// Collection names offered after `db.`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionCatalog {
    names: Vec<String>,
}

impl CollectionCatalog {
    /// Catalog from a fixed list; duplicates are dropped, order is kept
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut catalog = Self::default();
        for name in names {
            let name = name.into();
            if !catalog.names.contains(&name) {
                catalog.names.push(name);
            }
        }
        catalog
    }

    /// Catalog listed from a document store
    pub async fn load(store: &dyn DocumentStore) -> Result<Self> {
        Ok(Self::new(store.list_collections().await?))
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Fetches candidates for a completion context
#[derive(Debug, Clone, Default)]
pub struct CandidateProvider {
    catalog: CollectionCatalog,
}

impl CandidateProvider {
    pub fn new(catalog: CollectionCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &CollectionCatalog {
        &self.catalog
    }

    /// Ranked candidates for `context`
    pub fn candidates(&self, context: &CompletionContext, schema: Option<&Schema>) -> Vec<Candidate> {
        let unranked = match context {
            CompletionContext::Collection { .. } => self.collections(),
            CompletionContext::Method { .. } => from_table(tables::METHODS, Category::Method),
            CompletionContext::Modifier { .. } => from_table(tables::MODIFIERS, Category::Method),
            CompletionContext::Stage { .. } => {
                from_table(tables::AGGREGATION_STAGES, Category::AggregationStage)
            }
            CompletionContext::Operator { .. } => operators(),
            CompletionContext::Field { reference, .. } => match schema {
                Some(schema) => fields(schema, *reference),
                None => Vec::new(),
            },
            CompletionContext::None => Vec::new(),
        };

        filter_by_prefix(unranked, context.prefix())
    }

    fn collections(&self) -> Vec<Candidate> {
        self.catalog
            .names()
            .iter()
            .map(|name| Candidate {
                label: name.clone(),
                category: Category::Collection,
                detail: "Collection".to_string(),
                insert_template: escape_snippet(name),
            })
            .collect()
    }
}

fn from_table(table: &[TableEntry], category: Category) -> Vec<Candidate> {
    table
        .iter()
        .map(|entry| Candidate::from_entry(entry, category))
        .collect()
}

/// Query operators followed by accumulators; both are legal after `{` or `$`.
fn operators() -> Vec<Candidate> {
    let mut candidates = from_table(tables::QUERY_OPERATORS, Category::QueryOperator);
    candidates.extend(tables::ACCUMULATORS.iter().map(|entry| Candidate {
        detail: format!("Accumulator: {}", entry.detail),
        ..Candidate::from_entry(entry, Category::Accumulator)
    }));
    candidates
}

fn fields(schema: &Schema, reference: bool) -> Vec<Candidate> {
    let detail = format!("Field in {}", schema.collection());
    schema
        .fields()
        .iter()
        .map(|path| Candidate {
            label: path.clone(),
            category: Category::Field,
            detail: detail.clone(),
            insert_template: if reference {
                format!("\\${}", escape_snippet(path))
            } else {
                escape_snippet(path)
            },
        })
        .collect()
}

/// Escape text so a snippet consumer inserts it verbatim
fn escape_snippet(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '$' | '}') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Filter candidates by prefix and rank them
///
/// An exact match comes first, then case-sensitive prefix matches, then
/// case-insensitive ones. Ties keep table order.
fn filter_by_prefix(candidates: Vec<Candidate>, prefix: &str) -> Vec<Candidate> {
    if prefix.is_empty() {
        return candidates;
    }

    let lower_prefix = prefix.to_lowercase();
    let mut ranked: Vec<(u8, Candidate)> = candidates
        .into_iter()
        .filter_map(|candidate| {
            let rank = if candidate.label == prefix {
                0
            } else if candidate.label.starts_with(prefix) {
                1
            } else if candidate.label.to_lowercase().starts_with(&lower_prefix) {
                2
            } else {
                return None;
            };
            Some((rank, candidate))
        })
        .collect();

    ranked.sort_by_key(|(rank, _)| *rank);
    ranked.into_iter().map(|(_, candidate)| candidate).collect()
}
