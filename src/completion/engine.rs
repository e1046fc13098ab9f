//! Completion engine - orchestrates the completion flow
//!
//! This module ties together the completion components: word-range scanning,
//! the context FSM and candidate fetching.

use std::ops::Range;

use serde::Serialize;
use tracing::debug;

use super::context::{clamp_cursor, word_range};
use super::fsm;
use super::provider::{CandidateProvider, Category, CollectionCatalog};
use crate::schema::Schema;

/// Default cap on returned suggestions
pub const DEFAULT_MAX_SUGGESTIONS: usize = 50;

/// One completion suggestion
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    /// Display text
    pub label: String,
    pub category: Category,
    /// Short description shown next to the label
    pub detail: String,
    /// Text to insert, in snippet syntax
    pub insert_template: String,
    /// Byte range of the query text the insertion replaces
    pub replace_range: Range<usize>,
}

/// Main completion engine
#[derive(Debug, Clone)]
pub struct CompletionEngine {
    provider: CandidateProvider,
    max_suggestions: usize,
}

impl CompletionEngine {
    /// Create a new completion engine
    ///
    /// # Arguments
    /// * `catalog` - Collection names offered after `db.`
    pub fn new(catalog: CollectionCatalog) -> Self {
        Self {
            provider: CandidateProvider::new(catalog),
            max_suggestions: DEFAULT_MAX_SUGGESTIONS,
        }
    }

    /// Cap the number of suggestions returned per request
    pub fn with_max_suggestions(mut self, max_suggestions: usize) -> Self {
        self.max_suggestions = max_suggestions;
        self
    }

    pub fn catalog(&self) -> &CollectionCatalog {
        self.provider.catalog()
    }

    /// Complete the input at the given cursor position
    ///
    /// # Arguments
    /// * `text` - The query text
    /// * `cursor` - Cursor position (byte offset, clamped into `text`)
    /// * `schema` - Schema of the active collection, if any
    ///
    /// # Returns
    /// Ranked suggestions, all sharing the replace range of the word under
    /// the cursor. Never fails; an unrecognized position gives an empty list.
    pub fn complete(&self, text: &str, cursor: usize, schema: Option<&Schema>) -> Vec<Suggestion> {
        // 1. Locate the word under the cursor
        let cursor = clamp_cursor(text, cursor);
        let range = word_range(text, cursor);

        // 2. Classify the position
        let context = fsm::analyze(text, cursor, range.start, schema.is_some());
        if context.is_none() {
            debug!("No completion context at offset {}", cursor);
            return Vec::new();
        }

        // 3. Fetch and rank candidates
        let mut candidates = self.provider.candidates(&context, schema);
        candidates.truncate(self.max_suggestions);

        debug!(
            "Completion context {:?} yielded {} candidate(s)",
            context,
            candidates.len()
        );

        // 4. Bind candidates to the replace range
        candidates
            .into_iter()
            .map(|c| Suggestion {
                label: c.label,
                category: c.category,
                detail: c.detail,
                insert_template: c.insert_template,
                replace_range: range.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::tables;

    fn create_test_engine() -> CompletionEngine {
        CompletionEngine::new(CollectionCatalog::new(["users", "orders", "products"]))
    }

    fn complete_at_end(engine: &CompletionEngine, text: &str) -> Vec<Suggestion> {
        engine.complete(text, text.len(), None)
    }

    fn categories(suggestions: &[Suggestion]) -> Vec<Category> {
        let mut seen = Vec::new();
        for s in suggestions {
            if !seen.contains(&s.category) {
                seen.push(s.category);
            }
        }
        seen
    }

    #[test]
    fn test_complete_db_dot() {
        let engine = create_test_engine();
        let suggestions = complete_at_end(&engine, "db.");

        assert_eq!(categories(&suggestions), vec![Category::Collection]);
        assert_eq!(suggestions.len(), 3);
        assert!(suggestions.iter().all(|s| s.replace_range == (3..3)));
    }

    #[test]
    fn test_complete_collection_prefix() {
        let engine = create_test_engine();
        let suggestions = complete_at_end(&engine, "db.us");

        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].label, "users");
        assert_eq!(suggestions[0].replace_range, 3..5);
    }

    #[test]
    fn test_complete_collection_dot() {
        let engine = create_test_engine();
        let suggestions = complete_at_end(&engine, "db.users.");

        assert_eq!(categories(&suggestions), vec![Category::Method]);
        assert_eq!(suggestions.len(), tables::METHODS.len());
        assert!(suggestions.iter().any(|s| s.label == "find"));
        assert!(!suggestions.iter().any(|s| s.label == "limit"));
    }

    #[test]
    fn test_complete_operation_prefix() {
        let engine = create_test_engine();
        let suggestions = complete_at_end(&engine, "db.users.fi");

        let labels: Vec<&str> = suggestions.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["find", "findOne"]);
        assert_eq!(suggestions[0].replace_range, 9..11);
        assert_eq!(suggestions[0].insert_template, "find({ $1 })");
    }

    #[test]
    fn test_exact_match_ranks_first() {
        let engine = create_test_engine();
        let suggestions = complete_at_end(&engine, "db.users.find");
        assert_eq!(suggestions[0].label, "find");
        assert_eq!(suggestions[1].label, "findOne");
    }

    #[test]
    fn test_complete_chained_modifier() {
        let engine = create_test_engine();
        let suggestions = complete_at_end(&engine, "db.users.find({}).");

        let labels: Vec<&str> = suggestions.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["sort", "limit", "skip", "explain"]);
        assert_eq!(categories(&suggestions), vec![Category::Method]);
    }

    #[test]
    fn test_complete_dollar_in_filter() {
        let engine = create_test_engine();
        let suggestions = complete_at_end(&engine, "db.users.find({ $");

        assert_eq!(
            categories(&suggestions),
            vec![Category::QueryOperator, Category::Accumulator]
        );
        assert_eq!(
            suggestions.len(),
            tables::QUERY_OPERATORS.len() + tables::ACCUMULATORS.len()
        );
        assert!(suggestions.iter().all(|s| s.replace_range == (16..17)));
    }

    #[test]
    fn test_complete_operator_prefix() {
        let engine = create_test_engine();
        let suggestions = complete_at_end(&engine, "db.users.find({ age: { $gt");

        let labels: Vec<&str> = suggestions.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["$gt", "$gte"]);
    }

    #[test]
    fn test_complete_pipeline_stage() {
        let engine = create_test_engine();
        let suggestions = complete_at_end(&engine, "db.orders.aggregate([");

        assert_eq!(categories(&suggestions), vec![Category::AggregationStage]);
        assert_eq!(suggestions.len(), tables::AGGREGATION_STAGES.len());
    }

    #[test]
    fn test_complete_fields_with_schema() {
        let engine = create_test_engine();
        let schema = Schema::new(
            "users",
            vec!["name".into(), "address".into(), "address.city".into()],
        );

        let text = "db.users.find({ \"ad";
        let suggestions = engine.complete(text, text.len(), Some(&schema));
        let labels: Vec<&str> = suggestions.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["address", "address.city"]);
        assert_eq!(suggestions[0].replace_range, 17..19);
        assert_eq!(categories(&suggestions), vec![Category::Field]);
    }

    #[test]
    fn test_no_fields_without_schema() {
        let engine = create_test_engine();
        assert!(complete_at_end(&engine, "db.users.find({ \"").is_empty());
    }

    #[test]
    fn test_cursor_in_middle_of_word() {
        let engine = create_test_engine();
        // Cursor after "db.users.fi" in a longer text
        let suggestions = engine.complete("db.users.fixx()", 11, None);
        assert!(suggestions.iter().any(|s| s.label == "find"));
        assert!(suggestions.iter().all(|s| s.replace_range == (9..13)));
    }

    #[test]
    fn test_max_suggestions() {
        let engine = create_test_engine().with_max_suggestions(2);
        assert_eq!(complete_at_end(&engine, "db.users.").len(), 2);
    }

    #[test]
    fn test_never_fails_on_garbage() {
        let engine = create_test_engine();
        for text in ["", ")))", "db.users.find(\"", "db..", "🙂", "db.users.find({ a: 1 }) x"] {
            assert!(engine.complete(text, text.len(), None).is_empty(), "{text}");
        }
        assert!(engine.complete("db.", 1000, None).len() == 3);
    }
}
