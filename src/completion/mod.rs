//! Completion system for query text
//!
//! Given query text, a cursor offset and optionally the schema of the active
//! collection, the engine decides which lexical category is expected at the
//! cursor and returns ranked suggestions. It is a pure function of its
//! inputs: it never touches the store and never fails.
//!
//! # Architecture
//!
//! - **Context**: what to complete, plus the word-range scan around the cursor
//! - **FSM**: determines the context from the tokens before the cursor
//! - **Tables**: static methods, modifiers, operators, stages and accumulators
//! - **Provider**: fetches and ranks candidates for a context
//! - **Engine**: orchestrates the flow and binds the replace range
//!
//! # Examples
//!
//! ```
//! use docshell::completion::{Category, CollectionCatalog, CompletionEngine};
//!
//! let engine = CompletionEngine::new(CollectionCatalog::new(["users", "orders"]));
//!
//! let suggestions = engine.complete("db.us", 5, None);
//! assert_eq!(suggestions[0].label, "users");
//! assert_eq!(suggestions[0].category, Category::Collection);
//! assert_eq!(suggestions[0].replace_range, 3..5);
//! ```

mod context;
mod engine;
mod fsm;
mod provider;
mod tables;

pub use context::{CompletionContext, word_range};
pub use engine::{CompletionEngine, DEFAULT_MAX_SUGGESTIONS, Suggestion};
pub use provider::{Category, CollectionCatalog};
