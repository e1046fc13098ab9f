//! docshell library
//!
//! A safe query language and context-aware completion engine for
//! MongoDB-style document collections. Query text of the form
//! `db.<collection>.<op>(args).<modifier>(args)...` is parsed with a closed
//! literal grammar and never evaluated as code.
//!
//! # Modules
//!
//! - `cli`: Command-line interface and argument parsing
//! - `completion`: Context-aware completion engine
//! - `config`: Configuration management
//! - `connection`: MongoDB connection management
//! - `error`: Error types and handling
//! - `executor`: Query execution against a document store
//! - `formatter`: Output formatting and display
//! - `parser`: Query chain and literal argument parsing
//! - `schema`: Field path extraction from sample documents
//! - `session`: Per-tab session state
//!
//! # Example
//!
//! ```
//! use docshell::parser::QueryParser;
//!
//! let chain = QueryParser::parse("db.users.find({ age: { $gt: 18 } }).limit(5)").unwrap();
//! assert_eq!(chain.collection, "users");
//! assert_eq!(chain.operation_names(), vec!["find", "limit"]);
//! ```

pub mod cli;
pub mod completion;
pub mod config;
pub mod connection;
pub mod error;
pub mod executor;
pub mod formatter;
pub mod parser;
pub mod schema;
pub mod session;

// Re-export commonly used types
pub use completion::{CompletionEngine, Suggestion};
pub use config::Config;
pub use connection::ConnectionManager;
pub use error::{DocshellError, Result};
pub use executor::{ExecutionResult, QueryExecutor};
pub use formatter::Formatter;
pub use parser::{QueryChain, QueryParser};
pub use schema::Schema;
pub use session::SessionRegistry;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library version string
pub fn version() -> &'static str {
    VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
