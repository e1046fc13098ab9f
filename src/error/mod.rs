//! Error handling for docshell.
//!
//! This module provides:
//! - The query error taxonomy raised by the parser and the executor
//! - Ambient error kinds for configuration, connection and I/O failures
//! - Structured diagnostic extraction from MongoDB driver errors
//!
//! # Example
//!
//! ```rust
//! use docshell::error::{QueryErrorKind, Result};
//! use docshell::parser::QueryParser;
//!
//! fn parse(text: &str) -> Result<()> {
//!     QueryParser::parse(text)?;
//!     Ok(())
//! }
//!
//! let err = parse("users.find()").unwrap_err();
//! assert_eq!(err.query_kind(), Some(QueryErrorKind::MalformedQuery));
//! ```

pub mod kinds;
pub mod mongo;

// Re-export commonly used types
pub use kinds::{
    ConfigError, ConnectionError, DocshellError, QueryError, QueryErrorKind, Result,
};
pub use mongo::{ErrorInfo, StoreDiagnostic};
