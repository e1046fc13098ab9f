//! Parsed query chain
//!
//! `db.<collection>.<op>(args).<modifier>(args)...` parses into a
//! [`QueryChain`]: the target collection and the ordered calls.

use std::fmt;
use std::ops::Range;

use super::value::LiteralValue;

/// Span information for source locations
pub type Span = Range<usize>;

/// A parsed `db.<collection>.<call>...` query
#[derive(Debug, Clone, PartialEq)]
pub struct QueryChain {
    pub collection: String,
    /// Never empty
    pub calls: Vec<Call>,
}

/// One call in the chain: `name(args)`
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub name: String,
    pub args: Vec<LiteralValue>,
    /// Byte range of `name(...)` in the query text
    pub span: Span,
}

impl Call {
    pub fn new(name: impl Into<String>, args: Vec<LiteralValue>, span: Span) -> Self {
        Self {
            name: name.into(),
            args,
            span,
        }
    }
}

impl QueryChain {
    /// The base operation: the first call in the chain.
    pub fn base(&self) -> Option<&Call> {
        self.calls.first()
    }

    /// Chained calls after the base operation
    pub fn modifiers(&self) -> &[Call] {
        self.calls.get(1..).unwrap_or_default()
    }

    /// Operation names in source order
    pub fn operation_names(&self) -> Vec<&str> {
        self.calls.iter().map(|c| c.name.as_str()).collect()
    }
}

impl fmt::Display for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{arg}")?;
        }
        f.write_str(")")
    }
}

impl fmt::Display for QueryChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "db.{}", self.collection)?;
        for call in &self.calls {
            write!(f, ".{call}")?;
        }
        Ok(())
    }
}
