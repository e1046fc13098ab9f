//! Operation allow-list and cursor modifiers
//!
//! Base operations are a fixed allow-list; nothing is looked up on the store
//! by name. Modifiers are validated into [`CursorModifier`] values before the
//! store sees them.

use std::fmt;

use mongodb::bson::Document;

use crate::error::QueryError;
use crate::parser::{Call, LiteralValue};

/// Store-level operations a chain may start with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseOperation {
    Find,
    FindOne,
    InsertOne,
    InsertMany,
    UpdateOne,
    UpdateMany,
    DeleteOne,
    DeleteMany,
    Aggregate,
    CountDocuments,
    Distinct,
}

impl BaseOperation {
    pub const ALL: [BaseOperation; 11] = [
        BaseOperation::Find,
        BaseOperation::FindOne,
        BaseOperation::InsertOne,
        BaseOperation::InsertMany,
        BaseOperation::UpdateOne,
        BaseOperation::UpdateMany,
        BaseOperation::DeleteOne,
        BaseOperation::DeleteMany,
        BaseOperation::Aggregate,
        BaseOperation::CountDocuments,
        BaseOperation::Distinct,
    ];

    /// Look up an operation by its shell name (case-sensitive)
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.name() == name)
    }

    pub fn name(&self) -> &'static str {
        match self {
            BaseOperation::Find => "find",
            BaseOperation::FindOne => "findOne",
            BaseOperation::InsertOne => "insertOne",
            BaseOperation::InsertMany => "insertMany",
            BaseOperation::UpdateOne => "updateOne",
            BaseOperation::UpdateMany => "updateMany",
            BaseOperation::DeleteOne => "deleteOne",
            BaseOperation::DeleteMany => "deleteMany",
            BaseOperation::Aggregate => "aggregate",
            BaseOperation::CountDocuments => "countDocuments",
            BaseOperation::Distinct => "distinct",
        }
    }

    /// Whether the operation yields a cursor that modifiers can refine
    pub fn returns_cursor(&self) -> bool {
        matches!(self, BaseOperation::Find | BaseOperation::Aggregate)
    }
}

impl fmt::Display for BaseOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Explain verbosity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExplainVerbosity {
    #[default]
    QueryPlanner,
    ExecutionStats,
    AllPlansExecution,
}

impl ExplainVerbosity {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExplainVerbosity::QueryPlanner => "queryPlanner",
            ExplainVerbosity::ExecutionStats => "executionStats",
            ExplainVerbosity::AllPlansExecution => "allPlansExecution",
        }
    }

    fn from_name(s: &str) -> Option<Self> {
        match s {
            "queryPlanner" => Some(ExplainVerbosity::QueryPlanner),
            "executionStats" => Some(ExplainVerbosity::ExecutionStats),
            "allPlansExecution" => Some(ExplainVerbosity::AllPlansExecution),
            _ => None,
        }
    }
}

/// A validated cursor modifier
#[derive(Debug, Clone, PartialEq)]
pub enum CursorModifier {
    Sort(Document),
    Limit(u64),
    Skip(u64),
    Explain(ExplainVerbosity),
}

/// Names accepted after a cursor-returning base operation
pub const MODIFIER_NAMES: [&str; 4] = ["sort", "limit", "skip", "explain"];

impl CursorModifier {
    pub fn name(&self) -> &'static str {
        match self {
            CursorModifier::Sort(_) => "sort",
            CursorModifier::Limit(_) => "limit",
            CursorModifier::Skip(_) => "skip",
            CursorModifier::Explain(_) => "explain",
        }
    }

    /// Validate a chained call into a modifier.
    ///
    /// Unknown names are `UnsupportedModifier`; unusable arguments are
    /// `InvalidArgument`. Errors are not yet tagged with a call index.
    pub fn from_call(call: &Call) -> Result<Self, QueryError> {
        let name = call.name.as_str();
        match name {
            "sort" => match call.args.as_slice() {
                [LiteralValue::Object(spec)] => Ok(CursorModifier::Sort(spec.to_document())),
                [other] => Err(QueryError::invalid_argument(format!(
                    "sort() expects an object, got {}",
                    other.type_name()
                ))),
                args => Err(arity_error(name, 1, args.len())),
            },
            "limit" => Ok(CursorModifier::Limit(count_argument(name, &call.args)?)),
            "skip" => Ok(CursorModifier::Skip(count_argument(name, &call.args)?)),
            "explain" => match call.args.as_slice() {
                [] => Ok(CursorModifier::Explain(ExplainVerbosity::default())),
                [LiteralValue::Bool(true)] => {
                    Ok(CursorModifier::Explain(ExplainVerbosity::AllPlansExecution))
                }
                [LiteralValue::Bool(false)] => {
                    Ok(CursorModifier::Explain(ExplainVerbosity::QueryPlanner))
                }
                [LiteralValue::String(s)] => ExplainVerbosity::from_name(s)
                    .map(CursorModifier::Explain)
                    .ok_or_else(|| {
                        QueryError::invalid_argument(format!(
                            "explain() verbosity must be queryPlanner, executionStats or allPlansExecution, got '{s}'"
                        ))
                    }),
                [other] => Err(QueryError::invalid_argument(format!(
                    "explain() expects a verbosity string, got {}",
                    other.type_name()
                ))),
                args => Err(arity_error(name, 1, args.len())),
            },
            _ => Err(QueryError::unsupported_modifier(format!(
                "'{name}' is not a cursor modifier (expected one of: {})",
                MODIFIER_NAMES.join(", ")
            ))),
        }
    }
}

/// Coerce a `limit`/`skip` argument to a non-negative integer.
///
/// Fractional values are truncated toward zero.
fn count_argument(name: &str, args: &[LiteralValue]) -> Result<u64, QueryError> {
    match args {
        [LiteralValue::Number(n)] if *n >= 0.0 => Ok(n.trunc() as u64),
        [LiteralValue::Number(n)] => Err(QueryError::invalid_argument(format!(
            "{name}() expects a non-negative integer, got {n}"
        ))),
        [other] => Err(QueryError::invalid_argument(format!(
            "{name}() expects a non-negative integer, got {} {other}",
            other.type_name()
        ))),
        args => Err(arity_error(name, 1, args.len())),
    }
}

fn arity_error(name: &str, expected: usize, got: usize) -> QueryError {
    QueryError::invalid_argument(format!(
        "{name}() takes {expected} argument, got {got}"
    ))
}
