//! Execution result types
//!
//! This module defines the data structures for representing query execution results:
//! - ExecutionResult: the materialized items of one query
//! - ResultKind: what the base operation produced before materialization
//! - ExecutionStats: Statistics about the execution

use mongodb::bson::Bson;

use super::operation::BaseOperation;

/// Result of query execution
///
/// Whatever the base operation returned, `items` is a flat list: a drained
/// cursor yields its documents, a single document or count yields one item,
/// and an empty `findOne` yields none.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    /// Base operation of the chain
    pub operation: BaseOperation,

    /// Shape of the store output
    pub kind: ResultKind,

    /// Materialized items
    pub items: Vec<Bson>,

    /// Execution statistics
    pub stats: ExecutionStats,
}

/// Shape of the store output before materialization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultKind {
    Documents,
    Document,
    Count,
    Values,
    Empty,
}

/// Execution statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionStats {
    /// Execution time in milliseconds
    pub execution_time_ms: u64,

    /// Number of items returned
    pub documents_returned: usize,
}

impl ExecutionResult {
    pub fn new(operation: BaseOperation, kind: ResultKind, items: Vec<Bson>, elapsed_ms: u64) -> Self {
        let stats = ExecutionStats {
            execution_time_ms: elapsed_ms,
            documents_returned: items.len(),
        };
        Self {
            operation,
            kind,
            items,
            stats,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The count, for `countDocuments` results
    pub fn count(&self) -> Option<u64> {
        match (self.kind, self.items.first()) {
            (ResultKind::Count, Some(Bson::Int64(n))) => u64::try_from(*n).ok(),
            _ => None,
        }
    }
}
