//! Query execution engine for docshell
//!
//! This module provides the execution layer that runs a parsed query chain
//! against a document store. It includes:
//! - The operation allow-list and cursor modifier validation
//! - The document-store capability traits
//! - The query executor, which applies modifiers and materializes results
//! - A MongoDB-backed store adapter, which also lists databases and
//!   collection sizes for browsing
//!
//! The whole chain is validated before the store is touched, so a bad
//! modifier never leaves a half-run write behind.

mod mongo;
mod operation;
mod result;
mod store;


pub use mongo::MongoStore;
pub use operation::{BaseOperation, CursorModifier, ExplainVerbosity, MODIFIER_NAMES};
pub use result::{ExecutionResult, ExecutionStats, ResultKind};
pub use store::{
    CollectionHandle, CollectionInfo, CursorHandle, DatabaseInfo, DocumentStore, StoreOutput,
};

use std::sync::Arc;
use std::time::Instant;

use mongodb::bson::Bson;
use tracing::{debug, info};

use crate::error::{DocshellError, QueryError, Result};
use crate::parser::{QueryChain, QueryParser};
use crate::schema::Schema;

/// Validated form of a query chain
#[derive(Debug)]
struct ExecutionPlan {
    operation: BaseOperation,
    modifiers: Vec<CursorModifier>,
}

/// Runs query chains against a [`DocumentStore`]
#[derive(Clone)]
pub struct QueryExecutor {
    store: Arc<dyn DocumentStore>,
}

impl QueryExecutor {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Parse and execute query text
    pub async fn execute(&self, query: &str) -> Result<ExecutionResult> {
        let chain = QueryParser::parse(query)?;
        self.execute_chain(&chain, query).await
    }

    /// Execute an already parsed chain; `query` is the text it came from.
    pub async fn execute_chain(&self, chain: &QueryChain, query: &str) -> Result<ExecutionResult> {
        let started = Instant::now();
        let plan = Self::plan(chain).map_err(|e| e.with_query(query))?;

        info!(
            "Executing {} on collection '{}' with {} modifier(s)",
            plan.operation,
            chain.collection,
            plan.modifiers.len()
        );

        let operation = plan.operation;
        let (kind, items) = self
            .run(chain, plan)
            .await
            .map_err(|e| tag_store_error(e, query))?;

        let elapsed = started.elapsed().as_millis() as u64;
        debug!("Query executed in {}ms, {} item(s)", elapsed, items.len());

        Ok(ExecutionResult::new(operation, kind, items, elapsed))
    }

    /// Infer a schema for `collection` from up to `sample_size` documents
    pub async fn infer_schema(&self, collection: &str, sample_size: usize) -> Result<Schema> {
        let samples = if sample_size <= 1 {
            self.store
                .sample_document(collection)
                .await?
                .into_iter()
                .collect()
        } else {
            self.store.sample_documents(collection, sample_size).await?
        };
        debug!(
            "Sampled {} document(s) from '{}'",
            samples.len(),
            collection
        );
        Ok(Schema::infer_many(collection, &samples))
    }

    /// Validate the chain: allow-listed base operation, then modifiers that
    /// only follow a cursor.
    fn plan(chain: &QueryChain) -> std::result::Result<ExecutionPlan, QueryError> {
        let base = chain
            .base()
            .ok_or_else(|| QueryError::malformed("query has no operation"))?;

        let operation = BaseOperation::from_name(&base.name)
            .ok_or_else(|| QueryError::unknown_operation(&base.name).at(base.span.start))?;

        let mut modifiers: Vec<CursorModifier> = Vec::new();
        for (index, call) in chain.calls.iter().enumerate().skip(1) {
            let after_explain = matches!(modifiers.last(), Some(CursorModifier::Explain(_)));
            if !operation.returns_cursor() || after_explain {
                let produced = if after_explain {
                    "explain() returns a document"
                } else {
                    "the base operation does not return a cursor"
                };
                return Err(QueryError::unsupported_modifier(format!(
                    "'{}' cannot be applied: {produced}",
                    call.name
                ))
                .at(call.span.start)
                .in_call(index));
            }

            let modifier =
                CursorModifier::from_call(call).map_err(|e| e.at(call.span.start).in_call(index))?;
            modifiers.push(modifier);
        }

        Ok(ExecutionPlan {
            operation,
            modifiers,
        })
    }

    async fn run(&self, chain: &QueryChain, plan: ExecutionPlan) -> Result<(ResultKind, Vec<Bson>)> {
        let collection = self.store.resolve_collection(&chain.collection).await?;
        let args = chain.base().map(|c| c.args.as_slice()).unwrap_or_default();
        let output = collection.invoke(plan.operation, args).await?;

        if !plan.modifiers.is_empty() && !output.is_cursor() {
            let call = &chain.calls[1];
            return Err(QueryError::unsupported_modifier(format!(
                "'{}' cannot be applied: {}() returned {}",
                call.name,
                plan.operation,
                output.describe()
            ))
            .at(call.span.start)
            .in_call(1)
            .into());
        }

        let materialized = match output {
            StoreOutput::Cursor(mut cursor) => {
                for modifier in plan.modifiers {
                    debug!("Applying modifier: {}", modifier.name());
                    cursor.apply_modifier(modifier)?;
                }
                let docs = cursor.drain_to_list().await?;
                (
                    ResultKind::Documents,
                    docs.into_iter().map(Bson::Document).collect(),
                )
            }
            StoreOutput::Document(doc) => (ResultKind::Document, vec![Bson::Document(doc)]),
            StoreOutput::Nothing => (ResultKind::Empty, Vec::new()),
            StoreOutput::Count(n) => (ResultKind::Count, vec![count_to_bson(n)]),
            StoreOutput::Values(values) => (ResultKind::Values, values),
        };

        Ok(materialized)
    }
}

fn count_to_bson(n: u64) -> Bson {
    i64::try_from(n).map_or(Bson::Double(n as f64), Bson::Int64)
}

/// Attach the query text; anything that is not already a query error is a
/// store fault and keeps its message.
fn tag_store_error(err: DocshellError, query: &str) -> DocshellError {
    match err {
        DocshellError::Query(e) => e.with_query(query).into(),
        other => QueryError::store(other.to_string())
            .with_query(query)
            .into(),
    }
}
