//! Per-tab session state
//!
//! Each editor tab owns a [`TabSession`] keyed by a [`TabId`]. Tabs share
//! nothing mutable: the active schema is held behind an `Arc` and replaced
//! wholesale when the tab switches collection.
//!
//! Query submission is generation-counted. [`SessionRegistry::submit`] bumps
//! the tab's generation and hands back a [`Ticket`]; a result delivered with
//! an older ticket is stale and dropped. This is how a tab "cancels" a query
//! in flight: the store call still completes, its outcome is ignored.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DocshellError, Result};
use crate::executor::{ExecutionResult, QueryExecutor};
use crate::schema::Schema;

/// Opaque tab identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TabId(Uuid);

impl TabId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TabId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outcome of the last accepted query of a tab
#[derive(Debug, Clone)]
pub enum QueryOutcome {
    Completed(Arc<ExecutionResult>),
    /// Display form of the error
    Failed(String),
}

impl From<Result<ExecutionResult>> for QueryOutcome {
    fn from(outcome: Result<ExecutionResult>) -> Self {
        match outcome {
            Ok(result) => QueryOutcome::Completed(Arc::new(result)),
            Err(e) => QueryOutcome::Failed(e.to_string()),
        }
    }
}

/// What [`SessionRegistry::run`] delivered
#[derive(Debug, Clone)]
pub enum RunOutcome {
    /// The query was still current when it finished
    Current(QueryOutcome),
    /// A newer submission or a closed tab made the outcome stale
    Stale,
}

/// State of one editor tab
#[derive(Debug, Clone, Default)]
pub struct TabSession {
    pub query_text: String,
    pub active_schema: Option<Arc<Schema>>,
    pub last_result: Option<QueryOutcome>,
    pub generation: u64,
}

/// Proof of a submission, checked when its result comes back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub tab: TabId,
    pub generation: u64,
}

/// Registry of open tabs
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    tabs: Arc<RwLock<HashMap<TabId, TabSession>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new, empty tab
    pub async fn open_tab(&self) -> TabId {
        let id = TabId::new();
        self.tabs.write().await.insert(id, TabSession::default());
        debug!("Opened tab {}", id);
        id
    }

    /// Close a tab; results still in flight for it are dropped on arrival
    pub async fn close_tab(&self, tab: TabId) -> bool {
        self.tabs.write().await.remove(&tab).is_some()
    }

    pub async fn tab_count(&self) -> usize {
        self.tabs.read().await.len()
    }

    /// Copy of a tab's state
    pub async fn snapshot(&self, tab: TabId) -> Result<TabSession> {
        self.tabs
            .read()
            .await
            .get(&tab)
            .cloned()
            .ok_or_else(|| unknown_tab(tab))
    }

    /// Replace the tab's active schema
    pub async fn select_schema(&self, tab: TabId, schema: Option<Schema>) -> Result<()> {
        let mut tabs = self.tabs.write().await;
        let session = tabs.get_mut(&tab).ok_or_else(|| unknown_tab(tab))?;
        session.active_schema = schema.map(Arc::new);
        Ok(())
    }

    /// Active schema of a tab, shared read-only
    pub async fn active_schema(&self, tab: TabId) -> Result<Option<Arc<Schema>>> {
        Ok(self.snapshot(tab).await?.active_schema)
    }

    /// Start a query: store its text and advance the generation
    pub async fn submit(&self, tab: TabId, query: impl Into<String>) -> Result<Ticket> {
        let mut tabs = self.tabs.write().await;
        let session = tabs.get_mut(&tab).ok_or_else(|| unknown_tab(tab))?;
        session.query_text = query.into();
        session.generation += 1;
        Ok(Ticket {
            tab,
            generation: session.generation,
        })
    }

    /// Deliver the outcome of a submission
    ///
    /// Returns `false` and drops the outcome when the tab is gone or a newer
    /// query was submitted since `ticket` was issued.
    pub async fn finish(&self, ticket: Ticket, outcome: Result<ExecutionResult>) -> bool {
        self.deliver(ticket, outcome.into()).await
    }

    async fn deliver(&self, ticket: Ticket, outcome: QueryOutcome) -> bool {
        let mut tabs = self.tabs.write().await;
        let Some(session) = tabs.get_mut(&ticket.tab) else {
            debug!("Dropping result for closed tab {}", ticket.tab);
            return false;
        };

        if session.generation != ticket.generation {
            debug!(
                "Dropping stale result for tab {} (generation {} < {})",
                ticket.tab, ticket.generation, session.generation
            );
            return false;
        }

        session.last_result = Some(outcome);
        true
    }

    /// Submit `query` for `tab`, run it and deliver the outcome
    ///
    /// A failed query is still a current outcome; only a superseded one is
    /// [`RunOutcome::Stale`].
    pub async fn run(
        &self,
        tab: TabId,
        executor: &QueryExecutor,
        query: &str,
    ) -> Result<RunOutcome> {
        let ticket = self.submit(tab, query).await?;
        let outcome = QueryOutcome::from(executor.execute(query).await);
        if self.deliver(ticket, outcome.clone()).await {
            Ok(RunOutcome::Current(outcome))
        } else {
            Ok(RunOutcome::Stale)
        }
    }
}

fn unknown_tab(tab: TabId) -> DocshellError {
    DocshellError::Generic(format!("Unknown tab: {}", tab))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{BaseOperation, ResultKind};
    use crate::error::QueryError;

    fn result_with(count: usize) -> ExecutionResult {
        let items = (0..count).map(|i| mongodb::bson::Bson::Int32(i as i32)).collect();
        ExecutionResult::new(BaseOperation::Find, ResultKind::Documents, items, 1)
    }

    #[tokio::test]
    async fn test_open_and_close() {
        let registry = SessionRegistry::new();
        let a = registry.open_tab().await;
        let b = registry.open_tab().await;
        assert_ne!(a, b);
        assert_eq!(registry.tab_count().await, 2);

        assert!(registry.close_tab(a).await);
        assert!(!registry.close_tab(a).await);
        assert!(registry.snapshot(a).await.is_err());
    }

    #[tokio::test]
    async fn test_stale_result_is_discarded() {
        let registry = SessionRegistry::new();
        let tab = registry.open_tab().await;

        let first = registry.submit(tab, "db.users.find()").await.unwrap();
        let second = registry.submit(tab, "db.users.find({ a: 1 })").await.unwrap();
        assert!(second.generation > first.generation);

        // The slower first query arrives after the second was submitted
        assert!(!registry.finish(first, Ok(result_with(5))).await);
        assert!(registry.snapshot(tab).await.unwrap().last_result.is_none());

        assert!(registry.finish(second, Ok(result_with(1))).await);
        let session = registry.snapshot(tab).await.unwrap();
        assert_eq!(session.query_text, "db.users.find({ a: 1 })");
        match session.last_result {
            Some(QueryOutcome::Completed(result)) => assert_eq!(result.items.len(), 1),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_failed_outcome_is_recorded() {
        let registry = SessionRegistry::new();
        let tab = registry.open_tab().await;
        let ticket = registry.submit(tab, "db.users.nope()").await.unwrap();

        let err = QueryError::unknown_operation("nope").into();
        assert!(registry.finish(ticket, Err(err)).await);
        match registry.snapshot(tab).await.unwrap().last_result {
            Some(QueryOutcome::Failed(message)) => assert!(message.contains("nope")),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_result_for_closed_tab_is_dropped() {
        let registry = SessionRegistry::new();
        let tab = registry.open_tab().await;
        let ticket = registry.submit(tab, "db.users.find()").await.unwrap();
        registry.close_tab(tab).await;
        assert!(!registry.finish(ticket, Ok(result_with(0))).await);
    }

    #[tokio::test]
    async fn test_tabs_are_independent() {
        let registry = SessionRegistry::new();
        let a = registry.open_tab().await;
        let b = registry.open_tab().await;

        registry
            .select_schema(a, Some(Schema::new("users", vec!["name".into()])))
            .await
            .unwrap();
        let ticket_b = registry.submit(b, "db.orders.find()").await.unwrap();
        registry.submit(a, "db.users.find()").await.unwrap();

        // Submitting in tab a does not make tab b's result stale
        assert!(registry.finish(ticket_b, Ok(result_with(2))).await);
        assert!(registry.active_schema(b).await.unwrap().is_none());
        assert_eq!(
            registry.active_schema(a).await.unwrap().unwrap().collection(),
            "users"
        );
    }

    #[test]
    fn test_schema_is_replaced_not_mutated() {
        tokio_test::block_on(async {
            let registry = SessionRegistry::new();
            let tab = registry.open_tab().await;

            registry
                .select_schema(tab, Some(Schema::new("users", vec!["name".into()])))
                .await
                .unwrap();
            let held = registry.active_schema(tab).await.unwrap().unwrap();

            registry
                .select_schema(tab, Some(Schema::new("orders", vec!["total".into()])))
                .await
                .unwrap();

            // A reader holding the old schema still sees it unchanged
            assert_eq!(held.collection(), "users");
            assert!(held.contains("name"));
            let current = registry.active_schema(tab).await.unwrap().unwrap();
            assert_eq!(current.collection(), "orders");
        });
    }
}
