//! Document-store capability interface
//!
//! The executor reaches the store only through these traits. Any store
//! fault surfaces as a `StoreError` carrying the store's own message.

use async_trait::async_trait;
use mongodb::bson::{Bson, Document};

use super::operation::{BaseOperation, CursorModifier};
use crate::error::Result;
use crate::parser::LiteralValue;

/// Entry point into a document store
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Get a handle on the named collection
    async fn resolve_collection(&self, name: &str) -> Result<Box<dyn CollectionHandle>>;

    /// Fetch one sample document, or `None` for an empty collection
    async fn sample_document(&self, collection: &str) -> Result<Option<Document>>;

    /// Fetch up to `count` sample documents
    ///
    /// Stores that cannot sample more than one document fall back to
    /// [`sample_document`](Self::sample_document).
    async fn sample_documents(&self, collection: &str, _count: usize) -> Result<Vec<Document>> {
        Ok(self.sample_document(collection).await?.into_iter().collect())
    }

    /// Names of the collections in the current database
    async fn list_collections(&self) -> Result<Vec<String>>;

    /// Document count and data size of each collection in the current
    /// database, sorted by name
    async fn collection_stats(&self) -> Result<Vec<CollectionInfo>>;

    /// Databases reachable through the store's connection
    async fn list_databases(&self) -> Result<Vec<DatabaseInfo>>;
}

/// Size information for one collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionInfo {
    pub name: String,
    pub document_count: u64,
    /// Uncompressed data size in bytes
    pub size_bytes: u64,
}

/// One database and the collections it holds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseInfo {
    pub name: String,
    pub size_on_disk: u64,
    pub collections: Vec<String>,
}

/// A collection that base operations run against
#[async_trait]
pub trait CollectionHandle: Send + Sync {
    fn name(&self) -> &str;

    /// Run an allow-listed operation with its parsed arguments
    async fn invoke(&self, operation: BaseOperation, args: &[LiteralValue]) -> Result<StoreOutput>;
}

/// A lazy cursor; nothing is fetched until [`drain_to_list`](Self::drain_to_list)
#[async_trait]
pub trait CursorHandle: Send {
    fn apply_modifier(&mut self, modifier: CursorModifier) -> Result<()>;

    async fn drain_to_list(&mut self) -> Result<Vec<Document>>;
}

/// What a base operation produced
pub enum StoreOutput {
    /// A single document (write acknowledgements included)
    Document(Document),
    /// No document, e.g. `findOne` without a match
    Nothing,
    Count(u64),
    /// A list of plain values, e.g. `distinct`
    Values(Vec<Bson>),
    Cursor(Box<dyn CursorHandle>),
}

impl StoreOutput {
    pub fn is_cursor(&self) -> bool {
        matches!(self, StoreOutput::Cursor(_))
    }

    /// Short description used in error messages
    pub fn describe(&self) -> &'static str {
        match self {
            StoreOutput::Document(_) => "a document",
            StoreOutput::Nothing => "no document",
            StoreOutput::Count(_) => "a count",
            StoreOutput::Values(_) => "a list of values",
            StoreOutput::Cursor(_) => "a cursor",
        }
    }
}

impl std::fmt::Debug for StoreOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreOutput::Document(doc) => f.debug_tuple("Document").field(doc).finish(),
            StoreOutput::Nothing => f.write_str("Nothing"),
            StoreOutput::Count(n) => f.debug_tuple("Count").field(n).finish(),
            StoreOutput::Values(values) => f.debug_tuple("Values").field(values).finish(),
            StoreOutput::Cursor(_) => f.write_str("Cursor(..)"),
        }
    }
}
