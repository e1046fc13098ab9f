//! MongoDB-backed document store
//!
//! Maps the allow-listed operations onto the official driver. Cursors are
//! lazy: `sort`, `limit` and `skip` accumulate on a [`MongoCursor`] and the
//! query only runs when it is drained. `explain` swaps the query for an
//! `explain` command whose reply is the single result document.
//!
//! Collection sizes come from `collStats`; views have no storage and are
//! left out of that listing.

use async_trait::async_trait;
use futures::stream::TryStreamExt;
use mongodb::bson::{doc, Bson, Document};
use mongodb::options::{FindOneOptions, FindOptions, UpdateModifications, UpdateOptions};
use mongodb::{Client, Collection, Database};
use tracing::debug;

use super::operation::{BaseOperation, CursorModifier, ExplainVerbosity};
use super::store::{
    CollectionHandle, CollectionInfo, CursorHandle, DatabaseInfo, DocumentStore, StoreOutput,
};
use crate::error::{QueryError, Result};
use crate::parser::LiteralValue;

/// [`DocumentStore`] over one MongoDB database
#[derive(Clone, Debug)]
pub struct MongoStore {
    client: Client,
    database: Database,
}

impl MongoStore {
    pub fn new(client: Client, database: &str) -> Self {
        let database = client.database(database);
        Self { client, database }
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn resolve_collection(&self, name: &str) -> Result<Box<dyn CollectionHandle>> {
        Ok(Box::new(MongoCollection {
            database: self.database.clone(),
            name: name.to_string(),
        }))
    }

    async fn sample_document(&self, collection: &str) -> Result<Option<Document>> {
        let coll: Collection<Document> = self.database.collection(collection);
        Ok(coll.find_one(doc! {}).await?)
    }

    async fn sample_documents(&self, collection: &str, count: usize) -> Result<Vec<Document>> {
        let coll: Collection<Document> = self.database.collection(collection);
        let size = i64::try_from(count).unwrap_or(i64::MAX);
        let cursor = coll.aggregate(vec![doc! { "$sample": { "size": size } }]).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn list_collections(&self) -> Result<Vec<String>> {
        let mut names = self.database.list_collection_names().await?;
        names.sort();
        Ok(names)
    }

    async fn collection_stats(&self) -> Result<Vec<CollectionInfo>> {
        let mut names = self
            .database
            .list_collection_names()
            .filter(doc! { "type": "collection" })
            .await?;
        names.sort();

        let mut stats = Vec::with_capacity(names.len());
        for name in names {
            let reply = self
                .database
                .run_command(doc! { "collStats": name.as_str() })
                .await?;
            stats.push(CollectionInfo {
                document_count: stat_u64(&reply, "count"),
                size_bytes: stat_u64(&reply, "size"),
                name,
            });
        }
        debug!(
            "Collected stats for {} collection(s) in '{}'",
            stats.len(),
            self.database.name()
        );
        Ok(stats)
    }

    async fn list_databases(&self) -> Result<Vec<DatabaseInfo>> {
        let entries = self.client.list_databases().await?;

        let mut databases = Vec::with_capacity(entries.len());
        for entry in entries {
            let mut collections = self
                .client
                .database(&entry.name)
                .list_collection_names()
                .await?;
            collections.sort();
            databases.push(DatabaseInfo {
                name: entry.name,
                size_on_disk: entry.size_on_disk,
                collections,
            });
        }
        databases.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(databases)
    }
}

/// Numeric field of a command reply; servers send these as any BSON number
fn stat_u64(reply: &Document, key: &str) -> u64 {
    match reply.get(key) {
        Some(Bson::Int32(n)) => u64::try_from(*n).unwrap_or(0),
        Some(Bson::Int64(n)) => u64::try_from(*n).unwrap_or(0),
        Some(Bson::Double(n)) if *n > 0.0 => *n as u64,
        _ => 0,
    }
}

/// Collection handle bound to a database
struct MongoCollection {
    database: Database,
    name: String,
}

#[async_trait]
impl CollectionHandle for MongoCollection {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(&self, operation: BaseOperation, args: &[LiteralValue]) -> Result<StoreOutput> {
        debug!(
            "Invoking {} on collection '{}' with {} argument(s)",
            operation,
            self.name,
            args.len()
        );

        let op = operation.name();
        let coll: Collection<Document> = self.database.collection(&self.name);

        match operation {
            BaseOperation::Find => {
                check_arity(op, args, 2)?;
                let filter = document_arg(op, args, 0, "filter")?.unwrap_or_default();
                let projection = document_arg(op, args, 1, "projection")?;
                Ok(StoreOutput::Cursor(Box::new(MongoCursor::new(
                    self.database.clone(),
                    &self.name,
                    CursorSource::Find { filter, projection },
                ))))
            }

            BaseOperation::FindOne => {
                check_arity(op, args, 2)?;
                let filter = document_arg(op, args, 0, "filter")?.unwrap_or_default();
                let mut options = FindOneOptions::default();
                options.projection = document_arg(op, args, 1, "projection")?;

                match coll.find_one(filter).with_options(options).await? {
                    Some(document) => Ok(StoreOutput::Document(document)),
                    None => Ok(StoreOutput::Nothing),
                }
            }

            BaseOperation::InsertOne => {
                check_arity(op, args, 1)?;
                let document = required_document(op, args, 0, "document")?;
                let result = coll.insert_one(document).await?;
                Ok(StoreOutput::Document(doc! {
                    "acknowledged": true,
                    "insertedId": result.inserted_id,
                }))
            }

            BaseOperation::InsertMany => {
                check_arity(op, args, 1)?;
                let documents = document_list_arg(op, args, 0, "documents")?;
                if documents.is_empty() {
                    return Err(
                        QueryError::invalid_argument("insertMany() requires at least one document")
                            .into(),
                    );
                }
                let result = coll.insert_many(documents).await?;
                let mut ids: Vec<(usize, Bson)> = result.inserted_ids.into_iter().collect();
                ids.sort_by_key(|(index, _)| *index);
                let ids: Vec<Bson> = ids.into_iter().map(|(_, id)| id).collect();
                Ok(StoreOutput::Document(doc! {
                    "acknowledged": true,
                    "insertedIds": ids,
                }))
            }

            BaseOperation::UpdateOne | BaseOperation::UpdateMany => {
                check_arity(op, args, 3)?;
                let filter = required_document(op, args, 0, "filter")?;
                let update = update_arg(op, args, 1)?;
                let mut options = UpdateOptions::default();
                if let Some(opts) = document_arg(op, args, 2, "options")? {
                    options.upsert = opts.get_bool("upsert").ok();
                }

                let result = if operation == BaseOperation::UpdateOne {
                    coll.update_one(filter, update).with_options(options).await?
                } else {
                    coll.update_many(filter, update).with_options(options).await?
                };

                let mut reply = doc! {
                    "acknowledged": true,
                    "matchedCount": count_bson(result.matched_count),
                    "modifiedCount": count_bson(result.modified_count),
                };
                if let Some(id) = result.upserted_id {
                    reply.insert("upsertedId", id);
                }
                Ok(StoreOutput::Document(reply))
            }

            BaseOperation::DeleteOne | BaseOperation::DeleteMany => {
                check_arity(op, args, 1)?;
                let filter = required_document(op, args, 0, "filter")?;
                let result = if operation == BaseOperation::DeleteOne {
                    coll.delete_one(filter).await?
                } else {
                    coll.delete_many(filter).await?
                };
                Ok(StoreOutput::Document(doc! {
                    "acknowledged": true,
                    "deletedCount": count_bson(result.deleted_count),
                }))
            }

            BaseOperation::Aggregate => {
                let pipeline = pipeline_arg(op, args)?;
                Ok(StoreOutput::Cursor(Box::new(MongoCursor::new(
                    self.database.clone(),
                    &self.name,
                    CursorSource::Aggregate { pipeline },
                ))))
            }

            BaseOperation::CountDocuments => {
                check_arity(op, args, 1)?;
                let filter = document_arg(op, args, 0, "filter")?.unwrap_or_default();
                let count = coll.count_documents(filter).await?;
                Ok(StoreOutput::Count(count))
            }

            BaseOperation::Distinct => {
                check_arity(op, args, 2)?;
                let field = match args.first() {
                    Some(LiteralValue::String(field)) => field.clone(),
                    Some(other) => {
                        return Err(QueryError::invalid_argument(format!(
                            "distinct() expects a field name string, got {}",
                            other.type_name()
                        ))
                        .into());
                    }
                    None => {
                        return Err(
                            QueryError::invalid_argument("distinct() requires a field name").into(),
                        );
                    }
                };
                let filter = document_arg(op, args, 1, "filter")?.unwrap_or_default();
                let values = coll.distinct(field, filter).await?;
                Ok(StoreOutput::Values(values))
            }
        }
    }
}

/// What a cursor runs when drained
#[derive(Debug, Clone)]
enum CursorSource {
    Find {
        filter: Document,
        projection: Option<Document>,
    },
    Aggregate {
        pipeline: Vec<Document>,
    },
}

/// Lazy cursor over a find or aggregate
#[derive(Debug)]
struct MongoCursor {
    database: Database,
    collection: String,
    source: CursorSource,
    sort: Option<Document>,
    limit: Option<u64>,
    skip: Option<u64>,
    explain: Option<ExplainVerbosity>,
}

impl MongoCursor {
    fn new(database: Database, collection: &str, source: CursorSource) -> Self {
        Self {
            database,
            collection: collection.to_string(),
            source,
            sort: None,
            limit: None,
            skip: None,
            explain: None,
        }
    }

    /// The command an `explain` wraps
    fn explained_command(&self) -> Result<Document> {
        let command = match &self.source {
            CursorSource::Find { filter, projection } => {
                let mut command = doc! { "find": self.collection.as_str(), "filter": filter.clone() };
                if let Some(projection) = projection {
                    command.insert("projection", projection.clone());
                }
                if let Some(sort) = &self.sort {
                    command.insert("sort", sort.clone());
                }
                if let Some(skip) = self.skip {
                    command.insert("skip", to_i64("skip", skip)?);
                }
                if let Some(limit) = self.limit.filter(|l| *l > 0) {
                    command.insert("limit", to_i64("limit", limit)?);
                }
                command
            }
            CursorSource::Aggregate { pipeline } => doc! {
                "aggregate": self.collection.as_str(),
                "pipeline": pipeline.clone(),
                "cursor": {},
            },
        };
        Ok(command)
    }
}

#[async_trait]
impl CursorHandle for MongoCursor {
    fn apply_modifier(&mut self, modifier: CursorModifier) -> Result<()> {
        match (&mut self.source, modifier) {
            (_, CursorModifier::Explain(verbosity)) => self.explain = Some(verbosity),

            // Pipeline cursors take modifiers as trailing stages, in order.
            (CursorSource::Aggregate { pipeline }, CursorModifier::Sort(spec)) => {
                pipeline.push(doc! { "$sort": spec });
            }
            (CursorSource::Aggregate { pipeline }, CursorModifier::Skip(n)) => {
                pipeline.push(doc! { "$skip": to_i64("skip", n)? });
            }
            (CursorSource::Aggregate { pipeline }, CursorModifier::Limit(n)) => {
                if n > 0 {
                    pipeline.push(doc! { "$limit": to_i64("limit", n)? });
                }
            }

            (CursorSource::Find { .. }, CursorModifier::Sort(spec)) => self.sort = Some(spec),
            (CursorSource::Find { .. }, CursorModifier::Skip(n)) => self.skip = Some(n),
            (CursorSource::Find { .. }, CursorModifier::Limit(n)) => self.limit = Some(n),
        }
        Ok(())
    }

    async fn drain_to_list(&mut self) -> Result<Vec<Document>> {
        if let Some(verbosity) = self.explain {
            let command = doc! {
                "explain": self.explained_command()?,
                "verbosity": verbosity.as_str(),
            };
            debug!("Running explain on '{}'", self.collection);
            let reply = self.database.run_command(command).await?;
            return Ok(vec![reply]);
        }

        let coll: Collection<Document> = self.database.collection(&self.collection);

        let cursor = match &self.source {
            CursorSource::Find { filter, projection } => {
                let mut find_options = FindOptions::default();
                find_options.projection = projection.clone();
                find_options.sort = self.sort.clone();
                find_options.skip = self.skip;
                // limit(0) means no limit
                if let Some(limit) = self.limit.filter(|l| *l > 0) {
                    find_options.limit = Some(to_i64("limit", limit)?);
                }
                coll.find(filter.clone()).with_options(find_options).await?
            }
            CursorSource::Aggregate { pipeline } => coll.aggregate(pipeline.clone()).await?,
        };

        let documents: Vec<Document> = cursor.try_collect().await?;
        debug!(
            "Drained {} document(s) from '{}'",
            documents.len(),
            self.collection
        );
        Ok(documents)
    }
}

/* ========================= Argument conversion ========================= */

fn check_arity(op: &str, args: &[LiteralValue], max: usize) -> Result<()> {
    if args.len() > max {
        return Err(QueryError::invalid_argument(format!(
            "{op}() takes at most {max} argument(s), got {}",
            args.len()
        ))
        .into());
    }
    Ok(())
}

/// Optional object argument at `index`
fn document_arg(op: &str, args: &[LiteralValue], index: usize, what: &str) -> Result<Option<Document>> {
    match args.get(index) {
        None => Ok(None),
        Some(LiteralValue::Object(obj)) => Ok(Some(obj.to_document())),
        Some(other) => Err(QueryError::invalid_argument(format!(
            "{op}() expects {what} to be an object, got {}",
            other.type_name()
        ))
        .into()),
    }
}

fn required_document(op: &str, args: &[LiteralValue], index: usize, what: &str) -> Result<Document> {
    document_arg(op, args, index, what)?.ok_or_else(|| {
        QueryError::invalid_argument(format!("{op}() requires a {what} object")).into()
    })
}

/// Array-of-objects argument at `index`
fn document_list_arg(op: &str, args: &[LiteralValue], index: usize, what: &str) -> Result<Vec<Document>> {
    match args.get(index) {
        Some(LiteralValue::Array(items)) => items
            .iter()
            .map(|item| -> Result<Document> {
                match item {
                    LiteralValue::Object(obj) => Ok(obj.to_document()),
                    other => Err(QueryError::invalid_argument(format!(
                        "{op}() expects {what} to contain only objects, got {}",
                        other.type_name()
                    ))
                    .into()),
                }
            })
            .collect(),
        Some(other) => Err(QueryError::invalid_argument(format!(
            "{op}() expects {what} to be an array, got {}",
            other.type_name()
        ))
        .into()),
        None => Err(QueryError::invalid_argument(format!("{op}() requires {what}")).into()),
    }
}

/// Update document or update pipeline
fn update_arg(op: &str, args: &[LiteralValue], index: usize) -> Result<UpdateModifications> {
    match args.get(index) {
        Some(LiteralValue::Object(obj)) => Ok(UpdateModifications::Document(obj.to_document())),
        Some(LiteralValue::Array(_)) => Ok(UpdateModifications::Pipeline(document_list_arg(
            op, args, index, "the update pipeline",
        )?)),
        Some(other) => Err(QueryError::invalid_argument(format!(
            "{op}() expects an update object or pipeline, got {}",
            other.type_name()
        ))
        .into()),
        None => Err(QueryError::invalid_argument(format!("{op}() requires an update")).into()),
    }
}

/// `aggregate([stages])`, or stages passed as separate arguments
fn pipeline_arg(op: &str, args: &[LiteralValue]) -> Result<Vec<Document>> {
    match args {
        [] => Ok(Vec::new()),
        [LiteralValue::Array(_)] => document_list_arg(op, args, 0, "the pipeline"),
        [LiteralValue::Array(_), LiteralValue::Object(_)] => {
            // Trailing aggregate options are accepted and ignored.
            document_list_arg(op, args, 0, "the pipeline")
        }
        stages => stages
            .iter()
            .enumerate()
            .map(|(i, _)| required_document(op, stages, i, "each pipeline stage"))
            .collect(),
    }
}

fn to_i64(name: &str, n: u64) -> Result<i64> {
    i64::try_from(n).map_err(|_| {
        QueryError::invalid_argument(format!("{name} value {n} is too large (max: {})", i64::MAX))
            .into()
    })
}

fn count_bson(n: u64) -> Bson {
    i64::try_from(n).map_or(Bson::Double(n as f64), Bson::Int64)
}
