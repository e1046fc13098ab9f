//! Schema inference from sample documents
//!
//! A [`Schema`] is the set of dot-notation field paths seen in one or more
//! sample documents of a collection. It feeds field completion. Inference
//! from samples is an approximation: sparse or polymorphic fields that the
//! samples do not show are missing.

use std::collections::HashSet;

use mongodb::bson::{Bson, Document};

/// Walks documents and collects addressable field paths
///
/// Only embedded documents are descended into. Arrays, dates, ObjectIds,
/// binary values and other wrapper types are leaves even though they have
/// internal structure.
#[derive(Debug, Default)]
pub struct FieldExtractor {
    seen: HashSet<String>,
    paths: Vec<String>,
}

impl FieldExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Paths of one document, deduplicated, in traversal order
    pub fn extract(document: &Document) -> Vec<String> {
        let mut extractor = Self::new();
        extractor.add(document);
        extractor.finish()
    }

    /// Add a document's paths; paths already seen keep their position.
    pub fn add(&mut self, document: &Document) {
        self.walk(document, "");
    }

    pub fn finish(self) -> Vec<String> {
        self.paths
    }

    fn walk(&mut self, document: &Document, prefix: &str) {
        for (key, value) in document {
            let path = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{prefix}.{key}")
            };

            if self.seen.insert(path.clone()) {
                self.paths.push(path.clone());
            }

            if let Bson::Document(inner) = value {
                self.walk(inner, &path);
            }
        }
    }
}

/// Field paths inferred for one collection
///
/// Never mutated after construction; selecting another collection builds a
/// new one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    collection: String,
    fields: Vec<String>,
}

impl Schema {
    pub fn new(collection: impl Into<String>, fields: Vec<String>) -> Self {
        let mut seen = HashSet::new();
        let fields = fields
            .into_iter()
            .filter(|f| seen.insert(f.clone()))
            .collect();
        Self {
            collection: collection.into(),
            fields,
        }
    }

    /// Schema from a single sample; no sample gives an empty field set.
    pub fn infer(collection: impl Into<String>, sample: Option<&Document>) -> Self {
        Self {
            collection: collection.into(),
            fields: sample.map(FieldExtractor::extract).unwrap_or_default(),
        }
    }

    /// Schema from several samples: the union of their paths, first seen first.
    pub fn infer_many(collection: impl Into<String>, samples: &[Document]) -> Self {
        let mut extractor = FieldExtractor::new();
        for sample in samples {
            extractor.add(sample);
        }
        Self {
            collection: collection.into(),
            fields: extractor.finish(),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn contains(&self, path: &str) -> bool {
        self.fields.iter().any(|f| f == path)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
