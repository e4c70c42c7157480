//! Document store
//!
//! Schema-flexible documents grouped in named collections, addressed by
//! path. Supports equality-filtered queries on a single collection and
//! collection group queries across every sub-collection sharing a name.
//! There are no multi-document transactions and no concurrency tokens:
//! concurrent updates to the same document silently last-write-win.

mod sqlite;

pub use sqlite::SqliteDocumentStore;

use async_trait::async_trait;
use serde_json::Value;
use ww_common::models::{Entity, Fields};
use ww_common::paths::{CollectionPath, DocPath};
use ww_common::Result;

/// A stored document
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub path: DocPath,
    pub fields: Fields,
}

impl Document {
    pub fn id(&self) -> &str {
        self.path.id()
    }

    /// Decode into a typed entity
    pub fn into_entity<T: Entity>(self) -> Result<T> {
        let id = self.path.id().to_string();
        T::from_document(&id, self.fields)
    }
}

/// Equality filter on a top-level field (`where field == value`); a
/// missing field only matches `null`
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub value: Value,
}

impl Filter {
    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Self {
            field: field.to_string(),
            value: value.into(),
        }
    }
}

/// Remote document database collaborator
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create (or overwrite) a document
    async fn set(&self, path: &DocPath, fields: Fields) -> Result<()>;

    /// Merge fields into an existing document; `NotFound` if it is missing
    async fn update(&self, path: &DocPath, fields: Fields) -> Result<()>;

    async fn get(&self, path: &DocPath) -> Result<Option<Document>>;

    /// Documents of one collection matching every filter
    async fn query(&self, collection: &CollectionPath, filters: &[Filter])
        -> Result<Vec<Document>>;

    /// Documents of every collection whose id is `collection_id`
    async fn collection_group(
        &self,
        collection_id: &str,
        filters: &[Filter],
    ) -> Result<Vec<Document>>;
}
