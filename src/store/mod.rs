//! Document store layer.
//!
//! All entities live in an external hierarchical document store. This module
//! defines the [`DocumentStore`] abstraction the service layer talks to and
//! two backends:
//!
//! - [`MemoryStore`] - in-process store used for development and tests
//! - [`FirestoreStore`] - Firestore REST v1 client
//!
//! Reads are point gets, collection listings and simple structured queries.
//! Writes go through [`DocumentStore::commit`], which applies a batch
//! atomically, so multi-document mutations never partially succeed.

pub mod firestore;
pub mod memory;
pub mod path;
pub mod query;
pub mod value;

use async_trait::async_trait;

use crate::error::StoreError;

pub use firestore::{FirestoreConfig, FirestoreStore};
pub use memory::MemoryStore;
pub use path::{CollectionPath, DocPath};
pub use query::{Cursor, Direction, Filter, FilterOp, Query};
pub use value::{Document, Fields, Value};

/// A single write inside a commit.
#[derive(Debug, Clone, PartialEq)]
pub enum Write {
    /// Create a document; fails if it already exists.
    Create { path: DocPath, fields: Fields },

    /// Merge top-level fields into an existing document; fails if missing.
    Update { path: DocPath, fields: Fields },

    /// Delete a document; succeeds when it is already absent.
    Delete { path: DocPath },
}

impl Write {
    pub fn path(&self) -> &DocPath {
        match self {
            Write::Create { path, .. } | Write::Update { path, .. } | Write::Delete { path } => {
                path
            }
        }
    }
}

/// Generate a fresh document id.
pub fn new_document_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Trait for hierarchical document stores.
///
/// Implementations must be thread-safe and usable from async handlers.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a document, `None` when it does not exist.
    async fn get(&self, path: &DocPath) -> Result<Option<Document>, StoreError>;

    /// All documents of a collection, in document-id order.
    async fn list(&self, collection: &CollectionPath) -> Result<Vec<Document>, StoreError>;

    /// Run a structured query against a collection.
    async fn query(
        &self,
        collection: &CollectionPath,
        query: &Query,
    ) -> Result<Vec<Document>, StoreError>;

    /// Apply all writes atomically, or none of them.
    async fn commit(&self, writes: Vec<Write>) -> Result<(), StoreError>;

    /// Create a document with a generated id and return the id.
    async fn create(&self, collection: &CollectionPath, fields: Fields) -> Result<String, StoreError> {
        let path = collection.doc(&new_document_id())?;
        let id = path.id().to_string();
        self.commit(vec![Write::Create { path, fields }]).await?;
        Ok(id)
    }

    /// Merge fields into an existing document.
    async fn update(&self, path: &DocPath, fields: Fields) -> Result<(), StoreError> {
        self.commit(vec![Write::Update {
            path: path.clone(),
            fields,
        }])
        .await
    }

    /// Delete a document.
    async fn delete(&self, path: &DocPath) -> Result<(), StoreError> {
        self.commit(vec![Write::Delete { path: path.clone() }]).await
    }
}

#[async_trait]
impl<T: DocumentStore + ?Sized> DocumentStore for std::sync::Arc<T> {
    async fn get(&self, path: &DocPath) -> Result<Option<Document>, StoreError> {
        (**self).get(path).await
    }

    async fn list(&self, collection: &CollectionPath) -> Result<Vec<Document>, StoreError> {
        (**self).list(collection).await
    }

    async fn query(
        &self,
        collection: &CollectionPath,
        query: &Query,
    ) -> Result<Vec<Document>, StoreError> {
        (**self).query(collection, query).await
    }

    async fn commit(&self, writes: Vec<Write>) -> Result<(), StoreError> {
        (**self).commit(writes).await
    }
}
