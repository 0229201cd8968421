//! In-process document store.
//!
//! Documents are kept in a single ordered map keyed by full document path,
//! which gives collection listings in document-id order for free. Commits
//! take the write lock once, check every precondition, then apply, so a
//! batch is all-or-nothing.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::path::{CollectionPath, DocPath};
use super::query::Query;
use super::value::{Document, Fields};
use super::{DocumentStore, Write};
use crate::error::StoreError;

/// Document store held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: RwLock<BTreeMap<DocPath, Fields>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a document directly, bypassing preconditions.
    /// Used to seed fixtures.
    pub async fn insert(&self, path: DocPath, fields: Fields) {
        self.documents.write().await.insert(path, fields);
    }

    /// Number of stored documents.
    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, path: &DocPath) -> Result<Option<Document>, StoreError> {
        let documents = self.documents.read().await;
        Ok(documents
            .get(path)
            .map(|fields| Document::new(path.id(), fields.clone())))
    }

    async fn list(&self, collection: &CollectionPath) -> Result<Vec<Document>, StoreError> {
        let documents = self.documents.read().await;
        Ok(documents
            .iter()
            .filter(|(path, _)| path.parent() == *collection)
            .map(|(path, fields)| Document::new(path.id(), fields.clone()))
            .collect())
    }

    async fn query(
        &self,
        collection: &CollectionPath,
        query: &Query,
    ) -> Result<Vec<Document>, StoreError> {
        let docs = self.list(collection).await?;
        Ok(query.apply(docs))
    }

    async fn commit(&self, writes: Vec<Write>) -> Result<(), StoreError> {
        let mut documents = self.documents.write().await;

        for write in &writes {
            match write {
                Write::Create { path, .. } if documents.contains_key(path) => {
                    return Err(StoreError::AlreadyExists(path.to_string()));
                }
                Write::Update { path, .. } if !documents.contains_key(path) => {
                    return Err(StoreError::NotFound(path.to_string()));
                }
                _ => {}
            }
        }

        debug!(writes = writes.len(), "Applying commit");
        for write in writes {
            match write {
                Write::Create { path, fields } => {
                    documents.insert(path, fields);
                }
                Write::Update { path, fields } => {
                    if let Some(existing) = documents.get_mut(&path) {
                        existing.extend(fields);
                    }
                }
                Write::Delete { path } => {
                    documents.remove(&path);
                }
            }
        }
        Ok(())
    }
}
