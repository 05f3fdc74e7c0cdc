//! In-memory content store, used by tests and `--memory` server runs.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use super::{ContentError, ContentQuery, ContentStore, Document, Resource};
use crate::uuid::new_document_id;

#[derive(Debug, Default)]
pub struct InMemoryContentStore {
    collections: RwLock<HashMap<Resource, Vec<Document>>>,
}

impl InMemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ContentStore for InMemoryContentStore {
    async fn list(
        &self,
        resource: Resource,
        query: &ContentQuery,
    ) -> Result<Vec<Document>, ContentError> {
        let collections = self.collections.read().await;
        let docs = collections.get(&resource).map(Vec::as_slice).unwrap_or_default();
        // Stored oldest first; ids are v7 so insertion order breaks timestamp ties.
        Ok(docs
            .iter()
            .rev()
            .filter(|d| query.matches(&d.data))
            .take(query.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn get(&self, resource: Resource, id: &str) -> Result<Option<Document>, ContentError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&resource)
            .and_then(|docs| docs.iter().find(|d| d.id == id))
            .cloned())
    }

    async fn insert(
        &self,
        resource: Resource,
        data: Map<String, Value>,
    ) -> Result<Document, ContentError> {
        let now = Utc::now();
        let doc = Document {
            id: new_document_id(),
            data,
            created_at: now,
            updated_at: now,
        };
        self.collections
            .write()
            .await
            .entry(resource)
            .or_default()
            .push(doc.clone());
        Ok(doc)
    }

    async fn update(
        &self,
        resource: Resource,
        id: &str,
        patch: Map<String, Value>,
    ) -> Result<Option<Document>, ContentError> {
        let mut collections = self.collections.write().await;
        let Some(doc) = collections
            .get_mut(&resource)
            .and_then(|docs| docs.iter_mut().find(|d| d.id == id))
        else {
            return Ok(None);
        };
        doc.data.extend(patch);
        doc.updated_at = Utc::now();
        Ok(Some(doc.clone()))
    }

    async fn delete(&self, resource: Resource, id: &str) -> Result<bool, ContentError> {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(&resource) else {
            return Ok(false);
        };
        let before = docs.len();
        docs.retain(|d| d.id != id);
        Ok(docs.len() < before)
    }

    async fn close(&self) -> Result<(), ContentError> {
        Ok(())
    }
}
