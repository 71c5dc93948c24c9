//! InMemoryDocumentStore - HashMap-backed store for local development and tests.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{
    Collection, Document, DocumentStore, ID_FIELD, Predicate, StoreError, StoreResult, UniqueKey,
    Update, apply_updates,
};

#[derive(Default)]
struct CollectionData {
    docs: BTreeMap<String, Document>,
    /// fingerprint -> id
    unique: HashMap<String, String>,
    /// id -> fingerprint, so deletes release the key.
    unique_by_id: HashMap<String, String>,
}

impl CollectionData {
    fn remove(&mut self, id: &str) -> Option<Document> {
        let doc = self.docs.remove(id)?;
        if let Some(fingerprint) = self.unique_by_id.remove(id) {
            self.unique.remove(&fingerprint);
        }
        Some(doc)
    }
}

/// In-memory document store.
///
/// Every operation takes the collection map's lock once, so the conditional
/// writes (`delete_one`, `insert_unique`) are atomic. Clone-friendly via Arc.
#[derive(Clone, Default)]
pub struct InMemoryDocumentStore {
    collections: Arc<RwLock<HashMap<Collection, CollectionData>>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents currently held by a collection.
    pub async fn count(&self, collection: Collection) -> usize {
        self.collections
            .read()
            .await
            .get(&collection)
            .map_or(0, |data| data.docs.len())
    }
}

fn document_id(doc: &Document) -> StoreResult<String> {
    match doc.get(ID_FIELD) {
        Some(Value::String(id)) if !id.is_empty() => Ok(id.clone()),
        _ => Err(StoreError::Corrupt("document is missing a string _id".into())),
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn find(&self, collection: Collection, filter: &Predicate) -> StoreResult<Vec<Document>> {
        let guard = self.collections.read().await;
        Ok(guard
            .get(&collection)
            .map(|data| {
                data.docs
                    .values()
                    .filter(|doc| filter.matches(doc))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn find_one(
        &self,
        collection: Collection,
        filter: &Predicate,
    ) -> StoreResult<Option<Document>> {
        let guard = self.collections.read().await;
        Ok(guard
            .get(&collection)
            .and_then(|data| data.docs.values().find(|doc| filter.matches(doc)).cloned()))
    }

    async fn insert(&self, collection: Collection, doc: Document) -> StoreResult<Document> {
        let id = document_id(&doc)?;
        let mut guard = self.collections.write().await;
        let data = guard.entry(collection).or_default();
        if data.docs.contains_key(&id) {
            return Err(StoreError::Conflict(format!("{}/{} already exists", collection, id)));
        }
        data.docs.insert(id, doc.clone());
        Ok(doc)
    }

    async fn insert_unique(
        &self,
        collection: Collection,
        key: &UniqueKey,
        doc: Document,
    ) -> StoreResult<Document> {
        let id = document_id(&doc)?;
        let fingerprint = key.fingerprint();

        let mut guard = self.collections.write().await;
        let data = guard.entry(collection).or_default();
        if data.unique.contains_key(&fingerprint) || data.docs.contains_key(&id) {
            return Err(StoreError::Conflict(format!(
                "{} already holds {}",
                collection, fingerprint
            )));
        }
        data.unique.insert(fingerprint.clone(), id.clone());
        data.unique_by_id.insert(id.clone(), fingerprint);
        data.docs.insert(id, doc.clone());
        Ok(doc)
    }

    async fn delete_by_id(&self, collection: Collection, id: &str) -> StoreResult<bool> {
        let mut guard = self.collections.write().await;
        Ok(guard
            .get_mut(&collection)
            .and_then(|data| data.remove(id))
            .is_some())
    }

    async fn delete_one(
        &self,
        collection: Collection,
        filter: &Predicate,
    ) -> StoreResult<Option<Document>> {
        let mut guard = self.collections.write().await;
        let Some(data) = guard.get_mut(&collection) else {
            return Ok(None);
        };
        let found = data
            .docs
            .iter()
            .find(|(_, doc)| filter.matches(doc))
            .map(|(id, _)| id.clone());
        Ok(found.and_then(|id| data.remove(&id)))
    }

    async fn update_by_id(
        &self,
        collection: Collection,
        id: &str,
        updates: &[Update],
    ) -> StoreResult<Option<Document>> {
        let mut guard = self.collections.write().await;
        let Some(doc) = guard
            .get_mut(&collection)
            .and_then(|data| data.docs.get_mut(id))
        else {
            return Ok(None);
        };
        apply_updates(doc, updates);
        Ok(Some(doc.clone()))
    }
}
