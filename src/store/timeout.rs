use async_trait::async_trait;
use std::{future::Future, time::Duration};

use super::{
    Collection, Document, DocumentStore, Predicate, StoreError, StoreResult, StoreState,
    UniqueKey, Update,
};

/// TimeoutStore
///
/// Decorator bounding every call on the wrapped store by a fixed deadline.
/// Pipelines run through the default `run_pipeline`, so each underlying
/// `find` gets its own deadline.
pub struct TimeoutStore {
    inner: StoreState,
    limit: Duration,
}

impl TimeoutStore {
    pub fn new(inner: StoreState, limit: Duration) -> Self {
        Self { inner, limit }
    }

    async fn bounded<T>(&self, call: impl Future<Output = StoreResult<T>>) -> StoreResult<T> {
        match tokio::time::timeout(self.limit, call).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(limit_ms = self.limit.as_millis() as u64, "store call timed out");
                Err(StoreError::Timeout(self.limit))
            }
        }
    }
}

#[async_trait]
impl DocumentStore for TimeoutStore {
    async fn find(&self, collection: Collection, filter: &Predicate) -> StoreResult<Vec<Document>> {
        self.bounded(self.inner.find(collection, filter)).await
    }

    async fn find_one(
        &self,
        collection: Collection,
        filter: &Predicate,
    ) -> StoreResult<Option<Document>> {
        self.bounded(self.inner.find_one(collection, filter)).await
    }

    async fn insert(&self, collection: Collection, doc: Document) -> StoreResult<Document> {
        self.bounded(self.inner.insert(collection, doc)).await
    }

    async fn insert_unique(
        &self,
        collection: Collection,
        key: &UniqueKey,
        doc: Document,
    ) -> StoreResult<Document> {
        self.bounded(self.inner.insert_unique(collection, key, doc))
            .await
    }

    async fn delete_by_id(&self, collection: Collection, id: &str) -> StoreResult<bool> {
        self.bounded(self.inner.delete_by_id(collection, id)).await
    }

    async fn delete_one(
        &self,
        collection: Collection,
        filter: &Predicate,
    ) -> StoreResult<Option<Document>> {
        self.bounded(self.inner.delete_one(collection, filter)).await
    }

    async fn update_by_id(
        &self,
        collection: Collection,
        id: &str,
        updates: &[Update],
    ) -> StoreResult<Option<Document>> {
        self.bounded(self.inner.update_by_id(collection, id, updates))
            .await
    }
}
