//! Document-store adapter.
//!
//! The only coupling point between the core components and a concrete storage
//! engine. Documents are schema-flexible JSON objects keyed by `_id`.

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use std::{sync::Arc, time::Duration};
use thiserror::Error;

use crate::query::{self, Pipeline};

pub mod memory;
pub mod postgres;
pub mod predicate;
pub mod timeout;

pub use memory::InMemoryDocumentStore;
pub use postgres::PostgresDocumentStore;
pub use predicate::Predicate;
pub use timeout::TimeoutStore;

/// A stored record.
pub type Document = Map<String, Value>;

/// Primary-key field of every document.
pub const ID_FIELD: &str = "_id";

/// Collection
///
/// The closed set of collections this service persists, with the fields each one declares.
/// Field declarations back the query layer's "unknown field" validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Users,
    Videos,
    Relations,
    Playlists,
    Tweets,
}

impl Collection {
    pub fn name(&self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Videos => "videos",
            Collection::Relations => "relations",
            Collection::Playlists => "playlists",
            Collection::Tweets => "tweets",
        }
    }

    pub fn fields(&self) -> &'static [&'static str] {
        match self {
            Collection::Users => &[
                "_id",
                "username",
                "email",
                "fullName",
                "avatar",
                "coverImage",
                "createdAt",
            ],
            Collection::Videos => &[
                "_id",
                "owner",
                "videoFile",
                "thumbnail",
                "title",
                "description",
                "duration",
                "views",
                "isPublished",
                "createdAt",
                "updatedAt",
            ],
            Collection::Relations => &["_id", "actor", "kind", "target", "createdAt"],
            Collection::Playlists => &[
                "_id",
                "owner",
                "name",
                "description",
                "videos",
                "createdAt",
                "updatedAt",
            ],
            Collection::Tweets => &["_id", "owner", "content", "createdAt", "updatedAt"],
        }
    }

    pub fn declares(&self, field: &str) -> bool {
        self.fields().contains(&field)
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Update
///
/// Field-level mutation applied atomically by [`DocumentStore::update_by_id`].
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    Set(String, Value),
    /// Appends to an array field unless the value is already present.
    AddToSet(String, Value),
    /// Removes every occurrence of the value from an array field.
    Pull(String, Value),
    /// Negates a boolean field in place; a missing field counts as `false`.
    Toggle(String),
}

impl Update {
    pub fn set(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Update::Set(field.into(), value.into())
    }
}

/// Applies updates in order to an in-process copy of a document.
pub fn apply_updates(doc: &mut Document, updates: &[Update]) {
    for update in updates {
        match update {
            Update::Set(field, value) => {
                predicate::set_path(doc, field, value.clone());
            }
            Update::AddToSet(field, value) => {
                let entry = doc
                    .entry(field.clone())
                    .or_insert_with(|| Value::Array(Vec::new()));
                if !entry.is_array() {
                    *entry = Value::Array(Vec::new());
                }
                if let Value::Array(items) = entry {
                    if !items.contains(value) {
                        items.push(value.clone());
                    }
                }
            }
            Update::Pull(field, value) => {
                if let Some(Value::Array(items)) = doc.get_mut(field.as_str()) {
                    items.retain(|item| item != value);
                }
            }
            Update::Toggle(field) => {
                let current = predicate::get_path(doc, field)
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                predicate::set_path(doc, field, Value::Bool(!current));
            }
        }
    }
}

/// UniqueKey
///
/// A set of equality constraints that at most one document per collection may satisfy.
/// Stores enforce it with a uniqueness index on [`UniqueKey::fingerprint`].
#[derive(Debug, Clone, PartialEq)]
pub struct UniqueKey(Vec<(String, Value)>);

impl UniqueKey {
    pub fn new(parts: Vec<(&str, Value)>) -> Self {
        let mut parts: Vec<(String, Value)> =
            parts.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
        parts.sort_by(|a, b| a.0.cmp(&b.0));
        UniqueKey(parts)
    }

    /// Canonical string form, stable across field order.
    pub fn fingerprint(&self) -> String {
        self.0
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&")
    }

    pub fn as_predicate(&self) -> Predicate {
        Predicate::and(
            self.0
                .iter()
                .map(|(k, v)| Predicate::Eq(k.clone(), v.clone()))
                .collect(),
        )
    }
}

/// StoreError
///
/// Failures raised by storage adapters. Converted into [`crate::error::ApiError`] at the core boundary.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("uniqueness violation: {0}")]
    Conflict(String),

    #[error("store call exceeded {0:?}")]
    Timeout(Duration),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("corrupt document: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// DocumentStore
///
/// Minimal capability set the toggle and aggregation components depend on.
/// `delete_one` and `insert_unique` are the atomic conditional writes that keep
/// relation toggles race-free: implementations must make each of them a single
/// indivisible step against concurrent callers.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find(&self, collection: Collection, filter: &Predicate) -> StoreResult<Vec<Document>>;

    async fn find_one(
        &self,
        collection: Collection,
        filter: &Predicate,
    ) -> StoreResult<Option<Document>>;

    /// Inserts a document; its `_id` must be set by the caller.
    async fn insert(&self, collection: Collection, doc: Document) -> StoreResult<Document>;

    /// Inserts a document unless another one already holds `key`.
    /// Fails with [`StoreError::Conflict`] when the key is taken.
    async fn insert_unique(
        &self,
        collection: Collection,
        key: &UniqueKey,
        doc: Document,
    ) -> StoreResult<Document>;

    async fn delete_by_id(&self, collection: Collection, id: &str) -> StoreResult<bool>;

    /// Deletes the first document matching `filter` and returns it.
    async fn delete_one(
        &self,
        collection: Collection,
        filter: &Predicate,
    ) -> StoreResult<Option<Document>>;

    /// Applies `updates` and returns the new document, or `None` when `id` is absent.
    async fn update_by_id(
        &self,
        collection: Collection,
        id: &str,
        updates: &[Update],
    ) -> StoreResult<Option<Document>>;

    /// Executes an aggregation pipeline. The default runs the stages in process
    /// on top of `find`.
    async fn run_pipeline(&self, pipeline: &Pipeline) -> StoreResult<Vec<Document>> {
        query::execute(self, pipeline).await
    }
}

/// StoreState
///
/// The shared handle to the persistence layer held by the application state.
pub type StoreState = Arc<dyn DocumentStore>;

pub fn to_document<T: Serialize>(value: &T) -> StoreResult<Document> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(StoreError::Corrupt(format!(
            "expected an object, got {}",
            other
        ))),
        Err(e) => Err(StoreError::Corrupt(e.to_string())),
    }
}

pub fn from_document<T: DeserializeOwned>(doc: Document) -> StoreResult<T> {
    serde_json::from_value(Value::Object(doc)).map_err(|e| StoreError::Corrupt(e.to_string()))
}
