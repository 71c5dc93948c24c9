//! ToggleRelation: idempotent alternation of like/subscribe relations.

use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::{Relation, RelationKind, ToggleState, parse_id};
use crate::store::{Collection, Predicate, StoreError, StoreState, UniqueKey, to_document};

/// ToggleRelation
///
/// Flips the existence of the (actor, kind, target) relation. Each successful
/// call performs exactly one store mutation: an atomic delete-if-present, or
/// failing that an atomic insert-if-absent under the relation's uniqueness key.
#[derive(Clone)]
pub struct ToggleRelation {
    store: StoreState,
}

impl ToggleRelation {
    pub fn new(store: StoreState) -> Self {
        Self { store }
    }

    /// toggle
    ///
    /// Validates the target, then flips the relation. A lost insert race retries
    /// the whole flip once; a second loss surfaces as `Conflict`.
    pub async fn toggle(
        &self,
        actor: Uuid,
        kind: RelationKind,
        target_id: &str,
    ) -> ApiResult<ToggleState> {
        let target = parse_id(target_id, kind.as_str())?;

        if kind == RelationKind::Channel && target == actor {
            return Err(ApiError::invalid("self-reference not allowed"));
        }

        if let Some(collection) = kind.target_collection() {
            let exists = self
                .store
                .find_one(collection, &Predicate::id(target))
                .await?
                .is_some();
            if !exists {
                return Err(ApiError::not_found(format!("{} not found", kind.noun())));
            }
        }

        let key = UniqueKey::new(vec![
            ("actor", json!(actor.to_string())),
            ("kind", json!(kind.as_str())),
            ("target", json!(target.to_string())),
        ]);

        match self.flip(actor, kind, target, &key).await {
            Err(StoreError::Conflict(_)) => {
                tracing::debug!(%actor, %target, kind = kind.as_str(), "toggle lost a race, retrying");
                match self.flip(actor, kind, target, &key).await {
                    Err(StoreError::Conflict(detail)) => Err(ApiError::Conflict(format!(
                        "concurrent toggle on the same relation: {}",
                        detail
                    ))),
                    other => other.map_err(ApiError::from),
                }
            }
            other => other.map_err(ApiError::from),
        }
    }

    async fn flip(
        &self,
        actor: Uuid,
        kind: RelationKind,
        target: Uuid,
        key: &UniqueKey,
    ) -> Result<ToggleState, StoreError> {
        if self
            .store
            .delete_one(Collection::Relations, &key.as_predicate())
            .await?
            .is_some()
        {
            tracing::info!(%actor, %target, kind = kind.as_str(), "relation removed");
            return Ok(ToggleState::Removed);
        }

        let relation = Relation {
            id: Uuid::new_v4(),
            actor,
            kind,
            target,
            created_at: Utc::now(),
        };
        self.store
            .insert_unique(Collection::Relations, key, to_document(&relation)?)
            .await?;
        tracing::info!(%actor, %target, kind = kind.as_str(), "relation added");
        Ok(ToggleState::Added)
    }
}
