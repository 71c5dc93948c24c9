//! HTTP handlers, one module per resource.
//!
//! Every handler follows the same shape: parse path/body input, issue one or
//! two store calls (or a core component call), and wrap the result in
//! [`ApiResponse`](crate::response::ApiResponse). Ownership checks always run
//! after the not-found check.

use serde::{Deserialize, de::DeserializeOwned};
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    models::parse_id,
    query::{AggregateQuery, Page, Pipeline, QueryConfig, SortDirection},
    store::{Collection, Document, Predicate, StoreState, from_document},
};

pub mod likes;
pub mod media;
pub mod playlists;
pub mod subscriptions;
pub mod tweets;
pub mod users;
pub mod videos;

/// ListQueryParams
///
/// Raw listing parameters. Kept as strings so malformed numbers fall back to
/// defaults instead of failing extraction.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(rename_all = "camelCase", parameter_in = Query)]
pub struct ListQueryParams {
    /// 1-based page number (default 1).
    pub page: Option<String>,
    /// Page size (default 10).
    pub limit: Option<String>,
    /// Case-insensitive text matched against title and description.
    pub query: Option<String>,
    /// Field to sort on; defaults to the listing's natural timestamp.
    pub sort_by: Option<String>,
    /// `asc` or `desc` (default).
    pub sort_type: Option<String>,
    /// Restrict to one owner's videos.
    pub owner_id: Option<String>,
}

impl ListQueryParams {
    pub fn into_config(self) -> ApiResult<QueryConfig> {
        let owner_id = match self.owner_id.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(parse_id(raw, "owner")?),
        };
        Ok(QueryConfig {
            page: Page::parse(self.page.as_deref(), self.limit.as_deref()),
            sort_by: self.sort_by,
            sort_type: SortDirection::parse(self.sort_type.as_deref()),
            query: self.query,
            owner_id,
        })
    }
}

/// Loads one entity by id or fails with `NotFound("<what> not found")`.
pub(crate) async fn load<T: DeserializeOwned>(
    store: &StoreState,
    collection: Collection,
    id: Uuid,
    what: &str,
) -> ApiResult<T> {
    let doc = store
        .find_one(collection, &Predicate::id(id))
        .await?
        .ok_or_else(|| ApiError::not_found(format!("{} not found", what)))?;
    Ok(from_document(doc)?)
}

pub(crate) fn ensure_owner(owner: Uuid, actor: Uuid, what: &str) -> ApiResult<()> {
    if owner != actor {
        return Err(ApiError::forbidden(format!("Only the owner can modify this {}", what)));
    }
    Ok(())
}

/// Documents of `collection` owned by `owner`, newest first unless the caller asks otherwise.
pub(crate) async fn list_owned<T: DeserializeOwned>(
    store: &StoreState,
    collection: Collection,
    owner: Uuid,
    config: &QueryConfig,
) -> ApiResult<Vec<T>> {
    let pipeline = Pipeline::builder(collection)
        .matching(Predicate::eq("owner", owner.to_string()))
        .sort(config.sort_field("createdAt"), config.sort_type)
        .paginate(config.page)
        .build()?;

    let rows: Vec<Document> = AggregateQuery::new(store.clone()).run(&pipeline).await?;
    rows.into_iter()
        .map(|doc| from_document(doc).map_err(ApiError::from))
        .collect()
}
