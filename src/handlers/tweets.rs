use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::Utc;
use serde_json::{Value, json};
use uuid::Uuid;

use super::{ListQueryParams, ensure_owner, list_owned, load};
use crate::{
    AppState,
    auth::AuthUser,
    error::{ApiError, ApiResult},
    models::{Tweet, TweetRequest, parse_id, require_text},
    response::ApiResponse,
    store::{Collection, Update, from_document, to_document},
};

#[utoipa::path(
    post,
    path = "/tweets",
    request_body = TweetRequest,
    responses(
        (status = 201, description = "Created", body = Tweet),
        (status = 400, description = "Empty content")
    )
)]
pub async fn create_tweet(
    AuthUser { id: owner, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<TweetRequest>,
) -> ApiResult<ApiResponse<Tweet>> {
    let content = require_text(&payload.content, "Content is required")?;
    let now = Utc::now();
    let tweet = Tweet {
        id: Uuid::new_v4(),
        owner,
        content,
        created_at: now,
        updated_at: now,
    };
    state
        .store
        .insert(Collection::Tweets, to_document(&tweet)?)
        .await?;
    Ok(ApiResponse::created(tweet, "Tweet created successfully"))
}

#[utoipa::path(
    get,
    path = "/tweets/users/{userId}",
    params(
        ("userId" = String, Path, description = "Owner ID"),
        ListQueryParams
    ),
    responses((status = 200, description = "Tweets, newest first", body = [Tweet]))
)]
pub async fn get_user_tweets(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(params): Query<ListQueryParams>,
) -> ApiResult<ApiResponse<Vec<Tweet>>> {
    let owner = parse_id(&user_id, "user")?;
    let config = params.into_config()?;
    let tweets = list_owned(&state.store, Collection::Tweets, owner, &config).await?;
    Ok(ApiResponse::ok(tweets, "Tweets fetched successfully"))
}

async fn owned_tweet(state: &AppState, raw_id: &str, actor: Uuid) -> ApiResult<Tweet> {
    let id = parse_id(raw_id, "tweet")?;
    let tweet: Tweet = load(&state.store, Collection::Tweets, id, "Tweet").await?;
    ensure_owner(tweet.owner, actor, "tweet")?;
    Ok(tweet)
}

#[utoipa::path(
    patch,
    path = "/tweets/{tweetId}",
    params(("tweetId" = String, Path, description = "Tweet ID")),
    request_body = TweetRequest,
    responses(
        (status = 200, description = "Updated", body = Tweet),
        (status = 403, description = "Not Owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_tweet(
    AuthUser { id: actor, .. }: AuthUser,
    State(state): State<AppState>,
    Path(tweet_id): Path<String>,
    Json(payload): Json<TweetRequest>,
) -> ApiResult<ApiResponse<Tweet>> {
    let content = require_text(&payload.content, "Content is required")?;
    let tweet = owned_tweet(&state, &tweet_id, actor).await?;

    let doc = state
        .store
        .update_by_id(
            Collection::Tweets,
            &tweet.id.to_string(),
            &[
                Update::set("content", content),
                Update::set("updatedAt", json!(Utc::now())),
            ],
        )
        .await?
        .ok_or_else(|| ApiError::not_found("Tweet not found"))?;
    Ok(ApiResponse::ok(from_document(doc)?, "Tweet updated successfully"))
}

#[utoipa::path(
    delete,
    path = "/tweets/{tweetId}",
    params(("tweetId" = String, Path, description = "Tweet ID")),
    responses(
        (status = 200, description = "Deleted"),
        (status = 403, description = "Not Owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_tweet(
    AuthUser { id: actor, .. }: AuthUser,
    State(state): State<AppState>,
    Path(tweet_id): Path<String>,
) -> ApiResult<ApiResponse<Value>> {
    let tweet = owned_tweet(&state, &tweet_id, actor).await?;
    if !state
        .store
        .delete_by_id(Collection::Tweets, &tweet.id.to_string())
        .await?
    {
        return Err(ApiError::not_found("Tweet not found"));
    }
    Ok(ApiResponse::ok(json!({}), "Tweet deleted successfully"))
}
