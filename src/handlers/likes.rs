use axum::extract::{Path, Query, State};

use super::ListQueryParams;
use crate::{
    AppState,
    auth::AuthUser,
    error::ApiResult,
    models::{RelationKind, ToggleResponse, ToggleState},
    query::{AggregateQuery, View},
    response::ApiResponse,
    store::Document,
    toggle::ToggleRelation,
};

async fn toggle_like(
    state: &AppState,
    actor: &AuthUser,
    kind: RelationKind,
    target: &str,
) -> ApiResult<ApiResponse<ToggleResponse>> {
    let outcome = ToggleRelation::new(state.store.clone())
        .toggle(actor.id, kind, target)
        .await?;
    let message = match outcome {
        ToggleState::Added => format!("{} like added", kind.noun()),
        ToggleState::Removed => format!("{} like removed", kind.noun()),
    };
    Ok(ApiResponse::ok(ToggleResponse { state: outcome }, message))
}

/// toggle_video_like
///
/// Likes the video, or removes the like if it already exists.
#[utoipa::path(
    post,
    path = "/likes/videos/{videoId}",
    params(("videoId" = String, Path, description = "Video ID")),
    responses(
        (status = 200, description = "New like state", body = ToggleResponse),
        (status = 400, description = "Malformed id"),
        (status = 404, description = "Video not found")
    )
)]
pub async fn toggle_video_like(
    actor: AuthUser,
    State(state): State<AppState>,
    Path(video_id): Path<String>,
) -> ApiResult<ApiResponse<ToggleResponse>> {
    toggle_like(&state, &actor, RelationKind::Video, &video_id).await
}

#[utoipa::path(
    post,
    path = "/likes/comments/{commentId}",
    params(("commentId" = String, Path, description = "Comment ID")),
    responses(
        (status = 200, description = "New like state", body = ToggleResponse),
        (status = 400, description = "Malformed id")
    )
)]
pub async fn toggle_comment_like(
    actor: AuthUser,
    State(state): State<AppState>,
    Path(comment_id): Path<String>,
) -> ApiResult<ApiResponse<ToggleResponse>> {
    toggle_like(&state, &actor, RelationKind::Comment, &comment_id).await
}

#[utoipa::path(
    post,
    path = "/likes/tweets/{tweetId}",
    params(("tweetId" = String, Path, description = "Tweet ID")),
    responses(
        (status = 200, description = "New like state", body = ToggleResponse),
        (status = 400, description = "Malformed id"),
        (status = 404, description = "Tweet not found")
    )
)]
pub async fn toggle_tweet_like(
    actor: AuthUser,
    State(state): State<AppState>,
    Path(tweet_id): Path<String>,
) -> ApiResult<ApiResponse<ToggleResponse>> {
    toggle_like(&state, &actor, RelationKind::Tweet, &tweet_id).await
}

/// get_liked_videos
///
/// Videos the caller has liked, each with `likes.count` and `likedAt`.
#[utoipa::path(
    get,
    path = "/likes/videos",
    params(ListQueryParams),
    responses((status = 200, description = "Liked videos, newest like first"))
)]
pub async fn get_liked_videos(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<ListQueryParams>,
) -> ApiResult<ApiResponse<Vec<Document>>> {
    let config = params.into_config()?;
    let liked = AggregateQuery::new(state.store.clone())
        .run_view(&View::LikedVideos { actor: id }, &config)
        .await?;
    Ok(ApiResponse::ok(liked, "Liked videos fetched successfully"))
}
