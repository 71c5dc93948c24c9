use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::Utc;
use serde_json::{Value, json};
use uuid::Uuid;

use super::{ListQueryParams, ensure_owner, load};
use crate::{
    AppState,
    auth::AuthUser,
    error::{ApiError, ApiResult},
    models::{
        MAX_VIDEO_TEXT_LEN, PublishVideoRequest, UpdateThumbnailRequest, UpdateVideoRequest,
        Video, parse_id, require_bounded_text, require_text,
    },
    query::{AggregateQuery, View},
    response::ApiResponse,
    store::{Collection, Document, Update, from_document, to_document},
};

/// get_all_videos
///
/// Published videos with their like counts. Supports `query` (title/description
/// text), `ownerId`, `sortBy`, `sortType`, `page` and `limit`. An empty page is a 200.
#[utoipa::path(
    get,
    path = "/videos",
    params(ListQueryParams),
    responses(
        (status = 200, description = "Page of videos with a `likes` count"),
        (status = 400, description = "Malformed ownerId or unknown sort field")
    )
)]
pub async fn get_all_videos(
    State(state): State<AppState>,
    Query(params): Query<ListQueryParams>,
) -> ApiResult<ApiResponse<Vec<Document>>> {
    let config = params.into_config()?;
    let videos = AggregateQuery::new(state.store.clone())
        .run_view(&View::AllVideos, &config)
        .await?;
    Ok(ApiResponse::ok(videos, "Videos fetched successfully"))
}

/// publish_video
///
/// Creates a video from object keys produced by the presigned upload flow.
/// Both objects are resolved through the media service before anything is stored.
#[utoipa::path(
    post,
    path = "/videos",
    request_body = PublishVideoRequest,
    responses(
        (status = 201, description = "Published", body = Video),
        (status = 400, description = "Missing or over-long title/description, or missing media"),
        (status = 503, description = "Media service unavailable")
    )
)]
pub async fn publish_video(
    AuthUser { id: owner, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<PublishVideoRequest>,
) -> ApiResult<ApiResponse<Video>> {
    let title = require_bounded_text(&payload.title, "Title", MAX_VIDEO_TEXT_LEN)?;
    let description =
        require_bounded_text(&payload.description, "Description", MAX_VIDEO_TEXT_LEN)?;
    let video_key = require_text(&payload.video_key, "Video file is required")?;
    let thumbnail_key = require_text(&payload.thumbnail_key, "Thumbnail is required")?;

    let video_file = state
        .storage
        .resolve_upload(&video_key)
        .await
        .map_err(|e| ApiError::Unavailable(format!("Failed to resolve video upload: {}", e)))?;
    let thumbnail = state
        .storage
        .resolve_upload(&thumbnail_key)
        .await
        .map_err(|e| ApiError::Unavailable(format!("Failed to resolve thumbnail upload: {}", e)))?;

    let now = Utc::now();
    let video = Video {
        id: Uuid::new_v4(),
        owner,
        video_file: video_file.url,
        thumbnail: thumbnail.url,
        title,
        description,
        duration: video_file.duration,
        views: 0,
        is_published: true,
        created_at: now,
        updated_at: now,
    };

    state
        .store
        .insert(Collection::Videos, to_document(&video)?)
        .await?;

    tracing::info!(video_id = %video.id, %owner, "video published");
    Ok(ApiResponse::created(video, "Video published successfully"))
}

#[utoipa::path(
    get,
    path = "/videos/{videoId}",
    params(("videoId" = String, Path, description = "Video ID")),
    responses(
        (status = 200, description = "Found", body = Video),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_video_by_id(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
) -> ApiResult<ApiResponse<Video>> {
    let id = parse_id(&video_id, "video")?;
    let video: Video = load(&state.store, Collection::Videos, id, "Video").await?;
    Ok(ApiResponse::ok(video, "Video fetched successfully"))
}

/// Loads a video and checks `actor` owns it, in that order.
async fn owned_video(state: &AppState, raw_id: &str, actor: Uuid) -> ApiResult<Video> {
    let id = parse_id(raw_id, "video")?;
    let video: Video = load(&state.store, Collection::Videos, id, "Video").await?;
    ensure_owner(video.owner, actor, "video")?;
    Ok(video)
}

async fn apply(state: &AppState, id: Uuid, mut updates: Vec<Update>) -> ApiResult<Video> {
    updates.push(Update::set("updatedAt", json!(Utc::now())));
    let doc = state
        .store
        .update_by_id(Collection::Videos, &id.to_string(), &updates)
        .await?
        .ok_or_else(|| ApiError::not_found("Video not found"))?;
    Ok(from_document(doc)?)
}

/// update_video
///
/// Replaces title and description. Owner only.
#[utoipa::path(
    patch,
    path = "/videos/{videoId}",
    params(("videoId" = String, Path, description = "Video ID")),
    request_body = UpdateVideoRequest,
    responses(
        (status = 200, description = "Updated", body = Video),
        (status = 403, description = "Not Owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_video(
    AuthUser { id: actor, .. }: AuthUser,
    State(state): State<AppState>,
    Path(video_id): Path<String>,
    Json(payload): Json<UpdateVideoRequest>,
) -> ApiResult<ApiResponse<Video>> {
    let title = require_bounded_text(&payload.title, "Title", MAX_VIDEO_TEXT_LEN)?;
    let description =
        require_bounded_text(&payload.description, "Description", MAX_VIDEO_TEXT_LEN)?;
    let video = owned_video(&state, &video_id, actor).await?;

    let updated = apply(
        &state,
        video.id,
        vec![
            Update::set("title", title),
            Update::set("description", description),
        ],
    )
    .await?;
    Ok(ApiResponse::ok(updated, "Video updated successfully"))
}

/// update_thumbnail
///
/// Points the video's `thumbnail` at a newly uploaded object. Owner only.
#[utoipa::path(
    patch,
    path = "/videos/{videoId}/thumbnail",
    params(("videoId" = String, Path, description = "Video ID")),
    request_body = UpdateThumbnailRequest,
    responses(
        (status = 200, description = "Updated", body = Video),
        (status = 403, description = "Not Owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_thumbnail(
    AuthUser { id: actor, .. }: AuthUser,
    State(state): State<AppState>,
    Path(video_id): Path<String>,
    Json(payload): Json<UpdateThumbnailRequest>,
) -> ApiResult<ApiResponse<Video>> {
    let thumbnail_key = require_text(&payload.thumbnail_key, "Thumbnail file is required")?;
    let video = owned_video(&state, &video_id, actor).await?;

    let thumbnail = state
        .storage
        .resolve_upload(&thumbnail_key)
        .await
        .map_err(|e| ApiError::Unavailable(format!("Failed to resolve thumbnail upload: {}", e)))?;

    let updated = apply(&state, video.id, vec![Update::set("thumbnail", thumbnail.url)]).await?;
    Ok(ApiResponse::ok(updated, "Thumbnail updated successfully"))
}

#[utoipa::path(
    delete,
    path = "/videos/{videoId}",
    params(("videoId" = String, Path, description = "Video ID")),
    responses(
        (status = 200, description = "Deleted"),
        (status = 403, description = "Not Owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_video(
    AuthUser { id: actor, .. }: AuthUser,
    State(state): State<AppState>,
    Path(video_id): Path<String>,
) -> ApiResult<ApiResponse<Value>> {
    let video = owned_video(&state, &video_id, actor).await?;
    if !state
        .store
        .delete_by_id(Collection::Videos, &video.id.to_string())
        .await?
    {
        return Err(ApiError::not_found("Video not found"));
    }
    tracing::info!(video_id = %video.id, "video deleted");
    Ok(ApiResponse::ok(json!({}), "Video deleted successfully"))
}

/// toggle_publish_status
///
/// Flips `isPublished` inside the store's update, so concurrent calls each
/// take effect. Owner only.
#[utoipa::path(
    patch,
    path = "/videos/{videoId}/publish",
    params(("videoId" = String, Path, description = "Video ID")),
    responses(
        (status = 200, description = "Toggled", body = Video),
        (status = 403, description = "Not Owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn toggle_publish_status(
    AuthUser { id: actor, .. }: AuthUser,
    State(state): State<AppState>,
    Path(video_id): Path<String>,
) -> ApiResult<ApiResponse<Video>> {
    let video = owned_video(&state, &video_id, actor).await?;
    let updated = apply(&state, video.id, vec![Update::Toggle("isPublished".into())]).await?;
    let message = if updated.is_published {
        "Video published"
    } else {
        "Video unpublished"
    };
    Ok(ApiResponse::ok(updated, message))
}
