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
    models::{CreatePlaylistRequest, Playlist, UpdatePlaylistRequest, Video, parse_id, require_text},
    response::ApiResponse,
    store::{Collection, Update, from_document, to_document},
};

#[utoipa::path(
    post,
    path = "/playlists",
    request_body = CreatePlaylistRequest,
    responses(
        (status = 201, description = "Created", body = Playlist),
        (status = 400, description = "Missing name or description")
    )
)]
pub async fn create_playlist(
    AuthUser { id: owner, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreatePlaylistRequest>,
) -> ApiResult<ApiResponse<Playlist>> {
    let name = require_text(&payload.name, "Playlist name and description are required")?;
    let description =
        require_text(&payload.description, "Playlist name and description are required")?;

    let now = Utc::now();
    let playlist = Playlist {
        id: Uuid::new_v4(),
        owner,
        name,
        description,
        videos: Vec::new(),
        created_at: now,
        updated_at: now,
    };
    state
        .store
        .insert(Collection::Playlists, to_document(&playlist)?)
        .await?;

    Ok(ApiResponse::created(playlist, "Playlist created successfully"))
}

#[utoipa::path(
    get,
    path = "/playlists/users/{userId}",
    params(
        ("userId" = String, Path, description = "Owner ID"),
        ListQueryParams
    ),
    responses((status = 200, description = "Playlists", body = [Playlist]))
)]
pub async fn get_user_playlists(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(params): Query<ListQueryParams>,
) -> ApiResult<ApiResponse<Vec<Playlist>>> {
    let owner = parse_id(&user_id, "user")?;
    let config = params.into_config()?;
    let playlists = list_owned(&state.store, Collection::Playlists, owner, &config).await?;
    Ok(ApiResponse::ok(playlists, "Playlists fetched successfully"))
}

#[utoipa::path(
    get,
    path = "/playlists/{playlistId}",
    params(("playlistId" = String, Path, description = "Playlist ID")),
    responses(
        (status = 200, description = "Found", body = Playlist),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_playlist_by_id(
    State(state): State<AppState>,
    Path(playlist_id): Path<String>,
) -> ApiResult<ApiResponse<Playlist>> {
    let id = parse_id(&playlist_id, "playlist")?;
    let playlist: Playlist = load(&state.store, Collection::Playlists, id, "Playlist").await?;
    Ok(ApiResponse::ok(playlist, "Playlist fetched successfully"))
}

async fn owned_playlist(state: &AppState, raw_id: &str, actor: Uuid) -> ApiResult<Playlist> {
    let id = parse_id(raw_id, "playlist")?;
    let playlist: Playlist = load(&state.store, Collection::Playlists, id, "Playlist").await?;
    ensure_owner(playlist.owner, actor, "playlist")?;
    Ok(playlist)
}

async fn apply(state: &AppState, id: Uuid, mut updates: Vec<Update>) -> ApiResult<Playlist> {
    updates.push(Update::set("updatedAt", json!(Utc::now())));
    let doc = state
        .store
        .update_by_id(Collection::Playlists, &id.to_string(), &updates)
        .await?
        .ok_or_else(|| ApiError::not_found("Playlist not found"))?;
    Ok(from_document(doc)?)
}

/// update_playlist
///
/// Writes whichever of `name`/`description` is provided. Owner only.
#[utoipa::path(
    patch,
    path = "/playlists/{playlistId}",
    params(("playlistId" = String, Path, description = "Playlist ID")),
    request_body = UpdatePlaylistRequest,
    responses(
        (status = 200, description = "Updated", body = Playlist),
        (status = 403, description = "Not Owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_playlist(
    AuthUser { id: actor, .. }: AuthUser,
    State(state): State<AppState>,
    Path(playlist_id): Path<String>,
    Json(payload): Json<UpdatePlaylistRequest>,
) -> ApiResult<ApiResponse<Playlist>> {
    let mut updates = Vec::new();
    if let Some(name) = &payload.name {
        updates.push(Update::set("name", require_text(name, "Playlist name cannot be empty")?));
    }
    if let Some(description) = &payload.description {
        updates.push(Update::set(
            "description",
            require_text(description, "Playlist description cannot be empty")?,
        ));
    }
    if updates.is_empty() {
        return Err(ApiError::invalid("Provide a name or a description to update"));
    }

    let playlist = owned_playlist(&state, &playlist_id, actor).await?;
    let updated = apply(&state, playlist.id, updates).await?;
    Ok(ApiResponse::ok(updated, "Playlist updated successfully"))
}

#[utoipa::path(
    delete,
    path = "/playlists/{playlistId}",
    params(("playlistId" = String, Path, description = "Playlist ID")),
    responses(
        (status = 200, description = "Deleted"),
        (status = 403, description = "Not Owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_playlist(
    AuthUser { id: actor, .. }: AuthUser,
    State(state): State<AppState>,
    Path(playlist_id): Path<String>,
) -> ApiResult<ApiResponse<Value>> {
    let playlist = owned_playlist(&state, &playlist_id, actor).await?;
    if !state
        .store
        .delete_by_id(Collection::Playlists, &playlist.id.to_string())
        .await?
    {
        return Err(ApiError::not_found("Playlist not found"));
    }
    Ok(ApiResponse::ok(json!({}), "Playlist deleted successfully"))
}

/// add_video_to_playlist
///
/// Set semantics: adding a video that is already present leaves one entry.
/// The video must exist.
#[utoipa::path(
    patch,
    path = "/playlists/{playlistId}/videos/{videoId}",
    params(
        ("playlistId" = String, Path, description = "Playlist ID"),
        ("videoId" = String, Path, description = "Video ID")
    ),
    responses(
        (status = 200, description = "Added", body = Playlist),
        (status = 403, description = "Not Owner"),
        (status = 404, description = "Playlist or video not found")
    )
)]
pub async fn add_video_to_playlist(
    AuthUser { id: actor, .. }: AuthUser,
    State(state): State<AppState>,
    Path((playlist_id, video_id)): Path<(String, String)>,
) -> ApiResult<ApiResponse<Playlist>> {
    let video = parse_id(&video_id, "video")?;
    let playlist = owned_playlist(&state, &playlist_id, actor).await?;
    let _: Video = load(&state.store, Collection::Videos, video, "Video").await?;

    let updated = apply(
        &state,
        playlist.id,
        vec![Update::AddToSet("videos".into(), json!(video.to_string()))],
    )
    .await?;
    Ok(ApiResponse::ok(updated, "Video added to playlist"))
}

#[utoipa::path(
    delete,
    path = "/playlists/{playlistId}/videos/{videoId}",
    params(
        ("playlistId" = String, Path, description = "Playlist ID"),
        ("videoId" = String, Path, description = "Video ID")
    ),
    responses(
        (status = 200, description = "Removed", body = Playlist),
        (status = 403, description = "Not Owner"),
        (status = 404, description = "Playlist not found")
    )
)]
pub async fn remove_video_from_playlist(
    AuthUser { id: actor, .. }: AuthUser,
    State(state): State<AppState>,
    Path((playlist_id, video_id)): Path<(String, String)>,
) -> ApiResult<ApiResponse<Playlist>> {
    let video = parse_id(&video_id, "video")?;
    let playlist = owned_playlist(&state, &playlist_id, actor).await?;

    let updated = apply(
        &state,
        playlist.id,
        vec![Update::Pull("videos".into(), json!(video.to_string()))],
    )
    .await?;
    Ok(ApiResponse::ok(updated, "Video removed from playlist"))
}
