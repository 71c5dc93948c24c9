use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::store::Collection;

// --- Stored Entities (documents in the store, camelCase with `_id`) ---

/// User
///
/// A channel/profile mirrored from the identity provider into the `users` collection.
/// Credentials never reach this service; the core only reads this record.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// Video
///
/// A published (or draft) video. `video_file` and `thumbnail` are URLs resolved
/// by the media service from uploaded object keys.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Video {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub owner: Uuid,
    pub video_file: String,
    pub thumbnail: String,
    pub title: String,
    pub description: String,
    /// Seconds.
    pub duration: f64,
    pub views: u64,
    pub is_published: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// RelationKind
///
/// What a relation points at. Likes use `video`, `comment` and `tweet`;
/// subscriptions use `channel`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS, ToSchema, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum RelationKind {
    Video,
    Comment,
    Tweet,
    Channel,
}

impl RelationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationKind::Video => "video",
            RelationKind::Comment => "comment",
            RelationKind::Tweet => "tweet",
            RelationKind::Channel => "channel",
        }
    }

    /// The collection a target of this kind lives in. Comments are not stored here.
    pub fn target_collection(&self) -> Option<Collection> {
        match self {
            RelationKind::Video => Some(Collection::Videos),
            RelationKind::Tweet => Some(Collection::Tweets),
            RelationKind::Channel => Some(Collection::Users),
            RelationKind::Comment => None,
        }
    }

    /// Human label used in response messages.
    pub fn noun(&self) -> &'static str {
        match self {
            RelationKind::Video => "Video",
            RelationKind::Comment => "Comment",
            RelationKind::Tweet => "Tweet",
            RelationKind::Channel => "Channel",
        }
    }
}

/// Relation
///
/// One row per (actor, kind, target). Its existence is the liked/subscribed state.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Relation {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub actor: Uuid,
    pub kind: RelationKind,
    pub target: Uuid,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// Playlist
///
/// An ordered set of video ids owned by one user. Duplicates are suppressed on insert.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Playlist {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub owner: Uuid,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub videos: Vec<Uuid>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Tweet {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub owner: Uuid,
    pub content: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

// --- Request Payloads (Input Schemas) ---

/// RegisterUserRequest
///
/// Input payload for the public registration endpoint (POST /users/register).
/// The password is only forwarded to the identity provider; it is never stored or logged here.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RegisterUserRequest {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password: String,
}

/// PublishVideoRequest
///
/// Object keys returned by the presigned upload flow, plus the video's text.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PublishVideoRequest {
    pub title: String,
    pub description: String,
    #[schema(example = "uploads/3f6c.mp4")]
    pub video_key: String,
    #[schema(example = "uploads/9ab1.png")]
    pub thumbnail_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateVideoRequest {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdateThumbnailRequest {
    pub thumbnail_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreatePlaylistRequest {
    pub name: String,
    pub description: String,
}

/// UpdatePlaylistRequest
///
/// Partial update: only the provided fields are written.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdatePlaylistRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct TweetRequest {
    pub content: String,
}

/// PresignedUrlRequest
///
/// Input payload for requesting a short-lived upload URL (POST /upload/presigned).
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema, TS, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PresignedUrlRequest {
    /// The original filename, used to derive the file extension.
    #[schema(example = "demo_video.mp4")]
    pub filename: String,
    /// The MIME type the upload is constrained to.
    #[schema(example = "video/mp4")]
    pub file_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PresignedUrlResponse {
    pub upload_url: String,
    /// Key to send back when publishing (e.g. `videoKey`).
    pub resource_key: String,
}

// --- Core Outputs ---

/// ToggleState
///
/// The state a relation is left in after a toggle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum ToggleState {
    Added,
    Removed,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq, Eq)]
#[ts(export)]
pub struct ToggleResponse {
    pub state: ToggleState,
}

/// UploadedMedia
///
/// An uploaded object resolved by the media service.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct UploadedMedia {
    pub url: String,
    /// Seconds; 0 for still images.
    pub duration: f64,
}

/// parse_id
///
/// Parses a path or query id, mapping failure to `InvalidArgument` with a message naming `what`.
pub fn parse_id(raw: &str, what: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::invalid(format!("Invalid {} id", what)))
}

/// Upper bound, in characters, for video titles and descriptions.
pub const MAX_VIDEO_TEXT_LEN: usize = 255;

/// require_text
///
/// Rejects missing or blank text fields.
pub fn require_text(value: &str, message: &str) -> ApiResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::invalid(message));
    }
    Ok(trimmed.to_string())
}

/// require_bounded_text
///
/// Rejects blank `field` text ("<field> is required") and text longer than
/// `max` characters after trimming.
pub fn require_bounded_text(value: &str, field: &str, max: usize) -> ApiResult<String> {
    let text = require_text(value, &format!("{} is required", field))?;
    if text.chars().count() > max {
        return Err(ApiError::invalid(format!(
            "{} must be at most {} characters",
            field, max
        )));
    }
    Ok(text)
}
