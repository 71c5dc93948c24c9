use axum::{Json, extract::State};
use uuid::Uuid;

use crate::{
    AppState,
    auth::AuthUser,
    error::{ApiError, ApiResult},
    models::{PresignedUrlRequest, PresignedUrlResponse, require_text},
    response::ApiResponse,
};

/// get_presigned_url
///
/// Issues a 10-minute signed PUT URL so the client uploads straight to object
/// storage. The returned `resourceKey` is what `POST /videos` expects.
#[utoipa::path(
    post,
    path = "/upload/presigned",
    request_body = PresignedUrlRequest,
    responses(
        (status = 200, description = "URL", body = PresignedUrlResponse),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn get_presigned_url(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<PresignedUrlRequest>,
) -> ApiResult<ApiResponse<PresignedUrlResponse>> {
    let file_type = require_text(&payload.file_type, "fileType is required")?;
    let extension = std::path::Path::new(&payload.filename)
        .extension()
        .and_then(std::ffi::OsStr::to_str)
        .unwrap_or("bin");
    let object_key = format!("uploads/{}/{}.{}", user_id, Uuid::new_v4(), extension);

    let upload_url = state
        .storage
        .get_presigned_upload_url(&object_key, &file_type)
        .await
        .map_err(|e| ApiError::Unavailable(format!("Failed to presign upload: {}", e)))?;

    Ok(ApiResponse::ok(
        PresignedUrlResponse {
            upload_url,
            resource_key: object_key,
        },
        "Upload URL issued",
    ))
}
