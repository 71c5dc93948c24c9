use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use chrono::Utc;
use std::sync::Arc;
use tower::util::ServiceExt;
use uuid::Uuid;
use videotube_backend::{
    AppConfig, AppState, create_router,
    models::{PresignedUrlRequest, PresignedUrlResponse, User},
    response::ApiResponse,
    storage::MockStorageService,
    store::{Collection, DocumentStore, InMemoryDocumentStore, to_document},
};

/// Builds the router over an in-memory store holding one user; returns the user's id.
async fn app(mock_storage: MockStorageService) -> (axum::Router, Uuid) {
    let store = InMemoryDocumentStore::new();
    let user = User {
        id: Uuid::new_v4(),
        username: "uploader".to_string(),
        email: "uploader@example.com".to_string(),
        full_name: "Uploader".to_string(),
        avatar: None,
        cover_image: None,
        created_at: Utc::now(),
    };
    store
        .insert(Collection::Users, to_document(&user).unwrap())
        .await
        .unwrap();

    let state = AppState {
        store: Arc::new(store),
        storage: Arc::new(mock_storage),
        config: AppConfig::default(),
    };
    (create_router(state), user.id)
}

fn presign_request(user_id: Option<Uuid>, payload: &PresignedUrlRequest) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/upload/presigned")
        .header("Content-Type", "application/json");
    if let Some(id) = user_id {
        builder = builder.header("x-user-id", id.to_string());
    }
    builder
        .body(Body::from(serde_json::to_string(payload).unwrap()))
        .unwrap()
}

#[tokio::test]
async fn test_presigned_url_success() {
    let (app, user_id) = app(MockStorageService::new()).await;
    let payload = PresignedUrlRequest {
        filename: "test_video.mp4".to_string(),
        file_type: "video/mp4".to_string(),
    };

    let response = app
        .oneshot(presign_request(Some(user_id), &payload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: ApiResponse<PresignedUrlResponse> = serde_json::from_slice(&body_bytes).unwrap();

    assert!(body.success);
    assert!(body.data.upload_url.contains("signature=fake"));
    assert!(body.data.resource_key.ends_with(".mp4"));
    assert!(
        body.data
            .resource_key
            .starts_with(&format!("uploads/{}/", user_id))
    );
}

#[tokio::test]
async fn test_presigned_url_sanitization() {
    let (app, user_id) = app(MockStorageService::new()).await;
    let payload = PresignedUrlRequest {
        filename: "../../etc/passwd.exe".to_string(),
        file_type: "application/binary".to_string(),
    };

    let response = app
        .oneshot(presign_request(Some(user_id), &payload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: ApiResponse<PresignedUrlResponse> = serde_json::from_slice(&body_bytes).unwrap();

    assert!(body.data.resource_key.ends_with(".exe"));
    assert!(!body.data.resource_key.contains(".."));
}

#[tokio::test]
async fn test_presigned_url_storage_failure() {
    let (app, user_id) = app(MockStorageService::new_failing()).await;
    let payload = PresignedUrlRequest {
        filename: "valid.mp4".to_string(),
        file_type: "video/mp4".to_string(),
    };

    let response = app
        .oneshot(presign_request(Some(user_id), &payload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_presigned_url_requires_authentication() {
    let (app, _) = app(MockStorageService::new()).await;
    let payload = PresignedUrlRequest {
        filename: "valid.mp4".to_string(),
        file_type: "video/mp4".to_string(),
    };

    let response = app.oneshot(presign_request(None, &payload)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
