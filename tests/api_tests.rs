use axum::{Json, Router, routing::post};
use chrono::Utc;
use reqwest::StatusCode;
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::net::TcpListener;
use uuid::Uuid;
use videotube_backend::{
    AppConfig, AppState, MockStorageService, create_router,
    models::User,
    storage::StorageState,
    store::{Collection, DocumentStore, InMemoryDocumentStore, StoreState, to_document},
};

pub struct TestApp {
    pub address: String,
    pub store: InMemoryDocumentStore,
}

async fn serve(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    format!("http://127.0.0.1:{}", port)
}

/// Stands in for the identity provider's signup endpoint: every signup gets a fresh id.
async fn spawn_identity_provider() -> String {
    let router = Router::new().route(
        "/auth/v1/signup",
        post(|Json(body): Json<Value>| async move {
            if body["password"].as_str().unwrap_or_default().len() < 6 {
                return (StatusCode::UNPROCESSABLE_ENTITY, Json(json!({})));
            }
            (StatusCode::OK, Json(json!({ "id": Uuid::new_v4() })))
        }),
    );
    serve(router).await
}

async fn spawn_app_with(config: AppConfig) -> TestApp {
    let store = InMemoryDocumentStore::new();
    let state = AppState {
        store: Arc::new(store.clone()) as StoreState,
        storage: Arc::new(MockStorageService::new()) as StorageState,
        config,
    };
    let address = serve(create_router(state)).await;
    TestApp { address, store }
}

async fn spawn_app() -> TestApp {
    spawn_app_with(AppConfig::default()).await
}

async fn seed_user(app: &TestApp, username: &str) -> Uuid {
    let user = User {
        id: Uuid::new_v4(),
        username: username.to_string(),
        email: format!("{}@example.com", username),
        full_name: username.to_string(),
        avatar: Some(format!("http://cdn/{}.png", username)),
        cover_image: None,
        created_at: Utc::now(),
    };
    app.store
        .insert(Collection::Users, to_document(&user).unwrap())
        .await
        .unwrap();
    user.id
}

async fn publish(client: &reqwest::Client, app: &TestApp, owner: Uuid, title: &str) -> Value {
    let response = client
        .post(format!("{}/videos", app.address))
        .header("x-user-id", owner.to_string())
        .json(&json!({
            "title": title,
            "description": "a video",
            "videoKey": "uploads/v.mp4",
            "thumbnailKey": "uploads/v.png"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    response.json::<Value>().await.unwrap()["data"].clone()
}

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app().await;
    let response = reqwest::get(format!("{}/health", app.address))
        .await
        .expect("req fail");
    assert!(response.status().is_success());
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = spawn_app().await;
    let doc: Value = reqwest::get(format!("{}/api-docs/openapi.json", app.address))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(doc["paths"]["/likes/videos/{videoId}"].is_object());
}

#[tokio::test]
async fn test_protected_route_requires_authentication() {
    let app = spawn_app().await;
    let response = reqwest::Client::new()
        .post(format!("{}/videos", app.address))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

async fn toggle_like(client: &reqwest::Client, url: &str, user: Uuid) -> Value {
    client
        .post(url)
        .header("x-user-id", user.to_string())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

async fn liked_rows(client: &reqwest::Client, app: &TestApp, user: Uuid) -> Vec<Value> {
    let liked: Value = client
        .get(format!("{}/likes/videos", app.address))
        .header("x-user-id", user.to_string())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    liked["data"].as_array().cloned().unwrap()
}

#[tokio::test]
async fn test_like_toggle_roundtrip_over_http() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let owner = seed_user(&app, "owner").await;
    let fan = seed_user(&app, "fan").await;
    let video = publish(&client, &app, owner, "Clip").await;
    let video_id = video["_id"].as_str().unwrap().to_string();
    let like_url = format!("{}/likes/videos/{}", app.address, video_id);

    let first = toggle_like(&client, &like_url, fan).await;
    assert_eq!(first["data"]["state"], "added");
    assert_eq!(first["success"], true);
    assert_eq!(first["statusCode"], 200);

    let rows = liked_rows(&client, &app, fan).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["video"]["_id"], video_id.as_str());
    assert_eq!(rows[0]["likes"]["count"], 1);

    let second = toggle_like(&client, &like_url, fan).await;
    assert_eq!(second["data"]["state"], "removed");
    assert!(liked_rows(&client, &app, fan).await.is_empty());

    let third = toggle_like(&client, &like_url, fan).await;
    assert_eq!(third["data"]["state"], "added");
    let rows = liked_rows(&client, &app, fan).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["video"]["_id"], video_id.as_str());
    assert_eq!(rows[0]["likes"]["count"], 1);
}

#[tokio::test]
async fn test_malformed_id_is_bad_request_with_error_envelope() {
    let app = spawn_app().await;
    let user = seed_user(&app, "someone").await;

    let response = reqwest::Client::new()
        .post(format!("{}/likes/videos/not-an-id", app.address))
        .header("x-user-id", user.to_string())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "InvalidArgument");
    assert_eq!(body["success"], false);
    assert_eq!(body["statusCode"], 400);
}

#[tokio::test]
async fn test_unknown_sort_field_is_bad_request() {
    let app = spawn_app().await;
    let response = reqwest::get(format!("{}/videos?sortBy=password", app.address))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_video_listing_search_and_sort() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let owner = seed_user(&app, "creator").await;
    publish(&client, &app, owner, "Rust ownership explained").await;
    publish(&client, &app, owner, "Cooking pasta").await;
    publish(&client, &app, owner, "Advanced RUST traits").await;

    let found: Value = client
        .get(format!(
            "{}/videos?query=rust&sortBy=title&sortType=asc&ownerId={}",
            app.address, owner
        ))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let titles: Vec<&str> = found["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Advanced RUST traits", "Rust ownership explained"]);

    let nothing: Value = client
        .get(format!("{}/videos?query=(unbalanced", app.address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(nothing["success"], true);
    assert_eq!(nothing["data"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_self_subscription_is_rejected() {
    let app = spawn_app().await;
    let me = seed_user(&app, "me").await;

    let response = reqwest::Client::new()
        .post(format!("{}/subscriptions/channels/{}", app.address, me))
        .header("x-user-id", me.to_string())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_subscription_views() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let channel = seed_user(&app, "channel").await;
    let viewer = seed_user(&app, "viewer").await;

    let toggled: Value = client
        .post(format!("{}/subscriptions/channels/{}", app.address, channel))
        .header("x-user-id", viewer.to_string())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(toggled["message"], "Subscribed successfully");

    let subscribers: Value = client
        .get(format!(
            "{}/subscriptions/channels/{}/subscribers",
            app.address, channel
        ))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let subscriber = &subscribers["data"][0]["subscriber"];
    assert_eq!(subscriber["username"], "viewer");
    assert_eq!(subscriber["avatar"], "http://cdn/viewer.png");
    assert!(subscriber.get("fullName").is_none());

    let mine: Value = client
        .get(format!("{}/subscriptions/me", app.address))
        .header("x-user-id", viewer.to_string())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(mine["data"][0]["channel"]["_id"], channel.to_string());
}

#[tokio::test]
async fn test_registration_through_identity_provider() {
    let identity = spawn_identity_provider().await;
    let mut config = AppConfig::default();
    config.identity_url = Some(identity);
    config.identity_key = Some("anon".to_string());
    let app = spawn_app_with(config).await;
    let client = reqwest::Client::new();

    let payload = json!({
        "username": "NewUser",
        "email": "New@Example.com",
        "fullName": "New User",
        "password": "correct-horse"
    });

    let created = client
        .post(format!("{}/users/register", app.address))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(created.status(), StatusCode::CREATED);
    let body: Value = created.json().await.unwrap();
    assert_eq!(body["data"]["email"], "new@example.com");
    assert_eq!(body["data"]["username"], "newuser");

    let duplicate = client
        .post(format!("{}/users/register", app.address))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(duplicate.status(), StatusCode::CONFLICT);

    let weak = client
        .post(format!("{}/users/register", app.address))
        .json(&json!({
            "username": "weak",
            "email": "weak@example.com",
            "fullName": "Weak",
            "password": "123"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(weak.status(), StatusCode::BAD_REQUEST);
    assert_eq!(app.store.count(Collection::Users).await, 1);
}
