use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core components and the document-store adapter they sit on.
pub mod error;
pub mod query;
pub mod response;
pub mod store;
pub mod toggle;

// Thin adapters: HTTP handlers, identity, object storage, configuration.
pub mod auth;
pub mod config;
pub mod handlers;
pub mod models;
pub mod storage;

pub mod routes;
use auth::AuthUser;
use routes::{authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::{ApiError, ApiResult};
pub use query::AggregateQuery;
pub use storage::{MockStorageService, S3StorageClient, StorageState};
pub use store::{InMemoryDocumentStore, PostgresDocumentStore, StoreState, TimeoutStore};
pub use toggle::ToggleRelation;

/// ApiDoc
///
/// OpenAPI document for every `#[utoipa::path]` handler, served at
/// `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::users::register_user, handlers::users::get_me,
        handlers::videos::get_all_videos, handlers::videos::publish_video,
        handlers::videos::get_video_by_id, handlers::videos::update_video,
        handlers::videos::update_thumbnail, handlers::videos::delete_video,
        handlers::videos::toggle_publish_status,
        handlers::media::get_presigned_url,
        handlers::likes::toggle_video_like, handlers::likes::toggle_comment_like,
        handlers::likes::toggle_tweet_like, handlers::likes::get_liked_videos,
        handlers::subscriptions::toggle_subscription,
        handlers::subscriptions::get_channel_subscribers,
        handlers::subscriptions::get_subscribed_channels,
        handlers::playlists::create_playlist, handlers::playlists::get_user_playlists,
        handlers::playlists::get_playlist_by_id, handlers::playlists::update_playlist,
        handlers::playlists::delete_playlist, handlers::playlists::add_video_to_playlist,
        handlers::playlists::remove_video_from_playlist,
        handlers::tweets::create_tweet, handlers::tweets::get_user_tweets,
        handlers::tweets::update_tweet, handlers::tweets::delete_tweet
    ),
    components(
        schemas(
            models::User, models::Video, models::Relation, models::RelationKind,
            models::Playlist, models::Tweet, models::RegisterUserRequest,
            models::PublishVideoRequest, models::UpdateVideoRequest,
            models::UpdateThumbnailRequest, models::CreatePlaylistRequest,
            models::UpdatePlaylistRequest, models::TweetRequest,
            models::PresignedUrlRequest, models::PresignedUrlResponse,
            models::ToggleState, models::ToggleResponse, models::UploadedMedia,
            error::ErrorBody,
        )
    ),
    tags(
        (name = "videotube", description = "Video sharing API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single shared container of services and configuration handed to every request.
#[derive(Clone)]
pub struct AppState {
    /// Document store, already wrapped in the timeout decorator.
    pub store: StoreState,
    /// Object storage: presigned uploads and upload resolution.
    pub storage: StorageState,
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for StoreState {
    fn from_ref(app_state: &AppState) -> StoreState {
        app_state.store.clone()
    }
}

impl FromRef<AppState> for StorageState {
    fn from_ref(app_state: &AppState) -> StorageState {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Rejects the request with 401 unless `AuthUser` can be extracted.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles public and authenticated routes, Swagger UI, and the
/// request-id/trace/CORS layers around them.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Span for one HTTP request, carrying the `x-request-id` so every log line of
/// the request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
