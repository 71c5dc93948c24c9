use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Unauthenticated endpoints. Listings only ever expose published videos;
/// single-entity reads are addressed by id.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers.
        .route("/health", get(|| async { "ok" }))
        .route("/users/register", post(handlers::users::register_user))
        // GET /videos?page=&limit=&query=&sortBy=&sortType=&ownerId=
        .route("/videos", get(handlers::videos::get_all_videos))
        .route("/videos/{videoId}", get(handlers::videos::get_video_by_id))
        .route(
            "/subscriptions/channels/{channelId}/subscribers",
            get(handlers::subscriptions::get_channel_subscribers),
        )
        .route(
            "/playlists/users/{userId}",
            get(handlers::playlists::get_user_playlists),
        )
        .route(
            "/playlists/{playlistId}",
            get(handlers::playlists::get_playlist_by_id),
        )
        .route("/tweets/users/{userId}", get(handlers::tweets::get_user_tweets))
}
