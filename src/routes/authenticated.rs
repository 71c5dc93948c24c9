use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, patch, post},
};

/// Authenticated Router Module
///
/// Every handler here receives a resolved `AuthUser`. Mutations of videos,
/// playlists and tweets additionally check that the caller owns the entity.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        .route("/users/me", get(handlers::users::get_me))
        // POST /upload/presigned
        // Direct-to-storage upload; the returned key is then passed to POST /videos.
        .route("/upload/presigned", post(handlers::media::get_presigned_url))
        // --- Videos ---
        .route("/videos", post(handlers::videos::publish_video))
        .route(
            "/videos/{videoId}",
            patch(handlers::videos::update_video).delete(handlers::videos::delete_video),
        )
        .route(
            "/videos/{videoId}/thumbnail",
            patch(handlers::videos::update_thumbnail),
        )
        .route(
            "/videos/{videoId}/publish",
            patch(handlers::videos::toggle_publish_status),
        )
        // --- Likes (toggles) ---
        .route("/likes/videos", get(handlers::likes::get_liked_videos))
        .route("/likes/videos/{videoId}", post(handlers::likes::toggle_video_like))
        .route(
            "/likes/comments/{commentId}",
            post(handlers::likes::toggle_comment_like),
        )
        .route("/likes/tweets/{tweetId}", post(handlers::likes::toggle_tweet_like))
        // --- Subscriptions ---
        .route(
            "/subscriptions/channels/{channelId}",
            post(handlers::subscriptions::toggle_subscription),
        )
        .route(
            "/subscriptions/me",
            get(handlers::subscriptions::get_subscribed_channels),
        )
        // --- Playlists ---
        .route("/playlists", post(handlers::playlists::create_playlist))
        .route(
            "/playlists/{playlistId}",
            patch(handlers::playlists::update_playlist).delete(handlers::playlists::delete_playlist),
        )
        .route(
            "/playlists/{playlistId}/videos/{videoId}",
            patch(handlers::playlists::add_video_to_playlist)
                .delete(handlers::playlists::remove_video_from_playlist),
        )
        // --- Tweets ---
        .route("/tweets", post(handlers::tweets::create_tweet))
        .route(
            "/tweets/{tweetId}",
            patch(handlers::tweets::update_tweet).delete(handlers::tweets::delete_tweet),
        )
}
