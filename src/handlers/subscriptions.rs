use axum::extract::{Path, Query, State};

use super::ListQueryParams;
use crate::{
    AppState,
    auth::AuthUser,
    error::ApiResult,
    models::{RelationKind, ToggleResponse, ToggleState, parse_id},
    query::{AggregateQuery, View},
    response::ApiResponse,
    store::Document,
    toggle::ToggleRelation,
};

/// toggle_subscription
///
/// Subscribes the caller to a channel, or unsubscribes if already subscribed.
/// Subscribing to yourself is a 400.
#[utoipa::path(
    post,
    path = "/subscriptions/channels/{channelId}",
    params(("channelId" = String, Path, description = "Channel (user) ID")),
    responses(
        (status = 200, description = "New subscription state", body = ToggleResponse),
        (status = 400, description = "Malformed id or self-subscription"),
        (status = 404, description = "Channel not found")
    )
)]
pub async fn toggle_subscription(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
) -> ApiResult<ApiResponse<ToggleResponse>> {
    let outcome = ToggleRelation::new(state.store.clone())
        .toggle(id, RelationKind::Channel, &channel_id)
        .await?;
    let message = match outcome {
        ToggleState::Added => "Subscribed successfully",
        ToggleState::Removed => "Unsubscribed successfully",
    };
    Ok(ApiResponse::ok(ToggleResponse { state: outcome }, message))
}

#[utoipa::path(
    get,
    path = "/subscriptions/channels/{channelId}/subscribers",
    params(
        ("channelId" = String, Path, description = "Channel (user) ID"),
        ListQueryParams
    ),
    responses(
        (status = 200, description = "Subscriber profiles"),
        (status = 400, description = "Malformed id")
    )
)]
pub async fn get_channel_subscribers(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
    Query(params): Query<ListQueryParams>,
) -> ApiResult<ApiResponse<Vec<Document>>> {
    let channel = parse_id(&channel_id, "channel")?;
    let config = params.into_config()?;
    let subscribers = AggregateQuery::new(state.store.clone())
        .run_view(&View::ChannelSubscribers { channel }, &config)
        .await?;
    Ok(ApiResponse::ok(subscribers, "Subscribers fetched successfully"))
}

/// get_subscribed_channels
///
/// Channels the caller follows.
#[utoipa::path(
    get,
    path = "/subscriptions/me",
    params(ListQueryParams),
    responses((status = 200, description = "Channel profiles"))
)]
pub async fn get_subscribed_channels(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<ListQueryParams>,
) -> ApiResult<ApiResponse<Vec<Document>>> {
    let config = params.into_config()?;
    let channels = AggregateQuery::new(state.store.clone())
        .run_view(&View::SubscribedChannels { subscriber: id }, &config)
        .await?;
    Ok(ApiResponse::ok(channels, "Subscribed channels fetched successfully"))
}
