use chrono::{Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;
use videotube_backend::{
    AggregateQuery, ToggleRelation,
    error::ApiError,
    models::{RelationKind, ToggleState, User, Video},
    query::{Page, QueryConfig, SortDirection, View},
    store::{Collection, DocumentStore, InMemoryDocumentStore, StoreState, to_document},
};

// --- Fixtures ---

fn shared(store: &InMemoryDocumentStore) -> StoreState {
    Arc::new(store.clone())
}

async fn seed_user(store: &InMemoryDocumentStore, username: &str) -> Uuid {
    let user = User {
        id: Uuid::new_v4(),
        username: username.to_string(),
        email: format!("{}@example.com", username),
        full_name: username.to_uppercase(),
        created_at: Utc::now(),
        ..Default::default()
    };
    store
        .insert(Collection::Users, to_document(&user).unwrap())
        .await
        .unwrap();
    user.id
}

/// Inserts `count` published videos, `i` minutes apart, so `createdAt` ordering is strict.
async fn seed_videos(store: &InMemoryDocumentStore, owner: Uuid, count: usize) -> Vec<Video> {
    let start = Utc::now() - Duration::hours(1);
    let mut videos = Vec::with_capacity(count);
    for i in 0..count {
        let at = start + Duration::minutes(i as i64);
        let video = Video {
            id: Uuid::new_v4(),
            owner,
            video_file: format!("http://cdn/{}.mp4", i),
            thumbnail: format!("http://cdn/{}.png", i),
            title: format!("Episode {:02}", i),
            description: "weekly show".to_string(),
            duration: 60.0,
            views: i as u64,
            is_published: true,
            created_at: at,
            updated_at: at,
        };
        store
            .insert(Collection::Videos, to_document(&video).unwrap())
            .await
            .unwrap();
        videos.push(video);
    }
    videos
}

fn page(page: i64, limit: i64) -> QueryConfig {
    QueryConfig {
        page: Page::new(page, limit),
        ..Default::default()
    }
}

// --- Pagination ---

#[tokio::test]
async fn test_listing_pages_through_published_videos() {
    let store = InMemoryDocumentStore::new();
    let owner = seed_user(&store, "creator").await;
    let videos = seed_videos(&store, owner, 25).await;
    let query = AggregateQuery::new(shared(&store));

    let first = query.run_view(&View::AllVideos, &page(1, 10)).await.unwrap();
    let third = query.run_view(&View::AllVideos, &page(3, 10)).await.unwrap();
    let fourth = query.run_view(&View::AllVideos, &page(4, 10)).await.unwrap();

    assert_eq!(first.len(), 10);
    assert_eq!(third.len(), 5);
    assert!(fourth.is_empty());

    // Newest first by default.
    assert_eq!(first[0]["_id"], videos[24].id.to_string());
    assert_eq!(third[4]["_id"], videos[0].id.to_string());
    assert_eq!(first[0]["likes"], 0);
}

#[tokio::test]
async fn test_empty_match_is_an_empty_success() {
    let store = InMemoryDocumentStore::new();
    let owner = seed_user(&store, "creator").await;
    seed_videos(&store, owner, 3).await;
    let query = AggregateQuery::new(shared(&store));

    let config = QueryConfig {
        query: Some("nothing matches this".to_string()),
        ..Default::default()
    };
    let rows = query.run_view(&View::AllVideos, &config).await.unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn test_unknown_sort_field_is_rejected() {
    let store = InMemoryDocumentStore::new();
    let query = AggregateQuery::new(shared(&store));

    let config = QueryConfig {
        sort_by: Some("popularity".to_string()),
        sort_type: SortDirection::Ascending,
        ..Default::default()
    };
    let result = query.run_view(&View::AllVideos, &config).await;
    assert!(matches!(result, Err(ApiError::InvalidArgument(_))));
}

// --- Toggle + views ---

#[tokio::test]
async fn test_like_then_liked_videos_reports_count() {
    let store = InMemoryDocumentStore::new();
    let owner = seed_user(&store, "creator").await;
    let viewer = seed_user(&store, "viewer").await;
    let videos = seed_videos(&store, owner, 2).await;

    let toggle = ToggleRelation::new(shared(&store));
    let target = videos[1].id.to_string();
    assert_eq!(
        toggle.toggle(viewer, RelationKind::Video, &target).await.unwrap(),
        ToggleState::Added
    );

    let query = AggregateQuery::new(shared(&store));
    let liked = query
        .run_view(&View::LikedVideos { actor: viewer }, &QueryConfig::default())
        .await
        .unwrap();

    assert_eq!(liked.len(), 1);
    assert_eq!(liked[0]["video"]["_id"], target);
    assert_eq!(liked[0]["likes"]["count"], 1);
    assert!(liked[0].get("likedAt").is_some());
    // Picked card fields only.
    assert!(liked[0]["video"].get("description").is_none());

    assert_eq!(
        toggle.toggle(viewer, RelationKind::Video, &target).await.unwrap(),
        ToggleState::Removed
    );
    let liked = query
        .run_view(&View::LikedVideos { actor: viewer }, &QueryConfig::default())
        .await
        .unwrap();
    assert!(liked.is_empty());

    assert_eq!(
        toggle.toggle(viewer, RelationKind::Video, &target).await.unwrap(),
        ToggleState::Added
    );
    let liked = query
        .run_view(&View::LikedVideos { actor: viewer }, &QueryConfig::default())
        .await
        .unwrap();
    assert_eq!(liked.len(), 1);
    assert_eq!(liked[0]["video"]["_id"], target);
    assert_eq!(liked[0]["likes"]["count"], 1);
}

#[tokio::test]
async fn test_deleted_video_drops_out_of_liked_videos() {
    let store = InMemoryDocumentStore::new();
    let owner = seed_user(&store, "creator").await;
    let viewer = seed_user(&store, "viewer").await;
    let videos = seed_videos(&store, owner, 2).await;

    let toggle = ToggleRelation::new(shared(&store));
    for video in &videos {
        toggle
            .toggle(viewer, RelationKind::Video, &video.id.to_string())
            .await
            .unwrap();
    }
    assert!(
        store
            .delete_by_id(Collection::Videos, &videos[0].id.to_string())
            .await
            .unwrap()
    );

    let liked = AggregateQuery::new(shared(&store))
        .run_view(&View::LikedVideos { actor: viewer }, &QueryConfig::default())
        .await
        .unwrap();

    // The relation row survives the delete but has nothing to show.
    assert_eq!(store.count(Collection::Relations).await, 2);
    assert_eq!(liked.len(), 1);
    assert_eq!(liked[0]["video"]["_id"], videos[1].id.to_string());
}

#[tokio::test]
async fn test_toggle_parity_leaves_state_of_last_call() {
    let store = InMemoryDocumentStore::new();
    let owner = seed_user(&store, "creator").await;
    let viewer = seed_user(&store, "viewer").await;
    let videos = seed_videos(&store, owner, 1).await;
    let target = videos[0].id.to_string();
    let toggle = ToggleRelation::new(shared(&store));

    let mut last = ToggleState::Removed;
    for _ in 0..5 {
        last = toggle.toggle(viewer, RelationKind::Video, &target).await.unwrap();
    }

    assert_eq!(last, ToggleState::Added);
    assert_eq!(store.count(Collection::Relations).await, 1);
}

#[tokio::test]
async fn test_subscription_views_are_symmetric() {
    let store = InMemoryDocumentStore::new();
    let channel = seed_user(&store, "channel").await;
    let fan = seed_user(&store, "fan").await;
    let toggle = ToggleRelation::new(shared(&store));

    assert!(matches!(
        toggle
            .toggle(channel, RelationKind::Channel, &channel.to_string())
            .await,
        Err(ApiError::InvalidArgument(_))
    ));

    toggle
        .toggle(fan, RelationKind::Channel, &channel.to_string())
        .await
        .unwrap();

    let query = AggregateQuery::new(shared(&store));
    let subscribers = query
        .run_view(&View::ChannelSubscribers { channel }, &QueryConfig::default())
        .await
        .unwrap();
    let channels = query
        .run_view(&View::SubscribedChannels { subscriber: fan }, &QueryConfig::default())
        .await
        .unwrap();

    assert_eq!(subscribers.len(), 1);
    assert_eq!(subscribers[0]["subscriber"]["username"], "fan");
    assert!(subscribers[0]["subscriber"].get("fullName").is_none());
    assert_eq!(channels.len(), 1);
    assert_eq!(channels[0]["channel"]["_id"], channel.to_string());
}
