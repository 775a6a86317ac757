//! End-to-end tests for the store, reducer and coordinator together
//!
//! Uses the in-memory listing API and paused time so the next page delay
//! costs nothing.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use postboard::actions::{add_post, fetch_more_posts, fetch_posts, refresh, remove_post};
use postboard::{
    Coordinator, InMemoryPostsApi, ListState, NewPost, PostId, PostsAction, PostsEnvironment,
    PostsReducer, PostsStore,
};
use postboard_runtime::{RestartPolicy, Store, SupervisorError};
use postboard_testing::{init_tracing, wait_for_state};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

const WAIT: Duration = Duration::from_secs(30);

// ============================================================================
// Test Fixtures
// ============================================================================

struct Harness {
    store: PostsStore,
    api: Arc<InMemoryPostsApi>,
    coordinator: Coordinator,
    watcher: JoinHandle<Result<(), SupervisorError>>,
}

impl Harness {
    fn new(api: InMemoryPostsApi) -> Self {
        init_tracing();
        let api = Arc::new(api);
        let env = PostsEnvironment::new(api.clone());
        let store = Store::new(ListState::default(), PostsReducer::new(), env);
        let coordinator = Coordinator::new();
        let watcher = coordinator.spawn(&store, RestartPolicy::default());
        Self {
            store,
            api,
            coordinator,
            watcher,
        }
    }

    /// Send `action` and wait for the first action accepted by `is_result`
    async fn request<F>(&self, action: PostsAction, is_result: F) -> PostsAction
    where
        F: Fn(&PostsAction) -> bool,
    {
        self.store
            .send_and_wait_for(action, is_result, WAIT)
            .await
            .unwrap()
    }

    async fn load_first_page(&self) {
        let result = self.request(refresh(), is_list_result).await;
        assert!(matches!(result, PostsAction::FetchPostsSuccess { .. }), "got {result:?}");
    }

    async fn state(&self) -> ListState {
        self.store.state(|s| s.clone()).await
    }

    async fn finish(self) {
        self.coordinator.stop();
        self.watcher.await.unwrap().unwrap();
        self.store.shutdown(Duration::from_secs(5)).await.unwrap();
    }
}

fn is_list_result(action: &PostsAction) -> bool {
    matches!(
        action,
        PostsAction::FetchPostsSuccess { .. } | PostsAction::FetchPostsFailure { .. }
    )
}

fn is_more_result(action: &PostsAction) -> bool {
    matches!(
        action,
        PostsAction::FetchMorePostsSuccess { .. }
            | PostsAction::FetchMorePostsFailure { .. }
            | PostsAction::FetchMorePostsCancelled { .. }
    )
}

fn ids(state: &ListState) -> Vec<u64> {
    state.posts.iter().map(|p| p.id.get()).collect()
}

// ============================================================================
// Listing
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_first_page_loads() {
    let harness = Harness::new(InMemoryPostsApi::sample(15));

    harness.load_first_page().await;

    let state = harness.state().await;
    assert_eq!(ids(&state), vec![1, 2, 3, 4, 5]);
    assert_eq!(state.page, 1);
    assert!(state.has_more);
    assert!(!state.loading);
    assert_eq!(state.error, None);
    harness.finish().await;
}

#[tokio::test(start_paused = true)]
async fn test_scrolling_through_every_page() {
    let harness = Harness::new(InMemoryPostsApi::sample(15));
    harness.load_first_page().await;

    for page in 2..=3 {
        let result = harness.request(fetch_more_posts(page), is_more_result).await;
        assert!(
            matches!(result, PostsAction::FetchMorePostsSuccess { page: p, .. } if p == page),
            "got {result:?}"
        );
    }

    let state = harness.state().await;
    assert_eq!(ids(&state), (1..=15).collect::<Vec<_>>());
    assert_eq!(state.page, 3);
    assert!(!state.has_more);
    assert!(!state.loading_more);
    harness.finish().await;
}

#[tokio::test(start_paused = true)]
async fn test_next_page_waits_before_fetching() {
    let harness = Harness::new(InMemoryPostsApi::sample(15));
    harness.load_first_page().await;

    let started = Instant::now();
    harness.store.send(fetch_more_posts(2)).await.unwrap();
    assert!(harness.state().await.loading_more);

    wait_for_state(&harness.store, |s| !s.loading_more, WAIT)
        .await
        .unwrap();

    assert!(started.elapsed() >= Duration::from_millis(1000));
    assert_eq!(harness.state().await.count(), 10);
    harness.finish().await;
}

#[tokio::test(start_paused = true)]
async fn test_failed_first_page_keeps_posts() {
    let harness = Harness::new(InMemoryPostsApi::sample(15));
    harness.load_first_page().await;

    harness.api.fail_with_status(500);
    let result = harness.request(fetch_posts(1), is_list_result).await;

    assert_eq!(
        result,
        PostsAction::FetchPostsFailure {
            error: "Failed to fetch posts: 500".to_string()
        }
    );
    let state = harness.state().await;
    assert_eq!(ids(&state), vec![1, 2, 3, 4, 5]);
    assert!(!state.loading);
    assert_eq!(state.error.as_deref(), Some("Failed to fetch posts: 500"));

    // Retrying is just another first page request
    harness.api.recover();
    harness.load_first_page().await;
    assert_eq!(harness.state().await.error, None);
    harness.finish().await;
}

#[tokio::test(start_paused = true)]
async fn test_failed_next_page_keeps_posts_and_page() {
    let harness = Harness::new(InMemoryPostsApi::sample(15));
    harness.load_first_page().await;

    harness.api.fail_with_status(404);
    let result = harness.request(fetch_more_posts(2), is_more_result).await;

    assert_eq!(
        result,
        PostsAction::FetchMorePostsFailure {
            error: "Failed to fetch more posts: 404".to_string()
        }
    );
    let state = harness.state().await;
    assert_eq!(ids(&state), vec![1, 2, 3, 4, 5]);
    assert_eq!(state.page, 1);
    assert!(!state.loading_more);
    harness.finish().await;
}

// ============================================================================
// In-flight bookkeeping
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_duplicate_next_page_requests_fetch_once() {
    let harness = Harness::new(InMemoryPostsApi::sample(15));
    harness.load_first_page().await;

    harness.store.send(fetch_more_posts(2)).await.unwrap();
    let result = harness.request(fetch_more_posts(2), is_more_result).await;
    assert!(matches!(result, PostsAction::FetchMorePostsSuccess { page: 2, .. }));

    // Let any stray second fetch run its course
    tokio::time::sleep(Duration::from_secs(5)).await;

    let state = harness.state().await;
    assert_eq!(ids(&state), (1..=10).collect::<Vec<_>>());
    assert_eq!(harness.api.calls(), 2);
    harness.finish().await;
}

#[tokio::test(start_paused = true)]
async fn test_refresh_cancels_outstanding_next_page() {
    let harness = Harness::new(InMemoryPostsApi::sample(15));
    harness.load_first_page().await;

    let mut actions = harness.store.subscribe_actions();
    harness.store.send(fetch_more_posts(2)).await.unwrap();
    harness.store.send(refresh()).await.unwrap();

    let cancelled = tokio::time::timeout(WAIT, async {
        loop {
            let action = actions.recv().await.unwrap();
            if is_more_result(&action) {
                return action;
            }
        }
    })
    .await
    .unwrap();
    assert_eq!(cancelled, PostsAction::FetchMorePostsCancelled { page: 2 });

    let state = harness.state().await;
    assert_eq!(ids(&state), vec![1, 2, 3, 4, 5]);
    assert!(!state.loading);
    assert!(!state.loading_more);
    harness.finish().await;
}

#[tokio::test(start_paused = true)]
async fn test_newest_refresh_wins() {
    let harness = Harness::new(InMemoryPostsApi::sample(15).with_latency(Duration::from_millis(100)));

    let mut actions = harness.store.subscribe_actions();
    harness.store.send(fetch_posts(2)).await.unwrap();
    let result = harness.request(fetch_posts(1), is_list_result).await;
    assert!(matches!(result, PostsAction::FetchPostsSuccess { page: 1, .. }), "got {result:?}");

    tokio::time::sleep(Duration::from_secs(1)).await;

    // The page 2 result was superseded and never reached the store
    let mut list_results = 0;
    while let Ok(action) = actions.try_recv() {
        if is_list_result(&action) {
            list_results += 1;
        }
    }
    assert_eq!(list_results, 1);
    assert_eq!(ids(&harness.state().await), vec![1, 2, 3, 4, 5]);
    harness.finish().await;
}

// ============================================================================
// Local edits
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_add_then_remove() {
    let harness = Harness::new(InMemoryPostsApi::sample(15));
    harness.load_first_page().await;

    let added = harness
        .request(add_post(NewPost::new("Hello", "World")), |a| {
            matches!(a, PostsAction::AddPostSuccess { .. })
        })
        .await;
    assert_eq!(
        added,
        PostsAction::AddPostSuccess {
            title: "Hello".to_string(),
            body: "World".to_string()
        }
    );

    let state = harness.state().await;
    assert_eq!(ids(&state), vec![1, 2, 3, 4, 5, 6]);
    assert_eq!(state.get(PostId::new(6)).unwrap().title, "Hello");

    harness
        .request(remove_post(PostId::new(3)), |a| {
            matches!(a, PostsAction::RemovePostSuccess { .. })
        })
        .await;
    assert_eq!(ids(&harness.state().await), vec![1, 2, 4, 5, 6]);

    // Local edits never touch the server
    assert_eq!(harness.api.calls(), 1);
    harness.finish().await;
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_stopped_coordinator_ignores_requests() {
    let harness = Harness::new(InMemoryPostsApi::sample(15));

    harness.coordinator.stop();
    let Harness {
        store,
        api,
        watcher,
        ..
    } = harness;
    assert_eq!(watcher.await.unwrap(), Ok(()));

    store.send(refresh()).await.unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert!(store.state(|s| s.loading).await);
    assert_eq!(api.calls(), 0);
}
