//! Effect coordinator for the posts list.
//!
//! The coordinator watches every action the store processes. Each request
//! intent is translated into an [`Effect`] that performs the I/O and feeds a
//! result action back into the store. The watch loop runs under a
//! [`Supervisor`], so a failing watcher is restarted instead of silently
//! ending all effect handling.
//!
//! In-flight bookkeeping:
//! - Every first page request starts a new list epoch. A first page result
//!   from an older epoch is dropped; the newer request will settle the list.
//! - Next page requests are single-flight. A duplicate arriving while one is
//!   outstanding is dropped.
//! - A next page result whose epoch was superseded by a refresh becomes
//!   [`PostsAction::FetchMorePostsCancelled`].

use crate::actions::DEFAULT_PAGE;
use crate::api::PostsApi;
use crate::environment::{ListingSettings, PostsEnvironment};
use crate::error::ApiError;
use crate::reducer::PostsReducer;
use crate::types::{ListState, NewPost, Post, PostId, PostsAction};
use postboard_core::effect::Effect;
use postboard_runtime::{RestartPolicy, Store, Supervisor, SupervisorError};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use thiserror::Error;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Store type the coordinator drives
pub type PostsStore = Store<ListState, PostsAction, PostsEnvironment, PostsReducer>;

/// Name the watcher is supervised under
pub const WATCHER_NAME: &str = "posts-coordinator";

/// Errors that end one run of the watch loop
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorError {
    /// The store's action channel closed underneath the watcher
    #[error("store action channel closed")]
    StoreClosed,
}

/// Whether more posts remain after `page` pages of `page_size`
#[must_use]
pub fn has_more(page: u32, page_size: u32, total_count: u64) -> bool {
    u64::from(page) * u64::from(page_size) < total_count
}

/// Fetch one page and work out whether another follows it
async fn list_page(
    api: &dyn PostsApi,
    page: u32,
    listing: &ListingSettings,
) -> Result<(Vec<Post>, bool), ApiError> {
    let fetched = api.list_posts(page, listing.page_size).await?;
    let total = listing.total_count.resolve(fetched.total_count);
    Ok((fetched.posts, has_more(page, listing.page_size, total)))
}

#[derive(Debug, Default)]
struct InFlight {
    list_epoch: AtomicU64,
    more: AtomicBool,
}

impl InFlight {
    fn is_current(&self, epoch: u64) -> bool {
        self.list_epoch.load(Ordering::SeqCst) == epoch
    }
}

/// Clears the next page flag when the fetch ends, even if it never ran
struct MoreGuard(Arc<InFlight>);

impl Drop for MoreGuard {
    fn drop(&mut self) {
        self.0.more.store(false, Ordering::SeqCst);
    }
}

/// Translates request intents into effects and runs them
#[derive(Clone)]
pub struct Coordinator {
    in_flight: Arc<InFlight>,
    stop: Arc<watch::Sender<bool>>,
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("list_epoch", &self.in_flight.list_epoch.load(Ordering::SeqCst))
            .field("more_in_flight", &self.in_flight.more.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl Coordinator {
    /// Creates a coordinator with nothing in flight
    #[must_use]
    pub fn new() -> Self {
        let (stop, _) = watch::channel(false);
        Self {
            in_flight: Arc::new(InFlight::default()),
            stop: Arc::new(stop),
        }
    }

    /// The effect handling `action`, if it is a request the coordinator answers
    ///
    /// Returns `None` for result actions and for a next page request while
    /// another is outstanding.
    pub fn effect_for(
        &self,
        action: &PostsAction,
        env: &PostsEnvironment,
    ) -> Option<Effect<PostsAction>> {
        match action {
            PostsAction::FetchPostsRequest { page } => Some(self.fetch_first(*page, env)),
            PostsAction::FetchMorePostsRequest { page } => self.fetch_more(*page, env),
            PostsAction::AddPostRequest { post } => Some(Self::add(post.clone())),
            PostsAction::RemovePostRequest { id } => Some(Self::remove(*id)),
            _ => None,
        }
    }

    fn fetch_first(&self, page: u32, env: &PostsEnvironment) -> Effect<PostsAction> {
        // Page 0 means "no page given"
        let page = if page == 0 { DEFAULT_PAGE } else { page };
        let epoch = self.in_flight.list_epoch.fetch_add(1, Ordering::SeqCst) + 1;
        let in_flight = Arc::clone(&self.in_flight);
        let api = Arc::clone(&env.api);
        let listing = env.listing.clone();

        Effect::future(async move {
            let result = list_page(api.as_ref(), page, &listing).await;

            if !in_flight.is_current(epoch) {
                tracing::debug!(page, epoch, "Dropping superseded page result");
                return None;
            }

            Some(match result {
                Ok((posts, has_more)) => PostsAction::FetchPostsSuccess {
                    posts,
                    page,
                    has_more,
                },
                Err(error) => {
                    tracing::warn!(page, %error, "Fetching posts failed");
                    PostsAction::FetchPostsFailure {
                        error: error.to_string(),
                    }
                },
            })
        })
    }

    fn fetch_more(&self, page: u32, env: &PostsEnvironment) -> Option<Effect<PostsAction>> {
        if self
            .in_flight
            .more
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!(page, "Next page already in flight, ignoring request");
            return None;
        }

        let guard = MoreGuard(Arc::clone(&self.in_flight));
        let epoch = self.in_flight.list_epoch.load(Ordering::SeqCst);
        let api = Arc::clone(&env.api);
        let listing = env.listing.clone();

        Some(Effect::future(async move {
            tokio::time::sleep(listing.more_delay).await;
            let result = list_page(api.as_ref(), page, &listing).await;

            let current = guard.0.is_current(epoch);
            drop(guard);

            if !current {
                tracing::debug!(page, "Refresh superseded next page fetch");
                return Some(PostsAction::FetchMorePostsCancelled { page });
            }

            Some(match result {
                Ok((posts, has_more)) => PostsAction::FetchMorePostsSuccess {
                    posts,
                    page,
                    has_more,
                },
                Err(error) => {
                    let error = error.for_next_page();
                    tracing::warn!(page, %error, "Fetching more posts failed");
                    PostsAction::FetchMorePostsFailure {
                        error: error.to_string(),
                    }
                },
            })
        }))
    }

    fn add(post: NewPost) -> Effect<PostsAction> {
        Effect::future(async move {
            tracing::debug!(title = %post.title, "Adding post");
            Some(PostsAction::AddPostSuccess {
                title: post.title,
                body: post.body,
            })
        })
    }

    fn remove(id: PostId) -> Effect<PostsAction> {
        Effect::future(async move {
            tracing::debug!(%id, "Removing post");
            Some(PostsAction::RemovePostSuccess { id })
        })
    }

    /// Run the watch loop until [`stop`](Self::stop) is called
    ///
    /// Every action received on `actions` that the coordinator answers is
    /// turned into an effect and executed by `store`. Lagging behind the
    /// broadcast skips the missed actions with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::StoreClosed`] if the action channel closes.
    /// A receiver taken from a live store cannot close while `store` is held,
    /// so this only ends runs reading a channel whose sender is gone.
    pub async fn watch(
        &self,
        store: PostsStore,
        mut actions: broadcast::Receiver<PostsAction>,
    ) -> Result<(), CoordinatorError> {
        let mut stop = self.stop.subscribe();
        if *stop.borrow_and_update() {
            return Ok(());
        }

        tracing::info!("Coordinator watching actions");

        loop {
            tokio::select! {
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        tracing::info!("Coordinator stopped");
                        return Ok(());
                    }
                },
                received = actions.recv() => match received {
                    Ok(action) => {
                        if let Some(effect) = self.effect_for(&action, store.environment()) {
                            tracing::trace!(?action, "Running handler");
                            let _ = store.run_effect(effect);
                        }
                    },
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Coordinator lagged behind the store");
                    },
                    Err(RecvError::Closed) => return Err(CoordinatorError::StoreClosed),
                },
            }
        }
    }

    /// Start the watch loop on its own task under a [`Supervisor`]
    ///
    /// The first run is subscribed before this returns, so intents sent right
    /// after `spawn` are seen. Restarted runs subscribe afresh.
    #[must_use]
    pub fn spawn(
        &self,
        store: &PostsStore,
        policy: RestartPolicy,
    ) -> JoinHandle<Result<(), SupervisorError>> {
        self.supervise(store, policy, store.subscribe_actions())
    }

    /// Supervise watch runs; the first reads `first`, restarts subscribe to `store`
    fn supervise(
        &self,
        store: &PostsStore,
        policy: RestartPolicy,
        first: broadcast::Receiver<PostsAction>,
    ) -> JoinHandle<Result<(), SupervisorError>> {
        let mut first = Some(first);
        let coordinator = self.clone();
        let store = store.clone();

        Supervisor::new(WATCHER_NAME, policy).spawn(move || {
            let actions = first.take().unwrap_or_else(|| store.subscribe_actions());
            let coordinator = coordinator.clone();
            let store = store.clone();
            async move { coordinator.watch(store, actions).await }
        })
    }

    /// Ask every watch loop of this coordinator to finish
    pub fn stop(&self) {
        self.stop.send_replace(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::{add_post, fetch_more_posts, fetch_posts, remove_post};
    use crate::api::InMemoryPostsApi;
    use crate::environment::TotalCountSource;
    use postboard_runtime::StoreError;
    use std::time::Duration;

    fn env_with(api: Arc<InMemoryPostsApi>) -> PostsEnvironment {
        PostsEnvironment::new(api)
    }

    fn fetching_more(coordinator: &Coordinator) -> bool {
        coordinator.in_flight.more.load(Ordering::SeqCst)
    }

    fn is_list_result(action: &PostsAction) -> bool {
        matches!(
            action,
            PostsAction::FetchPostsSuccess { .. } | PostsAction::FetchPostsFailure { .. }
        )
    }

    #[allow(clippy::panic)]
    async fn resolve(effect: Option<Effect<PostsAction>>) -> Option<PostsAction> {
        match effect {
            Some(Effect::Future(fut)) => fut.await,
            other => panic!("expected a future effect, got {other:?}"),
        }
    }

    #[test]
    fn test_has_more() {
        assert!(has_more(1, 5, 15));
        assert!(has_more(2, 5, 15));
        assert!(!has_more(3, 5, 15));
        assert!(!has_more(1, 5, 0));
        assert!(has_more(u32::MAX, u32::MAX, u64::MAX));
    }

    #[test]
    fn test_results_need_no_handler() {
        let coordinator = Coordinator::new();
        let env = env_with(Arc::new(InMemoryPostsApi::default()));
        let results = [
            PostsAction::FetchPostsFailure { error: "e".into() },
            PostsAction::FetchMorePostsCancelled { page: 2 },
            PostsAction::RemovePostSuccess { id: PostId::new(1) },
        ];
        for action in &results {
            assert!(coordinator.effect_for(action, &env).is_none());
        }
    }

    #[tokio::test]
    #[allow(clippy::panic)]
    async fn test_first_page_success() {
        let coordinator = Coordinator::new();
        let env = env_with(Arc::new(InMemoryPostsApi::sample(12)));

        let result = resolve(coordinator.effect_for(&fetch_posts(1), &env)).await;
        match result {
            Some(PostsAction::FetchPostsSuccess { posts, page, has_more }) => {
                assert_eq!(posts.len(), 5);
                assert_eq!(page, 1);
                // Fixed total of 15 by default
                assert!(has_more);
            },
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[tokio::test]
    #[allow(clippy::panic)]
    async fn test_page_zero_loads_first_page() {
        let api = Arc::new(InMemoryPostsApi::sample(12));
        let coordinator = Coordinator::new();
        let env = env_with(Arc::clone(&api));

        let result = resolve(coordinator.effect_for(&fetch_posts(0), &env)).await;
        match result {
            Some(PostsAction::FetchPostsSuccess { posts, page, .. }) => {
                assert_eq!(page, 1);
                assert_eq!(posts.first().map(|p| p.id), Some(PostId::new(1)));
            },
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[tokio::test]
    #[allow(clippy::panic)]
    async fn test_header_total_count() {
        let coordinator = Coordinator::new();
        let listing = ListingSettings {
            total_count: TotalCountSource::Header { fallback: 15 },
            ..ListingSettings::default()
        };
        let env = env_with(Arc::new(InMemoryPostsApi::sample(5))).with_listing(listing);

        let result = resolve(coordinator.effect_for(&fetch_posts(1), &env)).await;
        assert!(matches!(
            result,
            Some(PostsAction::FetchPostsSuccess { has_more: false, .. })
        ));
    }

    #[tokio::test]
    #[allow(clippy::panic)]
    async fn test_status_failure_messages() {
        let api = Arc::new(InMemoryPostsApi::sample(10));
        api.fail_with_status(500);
        let coordinator = Coordinator::new();
        let env = env_with(api).with_listing(ListingSettings {
            more_delay: Duration::ZERO,
            ..ListingSettings::default()
        });

        let first = resolve(coordinator.effect_for(&fetch_posts(1), &env)).await;
        assert_eq!(
            first,
            Some(PostsAction::FetchPostsFailure {
                error: "Failed to fetch posts: 500".to_string()
            })
        );

        let more = resolve(coordinator.effect_for(&fetch_more_posts(2), &env)).await;
        assert_eq!(
            more,
            Some(PostsAction::FetchMorePostsFailure {
                error: "Failed to fetch more posts: 500".to_string()
            })
        );
    }

    #[tokio::test]
    #[allow(clippy::panic)]
    async fn test_superseded_first_page_is_dropped() {
        let coordinator = Coordinator::new();
        let env = env_with(Arc::new(InMemoryPostsApi::sample(10)));

        let stale = coordinator.effect_for(&fetch_posts(1), &env);
        let fresh = coordinator.effect_for(&fetch_posts(1), &env);

        assert_eq!(resolve(stale).await, None);
        assert!(matches!(
            resolve(fresh).await,
            Some(PostsAction::FetchPostsSuccess { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    #[allow(clippy::panic)]
    async fn test_next_page_is_single_flight() {
        let coordinator = Coordinator::new();
        let env = env_with(Arc::new(InMemoryPostsApi::sample(10)));

        let first = coordinator.effect_for(&fetch_more_posts(2), &env);
        assert!(first.is_some());
        assert!(fetching_more(&coordinator));
        assert!(coordinator.effect_for(&fetch_more_posts(2), &env).is_none());

        let result = resolve(first).await;
        assert!(matches!(
            result,
            Some(PostsAction::FetchMorePostsSuccess { page: 2, .. })
        ));
        assert!(!fetching_more(&coordinator));
        assert!(coordinator.effect_for(&fetch_more_posts(3), &env).is_some());
    }

    #[tokio::test]
    async fn test_dropped_next_page_effect_releases_flight() {
        let coordinator = Coordinator::new();
        let env = env_with(Arc::new(InMemoryPostsApi::sample(10)));

        let effect = coordinator.effect_for(&fetch_more_posts(2), &env);
        assert!(fetching_more(&coordinator));
        drop(effect);
        assert!(!fetching_more(&coordinator));
    }

    #[tokio::test(start_paused = true)]
    #[allow(clippy::panic)]
    async fn test_refresh_cancels_next_page() {
        let coordinator = Coordinator::new();
        let env = env_with(Arc::new(InMemoryPostsApi::sample(10)));

        let more = coordinator.effect_for(&fetch_more_posts(2), &env);
        let _refresh = coordinator.effect_for(&fetch_posts(1), &env);

        assert_eq!(
            resolve(more).await,
            Some(PostsAction::FetchMorePostsCancelled { page: 2 })
        );
    }

    #[tokio::test]
    #[allow(clippy::panic)]
    async fn test_local_edits_succeed_without_io() {
        let api = Arc::new(InMemoryPostsApi::sample(3));
        let coordinator = Coordinator::new();
        let env = env_with(Arc::clone(&api));

        let added = resolve(coordinator.effect_for(&add_post(NewPost::new("t", "b")), &env)).await;
        assert_eq!(
            added,
            Some(PostsAction::AddPostSuccess {
                title: "t".to_string(),
                body: "b".to_string()
            })
        );

        let removed = resolve(coordinator.effect_for(&remove_post(PostId::new(2)), &env)).await;
        assert_eq!(removed, Some(PostsAction::RemovePostSuccess { id: PostId::new(2) }));
        assert_eq!(api.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restarted_watch_still_answers_intents() -> Result<(), StoreError> {
        let env = env_with(Arc::new(InMemoryPostsApi::sample(10)));
        let store: PostsStore = Store::new(ListState::default(), PostsReducer::new(), env);
        let coordinator = Coordinator::new();

        // The first run reads a channel that is already closed
        let (sender, closed) = broadcast::channel(1);
        drop(sender);
        let watcher = coordinator.supervise(&store, RestartPolicy::default(), closed);
        tokio::time::sleep(Duration::from_millis(10)).await;

        let result = store
            .send_and_wait_for(fetch_posts(1), is_list_result, Duration::from_secs(5))
            .await?;
        assert!(matches!(result, PostsAction::FetchPostsSuccess { page: 1, .. }));

        coordinator.stop();
        assert_eq!(watcher.await.ok(), Some(Ok(())));
        Ok(())
    }
}
