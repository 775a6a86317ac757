//! # Postboard Testing
//!
//! Testing utilities for the postboard client.
//!
//! This crate provides:
//! - [`ReducerTest`], a Given-When-Then harness for reducers
//! - Effect assertion helpers
//! - Store helpers for waiting on asynchronous effects
//! - Tracing setup for tests
//!
//! ## Example
//!
//! ```ignore
//! use postboard_testing::{init_tracing, wait_for_state};
//!
//! #[tokio::test]
//! async fn first_page_loads() {
//!     init_tracing();
//!     let store = Store::new(ListState::default(), PostsReducer::new(), env);
//!
//!     store.send(fetch_posts(1)).await?;
//!     wait_for_state(&store, |s| !s.loading, Duration::from_secs(1)).await?;
//! }
//! ```

use postboard_core::reducer::Reducer;
use postboard_runtime::{Store, StoreError};
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;


pub use reducer_test::{ReducerTest, assertions};

/// Install a test-friendly tracing subscriber once per process
///
/// Honors `RUST_LOG`; output is captured by the test harness.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_test_writer()
        .try_init();
}

/// Wait until the store's state satisfies `predicate`
///
/// The predicate is re-checked after every action the store processes.
///
/// # Errors
///
/// - [`StoreError::Timeout`] if the predicate does not hold before `timeout`
/// - [`StoreError::ChannelClosed`] if the store's action channel closed
pub async fn wait_for_state<S, A, E, R, F>(
    store: &Store<S, A, E, R>,
    predicate: F,
    timeout: Duration,
) -> Result<(), StoreError>
where
    R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
    A: Send + Clone + std::fmt::Debug + 'static,
    S: Send + Sync + 'static,
    E: Send + Sync + 'static,
    F: Fn(&S) -> bool,
{
    // Subscribe before the first check so no transition is missed
    let mut rx = store.subscribe_actions();

    tokio::time::timeout(timeout, async {
        loop {
            if store.state(&predicate).await {
                return Ok(());
            }
            match rx.recv().await {
                Ok(_) | Err(RecvError::Lagged(_)) => {},
                Err(RecvError::Closed) => return Err(StoreError::ChannelClosed),
            }
        }
    })
    .await
    .map_err(|_| StoreError::Timeout)?
}
