//! # Postboard
//!
//! A paginated posts list driven by a store, a reducer and an effect
//! coordinator.
//!
//! ## Architecture
//!
//! - The UI dispatches intents built by [`actions`]
//! - [`PostsReducer`] applies every action to [`ListState`]; it never does I/O
//! - [`Coordinator`] observes the same actions, runs one effect per request
//!   intent through the store, and feeds the result action back
//! - [`view::render`] turns the state into text; [`scroll::ScrollObserver`]
//!   decides when to request the next page
//!
//! ## Example
//!
//! ```no_run
//! use postboard::{Coordinator, InMemoryPostsApi, ListState, PostsEnvironment, PostsReducer};
//! use postboard::actions::refresh;
//! use postboard_runtime::{RestartPolicy, Store};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let env = PostsEnvironment::new(Arc::new(InMemoryPostsApi::sample(15)));
//! let store = Store::new(ListState::default(), PostsReducer::new(), env);
//!
//! let coordinator = Coordinator::new();
//! let watcher = coordinator.spawn(&store, RestartPolicy::default());
//!
//! store.send(refresh()).await?;
//! println!("{}", store.state(postboard::view::render).await);
//!
//! coordinator.stop();
//! watcher.await??;
//! # Ok(())
//! # }
//! ```

pub mod actions;
pub mod api;
pub mod config;
pub mod coordinator;
pub mod environment;
pub mod error;
pub mod reducer;
pub mod scroll;
pub mod types;
pub mod view;

pub use api::{HttpPostsApi, InMemoryPostsApi, ListPage, PostsApi};
pub use config::{ConfigError, PostsConfig};
pub use coordinator::{Coordinator, CoordinatorError, PostsStore, has_more};
pub use environment::{ListingSettings, PostsEnvironment, TotalCountSource};
pub use error::ApiError;
pub use reducer::PostsReducer;
pub use types::{ListState, NewPost, NewPostError, Post, PostId, PostsAction};
