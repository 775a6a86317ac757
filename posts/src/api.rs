//! Listing API for posts.
//!
//! [`PostsApi`] is the seam the coordinator fetches pages through.
//! [`HttpPostsApi`] talks to a JSON placeholder style REST server;
//! [`InMemoryPostsApi`] serves a fixed set of posts for offline runs and
//! tests.

use crate::error::ApiError;
use crate::types::{DEFAULT_AUTHOR_ID, Post, PostId};
use futures::future::BoxFuture;
use reqwest::Client;
use std::sync::atomic::{AtomicU16, AtomicUsize, Ordering};
use std::time::Duration;

/// Header carrying the server-side total
pub const TOTAL_COUNT_HEADER: &str = "x-total-count";

/// One page of the listing
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListPage {
    /// Posts of the page, in server order
    pub posts: Vec<Post>,
    /// Total reported by the server, if any
    pub total_count: Option<u64>,
}

/// Source of pages of posts
pub trait PostsApi: Send + Sync {
    /// Fetch page `page` (starting at 1) holding at most `limit` posts
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on transport failure, a non-success status, or a
    /// body that is not a list of posts.
    fn list_posts(&self, page: u32, limit: u32) -> BoxFuture<'_, Result<ListPage, ApiError>>;
}

/// HTTP implementation of [`PostsApi`]
#[derive(Clone, Debug)]
pub struct HttpPostsApi {
    client: Client,
    base_url: String,
}

impl HttpPostsApi {
    /// Create a client for `base_url` whose requests give up after `timeout`
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Transport`] if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Ok(Self::with_client(client, base_url))
    }

    /// Create a client around an existing `reqwest::Client`
    #[must_use]
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn fetch_page(&self, page: u32, limit: u32) -> Result<ListPage, ApiError> {
        let response = self
            .client
            .get(format!("{}/posts", self.base_url))
            .query(&[("_page", page), ("_limit", limit)])
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), page, "Listing request failed");
            return Err(ApiError::Status {
                status: status.as_u16(),
                more: false,
            });
        }

        let total_count = response
            .headers()
            .get(TOTAL_COUNT_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok());

        let posts = response
            .json::<Vec<Post>>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;

        tracing::debug!(page, count = posts.len(), ?total_count, "Fetched page");
        Ok(ListPage { posts, total_count })
    }
}

impl PostsApi for HttpPostsApi {
    fn list_posts(&self, page: u32, limit: u32) -> BoxFuture<'_, Result<ListPage, ApiError>> {
        Box::pin(self.fetch_page(page, limit))
    }
}

/// In-memory implementation of [`PostsApi`]
///
/// Pages through a fixed list, optionally after a simulated latency. A
/// failure status can be switched on to exercise error paths.
#[derive(Debug, Default)]
pub struct InMemoryPostsApi {
    posts: Vec<Post>,
    latency: Duration,
    failure_status: AtomicU16,
    calls: AtomicUsize,
}

impl InMemoryPostsApi {
    /// Serve `posts`
    #[must_use]
    pub fn new(posts: Vec<Post>) -> Self {
        Self {
            posts,
            ..Self::default()
        }
    }

    /// Serve `count` generated posts with ids `1..=count`
    #[must_use]
    pub fn sample(count: u64) -> Self {
        Self::new(
            (1..=count)
                .map(|n| {
                    Post::new(
                        PostId::new(n),
                        DEFAULT_AUTHOR_ID,
                        format!("Sample post {n}"),
                        format!("Body of sample post {n}."),
                    )
                })
                .collect(),
        )
    }

    /// Wait `latency` before answering each request
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Answer every following request with `status`
    pub fn fail_with_status(&self, status: u16) {
        self.failure_status.store(status, Ordering::SeqCst);
    }

    /// Stop failing requests
    pub fn recover(&self) {
        self.failure_status.store(0, Ordering::SeqCst);
    }

    /// Number of requests received so far
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn page(&self, page: u32, limit: u32) -> Vec<Post> {
        let limit = limit as usize;
        let start = (page.saturating_sub(1) as usize).saturating_mul(limit);
        self.posts.iter().skip(start).take(limit).cloned().collect()
    }
}

impl PostsApi for InMemoryPostsApi {
    fn list_posts(&self, page: u32, limit: u32) -> BoxFuture<'_, Result<ListPage, ApiError>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.latency.is_zero() {
                tokio::time::sleep(self.latency).await;
            }

            match self.failure_status.load(Ordering::SeqCst) {
                0 => Ok(ListPage {
                    posts: self.page(page, limit),
                    total_count: Some(self.posts.len() as u64),
                }),
                status => Err(ApiError::Status { status, more: false }),
            }
        })
    }
}
