//! Dependencies shared by the reducer and the coordinator.

use crate::api::PostsApi;
use crate::types::DEFAULT_AUTHOR_ID;
use std::sync::Arc;
use std::time::Duration;

/// Posts requested per page
pub const PAGE_SIZE: u32 = 5;

/// Total assumed when the server reports none
pub const DEFAULT_TOTAL_COUNT: u64 = 15;

/// Pause before a next page request is sent
pub const DEFAULT_MORE_DELAY: Duration = Duration::from_millis(1000);

/// Where the listing total comes from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TotalCountSource {
    /// Always this total
    Fixed(u64),
    /// The `x-total-count` response header, or `fallback` when it is missing
    Header {
        /// Total used when the header is absent or malformed
        fallback: u64,
    },
}

impl Default for TotalCountSource {
    fn default() -> Self {
        Self::Fixed(DEFAULT_TOTAL_COUNT)
    }
}

impl TotalCountSource {
    /// Resolve the total given what the server reported
    #[must_use]
    pub const fn resolve(self, reported: Option<u64>) -> u64 {
        match (self, reported) {
            (Self::Fixed(total), _) => total,
            (Self::Header { .. }, Some(total)) => total,
            (Self::Header { fallback }, None) => fallback,
        }
    }
}

/// Paging behaviour of the listing handlers
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListingSettings {
    /// Posts requested per page
    pub page_size: u32,
    /// Where the total comes from
    pub total_count: TotalCountSource,
    /// Pause before a next page request
    pub more_delay: Duration,
}

impl Default for ListingSettings {
    fn default() -> Self {
        Self {
            page_size: PAGE_SIZE,
            total_count: TotalCountSource::default(),
            more_delay: DEFAULT_MORE_DELAY,
        }
    }
}

/// Environment for the posts reducer and coordinator
#[derive(Clone)]
pub struct PostsEnvironment {
    /// Listing API
    pub api: Arc<dyn PostsApi>,
    /// Paging behaviour
    pub listing: ListingSettings,
    /// Author id stamped on locally added posts
    pub default_author_id: u64,
}

impl PostsEnvironment {
    /// Creates an environment with default listing settings
    #[must_use]
    pub fn new(api: Arc<dyn PostsApi>) -> Self {
        Self {
            api,
            listing: ListingSettings::default(),
            default_author_id: DEFAULT_AUTHOR_ID,
        }
    }

    /// Replace the listing settings
    #[must_use]
    pub fn with_listing(mut self, listing: ListingSettings) -> Self {
        self.listing = listing;
        self
    }
}

impl std::fmt::Debug for PostsEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostsEnvironment")
            .field("listing", &self.listing)
            .field("default_author_id", &self.default_author_id)
            .finish_non_exhaustive()
    }
}
