//! Error types for the posts listing API

use thiserror::Error;

/// Errors that can occur when fetching a page of posts
///
/// The `Display` output is the message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The request never produced a response
    #[error("Network error: {0}")]
    Transport(String),

    /// The server answered with a non-success status
    #[error("Failed to fetch {}: {status}", listing_noun(*.more))]
    Status {
        /// HTTP status code
        status: u16,
        /// Whether the failed request was for a next page
        more: bool,
    },

    /// The response body was not a list of posts
    #[error("Invalid posts payload: {0}")]
    Decode(String),
}

impl ApiError {
    /// Mark the error as having come from a next page fetch
    #[must_use]
    pub fn for_next_page(self) -> Self {
        match self {
            Self::Status { status, .. } => Self::Status { status, more: true },
            other => other,
        }
    }
}

const fn listing_noun(more: bool) -> &'static str {
    if more { "more posts" } else { "posts" }
}
