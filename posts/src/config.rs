//! Configuration for the posts client.
//!
//! Loads configuration from environment variables with sensible defaults.

use crate::environment::{DEFAULT_TOTAL_COUNT, ListingSettings, PAGE_SIZE, TotalCountSource};
use crate::types::DEFAULT_AUTHOR_ID;
use postboard_runtime::RestartPolicy;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Default listing server
pub const DEFAULT_BASE_URL: &str = "https://jsonplaceholder.typicode.com";

/// Errors found when validating a [`PostsConfig`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Page size must be at least one
    #[error("POSTBOARD_PAGE_SIZE must be greater than zero")]
    ZeroPageSize,

    /// Base URL could not be parsed or is not http(s)
    #[error("invalid POSTBOARD_BASE_URL {url:?}: {reason}")]
    InvalidBaseUrl {
        /// The rejected URL
        url: String,
        /// Why it was rejected
        reason: String,
    },

    /// Request timeout must be non-zero
    #[error("POSTBOARD_REQUEST_TIMEOUT_SECS must be greater than zero")]
    ZeroRequestTimeout,
}

/// Where the listing total comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TotalCountMode {
    /// Always use `total_count`
    Fixed,
    /// Read the `x-total-count` header, falling back to `total_count`
    Header,
}

impl std::str::FromStr for TotalCountMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixed" => Ok(Self::Fixed),
            "header" => Ok(Self::Header),
            other => Err(format!("unknown total count source {other:?}")),
        }
    }
}

/// Posts client configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostsConfig {
    /// Listing server base URL
    pub base_url: String,
    /// Posts requested per page
    pub page_size: u32,
    /// Total assumed, or the fallback in header mode
    pub total_count: u64,
    /// Where the total comes from
    pub total_count_source: TotalCountMode,
    /// Pause before a next page request, in milliseconds
    pub more_delay_ms: u64,
    /// HTTP request timeout in seconds
    pub request_timeout_secs: u64,
    /// Watcher restarts allowed per window (0 = unlimited)
    pub supervisor_max_restarts: usize,
    /// Watcher restart window in seconds
    pub supervisor_window_secs: u64,
    /// Pause before restarting the watcher, in milliseconds
    pub supervisor_restart_delay_ms: u64,
    /// Author id stamped on locally added posts
    pub default_author_id: u64,
}

impl Default for PostsConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl PostsConfig {
    /// Load configuration from environment variables.
    ///
    /// Unset or unparseable variables fall back to their defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            base_url: lookup("POSTBOARD_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            page_size: lookup("POSTBOARD_PAGE_SIZE")
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(PAGE_SIZE),
            total_count: lookup("POSTBOARD_TOTAL_COUNT")
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(DEFAULT_TOTAL_COUNT),
            total_count_source: lookup("POSTBOARD_TOTAL_COUNT_SOURCE")
                .and_then(|s| s.parse().ok())
                .unwrap_or(TotalCountMode::Fixed),
            more_delay_ms: lookup("POSTBOARD_MORE_DELAY_MS")
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(1000),
            request_timeout_secs: lookup("POSTBOARD_REQUEST_TIMEOUT_SECS")
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(30),
            supervisor_max_restarts: lookup("POSTBOARD_SUPERVISOR_MAX_RESTARTS")
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(10),
            supervisor_window_secs: lookup("POSTBOARD_SUPERVISOR_WINDOW_SECS")
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(60),
            supervisor_restart_delay_ms: lookup("POSTBOARD_SUPERVISOR_RESTART_DELAY_MS")
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(0),
            default_author_id: lookup("POSTBOARD_DEFAULT_AUTHOR_ID")
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(DEFAULT_AUTHOR_ID),
        }
    }

    /// Check the values a client cannot work with.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.page_size == 0 {
            return Err(ConfigError::ZeroPageSize);
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ZeroRequestTimeout);
        }

        let url = reqwest::Url::parse(&self.base_url).map_err(|e| ConfigError::InvalidBaseUrl {
            url: self.base_url.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidBaseUrl {
                url: self.base_url.clone(),
                reason: format!("unsupported scheme {}", url.scheme()),
            });
        }

        Ok(())
    }

    /// Paging behaviour for the listing handlers
    #[must_use]
    pub const fn listing(&self) -> ListingSettings {
        ListingSettings {
            page_size: self.page_size,
            total_count: match self.total_count_source {
                TotalCountMode::Fixed => TotalCountSource::Fixed(self.total_count),
                TotalCountMode::Header => TotalCountSource::Header {
                    fallback: self.total_count,
                },
            },
            more_delay: Duration::from_millis(self.more_delay_ms),
        }
    }

    /// HTTP request timeout
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Restart policy for the coordinator's watcher
    #[must_use]
    pub fn restart_policy(&self) -> RestartPolicy {
        let builder = RestartPolicy::builder()
            .window(Duration::from_secs(self.supervisor_window_secs))
            .restart_delay(Duration::from_millis(self.supervisor_restart_delay_ms));
        match self.supervisor_max_restarts {
            0 => builder.unbounded().build(),
            max => builder.max_restarts(max).build(),
        }
    }
}
