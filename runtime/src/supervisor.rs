//! Restart-on-failure supervision for long-running tasks.
//!
//! A [`Supervisor`] runs a task produced by a factory closure. When the task
//! returns an error or panics, the failure is logged and a fresh task is
//! started. Restarts are rate-bounded by a [`RestartPolicy`] so a defect that
//! fails on every start surfaces as [`SupervisorError::RestartLimitExceeded`]
//! instead of spinning forever.
//!
//! # Example
//!
//! ```rust
//! use postboard_runtime::supervisor::{RestartPolicy, Supervisor};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let policy = RestartPolicy::builder()
//!     .max_restarts(5)
//!     .window(Duration::from_secs(30))
//!     .build();
//!
//! Supervisor::new("watcher", policy)
//!     .run(|| async {
//!         // Long-running work; returning Ok(()) ends supervision.
//!         Ok::<_, String>(())
//!     })
//!     .await?;
//! # Ok(())
//! # }
//! ```

use std::collections::VecDeque;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Errors returned when supervision gives up
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SupervisorError {
    /// The task failed more often than the restart policy allows
    #[error("{name} failed {restarts} times within {window:?}, giving up")]
    RestartLimitExceeded {
        /// Name of the supervised task
        name: String,
        /// Restarts performed within the window before giving up
        restarts: usize,
        /// The policy window
        window: Duration,
    },
}

/// Restart policy for a supervised task.
///
/// # Default Values
///
/// - `max_restarts`: 10 (within `window`)
/// - `window`: 60 seconds
/// - `restart_delay`: none
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestartPolicy {
    /// Maximum restarts within `window`; `None` restarts forever
    pub max_restarts: Option<usize>,
    /// Sliding window the restart budget applies to
    pub window: Duration,
    /// Pause before each restart
    pub restart_delay: Duration,
}

impl Default for RestartPolicy {
    fn default() -> Self {
        Self {
            max_restarts: Some(10),
            window: Duration::from_secs(60),
            restart_delay: Duration::ZERO,
        }
    }
}

impl RestartPolicy {
    /// Create a new policy builder.
    #[must_use]
    pub const fn builder() -> RestartPolicyBuilder {
        RestartPolicyBuilder {
            max_restarts: Some(10),
            window: Duration::from_secs(60),
            restart_delay: Duration::ZERO,
        }
    }

    /// A policy that restarts forever, with no rate bound.
    #[must_use]
    pub const fn unbounded() -> Self {
        Self {
            max_restarts: None,
            window: Duration::from_secs(60),
            restart_delay: Duration::ZERO,
        }
    }

    /// Whether another restart is allowed given the restarts already in the window.
    #[must_use]
    pub fn allows(&self, restarts_in_window: usize) -> bool {
        self.max_restarts.is_none_or(|max| restarts_in_window < max)
    }
}

/// Builder for [`RestartPolicy`].
#[derive(Debug, Clone)]
pub struct RestartPolicyBuilder {
    max_restarts: Option<usize>,
    window: Duration,
    restart_delay: Duration,
}

impl RestartPolicyBuilder {
    /// Set the restart budget within the window. Zero means never restart.
    #[must_use]
    pub const fn max_restarts(mut self, max_restarts: usize) -> Self {
        self.max_restarts = Some(max_restarts);
        self
    }

    /// Remove the restart budget.
    #[must_use]
    pub const fn unbounded(mut self) -> Self {
        self.max_restarts = None;
        self
    }

    /// Set the sliding window.
    #[must_use]
    pub const fn window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Set the pause before each restart.
    #[must_use]
    pub const fn restart_delay(mut self, delay: Duration) -> Self {
        self.restart_delay = delay;
        self
    }

    /// Build the policy.
    #[must_use]
    pub const fn build(self) -> RestartPolicy {
        RestartPolicy {
            max_restarts: self.max_restarts,
            window: self.window,
            restart_delay: self.restart_delay,
        }
    }
}

/// Restart-on-failure wrapper around a task factory
#[derive(Debug, Clone)]
pub struct Supervisor {
    name: String,
    policy: RestartPolicy,
}

impl Supervisor {
    /// Create a supervisor for the named task
    #[must_use]
    pub fn new(name: impl Into<String>, policy: RestartPolicy) -> Self {
        Self {
            name: name.into(),
            policy,
        }
    }

    /// Run the task produced by `factory`, restarting it on failure.
    ///
    /// Each attempt runs in its own tokio task so a panic is caught as a
    /// failure. Returns `Ok(())` once an attempt finishes with `Ok(())` or is
    /// cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`SupervisorError::RestartLimitExceeded`] when failures exceed
    /// the policy's budget within its window.
    pub async fn run<F, Fut, Err>(&self, mut factory: F) -> Result<(), SupervisorError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<(), Err>> + Send + 'static,
        Err: Display + Send + 'static,
    {
        let mut restarts: VecDeque<Instant> = VecDeque::new();

        loop {
            let failure = match tokio::spawn(factory()).await {
                Ok(Ok(())) => {
                    tracing::info!(supervisor = %self.name, "Supervised task finished");
                    return Ok(());
                },
                Ok(Err(error)) => error.to_string(),
                Err(join_error) if join_error.is_panic() => format!("panicked: {join_error}"),
                Err(_) => {
                    tracing::info!(supervisor = %self.name, "Supervised task cancelled");
                    return Ok(());
                },
            };

            let now = Instant::now();
            while restarts
                .front()
                .is_some_and(|started| now.duration_since(*started) > self.policy.window)
            {
                restarts.pop_front();
            }

            if !self.policy.allows(restarts.len()) {
                tracing::error!(
                    supervisor = %self.name,
                    restarts = restarts.len(),
                    error = %failure,
                    "Restart budget exhausted"
                );
                metrics::counter!("supervisor.gave_up", "task" => self.name.clone()).increment(1);
                return Err(SupervisorError::RestartLimitExceeded {
                    name: self.name.clone(),
                    restarts: restarts.len(),
                    window: self.policy.window,
                });
            }

            restarts.push_back(now);
            metrics::counter!("supervisor.restarts", "task" => self.name.clone()).increment(1);
            tracing::warn!(
                supervisor = %self.name,
                restart = restarts.len(),
                error = %failure,
                "Supervised task failed, restarting"
            );

            if !self.policy.restart_delay.is_zero() {
                tokio::time::sleep(self.policy.restart_delay).await;
            }
        }
    }

    /// Run the supervisor on its own task.
    pub fn spawn<F, Fut, Err>(self, factory: F) -> JoinHandle<Result<(), SupervisorError>>
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), Err>> + Send + 'static,
        Err: Display + Send + 'static,
    {
        tokio::spawn(async move { self.run(factory).await })
    }
}
