//! Bounded polling of submit-then-poll upstream jobs.
//!
//! A job is polled at a fixed interval until the vendor reports a terminal
//! status, the attempt cap is reached, or the caller cancels. Transport and
//! decode failures abort immediately; they are not retried.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use super::clock::Clock;
use crate::error::{RelayError, Result};

/// Default delay between status requests.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Default number of status requests before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 20;

// =============================================================================
// Task Status
// =============================================================================

/// Status of an upstream job as reported by the vendor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    Canceled,
    Unknown,
    /// Any other non-terminal value the vendor invents.
    Other(String),
}

impl TaskStatus {
    /// Parse the vendor's status string. Matching is exact, as vendors send it.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw {
            "PENDING" => Self::Pending,
            "RUNNING" => Self::Running,
            "SUCCEEDED" => Self::Succeeded,
            "FAILED" => Self::Failed,
            "CANCELED" => Self::Canceled,
            "UNKNOWN" => Self::Unknown,
            other => Self::Other(other.to_string()),
        }
    }

    /// Whether polling stops at this status.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Succeeded | Self::Failed | Self::Canceled | Self::Unknown
        )
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => f.write_str("PENDING"),
            Self::Running => f.write_str("RUNNING"),
            Self::Succeeded => f.write_str("SUCCEEDED"),
            Self::Failed => f.write_str("FAILED"),
            Self::Canceled => f.write_str("CANCELED"),
            Self::Unknown => f.write_str("UNKNOWN"),
            Self::Other(raw) => f.write_str(raw),
        }
    }
}

// =============================================================================
// Task Source
// =============================================================================

/// A decoded status response.
pub trait TaskSnapshot {
    /// Raw status field; empty when the response carries none.
    fn task_status(&self) -> &str;
}

/// Fetches the current state of a job.
#[async_trait]
pub trait TaskSource: Send + Sync {
    type Snapshot: TaskSnapshot + Send;

    /// One status request.
    async fn fetch_task(&self, task_id: &str) -> Result<Self::Snapshot>;
}

// =============================================================================
// Poller
// =============================================================================

/// Interval and attempt cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

/// A resolved job.
#[derive(Debug, Clone)]
pub struct AsyncJob<S> {
    pub task_id: String,
    /// `None` when the response had no status field at all.
    pub status: Option<TaskStatus>,
    pub attempts: u32,
    /// The last response, returned as-is.
    pub snapshot: S,
}

impl<S> AsyncJob<S> {
    /// Whether the job finished successfully.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.status.as_ref().is_some_and(TaskStatus::is_success)
    }
}

/// Drives a job to a terminal state.
pub struct JobPoller {
    clock: Arc<dyn Clock>,
    policy: PollPolicy,
}

impl JobPoller {
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, policy: PollPolicy) -> Self {
        Self { clock, policy }
    }

    #[must_use]
    pub const fn policy(&self) -> PollPolicy {
        self.policy
    }

    /// Poll until terminal status, missing status, cancellation or the attempt cap.
    ///
    /// # Errors
    ///
    /// Propagates the source's transport/decode errors, returns
    /// [`RelayError::Canceled`] when `cancel` fires and [`RelayError::Timeout`]
    /// after `max_attempts` non-terminal responses.
    pub async fn wait<T: TaskSource>(
        &self,
        source: &T,
        task_id: &str,
        cancel: &CancellationToken,
    ) -> Result<AsyncJob<T::Snapshot>> {
        let canceled = || RelayError::Canceled {
            task_id: task_id.to_string(),
        };

        for attempt in 1..=self.policy.max_attempts {
            if cancel.is_cancelled() {
                return Err(canceled());
            }

            let snapshot = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(canceled()),
                fetched = source.fetch_task(task_id) => fetched?,
            };

            let raw = snapshot.task_status();
            if raw.is_empty() {
                tracing::debug!(task_id, attempt, "Response carries no task status");
                return Ok(AsyncJob {
                    task_id: task_id.to_string(),
                    status: None,
                    attempts: attempt,
                    snapshot,
                });
            }

            let status = TaskStatus::parse(raw);
            if status.is_terminal() {
                tracing::info!(task_id, attempt, %status, "Task reached terminal status");
                return Ok(AsyncJob {
                    task_id: task_id.to_string(),
                    status: Some(status),
                    attempts: attempt,
                    snapshot,
                });
            }

            tracing::debug!(task_id, attempt, %status, "Task still in progress");
            if attempt == self.policy.max_attempts {
                break;
            }

            tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(canceled()),
                () = self.clock.sleep(self.policy.interval) => {}
            }
        }

        tracing::warn!(
            task_id,
            attempts = self.policy.max_attempts,
            "Task polling timed out"
        );
        Err(RelayError::Timeout {
            task_id: task_id.to_string(),
            attempts: self.policy.max_attempts,
        })
    }
}
