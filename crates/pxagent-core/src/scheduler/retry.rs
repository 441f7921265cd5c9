//! Staleness-based retry policy for running jobs.

use std::time::{Duration, SystemTime};

/// Staleness window applied to download and conversion jobs.
pub const DEFAULT_RETRY_STALENESS: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_RETRIES: u32 = 10;

/// What to do with a job that stalled or finished badly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Requeue as `redo` with this retry count.
    Requeue(u32),
    /// Retries are used up; drop the job.
    Exhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// `None` disables stall detection.
    pub retry_staleness: Option<Duration>,
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retry_staleness: Some(DEFAULT_RETRY_STALENESS),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl RetryPolicy {
    /// Decide after a failed attempt. `n_retries` is the count so far; the
    /// returned count never exceeds `max_retries`.
    pub fn decide(&self, n_retries: u32) -> RetryDecision {
        if n_retries >= self.max_retries {
            RetryDecision::Exhausted
        } else {
            RetryDecision::Requeue(n_retries + 1)
        }
    }

    /// A running job is stale iff both its output file and the job itself
    /// are older than the window. No output file means never stale.
    pub fn is_stale(
        &self,
        now: SystemTime,
        launched: SystemTime,
        output_mtime: Option<SystemTime>,
    ) -> bool {
        let (Some(window), Some(mtime)) = (self.retry_staleness, output_mtime) else {
            return false;
        };
        let file_age = now.duration_since(mtime).unwrap_or(Duration::ZERO);
        let job_age = now.duration_since(launched).unwrap_or(Duration::ZERO);
        file_age > window && job_age > window
    }
}
