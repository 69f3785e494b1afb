//! Cross-instance coordination configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Parent wait and staleness policy.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CoordinationConfig {
    /// How long a sub-instance waits for its parent, in milliseconds.
    #[serde(default = "default_wait_timeout")]
    #[validate(range(min = 1))]
    pub wait_timeout_ms: u64,
    /// Poll interval while waiting, in milliseconds.
    #[serde(default = "default_poll_interval")]
    #[validate(range(min = 1))]
    pub poll_interval_ms: u64,
    /// Age after which a status record is no longer trusted, in milliseconds.
    #[serde(default = "default_stale_after")]
    #[validate(range(min = 1))]
    pub stale_after_ms: u64,
    /// Re-check immediately on in-process status events instead of only on the poll tick.
    #[serde(default = "default_true")]
    pub listen_for_updates: bool,
}

impl CoordinationConfig {
    /// Wait timeout as a [`Duration`].
    pub fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.wait_timeout_ms)
    }

    /// Poll interval as a [`Duration`].
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Staleness threshold as a [`Duration`].
    pub fn stale_after(&self) -> Duration {
        Duration::from_millis(self.stale_after_ms)
    }
}

impl Default for CoordinationConfig {
    fn default() -> Self {
        Self {
            wait_timeout_ms: default_wait_timeout(),
            poll_interval_ms: default_poll_interval(),
            stale_after_ms: default_stale_after(),
            listen_for_updates: true,
        }
    }
}

fn default_wait_timeout() -> u64 {
    30_000
}

fn default_poll_interval() -> u64 {
    100
}

fn default_stale_after() -> u64 {
    120_000
}

fn default_true() -> bool {
    true
}
