//! Results of observing and waiting for a parent instance.

use std::fmt;

use serde::{Deserialize, Serialize};

use orgsession_core::types::InstanceStatus;

/// Classification of one read of the parent's record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentObservation {
    /// No record yet. Keep waiting.
    Missing,
    /// The parent is still starting up or signing in.
    Pending(InstanceStatus),
    /// The parent is authenticated.
    Ready,
    /// The parent's sign-in failed.
    Failed,
    /// The record is older than the staleness threshold.
    Stale,
}

impl ParentObservation {
    /// The outcome this observation ends a wait with, if it is terminal.
    pub fn outcome(&self) -> Option<WaitOutcome> {
        match self {
            Self::Missing | Self::Pending(_) => None,
            Self::Ready => Some(WaitOutcome::Ready),
            Self::Failed => Some(WaitOutcome::Failed),
            Self::Stale => Some(WaitOutcome::Stale),
        }
    }
}

/// How a wait for the parent ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitOutcome {
    /// The parent reached `authenticated`.
    Ready,
    /// The parent reached `failed`.
    Failed,
    /// The parent's record stopped being refreshed.
    Stale,
    /// The timeout elapsed first.
    TimedOut,
    /// The caller cancelled the wait.
    Cancelled,
}

impl WaitOutcome {
    /// Whether the parent is usable.
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    /// Snake-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Failed => "failed",
            Self::Stale => "stale",
            Self::TimedOut => "timed_out",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for WaitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
