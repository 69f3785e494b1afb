//! Authentication lifecycle status records shared between instances.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::id::InstanceId;

/// Authentication lifecycle state of one session instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceStatus {
    /// The instance is mounting and has not started sign-in.
    Initializing,
    /// Sign-in or token exchange is in progress.
    Authenticating,
    /// The instance holds a valid session.
    Authenticated,
    /// Sign-in failed.
    Failed,
    /// The instance is mounted but signed out.
    Idle,
}

impl InstanceStatus {
    /// Whether a waiter should stop polling on this status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Authenticated | Self::Failed)
    }

    /// Lowercase wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initializing => "initializing",
            Self::Authenticating => "authenticating",
            Self::Authenticated => "authenticated",
            Self::Failed => "failed",
            Self::Idle => "idle",
        }
    }
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InstanceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "initializing" => Ok(Self::Initializing),
            "authenticating" => Ok(Self::Authenticating),
            "authenticated" => Ok(Self::Authenticated),
            "failed" => Ok(Self::Failed),
            "idle" => Ok(Self::Idle),
            other => Err(format!(
                "unknown status '{other}' (expected initializing, authenticating, authenticated, failed or idle)"
            )),
        }
    }
}

/// The last status an instance published, with the time it was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceRecord {
    /// The instance that owns this record.
    pub instance_id: InstanceId,
    /// Current lifecycle status.
    pub status: InstanceStatus,
    /// Write time in milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl InstanceRecord {
    /// Create a record stamped with the current time.
    pub fn new(instance_id: InstanceId, status: InstanceStatus) -> Self {
        Self::at(instance_id, status, now_millis())
    }

    /// Create a record with an explicit timestamp.
    pub fn at(instance_id: InstanceId, status: InstanceStatus, timestamp: i64) -> Self {
        Self {
            instance_id,
            status,
            timestamp,
        }
    }

    /// Age of the record relative to `now` (milliseconds since epoch).
    ///
    /// Records stamped in the future (clock skew between writers) have age zero.
    pub fn age_at(&self, now: i64) -> Duration {
        Duration::from_millis(now.saturating_sub(self.timestamp).max(0) as u64)
    }

    /// Whether the record is older than `threshold` at `now`.
    pub fn is_stale_at(&self, threshold: Duration, now: i64) -> bool {
        self.age_at(now) > threshold
    }
}

/// Every instance's latest record, persisted as one unit.
pub type InstanceStatusTable = BTreeMap<InstanceId, InstanceRecord>;

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
