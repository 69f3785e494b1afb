//! Sub-organization session records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use orgsession_core::types::{InstanceId, Organization};

/// One token-exchanged session hosted by a parent instance.
///
/// Unregistering only clears `is_active`; the record stays as history
/// until the parent signs out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubOrgSession {
    /// Target organization.
    pub organization: Organization,
    /// Sub-instance bound to the session.
    pub instance_id: InstanceId,
    /// Whether the session is live.
    pub is_active: bool,
    /// When the exchange completed.
    pub created_at: DateTime<Utc>,
}

impl SubOrgSession {
    /// A new active session created now.
    pub fn active(organization: Organization, instance_id: InstanceId) -> Self {
        Self {
            organization,
            instance_id,
            is_active: true,
            created_at: Utc::now(),
        }
    }
}
