//! Sub-organization session events.

use serde::{Deserialize, Serialize};

use crate::types::{InstanceId, OrganizationId};

/// Lifecycle events of sub-organization sessions hosted by a parent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SubOrgEvent {
    /// A sub-organization session became active.
    Registered {
        /// The organization.
        organization_id: OrganizationId,
        /// The sub-instance bound to the session.
        instance_id: InstanceId,
    },
    /// A sub-organization session was marked inactive.
    Unregistered {
        /// The organization.
        organization_id: OrganizationId,
    },
    /// The parent signed out and every sub-session was dropped.
    ParentSignedOut {
        /// Number of subscribers notified.
        notified: usize,
        /// Number of subscribers whose callback failed.
        failed: usize,
    },
}
