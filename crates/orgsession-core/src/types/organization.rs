//! Organizations the authenticated principal can switch into.

use serde::{Deserialize, Serialize};

use super::id::OrganizationId;

/// An organization from the parent session's membership list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    /// Organization identifier used for token exchange.
    pub id: OrganizationId,
    /// Display name.
    pub name: String,
    /// Optional human-friendly handle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_handle: Option<String>,
    /// Optional reference to the organization's own tenant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_url: Option<String>,
}

impl Organization {
    /// Create an organization with just an id and a display name.
    pub fn new(id: impl Into<OrganizationId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            org_handle: None,
            ref_url: None,
        }
    }
}
