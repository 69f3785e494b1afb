//! Typed identifiers for session instances and organizations.
//!
//! Using distinct types prevents accidentally passing an organization id
//! where an instance id is expected.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Identifier of one session instance within a host application.
///
/// Instance `0` is conventionally the root (parent) instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(pub u32);

impl InstanceId {
    /// The conventional root instance.
    pub const ROOT: InstanceId = InstanceId(0);

    /// Create an instance identifier.
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Return the raw numeric value.
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Whether this is the root instance.
    pub const fn is_root(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for InstanceId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u32>().map(Self)
    }
}

impl From<u32> for InstanceId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl From<InstanceId> for u32 {
    fn from(id: InstanceId) -> u32 {
        id.0
    }
}

/// Identifier of an organization known to the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrganizationId(pub String);

impl OrganizationId {
    /// Create an organization identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrganizationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OrganizationId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for OrganizationId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_id_parse_and_display() {
        let id: InstanceId = " 7 ".parse().expect("should parse");
        assert_eq!(id, InstanceId(7));
        assert_eq!(id.to_string(), "7");
        assert!(InstanceId::ROOT.is_root());
        assert!("seven".parse::<InstanceId>().is_err());
    }

    #[test]
    fn test_organization_id_is_transparent_in_json() {
        let id = OrganizationId::new("org-a");
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, "\"org-a\"");
    }
}
