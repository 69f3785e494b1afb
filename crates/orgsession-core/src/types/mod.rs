//! Core type definitions used across the OrgSession workspace.

pub mod id;
pub mod organization;
pub mod status;
pub mod token;

pub use id::{InstanceId, OrganizationId};
pub use organization::Organization;
pub use status::{InstanceRecord, InstanceStatus, InstanceStatusTable, now_millis};
pub use token::TokenResult;
