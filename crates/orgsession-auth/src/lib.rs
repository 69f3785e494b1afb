//! # orgsession-auth
//!
//! Sub-organization sessions. A parent instance's [`MultiOrgCoordinator`]
//! turns the parent's credential into organization-scoped tokens by token
//! exchange, tracks the resulting sessions, and tells sub-instances when
//! the parent signs out. [`SubInstanceBootstrap`] runs the full mount flow
//! of a sub-instance against the shared status table.

pub mod bootstrap;
pub mod multiorg;

pub use bootstrap::SubInstanceBootstrap;
pub use multiorg::{MultiOrgCoordinator, SignOutReport, SignOutSubscription, SubOrgSession};
