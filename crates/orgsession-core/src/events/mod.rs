//! Events emitted by OrgSession operations.
//!
//! Events are published on in-process broadcast channels and consumed by
//! parent waiters, sub-instances, and host telemetry.

pub mod status;
pub mod suborg;

pub use status::StatusEvent;
pub use suborg::SubOrgEvent;
