//! # orgsession-coord
//!
//! Cross-instance coordination for OrgSession: the shared instance status
//! table and the protocol a sub-instance uses to wait for its parent.
//!
//! Instances never call each other directly. They rendezvous through a
//! [`SessionStorage`](orgsession_core::traits::SessionStorage) slot and, when
//! they share a process, through status events on a broadcast channel.

pub mod status;
pub mod wait;

pub use status::InstanceStatusStore;
pub use wait::{MIN_POLL_INTERVAL, ParentObservation, ParentWaitProtocol, WaitOptions, WaitOutcome};
