//! Shared instance status table.

pub mod store;

pub use store::InstanceStatusStore;
