//! # orgsession-storage
//!
//! Durable session storage for OrgSession. Supports three backends:
//!
//! - **memory**: process-local map using [dashmap](https://crates.io/crates/dashmap)
//! - **file**: a single JSON file shared by every process on the host
//! - **redis**: Redis-backed storage using the [redis](https://crates.io/crates/redis) crate
//!
//! The backend is selected at runtime based on configuration.

#[cfg(feature = "file")]
pub mod file;
pub mod keys;
#[cfg(feature = "memory")]
pub mod memory;
pub mod provider;
#[cfg(feature = "redis-backend")]
pub mod redis;

pub use provider::StorageManager;
