//! # OrgSession
//!
//! Runtime for hosting several independent identity sessions side by side:
//! a parent organization session and the sub-organization sessions derived
//! from it by token exchange.
//!
//! The member crates are re-exported here; [`InstanceRuntime`] wires them
//! together with explicit, per-runtime registries.

pub mod logging;
pub mod runtime;

pub use orgsession_auth as auth;
pub use orgsession_coord as coord;
pub use orgsession_http as http;
pub use orgsession_storage as storage;

pub use orgsession_core::config::AppConfig;
pub use orgsession_core::{AppError, AppResult, ErrorKind};
pub use runtime::InstanceRuntime;
