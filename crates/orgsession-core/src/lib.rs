//! # orgsession-core
//!
//! Core crate for OrgSession. Contains collaborator traits, configuration
//! schemas, typed identifiers, instance/organization domain types, domain
//! events, and the unified error system.
//!
//! This crate has **no** internal dependencies on other OrgSession crates.

pub mod config;
pub mod error;
pub mod events;
pub mod result;
pub mod traits;
pub mod types;

pub use error::{AppError, ErrorKind};
pub use result::AppResult;
