//! Core traits defined in `orgsession-core` and implemented by other crates
//! or by the host application.

pub mod parent;
pub mod storage;

pub use parent::{AccessTokenSource, ParentSession, TokenExchanger};
pub use storage::SessionStorage;
