//! File-backed session storage.

pub mod store;

pub use store::FileSessionStorage;
