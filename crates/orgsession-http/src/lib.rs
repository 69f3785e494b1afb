//! # orgsession-http
//!
//! Outbound HTTP for OrgSession instances. Every request of one instance
//! passes through that instance's [`RequestPipeline`]: credentials are
//! attached, form payloads are encoded, the start time is stamped, and the
//! host's lifecycle callbacks observe the outcome.
//!
//! Pipelines live in a [`PipelineRegistry`] keyed by instance id, so two
//! instances never share tokens or callbacks.

pub mod attacher;
pub mod client;
pub mod form;
pub mod pipeline;
pub mod request;

pub use attacher::{BearerTokenAttacher, StaticTokenAttacher, TokenAttacher};
pub use client::AuthHttpClient;
pub use pipeline::{LifecycleCallbacks, PipelineRegistry, PipelineSettings, RequestPipeline};
pub use request::{FormField, PipelineRequest, PipelineResponse, RequestBody};
