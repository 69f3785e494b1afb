//! Request pipeline, its callbacks, and the per-instance registry.

pub mod callbacks;
pub mod gate;
pub mod registry;
pub mod stages;

pub use callbacks::LifecycleCallbacks;
pub use registry::PipelineRegistry;
pub use stages::{PipelineSettings, RequestPipeline};
