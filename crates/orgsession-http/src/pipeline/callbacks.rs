//! Lifecycle callback slots a host registers for telemetry.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use tracing::warn;

use orgsession_core::error::AppError;
use orgsession_core::result::AppResult;
use orgsession_core::types::InstanceId;

use crate::request::{PipelineRequest, PipelineResponse};

/// Called when a request is released.
pub type StartCallback = Arc<dyn Fn(&PipelineRequest) -> AppResult<()> + Send + Sync>;
/// Called with a successful response.
pub type SuccessCallback = Arc<dyn Fn(&PipelineResponse) -> AppResult<()> + Send + Sync>;
/// Called with a failed request's error.
pub type ErrorCallback = Arc<dyn Fn(&AppError) -> AppResult<()> + Send + Sync>;
/// Called after success or error.
pub type FinishCallback = Arc<dyn Fn() -> AppResult<()> + Send + Sync>;

/// The four lifecycle slots of one pipeline. Empty slots are skipped.
#[derive(Clone, Default)]
pub struct LifecycleCallbacks {
    /// Start slot.
    pub on_start: Option<StartCallback>,
    /// Success slot.
    pub on_success: Option<SuccessCallback>,
    /// Error slot.
    pub on_error: Option<ErrorCallback>,
    /// Finish slot.
    pub on_finish: Option<FinishCallback>,
}

impl LifecycleCallbacks {
    /// No callbacks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the start callback.
    pub fn on_start(
        mut self,
        f: impl Fn(&PipelineRequest) -> AppResult<()> + Send + Sync + 'static,
    ) -> Self {
        self.on_start = Some(Arc::new(f));
        self
    }

    /// Set the success callback.
    pub fn on_success(
        mut self,
        f: impl Fn(&PipelineResponse) -> AppResult<()> + Send + Sync + 'static,
    ) -> Self {
        self.on_success = Some(Arc::new(f));
        self
    }

    /// Set the error callback.
    pub fn on_error(mut self, f: impl Fn(&AppError) -> AppResult<()> + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(f));
        self
    }

    /// Set the finish callback.
    pub fn on_finish(mut self, f: impl Fn() -> AppResult<()> + Send + Sync + 'static) -> Self {
        self.on_finish = Some(Arc::new(f));
        self
    }
}

impl fmt::Debug for LifecycleCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleCallbacks")
            .field("on_start", &self.on_start.is_some())
            .field("on_success", &self.on_success.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("on_finish", &self.on_finish.is_some())
            .finish()
    }
}

/// Run one callback, logging an error or a panic. The surrounding sequence
/// always continues.
pub(crate) fn invoke(
    instance_id: InstanceId,
    stage: &'static str,
    callback: impl FnOnce() -> AppResult<()>,
) {
    match catch_unwind(AssertUnwindSafe(callback)) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            warn!(instance_id = %instance_id, stage, error = %e, "Pipeline callback failed");
        }
        Err(_) => {
            warn!(instance_id = %instance_id, stage, "Pipeline callback panicked");
        }
    }
}
