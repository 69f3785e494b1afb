//! The per-instance request pipeline.
//!
//! Pre-request: attach token (always), form-encode (when flagged), stamp the
//! start time, fire `start`. Post-request: fire `success` or `error`, then
//! `finish`. A failed pre-request stage goes through `error` and `finish`
//! too. Disabling the handler silences the callbacks only; requests keep
//! their credentials. Callback errors and panics are logged, never raised.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

use orgsession_core::config::PipelineConfig;
use orgsession_core::error::AppError;
use orgsession_core::result::AppResult;
use orgsession_core::types::InstanceId;

use super::callbacks::{self, LifecycleCallbacks};
use super::gate::HandlerGate;
use crate::attacher::TokenAttacher;
use crate::form;
use crate::request::{PipelineRequest, PipelineResponse};

/// Everything `init` replaces.
#[derive(Clone)]
pub struct PipelineSettings {
    /// Whether lifecycle callbacks fire.
    pub handler_enabled: bool,
    /// Credential stage. `None` sends requests unauthenticated.
    pub token_attacher: Option<Arc<dyn TokenAttacher>>,
    /// Lifecycle callbacks.
    pub callbacks: LifecycleCallbacks,
}

impl PipelineSettings {
    /// Settings with no attacher and no callbacks.
    pub fn new(handler_enabled: bool) -> Self {
        Self {
            handler_enabled,
            token_attacher: None,
            callbacks: LifecycleCallbacks::default(),
        }
    }

    /// Defaults from configuration.
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.handler_enabled)
    }

    /// Use `attacher` for the credential stage.
    pub fn with_attacher(mut self, attacher: Arc<dyn TokenAttacher>) -> Self {
        self.token_attacher = Some(attacher);
        self
    }

    /// Use `callbacks` for the lifecycle stages.
    pub fn with_callbacks(mut self, callbacks: LifecycleCallbacks) -> Self {
        self.callbacks = callbacks;
        self
    }
}

impl std::fmt::Debug for PipelineSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineSettings")
            .field("handler_enabled", &self.handler_enabled)
            .field("token_attacher", &self.token_attacher.is_some())
            .field("callbacks", &self.callbacks)
            .finish()
    }
}

struct PipelineState {
    token_attacher: Option<Arc<dyn TokenAttacher>>,
    callbacks: LifecycleCallbacks,
}

/// Request/response interceptor chain of one session instance.
pub struct RequestPipeline {
    /// Owning instance.
    instance_id: InstanceId,
    /// Attacher and callbacks.
    state: RwLock<PipelineState>,
    /// Callback on/off switch.
    gate: Arc<HandlerGate>,
    /// Suspension used when the caller gives none.
    suspend_default: Duration,
}

impl std::fmt::Debug for RequestPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestPipeline")
            .field("instance_id", &self.instance_id)
            .field("handler_enabled", &self.gate.is_enabled())
            .finish()
    }
}

impl RequestPipeline {
    /// Create a pipeline for `instance_id` with configuration defaults.
    pub fn new(instance_id: InstanceId, config: &PipelineConfig) -> Self {
        Self {
            instance_id,
            state: RwLock::new(PipelineState {
                token_attacher: None,
                callbacks: LifecycleCallbacks::default(),
            }),
            gate: Arc::new(HandlerGate::new(config.handler_enabled)),
            suspend_default: Duration::from_millis(config.suspend_default_ms),
        }
    }

    /// The owning instance.
    pub fn instance_id(&self) -> InstanceId {
        self.instance_id
    }

    /// Replace the whole configuration. Safe to call repeatedly.
    pub async fn init(&self, settings: PipelineSettings) {
        let mut state = self.state.write().await;
        state.token_attacher = settings.token_attacher;
        state.callbacks = settings.callbacks;
        self.gate.set(settings.handler_enabled);

        debug!(
            instance_id = %self.instance_id,
            handler_enabled = settings.handler_enabled,
            has_attacher = state.token_attacher.is_some(),
            "Request pipeline initialized"
        );
    }

    /// Whether lifecycle callbacks currently fire.
    pub fn is_handler_enabled(&self) -> bool {
        self.gate.is_enabled()
    }

    /// Turn callbacks on. Cancels any pending timed re-enable.
    pub fn enable_handler(&self) {
        self.gate.set(true);
    }

    /// Turn callbacks off. Cancels any pending timed re-enable.
    pub fn disable_handler(&self) {
        self.gate.set(false);
    }

    /// Turn callbacks off now and back on after `duration`.
    ///
    /// A later `enable_handler`, `disable_handler`, or timed suspension
    /// supersedes this one's re-enable.
    pub fn disable_handler_with_timeout(&self, duration: Duration) -> JoinHandle<()> {
        debug!(
            instance_id = %self.instance_id,
            duration_ms = duration.as_millis() as u64,
            "Suspending pipeline callbacks"
        );
        self.gate.suspend(duration)
    }

    /// Suspend callbacks for the configured default duration.
    pub fn suspend_handler(&self) -> JoinHandle<()> {
        self.disable_handler_with_timeout(self.suspend_default)
    }

    /// Run the pre-request stages and release the request for dispatch.
    ///
    /// A credential or encoding failure passes through the error stage and
    /// is returned unchanged.
    pub async fn prepare(&self, request: PipelineRequest) -> AppResult<PipelineRequest> {
        match self.run_pre_request(request).await {
            Ok(request) => Ok(request),
            Err(e) => Err(self.on_error(e).await),
        }
    }

    async fn run_pre_request(&self, mut request: PipelineRequest) -> AppResult<PipelineRequest> {
        let (attacher, start) = {
            let state = self.state.read().await;
            (state.token_attacher.clone(), state.callbacks.on_start.clone())
        };

        if let Some(attacher) = attacher {
            attacher.attach(&mut request).await?;
        }

        form::encode_request(&mut request)?;

        request.started_at = Some(Instant::now());

        if self.is_handler_enabled() {
            if let Some(start) = start {
                callbacks::invoke(self.instance_id, "start", || start(&request));
            }
        }

        Ok(request)
    }

    /// Post-response stage for a success.
    pub async fn on_success(&self, response: PipelineResponse) -> PipelineResponse {
        if !self.is_handler_enabled() {
            return response;
        }

        let callbacks = self.state.read().await.callbacks.clone();
        if let Some(on_success) = &callbacks.on_success {
            callbacks::invoke(self.instance_id, "success", || on_success(&response));
        }
        if let Some(on_finish) = &callbacks.on_finish {
            callbacks::invoke(self.instance_id, "finish", || on_finish());
        }
        response
    }

    /// Post-response stage for a failure. The error is handed back unchanged.
    pub async fn on_error(&self, error: AppError) -> AppError {
        if !self.is_handler_enabled() {
            return error;
        }

        let callbacks = self.state.read().await.callbacks.clone();
        if let Some(on_error) = &callbacks.on_error {
            callbacks::invoke(self.instance_id, "error", || on_error(&error));
        }
        if let Some(on_finish) = &callbacks.on_finish {
            callbacks::invoke(self.instance_id, "finish", || on_finish());
        }
        error
    }
}
