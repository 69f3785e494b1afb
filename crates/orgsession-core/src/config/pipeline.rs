//! Request pipeline configuration.

use serde::{Deserialize, Serialize};

/// Defaults applied to each instance's request pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Whether lifecycle callbacks fire on a freshly created pipeline.
    #[serde(default = "default_true")]
    pub handler_enabled: bool,
    /// Default suspension used by `disable_handler_with_timeout` and batches, in milliseconds.
    #[serde(default = "default_suspend")]
    pub suspend_default_ms: u64,
    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    /// Base URL that relative request paths are resolved against.
    #[serde(default)]
    pub base_url: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            handler_enabled: true,
            suspend_default_ms: default_suspend(),
            request_timeout_seconds: default_request_timeout(),
            base_url: None,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_suspend() -> u64 {
    1000
}

fn default_request_timeout() -> u64 {
    30
}
