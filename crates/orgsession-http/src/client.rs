//! HTTP client bound to one instance's pipeline.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, warn};

use orgsession_core::config::PipelineConfig;
use orgsession_core::error::{AppError, ErrorKind};
use orgsession_core::result::AppResult;

use crate::form;
use crate::pipeline::RequestPipeline;
use crate::request::{PipelineRequest, PipelineResponse, RequestBody};

/// Sends requests for one instance through its pipeline.
#[derive(Debug, Clone)]
pub struct AuthHttpClient {
    /// Underlying HTTP client.
    http: reqwest::Client,
    /// The owning instance's pipeline.
    pipeline: Arc<RequestPipeline>,
    /// Base URL for relative request paths.
    base_url: Option<String>,
    /// Callback suspension applied around batches.
    batch_suspension: Duration,
}

impl AuthHttpClient {
    /// Create a client for `pipeline`.
    pub fn new(pipeline: Arc<RequestPipeline>, config: &PipelineConfig) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(map_reqwest_err)?;

        Ok(Self {
            http,
            pipeline,
            base_url: config.base_url.clone(),
            batch_suspension: Duration::from_millis(config.suspend_default_ms),
        })
    }

    /// Override the base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// The pipeline requests pass through.
    pub fn pipeline(&self) -> &Arc<RequestPipeline> {
        &self.pipeline
    }

    /// Send one request.
    ///
    /// Credential and encoding failures stop the request before dispatch.
    /// They, transport errors and statuses >= 400 all go through the error
    /// stage and come back unchanged.
    pub async fn send(&self, request: PipelineRequest) -> AppResult<PipelineResponse> {
        let prepared = self.pipeline.prepare(request).await?;

        match self.dispatch(prepared).await {
            Ok(response) => Ok(self.pipeline.on_success(response).await),
            Err(e) => Err(self.pipeline.on_error(e).await),
        }
    }

    /// Send a batch concurrently with per-request callbacks suspended.
    ///
    /// Results are in request order.
    pub async fn send_all(
        &self,
        requests: Vec<PipelineRequest>,
    ) -> Vec<AppResult<PipelineResponse>> {
        debug!(
            instance_id = %self.pipeline.instance_id(),
            count = requests.len(),
            "Dispatching request batch"
        );
        let _ = self.pipeline.disable_handler_with_timeout(self.batch_suspension);
        join_all(requests.into_iter().map(|request| self.send(request))).await
    }

    async fn dispatch(&self, request: PipelineRequest) -> AppResult<PipelineResponse> {
        let url = self.resolve_url(&request.url)?;
        let method = request.method.clone();

        let mut builder = self
            .http
            .request(request.method.clone(), &url)
            .headers(request.headers.clone());

        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Text(text) => builder.body(text.clone()),
            RequestBody::Multipart(fields) => builder.multipart(form::to_multipart(fields)),
        };

        let response = builder.send().await.map_err(map_reqwest_err)?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(map_reqwest_err)?;
        let elapsed = request.elapsed().unwrap_or_default();

        if status.is_client_error() || status.is_server_error() {
            warn!(
                instance_id = %self.pipeline.instance_id(),
                method = %method,
                url = %url,
                status = status.as_u16(),
                "Request failed"
            );
            return Err(AppError::http(format!(
                "{method} {url} returned {}",
                status.as_u16()
            )));
        }

        debug!(
            instance_id = %self.pipeline.instance_id(),
            method = %method,
            url = %url,
            status = status.as_u16(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Request completed"
        );

        Ok(PipelineResponse {
            status,
            headers,
            body,
            elapsed,
        })
    }

    fn resolve_url(&self, url: &str) -> AppResult<String> {
        if url.starts_with("http://") || url.starts_with("https://") {
            return Ok(url.to_string());
        }

        match &self.base_url {
            Some(base) => Ok(format!(
                "{}/{}",
                base.trim_end_matches('/'),
                url.trim_start_matches('/')
            )),
            None => Err(AppError::validation(format!(
                "Relative URL '{url}' requires a base URL"
            ))),
        }
    }
}

/// Map a reqwest error into an AppError.
fn map_reqwest_err(e: reqwest::Error) -> AppError {
    AppError::with_source(ErrorKind::Http, format!("HTTP error: {e}"), e)
}
