//! Requests and responses as they travel through a pipeline.

use std::time::Duration;

use bytes::Bytes;
use reqwest::Method;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use serde::de::DeserializeOwned;
use tokio::time::Instant;

use orgsession_core::error::AppError;
use orgsession_core::result::AppResult;

/// One multipart form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    /// Field name.
    pub name: String,
    /// Field value.
    pub value: String,
}

impl FormField {
    /// Create a form field.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Payload of an outbound request.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RequestBody {
    /// No body.
    #[default]
    Empty,
    /// A JSON document.
    Json(serde_json::Value),
    /// Raw text.
    Text(String),
    /// Multipart form fields.
    Multipart(Vec<FormField>),
}

/// An outbound request owned by one instance.
#[derive(Debug, Clone)]
pub struct PipelineRequest {
    /// HTTP method.
    pub method: Method,
    /// Absolute URL, or a path resolved against the client's base URL.
    pub url: String,
    /// Request headers.
    pub headers: HeaderMap,
    /// Request payload.
    pub body: RequestBody,
    /// Convert a JSON object payload into multipart form fields before dispatch.
    pub form_encode: bool,
    /// When the pipeline released the request, for latency measurement.
    pub started_at: Option<Instant>,
}

impl PipelineRequest {
    /// Create a request with no body.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: RequestBody::Empty,
            form_encode: false,
            started_at: None,
        }
    }

    /// Create a GET request.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    /// Create a POST request.
    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    /// Set a JSON payload.
    pub fn json(mut self, value: serde_json::Value) -> Self {
        self.body = RequestBody::Json(value);
        self
    }

    /// Set a text payload.
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.body = RequestBody::Text(text.into());
        self
    }

    /// Flag the request for multipart form encoding.
    pub fn form_encoded(mut self) -> Self {
        self.form_encode = true;
        self
    }

    /// Add a header.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// The bearer token currently attached, if any.
    pub fn bearer_token(&self) -> Option<&str> {
        self.headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
    }

    /// Time since the pipeline released the request.
    pub fn elapsed(&self) -> Option<Duration> {
        self.started_at.map(|started| started.elapsed())
    }
}

/// A completed response.
#[derive(Debug, Clone)]
pub struct PipelineResponse {
    /// HTTP status.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Raw body.
    pub body: Bytes,
    /// Time from pipeline release to the full body.
    pub elapsed: Duration,
}

impl PipelineResponse {
    /// Whether the status is 2xx.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Body as UTF-8 text (lossy).
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Deserialize the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> AppResult<T> {
        serde_json::from_slice(&self.body).map_err(AppError::from)
    }
}
