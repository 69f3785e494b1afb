//! Token attachment, the credential stage of every pipeline.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderValue};

use orgsession_core::error::AppError;
use orgsession_core::result::AppResult;
use orgsession_core::traits::AccessTokenSource;

use crate::request::PipelineRequest;

/// Adds credentials to an outbound request.
#[async_trait]
pub trait TokenAttacher: Send + Sync {
    /// Mutate `request` so it carries credentials.
    async fn attach(&self, request: &mut PipelineRequest) -> AppResult<()>;
}

/// Sets `Authorization: Bearer <token>` from a token source on every request.
///
/// The source is asked each time; nothing is cached here.
pub struct BearerTokenAttacher<S: ?Sized> {
    source: Arc<S>,
}

impl<S: AccessTokenSource + ?Sized> BearerTokenAttacher<S> {
    /// Create an attacher backed by `source`.
    pub fn new(source: Arc<S>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl<S> TokenAttacher for BearerTokenAttacher<S>
where
    S: AccessTokenSource + ?Sized + 'static,
{
    async fn attach(&self, request: &mut PipelineRequest) -> AppResult<()> {
        let token = self.source.access_token().await?;
        request.headers.insert(AUTHORIZATION, bearer_header(&token)?);
        Ok(())
    }
}

/// Attaches a fixed bearer token.
pub struct StaticTokenAttacher {
    header: HeaderValue,
}

impl StaticTokenAttacher {
    /// Create an attacher for `token`.
    pub fn new(token: &str) -> AppResult<Self> {
        Ok(Self {
            header: bearer_header(token)?,
        })
    }
}

#[async_trait]
impl TokenAttacher for StaticTokenAttacher {
    async fn attach(&self, request: &mut PipelineRequest) -> AppResult<()> {
        request.headers.insert(AUTHORIZATION, self.header.clone());
        Ok(())
    }
}

fn bearer_header(token: &str) -> AppResult<HeaderValue> {
    let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
        .map_err(|e| AppError::validation(format!("Access token is not a valid header value: {e}")))?;
    value.set_sensitive(true);
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedSource(&'static str);

    #[async_trait]
    impl AccessTokenSource for FixedSource {
        async fn access_token(&self) -> AppResult<String> {
            Ok(self.0.to_string())
        }
    }

    #[tokio::test]
    async fn test_bearer_attacher_sets_header() {
        let attacher = BearerTokenAttacher::new(Arc::new(FixedSource("tok-1")));
        let mut request = PipelineRequest::get("/me");
        attacher.attach(&mut request).await.unwrap();
        assert_eq!(request.bearer_token(), Some("tok-1"));
    }

    #[tokio::test]
    async fn test_attacher_works_through_trait_object() {
        let source: Arc<dyn AccessTokenSource> = Arc::new(FixedSource("tok-2"));
        let attacher = BearerTokenAttacher::new(source);
        let mut request = PipelineRequest::get("/me");
        attacher.attach(&mut request).await.unwrap();
        assert_eq!(request.bearer_token(), Some("tok-2"));
    }

    #[test]
    fn test_static_attacher_rejects_invalid_token() {
        assert!(StaticTokenAttacher::new("bad\ntoken").is_err());
    }
}
