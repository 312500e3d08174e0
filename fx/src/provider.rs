//! Rate source trait and implementations.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;
use tracing::debug;

use crate::error::{FxError, FxResult};

/// Something that can fetch a JSON document from an endpoint.
///
/// The loader only needs "JSON or failure"; status handling and body
/// decoding live behind this seam.
#[async_trait]
pub trait RateSource: Send + Sync {
    /// Get the source name.
    fn name(&self) -> &str;

    /// Fetch and decode the JSON document at `endpoint`.
    async fn fetch(&self, endpoint: &str) -> FxResult<Value>;
}

/// HTTP-backed rate source.
#[derive(Clone)]
pub struct HttpRateSource {
    http: reqwest::Client,
}

impl HttpRateSource {
    /// Create a source with the given request timeout.
    pub fn new(timeout: Duration) -> FxResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("ratepivot/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl RateSource for HttpRateSource {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch(&self, endpoint: &str) -> FxResult<Value> {
        let url =
            Url::parse(endpoint).map_err(|e| FxError::InvalidEndpoint(format!("{endpoint}: {e}")))?;

        let resp = self.http.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FxError::HttpStatus(status.as_u16()));
        }

        let body = resp.text().await?;
        debug!(endpoint, bytes = body.len(), "Fetched rate payload");
        Ok(serde_json::from_str(&body)?)
    }
}

/// Canned response for [`MockRateSource`].
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Successful JSON body.
    Json(Value),
    /// Successful status with a raw (possibly invalid) body.
    Body(String),
    /// Non-success HTTP status.
    Status(u16),
    /// Network-level failure.
    Unreachable,
}

/// Mock rate source for testing.
///
/// Unknown endpoints behave as unreachable. Every call is recorded so tests
/// can check attempt order.
#[cfg(any(test, feature = "test-utils"))]
#[derive(Default)]
pub struct MockRateSource {
    responses: parking_lot::RwLock<std::collections::HashMap<String, MockResponse>>,
    calls: parking_lot::Mutex<Vec<String>>,
}

#[cfg(any(test, feature = "test-utils"))]
impl MockRateSource {
    /// Create a new mock source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the response for an endpoint.
    pub fn respond(&self, endpoint: impl Into<String>, response: MockResponse) -> &Self {
        self.responses.write().insert(endpoint.into(), response);
        self
    }

    /// Endpoints fetched so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl RateSource for MockRateSource {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch(&self, endpoint: &str) -> FxResult<Value> {
        self.calls.lock().push(endpoint.to_string());

        let response = self.responses.read().get(endpoint).cloned();
        match response {
            Some(MockResponse::Json(value)) => Ok(value),
            Some(MockResponse::Body(body)) => Ok(serde_json::from_str(&body)?),
            Some(MockResponse::Status(code)) => Err(FxError::HttpStatus(code)),
            Some(MockResponse::Unreachable) | None => {
                Err(FxError::InvalidEndpoint(format!("{endpoint}: unreachable")))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_mock_source() {
        let source = MockRateSource::new();
        source
            .respond("a", MockResponse::Json(json!({ "usd": { "eur": 0.85 } })))
            .respond("b", MockResponse::Status(500))
            .respond("c", MockResponse::Body("<html>".to_string()));

        assert!(source.fetch("a").await.is_ok());
        assert!(matches!(source.fetch("b").await, Err(FxError::HttpStatus(500))));
        assert!(matches!(source.fetch("c").await, Err(FxError::Parse(_))));
        assert!(source.fetch("d").await.unwrap_err().is_network());
        assert_eq!(source.calls(), vec!["a", "b", "c", "d"]);
    }

    #[tokio::test]
    async fn test_http_source_rejects_bad_url() {
        let source = HttpRateSource::new(Duration::from_secs(1)).unwrap();
        let result = source.fetch("not a url").await;
        assert!(matches!(result, Err(FxError::InvalidEndpoint(_))));
    }
}
