//! HTTP client for gateway probes
//!
//! Thin wrapper over reqwest used for health checks against the gateway.

use anyhow::{Context, Result};
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// HTTP client errors
#[derive(Error, Debug)]
pub enum HttpError {
    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Timeout after {0} seconds")]
    Timeout(u64),

    #[error("Connection refused to {0}")]
    ConnectionRefused(String),
}

/// HTTP client used for gateway probes
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    timeout_secs: u64,
}

impl HttpClient {
    /// Create client with custom timeout
    pub fn with_timeout(timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            timeout_secs,
        })
    }

    /// Send a GET request
    pub async fn get(&self, url: &str) -> Result<HttpResponse, HttpError> {
        debug!("Sending GET request to {}", url);

        let start = std::time::Instant::now();
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    HttpError::Timeout(self.timeout_secs)
                } else if e.is_connect() {
                    HttpError::ConnectionRefused(url.to_string())
                } else {
                    HttpError::RequestFailed(e.to_string())
                }
            })?;

        let duration_ms = start.elapsed().as_millis() as u64;
        let status = response.status();

        let body = response
            .text()
            .await
            .map_err(|e| HttpError::RequestFailed(format!("reading body: {e}")))?;

        debug!("Response: {} in {}ms", status.as_u16(), duration_ms);

        Ok(HttpResponse {
            status_code: status.as_u16(),
            body,
            duration_ms,
        })
    }
}

/// HTTP response
#[derive(Clone, Debug)]
pub struct HttpResponse {
    pub status_code: u16,
    pub body: String,
    pub duration_ms: u64,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// Body re-indented when it is JSON, verbatim otherwise
    pub fn pretty_body(&self) -> String {
        serde_json::from_str::<serde_json::Value>(&self.body)
            .ok()
            .and_then(|v| serde_json::to_string_pretty(&v).ok())
            .unwrap_or_else(|| self.body.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status_code: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status_code,
            body: body.to_string(),
            duration_ms: 3,
        }
    }

    #[test]
    fn test_http_response() {
        assert!(response(200, "").is_success());
        assert!(response(204, "").is_success());
        assert!(!response(302, "").is_success());
        assert!(!response(503, "").is_success());
    }

    #[test]
    fn test_pretty_body() {
        let json = response(200, r#"{"status":"ok"}"#);
        assert_eq!(json.pretty_body(), "{\n  \"status\": \"ok\"\n}");

        let text = response(200, "healthy");
        assert_eq!(text.pretty_body(), "healthy");
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let client = HttpClient::with_timeout(2).unwrap();
        // port 9 (discard) is closed on test hosts
        let err = client.get("http://127.0.0.1:9/health").await.unwrap_err();
        assert!(matches!(
            err,
            HttpError::ConnectionRefused(_) | HttpError::RequestFailed(_) | HttpError::Timeout(_)
        ));
    }
}
