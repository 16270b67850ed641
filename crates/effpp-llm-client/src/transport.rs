//! Blocking HTTP transport.

use std::time::Duration;

use reqwest::blocking::Client;
use serde_json::Value;
use tracing::debug;

use crate::error::{LlmError, LlmResult};

/// A JSON POST ready to send.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Value,
    pub timeout: Duration,
}

/// Raw status and body; classification happens in the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Sends one request and waits for the whole response.
///
/// Network failures and timeouts come back as `Err`; every HTTP status,
/// including errors, comes back as `Ok`.
pub trait HttpTransport: Send + Sync {
    fn post_json(&self, request: &HttpRequest) -> LlmResult<HttpResponse>;
}

/// `reqwest` blocking transport.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Client with a per-request timeout.
    pub fn new(timeout: Duration) -> LlmResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::config_error(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

impl HttpTransport for ReqwestTransport {
    fn post_json(&self, request: &HttpRequest) -> LlmResult<HttpResponse> {
        let mut builder = self
            .client
            .post(&request.url)
            .timeout(request.timeout)
            .json(&request.body);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout(request.timeout.as_secs())
            } else {
                LlmError::Network(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let body = response.text().map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout(request.timeout.as_secs())
            } else {
                LlmError::Network(e.to_string())
            }
        })?;
        debug!(url = %request.url, status, bytes = body.len(), "HTTP response received");
        Ok(HttpResponse { status, body })
    }
}
