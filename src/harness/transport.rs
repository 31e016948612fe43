use async_trait::async_trait;
use http::{Method, StatusCode};
use std::time::Duration;

use crate::errors::ProbeError;
use crate::harness::envelope::Envelope;

/// A single request sent to the service under test.
///
/// The path is kept as segments so module names and ids are always encoded
/// as one segment each.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeRequest {
    pub method: Method,
    pub segments: Vec<String>,
    pub body: Option<serde_json::Value>,
}

impl ProbeRequest {
    pub fn new(method: Method, segments: &[&str]) -> Self {
        Self {
            method,
            segments: segments.iter().map(|s| s.to_string()).collect(),
            body: None,
        }
    }

    pub fn get(segments: &[&str]) -> Self {
        Self::new(Method::GET, segments)
    }

    pub fn with_json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Absolute path, e.g. `/api/fruits/apple`.
    pub fn path(&self) -> String {
        format!("/{}", self.segments.join("/"))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProbeResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl ProbeResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn is_html(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("html"))
    }

    /// Decode the `{ success, data?, error? }` envelope.
    pub fn envelope(&self) -> Result<Envelope, ProbeError> {
        serde_json::from_slice(&self.body).map_err(|e| ProbeError::Decode(e.to_string()))
    }
}

/// How the harness reaches a running service.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ProbeRequest) -> Result<ProbeResponse, ProbeError>;
}

/// Transport over real HTTP. Every request is bounded by `timeout`.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: reqwest::Url,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(base_url: reqwest::Url, timeout: Duration) -> anyhow::Result<Self> {
        use anyhow::Context;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("crud-grader/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    pub fn url_for(&self, request: &ProbeRequest) -> Result<reqwest::Url, ProbeError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| ProbeError::Url(self.base_url.to_string()))?;
            segments.pop_if_empty();
            segments.extend(&request.segments);
        }
        Ok(url)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ProbeRequest) -> Result<ProbeResponse, ProbeError> {
        let url = self.url_for(&request)?;
        tracing::debug!(method = %request.method, path = %request.path(), "sending request");

        let mut builder = self.client.request(request.method.clone(), url);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| self.map_error(e))?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await.map_err(|e| self.map_error(e))?;

        Ok(ProbeResponse {
            status,
            content_type,
            body: body.to_vec(),
        })
    }
}

impl HttpTransport {
    fn map_error(&self, e: reqwest::Error) -> ProbeError {
        if e.is_timeout() {
            ProbeError::Timeout(self.timeout)
        } else {
            ProbeError::Transport(e.to_string())
        }
    }
}
