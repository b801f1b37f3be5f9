//! HTTP transport
//!
//! The [`Transport`] trait is the seam between the sync layer and the
//! network: it moves one request and hands back status plus raw body.
//! Status classification and JSON decoding live in [`decode_json`], so every
//! transport shares the same failure taxonomy.

use async_trait::async_trait;
use http::Method;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::gate::SessionGate;

/// One API request
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            body: None,
        }
    }

    pub fn put(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: Method::PUT,
            path: path.into(),
            body: Some(body),
        }
    }

    pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: Method::POST,
            path: path.into(),
            body: Some(body),
        }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            method: Method::DELETE,
            path: path.into(),
            body: None,
        }
    }
}

/// Status and body of a completed round-trip
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turn a non-2xx response into `ClientError::Http`
    pub fn error_for_status(self) -> ClientResult<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ClientError::Http {
                status: self.status,
                body: String::from_utf8_lossy(&self.body).into_owned(),
            })
        }
    }
}

/// Decode a successful JSON body
pub fn decode_json<T: DeserializeOwned>(response: RawResponse) -> ClientResult<T> {
    let response = response.error_for_status()?;
    Ok(serde_json::from_slice(&response.body)?)
}

/// Request transport
///
/// Implementations only fail with `Network` (the round-trip never finished);
/// any server answer, including non-2xx, is returned as a [`RawResponse`].
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> ClientResult<RawResponse>;
}

// ============================================================================
// NetworkTransport
// ============================================================================

/// reqwest-backed transport
///
/// Attaches the session gate's token as a bearer credential on every request.
#[derive(Debug, Clone)]
pub struct NetworkTransport {
    client: reqwest::Client,
    base_url: String,
    gate: Arc<SessionGate>,
}

impl NetworkTransport {
    pub fn new(config: &ClientConfig, gate: Arc<SessionGate>) -> ClientResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ClientError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.normalized_base_url().to_string(),
            gate,
        })
    }

    /// 获取基础 URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn auth_header(&self) -> Option<String> {
        self.gate.token().map(|t| format!("Bearer {}", t.as_str()))
    }
}

#[async_trait]
impl Transport for NetworkTransport {
    async fn send(&self, request: ApiRequest) -> ClientResult<RawResponse> {
        let url = self.url(&request.path);
        tracing::debug!(method = %request.method, %url, "Sending request");

        let mut req = self.client.request(request.method, &url);
        if let Some(body) = &request.body {
            req = req.json(body);
        }
        if let Some(auth) = self.auth_header() {
            req = req.header(reqwest::header::AUTHORIZATION, auth);
        }

        let response = req.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;
        Ok(RawResponse::new(status, body.to_vec()))
    }
}
