//! HTTP exchange abstraction for testability.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::{debug, trace};

use super::error::ApiError;
use crate::channel::HostSelector;

/// HTTP method subset used by the dispatch API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Patch,
}

/// A request relative to the current base host.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path starting with `/`.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
    /// Bearer credential, filled in by [`AuthenticatedClient`](super::AuthenticatedClient).
    pub bearer: Option<String>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            bearer: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn with_query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Status and body of a completed exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Fail with [`ApiError::Status`] unless the status is 2xx.
    pub fn ensure_success(self, path: &str) -> Result<Self, ApiError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ApiError::Status {
                status: self.status,
                path: path.to_string(),
            })
        }
    }

    /// Decode a 2xx JSON body.
    pub fn json<T: DeserializeOwned>(self, path: &str) -> Result<T, ApiError> {
        let response = self.ensure_success(path)?;
        serde_json::from_slice(&response.body).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

/// Trait for performing one HTTP exchange.
pub trait HttpExchange: Send + Sync {
    /// Send `request` and return the response, whatever its status.
    fn execute(
        &self,
        request: ApiRequest,
    ) -> impl Future<Output = Result<ApiResponse, ApiError>> + Send;
}

/// reqwest-backed exchange against the current base host.
pub struct ReqwestExchange {
    http: reqwest::Client,
    hosts: Arc<HostSelector>,
}

impl ReqwestExchange {
    /// Create an exchange with a request timeout.
    pub fn new(hosts: Arc<HostSelector>, timeout: Duration) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { http, hosts })
    }
}

impl HttpExchange for ReqwestExchange {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let url = format!("{}{}", self.hosts.current(), request.path);
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Patch => reqwest::Method::PATCH,
        };
        trace!(url = %url, method = ?request.method, "HTTP request");

        let mut builder = self.http.request(method, &url).query(&request.query);
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::Http(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| ApiError::Http(e.to_string()))?;

        debug!(path = %request.path, status, bytes = body.len(), "HTTP response");
        Ok(ApiResponse::new(status, body.to_vec()))
    }
}
