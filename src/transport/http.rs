use async_trait::async_trait;
use reqwest::Method;

use crate::compiler::CompiledRequest;
use crate::config::EngineConfig;
use crate::logging;
use crate::types::HttpMethod;
use crate::Result;

use super::{build_client, TransportError};

/// Status and raw body of a remote tool call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteResponse {
    pub status: u16,
    pub body: String,
}

impl RemoteResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Tool-result text for a successful call: compact JSON for JSON bodies,
    /// `"success"` for empty bodies, the raw text otherwise.
    pub fn success_content(&self) -> String {
        let trimmed = self.body.trim();
        if trimmed.is_empty() {
            return "success".to_string();
        }
        match serde_json::from_str::<serde_json::Value>(trimmed) {
            Ok(v) => v.to_string(),
            Err(_) => self.body.clone(),
        }
    }
}

/// Executes compiled tool requests. Non-2xx statuses are returned, not raised;
/// only failures to get any response at all are errors.
#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    async fn execute(&self, request: &CompiledRequest) -> Result<RemoteResponse>;
}

/// reqwest-backed [`RemoteExecutor`].
pub struct HttpTransport {
    client: reqwest::Client,
    log_requests: bool,
}

impl HttpTransport {
    pub fn new(config: &EngineConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config)?,
            log_requests: config.log_requests,
        })
    }

    fn method(method: HttpMethod) -> Method {
        match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Delete => Method::DELETE,
        }
    }
}

#[async_trait]
impl RemoteExecutor for HttpTransport {
    async fn execute(&self, request: &CompiledRequest) -> Result<RemoteResponse> {
        let mut req = self
            .client
            .request(Self::method(request.method), &request.url);
        for (k, v) in &request.headers {
            req = req.header(k, v);
        }
        if let Some(body) = &request.body {
            req = req.body(body.clone());
        }

        if self.log_requests {
            tracing::debug!(
                method = %request.method,
                url = %request.url,
                body = %logging::payload(request.body.as_deref().unwrap_or("")),
                "Remote tool request"
            );
        }

        let response = req
            .send()
            .await
            .map_err(|e| crate::Error::Transport(TransportError::Http(e)))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| crate::Error::Transport(TransportError::Http(e)))?;

        if self.log_requests {
            tracing::debug!(status, body = %logging::payload(&body), "Remote tool response");
        }
        Ok(RemoteResponse { status, body })
    }
}
