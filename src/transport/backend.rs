//! Model backend client.

use async_trait::async_trait;
use keyring::Entry;
use serde_json::Value;
use std::env;

use crate::config::EngineConfig;
use crate::drivers::{BackendKind, BackendResponse};
use crate::logging;
use crate::Result;

use super::{build_client, TransportError};

const KEYRING_SERVICE: &str = "ai-lib-tools";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// One outbound model call: the target model and the driver-built body.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendRequest {
    pub model: String,
    pub body: Value,
}

/// A model backend the agent loop can talk to. The backend's [`BackendKind`]
/// selects the driver that builds and decodes its messages.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    async fn send(&self, request: &BackendRequest) -> Result<BackendResponse>;
}

/// HTTP client for the three supported backends.
///
/// | Kind | Endpoint | Auth |
/// |------|----------|------|
/// | OpenAI | `{base}/chat/completions` | `Authorization: Bearer` |
/// | Anthropic | `{base}/v1/messages` | `x-api-key` + `anthropic-version` |
/// | Bedrock | `{base}/model/{model}/converse` | `Authorization: Bearer` (Bedrock API key) |
pub struct HttpModelBackend {
    client: reqwest::Client,
    kind: BackendKind,
    base_url: String,
    api_key: Option<String>,
    log_requests: bool,
}

impl HttpModelBackend {
    /// Base URL from `<PROVIDER>_BASE_URL` or the public default; API key from
    /// the OS keyring, then `<PROVIDER>_API_KEY`.
    pub fn new(kind: BackendKind, config: &EngineConfig) -> Result<Self> {
        let base_url = env::var(format!("{}_BASE_URL", kind.as_str().to_uppercase()))
            .unwrap_or_else(|_| Self::default_base_url(kind).to_string());
        Ok(Self {
            client: build_client(config)?,
            kind,
            base_url,
            api_key: Self::get_api_key(kind),
            log_requests: config.log_requests,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn default_base_url(kind: BackendKind) -> &'static str {
        match kind {
            BackendKind::OpenAi => "https://api.openai.com/v1",
            BackendKind::Anthropic => "https://api.anthropic.com",
            BackendKind::Bedrock => "https://bedrock-runtime.us-east-1.amazonaws.com",
        }
    }

    fn get_api_key(kind: BackendKind) -> Option<String> {
        // 1. Try Keyring
        if let Ok(entry) = Entry::new(KEYRING_SERVICE, kind.as_str()) {
            if let Ok(key) = entry.get_password() {
                return Some(key);
            }
        }

        // 2. Try Environment Variable (PROVIDER_API_KEY)
        let env_var = format!("{}_API_KEY", kind.as_str().to_uppercase());
        env::var(env_var).ok().or_else(|| match kind {
            BackendKind::Bedrock => env::var("AWS_BEARER_TOKEN_BEDROCK").ok(),
            _ => None,
        })
    }

    fn endpoint(&self, model: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        match self.kind {
            BackendKind::OpenAi => format!("{}/chat/completions", base),
            BackendKind::Anthropic => format!("{}/v1/messages", base),
            BackendKind::Bedrock => format!("{}/model/{}/converse", base, model),
        }
    }
}

#[async_trait]
impl ModelBackend for HttpModelBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    async fn send(&self, request: &BackendRequest) -> Result<BackendResponse> {
        let url = self.endpoint(&request.model);
        let mut req = self.client.post(&url).json(&request.body);
        if let Some(key) = &self.api_key {
            req = match self.kind {
                BackendKind::Anthropic => req
                    .header("x-api-key", key)
                    .header("anthropic-version", ANTHROPIC_VERSION),
                BackendKind::OpenAi | BackendKind::Bedrock => req.bearer_auth(key),
            };
        } else if self.kind == BackendKind::Anthropic {
            req = req.header("anthropic-version", ANTHROPIC_VERSION);
        }

        if self.log_requests {
            tracing::debug!(
                backend = %self.kind,
                url = %url,
                body = %logging::payload(&request.body.to_string()),
                "Model request"
            );
        }

        let response = req
            .send()
            .await
            .map_err(|e| crate::Error::Transport(TransportError::Http(e)))?;
        let status = response.status();
        let request_id = response
            .headers()
            .get("x-amzn-requestid")
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let text = response
            .text()
            .await
            .map_err(|e| crate::Error::Transport(TransportError::Http(e)))?;

        if self.log_requests {
            tracing::debug!(backend = %self.kind, status = status.as_u16(), body = %logging::payload(&text), "Model response");
        }

        if !status.is_success() {
            return Err(crate::Error::Remote {
                status: status.as_u16(),
                message: logging::truncate_for_log(&text, 512),
            });
        }

        let body: Value = serde_json::from_str(&text).map_err(|e| {
            crate::Error::protocol(self.kind.as_str(), format!("response is not JSON: {}", e))
        })?;
        Ok(BackendResponse { body, request_id })
    }
}
