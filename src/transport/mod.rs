//! 传输层 — 远程工具 API 与模型后端的 HTTP 调用
//!
//! Network transport. Two seams, both async traits so the agent loop can be
//! driven by in-memory fakes in tests:
//!
//! - [`RemoteExecutor`]: sends a [`CompiledRequest`](crate::compiler::CompiledRequest)
//!   to a remote tool API ([`HttpTransport`]).
//! - [`ModelBackend`]: sends a driver-built body to a model backend
//!   ([`HttpModelBackend`]).
//!
//! Neither retries. Timeouts are applied by the caller.

pub mod backend;
pub mod http;

pub use backend::{BackendRequest, HttpModelBackend, ModelBackend};
pub use http::{HttpTransport, RemoteExecutor, RemoteResponse};

use reqwest::Proxy;
use std::time::Duration;

use crate::config::EngineConfig;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Transport error: {0}")]
    Other(String),
}

/// Shared reqwest client construction: pool sizing, keepalive and proxy.
pub(crate) fn build_client(config: &EngineConfig) -> crate::Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .pool_max_idle_per_host(config.pool_max_idle_per_host)
        .pool_idle_timeout(Some(Duration::from_secs(90)))
        .http2_adaptive_window(true)
        .http2_keep_alive_interval(Some(Duration::from_secs(30)))
        .http2_keep_alive_timeout(Duration::from_secs(10));

    if let Some(proxy_url) = &config.proxy_url {
        match Proxy::all(proxy_url) {
            Ok(proxy) => builder = builder.proxy(proxy),
            Err(e) => tracing::warn!(proxy = %proxy_url, error = %e, "Ignoring invalid proxy URL"),
        }
    }

    builder
        .build()
        .map_err(|e| crate::Error::Transport(TransportError::Other(e.to_string())))
}
