//! 运行时配置 — 带环境变量覆盖的默认值
//!
//! Engine configuration. Every knob has a production default and can be
//! overridden through the environment:
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `AI_TOOLS_MAX_RECURSIONS` | 10 | model⇄tool cycles per loop run |
//! | `AI_TOOLS_MODEL_TIMEOUT_SECS` | 60 | bound on one model call |
//! | `AI_TOOLS_TOOL_TIMEOUT_SECS` | 30 | bound on one remote tool call |
//! | `AI_TOOLS_CREDENTIAL_TIMEOUT_SECS` | 10 | bound on one credential/secret lookup |
//! | `AI_TOOLS_CREDENTIAL_TTL_SECS` | 3600 | credential and secret cache TTL |
//! | `AI_TOOLS_LOG_REQUESTS` | false | log (truncated) request/response payloads |
//! | `AI_HTTP_POOL_MAX_IDLE_PER_HOST` | 32 | reqwest connection pool size |
//! | `AI_PROXY_URL` | unset | proxy for every outbound HTTP call |

use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_MAX_RECURSIONS: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub max_recursions: u32,
    pub model_timeout_ms: u64,
    pub tool_timeout_ms: u64,
    pub credential_timeout_ms: u64,
    pub credential_ttl_ms: u64,
    pub log_requests: bool,
    pub pool_max_idle_per_host: usize,
    pub proxy_url: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_recursions: DEFAULT_MAX_RECURSIONS,
            model_timeout_ms: 60_000,
            tool_timeout_ms: 30_000,
            credential_timeout_ms: 10_000,
            credential_ttl_ms: 3_600_000,
            log_requests: false,
            pool_max_idle_per_host: 32,
            proxy_url: None,
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by any `AI_TOOLS_*` / `AI_*` variables that are set.
    /// Unparseable values are ignored with a warning.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            max_recursions: env_parse("AI_TOOLS_MAX_RECURSIONS").unwrap_or(d.max_recursions),
            model_timeout_ms: env_secs("AI_TOOLS_MODEL_TIMEOUT_SECS").unwrap_or(d.model_timeout_ms),
            tool_timeout_ms: env_secs("AI_TOOLS_TOOL_TIMEOUT_SECS").unwrap_or(d.tool_timeout_ms),
            credential_timeout_ms: env_secs("AI_TOOLS_CREDENTIAL_TIMEOUT_SECS").unwrap_or(d.credential_timeout_ms),
            credential_ttl_ms: env_secs("AI_TOOLS_CREDENTIAL_TTL_SECS").unwrap_or(d.credential_ttl_ms),
            log_requests: env_flag("AI_TOOLS_LOG_REQUESTS").unwrap_or(d.log_requests),
            pool_max_idle_per_host: env_parse("AI_HTTP_POOL_MAX_IDLE_PER_HOST")
                .unwrap_or(d.pool_max_idle_per_host),
            proxy_url: env::var("AI_PROXY_URL").ok().filter(|s| !s.trim().is_empty()),
        }
    }

    pub fn with_max_recursions(mut self, n: u32) -> Self {
        self.max_recursions = n;
        self
    }

    pub fn with_model_timeout(mut self, timeout: Duration) -> Self {
        self.model_timeout_ms = millis(timeout);
        self
    }

    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout_ms = millis(timeout);
        self
    }

    pub fn with_credential_ttl(mut self, ttl: Duration) -> Self {
        self.credential_ttl_ms = millis(ttl);
        self
    }

    pub fn with_log_requests(mut self, enabled: bool) -> Self {
        self.log_requests = enabled;
        self
    }

    pub fn with_proxy_url(mut self, url: impl Into<String>) -> Self {
        self.proxy_url = Some(url.into());
        self
    }

    pub fn model_timeout(&self) -> Duration {
        Duration::from_millis(self.model_timeout_ms)
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_millis(self.tool_timeout_ms)
    }

    pub fn credential_timeout(&self) -> Duration {
        Duration::from_millis(self.credential_timeout_ms)
    }

    pub fn credential_ttl(&self) -> Duration {
        Duration::from_millis(self.credential_ttl_ms)
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    let raw = env::var(key).ok()?;
    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring unparseable configuration value");
            None
        }
    }
}

/// Environment values are whole seconds; the config keeps milliseconds.
fn env_secs(key: &str) -> Option<u64> {
    env_parse::<u64>(key).map(|secs| secs.saturating_mul(1000))
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

fn env_flag(key: &str) -> Option<bool> {
    let raw = env::var(key).ok()?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => {
            tracing::warn!(key, value = %raw, "Ignoring unparseable flag");
            None
        }
    }
}
