//! 凭证解析 — 按 (租户, 提供方) 缓存委托访问令牌
//!
//! # Credential Resolver
//!
//! Maps `(tenant, provider)` to a usable delegated access token, or to a
//! [`CredentialStatus::NeedsReauth`] signal. Valid tokens are cached for a fixed
//! TTL and only refetched on miss or expiry; re-auth signals are never cached,
//! so a user who has just re-authorized is picked up on the next call.
//!
//! The backing [`TokenSource`] is supplied by the host application (OAuth
//! token store, vault, ...). On `NeedsReauth` the caller notifies the user via
//! [`CredentialResolver::request_reauth`]; nothing here retries.
//!
//! Static service credentials (user/token pairs, tenant domains) live in
//! [`secrets`].

mod cache;
pub mod secrets;

pub use cache::TtlCache;
pub use secrets::{EnvSecretStore, SecretStore, TenantSecrets};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::config::EngineConfig;
use crate::error::Error;
use crate::Result;

/// Resolution outcome.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CredentialStatus {
    Valid { token: String },
    NeedsReauth,
}

impl fmt::Debug for CredentialStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialStatus::Valid { .. } => f.write_str("Valid { token: *** }"),
            CredentialStatus::NeedsReauth => f.write_str("NeedsReauth"),
        }
    }
}

/// Cached credential for one tenant and provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialRecord {
    pub tenant: String,
    pub provider: String,
    pub status: CredentialStatus,
}

/// Backing implementation of delegated credentials.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn get_token(&self, provider: &str, tenant: &str) -> Result<CredentialStatus>;

    /// Out-of-band re-authorization notification to the end user.
    async fn request_reauth(
        &self,
        provider: &str,
        user_id: &str,
        channel_id: &str,
        tenant: &str,
    ) -> Result<()>;
}

/// Process-wide resolver; cheap to clone and safe to share across loops.
#[derive(Clone)]
pub struct CredentialResolver {
    source: Arc<dyn TokenSource>,
    cache: TtlCache<(String, String), String>,
    timeout: Duration,
}

impl CredentialResolver {
    pub fn new(source: Arc<dyn TokenSource>, ttl: Duration, timeout: Duration) -> Self {
        Self {
            source,
            cache: TtlCache::new(ttl),
            timeout,
        }
    }

    pub fn from_config(source: Arc<dyn TokenSource>, config: &EngineConfig) -> Self {
        Self::new(source, config.credential_ttl(), config.credential_timeout())
    }

    pub async fn resolve(
        &self,
        provider: &str,
        tenant: &str,
        user_id: &str,
        channel_id: &str,
    ) -> Result<CredentialRecord> {
        let key = (tenant.to_string(), provider.to_string());
        if let Some(token) = self.cache.get(&key)? {
            tracing::debug!(provider, tenant, "Credential cache hit");
            return Ok(self.record(tenant, provider, CredentialStatus::Valid { token }));
        }

        let status = tokio::time::timeout(self.timeout, self.source.get_token(provider, tenant))
            .await
            .map_err(|_| Error::timeout(format!("{} credential", provider), self.timeout))??;

        match &status {
            CredentialStatus::Valid { token } => {
                self.cache.insert(key, token.clone())?;
                tracing::debug!(provider, tenant, "Credential fetched and cached");
            }
            CredentialStatus::NeedsReauth => {
                tracing::info!(provider, tenant, user_id, channel_id, "Credential needs re-authorization");
            }
        }
        Ok(self.record(tenant, provider, status))
    }

    pub async fn request_reauth(
        &self,
        provider: &str,
        user_id: &str,
        channel_id: &str,
        tenant: &str,
    ) -> Result<()> {
        tokio::time::timeout(
            self.timeout,
            self.source.request_reauth(provider, user_id, channel_id, tenant),
        )
        .await
        .map_err(|_| Error::timeout(format!("{} re-authorization", provider), self.timeout))?
    }

    fn record(&self, tenant: &str, provider: &str, status: CredentialStatus) -> CredentialRecord {
        CredentialRecord {
            tenant: tenant.to_string(),
            provider: provider.to_string(),
            status,
        }
    }
}
