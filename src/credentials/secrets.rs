//! Tenant-scoped static secrets (service user/token pairs, tenant domains).
//!
//! Parameters are addressed as `/<tenant-lowercase>/<name>`, e.g.
//! `/acme/jiratoken`, and cached with the same TTL discipline as delegated tokens.

use async_trait::async_trait;
use std::collections::HashMap;
use std::env;
use std::sync::Arc;
use std::time::Duration;

use super::TtlCache;
use crate::config::EngineConfig;
use crate::error::Error;
use crate::Result;

/// Backing parameter store. Missing parameters are simply absent from the map.
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn get_parameters(&self, paths: &[String]) -> Result<HashMap<String, String>>;
}

/// Reads `/acme/jiratoken` from `AI_TOOLS_SECRET_ACME_JIRATOKEN`. Meant for
/// local runs and tests.
#[derive(Debug, Clone)]
pub struct EnvSecretStore {
    prefix: String,
}

impl Default for EnvSecretStore {
    fn default() -> Self {
        Self {
            prefix: "AI_TOOLS_SECRET".into(),
        }
    }
}

impl EnvSecretStore {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn env_key(&self, path: &str) -> String {
        let mut key = self.prefix.clone();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            key.push('_');
            key.extend(
                segment
                    .chars()
                    .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' }),
            );
        }
        key
    }
}

#[async_trait]
impl SecretStore for EnvSecretStore {
    async fn get_parameters(&self, paths: &[String]) -> Result<HashMap<String, String>> {
        Ok(paths
            .iter()
            .filter_map(|p| env::var(self.env_key(p)).ok().map(|v| (p.clone(), v)))
            .collect())
    }
}

/// Cached, tenant-aware view over a [`SecretStore`].
#[derive(Clone)]
pub struct TenantSecrets {
    store: Arc<dyn SecretStore>,
    cache: TtlCache<String, String>,
    timeout: Duration,
}

impl TenantSecrets {
    pub fn new(store: Arc<dyn SecretStore>, ttl: Duration, timeout: Duration) -> Self {
        Self {
            store,
            cache: TtlCache::new(ttl),
            timeout,
        }
    }

    pub fn from_config(store: Arc<dyn SecretStore>, config: &EngineConfig) -> Self {
        Self::new(store, config.credential_ttl(), config.credential_timeout())
    }

    pub fn parameter_path(tenant: &str, name: &str) -> String {
        format!("/{}/{}", tenant.to_lowercase(), name)
    }

    /// Fetch `names` for `tenant`, keyed by name. Cached values are served
    /// locally; the rest are fetched in one store call. Any missing parameter
    /// is an error.
    pub async fn get(&self, tenant: &str, names: &[&str]) -> Result<HashMap<String, String>> {
        let mut found = HashMap::with_capacity(names.len());
        let mut missing = Vec::new();
        for name in names {
            let path = Self::parameter_path(tenant, name);
            match self.cache.get(&path)? {
                Some(v) => {
                    found.insert(name.to_string(), v);
                }
                None => missing.push((name.to_string(), path)),
            }
        }
        if missing.is_empty() {
            return Ok(found);
        }

        let paths: Vec<String> = missing.iter().map(|(_, p)| p.clone()).collect();
        let fetched = tokio::time::timeout(self.timeout, self.store.get_parameters(&paths))
            .await
            .map_err(|_| Error::timeout("secret store", self.timeout))??;

        for (name, path) in missing {
            let value = fetched
                .get(&path)
                .ok_or_else(|| Error::credential("secrets", format!("parameter {} not found", path)))?;
            self.cache.insert(path, value.clone())?;
            found.insert(name, value.clone());
        }
        Ok(found)
    }
}
