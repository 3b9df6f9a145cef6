//! 集成描述 — 基础地址、认证方式与失败提示
//!
//! An [`Integration`] tells the tool executor where an integration's API lives
//! and how to authenticate against it. Auth comes in two flavours:
//!
//! - **Service credentials**: a tenant-scoped user/token pair read from
//!   [`TenantSecrets`] and sent as HTTP Basic auth (issue trackers).
//! - **Delegated credentials**: a per-tenant OAuth token from the
//!   [`CredentialResolver`], sent as a Bearer token (mail, accounting). These
//!   can come back as "needs re-authorization".

use serde::{Deserialize, Serialize};

use crate::agent::AuthContext;
use crate::compiler::{AuthScheme, RequestTarget};
use crate::credentials::{CredentialResolver, CredentialStatus, TenantSecrets};
use crate::error::{Error, ErrorContext};
use crate::Result;

/// Where the API base URL comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaseUrl {
    Fixed(String),
    /// Name of a tenant secret holding the base URL (e.g. `jiradomain`).
    Secret(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthStrategy {
    None,
    ServiceBasic {
        username_key: String,
        password_key: String,
    },
    Delegated {
        provider: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Integration {
    pub name: String,
    pub base_url: BaseUrl,
    pub auth: AuthStrategy,
    /// Tool result text for failed remote calls.
    pub apology: String,
}

/// Outcome of preparing the request target for one call.
#[derive(Debug, Clone, PartialEq)]
pub enum TargetResolution {
    Ready(RequestTarget),
    NeedsReauth { provider: String },
}

impl Integration {
    pub fn new(name: impl Into<String>, base_url: BaseUrl) -> Self {
        let name = name.into();
        let apology = default_apology(&name);
        Self {
            name,
            base_url,
            auth: AuthStrategy::None,
            apology,
        }
    }

    pub fn with_auth(mut self, auth: AuthStrategy) -> Self {
        self.auth = auth;
        self
    }

    pub fn with_apology(mut self, apology: impl Into<String>) -> Self {
        self.apology = apology.into();
        self
    }

    /// Issue tracker with service credentials and a tenant-specific domain.
    pub fn jira() -> Self {
        Self::new("Jira", BaseUrl::Secret("jiradomain".into())).with_auth(
            AuthStrategy::ServiceBasic {
                username_key: "jirauser".into(),
                password_key: "jiratoken".into(),
            },
        )
    }

    /// Accounting system with delegated OAuth credentials.
    pub fn quickbooks() -> Self {
        Self::new("QB", BaseUrl::Secret("qbdomain".into())).with_auth(AuthStrategy::Delegated {
            provider: "quickbooks".into(),
        })
    }

    /// Mail/calendar API with delegated OAuth credentials.
    pub fn microsoft() -> Self {
        Self::new("Microsoft", BaseUrl::Fixed("https://graph.microsoft.com/v1.0".into()))
            .with_auth(AuthStrategy::Delegated {
                provider: "microsoft".into(),
            })
    }

    pub fn needs_secrets(&self) -> bool {
        matches!(self.base_url, BaseUrl::Secret(_))
            || matches!(self.auth, AuthStrategy::ServiceBasic { .. })
    }

    pub fn needs_resolver(&self) -> bool {
        matches!(self.auth, AuthStrategy::Delegated { .. })
    }

    /// Build the base URL and auth headers for one call on behalf of `ctx`.
    pub async fn resolve_target(
        &self,
        ctx: &AuthContext,
        secrets: Option<&TenantSecrets>,
        resolver: Option<&CredentialResolver>,
    ) -> Result<TargetResolution> {
        let mut wanted: Vec<&str> = Vec::new();
        if let BaseUrl::Secret(name) = &self.base_url {
            wanted.push(name);
        }
        if let AuthStrategy::ServiceBasic {
            username_key,
            password_key,
        } = &self.auth
        {
            wanted.push(username_key);
            wanted.push(password_key);
        }

        let values = if wanted.is_empty() {
            Default::default()
        } else {
            let secrets = secrets.ok_or_else(|| self.missing("secret store"))?;
            secrets.get(&ctx.tenant_id, &wanted).await?
        };
        let lookup = |key: &str| -> Result<String> {
            values
                .get(key)
                .cloned()
                .ok_or_else(|| Error::credential(&self.name, format!("missing secret {}", key)))
        };

        let base_url = match &self.base_url {
            BaseUrl::Fixed(url) => url.clone(),
            BaseUrl::Secret(name) => lookup(name)?,
        };

        let auth = match &self.auth {
            AuthStrategy::None => AuthScheme::None,
            AuthStrategy::ServiceBasic {
                username_key,
                password_key,
            } => AuthScheme::basic(lookup(username_key)?, lookup(password_key)?),
            AuthStrategy::Delegated { provider } => {
                let resolver = resolver.ok_or_else(|| self.missing("credential resolver"))?;
                let record = resolver
                    .resolve(provider, &ctx.tenant_id, &ctx.user_id, &ctx.channel_id)
                    .await?;
                match record.status {
                    CredentialStatus::Valid { token } => AuthScheme::bearer(token),
                    CredentialStatus::NeedsReauth => {
                        return Ok(TargetResolution::NeedsReauth {
                            provider: provider.clone(),
                        })
                    }
                }
            }
        };

        Ok(TargetResolution::Ready(
            RequestTarget::new(base_url).with_auth(&auth),
        ))
    }

    fn missing(&self, what: &str) -> Error {
        Error::configuration_with_context(
            format!("integration {} requires a {}", self.name, what),
            ErrorContext::new().with_source("integration"),
        )
    }
}

pub fn default_apology(name: &str) -> String {
    format!("Error accessing {} API. Please contact administrator", name)
}

pub fn reauth_message(provider: &str) -> String {
    format!("You need to reauthorize {}. Please check your messages", provider)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::SecretStore;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;

    struct FixedStore;

    #[async_trait]
    impl SecretStore for FixedStore {
        async fn get_parameters(&self, paths: &[String]) -> Result<HashMap<String, String>> {
            let all = HashMap::from([
                ("/acme/jiradomain", "https://acme.atlassian.net"),
                ("/acme/jirauser", "bot@acme.io"),
                ("/acme/jiratoken", "t0k"),
            ]);
            Ok(paths
                .iter()
                .filter_map(|p| all.get(p.as_str()).map(|v| (p.clone(), v.to_string())))
                .collect())
        }
    }

    fn ctx() -> AuthContext {
        AuthContext::new("ACME", "U1", "bot@acme.io").with_channel("C1")
    }

    #[tokio::test]
    async fn jira_target_uses_tenant_domain_and_basic_auth() {
        let secrets = TenantSecrets::new(Arc::new(FixedStore), Duration::from_secs(60), Duration::from_secs(1));
        let resolution = Integration::jira()
            .resolve_target(&ctx(), Some(&secrets), None)
            .await
            .unwrap();
        let TargetResolution::Ready(target) = resolution else {
            panic!("expected a ready target");
        };
        assert_eq!(target.base_url, "https://acme.atlassian.net");
        assert!(target.headers["Authorization"].starts_with("Basic "));
    }

    #[tokio::test]
    async fn delegated_auth_without_resolver_is_a_configuration_error() {
        let err = Integration::microsoft()
            .resolve_target(&ctx(), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn fixed_messages() {
        assert_eq!(
            Integration::jira().apology,
            "Error accessing Jira API. Please contact administrator"
        );
        assert_eq!(
            reauth_message("quickbooks"),
            "You need to reauthorize quickbooks. Please check your messages"
        );
    }
}
