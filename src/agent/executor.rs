//! Tool execution: descriptor lookup, target resolution, compilation and the
//! remote call. Every failure becomes a [`ToolResult`]; nothing escapes.

use std::sync::Arc;
use std::time::Duration;

use crate::compiler;
use crate::config::EngineConfig;
use crate::credentials::{CredentialResolver, TenantSecrets};
use crate::integration::{reauth_message, Integration, TargetResolution};
use crate::registry::ToolRegistry;
use crate::transport::RemoteExecutor;
use crate::types::{ToolInvocation, ToolResult};

use super::AuthContext;

pub const UNSUPPORTED_TOOL: &str = "This feature is not supported yet.";

/// Executes the tool calls of one integration. Cheap to clone.
#[derive(Clone)]
pub struct ToolExecutor {
    registry: Arc<ToolRegistry>,
    integration: Arc<Integration>,
    remote: Arc<dyn RemoteExecutor>,
    secrets: Option<TenantSecrets>,
    resolver: Option<CredentialResolver>,
    tool_timeout: Duration,
}

impl ToolExecutor {
    pub fn new(
        registry: Arc<ToolRegistry>,
        integration: Integration,
        remote: Arc<dyn RemoteExecutor>,
    ) -> Self {
        Self {
            registry,
            integration: Arc::new(integration),
            remote,
            secrets: None,
            resolver: None,
            tool_timeout: EngineConfig::default().tool_timeout(),
        }
    }

    pub fn with_secrets(mut self, secrets: TenantSecrets) -> Self {
        self.secrets = Some(secrets);
        self
    }

    pub fn with_resolver(mut self, resolver: CredentialResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = timeout;
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn integration(&self) -> &Integration {
        &self.integration
    }

    /// Run a batch sequentially, in backend order. One result per invocation.
    pub async fn execute_batch(
        &self,
        invocations: &[ToolInvocation],
        ctx: &AuthContext,
    ) -> Vec<ToolResult> {
        let mut results = Vec::with_capacity(invocations.len());
        for inv in invocations {
            results.push(self.execute_one(inv, ctx).await);
        }
        results
    }

    pub async fn execute_one(&self, inv: &ToolInvocation, ctx: &AuthContext) -> ToolResult {
        let Some(descriptor) = self.registry.get(&inv.tool_name) else {
            tracing::warn!(tool = %inv.tool_name, invocation_id = %inv.id, "Unknown tool requested");
            return ToolResult::failure(&inv.id, UNSUPPORTED_TOOL);
        };
        if let Some(ref reason) = inv.input_error {
            tracing::warn!(tool = %inv.tool_name, invocation_id = %inv.id, %reason, "Skipping tool call with unreadable arguments");
            return ToolResult::failure(&inv.id, format!("Unable to read the tool arguments: {}", reason));
        }

        let target = match self
            .integration
            .resolve_target(ctx, self.secrets.as_ref(), self.resolver.as_ref())
            .await
        {
            Ok(TargetResolution::Ready(target)) => target,
            Ok(TargetResolution::NeedsReauth { provider }) => {
                self.notify_reauth(&provider, ctx).await;
                return ToolResult::failure(&inv.id, reauth_message(&provider));
            }
            Err(e) => {
                tracing::error!(tool = %inv.tool_name, invocation_id = %inv.id, error = %e, "Failed to prepare request target");
                return ToolResult::failure(&inv.id, &self.integration.apology);
            }
        };

        let request = match compiler::compile(descriptor, &inv.raw_input, &target) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(tool = %inv.tool_name, invocation_id = %inv.id, error = %e, "Tool request did not compile");
                return ToolResult::failure(&inv.id, format!("Unable to prepare the request: {}", e));
            }
        };

        tracing::info!(
            tool = %inv.tool_name,
            invocation_id = %inv.id,
            method = %request.method,
            url = %request.url,
            "Calling remote tool"
        );

        match tokio::time::timeout(self.tool_timeout, self.remote.execute(&request)).await {
            Ok(Ok(resp)) if resp.is_success() => {
                tracing::info!(tool = %inv.tool_name, status = resp.status, "Remote tool succeeded");
                ToolResult::success(&inv.id, resp.success_content())
            }
            Ok(Ok(resp)) => {
                tracing::error!(
                    tool = %inv.tool_name,
                    status = resp.status,
                    body = %crate::logging::truncate_for_log(&resp.body, 512),
                    "Remote tool returned an error status"
                );
                ToolResult::failure(&inv.id, &self.integration.apology)
            }
            Ok(Err(e)) => {
                tracing::error!(tool = %inv.tool_name, error = %e, "Remote tool call failed");
                ToolResult::failure(&inv.id, &self.integration.apology)
            }
            Err(_) => {
                tracing::error!(
                    tool = %inv.tool_name,
                    timeout_ms = self.tool_timeout.as_millis() as u64,
                    "Remote tool call timed out"
                );
                ToolResult::failure(&inv.id, &self.integration.apology)
            }
        }
    }

    async fn notify_reauth(&self, provider: &str, ctx: &AuthContext) {
        let Some(resolver) = &self.resolver else {
            return;
        };
        if let Err(e) = resolver
            .request_reauth(provider, &ctx.user_id, &ctx.channel_id, &ctx.tenant_id)
            .await
        {
            tracing::error!(provider, error = %e, "Failed to send re-authorization request");
        }
    }
}
