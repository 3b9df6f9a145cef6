//! 智能体循环 — 模型推理与工具执行交替进行的有界状态机
//!
//! # Agentic Loop
//!
//! One run answers one user message. Each cycle sends the conversation to the
//! model backend, executes every tool call of the reply (sequentially, in
//! backend order) and feeds the results back, until the model answers without
//! tool calls, signals an explicit stop, or the recursion budget is spent.
//!
//! | Outcome | [`Completion`] | Final text |
//! |---------|----------------|------------|
//! | Model answered | `Finished` | the answer, else [`FALLBACK_TEXT`] |
//! | Budget spent | `BudgetExhausted` | last assistant text, else [`FALLBACK_TEXT`] |
//! | Model call timed out / unreachable | `ModelUnavailable` | same as above |
//! | Caller cancelled | `Cancelled` | same as above; an unanswered tool batch is dropped |
//! | Malformed model response | `Err(LoopFailure)` | none; usage log preserved |
//!
//! Tool failures never end a run: they come back to the model as tool results.

mod executor;
pub mod prompt;
mod state;

pub use executor::{ToolExecutor, UNSUPPORTED_TOOL};
pub use state::{LoopState, Phase};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::config::EngineConfig;
use crate::drivers::{create_driver, InferenceOptions, ProviderDriver, UsageRecord};
use crate::error::Error;
use crate::transport::{BackendRequest, ModelBackend};
use crate::types::Turn;

pub const FALLBACK_TEXT: &str = "Error accessing the requested service";
pub const INCOMPLETE_NOTE: &str = "The process may be incomplete.";

/// Who the loop acts for: tenant and end user, used for credentials and
/// prompt personalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    pub tenant_id: String,
    pub user_id: String,
    pub email: String,
    #[serde(default)]
    pub channel_id: String,
}

impl AuthContext {
    pub fn new(
        tenant_id: impl Into<String>,
        user_id: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            user_id: user_id.into(),
            email: email.into(),
            channel_id: String::new(),
        }
    }

    pub fn with_channel(mut self, channel_id: impl Into<String>) -> Self {
        self.channel_id = channel_id.into();
        self
    }
}

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub max_recursions: u32,
    pub model_timeout: Duration,
    pub inference: InferenceOptions,
    /// Label recorded as the `source` of every usage record.
    pub source: String,
    /// Values for `{{name}}` placeholders in the system prompt.
    pub prompt_vars: Map<String, Value>,
}

impl LoopConfig {
    pub fn new(inference: InferenceOptions) -> Self {
        Self::from_engine(&EngineConfig::default(), inference)
    }

    pub fn from_engine(config: &EngineConfig, inference: InferenceOptions) -> Self {
        Self {
            max_recursions: config.max_recursions,
            model_timeout: config.model_timeout(),
            inference,
            source: "agent".into(),
            prompt_vars: Map::new(),
        }
    }

    pub fn with_max_recursions(mut self, n: u32) -> Self {
        self.max_recursions = n;
        self
    }

    pub fn with_model_timeout(mut self, timeout: Duration) -> Self {
        self.model_timeout = timeout;
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn with_prompt_vars(mut self, vars: Map<String, Value>) -> Self {
        self.prompt_vars = vars;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Completion {
    Finished,
    BudgetExhausted,
    ModelUnavailable,
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct LoopOutcome {
    pub final_text: String,
    pub usage_log: Vec<UsageRecord>,
    pub completion: Completion,
    /// Set for every completion other than `Finished`.
    pub incomplete_note: Option<String>,
    /// Conversation after the run: input history, the user turn and every
    /// turn the loop appended.
    pub turns: Vec<Turn>,
}

impl LoopOutcome {
    pub fn is_complete(&self) -> bool {
        self.completion == Completion::Finished
    }
}

/// Fatal run failure. The usage log is still returned for billing.
#[derive(Debug, thiserror::Error)]
#[error("agent loop failed: {error}")]
pub struct LoopFailure {
    #[source]
    pub error: Error,
    pub usage_log: Vec<UsageRecord>,
}

/// A configured agent: one backend, one integration's tools.
pub struct AgentLoop {
    driver: Box<dyn ProviderDriver>,
    backend: Arc<dyn ModelBackend>,
    executor: ToolExecutor,
    config: LoopConfig,
    cancel: CancellationToken,
}

impl AgentLoop {
    /// The driver is chosen once, from the backend's kind.
    pub fn new(backend: Arc<dyn ModelBackend>, executor: ToolExecutor, config: LoopConfig) -> Self {
        Self {
            driver: create_driver(backend.kind()),
            backend,
            executor,
            config,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn config(&self) -> &LoopConfig {
        &self.config
    }

    pub async fn run(
        &self,
        system_prompt: &str,
        history: &[Turn],
        user_text: &str,
        ctx: &AuthContext,
    ) -> Result<LoopOutcome, LoopFailure> {
        let run_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!(
            "agent_loop",
            %run_id,
            backend = %self.driver.kind(),
            source = %self.config.source,
            tenant = %ctx.tenant_id,
        );
        self.run_inner(system_prompt, history, user_text, ctx)
            .instrument(span)
            .await
    }

    async fn run_inner(
        &self,
        system_prompt: &str,
        history: &[Turn],
        user_text: &str,
        ctx: &AuthContext,
    ) -> Result<LoopOutcome, LoopFailure> {
        let system = prompt::personalize(system_prompt, &self.config.prompt_vars, ctx);
        let mut turns = history.to_vec();
        turns.push(Turn::user(user_text));

        let tools = self.executor.registry().descriptors();
        let mut state = LoopState::new(self.config.max_recursions);

        loop {
            if self.cancel.is_cancelled() {
                tracing::info!("Loop cancelled by caller");
                return Ok(self.degraded(state, turns, Completion::Cancelled));
            }
            if state.budget_exhausted() {
                tracing::warn!(max = self.config.max_recursions, "Recursion budget exhausted");
                return Ok(self.degraded(state, turns, Completion::BudgetExhausted));
            }

            let body = match self
                .driver
                .build_request(&system, &turns, tools, &self.config.inference)
            {
                Ok(b) => b,
                Err(error) => return Err(fail(error, state)),
            };
            let request = BackendRequest {
                model: self.config.inference.model.clone(),
                body,
            };

            let response = match tokio::time::timeout(
                self.config.model_timeout,
                self.backend.send(&request),
            )
            .await
            {
                Ok(Ok(r)) => r,
                Ok(Err(error)) if error.is_fatal_to_loop() => return Err(fail(error, state)),
                Ok(Err(error)) => {
                    tracing::error!(error = %error, "Model call failed");
                    return Ok(self.degraded(state, turns, Completion::ModelUnavailable));
                }
                Err(_) => {
                    tracing::error!(
                        timeout_ms = self.config.model_timeout.as_millis() as u64,
                        "Model call timed out"
                    );
                    return Ok(self.degraded(state, turns, Completion::ModelUnavailable));
                }
            };

            let parsed = match self.driver.parse_response(&response) {
                Ok(p) => p,
                Err(error) => return Err(fail(error, state)),
            };
            state.record_usage(UsageRecord {
                backend_request_id: parsed.request_id.clone(),
                model: self.config.inference.model.clone(),
                usage: parsed.usage,
                source: self.config.source.clone(),
            });
            state.note_text(parsed.text.as_deref());

            if parsed.explicit_stop || parsed.invocations.is_empty() {
                if !parsed.invocations.is_empty() {
                    tracing::debug!(
                        ignored = parsed.invocations.len(),
                        "Explicit stop signal; skipping tool calls"
                    );
                }
                let text = parsed
                    .text
                    .clone()
                    .or_else(|| state.last_text.clone())
                    .unwrap_or_default();
                let answer = prompt::strip_thinking(&text);
                if answer.is_empty() {
                    tracing::warn!("Model finished without a visible answer");
                    state.finalize(FALLBACK_TEXT.to_string());
                } else {
                    turns.push(Turn::assistant(text));
                    state.finalize(answer);
                }
                tracing::info!(usage_records = state.usage_log.len(), "Loop finished");
                return Ok(outcome(state, turns, Completion::Finished));
            }

            state.begin_tools();
            tracing::info!(
                calls = parsed.invocations.len(),
                remaining = state.recursions_remaining,
                "Executing tool batch"
            );
            let results = self.executor.execute_batch(&parsed.invocations, ctx).await;

            // Tool calls enter the history only together with their results.
            if self.cancel.is_cancelled() {
                tracing::info!("Loop cancelled during tool batch; discarding results");
                return Ok(self.degraded(state, turns, Completion::Cancelled));
            }
            turns.push(parsed.assistant_turn());
            turns.push(Turn::tool_results(results));
            state.await_model();
        }
    }

    fn degraded(&self, mut state: LoopState, turns: Vec<Turn>, completion: Completion) -> LoopOutcome {
        let text = state
            .last_text
            .as_deref()
            .map(prompt::strip_thinking)
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| FALLBACK_TEXT.to_string());
        state.finalize(text);
        outcome(state, turns, completion)
    }
}

fn outcome(state: LoopState, turns: Vec<Turn>, completion: Completion) -> LoopOutcome {
    LoopOutcome {
        final_text: state.final_text.unwrap_or_default(),
        usage_log: state.usage_log,
        completion,
        incomplete_note: (completion != Completion::Finished).then(|| INCOMPLETE_NOTE.to_string()),
        turns,
    }
}

fn fail(error: Error, state: LoopState) -> LoopFailure {
    tracing::error!(error = %error, "Agent loop aborted");
    LoopFailure {
        error,
        usage_log: state.usage_log,
    }
}

/// One-shot convenience over [`AgentLoop`].
pub async fn run_agent_loop(
    system_prompt: &str,
    history: &[Turn],
    user_text: &str,
    executor: &ToolExecutor,
    backend: Arc<dyn ModelBackend>,
    ctx: &AuthContext,
    config: LoopConfig,
) -> Result<LoopOutcome, LoopFailure> {
    AgentLoop::new(backend, executor.clone(), config)
        .run(system_prompt, history, user_text, ctx)
        .await
}
