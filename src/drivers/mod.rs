//! Provider 驱动抽象层 — 通过 trait 统一三种模型后端的工具调用协议
//!
//! Provider driver abstraction layer. Each model backend speaks its own
//! tool-calling dialect; a [`ProviderDriver`] translates between that dialect and
//! the crate's provider-neutral [`Turn`], [`ToolInvocation`] and [`ToolResult`]
//! types. Drivers are selected once per agent through [`create_driver`] and used
//! behind `Box<dyn ProviderDriver>`, so the loop never branches on backend kind.
//!
//! | Backend | Tool declaration | Result turn | Stop condition |
//! |---------|------------------|-------------|----------------|
//! | OpenAI chat completions | `tools[].function` (strict when possible) | one `tool` message per result | `finish_reason == "stop"` |
//! | Anthropic messages | `tools[].input_schema` | one user turn of `tool_result` blocks | `stop_reason == "end_turn"` |
//! | Bedrock Converse | `toolConfig.tools[].toolSpec` | one user turn of `toolResult` blocks | no `toolUse` block |

pub mod anthropic;
pub mod bedrock;
pub mod openai;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::error::Error;
use crate::types::{ToolDescriptor, ToolInvocation, ToolResult, Turn};

pub use anthropic::AnthropicDriver;
pub use bedrock::BedrockDriver;
pub use openai::OpenAiDriver;

/// Model backend family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    OpenAi,
    Anthropic,
    Bedrock,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::OpenAi => "openai",
            BackendKind::Anthropic => "anthropic",
            BackendKind::Bedrock => "bedrock",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "openai" => Some(BackendKind::OpenAi),
            "anthropic" | "claude" => Some(BackendKind::Anthropic),
            "bedrock" | "converse" => Some(BackendKind::Bedrock),
            _ => None,
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-call inference parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceOptions {
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stop_sequences: Vec<String>,
}

impl InferenceOptions {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            max_tokens: None,
            temperature: None,
            top_p: None,
            stop_sequences: Vec::new(),
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_top_p(mut self, top_p: f64) -> Self {
        self.top_p = Some(top_p);
        self
    }

    pub fn with_stop_sequences<I, S>(mut self, stops: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stop_sequences = stops.into_iter().map(Into::into).collect();
        self
    }
}

/// Raw backend reply: the JSON body plus the transport-level request id, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendResponse {
    pub body: Value,
    pub request_id: Option<String>,
}

impl BackendResponse {
    pub fn new(body: Value) -> Self {
        Self {
            body,
            request_id: None,
        }
    }

    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }
}

/// Token usage normalized across backends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
}

impl TokenUsage {
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens: input_tokens + output_tokens,
        }
    }
}

/// One usage-log entry, recorded for every model call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub backend_request_id: Option<String>,
    pub model: String,
    pub usage: TokenUsage,
    /// Label of the agent that issued the call.
    pub source: String,
}

/// A backend reply decoded into provider-neutral pieces.
#[derive(Debug, Clone, PartialEq)]
pub struct DriverResponse {
    pub text: Option<String>,
    pub invocations: Vec<ToolInvocation>,
    /// The backend explicitly ended its turn.
    pub explicit_stop: bool,
    pub usage: TokenUsage,
    pub request_id: Option<String>,
}

impl DriverResponse {
    /// Assistant turn to append to history for this reply.
    pub fn assistant_turn(&self) -> Turn {
        if self.invocations.is_empty() {
            Turn::assistant(self.text.clone().unwrap_or_default())
        } else {
            Turn::tool_calls(self.text.clone(), self.invocations.clone())
        }
    }
}

/// Core trait for backend-specific tool-call adaptation.
///
/// Implementations are stateless translators: they build request bodies, decode
/// responses and render tool results, but never perform I/O.
pub trait ProviderDriver: Send + Sync + fmt::Debug {
    fn kind(&self) -> BackendKind;

    /// Map descriptors to the backend's tool-declaration schema.
    fn declare_tools(&self, tools: &[ToolDescriptor]) -> Value;

    /// Build the full request body for one model call.
    fn build_request(
        &self,
        system: &str,
        turns: &[Turn],
        tools: &[ToolDescriptor],
        options: &InferenceOptions,
    ) -> Result<Value, Error>;

    /// Tool calls requested by the response, in backend order.
    fn extract_invocations(&self, body: &Value) -> Result<Vec<ToolInvocation>, Error>;

    /// Messages that carry `results` back to the backend.
    fn format_results(&self, results: &[ToolResult]) -> Vec<Value>;

    fn extract_final_text(&self, body: &Value) -> Option<String>;

    /// Whether the backend explicitly signalled the end of its turn.
    fn explicit_stop(&self, _body: &Value) -> bool {
        false
    }

    fn usage(&self, body: &Value) -> TokenUsage;

    fn request_id(&self, response: &BackendResponse) -> Option<String> {
        response.request_id.clone().or_else(|| {
            response
                .body
                .get("id")
                .and_then(|v| v.as_str())
                .map(String::from)
        })
    }

    /// Decode a whole response. Shape errors surface as [`Error::Protocol`].
    fn parse_response(&self, response: &BackendResponse) -> Result<DriverResponse, Error> {
        let invocations = self.extract_invocations(&response.body)?;
        Ok(DriverResponse {
            text: self.extract_final_text(&response.body),
            invocations,
            explicit_stop: self.explicit_stop(&response.body),
            usage: self.usage(&response.body),
            request_id: self.request_id(response),
        })
    }
}

/// Factory function to create the driver for a backend kind.
pub fn create_driver(kind: BackendKind) -> Box<dyn ProviderDriver> {
    match kind {
        BackendKind::OpenAi => Box::new(OpenAiDriver::new()),
        BackendKind::Anthropic => Box::new(AnthropicDriver::new()),
        BackendKind::Bedrock => Box::new(BedrockDriver::new()),
    }
}

/// Join the non-empty text fragments of a content array.
pub(crate) fn join_text<'a>(parts: impl Iterator<Item = &'a str>) -> Option<String> {
    let joined = parts
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    if joined.trim().is_empty() {
        None
    } else {
        Some(joined)
    }
}

/// Tool input objects. Anything other than a JSON object is a protocol error.
pub(crate) fn input_object(
    backend: BackendKind,
    value: Option<&Value>,
) -> Result<serde_json::Map<String, Value>, Error> {
    match value {
        None | Some(Value::Null) => Ok(serde_json::Map::new()),
        Some(Value::Object(map)) => Ok(map.clone()),
        Some(other) => Err(Error::protocol(
            backend.as_str(),
            format!("tool input must be an object, got {}", other),
        )),
    }
}
