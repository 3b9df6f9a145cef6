//! Anthropic Messages API 驱动 — tool_use / tool_result 内容块转换
//!
//! Anthropic Messages API driver. Differences from OpenAI:
//! - System prompt is the top-level `system` parameter, not part of `messages`.
//! - Content uses typed blocks; tool calls are `tool_use` blocks with an object `input`.
//! - All tool results of a cycle go back in one user turn of `tool_result` blocks.
//! - `max_tokens` is required, not optional.
//! - `stop_reason == "end_turn"` is an explicit end of turn.

use serde_json::{json, Value};

use crate::error::Error;
use crate::types::message::{split_system, Role};
use crate::types::{ToolDescriptor, ToolInvocation, ToolResult, Turn, TurnContent};

use super::{input_object, join_text, BackendKind, InferenceOptions, ProviderDriver, TokenUsage};

const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Anthropic Messages API driver.
#[derive(Debug, Default)]
pub struct AnthropicDriver;

impl AnthropicDriver {
    pub fn new() -> Self {
        Self
    }

    fn render_turn(&self, turn: &Turn) -> Value {
        let role = match turn.role {
            Role::Assistant => "assistant",
            Role::User | Role::System => "user",
        };
        match &turn.content {
            TurnContent::Text { text } => json!({
                "role": role,
                "content": [{ "type": "text", "text": text }],
            }),
            TurnContent::ToolCalls { text, invocations } => {
                let mut blocks = Vec::with_capacity(invocations.len() + 1);
                if let Some(t) = text.as_deref().filter(|t| !t.is_empty()) {
                    blocks.push(json!({ "type": "text", "text": t }));
                }
                blocks.extend(invocations.iter().map(|inv| {
                    json!({
                        "type": "tool_use",
                        "id": inv.id,
                        "name": inv.tool_name,
                        "input": inv.raw_input,
                    })
                }));
                json!({ "role": "assistant", "content": blocks })
            }
            TurnContent::ToolResults { results } => self
                .format_results(results)
                .into_iter()
                .next()
                .unwrap_or_else(|| json!({ "role": "user", "content": [] })),
        }
    }

    fn content(body: &Value) -> Result<&Vec<Value>, Error> {
        body.get("content").and_then(|c| c.as_array()).ok_or_else(|| {
            Error::protocol(BackendKind::Anthropic.as_str(), "response has no content array")
        })
    }
}

impl ProviderDriver for AnthropicDriver {
    fn kind(&self) -> BackendKind {
        BackendKind::Anthropic
    }

    fn declare_tools(&self, tools: &[ToolDescriptor]) -> Value {
        Value::Array(
            tools
                .iter()
                .map(|tool| {
                    let mut decl = json!({
                        "name": tool.name,
                        "input_schema": tool.parameters_schema(),
                    });
                    if !tool.description.is_empty() {
                        decl["description"] = Value::String(tool.description.clone());
                    }
                    decl
                })
                .collect(),
        )
    }

    fn build_request(
        &self,
        system: &str,
        turns: &[Turn],
        tools: &[ToolDescriptor],
        options: &InferenceOptions,
    ) -> Result<Value, Error> {
        let (system, turns) = split_system(system, turns);
        let messages: Vec<Value> = turns.iter().map(|t| self.render_turn(t)).collect();

        let mut body = json!({
            "model": options.model,
            "messages": messages,
            "max_tokens": options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        });
        if !system.is_empty() {
            body["system"] = Value::String(system);
        }
        if !tools.is_empty() {
            body["tools"] = self.declare_tools(tools);
        }
        if let Some(t) = options.temperature {
            body["temperature"] = json!(t);
        }
        if let Some(p) = options.top_p {
            body["top_p"] = json!(p);
        }
        if !options.stop_sequences.is_empty() {
            body["stop_sequences"] = json!(options.stop_sequences);
        }
        Ok(body)
    }

    fn extract_invocations(&self, body: &Value) -> Result<Vec<ToolInvocation>, Error> {
        Self::content(body)?
            .iter()
            .filter(|b| b.get("type").and_then(|t| t.as_str()) == Some("tool_use"))
            .map(|block| {
                let id = block.get("id").and_then(|v| v.as_str()).ok_or_else(|| {
                    Error::protocol(self.kind().as_str(), "tool_use block without id")
                })?;
                let name = block.get("name").and_then(|v| v.as_str()).ok_or_else(|| {
                    Error::protocol(self.kind().as_str(), "tool_use block without name")
                })?;
                let input = input_object(self.kind(), block.get("input"))?;
                Ok(ToolInvocation::new(id, name, input))
            })
            .collect()
    }

    fn format_results(&self, results: &[ToolResult]) -> Vec<Value> {
        let blocks: Vec<Value> = results
            .iter()
            .map(|r| {
                let mut block = json!({
                    "type": "tool_result",
                    "tool_use_id": r.invocation_id,
                    "content": r.content,
                });
                if r.is_error {
                    block["is_error"] = Value::Bool(true);
                }
                block
            })
            .collect();
        vec![json!({ "role": "user", "content": blocks })]
    }

    fn extract_final_text(&self, body: &Value) -> Option<String> {
        let content = body.get("content")?.as_array()?;
        join_text(
            content
                .iter()
                .filter(|b| b.get("type").and_then(|t| t.as_str()) == Some("text"))
                .filter_map(|b| b.get("text").and_then(|t| t.as_str())),
        )
    }

    fn explicit_stop(&self, body: &Value) -> bool {
        body.get("stop_reason").and_then(|v| v.as_str()) == Some("end_turn")
    }

    fn usage(&self, body: &Value) -> TokenUsage {
        body.get("usage")
            .map(|u| {
                TokenUsage::new(
                    u["input_tokens"].as_u64().unwrap_or(0),
                    u["output_tokens"].as_u64().unwrap_or(0),
                )
            })
            .unwrap_or_default()
    }
}
