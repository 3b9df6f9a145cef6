//! OpenAI chat completions 驱动 — function calling 格式转换
//!
//! OpenAI chat completions driver:
//! - System prompt is the first `system` message.
//! - Tools are declared as `{type: "function", function: {name, description, parameters, strict}}`.
//! - Tool calls arrive in `choices[0].message.tool_calls` with JSON-encoded `arguments`.
//! - Each tool result is its own `{role: "tool", tool_call_id, content}` message.
//! - `finish_reason == "stop"` is an explicit end of turn.

use serde_json::{json, Map, Value};

use crate::error::Error;
use crate::types::{ToolDescriptor, ToolInvocation, ToolResult, Turn, TurnContent};
use crate::types::message::{split_system, Role};

use super::{input_object, BackendKind, InferenceOptions, ProviderDriver, TokenUsage};

#[derive(Debug, Default)]
pub struct OpenAiDriver;

impl OpenAiDriver {
    pub fn new() -> Self {
        Self
    }

    /// Closed `parameters` schema for a tool.
    fn parameters(tool: &ToolDescriptor) -> Value {
        let mut parameters = tool.parameters_schema();
        parameters["additionalProperties"] = Value::Bool(false);
        parameters
    }

    /// Strict function schemas require every property to be required, every
    /// object to be closed and every array to describe its items.
    fn is_strict_compatible(schema: &Value) -> bool {
        match schema.get("type").and_then(|t| t.as_str()) {
            Some("object") => {
                let Some(props) = schema.get("properties").and_then(|p| p.as_object()) else {
                    return false;
                };
                let required: Vec<&str> = schema
                    .get("required")
                    .and_then(|r| r.as_array())
                    .map(|r| r.iter().filter_map(|v| v.as_str()).collect())
                    .unwrap_or_default();
                schema.get("additionalProperties") == Some(&Value::Bool(false))
                    && props.iter().all(|(name, prop)| {
                        required.contains(&name.as_str()) && Self::is_strict_compatible(prop)
                    })
            }
            Some("array") => schema.get("items").map_or(false, Self::is_strict_compatible),
            Some(_) => true,
            None => false,
        }
    }

    fn render_turn(&self, turn: &Turn, out: &mut Vec<Value>) {
        let role = match turn.role {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        };
        match &turn.content {
            TurnContent::Text { text } => out.push(json!({ "role": role, "content": text })),
            TurnContent::ToolCalls { text, invocations } => {
                let calls: Vec<Value> = invocations
                    .iter()
                    .map(|inv| {
                        json!({
                            "id": inv.id,
                            "type": "function",
                            "function": {
                                "name": inv.tool_name,
                                "arguments": Value::Object(inv.raw_input.clone()).to_string(),
                            }
                        })
                    })
                    .collect();
                out.push(json!({
                    "role": "assistant",
                    "content": text,
                    "tool_calls": calls,
                }));
            }
            TurnContent::ToolResults { results } => out.extend(self.format_results(results)),
        }
    }

    fn message(body: &Value) -> Result<&Value, Error> {
        body.pointer("/choices/0/message").ok_or_else(|| {
            Error::protocol(
                BackendKind::OpenAi.as_str(),
                "response has no choices[0].message",
            )
        })
    }

    /// `arguments` is normally a JSON string; a few compatible servers send an
    /// object. Unreadable arguments mark the invocation instead of failing the
    /// whole response.
    fn invocation(id: &str, name: &str, raw: Option<&Value>) -> Result<ToolInvocation, Error> {
        match raw {
            Some(Value::String(s)) if s.trim().is_empty() => Ok(ToolInvocation::new(id, name, Map::new())),
            Some(Value::String(s)) => match serde_json::from_str::<Value>(s) {
                Ok(Value::Object(map)) => Ok(ToolInvocation::new(id, name, map)),
                Ok(other) => Ok(Self::unreadable(id, name, format!("expected a JSON object, got {}", other))),
                Err(e) => Ok(Self::unreadable(id, name, e.to_string())),
            },
            other => Ok(ToolInvocation::new(id, name, input_object(BackendKind::OpenAi, other)?)),
        }
    }

    fn unreadable(id: &str, name: &str, reason: String) -> ToolInvocation {
        tracing::warn!(invocation_id = %id, tool = %name, %reason, "Tool call arguments are not a JSON object");
        ToolInvocation::new(id, name, Map::new()).with_input_error(reason)
    }
}

impl ProviderDriver for OpenAiDriver {
    fn kind(&self) -> BackendKind {
        BackendKind::OpenAi
    }

    fn declare_tools(&self, tools: &[ToolDescriptor]) -> Value {
        let declared: Vec<Value> = tools
            .iter()
            .map(|tool| {
                let parameters = Self::parameters(tool);
                json!({
                    "type": "function",
                    "function": {
                        "name": tool.name,
                        "description": tool.description,
                        "strict": Self::is_strict_compatible(&parameters),
                        "parameters": parameters,
                    }
                })
            })
            .collect();
        Value::Array(declared)
    }

    fn build_request(
        &self,
        system: &str,
        turns: &[Turn],
        tools: &[ToolDescriptor],
        options: &InferenceOptions,
    ) -> Result<Value, Error> {
        let (system, turns) = split_system(system, turns);
        let mut messages = Vec::with_capacity(turns.len() + 1);
        if !system.is_empty() {
            messages.push(json!({ "role": "system", "content": system }));
        }
        for turn in &turns {
            self.render_turn(turn, &mut messages);
        }

        let mut body = json!({
            "model": options.model,
            "messages": messages,
        });
        if !tools.is_empty() {
            body["tools"] = self.declare_tools(tools);
        }
        if let Some(mt) = options.max_tokens {
            body["max_tokens"] = json!(mt);
        }
        if let Some(t) = options.temperature {
            body["temperature"] = json!(t);
        }
        if let Some(p) = options.top_p {
            body["top_p"] = json!(p);
        }
        if !options.stop_sequences.is_empty() {
            body["stop"] = json!(options.stop_sequences);
        }
        Ok(body)
    }

    fn extract_invocations(&self, body: &Value) -> Result<Vec<ToolInvocation>, Error> {
        let message = Self::message(body)?;
        let Some(calls) = message.get("tool_calls").and_then(|v| v.as_array()) else {
            return Ok(Vec::new());
        };

        calls
            .iter()
            .map(|call| {
                let id = call.get("id").and_then(|v| v.as_str()).ok_or_else(|| {
                    Error::protocol(self.kind().as_str(), "tool call without id")
                })?;
                let name = call
                    .pointer("/function/name")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| {
                        Error::protocol(self.kind().as_str(), "tool call without function.name")
                    })?;
                Self::invocation(id, name, call.pointer("/function/arguments"))
            })
            .collect()
    }

    fn format_results(&self, results: &[ToolResult]) -> Vec<Value> {
        results
            .iter()
            .map(|r| {
                json!({
                    "role": "tool",
                    "tool_call_id": r.invocation_id,
                    "content": r.content,
                })
            })
            .collect()
    }

    fn extract_final_text(&self, body: &Value) -> Option<String> {
        body.pointer("/choices/0/message/content")
            .and_then(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
            .map(String::from)
    }

    fn explicit_stop(&self, body: &Value) -> bool {
        body.pointer("/choices/0/finish_reason").and_then(|v| v.as_str()) == Some("stop")
    }

    fn usage(&self, body: &Value) -> TokenUsage {
        let Some(u) = body.get("usage") else {
            return TokenUsage::default();
        };
        let input = u["prompt_tokens"].as_u64().unwrap_or(0);
        let output = u["completion_tokens"].as_u64().unwrap_or(0);
        TokenUsage {
            input_tokens: input,
            output_tokens: output,
            total_tokens: u["total_tokens"].as_u64().unwrap_or(input + output),
        }
    }
}
