//! Bedrock Converse 驱动 — toolSpec / toolUse / toolResult 格式转换
//!
//! Amazon Bedrock Converse driver:
//! - The model id travels in the URL, not the body.
//! - System prompt is a top-level list of `{text}` blocks.
//! - Tools are declared under `toolConfig.tools[].toolSpec` with `inputSchema.json`.
//! - Tool calls are `toolUse` blocks; results go back as one user turn of `toolResult` blocks.
//! - There is no explicit stop flag to honour: a reply without `toolUse` blocks ends the loop.
//! - The request id comes from the `x-amzn-requestid` header (or `$metadata.requestId`).

use serde_json::{json, Map, Value};

use crate::error::Error;
use crate::types::message::{split_system, Role};
use crate::types::{ToolDescriptor, ToolInvocation, ToolResult, Turn, TurnContent};

use super::{
    input_object, join_text, BackendKind, BackendResponse, InferenceOptions, ProviderDriver,
    TokenUsage,
};

#[derive(Debug, Default)]
pub struct BedrockDriver;

impl BedrockDriver {
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
                "content": [{ "text": text }],
            }),
            TurnContent::ToolCalls { text, invocations } => {
                let mut blocks = Vec::with_capacity(invocations.len() + 1);
                if let Some(t) = text.as_deref().filter(|t| !t.is_empty()) {
                    blocks.push(json!({ "text": t }));
                }
                blocks.extend(invocations.iter().map(|inv| {
                    json!({
                        "toolUse": {
                            "toolUseId": inv.id,
                            "name": inv.tool_name,
                            "input": inv.raw_input,
                        }
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
        body.pointer("/output/message/content")
            .and_then(|c| c.as_array())
            .ok_or_else(|| {
                Error::protocol(
                    BackendKind::Bedrock.as_str(),
                    "response has no output.message.content",
                )
            })
    }

    fn inference_config(options: &InferenceOptions) -> Option<Value> {
        let mut cfg = Map::new();
        if let Some(mt) = options.max_tokens {
            cfg.insert("maxTokens".into(), json!(mt));
        }
        if let Some(t) = options.temperature {
            cfg.insert("temperature".into(), json!(t));
        }
        if let Some(p) = options.top_p {
            cfg.insert("topP".into(), json!(p));
        }
        if !options.stop_sequences.is_empty() {
            cfg.insert("stopSequences".into(), json!(options.stop_sequences));
        }
        (!cfg.is_empty()).then(|| Value::Object(cfg))
    }
}

impl ProviderDriver for BedrockDriver {
    fn kind(&self) -> BackendKind {
        BackendKind::Bedrock
    }

    fn declare_tools(&self, tools: &[ToolDescriptor]) -> Value {
        let specs: Vec<Value> = tools
            .iter()
            .map(|tool| {
                let mut spec = json!({
                    "name": tool.name,
                    "inputSchema": { "json": tool.parameters_schema() },
                });
                // Converse rejects an empty description.
                if !tool.description.is_empty() {
                    spec["description"] = Value::String(tool.description.clone());
                }
                json!({ "toolSpec": spec })
            })
            .collect();
        json!({ "tools": specs })
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

        let mut body = json!({ "messages": messages });
        if !system.is_empty() {
            body["system"] = json!([{ "text": system }]);
        }
        if let Some(cfg) = Self::inference_config(options) {
            body["inferenceConfig"] = cfg;
        }
        if !tools.is_empty() {
            body["toolConfig"] = self.declare_tools(tools);
        }
        Ok(body)
    }

    fn extract_invocations(&self, body: &Value) -> Result<Vec<ToolInvocation>, Error> {
        Self::content(body)?
            .iter()
            .filter_map(|block| block.get("toolUse"))
            .map(|tool_use| {
                let id = tool_use
                    .get("toolUseId")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| {
                        Error::protocol(self.kind().as_str(), "toolUse block without toolUseId")
                    })?;
                let name = tool_use.get("name").and_then(|v| v.as_str()).ok_or_else(|| {
                    Error::protocol(self.kind().as_str(), "toolUse block without name")
                })?;
                let input = input_object(self.kind(), tool_use.get("input"))?;
                Ok(ToolInvocation::new(id, name, input))
            })
            .collect()
    }

    fn format_results(&self, results: &[ToolResult]) -> Vec<Value> {
        let blocks: Vec<Value> = results
            .iter()
            .map(|r| {
                let mut result = json!({
                    "toolUseId": r.invocation_id,
                    "content": [{ "text": r.content }],
                });
                if r.is_error {
                    result["status"] = Value::String("error".into());
                }
                json!({ "toolResult": result })
            })
            .collect();
        vec![json!({ "role": "user", "content": blocks })]
    }

    fn extract_final_text(&self, body: &Value) -> Option<String> {
        let content = body.pointer("/output/message/content")?.as_array()?;
        join_text(
            content
                .iter()
                .filter_map(|b| b.get("text").and_then(|t| t.as_str())),
        )
    }

    fn usage(&self, body: &Value) -> TokenUsage {
        let Some(u) = body.get("usage") else {
            return TokenUsage::default();
        };
        let input = u["inputTokens"].as_u64().unwrap_or(0);
        let output = u["outputTokens"].as_u64().unwrap_or(0);
        TokenUsage {
            input_tokens: input,
            output_tokens: output,
            total_tokens: u["totalTokens"].as_u64().unwrap_or(input + output),
        }
    }

    fn request_id(&self, response: &BackendResponse) -> Option<String> {
        response.request_id.clone().or_else(|| {
            response
                .body
                .pointer("/$metadata/requestId")
                .and_then(|v| v.as_str())
                .map(String::from)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FieldSpec, HttpMethod};

    #[test]
    fn declares_tool_specs_under_tool_config() {
        let tool = ToolDescriptor::new("qbquery", HttpMethod::Get, "/query?query={{query}}")
            .with_field("query", FieldSpec::string().required());
        let body = BedrockDriver::new()
            .build_request(
                "sys",
                &[Turn::user("list vendors")],
                &[tool],
                &InferenceOptions::new("anthropic.claude-3-haiku").with_max_tokens(512),
            )
            .unwrap();
        assert_eq!(body["toolConfig"]["tools"][0]["toolSpec"]["name"], "qbquery");
        assert_eq!(
            body["toolConfig"]["tools"][0]["toolSpec"]["inputSchema"]["json"]["required"],
            json!(["query"])
        );
        assert_eq!(body["system"][0]["text"], "sys");
        assert_eq!(body["inferenceConfig"]["maxTokens"], 512);
        assert!(body.get("model").is_none());
    }

    #[test]
    fn tool_spec_leaves_out_empty_description() {
        let tools = [
            ToolDescriptor::new("fetch", HttpMethod::Get, "/issue/{{issue}}")
                .with_field("issue", FieldSpec::string().required()),
            ToolDescriptor::new("vendors", HttpMethod::Get, "/query").with_description("List vendors"),
        ];
        let decl = BedrockDriver::new().declare_tools(&tools);
        assert!(decl["tools"][0]["toolSpec"].get("description").is_none());
        assert_eq!(decl["tools"][0]["toolSpec"]["name"], "fetch");
        assert_eq!(decl["tools"][1]["toolSpec"]["description"], "List vendors");
    }

    #[test]
    fn parses_tool_use_and_header_request_id() {
        let body = json!({
            "output": {"message": {"role": "assistant", "content": [
                {"toolUse": {"toolUseId": "tooluse_1", "name": "qbquery", "input": {"query": "select * from vendor"}}}
            ]}},
            "stopReason": "tool_use",
            "usage": {"inputTokens": 30, "outputTokens": 9, "totalTokens": 39}
        });
        let resp = BedrockDriver::new()
            .parse_response(&BackendResponse::new(body).with_request_id("req-123"))
            .unwrap();
        assert_eq!(resp.invocations[0].id, "tooluse_1");
        assert_eq!(resp.request_id.as_deref(), Some("req-123"));
        assert_eq!(resp.usage.total_tokens, 39);
        assert!(!resp.explicit_stop);
    }

    #[test]
    fn failed_results_are_marked_with_error_status() {
        let msgs = BedrockDriver::new().format_results(&[
            ToolResult::success("t1", "success"),
            ToolResult::failure("t2", "nope"),
        ]);
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0]["content"][0]["toolResult"]["content"][0]["text"], "success");
        assert!(msgs[0]["content"][0]["toolResult"].get("status").is_none());
        assert_eq!(msgs[0]["content"][1]["toolResult"]["status"], "error");
    }
}
