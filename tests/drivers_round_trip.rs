//! Every driver declares tools losslessly and recovers invocations for them.

use ai_lib_tools::drivers::{
    create_driver, BackendKind, BackendResponse, InferenceOptions, ProviderDriver,
};
use ai_lib_tools::types::{
    input_schema_from_json, FieldSpec, HttpMethod, ToolDescriptor, ToolInvocation, ToolResult, Turn,
};
use serde_json::{json, Map, Value};

const KINDS: [BackendKind; 3] = [BackendKind::OpenAi, BackendKind::Anthropic, BackendKind::Bedrock];

fn tools() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor::new("jirafetchTool", HttpMethod::Get, "/rest/api/3/issue/{{issue}}")
            .with_description("Fetch an issue")
            .with_field("issue", FieldSpec::string().required().with_description("Issue key")),
        ToolDescriptor::new("jiracreateTool", HttpMethod::Post, "/rest/api/3/issue")
            .with_description("Create an issue")
            .with_field("jiraschema", FieldSpec::string().required())
            .with_field("notify", FieldSpec::new(ai_lib_tools::types::FieldType::Boolean))
            .with_body_fields(["jiraschema"]),
    ]
}

/// (name, parameter schema) pairs as each backend declares them.
fn declared(kind: BackendKind, decl: &Value) -> Vec<(String, Value)> {
    let items = match kind {
        BackendKind::Bedrock => decl["tools"].as_array().unwrap().clone(),
        _ => decl.as_array().unwrap().clone(),
    };
    items
        .iter()
        .map(|t| match kind {
            BackendKind::OpenAi => (
                t["function"]["name"].as_str().unwrap().to_string(),
                t["function"]["parameters"].clone(),
            ),
            BackendKind::Anthropic => (t["name"].as_str().unwrap().to_string(), t["input_schema"].clone()),
            BackendKind::Bedrock => (
                t["toolSpec"]["name"].as_str().unwrap().to_string(),
                t["toolSpec"]["inputSchema"]["json"].clone(),
            ),
        })
        .collect()
}

/// A backend reply calling each declared tool once.
fn reply_calling(kind: BackendKind, names: &[String]) -> Value {
    match kind {
        BackendKind::OpenAi => json!({
            "id": "chatcmpl-9",
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": names.iter().enumerate().map(|(i, n)| json!({
                        "id": format!("call_{}", i),
                        "type": "function",
                        "function": {"name": n, "arguments": "{}"}
                    })).collect::<Vec<_>>()
                },
                "finish_reason": "tool_calls"
            }],
            "usage": {"prompt_tokens": 1, "completion_tokens": 1, "total_tokens": 2}
        }),
        BackendKind::Anthropic => json!({
            "id": "msg_9",
            "content": names.iter().enumerate().map(|(i, n)| json!({
                "type": "tool_use", "id": format!("toolu_{}", i), "name": n, "input": {}
            })).collect::<Vec<_>>(),
            "stop_reason": "tool_use",
            "usage": {"input_tokens": 1, "output_tokens": 1}
        }),
        BackendKind::Bedrock => json!({
            "output": {"message": {"role": "assistant", "content": names.iter().enumerate().map(|(i, n)| json!({
                "toolUse": {"toolUseId": format!("tooluse_{}", i), "name": n, "input": {}}
            })).collect::<Vec<_>>()}},
            "stopReason": "tool_use",
            "usage": {"inputTokens": 1, "outputTokens": 1, "totalTokens": 2}
        }),
    }
}

#[test]
fn declarations_preserve_names_and_schemas() {
    let tools = tools();
    for kind in KINDS {
        let driver = create_driver(kind);
        let decl = declared(kind, &driver.declare_tools(&tools));
        assert_eq!(decl.len(), tools.len(), "{}", kind);
        for ((name, schema), tool) in decl.iter().zip(&tools) {
            assert_eq!(name, &tool.name);
            assert_eq!(
                input_schema_from_json(schema).as_ref(),
                Some(&tool.input_schema),
                "{} schema for {}",
                kind,
                name
            );
        }
    }
}

#[test]
fn one_call_per_descriptor_is_recovered_exactly_once() {
    let tools = tools();
    for kind in KINDS {
        let driver = create_driver(kind);
        let names: Vec<String> = declared(kind, &driver.declare_tools(&tools))
            .into_iter()
            .map(|(n, _)| n)
            .collect();
        let response = BackendResponse::new(reply_calling(kind, &names));
        let parsed = driver.parse_response(&response).unwrap();

        for tool in &tools {
            let hits = parsed
                .invocations
                .iter()
                .filter(|inv| inv.tool_name == tool.name)
                .count();
            assert_eq!(hits, 1, "{} / {}", kind, tool.name);
        }
        assert!(!parsed.explicit_stop);
        assert_eq!(parsed.usage.total_tokens, 2);
    }
}

#[test]
fn correlation_ids_survive_the_round_trip() {
    let mut input = Map::new();
    input.insert("issue".into(), json!("CORE-1"));
    let call = ToolInvocation::new("corr-42", "jirafetchTool", input);

    for kind in KINDS {
        let driver = create_driver(kind);
        let turns = vec![
            Turn::user("What is CORE-1?"),
            Turn::tool_calls(None, vec![call.clone()]),
            Turn::tool_results(vec![ToolResult::success("corr-42", "{\"key\":\"CORE-1\"}")]),
        ];
        let body = driver
            .build_request("", &turns, &tools(), &InferenceOptions::new("m"))
            .unwrap();
        let text = body.to_string();
        assert_eq!(text.matches("corr-42").count(), 2, "{}: {}", kind, text);
    }
}

#[test]
fn result_turn_shapes_match_each_backend() {
    let results = vec![ToolResult::success("a", "one"), ToolResult::success("b", "two")];

    let openai = create_driver(BackendKind::OpenAi).format_results(&results);
    assert_eq!(openai.len(), 2);
    assert!(openai.iter().all(|m| m["role"] == "tool"));

    for kind in [BackendKind::Anthropic, BackendKind::Bedrock] {
        let msgs = create_driver(kind).format_results(&results);
        assert_eq!(msgs.len(), 1, "{}", kind);
        assert_eq!(msgs[0]["role"], "user");
        assert_eq!(msgs[0]["content"].as_array().unwrap().len(), 2);
    }
}

#[test]
fn text_only_replies_finish_the_turn() {
    let replies = [
        (
            BackendKind::OpenAi,
            json!({"choices": [{"message": {"content": "CORE-1 is open."}, "finish_reason": "stop"}]}),
        ),
        (
            BackendKind::Anthropic,
            json!({"content": [{"type": "text", "text": "CORE-1 is open."}], "stop_reason": "end_turn"}),
        ),
        (
            BackendKind::Bedrock,
            json!({"output": {"message": {"content": [{"text": "CORE-1 is open."}]}}, "stopReason": "end_turn"}),
        ),
    ];
    for (kind, body) in replies {
        let driver = create_driver(kind);
        let parsed = driver.parse_response(&BackendResponse::new(body)).unwrap();
        assert!(parsed.invocations.is_empty());
        assert_eq!(parsed.text.as_deref(), Some("CORE-1 is open."));
        assert_eq!(driver.extract_final_text(&json!({})), None);
    }
}
