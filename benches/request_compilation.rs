//! Benchmarks for request compilation performance
//!
//! This benchmark measures:
//! - Tool invocation to HTTP request compilation
//! - Provider request building for each backend
//! - Tool declaration overhead

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use ai_lib_tools::compiler::{compile, AuthScheme, RequestTarget};
use ai_lib_tools::drivers::{create_driver, BackendKind, InferenceOptions};
use ai_lib_tools::types::{FieldSpec, HttpMethod, ToolDescriptor, ToolInvocation, ToolResult, Turn};
use serde_json::{json, Map, Value};

fn jira_tools() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor::new("jirafetchTool", HttpMethod::Get, "/rest/api/3/issue/{{issue}}")
            .with_description("Fetch a single issue")
            .with_field("issue", FieldSpec::string().required()),
        ToolDescriptor::new(
            "jiraschemaTool",
            HttpMethod::Get,
            "/rest/api/3/issue/createmeta/{{project}}/issuetypes/{{type_id}}",
        )
        .with_field("project", FieldSpec::string().required())
        .with_field("type_id", FieldSpec::string().required()),
        ToolDescriptor::new("jiracreateTool", HttpMethod::Post, "/rest/api/3/issue")
            .with_description("Create an issue from a JSON payload")
            .with_field("jiraschema", FieldSpec::string().required())
            .with_body_fields(["jiraschema"]),
        ToolDescriptor::new("jiracommentTool", HttpMethod::Post, "/rest/api/3/issue/{{issue}}/comment")
            .with_field("issue", FieldSpec::string().required())
            .with_field("body", FieldSpec::object().required())
            .with_body_fields(["body"]),
    ]
}

fn input(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}

fn long_conversation() -> Vec<Turn> {
    let mut turns = Vec::new();
    for i in 0..25 {
        turns.push(Turn::user(format!("User message number {}", i)));
        let call = ToolInvocation::new(
            format!("call_{}", i),
            "jirafetchTool",
            input(json!({"issue": format!("CORE-{}", i)})),
        );
        turns.push(Turn::tool_calls(None, vec![call]));
        turns.push(Turn::tool_results(vec![ToolResult::success(
            format!("call_{}", i),
            format!("{{\"key\":\"CORE-{}\"}}", i),
        )]));
        turns.push(Turn::assistant(format!("Assistant response number {}", i)));
    }
    turns
}

fn bench_tool_compilation(c: &mut Criterion) {
    let tools = jira_tools();
    let target = RequestTarget::new("https://acme.atlassian.net")
        .with_auth(&AuthScheme::basic("bot@acme.io", "token"));

    let mut group = c.benchmark_group("tool_compilation");

    let cases = [
        ("get", &tools[0], input(json!({"issue": "CORE-1"}))),
        ("two_placeholders", &tools[1], input(json!({"project": "CORE", "type_id": "10001"}))),
        (
            "string_encoded_body",
            &tools[2],
            input(json!({"jiraschema": "{\"fields\":{\"project\":{\"key\":\"CORE\"},\"summary\":\"Printer on fire\"}}"})),
        ),
        (
            "object_body",
            &tools[3],
            input(json!({"issue": "CORE-1", "body": {"body": {"type": "doc", "version": 1, "content": []}}})),
        ),
    ];

    for (name, tool, args) in &cases {
        group.bench_with_input(BenchmarkId::new("compile", name), args, |b, args| {
            b.iter(|| compile(black_box(tool), black_box(args), &target).unwrap())
        });
    }

    group.finish();
}

fn bench_backend_requests(c: &mut Criterion) {
    let tools = jira_tools();
    let turns = long_conversation();
    let options = InferenceOptions::new("bench-model").with_max_tokens(2000);

    let mut group = c.benchmark_group("backend_requests");
    group.throughput(Throughput::Elements(turns.len() as u64));

    for kind in [BackendKind::OpenAi, BackendKind::Anthropic, BackendKind::Bedrock] {
        let driver = create_driver(kind);
        group.bench_function(BenchmarkId::new("build_request", kind.as_str()), |b| {
            b.iter(|| {
                driver
                    .build_request("You manage Jira.", black_box(&turns), &tools, &options)
                    .unwrap()
            })
        });
        group.bench_function(BenchmarkId::new("declare_tools", kind.as_str()), |b| {
            b.iter(|| driver.declare_tools(black_box(&tools)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_tool_compilation, bench_backend_requests);
criterion_main!(benches);
