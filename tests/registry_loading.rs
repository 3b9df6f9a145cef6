//! Registry fixtures load, validate and compile.

use ai_lib_tools::compiler::{compile, AuthScheme, RequestTarget};
use ai_lib_tools::registry::{self, RegistryError, ToolRegistry};
use ai_lib_tools::types::HttpMethod;
use serde_json::json;
use std::path::PathBuf;

fn fixtures() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("registries")
}

#[test]
fn all_fixture_registries_are_valid() {
    let results = registry::load_dir(fixtures()).expect("fixture dir readable");
    assert_eq!(results.len(), 2);
    for (path, result) in &results {
        assert!(result.is_ok(), "{}: {:?}", path.display(), result.as_ref().err());
    }
}

#[test]
fn jira_registry_keeps_declaration_order() {
    let (integration, reg) = registry::load_file(fixtures().join("jira.yaml")).unwrap();
    assert_eq!(integration, "jira");
    let names: Vec<_> = reg.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names[0], "jiratypeTool");
    assert_eq!(names.last().copied(), Some("jiracommentTool"));

    let transition = reg.get("jiraTransitionsTool").unwrap();
    assert_eq!(transition.method, HttpMethod::Post);
    assert_eq!(transition.body_fields, vec!["body".to_string()]);
}

#[test]
fn transition_tool_unwraps_string_encoded_body() {
    let (_, reg) = registry::load_file(fixtures().join("jira.yaml")).unwrap();
    let target = RequestTarget::new("https://acme.atlassian.net")
        .with_auth(&AuthScheme::basic("bot@acme.io", "t0k"));
    let input = json!({"issue": "CORE-7", "body": "{\"transition\":{\"id\":\"31\"}}"});

    let req = compile(
        reg.get("jiraTransitionsTool").unwrap(),
        input.as_object().unwrap(),
        &target,
    )
    .unwrap();
    assert_eq!(req.url, "https://acme.atlassian.net/rest/api/3/issue/CORE-7/transitions");
    assert_eq!(req.body_json(), Some(json!({"transition": {"id": "31"}})));
}

#[test]
fn quickbooks_json_registry_loads() {
    let (integration, reg) = registry::load_file(fixtures().join("quickbooks.json")).unwrap();
    assert_eq!(integration, "quickbooks");
    assert_eq!(reg.len(), 2);
}

#[test]
fn invalid_registry_documents_are_rejected() {
    let get_with_body = r#"
integration: bad
tools:
  - name: t
    method: GET
    url: /x
    fields: [body]
    input_schema:
      body: {type: string}
"#;
    assert!(matches!(
        ToolRegistry::from_yaml_str(get_with_body),
        Err(RegistryError::InvalidDescriptor { .. })
    ));

    let malformed_placeholder = r#"{"integration":"bad","tools":[{"name":"t","method":"GET","url":"/x/{{ id }}","input_schema":{"id":{"type":"string"}}}]}"#;
    assert!(ToolRegistry::from_json_str(malformed_placeholder).is_err());

    assert!(matches!(
        ToolRegistry::from_yaml_str("tools: ["),
        Err(RegistryError::Parse(_))
    ));
}
