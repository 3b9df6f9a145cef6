//! Request compiler behaviour over a spread of descriptors.

use ai_lib_tools::compiler::{compile, AuthScheme, CompileError, RequestTarget};
use ai_lib_tools::types::{FieldSpec, HttpMethod, ToolDescriptor};
use serde_json::{json, Map, Value};

fn descriptors() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor::new("echo", HttpMethod::Get, "/items/{{id}}")
            .with_field("id", FieldSpec::string().required()),
        ToolDescriptor::new("schema", HttpMethod::Get, "/meta/{{project}}/types/{{type_id}}")
            .with_field("project", FieldSpec::string().required())
            .with_field("type_id", FieldSpec::string().required()),
        ToolDescriptor::new("create", HttpMethod::Post, "/rest/api/3/issue")
            .with_field("payload", FieldSpec::string().required())
            .with_body_fields(["payload"]),
        ToolDescriptor::new("send", HttpMethod::Post, "/users/{{user}}/sendMail")
            .with_field("user", FieldSpec::string().required())
            .with_field("subject", FieldSpec::string().required())
            .with_field("message", FieldSpec::object())
            .with_body_fields(["subject", "message"]),
        ToolDescriptor::new("remove", HttpMethod::Delete, "/items/{{id}}")
            .with_field("id", FieldSpec::string().required()),
    ]
}

/// Input with every field set to a plausible value.
fn full_input(d: &ToolDescriptor) -> Map<String, Value> {
    d.input_schema
        .keys()
        .map(|k| {
            let v = match k.as_str() {
                "payload" => json!("{\"fields\":{\"summary\":\"Printer on fire\"}}"),
                "message" => json!({"body": {"content": "hello"}}),
                other => json!(format!("{}-1", other)),
            };
            (k.clone(), v)
        })
        .collect()
}

fn target() -> RequestTarget {
    RequestTarget::new("https://api.example.com/v1/").with_auth(&AuthScheme::bearer("tok"))
}

#[test]
fn complete_input_always_compiles_to_placeholder_free_url() {
    for d in descriptors() {
        let req = compile(&d, &full_input(&d), &target())
            .unwrap_or_else(|e| panic!("{} failed: {}", d.name, e));
        assert!(!req.url.contains("{{") && !req.url.contains("}}"), "{}", req.url);
        assert!(req.url.starts_with("https://api.example.com/v1/"));
        assert_eq!(req.headers["Authorization"], "Bearer tok");
        assert_eq!(req.method, d.method);
    }
}

#[test]
fn each_missing_required_field_is_reported() {
    for d in descriptors() {
        for field in d.required_fields() {
            let mut input = full_input(&d);
            input.remove(field);
            assert_eq!(
                compile(&d, &input, &target()),
                Err(CompileError::MissingRequiredField {
                    tool: d.name.clone(),
                    field: field.to_string(),
                })
            );
        }
    }
}

#[test]
fn compilation_is_deterministic() {
    for d in descriptors() {
        let input = full_input(&d);
        let a = compile(&d, &input, &target()).unwrap();
        let b = compile(&d, &input, &target()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.body, b.body);
    }
}

#[test]
fn get_tools_never_carry_a_body() {
    let d = &descriptors()[0];
    let req = compile(d, json!({"id": "42"}).as_object().unwrap(), &target()).unwrap();
    assert!(req.url.ends_with("/items/42"));
    assert!(req.body.is_none());
}

#[test]
fn string_encoded_object_merges_at_root() {
    let d = ToolDescriptor::new("b", HttpMethod::Post, "/x")
        .with_field("payload", FieldSpec::string().required())
        .with_body_fields(["payload"]);
    let req = compile(&d, json!({"payload": "{\"a\":1}"}).as_object().unwrap(), &target()).unwrap();
    assert_eq!(req.body.as_deref(), Some("{\"a\":1}"));
}

#[test]
fn scalar_fields_are_wrapped_and_objects_unwrapped() {
    let d = &descriptors()[3];
    let req = compile(d, &full_input(d), &target()).unwrap();
    assert!(req.url.ends_with("/users/user-1/sendMail"));
    assert_eq!(
        req.body_json(),
        Some(json!({"subject": "subject-1", "body": {"content": "hello"}}))
    );
}

#[test]
fn structured_placeholder_values_do_not_resolve() {
    let d = &descriptors()[0];
    let err = compile(d, json!({"id": {"nested": true}}).as_object().unwrap(), &target()).unwrap_err();
    assert!(matches!(err, CompileError::TemplateResolution { .. }));
}
