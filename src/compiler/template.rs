//! `{{field}}` URL templates.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use super::CompileError;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{([A-Za-z0-9_]+)\}\}").expect("placeholder pattern is valid"));

/// Placeholder names in template order (duplicates kept).
pub fn placeholders(template: &str) -> Vec<String> {
    PLACEHOLDER
        .captures_iter(template)
        .map(|c| c[1].to_string())
        .collect()
}

/// Reject templates with brace pairs that are not well-formed placeholders,
/// e.g. `{{ issue }}` or `{{issue-key}}`.
pub fn check_syntax(template: &str) -> Result<(), String> {
    let stripped = PLACEHOLDER.replace_all(template, "");
    if stripped.contains("{{") || stripped.contains("}}") {
        return Err(format!("malformed placeholder in '{}'", template));
    }
    Ok(())
}

/// Substitute every placeholder with the top-level input value. Resolution is
/// total: a missing or non-scalar value is an error, never left as literal text.
pub fn resolve(tool: &str, template: &str, input: &Map<String, Value>) -> Result<String, CompileError> {
    check_syntax(template).map_err(|reason| CompileError::TemplateResolution {
        tool: tool.to_string(),
        placeholder: template.to_string(),
        reason,
    })?;

    let mut out = String::with_capacity(template.len());
    let mut last = 0;
    for caps in PLACEHOLDER.captures_iter(template) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let key = &caps[1];
        out.push_str(&template[last..whole.start()]);
        out.push_str(&scalar_text(tool, key, input.get(key))?);
        last = whole.end();
    }
    out.push_str(&template[last..]);
    Ok(out)
}

fn scalar_text(tool: &str, key: &str, value: Option<&Value>) -> Result<String, CompileError> {
    let err = |reason: &str| CompileError::TemplateResolution {
        tool: tool.to_string(),
        placeholder: key.to_string(),
        reason: reason.to_string(),
    };
    match value {
        None => Err(err("no input value")),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(Value::Bool(b)) => Ok(b.to_string()),
        Some(Value::Null) => Err(err("value is null")),
        Some(_) => Err(err("structured values cannot be placed in a URL")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn input(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn extracts_placeholders_in_order() {
        assert_eq!(
            placeholders("/createmeta/{{project}}/issuetypes/{{issuetype}}"),
            vec!["project", "issuetype"]
        );
        assert!(placeholders("/rest/api/3/issue").is_empty());
    }

    #[test]
    fn resolves_strings_and_numbers() {
        let out = resolve(
            "t",
            "/board/{{board}}/sprint?state={{state}}",
            &input(json!({"board": 7, "state": "active"})),
        )
        .unwrap();
        assert_eq!(out, "/board/7/sprint?state=active");
    }

    #[test]
    fn missing_value_is_an_error() {
        let err = resolve("t", "/issue/{{issue}}", &input(json!({}))).unwrap_err();
        assert!(matches!(err, CompileError::TemplateResolution { ref placeholder, .. } if placeholder == "issue"));
    }

    #[test]
    fn malformed_placeholder_is_rejected() {
        assert!(check_syntax("/issue/{{ issue }}").is_err());
        assert!(check_syntax("/issue/{{issue}}").is_ok());
    }
}
