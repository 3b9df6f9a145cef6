//! System-prompt personalization and final-text cleanup.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use super::AuthContext;

static VARIABLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{(\w+)\}\}").expect("variable pattern is valid"));

static THINKING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<thinking>.*?</thinking>").expect("thinking pattern is valid"));

/// Replace `{{name}}` with `vars[name]`. Unknown names stay verbatim; list
/// values are joined with newlines.
pub fn render_template(template: &str, vars: &Map<String, Value>) -> String {
    VARIABLE
        .replace_all(template, |caps: &regex::Captures<'_>| match vars.get(&caps[1]) {
            Some(value) => value_text(value),
            None => caps[0].to_string(),
        })
        .into_owned()
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(value_text).collect::<Vec<_>>().join("\n"),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Render the prompt template and tell the model who it is talking to.
pub fn personalize(template: &str, vars: &Map<String, Value>, ctx: &AuthContext) -> String {
    let mut prompt = render_template(template, vars);
    if !ctx.email.trim().is_empty() {
        prompt.push_str(&format!(
            "\nCurrent user is: {}. If no other email or user id is provided, use this.",
            ctx.email
        ));
    }
    prompt
}

/// Drop `<thinking>` spans some models emit ahead of their answer.
pub fn strip_thinking(text: &str) -> String {
    THINKING.replace_all(text, "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn renders_known_variables_only() {
        let vars = json!({"company": "Acme", "projects": ["CORE", "OPS"], "limit": 5});
        let out = render_template(
            "You work for {{company}} on:\n{{projects}}\nMax {{limit}}, {{unknown}}",
            vars.as_object().unwrap(),
        );
        assert_eq!(out, "You work for Acme on:\nCORE\nOPS\nMax 5, {{unknown}}");
    }

    #[test]
    fn appends_current_user() {
        let ctx = AuthContext::new("T1", "U1", "ann@acme.io");
        let out = personalize("Hi.", &Map::new(), &ctx);
        assert!(out.starts_with("Hi.\nCurrent user is: ann@acme.io."));

        let anonymous = AuthContext::new("T1", "U1", "");
        assert_eq!(personalize("Hi.", &Map::new(), &anonymous), "Hi.");
    }

    #[test]
    fn strips_thinking_spans_across_lines() {
        let text = "<thinking>look up\nCORE-1</thinking>\nCORE-1 is open.";
        assert_eq!(strip_thinking(text), "CORE-1 is open.");
    }
}
