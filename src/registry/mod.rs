//! 工具注册表 — 按集成维护有序的工具描述集合并校验其不变量
//!
//! Tool registry: an ordered, name-indexed set of [`ToolDescriptor`]s for one
//! integration. Construction validates every descriptor invariant so the
//! compiler can rely on them:
//!
//! - names are non-empty and unique within the registry;
//! - URL templates only contain well-formed `{{field}}` placeholders, each naming
//!   a field of the input schema;
//! - body fields are a duplicate-free subset of the input schema;
//! - GET tools declare no body fields.

mod loader;

pub use loader::{load_dir, load_file, RegistryFile};

use std::collections::{HashMap, HashSet};

use crate::compiler::template;
use crate::types::{HttpMethod, ToolDescriptor};

/// Registry error types
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("invalid tool descriptor '{tool}': {reason}")]
    InvalidDescriptor { tool: String, reason: String },

    #[error("duplicate tool name '{0}'")]
    DuplicateTool(String),

    #[error("failed to load tool registry from {path}: {reason}")]
    Load { path: String, reason: String },

    #[error("failed to parse tool registry: {0}")]
    Parse(String),
}

/// Immutable descriptor set, safe to share across concurrent loops.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<ToolDescriptor>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new(tools: Vec<ToolDescriptor>) -> Result<Self, RegistryError> {
        let mut index = HashMap::with_capacity(tools.len());
        for (i, tool) in tools.iter().enumerate() {
            validate_descriptor(tool)?;
            if index.insert(tool.name.clone(), i).is_some() {
                return Err(RegistryError::DuplicateTool(tool.name.clone()));
            }
        }
        Ok(Self { tools, index })
    }

    pub fn from_yaml_str(s: &str) -> Result<Self, RegistryError> {
        let file: RegistryFile =
            serde_yaml::from_str(s).map_err(|e| RegistryError::Parse(e.to_string()))?;
        Self::new(file.tools)
    }

    pub fn from_json_str(s: &str) -> Result<Self, RegistryError> {
        let file: RegistryFile =
            serde_json::from_str(s).map_err(|e| RegistryError::Parse(e.to_string()))?;
        Self::new(file.tools)
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    pub fn descriptors(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    pub fn iter(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.tools.iter()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Check the descriptor invariants listed in the module docs.
pub fn validate_descriptor(tool: &ToolDescriptor) -> Result<(), RegistryError> {
    let invalid = |reason: String| RegistryError::InvalidDescriptor {
        tool: tool.name.clone(),
        reason,
    };

    if tool.name.trim().is_empty() {
        return Err(invalid("name must not be empty".into()));
    }
    template::check_syntax(&tool.url_template).map_err(invalid)?;

    for placeholder in template::placeholders(&tool.url_template) {
        if !tool.input_schema.contains_key(&placeholder) {
            return Err(invalid(format!(
                "URL placeholder '{}' is not an input field",
                placeholder
            )));
        }
    }

    let mut seen = HashSet::new();
    for field in &tool.body_fields {
        if !tool.input_schema.contains_key(field) {
            return Err(invalid(format!("body field '{}' is not an input field", field)));
        }
        if !seen.insert(field.as_str()) {
            return Err(invalid(format!("body field '{}' is listed twice", field)));
        }
    }

    if tool.method == HttpMethod::Get && !tool.body_fields.is_empty() {
        return Err(invalid("GET tools cannot declare body fields".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FieldSpec;

    fn fetch() -> ToolDescriptor {
        ToolDescriptor::new("jirafetchTool", HttpMethod::Get, "/rest/api/3/issue/{{issue}}")
            .with_field("issue", FieldSpec::string().required())
    }

    #[test]
    fn preserves_order_and_indexes_by_name() {
        let comment = ToolDescriptor::new(
            "jiracommentTool",
            HttpMethod::Post,
            "/rest/api/3/issue/{{issue}}/comment",
        )
        .with_field("issue", FieldSpec::string().required())
        .with_field("comment", FieldSpec::string().required())
        .with_body_fields(["comment"]);

        let reg = ToolRegistry::new(vec![comment, fetch()]).unwrap();
        let names: Vec<_> = reg.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["jiracommentTool", "jirafetchTool"]);
        assert_eq!(reg.get("jirafetchTool").unwrap().method, HttpMethod::Get);
        assert!(reg.get("nope").is_none());
    }

    #[test]
    fn rejects_duplicates() {
        let err = ToolRegistry::new(vec![fetch(), fetch()]).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateTool(name) if name == "jirafetchTool"));
    }

    #[test]
    fn rejects_unknown_placeholder() {
        let bad = ToolDescriptor::new("t", HttpMethod::Get, "/issue/{{key}}");
        assert!(matches!(
            validate_descriptor(&bad),
            Err(RegistryError::InvalidDescriptor { .. })
        ));
    }

    #[test]
    fn rejects_body_fields_outside_schema_and_on_get() {
        let outside = ToolDescriptor::new("t", HttpMethod::Post, "/x").with_body_fields(["body"]);
        assert!(validate_descriptor(&outside).is_err());

        let get = ToolDescriptor::new("t", HttpMethod::Get, "/x")
            .with_field("body", FieldSpec::string())
            .with_body_fields(["body"]);
        assert!(validate_descriptor(&get).is_err());
    }
}
