//! Tool descriptor and invocation types shared by the compiler, drivers and agent loop.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// HTTP method of a remote tool operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JSON type of a tool input field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Array,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Integer => "integer",
            FieldType::Boolean => "boolean",
            FieldType::Object => "object",
            FieldType::Array => "array",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "string" => Some(FieldType::String),
            "number" => Some(FieldType::Number),
            "integer" => Some(FieldType::Integer),
            "boolean" => Some(FieldType::Boolean),
            "object" => Some(FieldType::Object),
            "array" => Some(FieldType::Array),
            _ => None,
        }
    }
}

/// One input field of a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
    /// Extra JSON-schema keywords for structured fields (`properties`, `items`, nested `required`).
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub schema: Map<String, Value>,
}

impl FieldSpec {
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            description: None,
            required: false,
            schema: Map::new(),
        }
    }

    pub fn string() -> Self {
        Self::new(FieldType::String)
    }

    pub fn object() -> Self {
        Self::new(FieldType::Object)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_schema(mut self, schema: Map<String, Value>) -> Self {
        self.schema = schema;
        self
    }

    fn to_json_schema(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("type".into(), Value::String(self.field_type.as_str().into()));
        if let Some(ref d) = self.description {
            obj.insert("description".into(), Value::String(d.clone()));
        }
        for (k, v) in &self.schema {
            obj.insert(k.clone(), v.clone());
        }
        Value::Object(obj)
    }
}

/// Field name → spec. Sorted by name so that every rendering is deterministic.
pub type InputSchema = BTreeMap<String, FieldSpec>;

/// Render an input schema as a JSON-schema `object` document.
pub fn input_schema_to_json(schema: &InputSchema) -> Value {
    let properties: Map<String, Value> = schema
        .iter()
        .map(|(name, spec)| (name.clone(), spec.to_json_schema()))
        .collect();
    let required: Vec<Value> = schema
        .iter()
        .filter(|(_, spec)| spec.required)
        .map(|(name, _)| Value::String(name.clone()))
        .collect();
    serde_json::json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

/// Inverse of [`input_schema_to_json`]. Returns `None` for documents that are not
/// `object` schemas or that use a field type outside [`FieldType`].
pub fn input_schema_from_json(doc: &Value) -> Option<InputSchema> {
    let properties = doc.get("properties")?.as_object()?;
    let required: Vec<&str> = doc
        .get("required")
        .and_then(|r| r.as_array())
        .map(|arr| arr.iter().filter_map(|v| v.as_str()).collect())
        .unwrap_or_default();

    let mut schema = InputSchema::new();
    for (name, prop) in properties {
        let prop = prop.as_object()?;
        let field_type = FieldType::parse(prop.get("type")?.as_str()?)?;
        let description = prop
            .get("description")
            .and_then(|d| d.as_str())
            .map(String::from);
        let extra: Map<String, Value> = prop
            .iter()
            .filter(|(k, _)| k.as_str() != "type" && k.as_str() != "description")
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        schema.insert(
            name.clone(),
            FieldSpec {
                field_type,
                description,
                required: required.contains(&name.as_str()),
                schema: extra,
            },
        );
    }
    Some(schema)
}

/// Declarative definition of one remote REST operation a model may call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub method: HttpMethod,
    /// Path (appended to the integration base URL) with `{{field}}` placeholders.
    #[serde(alias = "url")]
    pub url_template: String,
    /// Input fields merged into the outgoing body, in merge order.
    #[serde(default, alias = "fields")]
    pub body_fields: Vec<String>,
    #[serde(default)]
    pub input_schema: InputSchema,
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>, method: HttpMethod, url_template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            method,
            url_template: url_template.into(),
            body_fields: Vec::new(),
            input_schema: InputSchema::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, spec: FieldSpec) -> Self {
        self.input_schema.insert(name.into(), spec);
        self
    }

    pub fn with_body_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.body_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &str> {
        self.input_schema
            .iter()
            .filter(|(_, spec)| spec.required)
            .map(|(name, _)| name.as_str())
    }

    /// JSON-schema rendering of the input schema.
    pub fn parameters_schema(&self) -> Value {
        input_schema_to_json(&self.input_schema)
    }
}

/// One model-requested call to a named tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Provider-assigned correlation id, preserved verbatim.
    pub id: String,
    pub tool_name: String,
    /// Values may be JSON-encoded strings; the compiler decodes them.
    pub raw_input: Map<String, Value>,
    /// Set when the backend sent arguments that could not be read. Such an
    /// invocation is answered with a failed result and never executed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_error: Option<String>,
}

impl ToolInvocation {
    pub fn new(id: impl Into<String>, tool_name: impl Into<String>, raw_input: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            tool_name: tool_name.into(),
            raw_input,
            input_error: None,
        }
    }

    pub fn with_input_error(mut self, error: impl Into<String>) -> Self {
        self.input_error = Some(error.into());
        self
    }
}

/// Tool result (response to tool call)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub invocation_id: String,
    pub content: String,
    #[serde(default)]
    pub is_error: bool,
}

impl ToolResult {
    pub fn success(invocation_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            invocation_id: invocation_id.into(),
            content: content.into(),
            is_error: false,
        }
    }

    pub fn failure(invocation_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            invocation_id: invocation_id.into(),
            content: content.into(),
            is_error: true,
        }
    }
}
