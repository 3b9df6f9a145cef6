//! 请求编译器：将工具描述与模型输入编译为具体的 HTTP 请求。
//!
//! # Request Compiler
//!
//! Turns a [`ToolDescriptor`] plus a model-supplied input object into a
//! [`CompiledRequest`]: resolved absolute URL, method, headers and serialized body.
//!
//! Compilation is pure and deterministic. Identical descriptor, input and target
//! always yield a byte-identical request; nothing here touches the network.
//!
//! ## Pipeline
//!
//! 1. Every field marked `required` must be present in the input.
//! 2. `{{field}}` placeholders in the URL template are replaced with the
//!    top-level (undecoded) input values. Resolution must be total.
//! 3. For non-GET tools, each declared body field is decoded one level
//!    (string-encoded JSON objects/arrays become structured values) and then
//!    either unwrapped into the body root (objects) or set under its own key.
//! 4. The caller-supplied header set (auth included) is attached.

mod auth;
mod body;
mod error;
pub mod template;

pub use auth::AuthScheme;
pub use body::decode_nested;
pub use error::CompileError;

use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::types::{HttpMethod, ToolDescriptor};

/// Where a compiled request goes and which headers it carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTarget {
    pub base_url: String,
    pub headers: BTreeMap<String, String>,
}

impl RequestTarget {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            headers: BTreeMap::new(),
        }
    }

    pub fn with_auth(mut self, auth: &AuthScheme) -> Self {
        if let Some(value) = auth.header_value() {
            self.headers.insert("Authorization".into(), value);
        }
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// A concrete HTTP request, built fresh for every invocation and never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    /// Serialized JSON body; `None` for GET tools and tools without body fields.
    pub body: Option<String>,
}

impl CompiledRequest {
    pub fn body_json(&self) -> Option<Value> {
        self.body
            .as_deref()
            .and_then(|b| serde_json::from_str(b).ok())
    }
}

/// Compile one invocation of `descriptor`.
pub fn compile(
    descriptor: &ToolDescriptor,
    raw_input: &Map<String, Value>,
    target: &RequestTarget,
) -> Result<CompiledRequest, CompileError> {
    let tool = descriptor.name.as_str();

    if let Some(field) = descriptor
        .required_fields()
        .find(|f| !raw_input.contains_key(*f))
    {
        return Err(CompileError::MissingRequiredField {
            tool: tool.to_string(),
            field: field.to_string(),
        });
    }

    let path = template::resolve(tool, &descriptor.url_template, raw_input)?;
    let url = join_url(tool, &target.base_url, &path)?;

    let body = if descriptor.method != HttpMethod::Get && !descriptor.body_fields.is_empty() {
        let map = body::assemble(tool, &descriptor.body_fields, raw_input)?;
        Some(Value::Object(map).to_string())
    } else {
        None
    };

    let mut headers = BTreeMap::new();
    headers.insert("Accept".to_string(), "application/json".to_string());
    if body.is_some() {
        headers.insert("Content-Type".to_string(), "application/json".to_string());
    }
    for (k, v) in &target.headers {
        headers.insert(k.clone(), v.clone());
    }

    Ok(CompiledRequest {
        method: descriptor.method,
        url,
        headers,
        body,
    })
}

fn join_url(tool: &str, base: &str, path: &str) -> Result<String, CompileError> {
    let base = base.trim_end_matches('/');
    let joined = if path.is_empty() || path.starts_with('/') || path.starts_with('?') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    };
    url::Url::parse(&joined)
        .map(|u| u.to_string())
        .map_err(|e| CompileError::InvalidUrl {
            tool: tool.to_string(),
            url: joined.clone(),
            reason: e.to_string(),
        })
}
