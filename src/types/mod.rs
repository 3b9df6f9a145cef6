//! 类型系统模块：工具描述、调用与对话轮次的核心数据类型。
//!
//! # Types Module
//!
//! Core data model of the tool-invocation runtime.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`ToolDescriptor`] | Static declaration of one remote HTTP operation |
//! | [`ToolInvocation`] | One model-requested call, with correlation id and raw input |
//! | [`ToolResult`] | Textual outcome of an invocation |
//! | [`Turn`] | Role-tagged conversation entry |
//!
//! ## Example
//!
//! ```rust
//! use ai_lib_tools::types::{FieldSpec, HttpMethod, ToolDescriptor};
//!
//! let fetch = ToolDescriptor::new("jirafetchTool", HttpMethod::Get, "/rest/api/3/issue/{{issue}}")
//!     .with_description("Fetch all info of a jira ticket")
//!     .with_field("issue", FieldSpec::string().required());
//! assert_eq!(fetch.required_fields().collect::<Vec<_>>(), vec!["issue"]);
//! ```

pub mod message;
pub mod tool;

pub use message::{Role, Turn, TurnContent};
pub use tool::{
    input_schema_from_json, input_schema_to_json, FieldSpec, FieldType, HttpMethod, InputSchema,
    ToolDescriptor, ToolInvocation, ToolResult,
};
