//! Compiler error types

/// Failure to turn a descriptor plus model input into a concrete request.
///
/// These never abort an agent loop; the executor renders them as failed tool results.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    #[error("tool '{tool}' is missing required field '{field}'")]
    MissingRequiredField { tool: String, field: String },

    #[error("tool '{tool}' cannot resolve URL placeholder '{placeholder}': {reason}")]
    TemplateResolution {
        tool: String,
        placeholder: String,
        reason: String,
    },

    #[error("tool '{tool}' body key '{key}' is produced by more than one field")]
    BodyFieldCollision { tool: String, key: String },

    #[error("tool '{tool}' resolved to an invalid URL '{url}': {reason}")]
    InvalidUrl {
        tool: String,
        url: String,
        reason: String,
    },
}

impl CompileError {
    pub fn tool(&self) -> &str {
        match self {
            CompileError::MissingRequiredField { tool, .. }
            | CompileError::TemplateResolution { tool, .. }
            | CompileError::BodyFieldCollision { tool, .. }
            | CompileError::InvalidUrl { tool, .. } => tool,
        }
    }
}
