//! Provider-neutral conversation turns.
//!
//! Drivers render these into each backend's native message shape, so the loop
//! never holds backend-specific JSON in its history.

use serde::{Deserialize, Serialize};

use super::tool::{ToolInvocation, ToolResult};

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// Turn content: plain text, an assistant tool-call request, or the synthetic
/// tool-result turn that answers it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnContent {
    Text {
        text: String,
    },
    ToolCalls {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
        invocations: Vec<ToolInvocation>,
    },
    ToolResults {
        results: Vec<ToolResult>,
    },
}

/// One role-tagged entry of a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: TurnContent,
}

impl Turn {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: TurnContent::Text { text: text.into() },
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: TurnContent::Text { text: text.into() },
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: TurnContent::Text { text: text.into() },
        }
    }

    pub fn tool_calls(text: Option<String>, invocations: Vec<ToolInvocation>) -> Self {
        Self {
            role: Role::Assistant,
            content: TurnContent::ToolCalls { text, invocations },
        }
    }

    /// Tool results travel as a user-role turn.
    pub fn tool_results(results: Vec<ToolResult>) -> Self {
        Self {
            role: Role::User,
            content: TurnContent::ToolResults { results },
        }
    }

    pub fn text(&self) -> Option<&str> {
        match &self.content {
            TurnContent::Text { text } => Some(text),
            TurnContent::ToolCalls { text, .. } => text.as_deref(),
            TurnContent::ToolResults { .. } => None,
        }
    }
}

/// Split leading/embedded system turns out of a history, joining their text.
pub(crate) fn split_system(system_prompt: &str, turns: &[Turn]) -> (String, Vec<Turn>) {
    let mut system_parts: Vec<String> = Vec::new();
    if !system_prompt.trim().is_empty() {
        system_parts.push(system_prompt.to_string());
    }
    let mut rest = Vec::with_capacity(turns.len());
    for t in turns {
        match (t.role, &t.content) {
            (Role::System, TurnContent::Text { text }) => system_parts.push(text.clone()),
            _ => rest.push(t.clone()),
        }
    }
    (system_parts.join("\n\n"), rest)
}
