//! Chat message types shared by the session and the completion wire format.
//!
//! A message carries a role plus either text content or a structured function
//! call (assistant turns that invoke a function have no content). The session
//! invariant — at most one system message, always first — is enforced by
//! [`ChatSession::set_system`](crate::chat::ChatSession::set_system).

use serde::{Deserialize, Serialize};

/// Message role on the completion wire: system, user, or assistant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System prompt; occupies position 0 when present.
    System,
    /// User input.
    User,
    /// Model reply (text or function call).
    Assistant,
}

/// A structured function call emitted by the model: a name plus a serialized
/// JSON argument payload.
///
/// **Interaction**: Produced inside an assistant [`ChatMessage`]; consumed by
/// [`FunctionCallRouter::dispatch`](crate::router::FunctionCallRouter::dispatch),
/// which parses `arguments` strictly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    /// Function name, matched exactly against registered handlers.
    pub name: String,
    /// Serialized JSON object with the function arguments.
    pub arguments: String,
}

/// One message in a conversation: role plus content or function_call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who produced the message.
    pub role: Role,
    /// Text content; absent on assistant turns that carry a function call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Function call; only present on assistant turns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
}

impl ChatMessage {
    /// Creates a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: Some(content.into()),
            function_call: None,
        }
    }

    /// Creates a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: Some(content.into()),
            function_call: None,
        }
    }

    /// Creates an assistant text message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: Some(content.into()),
            function_call: None,
        }
    }
}
