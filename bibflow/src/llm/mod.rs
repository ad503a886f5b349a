//! Completion-endpoint abstraction for the chat session.
//!
//! [`ChatSession`](crate::chat::ChatSession) depends on a client that takes
//! the full ordered message list plus model configuration and returns a
//! [`ChatReply`]: either a structured completion or a transport failure.
//! Transport failures are values — the client never raises; callers branch on
//! the reply shape. Implementations: [`HttpCompletionClient`] (real endpoint)
//! and [`MockCompletionClient`] (scripted replies for tests).

mod http;
mod mock;

pub use http::HttpCompletionClient;
pub use mock::MockCompletionClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::message::{ChatMessage, FunctionCall};

/// Schema for one function the model may invoke, advertised with each
/// completion request when the workflow registers handlers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionSchema {
    /// Function name; must have a registered handler in the router.
    pub name: String,
    /// Human-readable description shown to the model.
    pub description: String,
    /// JSON schema of the argument object.
    pub parameters: Value,
}

/// Request body for the completion endpoint.
///
/// Wire shape: `{model, messages, temperature, max_tokens, functions?}`.
#[derive(Debug, Serialize)]
pub struct CompletionRequest<'a> {
    /// Model name.
    pub model: &'a str,
    /// Full ordered message history, system message first when present.
    pub messages: &'a [ChatMessage],
    /// Sampling temperature.
    pub temperature: f32,
    /// Completion token budget.
    pub max_tokens: u32,
    /// Function schemas the model may invoke, when the workflow set any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub functions: Option<&'a [FunctionSchema]>,
}

/// Token usage accounting returned with every successful completion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    /// Tokens in the prompt (input).
    pub prompt_tokens: u32,
    /// Tokens in the completion (output).
    pub completion_tokens: u32,
}

/// One completion choice: the assistant message produced by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Choice {
    /// Assistant message (text content or function_call).
    pub message: ChatMessage,
}

/// Successful completion response.
///
/// Wire shape: `{id, created, choices:[{message}], usage}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletion {
    /// Response id assigned by the endpoint.
    pub id: String,
    /// Creation timestamp (seconds since epoch).
    pub created: i64,
    /// Completion choices; the session appends `choices[0].message`.
    pub choices: Vec<Choice>,
    /// Token usage for this call.
    pub usage: Usage,
}

/// Transport failure from the completion endpoint, as a value.
///
/// `error` is the HTTP status (0 when the request never reached the server),
/// `message` the status text or I/O error. Mirrors the endpoint's failure
/// shape `{error, message}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportFailure {
    /// HTTP status code, or 0 for connection-level failures.
    pub error: u16,
    /// Failure reason.
    pub message: String,
}

/// Reply from one completion call: a completion or a transport failure.
///
/// Serialized untagged so it matches the endpoint's two disjoint wire
/// shapes; in memory it is the discriminated result callers branch on
/// instead of sniffing field presence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChatReply {
    /// The endpoint answered 2xx with a structured completion.
    Completion(ChatCompletion),
    /// The call failed in transport; nothing was appended to the session.
    Transport(TransportFailure),
}

impl ChatReply {
    /// The assistant message of the first choice, when this is a completion.
    pub fn message(&self) -> Option<&ChatMessage> {
        match self {
            ChatReply::Completion(c) => c.choices.first().map(|ch| &ch.message),
            ChatReply::Transport(_) => None,
        }
    }

    /// The function call of the first choice, when present.
    pub fn function_call(&self) -> Option<&FunctionCall> {
        self.message().and_then(|m| m.function_call.as_ref())
    }

    /// The text content of the first choice, when present.
    pub fn content(&self) -> Option<&str> {
        self.message().and_then(|m| m.content.as_deref())
    }

    /// The transport failure, when this reply is one.
    pub fn failure(&self) -> Option<&TransportFailure> {
        match self {
            ChatReply::Transport(f) => Some(f),
            ChatReply::Completion(_) => None,
        }
    }
}

/// Completion client: full message list in, [`ChatReply`] out.
///
/// **Interaction**: Owned by the chat session as `Arc<dyn CompletionClient>`;
/// the HTTP implementation posts the request body to the completion endpoint,
/// the mock pops scripted replies.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// One completion round trip. Never errors; transport failures come back
    /// as `ChatReply::Transport`.
    async fn complete(&self, request: CompletionRequest<'_>) -> ChatReply;
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: A transport failure reply deserializes from the `{error, message}`
    /// wire shape and exposes failure() but no message().
    #[test]
    fn chat_reply_failure_shape() {
        let reply: ChatReply =
            serde_json::from_str(r#"{"error": 401, "message": "Unauthorized"}"#).unwrap();
        let failure = reply.failure().expect("transport failure");
        assert_eq!(failure.error, 401);
        assert_eq!(failure.message, "Unauthorized");
        assert!(reply.message().is_none());
    }

    /// **Scenario**: A completion reply deserializes from the endpoint's success shape
    /// and exposes content and usage.
    #[test]
    fn chat_reply_completion_shape() {
        let body = r#"{
            "id": "cmpl-1",
            "created": 1700000000,
            "choices": [{"message": {"role": "assistant", "content": "hello"}}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 3}
        }"#;
        let reply: ChatReply = serde_json::from_str(body).unwrap();
        assert_eq!(reply.content(), Some("hello"));
        assert!(reply.function_call().is_none());
        match &reply {
            ChatReply::Completion(c) => assert_eq!(c.usage.prompt_tokens, 12),
            other => panic!("expected completion, got {:?}", other),
        }
    }

    /// **Scenario**: A request without functions serializes without the field.
    #[test]
    fn completion_request_omits_empty_functions() {
        let messages = vec![ChatMessage::user("hi")];
        let request = CompletionRequest {
            model: "gpt-3.5-turbo",
            messages: &messages,
            temperature: 0.9,
            max_tokens: 1050,
            functions: None,
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(!json.contains("functions"), "{}", json);
        assert!(json.contains("\"max_tokens\":1050"), "{}", json);
    }
}
