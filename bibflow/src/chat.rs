//! Stateful chat session over a [`CompletionClient`].
//!
//! The session owns the ordered message history and the model configuration.
//! Invariant: the history holds at most one system message and it sits at
//! index 0; [`ChatSession::set_system`] replaces it in place. Each
//! [`ChatSession::send`] appends the user message before the call, then
//! appends the assistant message only when the endpoint answered with a
//! completion. A transport failure leaves the user message in the history so
//! a retry carries the same context.

use std::sync::Arc;

use tracing::debug;

use crate::llm::{ChatReply, CompletionClient, CompletionRequest, FunctionSchema};
use crate::message::{ChatMessage, Role};

/// Model configuration for every call a session makes.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Model name.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Completion token budget.
    pub max_tokens: u32,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            model: "gpt-3.5-turbo".to_owned(),
            temperature: 0.9,
            max_tokens: 1050,
        }
    }
}

/// Chat session: message history plus client plus configuration.
///
/// **Interaction**: Workflows hold the session behind a mutex inside the
/// shared context; conversational vertices lock it, send one user message and
/// read the reply.
pub struct ChatSession {
    client: Arc<dyn CompletionClient>,
    config: ChatConfig,
    messages: Vec<ChatMessage>,
    functions: Vec<FunctionSchema>,
}

impl ChatSession {
    pub fn new(client: Arc<dyn CompletionClient>, config: ChatConfig) -> Self {
        Self {
            client,
            config,
            messages: Vec::new(),
            functions: Vec::new(),
        }
    }

    /// Set or replace the single system message, always at index 0.
    pub fn set_system(&mut self, content: impl Into<String>) {
        let message = ChatMessage::system(content);
        match self.messages.first() {
            Some(first) if first.role == Role::System => self.messages[0] = message,
            _ => self.messages.insert(0, message),
        }
    }

    /// Advertise function schemas with every subsequent call.
    pub fn set_functions(&mut self, functions: Vec<FunctionSchema>) {
        self.functions = functions;
    }

    /// Schemas currently advertised.
    pub fn functions(&self) -> &[FunctionSchema] {
        &self.functions
    }

    /// Full message history in order.
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Append `content` as a user message and run one completion round trip.
    ///
    /// On a completion reply the assistant message of the first choice is
    /// appended to the history; on a transport failure nothing is appended
    /// beyond the user message. The reply is returned either way.
    pub async fn send(&mut self, content: impl Into<String>) -> ChatReply {
        self.messages.push(ChatMessage::user(content));
        let functions = if self.functions.is_empty() {
            None
        } else {
            Some(self.functions.as_slice())
        };
        let reply = self
            .client
            .complete(CompletionRequest {
                model: &self.config.model,
                messages: &self.messages,
                temperature: self.config.temperature,
                max_tokens: self.config.max_tokens,
                functions,
            })
            .await;

        match &reply {
            ChatReply::Completion(completion) => {
                if let Some(choice) = completion.choices.first() {
                    self.messages.push(choice.message.clone());
                }
                debug!(
                    prompt_tokens = completion.usage.prompt_tokens,
                    completion_tokens = completion.usage.completion_tokens,
                    "chat completion"
                );
            }
            ChatReply::Transport(failure) => {
                debug!(error = failure.error, message = %failure.message, "chat call failed");
            }
        }
        reply
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockCompletionClient;

    fn session(client: MockCompletionClient) -> ChatSession {
        ChatSession::new(Arc::new(client), ChatConfig::default())
    }

    /// **Scenario**: set_system on an empty session puts the system message at
    /// index 0; calling it again replaces rather than duplicates.
    #[test]
    fn system_message_is_singular_and_first() {
        let mut session = session(MockCompletionClient::new(Vec::new()));
        session.set_system("you are a cataloger");
        session.set_system("you are terse");
        assert_eq!(session.messages().len(), 1);
        assert_eq!(session.messages()[0].role, Role::System);
        assert_eq!(session.messages()[0].content.as_deref(), Some("you are terse"));
    }

    /// **Scenario**: Setting the system message after user turns still lands it
    /// at index 0, ahead of the existing history.
    #[tokio::test]
    async fn late_system_message_moves_to_front() {
        let mut session = session(MockCompletionClient::with_text("ok"));
        session.send("hello").await;
        session.set_system("be brief");
        assert_eq!(session.messages()[0].role, Role::System);
        assert_eq!(session.messages().len(), 3);
    }

    /// **Scenario**: A successful call appends the user message then the
    /// assistant message, in that order.
    #[tokio::test]
    async fn completion_appends_both_turns() {
        let mut session = session(MockCompletionClient::with_text("hi there"));
        let reply = session.send("hello").await;
        assert_eq!(reply.content(), Some("hi there"));
        let roles: Vec<Role> = session.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant]);
    }

    /// **Scenario**: A transport failure keeps the user message but appends no
    /// assistant message, so a retry resends the same context.
    #[tokio::test]
    async fn transport_failure_keeps_user_turn_only() {
        let mut session = session(MockCompletionClient::new(vec![
            MockCompletionClient::failure_reply(503, "Service Unavailable"),
        ]));
        let reply = session.send("hello").await;
        assert_eq!(reply.failure().map(|f| f.error), Some(503));
        let roles: Vec<Role> = session.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User]);
    }

    /// **Scenario**: Function schemas are advertised only once registered.
    #[tokio::test]
    async fn functions_are_passed_when_registered() {
        let client = Arc::new(MockCompletionClient::new(vec![
            MockCompletionClient::text_reply("a"),
        ]));
        let mut session = ChatSession::new(client, ChatConfig::default());
        session.set_functions(vec![crate::llm::FunctionSchema {
            name: "add_instance".to_owned(),
            description: "create an instance".to_owned(),
            parameters: serde_json::json!({"type": "object"}),
        }]);
        assert_eq!(session.functions().len(), 1);
        session.send("go").await;
    }
}
