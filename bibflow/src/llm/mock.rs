use std::sync::Mutex;

use async_trait::async_trait;

use super::{
    ChatCompletion, ChatReply, Choice, CompletionClient, CompletionRequest, TransportFailure,
    Usage,
};
use crate::message::{ChatMessage, FunctionCall, Role};

/// Scripted completion client for tests.
///
/// Replies are popped in the order they were queued; once the script runs
/// out, every further call answers with a transport failure so a test that
/// over-calls fails loudly instead of hanging on fabricated content.
pub struct MockCompletionClient {
    script: Mutex<Vec<ChatReply>>,
    calls: Mutex<Vec<Vec<ChatMessage>>>,
}

impl MockCompletionClient {
    pub fn new(replies: Vec<ChatReply>) -> Self {
        let mut script = replies;
        // pop() takes from the back; keep queue order.
        script.reverse();
        Self {
            script: Mutex::new(script),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// A client whose single reply is a plain assistant text message.
    pub fn with_text(content: impl Into<String>) -> Self {
        Self::new(vec![Self::text_reply(content)])
    }

    /// A completion reply carrying assistant text.
    pub fn text_reply(content: impl Into<String>) -> ChatReply {
        Self::completion(ChatMessage::assistant(content))
    }

    /// A completion reply carrying a function call.
    pub fn function_reply(name: impl Into<String>, arguments: impl Into<String>) -> ChatReply {
        Self::completion(ChatMessage {
            role: Role::Assistant,
            content: None,
            function_call: Some(FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            }),
        })
    }

    /// A transport failure reply.
    pub fn failure_reply(error: u16, message: impl Into<String>) -> ChatReply {
        ChatReply::Transport(TransportFailure {
            error,
            message: message.into(),
        })
    }

    fn completion(message: ChatMessage) -> ChatReply {
        ChatReply::Completion(ChatCompletion {
            id: "cmpl-mock".to_owned(),
            created: 0,
            choices: vec![Choice { message }],
            usage: Usage::default(),
        })
    }

    /// Message lists seen by each call, in call order.
    pub fn calls(&self) -> Vec<Vec<ChatMessage>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionClient for MockCompletionClient {
    async fn complete(&self, request: CompletionRequest<'_>) -> ChatReply {
        self.calls.lock().unwrap().push(request.messages.to_vec());
        self.script
            .lock()
            .unwrap()
            .pop()
            .unwrap_or_else(|| Self::failure_reply(0, "mock reply script exhausted"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: Scripted replies come back in queue order and the call log
    /// records each message list.
    #[tokio::test]
    async fn scripted_replies_pop_in_order() {
        let client = MockCompletionClient::new(vec![
            MockCompletionClient::text_reply("first"),
            MockCompletionClient::text_reply("second"),
        ]);
        let messages = vec![ChatMessage::user("hi")];
        fn request(messages: &[ChatMessage]) -> CompletionRequest<'_> {
            CompletionRequest {
                model: "test-model",
                messages,
                temperature: 0.0,
                max_tokens: 16,
                functions: None,
            }
        }

        assert_eq!(client.complete(request(&messages)).await.content(), Some("first"));
        assert_eq!(client.complete(request(&messages)).await.content(), Some("second"));
        assert_eq!(client.calls().len(), 2);
    }

    /// **Scenario**: Once the script is exhausted further calls fail as transport
    /// errors instead of inventing content.
    #[tokio::test]
    async fn exhausted_script_fails_loudly() {
        let client = MockCompletionClient::new(Vec::new());
        let messages = vec![ChatMessage::user("hi")];
        let reply = client
            .complete(CompletionRequest {
                model: "test-model",
                messages: &messages,
                temperature: 0.0,
                max_tokens: 16,
                functions: None,
            })
            .await;
        assert_eq!(reply.failure().map(|f| f.error), Some(0));
    }
}
