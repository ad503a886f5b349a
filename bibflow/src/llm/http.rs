use async_trait::async_trait;
use tracing::warn;

use super::{ChatReply, CompletionClient, CompletionRequest, TransportFailure};

/// Completion client backed by a real HTTP endpoint.
///
/// Posts the JSON request body with a bearer token and maps every failure
/// mode into `ChatReply::Transport`: non-2xx statuses keep their status code
/// and status text, connection-level errors use code 0, and a 2xx body that
/// does not parse as a completion is reported with the original status.
pub struct HttpCompletionClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl HttpCompletionClient {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl CompletionClient for HttpCompletionClient {
    async fn complete(&self, request: CompletionRequest<'_>) -> ChatReply {
        let sent = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await;

        let response = match sent {
            Ok(response) => response,
            Err(err) => {
                warn!(error = %err, "completion request failed in transport");
                return ChatReply::Transport(TransportFailure {
                    error: 0,
                    message: err.to_string(),
                });
            }
        };

        let status = response.status();
        if !status.is_success() {
            let message = status
                .canonical_reason()
                .map(str::to_owned)
                .unwrap_or_else(|| status.to_string());
            warn!(status = status.as_u16(), "completion endpoint rejected request");
            return ChatReply::Transport(TransportFailure {
                error: status.as_u16(),
                message,
            });
        }

        match response.json().await {
            Ok(completion) => ChatReply::Completion(completion),
            Err(err) => {
                warn!(error = %err, "completion body did not parse");
                ChatReply::Transport(TransportFailure {
                    error: status.as_u16(),
                    message: format!("unreadable completion body: {err}"),
                })
            }
        }
    }
}
