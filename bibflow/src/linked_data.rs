//! Fetching linked-data resources as opaque text.
//!
//! A linked-data description (for example a Sinopia resource) is pulled by
//! URL and fed back into the chat session verbatim; parsing the RDF is the
//! model's job, not ours.

use async_trait::async_trait;
use tracing::warn;

/// Failed linked-data fetch, as a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedDataFailure {
    /// HTTP status, or 0 when the request never reached the server.
    pub status: u16,
    pub message: String,
}

impl std::fmt::Display for LinkedDataFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "linked data fetch failed ({}): {}", self.status, self.message)
    }
}

/// Source of linked-data descriptions keyed by resource URL.
#[async_trait]
pub trait LinkedDataSource: Send + Sync {
    /// The textual form of the resource at `resource_url`.
    async fn fetch_text(&self, resource_url: &str) -> Result<String, LinkedDataFailure>;
}

/// Linked-data source over plain HTTP GET.
#[derive(Default)]
pub struct HttpLinkedData {
    client: reqwest::Client,
}

impl HttpLinkedData {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LinkedDataSource for HttpLinkedData {
    async fn fetch_text(&self, resource_url: &str) -> Result<String, LinkedDataFailure> {
        let response = self
            .client
            .get(resource_url)
            .send()
            .await
            .map_err(|err| LinkedDataFailure {
                status: 0,
                message: err.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), url = resource_url, "linked data fetch rejected");
            return Err(LinkedDataFailure {
                status: status.as_u16(),
                message: status
                    .canonical_reason()
                    .map(str::to_owned)
                    .unwrap_or_else(|| status.to_string()),
            });
        }

        response.text().await.map_err(|err| LinkedDataFailure {
            status: status.as_u16(),
            message: format!("unreadable resource body: {err}"),
        })
    }
}
