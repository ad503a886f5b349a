use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use super::{CatalogFailure, CatalogService, VocabularyKind};

/// Connection settings for an Okapi-fronted catalog.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Okapi gateway base URL (API calls).
    pub okapi_url: String,
    /// Tenant id sent as `x-okapi-tenant`.
    pub tenant: String,
    /// Auth token sent as `x-okapi-token`.
    pub token: String,
    /// Catalog UI base URL (viewer links).
    pub view_base: String,
}

/// Catalog client over HTTP.
///
/// Record creation posts to `/instance-storage/instances`; the returned id is
/// turned into a viewer URL under the UI base. Vocabulary listings are
/// fetched from the kind's path and filtered to its allow-list here, so the
/// cache above only ever sees recognized names.
pub struct HttpCatalog {
    client: reqwest::Client,
    config: CatalogConfig,
}

impl HttpCatalog {
    pub fn new(config: CatalogConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.config.okapi_url, path))
            .header("Content-Type", "application/json")
            .header("x-okapi-tenant", &self.config.tenant)
            .header("x-okapi-token", &self.config.token)
    }

    async fn failure_from(response: reqwest::Response) -> CatalogFailure {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        CatalogFailure { status, body }
    }
}

#[async_trait]
impl CatalogService for HttpCatalog {
    async fn create_instance(&self, record: &Value) -> Result<String, CatalogFailure> {
        let response = self
            .request(reqwest::Method::POST, "/instance-storage/instances")
            .json(record)
            .send()
            .await
            .map_err(|err| CatalogFailure {
                status: 0,
                body: err.to_string(),
            })?;

        if !response.status().is_success() {
            let failure = Self::failure_from(response).await;
            warn!(status = failure.status, "instance creation rejected");
            return Err(failure);
        }

        let created: Value = response.json().await.map_err(|err| CatalogFailure {
            status: 0,
            body: format!("unreadable instance response: {err}"),
        })?;
        let id = created
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| CatalogFailure {
                status: 0,
                body: "instance response missing id".to_owned(),
            })?;
        debug!(%id, "instance created");
        Ok(format!("{}/inventory/view/{}", self.config.view_base, id))
    }

    async fn fetch_vocabulary(
        &self,
        kind: VocabularyKind,
    ) -> Result<HashMap<String, String>, CatalogFailure> {
        let response = self
            .request(reqwest::Method::GET, kind.path())
            .send()
            .await
            .map_err(|err| CatalogFailure {
                status: 0,
                body: err.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(Self::failure_from(response).await);
        }

        let listing: Value = response.json().await.map_err(|err| CatalogFailure {
            status: 0,
            body: format!("unreadable vocabulary listing: {err}"),
        })?;

        let mapping = super::Vocabulary::from_listing(kind, &listing).into_entries();
        debug!(kind = ?kind, entries = mapping.len(), "vocabulary fetched");
        Ok(mapping)
    }
}
