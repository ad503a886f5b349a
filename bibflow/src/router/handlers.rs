//! Handlers for the cataloging functions.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::info;

use super::{schemas, Dispatch, FunctionHandler};
use crate::catalog::{CatalogService, VocabularyCache};
use crate::error::WorkflowError;
use crate::linked_data::LinkedDataSource;
use crate::llm::FunctionSchema;
use crate::record::RecordTransformer;
use crate::sinks::RecordDisplay;

fn string_argument(
    arguments: &Map<String, Value>,
    function: &str,
    key: &str,
) -> Result<String, WorkflowError> {
    arguments
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| WorkflowError::MalformedFunctionArguments {
            name: function.to_owned(),
            reason: format!("missing string argument {key:?}"),
        })
}

/// `add_instance`: rewrite the record with vocabulary ids, store it as the
/// workflow's record under construction, and persist it to the catalog.
///
/// Success yields the viewer URL; a catalog rejection is forwarded to the
/// display unmodified and reported as diagnostic text.
pub struct AddInstanceHandler {
    catalog: Arc<dyn CatalogService>,
    vocabularies: Arc<VocabularyCache>,
    record: Arc<Mutex<Value>>,
    display: Arc<dyn RecordDisplay>,
    instance_type_default: Option<String>,
}

impl AddInstanceHandler {
    pub fn new(
        catalog: Arc<dyn CatalogService>,
        vocabularies: Arc<VocabularyCache>,
        record: Arc<Mutex<Value>>,
        display: Arc<dyn RecordDisplay>,
    ) -> Self {
        Self {
            catalog,
            vocabularies,
            record,
            display,
            instance_type_default: None,
        }
    }

    /// Overrides the resource-type key applied to records that declare none.
    pub fn with_instance_type_default(mut self, key: impl Into<String>) -> Self {
        self.instance_type_default = Some(key.into());
        self
    }
}

#[async_trait]
impl FunctionHandler for AddInstanceHandler {
    fn schema(&self) -> FunctionSchema {
        schemas::add_instance_schema()
    }

    async fn invoke(&self, arguments: Map<String, Value>) -> Result<Dispatch, WorkflowError> {
        let raw = string_argument(&arguments, "add_instance", "record")?;
        let mut record: Value = serde_json::from_str(&raw).map_err(|err| {
            WorkflowError::MalformedFunctionArguments {
                name: "add_instance".to_owned(),
                reason: format!("record argument is not valid JSON: {err}"),
            }
        })?;

        let mut transformer = RecordTransformer::from_cache(&self.vocabularies).await;
        if let Some(key) = &self.instance_type_default {
            transformer = transformer.with_instance_type_default(key.clone());
        }
        transformer.update(&mut record);
        *self.record.lock().await = record.clone();

        match self.catalog.create_instance(&record).await {
            Ok(url) => {
                info!(%url, "instance created");
                Ok(Dispatch::Url(url))
            }
            Err(failure) => {
                self.display.show_failure(&failure);
                Ok(Dispatch::Text(failure.to_string()))
            }
        }
    }
}

/// `load_instance`: point the record display at an existing instance URL.
pub struct LoadInstanceHandler {
    display: Arc<dyn RecordDisplay>,
}

impl LoadInstanceHandler {
    pub fn new(display: Arc<dyn RecordDisplay>) -> Self {
        Self { display }
    }
}

#[async_trait]
impl FunctionHandler for LoadInstanceHandler {
    fn schema(&self) -> FunctionSchema {
        schemas::load_instance_schema()
    }

    async fn invoke(&self, arguments: Map<String, Value>) -> Result<Dispatch, WorkflowError> {
        let url = string_argument(&arguments, "load_instance", "instance_url")?;
        self.display.show(&url);
        Ok(Dispatch::Text(format!("Loaded {url} into viewer")))
    }
}

/// `load_sinopia`: fetch a linked-data resource and hand back its text for
/// the chat session to reason over. Fetch failures come back as diagnostic
/// text rather than aborting the run.
pub struct LoadLinkedDataHandler {
    source: Arc<dyn LinkedDataSource>,
}

impl LoadLinkedDataHandler {
    pub fn new(source: Arc<dyn LinkedDataSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl FunctionHandler for LoadLinkedDataHandler {
    fn schema(&self) -> FunctionSchema {
        schemas::load_sinopia_schema()
    }

    async fn invoke(&self, arguments: Map<String, Value>) -> Result<Dispatch, WorkflowError> {
        let url = string_argument(&arguments, "load_sinopia", "resource_url")?;
        match self.source.fetch_text(&url).await {
            Ok(text) => Ok(Dispatch::Text(text)),
            Err(failure) => Ok(Dispatch::Text(failure.to_string())),
        }
    }
}
