use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;
use tracing::warn;

use super::{CatalogService, VocabularyEntry, VocabularyKind};

/// One loaded vocabulary: immutable name to id mapping.
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    entries: HashMap<String, String>,
}

impl Vocabulary {
    pub fn new(entries: HashMap<String, String>) -> Self {
        Self { entries }
    }

    /// Builds a vocabulary from a raw listing body, keeping only entries on
    /// the kind's allow-list. Rows without a name or id are skipped.
    pub fn from_listing(kind: VocabularyKind, listing: &Value) -> Self {
        let mut entries = HashMap::new();
        if let Some(rows) = listing.get(kind.listing_key()).and_then(Value::as_array) {
            for row in rows {
                if let Ok(entry) = serde_json::from_value::<VocabularyEntry>(row.clone()) {
                    if kind.allowed().contains(&entry.name.as_str()) {
                        entries.insert(entry.name, entry.id);
                    }
                }
            }
        }
        Self { entries }
    }

    /// Consumes the vocabulary, yielding its raw mapping.
    pub fn into_entries(self) -> HashMap<String, String> {
        self.entries
    }

    /// Identifier for `name`, or `None` when the name was not in the listing
    /// or not on the allow-list. Lookups never fail harder than `None`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Per-workflow vocabulary cache: each kind is fetched at most once.
///
/// A failed fetch caches an empty vocabulary instead of erroring, so one
/// unreachable listing degrades lookups to `None` rather than aborting the
/// workflow, and still honors the fetch-once contract (no retry storm on
/// every record).
pub struct VocabularyCache {
    catalog: Arc<dyn CatalogService>,
    loaded: Mutex<HashMap<VocabularyKind, Arc<Vocabulary>>>,
}

impl VocabularyCache {
    pub fn new(catalog: Arc<dyn CatalogService>) -> Self {
        Self {
            catalog,
            loaded: Mutex::new(HashMap::new()),
        }
    }

    /// The vocabulary for `kind`, fetching on first use.
    pub async fn get(&self, kind: VocabularyKind) -> Arc<Vocabulary> {
        let mut loaded = self.loaded.lock().await;
        if let Some(vocabulary) = loaded.get(&kind) {
            return Arc::clone(vocabulary);
        }
        let vocabulary = match self.catalog.fetch_vocabulary(kind).await {
            Ok(entries) => Arc::new(Vocabulary::new(entries)),
            Err(failure) => {
                warn!(kind = ?kind, status = failure.status, "vocabulary fetch failed, caching empty");
                Arc::new(Vocabulary::default())
            }
        };
        loaded.insert(kind, Arc::clone(&vocabulary));
        vocabulary
    }

    /// Warm every vocabulary up front, the way workflows do at start.
    pub async fn warm(&self) {
        for kind in VocabularyKind::ALL {
            self.get(kind).await;
        }
    }
}
