//! Catalog-service integration: record creation and vocabulary listings.
//!
//! The catalog speaks Okapi-style HTTP: every request carries the tenant and
//! token headers, record creation posts JSON to instance storage, and each
//! reference vocabulary is a paged listing under a type-specific key filtered
//! down to an allow-list of recognized names. Failures are values
//! ([`CatalogFailure`]) the caller branches on, never panics.

mod http;
mod vocab;

pub use http::{CatalogConfig, HttpCatalog};
pub use vocab::{Vocabulary, VocabularyCache};

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

/// Non-2xx or transport-level failure from the catalog service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogFailure {
    /// HTTP status, or 0 when the request never reached the server.
    pub status: u16,
    /// Response body or transport error text, unmodified.
    pub body: String,
}

impl std::fmt::Display for CatalogFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "catalog request failed ({}): {}", self.status, self.body)
    }
}

/// The four reference vocabularies a workflow resolves names against.
///
/// Each kind knows its listing endpoint, the key the entries live under in
/// the response body, and the allow-list of names worth caching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VocabularyKind {
    /// Contributor roles (Author, Editor, ...).
    ContributorTypes,
    /// Contributor name forms (Personal name, Corporate name).
    ContributorNameTypes,
    /// Identifier schemes (ISBN, OCLC, ...).
    IdentifierTypes,
    /// Resource types (text, still image, ...).
    InstanceTypes,
}

impl VocabularyKind {
    /// All kinds, in the order workflows warm them.
    pub const ALL: [VocabularyKind; 4] = [
        VocabularyKind::ContributorTypes,
        VocabularyKind::ContributorNameTypes,
        VocabularyKind::IdentifierTypes,
        VocabularyKind::InstanceTypes,
    ];

    /// Listing path relative to the catalog base, query string included.
    pub fn path(self) -> &'static str {
        match self {
            VocabularyKind::ContributorTypes => "/contributor-types?limit=500",
            VocabularyKind::ContributorNameTypes => "/contributor-name-types",
            VocabularyKind::IdentifierTypes => "/identifier-types?limit=500",
            VocabularyKind::InstanceTypes => "/instance-types?limit=500",
        }
    }

    /// Key the entry array lives under in the listing response.
    pub fn listing_key(self) -> &'static str {
        match self {
            VocabularyKind::ContributorTypes => "contributorTypes",
            VocabularyKind::ContributorNameTypes => "contributorNameTypes",
            VocabularyKind::IdentifierTypes => "identifierTypes",
            VocabularyKind::InstanceTypes => "instanceTypes",
        }
    }

    /// Names worth caching; listing entries outside this set are dropped.
    pub fn allowed(self) -> &'static [&'static str] {
        match self {
            VocabularyKind::ContributorTypes => {
                &["Actor", "Author", "Contributor", "Editor", "Narrator", "Publisher"]
            }
            VocabularyKind::ContributorNameTypes => &["Personal name", "Corporate name"],
            VocabularyKind::IdentifierTypes => {
                &["DOI", "ISBN", "LCCN", "ISSN", "OCLC", "Local identifier"]
            }
            VocabularyKind::InstanceTypes => &[
                "text",
                "still image",
                "computer program",
                "computer dataset",
                "two-dimensional moving image",
                "notated music",
                "unspecified",
            ],
        }
    }
}

/// One `{name, id}` entry from a vocabulary listing.
#[derive(Debug, Clone, Deserialize)]
pub struct VocabularyEntry {
    pub name: String,
    pub id: String,
}

/// Catalog service: record persistence plus vocabulary listings.
///
/// **Interaction**: `HttpCatalog` talks to the real service; tests swap in an
/// in-memory implementation. The [`VocabularyCache`] sits on top of
/// `fetch_vocabulary` and adds the once-per-workflow memoization.
#[async_trait]
pub trait CatalogService: Send + Sync {
    /// Persist `record` and return the viewer URL for the created instance.
    async fn create_instance(&self, record: &Value) -> Result<String, CatalogFailure>;

    /// Fetch one vocabulary listing, already filtered to the kind's
    /// allow-list, as a name to id mapping.
    async fn fetch_vocabulary(
        &self,
        kind: VocabularyKind,
    ) -> Result<HashMap<String, String>, CatalogFailure>;
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: Every kind carries a listing key matching its path segment
    /// and a non-empty allow-list.
    #[test]
    fn kinds_are_fully_described() {
        for kind in VocabularyKind::ALL {
            assert!(kind.path().starts_with('/'));
            assert!(!kind.listing_key().is_empty());
            assert!(!kind.allowed().is_empty());
        }
        assert_eq!(VocabularyKind::InstanceTypes.allowed().len(), 7);
        assert!(VocabularyKind::IdentifierTypes.allowed().contains(&"OCLC"));
    }
}
