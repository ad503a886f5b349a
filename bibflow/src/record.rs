//! In-place rewriting of extracted records before persistence.
//!
//! The model emits records with human-readable type names; the catalog wants
//! vocabulary identifiers. [`RecordTransformer::update`] swaps names for ids
//! using the four cached vocabularies. The pass is idempotent: a field is
//! only rewritten when its name form is still present, so applying the
//! transform to an already-updated record changes nothing.

use std::sync::Arc;

use serde_json::Value;

use crate::catalog::{Vocabulary, VocabularyCache, VocabularyKind};

/// Default contributor role when a contributor declares no type text.
const DEFAULT_CONTRIBUTOR_TYPE: &str = "Contributor";
/// Name form assigned to every contributor.
const DEFAULT_NAME_TYPE: &str = "Personal name";
/// Resource type used when the record carries no instanceTypeId and the
/// workflow declares no more specific default.
const DEFAULT_INSTANCE_TYPE: &str = "unspecified";

/// Record rewriter bound to one workflow's vocabularies.
pub struct RecordTransformer {
    contributor_types: Arc<Vocabulary>,
    contributor_name_types: Arc<Vocabulary>,
    identifier_types: Arc<Vocabulary>,
    instance_types: Arc<Vocabulary>,
    instance_type_default: String,
}

impl RecordTransformer {
    /// Builds a transformer from a warmed (or lazily warming) cache.
    pub async fn from_cache(cache: &VocabularyCache) -> Self {
        Self {
            contributor_types: cache.get(VocabularyKind::ContributorTypes).await,
            contributor_name_types: cache.get(VocabularyKind::ContributorNameTypes).await,
            identifier_types: cache.get(VocabularyKind::IdentifierTypes).await,
            instance_types: cache.get(VocabularyKind::InstanceTypes).await,
            instance_type_default: DEFAULT_INSTANCE_TYPE.to_owned(),
        }
    }

    /// Overrides the resource-type key used when a record declares none.
    /// MARC conversion uses "text"; the other workflows keep "unspecified".
    pub fn with_instance_type_default(mut self, key: impl Into<String>) -> Self {
        self.instance_type_default = key.into();
        self
    }

    /// Rewrites `record` in place: resource type, identifiers, contributors.
    ///
    /// Missing vocabulary entries leave the id field absent rather than
    /// failing; the catalog rejects incomplete records on its own terms.
    pub fn update(&self, record: &mut Value) {
        self.set_instance_type(record);
        self.rewrite_identifiers(record);
        self.rewrite_contributors(record);
    }

    /// Sets instanceTypeId to the default resource type, only when the record
    /// does not already carry one. An existing id (from a prior pass or a
    /// more specific extraction) is never clobbered.
    fn set_instance_type(&self, record: &mut Value) {
        let Some(object) = record.as_object_mut() else {
            return;
        };
        if object.contains_key("instanceTypeId") {
            return;
        }
        if let Some(id) = self.instance_types.get(&self.instance_type_default) {
            object.insert("instanceTypeId".to_owned(), Value::String(id.to_owned()));
        }
    }

    /// Replaces each identifier's type name with its vocabulary id. Names
    /// beginning with "OCLC" in any case normalize to the canonical key
    /// "OCLC". Entries whose name form was already removed are untouched.
    fn rewrite_identifiers(&self, record: &mut Value) {
        let Some(identifiers) = record.get_mut("identifiers").and_then(Value::as_array_mut)
        else {
            return;
        };
        for identifier in identifiers {
            let Some(entry) = identifier.as_object_mut() else {
                continue;
            };
            let Some(name_value) = entry.remove("identifierTypeName") else {
                continue;
            };
            let mut name = name_value.as_str().unwrap_or_default().to_owned();
            if name.to_uppercase().starts_with("OCLC") {
                name = "OCLC".to_owned();
            }
            if let Some(id) = self.identifier_types.get(&name) {
                entry.insert("identifierTypeId".to_owned(), Value::String(id.to_owned()));
            }
        }
    }

    /// Resolves each contributor's role and name-form ids. The declared type
    /// text stays on the entry, so re-resolution yields the same ids.
    fn rewrite_contributors(&self, record: &mut Value) {
        let Some(contributors) = record.get_mut("contributors").and_then(Value::as_array_mut)
        else {
            return;
        };
        for contributor in contributors {
            let Some(entry) = contributor.as_object_mut() else {
                continue;
            };
            let type_text = entry
                .get("contributorTypeText")
                .and_then(Value::as_str)
                .unwrap_or(DEFAULT_CONTRIBUTOR_TYPE)
                .to_owned();
            let role_id = self
                .contributor_types
                .get(&type_text)
                .or_else(|| self.contributor_types.get(DEFAULT_CONTRIBUTOR_TYPE));
            if let Some(id) = role_id {
                entry.insert(
                    "contributorTypeId".to_owned(),
                    Value::String(id.to_owned()),
                );
            }
            if let Some(id) = self.contributor_name_types.get(DEFAULT_NAME_TYPE) {
                entry.insert(
                    "contributorNameTypeId".to_owned(),
                    Value::String(id.to_owned()),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vocabulary(pairs: &[(&str, &str)]) -> Arc<Vocabulary> {
        let entries: HashMap<String, String> = pairs
            .iter()
            .map(|(name, id)| ((*name).to_owned(), (*id).to_owned()))
            .collect();
        Arc::new(Vocabulary::new(entries))
    }

    fn transformer() -> RecordTransformer {
        RecordTransformer {
            contributor_types: vocabulary(&[
                ("Author", "ct-author"),
                ("Contributor", "ct-contributor"),
            ]),
            contributor_name_types: vocabulary(&[("Personal name", "nt-personal")]),
            identifier_types: vocabulary(&[("OCLC", "it-oclc"), ("ISBN", "it-isbn")]),
            instance_types: vocabulary(&[("unspecified", "rt-unspecified"), ("text", "rt-text")]),
            instance_type_default: DEFAULT_INSTANCE_TYPE.to_owned(),
        }
    }

    /// **Scenario**: Identifier names with any OCLC prefix casing normalize to
    /// the canonical key and the name field is removed.
    #[test]
    fn oclc_prefixes_normalize() {
        let transformer = transformer();
        let mut record = serde_json::json!({
            "identifiers": [
                {"identifierTypeName": "OCLC-M", "value": "12030243"},
                {"identifierTypeName": "oclc-i", "value": "99"}
            ]
        });
        transformer.update(&mut record);
        for identifier in record["identifiers"].as_array().unwrap() {
            assert!(identifier.get("identifierTypeName").is_none());
            assert_eq!(identifier["identifierTypeId"], "it-oclc");
        }
        assert_eq!(record["identifiers"][0]["value"], "12030243");
    }

    /// **Scenario**: An identifier name absent from the vocabulary loses its
    /// name field and gains no id, without failing.
    #[test]
    fn unknown_identifier_name_resolves_to_absent() {
        let transformer = transformer();
        let mut record = serde_json::json!({
            "identifiers": [{"identifierTypeName": "Mystery", "value": "1"}]
        });
        transformer.update(&mut record);
        let identifier = &record["identifiers"][0];
        assert!(identifier.get("identifierTypeName").is_none());
        assert!(identifier.get("identifierTypeId").is_none());
    }

    /// **Scenario**: Contributors resolve their declared role, default to
    /// Contributor when none is declared, and always get the personal name form.
    #[test]
    fn contributors_resolve_role_and_name_form() {
        let transformer = transformer();
        let mut record = serde_json::json!({
            "contributors": [
                {"name": "Morrison, Toni", "contributorTypeText": "Author"},
                {"name": "Anonymous"}
            ]
        });
        transformer.update(&mut record);
        assert_eq!(record["contributors"][0]["contributorTypeId"], "ct-author");
        assert_eq!(record["contributors"][1]["contributorTypeId"], "ct-contributor");
        assert_eq!(record["contributors"][0]["contributorNameTypeId"], "nt-personal");
    }

    /// **Scenario**: A second update of an already-updated record is a no-op,
    /// including an instanceTypeId that must not be clobbered.
    #[test]
    fn update_is_idempotent() {
        let transformer = transformer();
        let mut record = serde_json::json!({
            "title": "Beloved",
            "instanceTypeId": "rt-specific",
            "identifiers": [{"identifierTypeName": "ISBN", "value": "9781400033416"}],
            "contributors": [{"name": "Morrison, Toni", "contributorTypeText": "Author"}]
        });
        transformer.update(&mut record);
        let once = record.clone();
        transformer.update(&mut record);
        assert_eq!(record, once);
        assert_eq!(record["instanceTypeId"], "rt-specific");
    }

    /// **Scenario**: A record with no instanceTypeId gets the default resource
    /// type id.
    #[test]
    fn missing_instance_type_defaults_to_unspecified() {
        let transformer = transformer();
        let mut record = serde_json::json!({"title": "Beloved"});
        transformer.update(&mut record);
        assert_eq!(record["instanceTypeId"], "rt-unspecified");
    }

    /// **Scenario**: A workflow-specific default key ("text") takes effect
    /// when configured.
    #[test]
    fn instance_type_default_is_configurable() {
        let transformer = transformer().with_instance_type_default("text");
        let mut record = serde_json::json!({"title": "Understanding data"});
        transformer.update(&mut record);
        assert_eq!(record["instanceTypeId"], "rt-text");
    }
}
