//! Collaborator seams: history rendering, record display, MARC decoding.
//!
//! Workflows talk to their surroundings through these traits instead of
//! process-wide singletons. The CLI provides real implementations; tests use
//! the in-memory ones to assert on what a run emitted.

use std::sync::Mutex;

use crate::catalog::CatalogFailure;
use crate::error::WorkflowError;

/// Which side of the conversation a history entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryKind {
    /// Text sent toward the model.
    Prompt,
    /// Text produced by the model or a handler.
    Response,
}

/// One rendered history entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub value: String,
    pub kind: HistoryKind,
}

impl HistoryEntry {
    pub fn prompt(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            kind: HistoryKind::Prompt,
        }
    }

    pub fn response(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            kind: HistoryKind::Response,
        }
    }
}

/// Receives each prompt and response as the workflow progresses.
pub trait HistorySink: Send + Sync {
    fn record(&self, entry: HistoryEntry);
}

/// Shows created records to the user: a viewer URL on success, the
/// unmodified catalog response on failure.
pub trait RecordDisplay: Send + Sync {
    fn show(&self, url: &str);
    fn show_failure(&self, failure: &CatalogFailure);
}

/// Turns raw MARC bytes into the textual form fed to the model.
pub trait MarcDecoder: Send + Sync {
    fn decode(&self, raw: &[u8]) -> Result<String, WorkflowError>;
}

/// Sink that drops everything. Default for workflows run headless.
#[derive(Debug, Default)]
pub struct NullSink;

impl HistorySink for NullSink {
    fn record(&self, _entry: HistoryEntry) {}
}

impl RecordDisplay for NullSink {
    fn show(&self, _url: &str) {}
    fn show_failure(&self, _failure: &CatalogFailure) {}
}

/// History sink that accumulates entries for inspection.
#[derive(Debug, Default)]
pub struct MemoryHistory {
    entries: Mutex<Vec<HistoryEntry>>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.entries.lock().unwrap().clone()
    }
}

impl HistorySink for MemoryHistory {
    fn record(&self, entry: HistoryEntry) {
        self.entries.lock().unwrap().push(entry);
    }
}

/// Display that remembers what it was asked to show.
#[derive(Debug, Default)]
pub struct MemoryDisplay {
    shown: Mutex<Vec<String>>,
    failures: Mutex<Vec<CatalogFailure>>,
}

impl MemoryDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shown(&self) -> Vec<String> {
        self.shown.lock().unwrap().clone()
    }

    pub fn failures(&self) -> Vec<CatalogFailure> {
        self.failures.lock().unwrap().clone()
    }
}

impl RecordDisplay for MemoryDisplay {
    fn show(&self, url: &str) {
        self.shown.lock().unwrap().push(url.to_owned());
    }

    fn show_failure(&self, failure: &CatalogFailure) {
        self.failures.lock().unwrap().push(failure.clone());
    }
}

/// Decoder for the plain-text MARC exports the catalog tools emit. Real
/// binary MARC support would slot in behind the same trait.
#[derive(Debug, Default)]
pub struct TextMarcDecoder;

impl MarcDecoder for TextMarcDecoder {
    fn decode(&self, raw: &[u8]) -> Result<String, WorkflowError> {
        String::from_utf8(raw.to_vec())
            .map_err(|err| WorkflowError::ExecutionFailed(format!("MARC input not UTF-8: {err}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: Memory sinks retain entries in the order recorded.
    #[test]
    fn memory_history_preserves_order() {
        let history = MemoryHistory::new();
        history.record(HistoryEntry::prompt("describe the book"));
        history.record(HistoryEntry::response("{\"title\": \"Beloved\"}"));
        let entries = history.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].kind, HistoryKind::Prompt);
        assert_eq!(entries[1].kind, HistoryKind::Response);
    }

    /// **Scenario**: The text decoder passes UTF-8 through and rejects other bytes.
    #[test]
    fn text_marc_decoder_requires_utf8() {
        let decoder = TextMarcDecoder;
        assert_eq!(decoder.decode(b"=245 10$aBeloved").unwrap(), "=245 10$aBeloved");
        assert!(decoder.decode(&[0xff, 0xfe]).is_err());
    }
}
