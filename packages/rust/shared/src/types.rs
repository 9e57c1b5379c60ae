//! Core domain types for the LexForge processing pipeline.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Current schema version for serialized corpus output.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// History entry recorded when a record is first created from a raw document.
pub const INITIAL_IMPORT_STEP: &str = "initial_import";

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for pipeline run identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RunId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// RawDocument
// ---------------------------------------------------------------------------

/// A single document as delivered by a collection source.
///
/// Raw documents are immutable inputs: the pipeline copies what it needs
/// into a [`ProcessingRecord`] and never writes back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawDocument {
    /// Stable document identifier.
    pub id: String,
    /// Full text content.
    pub text: String,
    /// Source-supplied metadata, preserved verbatim.
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
    /// Origin name (e.g., a dataset or collection name).
    pub source: String,
    /// Origin-local identifier within that source.
    pub source_id: String,
}

// ---------------------------------------------------------------------------
// ProcessingRecord
// ---------------------------------------------------------------------------

/// The mutable unit threaded through pipeline stages.
///
/// Created from exactly one [`RawDocument`]; `id`, `source`, and
/// `source_id` stay fixed for the record's whole life. This struct is also
/// the stable serialized projection handed to storage — the field set is
/// the storage contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingRecord {
    /// Stable document identifier, copied from the raw document.
    pub id: String,
    /// Origin name, copied from the raw document.
    pub source: String,
    /// Origin-local identifier, copied from the raw document.
    pub source_id: String,

    /// Working text, rewritten in place by normalization stages.
    pub text: String,

    /// Token sequence, set once by a tokenization stage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens: Option<Vec<String>>,
    /// Token count matching `tokens`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_count: Option<usize>,

    /// Composite quality score, set by a quality scoring stage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_score: Option<f64>,
    /// Individual quality sub-metrics.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub quality_metrics: BTreeMap<String, f64>,

    /// Per-stage side-channel data (filter verdicts, duplicate flags,
    /// extracted sentences, ...).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub processing_metadata: BTreeMap<String, Value>,
    /// Verbatim copy of the raw document's metadata. Never mutated.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub original_metadata: BTreeMap<String, Value>,
    /// Derived metadata added by enrichment-style stages.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub enhanced_metadata: BTreeMap<String, Value>,

    /// Append-only list of stage names, one entry per stage applied,
    /// in execution order.
    pub processing_history: Vec<String>,
}

impl ProcessingRecord {
    /// Create a record from a raw document, seeding the history.
    pub fn from_raw(doc: RawDocument) -> Self {
        Self {
            id: doc.id,
            source: doc.source,
            source_id: doc.source_id,
            text: doc.text,
            tokens: None,
            token_count: None,
            quality_score: None,
            quality_metrics: BTreeMap::new(),
            processing_metadata: BTreeMap::new(),
            original_metadata: doc.metadata,
            enhanced_metadata: BTreeMap::new(),
            processing_history: vec![INITIAL_IMPORT_STEP.to_string()],
        }
    }

    /// Record a processing step: appends to the history and stores the
    /// step's detail under `processing_metadata[step_name]`.
    pub fn push_step(&mut self, step_name: &str, detail: Value) {
        self.processing_history.push(step_name.to_string());
        if !detail.is_null() {
            self.processing_metadata
                .insert(step_name.to_string(), detail);
        }
    }

    /// Read a named value out of `processing_metadata`.
    pub fn metadata_value(&self, key: &str) -> Option<&Value> {
        self.processing_metadata.get(key)
    }

    /// Whether a filter stage flagged this record.
    pub fn is_filtered(&self) -> bool {
        matches!(
            self.processing_metadata.get("filtered"),
            Some(Value::Bool(true))
        )
    }

    /// Whether a deduplication stage flagged this record as a duplicate.
    pub fn is_duplicate(&self) -> bool {
        matches!(
            self.processing_metadata.get("duplicate"),
            Some(Value::Bool(true))
        )
    }
}

impl From<RawDocument> for ProcessingRecord {
    fn from(doc: RawDocument) -> Self {
        Self::from_raw(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(id: &str, text: &str) -> RawDocument {
        RawDocument {
            id: id.into(),
            text: text.into(),
            metadata: BTreeMap::from([("court".to_string(), json!("scotus"))]),
            source: "test".into(),
            source_id: format!("test-{id}"),
        }
    }

    #[test]
    fn run_id_roundtrip() {
        let id = RunId::new();
        let s = id.to_string();
        let parsed: RunId = s.parse().expect("parse RunId");
        assert_eq!(id, parsed);
    }

    #[test]
    fn from_raw_seeds_history_and_preserves_metadata() {
        let record = ProcessingRecord::from_raw(raw("a", "Some text."));
        assert_eq!(record.id, "a");
        assert_eq!(record.processing_history, vec!["initial_import"]);
        assert_eq!(record.original_metadata["court"], json!("scotus"));
        assert!(record.tokens.is_none());
        assert!(record.quality_score.is_none());
    }

    #[test]
    fn push_step_appends_history_and_detail() {
        let mut record = ProcessingRecord::from_raw(raw("a", "Some text."));
        record.push_step("basic_text_cleaning", json!({"chars_removed": 3}));
        record.push_step("word_tokenization", Value::Null);

        assert_eq!(
            record.processing_history,
            vec!["initial_import", "basic_text_cleaning", "word_tokenization"]
        );
        assert_eq!(
            record.processing_metadata["basic_text_cleaning"]["chars_removed"],
            json!(3)
        );
        // Null detail records history only.
        assert!(!record.processing_metadata.contains_key("word_tokenization"));
    }

    #[test]
    fn record_serialization_roundtrip() {
        let mut record = ProcessingRecord::from_raw(raw("a", "Some text."));
        record.tokens = Some(vec!["Some".into(), "text".into(), ".".into()]);
        record.token_count = Some(3);
        record.quality_score = Some(0.82);
        record.quality_metrics.insert("length_score".into(), 1.0);

        let json = serde_json::to_string(&record).expect("serialize");
        let parsed: ProcessingRecord = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed.id, "a");
        assert_eq!(parsed.token_count, Some(3));
        assert_eq!(parsed.quality_metrics["length_score"], 1.0);
        assert_eq!(parsed.processing_history, record.processing_history);
    }

    #[test]
    fn filtered_and_duplicate_flags() {
        let mut record = ProcessingRecord::from_raw(raw("a", "Some text."));
        assert!(!record.is_filtered());
        assert!(!record.is_duplicate());

        record
            .processing_metadata
            .insert("filtered".into(), json!(true));
        record
            .processing_metadata
            .insert("duplicate".into(), json!(true));
        assert!(record.is_filtered());
        assert!(record.is_duplicate());
    }
}
