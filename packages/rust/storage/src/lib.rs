//! Corpus persistence for LexForge.
//!
//! Writes processed records as JSONL plus a `manifest.json` describing
//! the run. Persistence here is deliberately flat-file: indexing,
//! versioning, and durability guarantees belong to downstream systems.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use lexforge_shared::{
    CURRENT_SCHEMA_VERSION, LexForgeError, ProcessingRecord, Result, RunId,
};

/// File name for the corpus records.
const CORPUS_FILE_NAME: &str = "corpus.jsonl";

/// File name for the run manifest.
const MANIFEST_FILE_NAME: &str = "manifest.json";

// ---------------------------------------------------------------------------
// RunManifest
// ---------------------------------------------------------------------------

/// Aggregate counts for one pipeline run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunCounts {
    /// Documents collected from the input source.
    pub collected: usize,
    /// Records in the final corpus output.
    pub kept: usize,
    /// Records flagged (but kept) by the content filter.
    pub flagged: usize,
    /// Records removed as duplicates.
    pub duplicates_removed: usize,
    /// Records dropped by a filter configured to drop.
    pub dropped: usize,
    /// Records that failed a stage and were isolated.
    pub failed: usize,
}

/// The `manifest.json` structure stored next to the corpus output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    /// Schema version for forward compatibility.
    pub schema_version: u32,
    /// Unique identifier for this run.
    pub run_id: RunId,
    /// When the run completed.
    pub created_at: DateTime<Utc>,
    /// Tool version that produced this corpus.
    pub tool_version: String,
    /// Source name the documents came from.
    pub source: String,
    /// Input path the documents came from.
    pub input_path: String,
    /// Stage names applied, in pipeline order.
    pub stage_names: Vec<String>,
    /// Aggregate counts.
    pub counts: RunCounts,
}

// ---------------------------------------------------------------------------
// CorpusWriter
// ---------------------------------------------------------------------------

/// Writes a run's corpus and manifest under one output directory.
pub struct CorpusWriter {
    output_dir: PathBuf,
}

impl CorpusWriter {
    /// Create a writer, ensuring the output directory exists.
    pub fn create(output_dir: impl Into<PathBuf>) -> Result<Self> {
        let output_dir = output_dir.into();
        std::fs::create_dir_all(&output_dir).map_err(|e| LexForgeError::io(&output_dir, e))?;
        Ok(Self { output_dir })
    }

    /// The directory this writer targets.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Write records as JSONL. Returns the corpus file path.
    pub fn write_corpus(&self, records: &[ProcessingRecord]) -> Result<PathBuf> {
        let path = self.output_dir.join(CORPUS_FILE_NAME);
        let file = File::create(&path).map_err(|e| LexForgeError::io(&path, e))?;
        let mut writer = BufWriter::new(file);

        for record in records {
            let line = serde_json::to_string(record)
                .map_err(|e| LexForgeError::Storage(format!("serialize record {}: {e}", record.id)))?;
            writer
                .write_all(line.as_bytes())
                .and_then(|_| writer.write_all(b"\n"))
                .map_err(|e| LexForgeError::io(&path, e))?;
        }
        writer.flush().map_err(|e| LexForgeError::io(&path, e))?;

        info!(
            path = %path.display(),
            records = records.len(),
            "corpus written"
        );
        Ok(path)
    }

    /// Write the run manifest. Returns the manifest file path.
    pub fn write_manifest(&self, manifest: &RunManifest) -> Result<PathBuf> {
        let path = self.output_dir.join(MANIFEST_FILE_NAME);
        let json = serde_json::to_string_pretty(manifest)
            .map_err(|e| LexForgeError::Storage(format!("serialize manifest: {e}")))?;
        std::fs::write(&path, json).map_err(|e| LexForgeError::io(&path, e))?;

        info!(path = %path.display(), run_id = %manifest.run_id, "manifest written");
        Ok(path)
    }
}

/// Read a corpus JSONL file back into records.
pub fn read_corpus(path: &Path) -> Result<Vec<ProcessingRecord>> {
    let file = File::open(path).map_err(|e| LexForgeError::io(path, e))?;
    let reader = BufReader::new(file);

    let mut records = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| LexForgeError::io(path, e))?;
        if line.trim().is_empty() {
            continue;
        }
        let record: ProcessingRecord = serde_json::from_str(&line).map_err(|e| {
            LexForgeError::Storage(format!(
                "{}:{}: malformed record: {e}",
                path.display(),
                line_no + 1
            ))
        })?;
        records.push(record);
    }
    Ok(records)
}

/// Read a run manifest back.
pub fn read_manifest(path: &Path) -> Result<RunManifest> {
    let json = std::fs::read_to_string(path).map_err(|e| LexForgeError::io(path, e))?;
    serde_json::from_str(&json)
        .map_err(|e| LexForgeError::Storage(format!("{}: malformed manifest: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexforge_shared::RawDocument;

    fn record(id: &str, text: &str) -> ProcessingRecord {
        ProcessingRecord::from_raw(RawDocument {
            id: id.into(),
            text: text.into(),
            metadata: Default::default(),
            source: "test".into(),
            source_id: format!("t-{id}"),
        })
    }

    fn manifest() -> RunManifest {
        RunManifest {
            schema_version: CURRENT_SCHEMA_VERSION,
            run_id: RunId::new(),
            created_at: Utc::now(),
            tool_version: "0.1.0".into(),
            source: "test".into(),
            input_path: "/tmp/input.jsonl".into(),
            stage_names: vec!["basic_text_cleaning".into(), "deduplication".into()],
            counts: RunCounts {
                collected: 3,
                kept: 2,
                ..RunCounts::default()
            },
        }
    }

    #[test]
    fn corpus_roundtrip_preserves_records() {
        let dir = tempfile::tempdir().expect("tempdir");
        let writer = CorpusWriter::create(dir.path().join("run")).expect("create");

        let mut rec = record("a", "Some processed text.");
        rec.quality_score = Some(0.75);
        let records = vec![rec, record("b", "Another one.")];

        let path = writer.write_corpus(&records).expect("write");
        let read_back = read_corpus(&path).expect("read");

        assert_eq!(read_back.len(), 2);
        assert_eq!(read_back[0].id, "a");
        assert_eq!(read_back[0].quality_score, Some(0.75));
        assert_eq!(read_back[1].processing_history, vec!["initial_import"]);
    }

    #[test]
    fn manifest_roundtrip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let writer = CorpusWriter::create(dir.path().join("run")).expect("create");

        let manifest = manifest();
        let path = writer.write_manifest(&manifest).expect("write");
        let read_back = read_manifest(&path).expect("read");

        assert_eq!(read_back.schema_version, CURRENT_SCHEMA_VERSION);
        assert_eq!(read_back.run_id, manifest.run_id);
        assert_eq!(read_back.counts.collected, 3);
        assert_eq!(read_back.stage_names.len(), 2);
    }

    #[test]
    fn create_makes_nested_directories() {
        let dir = tempfile::tempdir().expect("tempdir");
        let nested = dir.path().join("a").join("b").join("c");
        let writer = CorpusWriter::create(&nested).expect("create");
        assert!(writer.output_dir().is_dir());
    }

    #[test]
    fn read_corpus_rejects_malformed_lines() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("corpus.jsonl");
        std::fs::write(&path, "not a record\n").expect("write");
        assert!(read_corpus(&path).is_err());
    }
}
