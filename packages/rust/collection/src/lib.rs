//! Local document acquisition for LexForge.
//!
//! Thin collaborators that read raw documents from local JSONL or CSV
//! files and hand them to the processing core. Malformed lines and rows
//! are skipped with a warning rather than failing the whole collection.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use lexforge_shared::{LexForgeError, RawDocument, Result};

// ---------------------------------------------------------------------------
// SourceFormat
// ---------------------------------------------------------------------------

/// Supported local input formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Jsonl,
    Csv,
}

impl std::str::FromStr for SourceFormat {
    type Err = LexForgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "jsonl" => Ok(Self::Jsonl),
            "csv" => Ok(Self::Csv),
            other => Err(LexForgeError::config(format!(
                "unsupported input format '{other}' (expected jsonl or csv)"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// DocumentSource
// ---------------------------------------------------------------------------

/// Description of a source, for logging and manifests.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SourceInfo {
    /// Source name carried into `RawDocument::source`.
    pub name: String,
    /// Input format.
    pub format: SourceFormat,
    /// File path the documents came from.
    pub path: PathBuf,
}

/// A finite local supplier of raw documents.
pub trait DocumentSource {
    /// Read up to `limit` documents (all when `None`).
    fn collect(&self, limit: Option<usize>) -> Result<Vec<RawDocument>>;

    /// Describe this source.
    fn describe(&self) -> SourceInfo;
}

/// Open a source for the given format and path.
pub fn open_source(
    format: SourceFormat,
    path: impl Into<PathBuf>,
    source_name: impl Into<String>,
) -> Box<dyn DocumentSource> {
    let path = path.into();
    let name = source_name.into();
    match format {
        SourceFormat::Jsonl => Box::new(JsonlSource::new(path, name)),
        SourceFormat::Csv => Box::new(CsvSource::new(path, name)),
    }
}

// ---------------------------------------------------------------------------
// JsonlSource
// ---------------------------------------------------------------------------

/// One JSON object per line. The `text` field is required; `id` falls
/// back to a generated UUID v7; every other field becomes metadata.
pub struct JsonlSource {
    path: PathBuf,
    source_name: String,
    /// Field holding the document text.
    pub text_field: String,
    /// Field holding the document id.
    pub id_field: String,
}

impl JsonlSource {
    pub fn new(path: impl Into<PathBuf>, source_name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            source_name: source_name.into(),
            text_field: "text".into(),
            id_field: "id".into(),
        }
    }

    fn document_from_value(&self, value: Value, line_no: usize) -> Option<RawDocument> {
        let Value::Object(map) = value else {
            warn!(line = line_no, "skipping non-object JSONL line");
            return None;
        };

        let Some(text) = map.get(self.text_field.as_str()).and_then(Value::as_str) else {
            warn!(
                line = line_no,
                field = %self.text_field,
                "skipping JSONL line without a text field"
            );
            return None;
        };
        let text = text.to_string();

        let id = map
            .get(self.id_field.as_str())
            .and_then(Value::as_str)
            .map(String::from)
            .unwrap_or_else(|| Uuid::now_v7().to_string());

        let metadata: BTreeMap<String, Value> = map
            .into_iter()
            .filter(|(key, _)| *key != self.text_field && *key != self.id_field)
            .collect();

        Some(RawDocument {
            source_id: id.clone(),
            id,
            text,
            metadata,
            source: self.source_name.clone(),
        })
    }
}

impl DocumentSource for JsonlSource {
    fn collect(&self, limit: Option<usize>) -> Result<Vec<RawDocument>> {
        let file = File::open(&self.path).map_err(|e| LexForgeError::io(&self.path, e))?;
        let reader = BufReader::new(file);

        let mut documents = Vec::new();
        let mut skipped = 0usize;

        for (line_no, line) in reader.lines().enumerate() {
            if limit.is_some_and(|max| documents.len() >= max) {
                break;
            }

            let line = line.map_err(|e| LexForgeError::io(&self.path, e))?;
            if line.trim().is_empty() {
                continue;
            }

            match serde_json::from_str::<Value>(&line) {
                Ok(value) => match self.document_from_value(value, line_no + 1) {
                    Some(doc) => documents.push(doc),
                    None => skipped += 1,
                },
                Err(e) => {
                    warn!(line = line_no + 1, error = %e, "skipping malformed JSONL line");
                    skipped += 1;
                }
            }
        }

        debug!(
            path = %self.path.display(),
            collected = documents.len(),
            skipped,
            "JSONL collection complete"
        );
        Ok(documents)
    }

    fn describe(&self) -> SourceInfo {
        SourceInfo {
            name: self.source_name.clone(),
            format: SourceFormat::Jsonl,
            path: self.path.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// CsvSource
// ---------------------------------------------------------------------------

/// Header-based CSV reader. The text column is required; the id column
/// falls back to a generated UUID v7; other columns become metadata.
pub struct CsvSource {
    path: PathBuf,
    source_name: String,
    /// Column holding the document text.
    pub text_column: String,
    /// Column holding the document id.
    pub id_column: String,
}

impl CsvSource {
    pub fn new(path: impl Into<PathBuf>, source_name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            source_name: source_name.into(),
            text_column: "text".into(),
            id_column: "id".into(),
        }
    }
}

impl DocumentSource for CsvSource {
    fn collect(&self, limit: Option<usize>) -> Result<Vec<RawDocument>> {
        let mut reader = csv::Reader::from_path(&self.path)
            .map_err(|e| LexForgeError::Collection(format!("{}: {e}", self.path.display())))?;

        let headers = reader
            .headers()
            .map_err(|e| LexForgeError::Collection(format!("{}: {e}", self.path.display())))?
            .clone();

        let text_idx = headers
            .iter()
            .position(|h| h == self.text_column)
            .ok_or_else(|| {
                LexForgeError::Collection(format!(
                    "{}: missing '{}' column",
                    self.path.display(),
                    self.text_column
                ))
            })?;
        let id_idx = headers.iter().position(|h| h == self.id_column);

        let mut documents = Vec::new();
        let mut skipped = 0usize;

        for (row_no, row) in reader.records().enumerate() {
            if limit.is_some_and(|max| documents.len() >= max) {
                break;
            }

            let row = match row {
                Ok(row) => row,
                Err(e) => {
                    warn!(row = row_no + 1, error = %e, "skipping malformed CSV row");
                    skipped += 1;
                    continue;
                }
            };

            let Some(text) = row.get(text_idx).filter(|t| !t.is_empty()) else {
                warn!(row = row_no + 1, "skipping CSV row with empty text");
                skipped += 1;
                continue;
            };

            let id = id_idx
                .and_then(|i| row.get(i))
                .filter(|v| !v.is_empty())
                .map(String::from)
                .unwrap_or_else(|| Uuid::now_v7().to_string());

            let metadata: BTreeMap<String, Value> = headers
                .iter()
                .zip(row.iter())
                .enumerate()
                .filter(|(i, _)| *i != text_idx && Some(*i) != id_idx)
                .map(|(_, (header, value))| (header.to_string(), Value::String(value.to_string())))
                .collect();

            documents.push(RawDocument {
                source_id: id.clone(),
                id,
                text: text.to_string(),
                metadata,
                source: self.source_name.clone(),
            });
        }

        debug!(
            path = %self.path.display(),
            collected = documents.len(),
            skipped,
            "CSV collection complete"
        );
        Ok(documents)
    }

    fn describe(&self) -> SourceInfo {
        SourceInfo {
            name: self.source_name.clone(),
            format: SourceFormat::Csv,
            path: self.path.clone(),
        }
    }
}
