//! End-to-end run: collect → process → store.

use std::path::PathBuf;
use std::time::Instant;

use chrono::Utc;
use tracing::{info, instrument};

use lexforge_collection::{SourceFormat, open_source};
use lexforge_shared::{CURRENT_SCHEMA_VERSION, LexForgeError, Result, RunId};
use lexforge_storage::{CorpusWriter, RunCounts, RunManifest};

use crate::pipeline::{BatchOutput, DocumentInput, PipelineConfig};

/// Configuration for one end-to-end run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Input file path.
    pub input: PathBuf,
    /// Input format.
    pub format: SourceFormat,
    /// Source name recorded on every document.
    pub source_name: String,
    /// Root directory for run output; the run writes into
    /// `<output_root>/<run_id>/`.
    pub output_root: PathBuf,
    /// Sub-batch size for batch-scoped stages.
    pub batch_size: usize,
    /// Process at most this many documents.
    pub limit: Option<usize>,
    /// Pipeline configuration.
    pub pipeline: PipelineConfig,
    /// Tool version string for the manifest.
    pub tool_version: String,
}

/// Result of an end-to-end run.
#[derive(Debug)]
pub struct RunSummary {
    /// Run identifier.
    pub run_id: RunId,
    /// Aggregate counts.
    pub counts: RunCounts,
    /// Where the corpus was written.
    pub corpus_path: PathBuf,
    /// Total elapsed time.
    pub elapsed: std::time::Duration,
}

/// Progress callback for reporting run status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each batch is processed.
    fn batch_processed(&self, current: usize, total: usize);
    /// Called when the run completes.
    fn done(&self, summary: &RunSummary);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn batch_processed(&self, _current: usize, _total: usize) {}
    fn done(&self, _summary: &RunSummary) {}
}

/// Run the full pipeline over a local input file.
///
/// 1. Build the pipeline (all config validation happens here)
/// 2. Collect documents
/// 3. Process batch by batch
/// 4. Write corpus + manifest
#[instrument(skip_all, fields(input = %config.input.display()))]
pub fn run(config: &RunConfig, progress: &dyn ProgressReporter) -> Result<RunSummary> {
    let start = Instant::now();
    let run_id = RunId::new();

    // Configuration errors surface before any document is touched.
    let pipeline = config.pipeline.build()?;

    info!(%run_id, input = %config.input.display(), "starting processing run");

    // --- Phase 1: Collection ---
    progress.phase("Collecting documents");
    let source = open_source(config.format, &config.input, &config.source_name);
    let documents = source.collect(config.limit)?;

    if documents.is_empty() {
        return Err(LexForgeError::Collection(format!(
            "no documents collected from {}",
            config.input.display()
        )));
    }
    let collected = documents.len();

    // --- Phase 2: Processing ---
    progress.phase("Processing documents");
    let mut records = Vec::with_capacity(collected);
    let mut failed = Vec::new();
    let mut dropped = 0usize;
    let mut duplicates_removed = 0usize;

    let total_batches = collected.div_ceil(config.batch_size.max(1));
    let mut batch_docs = documents;
    let mut batch_no = 0usize;

    while !batch_docs.is_empty() {
        let rest = batch_docs.split_off(batch_docs.len().min(config.batch_size));
        let inputs: Vec<DocumentInput> = batch_docs.into_iter().map(Into::into).collect();
        batch_docs = rest;
        batch_no += 1;

        let BatchOutput {
            records: batch_records,
            failed: batch_failed,
            dropped: batch_dropped,
            duplicates_removed: batch_duplicates,
        } = pipeline.process_batch(inputs, config.batch_size)?;

        records.extend(batch_records);
        failed.extend(batch_failed);
        dropped += batch_dropped;
        duplicates_removed += batch_duplicates;

        progress.batch_processed(batch_no, total_batches);
    }

    let flagged = records.iter().filter(|r| r.is_filtered()).count();

    // --- Phase 3: Storage ---
    progress.phase("Writing corpus");
    let output_dir = config.output_root.join(run_id.to_string());
    let writer = CorpusWriter::create(&output_dir)?;
    let corpus_path = writer.write_corpus(&records)?;

    let counts = RunCounts {
        collected,
        kept: records.len(),
        flagged,
        duplicates_removed,
        dropped,
        failed: failed.len(),
    };

    let manifest = RunManifest {
        schema_version: CURRENT_SCHEMA_VERSION,
        run_id: run_id.clone(),
        created_at: Utc::now(),
        tool_version: config.tool_version.clone(),
        source: config.source_name.clone(),
        input_path: config.input.display().to_string(),
        stage_names: pipeline
            .stage_names()
            .into_iter()
            .map(String::from)
            .collect(),
        counts: counts.clone(),
    };
    writer.write_manifest(&manifest)?;

    let summary = RunSummary {
        run_id,
        counts,
        corpus_path,
        elapsed: start.elapsed(),
    };

    progress.done(&summary);

    info!(
        run_id = %summary.run_id,
        collected = summary.counts.collected,
        kept = summary.counts.kept,
        duplicates_removed = summary.counts.duplicates_removed,
        failed = summary.counts.failed,
        elapsed_ms = summary.elapsed.as_millis(),
        "processing run complete"
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_jsonl(dir: &std::path::Path, lines: &[&str]) -> PathBuf {
        let path = dir.join("input.jsonl");
        let mut file = std::fs::File::create(&path).expect("create input");
        for line in lines {
            writeln!(file, "{line}").expect("write line");
        }
        path
    }

    fn passing_text(i: usize) -> String {
        format!(
            "{{\"id\": \"doc-{i}\", \"text\": \"Opinion number {i} of the appellate court. \
             The panel reviewed the record in detail. It affirmed the judgment below. \
             A petition for rehearing was denied thereafter in short order.\"}}"
        )
    }

    #[test]
    fn end_to_end_jsonl_run_writes_corpus_and_manifest() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = write_jsonl(
            dir.path(),
            &[
                &passing_text(1),
                &passing_text(2),
                &passing_text(2), // exact duplicate of doc-2's line (same id and text)
            ],
        );

        let config = RunConfig {
            input,
            format: SourceFormat::Jsonl,
            source_name: "test-corpus".into(),
            output_root: dir.path().join("out"),
            batch_size: 100,
            limit: None,
            pipeline: PipelineConfig::default(),
            tool_version: "0.0.0-test".into(),
        };

        let summary = run(&config, &SilentProgress).expect("run");

        assert_eq!(summary.counts.collected, 3);
        assert_eq!(summary.counts.kept, 2);
        assert_eq!(summary.counts.duplicates_removed, 1);
        assert_eq!(summary.counts.failed, 0);

        let records = lexforge_storage::read_corpus(&summary.corpus_path).expect("read corpus");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "doc-1");
        assert!(records[0].quality_score.is_some());
        assert!(records[0].processing_history.len() > 1);

        let manifest_path = summary.corpus_path.parent().unwrap().join("manifest.json");
        let manifest = lexforge_storage::read_manifest(&manifest_path).expect("read manifest");
        assert_eq!(manifest.counts.kept, 2);
        assert!(
            manifest
                .stage_names
                .contains(&"deduplication".to_string())
        );
    }

    #[test]
    fn empty_input_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = write_jsonl(dir.path(), &[]);

        let config = RunConfig {
            input,
            format: SourceFormat::Jsonl,
            source_name: "test".into(),
            output_root: dir.path().join("out"),
            batch_size: 100,
            limit: None,
            pipeline: PipelineConfig::default(),
            tool_version: "0.0.0-test".into(),
        };

        assert!(run(&config, &SilentProgress).is_err());
    }

    #[test]
    fn limit_restricts_collection() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = write_jsonl(
            dir.path(),
            &[&passing_text(1), &passing_text(2), &passing_text(3)],
        );

        let config = RunConfig {
            input,
            format: SourceFormat::Jsonl,
            source_name: "test".into(),
            output_root: dir.path().join("out"),
            batch_size: 100,
            limit: Some(2),
            pipeline: PipelineConfig::default(),
            tool_version: "0.0.0-test".into(),
        };

        let summary = run(&config, &SilentProgress).expect("run");
        assert_eq!(summary.counts.collected, 2);
    }
}
