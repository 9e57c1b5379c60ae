//! The pipeline orchestrator: sequences per-document and batch stages
//! over single documents or whole batches.

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use lexforge_cleaning::{
    CharNormalizer, CleanOptions, LegalCleanOptions, LegalCleaner, NormalizeOptions, TextCleaner,
};
use lexforge_dedupe::{DedupeOptions, Deduplicator};
use lexforge_quality::{ContentFilter, FilterOptions, QualityOptions, QualityScorer};
use lexforge_shared::{
    Disposition, LexForgeError, ProcessingRecord, RawDocument, Result, Stage, StagePhase,
};
use lexforge_tokenize::{
    LegalTokenizeOptions, LegalTokenizer, SentenceOptions, SentenceSplitter, WordOptions,
    WordSplitter,
};

// ---------------------------------------------------------------------------
// DocumentInput
// ---------------------------------------------------------------------------

/// Pipeline input: a fresh raw document, or an existing record being
/// resumed mid-pipeline.
#[derive(Debug, Clone)]
pub enum DocumentInput {
    Raw(RawDocument),
    Record(ProcessingRecord),
}

impl From<RawDocument> for DocumentInput {
    fn from(doc: RawDocument) -> Self {
        Self::Raw(doc)
    }
}

impl From<ProcessingRecord> for DocumentInput {
    fn from(record: ProcessingRecord) -> Self {
        Self::Record(record)
    }
}

impl DocumentInput {
    fn into_record(self) -> ProcessingRecord {
        match self {
            Self::Raw(doc) => ProcessingRecord::from_raw(doc),
            Self::Record(record) => record,
        }
    }
}

// ---------------------------------------------------------------------------
// BatchOutput
// ---------------------------------------------------------------------------

/// Result of a `process_batch` call.
#[derive(Debug, Default)]
pub struct BatchOutput {
    /// Surviving records, in input order.
    pub records: Vec<ProcessingRecord>,
    /// Records isolated after a stage error, annotated with the error.
    /// They skipped all stages after the failing one.
    pub failed: Vec<ProcessingRecord>,
    /// Records removed by a filter stage configured to drop.
    pub dropped: usize,
    /// Records removed by batch stages (duplicate elimination).
    pub duplicates_removed: usize,
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// An ordered list of stages applied to documents or batches.
pub struct Pipeline {
    stages: Vec<Stage>,
    parallel: bool,
}

impl Pipeline {
    /// Build a pipeline from stages. Fails on an empty stage list.
    pub fn new(stages: Vec<Stage>) -> Result<Self> {
        if stages.is_empty() {
            return Err(LexForgeError::validation(
                "pipeline must have at least one stage",
            ));
        }
        Ok(Self {
            stages,
            parallel: false,
        })
    }

    /// Run per-document stages on a rayon worker pool during
    /// `process_batch`. Batch stages always run serialized.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Stage names in pipeline order.
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(Stage::name).collect()
    }

    /// Distinct phases in first-appearance order.
    pub fn phases(&self) -> Vec<StagePhase> {
        let mut phases = Vec::new();
        for stage in &self.stages {
            let phase = stage.phase();
            if !phases.contains(&phase) {
                phases.push(phase);
            }
        }
        phases
    }

    /// Process a single document through all per-document stages.
    ///
    /// Batch stages are skipped: a single document has no batch to be
    /// deduplicated against. Returns `None` when a stage dropped the
    /// record.
    pub fn process_document(
        &self,
        input: impl Into<DocumentInput>,
    ) -> Result<Option<ProcessingRecord>> {
        let mut record = input.into().into_record();

        for stage in &self.stages {
            match stage {
                Stage::Document(s) => {
                    if s.apply(&mut record)? == Disposition::Drop {
                        debug!(id = %record.id, stage = s.name(), "record dropped");
                        return Ok(None);
                    }
                }
                Stage::Batch(s) => {
                    debug!(
                        stage = s.name(),
                        "skipping batch stage for single-document call"
                    );
                }
            }
        }

        Ok(Some(record))
    }

    /// Process a batch through all stages in order.
    ///
    /// Batch stages partition the current batch into sub-batches of
    /// `batch_size` and apply to each independently — batch-scoped state
    /// resets at every sub-batch boundary. A stage error on one record
    /// isolates that record without aborting its siblings.
    pub fn process_batch(
        &self,
        inputs: Vec<DocumentInput>,
        batch_size: usize,
    ) -> Result<BatchOutput> {
        if batch_size == 0 {
            return Err(LexForgeError::validation("batch_size must be at least 1"));
        }

        let mut output = BatchOutput::default();
        let mut batch: Vec<ProcessingRecord> =
            inputs.into_iter().map(DocumentInput::into_record).collect();

        for stage in &self.stages {
            match stage {
                Stage::Document(s) => {
                    let (kept, dropped) =
                        self.apply_document_stage(s.as_ref(), batch, &mut output.failed);
                    batch = kept;
                    output.dropped += dropped;
                }
                Stage::Batch(s) => {
                    let before = batch.len();
                    let mut survivors = Vec::with_capacity(before);
                    for sub_batch in chunked(batch, batch_size) {
                        survivors.extend(s.apply_batch(sub_batch)?);
                    }
                    batch = survivors;
                    output.duplicates_removed += before - batch.len();
                }
            }
        }

        output.records = batch;
        Ok(output)
    }

    /// Map one document stage over the batch, isolating per-record
    /// failures. Returns surviving records (input order) and the count of
    /// records the stage dropped.
    fn apply_document_stage(
        &self,
        stage: &dyn lexforge_shared::DocumentStage,
        batch: Vec<ProcessingRecord>,
        failed: &mut Vec<ProcessingRecord>,
    ) -> (Vec<ProcessingRecord>, usize) {
        enum Applied {
            Kept(ProcessingRecord),
            Dropped,
            Failed(ProcessingRecord),
        }

        let apply_one = |mut record: ProcessingRecord| match stage.apply(&mut record) {
            Ok(Disposition::Retain) => Applied::Kept(record),
            Ok(Disposition::Drop) => Applied::Dropped,
            Err(e) => {
                warn!(
                    id = %record.id,
                    stage = stage.name(),
                    error = %e,
                    "stage failed for record, isolating it"
                );
                record
                    .processing_metadata
                    .insert("error".into(), json!(e.to_string()));
                Applied::Failed(record)
            }
        };

        let applied: Vec<Applied> = if self.parallel {
            use rayon::prelude::*;
            batch.into_par_iter().map(apply_one).collect()
        } else {
            batch.into_iter().map(apply_one).collect()
        };

        let mut kept = Vec::with_capacity(applied.len());
        let mut dropped = 0usize;
        for outcome in applied {
            match outcome {
                Applied::Kept(record) => kept.push(record),
                Applied::Dropped => dropped += 1,
                Applied::Failed(record) => failed.push(record),
            }
        }
        (kept, dropped)
    }
}

/// Split `items` into owned chunks of at most `size`.
fn chunked(items: Vec<ProcessingRecord>, size: usize) -> Vec<Vec<ProcessingRecord>> {
    let mut chunks = Vec::new();
    let mut current = Vec::with_capacity(size.min(items.len()));
    for item in items {
        current.push(item);
        if current.len() == size {
            chunks.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

// ---------------------------------------------------------------------------
// PipelineConfig
// ---------------------------------------------------------------------------

/// A stage section in the pipeline config: an enabled flag plus the
/// stage's own options, flattened.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageToggle<T> {
    /// Whether the stage participates in the pipeline. Writing a section
    /// implies enabling it unless stated otherwise.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Stage options.
    #[serde(flatten)]
    pub options: T,
}

fn default_enabled() -> bool {
    true
}

impl<T: Default> Default for StageToggle<T> {
    fn default() -> Self {
        Self {
            enabled: true,
            options: T::default(),
        }
    }
}

impl<T: Default> StageToggle<T> {
    /// A disabled section with default options.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            options: T::default(),
        }
    }
}

/// Declarative pipeline configuration, deserializable from TOML/JSON.
///
/// Stage order is fixed: cleaning (generic, legal, character), sentence
/// and word tokenization, legal tokenization (when enabled, it runs after
/// the word splitter so its entity-preserving tokens win), quality
/// scoring, filtering, deduplication. The default configuration is the
/// standard legal-corpus lineup with the legal tokenizer disabled.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Run per-document stages on a worker pool.
    pub parallel: bool,
    pub clean: StageToggle<CleanOptions>,
    pub legal_clean: StageToggle<LegalCleanOptions>,
    pub normalize: StageToggle<NormalizeOptions>,
    pub sentences: StageToggle<SentenceOptions>,
    pub words: StageToggle<WordOptions>,
    pub legal_tokens: StageToggle<LegalTokenizeOptions>,
    pub quality: StageToggle<QualityOptions>,
    pub filter: StageToggle<FilterOptions>,
    pub dedupe: StageToggle<DedupeOptions>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            parallel: false,
            clean: StageToggle::default(),
            legal_clean: StageToggle::default(),
            normalize: StageToggle {
                enabled: true,
                options: NormalizeOptions {
                    normalize_ampersands: false,
                    ..NormalizeOptions::default()
                },
            },
            sentences: StageToggle::default(),
            words: StageToggle::default(),
            legal_tokens: StageToggle::disabled(),
            quality: StageToggle::default(),
            filter: StageToggle::default(),
            dedupe: StageToggle::default(),
        }
    }
}

impl PipelineConfig {
    /// Build the configured pipeline. All stage construction (pattern
    /// compilation, threshold/weight validation) happens here, before any
    /// document is touched.
    pub fn build(&self) -> Result<Pipeline> {
        let mut stages: Vec<Stage> = Vec::new();

        if self.clean.enabled {
            stages.push(Stage::Document(Box::new(TextCleaner::new(
                self.clean.options.clone(),
            )?)));
        }
        if self.legal_clean.enabled {
            stages.push(Stage::Document(Box::new(LegalCleaner::new(
                self.legal_clean.options.clone(),
            ))));
        }
        if self.normalize.enabled {
            stages.push(Stage::Document(Box::new(CharNormalizer::new(
                self.normalize.options.clone(),
            ))));
        }
        if self.sentences.enabled {
            stages.push(Stage::Document(Box::new(SentenceSplitter::new(
                self.sentences.options.clone(),
            ))));
        }
        if self.words.enabled {
            stages.push(Stage::Document(Box::new(WordSplitter::new(
                self.words.options.clone(),
            ))));
        }
        if self.legal_tokens.enabled {
            stages.push(Stage::Document(Box::new(LegalTokenizer::new(
                self.legal_tokens.options.clone(),
            ))));
        }
        if self.quality.enabled {
            stages.push(Stage::Document(Box::new(QualityScorer::new(
                self.quality.options.clone(),
            )?)));
        }
        if self.filter.enabled {
            stages.push(Stage::Document(Box::new(ContentFilter::new(
                self.filter.options.clone(),
            )?)));
        }
        if self.dedupe.enabled {
            stages.push(Stage::Batch(Box::new(Deduplicator::new(
                self.dedupe.options.clone(),
            )?)));
        }

        Ok(Pipeline::new(stages)?.with_parallelism(self.parallel))
    }
}

/// The standard legal-corpus pipeline with default options.
pub fn default_pipeline() -> Pipeline {
    PipelineConfig::default()
        .build()
        .expect("default pipeline config is valid")
}
