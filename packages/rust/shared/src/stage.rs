//! Stage capability model: per-document vs batch-scoped transforms.
//!
//! The pipeline dispatches on [`Stage`]'s two variants explicitly rather
//! than inspecting concrete types at runtime. Per-document stages have no
//! shared mutable state across records; batch stages see a whole
//! sub-batch at once.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::ProcessingRecord;

// ---------------------------------------------------------------------------
// StagePhase
// ---------------------------------------------------------------------------

/// Logical phase a stage belongs to, for grouping and introspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StagePhase {
    Cleaning,
    Tokenization,
    QualityAssessment,
    Filtering,
    Deduplication,
}

impl std::fmt::Display for StagePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Cleaning => "cleaning",
            Self::Tokenization => "tokenization",
            Self::QualityAssessment => "quality_assessment",
            Self::Filtering => "filtering",
            Self::Deduplication => "deduplication",
        };
        write!(f, "{name}")
    }
}

// ---------------------------------------------------------------------------
// Dispositions
// ---------------------------------------------------------------------------

/// What a per-document stage decided about the record it just processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Keep the record and continue with later stages.
    Retain,
    /// Remove the record from the output set (filter configured to drop).
    Drop,
}

// ---------------------------------------------------------------------------
// Stage traits
// ---------------------------------------------------------------------------

/// A transform applied to one record at a time.
///
/// Implementations mutate the record in place and append exactly one
/// `processing_history` entry per application. Records are independent:
/// implementations must be safe to run concurrently over different
/// records (`Send + Sync`, no interior mutability across calls).
pub trait DocumentStage: Send + Sync {
    /// Stable stage name, used as the history entry.
    fn name(&self) -> &'static str;

    /// Logical phase for grouping.
    fn phase(&self) -> StagePhase;

    /// Apply the stage to a single record.
    fn apply(&self, record: &mut ProcessingRecord) -> Result<Disposition>;
}

/// A transform that needs visibility over an entire batch at once.
///
/// State built up during one `apply_batch` call (e.g., uniques seen so
/// far) is scoped to that call; there is no cross-batch memory.
pub trait BatchStage: Send + Sync {
    /// Stable stage name, used as the history entry.
    fn name(&self) -> &'static str;

    /// Logical phase for grouping.
    fn phase(&self) -> StagePhase;

    /// Apply the stage to a whole batch, returning the surviving records.
    fn apply_batch(&self, batch: Vec<ProcessingRecord>) -> Result<Vec<ProcessingRecord>>;
}

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// A pipeline stage, tagged by capability.
pub enum Stage {
    /// Independent per-record transform.
    Document(Box<dyn DocumentStage>),
    /// Batch-scoped transform (deduplication).
    Batch(Box<dyn BatchStage>),
}

impl Stage {
    /// Stable stage name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Document(s) => s.name(),
            Self::Batch(s) => s.name(),
        }
    }

    /// Logical phase.
    pub fn phase(&self) -> StagePhase {
        match self {
            Self::Document(s) => s.phase(),
            Self::Batch(s) => s.phase(),
        }
    }

    /// Whether this stage operates per document.
    pub fn is_document(&self) -> bool {
        matches!(self, Self::Document(_))
    }
}

impl std::fmt::Debug for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Document(s) => write!(f, "Stage::Document({})", s.name()),
            Self::Batch(s) => write!(f, "Stage::Batch({})", s.name()),
        }
    }
}
