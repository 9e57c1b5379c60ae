//! Content filtering with ordered short-circuit checks.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use serde_json::json;

use lexforge_shared::{
    Disposition, DocumentStage, LexForgeError, ProcessingRecord, Result, StagePhase,
};

/// Options for [`ContentFilter`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterOptions {
    /// Minimum quality score to pass (checked only when a score exists).
    pub min_quality_score: f64,
    /// Minimum text length in characters.
    pub min_length: usize,
    /// Maximum text length in characters (`None` for no limit).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    /// Patterns that must each match somewhere in the text.
    pub required_patterns: Vec<String>,
    /// Patterns that must not match anywhere in the text.
    pub excluded_patterns: Vec<String>,
    /// Keep failing records (annotated) instead of dropping them.
    pub keep_document: bool,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            min_quality_score: 0.5,
            min_length: 100,
            max_length: None,
            required_patterns: Vec::new(),
            excluded_patterns: Vec::new(),
            keep_document: true,
        }
    }
}

/// Per-document content filter.
///
/// Checks run in a fixed order — length floor, length ceiling, quality
/// score, required patterns (in configured order), excluded patterns —
/// and the first failure becomes the recorded `filter_reason`. All
/// pattern matching is case-insensitive.
pub struct ContentFilter {
    options: FilterOptions,
    required: Vec<Regex>,
    excluded: Vec<Regex>,
}

impl ContentFilter {
    /// Build a filter, compiling all patterns case-insensitively.
    /// Invalid patterns are construction errors.
    pub fn new(options: FilterOptions) -> Result<Self> {
        let compile = |pattern: &str| {
            RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .map_err(|e| {
                    LexForgeError::config(format!("invalid filter pattern '{pattern}': {e}"))
                })
        };

        let required = options
            .required_patterns
            .iter()
            .map(|p| compile(p))
            .collect::<Result<Vec<_>>>()?;
        let excluded = options
            .excluded_patterns
            .iter()
            .map(|p| compile(p))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            options,
            required,
            excluded,
        })
    }

    /// Filter with default options.
    pub fn with_defaults() -> Self {
        Self::new(FilterOptions::default()).expect("default options are valid")
    }

    /// First failing check, if any.
    fn first_failure(&self, record: &ProcessingRecord) -> Option<String> {
        let text_length = record.text.chars().count();

        if text_length < self.options.min_length {
            return Some(format!(
                "text too short: {text_length} < {}",
                self.options.min_length
            ));
        }

        if let Some(max) = self.options.max_length {
            if text_length > max {
                return Some(format!("text too long: {text_length} > {max}"));
            }
        }

        if let Some(score) = record.quality_score {
            if score < self.options.min_quality_score {
                return Some(format!(
                    "quality score too low: {score:.4} < {}",
                    self.options.min_quality_score
                ));
            }
        }

        for (pattern, regex) in self.options.required_patterns.iter().zip(&self.required) {
            if !regex.is_match(&record.text) {
                return Some(format!("missing required pattern: {pattern}"));
            }
        }

        for (pattern, regex) in self.options.excluded_patterns.iter().zip(&self.excluded) {
            if regex.is_match(&record.text) {
                return Some(format!("contains excluded pattern: {pattern}"));
            }
        }

        None
    }
}

impl DocumentStage for ContentFilter {
    fn name(&self) -> &'static str {
        "content_filtering"
    }

    fn phase(&self) -> StagePhase {
        StagePhase::Filtering
    }

    fn apply(&self, record: &mut ProcessingRecord) -> Result<Disposition> {
        match self.first_failure(record) {
            Some(reason) => {
                record
                    .processing_metadata
                    .insert("filtered".into(), json!(true));
                record
                    .processing_metadata
                    .insert("filter_reason".into(), json!(reason.clone()));
                record.push_step(
                    self.name(),
                    json!({
                        "passed": false,
                        "filter_reason": reason,
                    }),
                );

                if self.options.keep_document {
                    Ok(Disposition::Retain)
                } else {
                    Ok(Disposition::Drop)
                }
            }
            None => {
                record
                    .processing_metadata
                    .insert("filtered".into(), json!(false));
                record.push_step(
                    self.name(),
                    json!({
                        "passed": true,
                        "min_quality_score": self.options.min_quality_score,
                        "min_length": self.options.min_length,
                        "max_length": self.options.max_length,
                        "required_patterns_count": self.options.required_patterns.len(),
                        "excluded_patterns_count": self.options.excluded_patterns.len(),
                    }),
                );
                Ok(Disposition::Retain)
            }
        }
    }
}
