//! Composite quality scoring from text statistics.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::json;

use lexforge_shared::{
    Disposition, DocumentStage, LexForgeError, ProcessingRecord, Result, StagePhase,
};

/// Sub-score names accepted in the weight map.
const SCORE_NAMES: [&str; 5] = [
    "length_score",
    "avg_word_length_score",
    "sentence_count_score",
    "repetition_score",
    "alphanumeric_score",
];

/// Tolerance when checking that weights sum to 1.
const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Options for [`QualityScorer`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityOptions {
    /// Minimum text length in characters.
    pub min_length: usize,
    /// Maximum text length in characters (`None` for no limit).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    /// Minimum average word length.
    pub min_avg_word_length: f64,
    /// Maximum average word length.
    pub max_avg_word_length: f64,
    /// Minimum number of sentences.
    pub min_sentence_count: usize,
    /// Maximum tolerated ratio of repeated words.
    pub max_repetition_ratio: f64,
    /// Minimum ratio of alphanumeric characters.
    pub min_alphanumeric_ratio: f64,
    /// Sub-score weights. Keys must be sub-score names; values must sum
    /// to 1.0 so the composite stays within [0, 1].
    pub weights: BTreeMap<String, f64>,
}

impl Default for QualityOptions {
    fn default() -> Self {
        Self {
            min_length: 100,
            max_length: None,
            min_avg_word_length: 3.0,
            max_avg_word_length: 15.0,
            min_sentence_count: 3,
            max_repetition_ratio: 0.3,
            min_alphanumeric_ratio: 0.7,
            weights: default_weights(),
        }
    }
}

fn default_weights() -> BTreeMap<String, f64> {
    BTreeMap::from([
        ("length_score".to_string(), 0.2),
        ("avg_word_length_score".to_string(), 0.1),
        ("sentence_count_score".to_string(), 0.2),
        ("repetition_score".to_string(), 0.2),
        ("alphanumeric_score".to_string(), 0.3),
    ])
}

/// Per-document quality scoring stage.
///
/// Five sub-scores, each clamped to [0, 1], combined by the validated
/// weight map into `quality_score`. All intermediates are recorded in
/// `quality_metrics`.
pub struct QualityScorer {
    options: QualityOptions,
}

impl QualityScorer {
    /// Build a scorer, validating thresholds and the weight map.
    pub fn new(options: QualityOptions) -> Result<Self> {
        if options.min_length == 0 {
            return Err(LexForgeError::config("min_length must be at least 1"));
        }
        if let Some(max) = options.max_length {
            if max <= options.min_length {
                return Err(LexForgeError::config(format!(
                    "max_length ({max}) must exceed min_length ({})",
                    options.min_length
                )));
            }
        }
        if options.min_avg_word_length <= 0.0
            || options.max_avg_word_length < options.min_avg_word_length
        {
            return Err(LexForgeError::config(
                "average word length bounds must satisfy 0 < min <= max",
            ));
        }
        if options.min_sentence_count == 0 {
            return Err(LexForgeError::config("min_sentence_count must be at least 1"));
        }
        if !(0.0..=1.0).contains(&options.max_repetition_ratio)
            || options.max_repetition_ratio == 0.0
        {
            return Err(LexForgeError::config(
                "max_repetition_ratio must be in (0, 1]",
            ));
        }
        if !(0.0..=1.0).contains(&options.min_alphanumeric_ratio)
            || options.min_alphanumeric_ratio == 0.0
        {
            return Err(LexForgeError::config(
                "min_alphanumeric_ratio must be in (0, 1]",
            ));
        }

        let known: HashSet<&str> = SCORE_NAMES.into_iter().collect();
        for key in options.weights.keys() {
            if !known.contains(key.as_str()) {
                return Err(LexForgeError::config(format!(
                    "unknown quality weight '{key}'"
                )));
            }
        }
        let sum: f64 = options.weights.values().sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(LexForgeError::config(format!(
                "quality weights must sum to 1.0 (got {sum})"
            )));
        }

        Ok(Self { options })
    }

    /// Scorer with default options.
    pub fn with_defaults() -> Self {
        Self::new(QualityOptions::default()).expect("default options are valid")
    }

    fn length_score(&self, text_length: usize) -> f64 {
        let min = self.options.min_length as f64;
        let len = text_length as f64;

        match self.options.max_length {
            Some(max_len) => {
                let max = max_len as f64;
                if len > max {
                    // Penalty ramp past the maximum.
                    (1.0 - (len - max) / max).max(0.0)
                } else {
                    ((len - min) / (max - min)).clamp(0.0, 1.0)
                }
            }
            None => {
                if len >= min {
                    1.0
                } else {
                    len / min
                }
            }
        }
    }

    fn avg_word_length_score(&self, avg: f64) -> f64 {
        if avg < self.options.min_avg_word_length {
            avg / self.options.min_avg_word_length
        } else if avg > self.options.max_avg_word_length {
            (1.0 - (avg - self.options.max_avg_word_length) / self.options.max_avg_word_length)
                .max(0.0)
        } else {
            1.0
        }
    }

    /// Sentence count from a prior tokenization stage, or a punctuation
    /// estimate (minimum 1) when none ran.
    fn sentence_count(&self, record: &ProcessingRecord) -> usize {
        let stored = record
            .processing_metadata
            .get("sentence_count")
            .and_then(|v| v.as_u64())
            .unwrap_or(0) as usize;

        if stored > 0 {
            stored
        } else {
            let estimated = record
                .text
                .chars()
                .filter(|c| matches!(c, '.' | '!' | '?'))
                .count();
            estimated.max(1)
        }
    }
}

impl DocumentStage for QualityScorer {
    fn name(&self) -> &'static str {
        "quality_assessment"
    }

    fn phase(&self) -> StagePhase {
        StagePhase::QualityAssessment
    }

    fn apply(&self, record: &mut ProcessingRecord) -> Result<Disposition> {
        let text = &record.text;
        let mut metrics: BTreeMap<String, f64> = BTreeMap::new();

        let text_length = text.chars().count();
        metrics.insert("text_length".into(), text_length as f64);
        metrics.insert("length_score".into(), self.length_score(text_length));

        let words: Vec<&str> = text.split_whitespace().collect();
        let word_count = words.len();
        metrics.insert("word_count".into(), word_count as f64);

        let (avg_word_length, avg_word_length_score) = if word_count > 0 {
            let total_chars: usize = words.iter().map(|w| w.chars().count()).sum();
            let avg = total_chars as f64 / word_count as f64;
            (avg, self.avg_word_length_score(avg))
        } else {
            (0.0, 0.0)
        };
        metrics.insert("avg_word_length".into(), avg_word_length);
        metrics.insert("avg_word_length_score".into(), avg_word_length_score);

        let sentence_count = self.sentence_count(record);
        metrics.insert("sentence_count".into(), sentence_count as f64);
        metrics.insert(
            "sentence_count_score".into(),
            (sentence_count as f64 / self.options.min_sentence_count as f64).min(1.0),
        );

        let (repetition_ratio, repetition_score) = if word_count > 0 {
            let unique_words: HashSet<&str> = words.iter().copied().collect();
            let ratio = 1.0 - unique_words.len() as f64 / word_count as f64;
            let score = (1.0 - ratio / self.options.max_repetition_ratio).clamp(0.0, 1.0);
            (ratio, score)
        } else {
            (1.0, 0.0)
        };
        metrics.insert("repetition_ratio".into(), repetition_ratio);
        metrics.insert("repetition_score".into(), repetition_score);

        let alphanumeric_ratio = if text_length > 0 {
            let alphanumeric = text.chars().filter(|c| c.is_alphanumeric()).count();
            alphanumeric as f64 / text_length as f64
        } else {
            0.0
        };
        metrics.insert("alphanumeric_ratio".into(), alphanumeric_ratio);
        metrics.insert(
            "alphanumeric_score".into(),
            if alphanumeric_ratio < self.options.min_alphanumeric_ratio {
                alphanumeric_ratio / self.options.min_alphanumeric_ratio
            } else {
                1.0
            },
        );

        let quality_score: f64 = self
            .options
            .weights
            .iter()
            .filter_map(|(name, weight)| metrics.get(name).map(|score| score * weight))
            .sum();

        record.quality_metrics = metrics.clone();
        record.quality_score = Some(quality_score);

        let mut detail = serde_json::Map::new();
        detail.insert("quality_score".into(), json!(quality_score));
        for (name, value) in &metrics {
            detail.insert(name.clone(), json!(value));
        }
        record.push_step(self.name(), serde_json::Value::Object(detail));

        Ok(Disposition::Retain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexforge_shared::RawDocument;

    fn record(text: &str) -> ProcessingRecord {
        ProcessingRecord::from_raw(RawDocument {
            id: "doc-1".into(),
            text: text.into(),
            metadata: Default::default(),
            source: "test".into(),
            source_id: "t-1".into(),
        })
    }

    fn score(text: &str) -> ProcessingRecord {
        let scorer = QualityScorer::with_defaults();
        let mut rec = record(text);
        scorer.apply(&mut rec).expect("apply");
        rec
    }

    #[test]
    fn sub_scores_stay_in_unit_interval() {
        let samples = [
            "",
            "x",
            "!!! ??? ...",
            "word word word word word word word word",
            "A reasonably long paragraph of varied legal prose. It has several \
             sentences of average length. Each contributes to the statistics. \
             The vocabulary does not repeat excessively.",
        ];

        for text in samples {
            let rec = score(text);
            for name in SCORE_NAMES {
                let value = rec.quality_metrics[name];
                assert!(
                    (0.0..=1.0).contains(&value),
                    "{name}={value} out of range for {text:?}"
                );
            }
            let composite = rec.quality_score.unwrap();
            assert!(
                (0.0..=1.0).contains(&composite),
                "composite {composite} out of range for {text:?}"
            );
        }
    }

    #[test]
    fn empty_text_scores_zero_word_metrics() {
        let rec = score("");
        assert_eq!(rec.quality_metrics["avg_word_length_score"], 0.0);
        assert_eq!(rec.quality_metrics["repetition_score"], 0.0);
        assert_eq!(rec.quality_metrics["word_count"], 0.0);
    }

    #[test]
    fn repetitive_text_scores_low_on_repetition() {
        let repetitive = score("appeal appeal appeal appeal appeal appeal");
        let varied = score("the appellant filed a timely notice of appeal");
        assert!(
            repetitive.quality_metrics["repetition_score"]
                < varied.quality_metrics["repetition_score"]
        );
        assert_eq!(repetitive.quality_metrics["repetition_score"], 0.0);
    }

    #[test]
    fn sentence_count_prefers_tokenizer_metadata() {
        let scorer = QualityScorer::with_defaults();
        let mut rec = record("no terminal punctuation at all");
        rec.processing_metadata
            .insert("sentence_count".into(), json!(7));
        scorer.apply(&mut rec).expect("apply");
        assert_eq!(rec.quality_metrics["sentence_count"], 7.0);
        assert_eq!(rec.quality_metrics["sentence_count_score"], 1.0);
    }

    #[test]
    fn sentence_count_estimated_from_punctuation() {
        let rec = score("One. Two! Three?");
        assert_eq!(rec.quality_metrics["sentence_count"], 3.0);
    }

    #[test]
    fn length_penalty_past_maximum() {
        let scorer = QualityScorer::new(QualityOptions {
            min_length: 10,
            max_length: Some(20),
            ..QualityOptions::default()
        })
        .expect("valid options");

        let mut rec = record(&"x".repeat(40));
        scorer.apply(&mut rec).expect("apply");
        // 40 chars against a max of 20: penalty ramp bottoms out at 0.
        assert_eq!(rec.quality_metrics["length_score"], 0.0);
    }

    #[test]
    fn composite_uses_weights() {
        let weights = BTreeMap::from([
            ("length_score".to_string(), 1.0),
        ]);
        let scorer = QualityScorer::new(QualityOptions {
            min_length: 10,
            weights,
            ..QualityOptions::default()
        })
        .expect("valid options");

        let mut rec = record("long enough text for the minimum");
        scorer.apply(&mut rec).expect("apply");
        assert_eq!(rec.quality_score, Some(1.0));
    }

    #[test]
    fn rejects_unknown_weight_names() {
        let weights = BTreeMap::from([("typo_score".to_string(), 1.0)]);
        let result = QualityScorer::new(QualityOptions {
            weights,
            ..QualityOptions::default()
        });
        assert!(result.is_err());
    }

    #[test]
    fn rejects_weights_not_summing_to_one() {
        let weights = BTreeMap::from([
            ("length_score".to_string(), 0.5),
            ("repetition_score".to_string(), 0.2),
        ]);
        let result = QualityScorer::new(QualityOptions {
            weights,
            ..QualityOptions::default()
        });
        assert!(result.is_err());
    }

    #[test]
    fn records_history_and_metrics() {
        let rec = score("Some text with a sentence. And another one here.");
        assert_eq!(rec.processing_history.last().unwrap(), "quality_assessment");
        let detail = &rec.processing_metadata["quality_assessment"];
        assert!(detail["quality_score"].is_number());
        assert!(detail["length_score"].is_number());
    }
}
