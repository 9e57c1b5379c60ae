//! Sentence segmentation with word-count filtering and optional spans.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

use lexforge_shared::{Disposition, DocumentStage, ProcessingRecord, Result, StagePhase};

/// Sentence boundary: run of terminal punctuation followed by whitespace.
static BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]+\s+").expect("valid regex"));

/// Abbreviations whose trailing period does not end an English sentence.
static ENGLISH_ABBREVIATIONS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "Mr.", "Mrs.", "Ms.", "Dr.", "Prof.", "Hon.", "Jr.", "Sr.", "St.", "Inc.", "Corp.",
        "Co.", "Ltd.", "No.", "Nos.", "v.", "vs.", "U.S.", "U.S.C.", "Fed.", "Cir.", "Ct.",
        "Stat.", "Reg.", "etc.", "e.g.", "i.e.", "cf.", "al.", "seq.",
    ]
    .into_iter()
    .collect()
});

/// Options for [`SentenceSplitter`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SentenceOptions {
    /// Language for segmentation rules. Languages without a rule set fall
    /// back to the plain punctuation splitter.
    pub language: String,
    /// Minimum sentence length in words; shorter sentences are dropped.
    pub min_sentence_length: usize,
    /// Maximum sentence length in words (`None` for no limit).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_sentence_length: Option<usize>,
    /// Record character spans (byte offsets) for each kept sentence.
    pub store_spans: bool,
}

impl Default for SentenceOptions {
    fn default() -> Self {
        Self {
            language: "english".into(),
            min_sentence_length: 3,
            max_sentence_length: None,
            store_spans: false,
        }
    }
}

/// How boundaries are detected for the configured language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segmenter {
    /// Abbreviation-aware English rules.
    English,
    /// Plain split on terminal punctuation + whitespace.
    Plain,
}

/// Per-document sentence segmentation stage.
///
/// Stores the kept sentences and their count in `processing_metadata` for
/// downstream stages (word tokenization, quality scoring).
pub struct SentenceSplitter {
    options: SentenceOptions,
    segmenter: Segmenter,
}

impl SentenceSplitter {
    /// Build a splitter for the configured language.
    pub fn new(options: SentenceOptions) -> Self {
        let segmenter = match options.language.as_str() {
            "english" | "en" => Segmenter::English,
            other => {
                warn!(
                    language = other,
                    "no sentence rules for language, falling back to plain splitter"
                );
                Segmenter::Plain
            }
        };
        Self { options, segmenter }
    }

    /// Splitter with default options (English, min 3 words).
    pub fn with_defaults() -> Self {
        Self::new(SentenceOptions::default())
    }

    /// Split `text` into raw sentences, before any length filtering.
    fn split(&self, text: &str) -> Vec<String> {
        let protect = match self.segmenter {
            Segmenter::English => Some(&*ENGLISH_ABBREVIATIONS),
            Segmenter::Plain => None,
        };

        let mut sentences = Vec::new();
        let mut start = 0usize;

        for mat in BOUNDARY.find_iter(text) {
            let punct = mat.as_str().trim_end();
            let sentence_end = mat.start() + punct.len();

            if let Some(set) = protect {
                let candidate = &text[start..sentence_end];
                if let Some(last) = candidate.split_whitespace().last() {
                    if set.contains(last) || is_initial(last) {
                        continue;
                    }
                }
            }

            let sentence = text[start..sentence_end].trim();
            if !sentence.is_empty() {
                sentences.push(sentence.to_string());
            }
            start = mat.end();
        }

        let tail = text[start..].trim();
        if !tail.is_empty() {
            sentences.push(tail.to_string());
        }

        sentences
    }

    fn keep(&self, sentence: &str) -> bool {
        let word_count = sentence.split_whitespace().count();
        word_count >= self.options.min_sentence_length
            && self
                .options
                .max_sentence_length
                .is_none_or(|max| word_count <= max)
    }
}

/// A single capital letter followed by a period (a name initial).
fn is_initial(token: &str) -> bool {
    let mut chars = token.chars();
    matches!(
        (chars.next(), chars.next(), chars.next()),
        (Some(letter), Some('.'), None) if letter.is_uppercase()
    )
}

impl DocumentStage for SentenceSplitter {
    fn name(&self) -> &'static str {
        "sentence_tokenization"
    }

    fn phase(&self) -> StagePhase {
        StagePhase::Tokenization
    }

    fn apply(&self, record: &mut ProcessingRecord) -> Result<Disposition> {
        let sentences: Vec<String> = self
            .split(&record.text)
            .into_iter()
            .filter(|s| self.keep(s))
            .collect();

        if self.options.store_spans {
            // Forward scan; a sentence the scan cannot find (trimmed
            // differently than the source text) is skipped, not an error.
            let mut spans: Vec<(usize, usize)> = Vec::new();
            let mut search_from = 0usize;
            for sentence in &sentences {
                if let Some(found) = record.text[search_from..].find(sentence.as_str()) {
                    let start = search_from + found;
                    let end = start + sentence.len();
                    spans.push((start, end));
                    search_from = end;
                }
            }
            record
                .processing_metadata
                .insert("sentence_spans".into(), json!(spans));
        }

        record
            .processing_metadata
            .insert("sentences".into(), json!(sentences));
        record
            .processing_metadata
            .insert("sentence_count".into(), json!(sentences.len()));

        record.push_step(
            self.name(),
            json!({
                "language": self.options.language,
                "sentence_count": sentences.len(),
                "min_sentence_length": self.options.min_sentence_length,
                "max_sentence_length": self.options.max_sentence_length,
            }),
        );

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

    fn sentences_of(rec: &ProcessingRecord) -> Vec<String> {
        serde_json::from_value(rec.processing_metadata["sentences"].clone()).expect("sentences")
    }

    #[test]
    fn splits_on_terminal_punctuation() {
        let splitter = SentenceSplitter::new(SentenceOptions {
            min_sentence_length: 1,
            ..SentenceOptions::default()
        });
        let mut rec = record("First sentence here. Second one follows! Third asks?");
        splitter.apply(&mut rec).expect("apply");

        assert_eq!(
            sentences_of(&rec),
            vec![
                "First sentence here.",
                "Second one follows!",
                "Third asks?"
            ]
        );
    }

    #[test]
    fn min_word_count_filters_short_sentences() {
        let splitter = SentenceSplitter::new(SentenceOptions {
            min_sentence_length: 2,
            ..SentenceOptions::default()
        });
        let mut rec = record("Hi there. How are you? Fine.");
        splitter.apply(&mut rec).expect("apply");

        // "Hi there." (2 words) and "How are you?" (3 words) survive the
        // two-word floor; "Fine." (1 word) does not.
        assert_eq!(sentences_of(&rec), vec!["Hi there.", "How are you?"]);
        assert_eq!(rec.processing_metadata["sentence_count"], json!(2));
    }

    #[test]
    fn abbreviations_do_not_end_sentences() {
        let splitter = SentenceSplitter::new(SentenceOptions {
            min_sentence_length: 1,
            ..SentenceOptions::default()
        });
        let mut rec = record("Mr. Smith sued Acme Corp. in 1990. The case settled.");
        splitter.apply(&mut rec).expect("apply");

        assert_eq!(
            sentences_of(&rec),
            vec!["Mr. Smith sued Acme Corp. in 1990.", "The case settled."]
        );
    }

    #[test]
    fn unknown_language_falls_back_to_plain_split() {
        let splitter = SentenceSplitter::new(SentenceOptions {
            language: "klingon".into(),
            min_sentence_length: 1,
            ..SentenceOptions::default()
        });
        let mut rec = record("Mr. Smith appeared. The case settled.");
        splitter.apply(&mut rec).expect("apply");

        // Plain splitter has no abbreviation protection.
        assert_eq!(
            sentences_of(&rec),
            vec!["Mr.", "Smith appeared.", "The case settled."]
        );
    }

    #[test]
    fn stores_spans_that_index_back_into_text() {
        let splitter = SentenceSplitter::new(SentenceOptions {
            min_sentence_length: 1,
            store_spans: true,
            ..SentenceOptions::default()
        });
        let mut rec = record("One sentence here. Another one there.");
        splitter.apply(&mut rec).expect("apply");

        let spans: Vec<(usize, usize)> =
            serde_json::from_value(rec.processing_metadata["sentence_spans"].clone())
                .expect("spans");
        let sentences = sentences_of(&rec);
        assert_eq!(spans.len(), sentences.len());
        for (span, sentence) in spans.iter().zip(&sentences) {
            assert_eq!(&rec.text[span.0..span.1], sentence);
        }
    }

    #[test]
    fn max_word_count_filters_long_sentences() {
        let splitter = SentenceSplitter::new(SentenceOptions {
            min_sentence_length: 1,
            max_sentence_length: Some(3),
            ..SentenceOptions::default()
        });
        let mut rec = record("Short one. This sentence runs much longer than allowed.");
        splitter.apply(&mut rec).expect("apply");

        assert_eq!(sentences_of(&rec), vec!["Short one."]);
    }
}
