//! Word tokenization onto the record's `tokens` field.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;

use lexforge_shared::{Disposition, DocumentStage, ProcessingRecord, Result, StagePhase};

/// Word runs or single non-whitespace punctuation marks.
static TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w+|[^\w\s]").expect("valid regex"));

/// A token made entirely of non-word characters.
static PUNCTUATION_ONLY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\W+$").expect("valid regex"));

/// Tokenize `text` into word and punctuation tokens.
pub fn word_tokens(text: &str) -> Vec<String> {
    TOKEN.find_iter(text).map(|m| m.as_str().to_string()).collect()
}

/// Options for [`WordSplitter`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WordOptions {
    /// Lowercase every token.
    pub lowercase: bool,
    /// Drop tokens made entirely of punctuation.
    pub remove_punctuation: bool,
    /// Minimum token length in characters.
    pub min_word_length: usize,
    /// Maximum token length in characters (`None` for no limit).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_word_length: Option<usize>,
}

impl Default for WordOptions {
    fn default() -> Self {
        Self {
            lowercase: false,
            remove_punctuation: false,
            min_word_length: 1,
            max_word_length: None,
        }
    }
}

/// Per-document word tokenization stage.
///
/// Tokenizes the sentence list left by a prior [`super::SentenceSplitter`]
/// when present, otherwise the raw text, and populates
/// `tokens`/`token_count` on the record.
pub struct WordSplitter {
    options: WordOptions,
}

impl WordSplitter {
    pub fn new(options: WordOptions) -> Self {
        Self { options }
    }

    /// Splitter with default options.
    pub fn with_defaults() -> Self {
        Self::new(WordOptions::default())
    }

    fn filtered(&self, tokens: Vec<String>) -> Vec<String> {
        tokens
            .into_iter()
            .filter_map(|token| {
                let token = if self.options.lowercase {
                    token.to_lowercase()
                } else {
                    token
                };

                if self.options.remove_punctuation && PUNCTUATION_ONLY.is_match(&token) {
                    return None;
                }

                let len = token.chars().count();
                if len < self.options.min_word_length {
                    return None;
                }
                if self.options.max_word_length.is_some_and(|max| len > max) {
                    return None;
                }

                Some(token)
            })
            .collect()
    }
}

impl DocumentStage for WordSplitter {
    fn name(&self) -> &'static str {
        "word_tokenization"
    }

    fn phase(&self) -> StagePhase {
        StagePhase::Tokenization
    }

    fn apply(&self, record: &mut ProcessingRecord) -> Result<Disposition> {
        // Prefer the sentence list from a prior segmentation stage.
        let raw_tokens: Vec<String> = match record
            .processing_metadata
            .get("sentences")
            .and_then(|v| v.as_array())
        {
            Some(sentences) => sentences
                .iter()
                .filter_map(|s| s.as_str())
                .flat_map(word_tokens)
                .collect(),
            None => word_tokens(&record.text),
        };

        let tokens = self.filtered(raw_tokens);
        let token_count = tokens.len();
        record.tokens = Some(tokens);
        record.token_count = Some(token_count);

        record.push_step(
            self.name(),
            json!({
                "token_count": token_count,
                "lowercase": self.options.lowercase,
                "remove_punctuation": self.options.remove_punctuation,
                "min_word_length": self.options.min_word_length,
                "max_word_length": self.options.max_word_length,
            }),
        );

        Ok(Disposition::Retain)
    }
}
