//! Generic text cleanup: Unicode normalization, URL/email removal,
//! whitespace collapsing, newline capping, and optional line wrapping.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use unicode_normalization::UnicodeNormalization;

use lexforge_shared::{Disposition, DocumentStage, LexForgeError, ProcessingRecord, Result, StagePhase};

/// Options for [`TextCleaner`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanOptions {
    /// Apply Unicode NFKC normalization.
    pub normalize_unicode: bool,
    /// Remove URLs.
    pub remove_urls: bool,
    /// Remove email addresses.
    pub remove_emails: bool,
    /// Collapse runs of horizontal whitespace and cap newline runs.
    pub normalize_whitespace: bool,
    /// Lowercase the whole text.
    pub lowercase: bool,
    /// Maximum number of consecutive newlines to allow.
    pub max_consecutive_newlines: usize,
    /// Hard-wrap lines longer than this many characters, preferring word
    /// boundaries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_line_length: Option<usize>,
}

impl Default for CleanOptions {
    fn default() -> Self {
        Self {
            normalize_unicode: true,
            remove_urls: true,
            remove_emails: true,
            normalize_whitespace: true,
            lowercase: false,
            max_consecutive_newlines: 3,
            max_line_length: None,
        }
    }
}

/// Generic per-document text cleaner.
///
/// Pattern matching runs on NFKC-normalized text, so the URL/email
/// patterns only need to handle canonical forms.
pub struct TextCleaner {
    options: CleanOptions,
    url_pattern: Regex,
    email_pattern: Regex,
    horizontal_ws_pattern: Regex,
    newline_run_pattern: Regex,
}

impl TextCleaner {
    /// Build a cleaner, compiling its patterns once.
    pub fn new(options: CleanOptions) -> Result<Self> {
        if options.max_consecutive_newlines == 0 {
            return Err(LexForgeError::config(
                "max_consecutive_newlines must be at least 1",
            ));
        }
        if options.max_line_length == Some(0) {
            return Err(LexForgeError::config("max_line_length must be at least 1"));
        }

        let newline_run = format!(r"\n{{{},}}", options.max_consecutive_newlines + 1);

        Ok(Self {
            options,
            url_pattern: Regex::new(r"https?://(?:[-\w.]|(?:%[\da-fA-F]{2}))+(?:/[^/\s]*)*")
                .expect("valid regex"),
            email_pattern: Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b")
                .expect("valid regex"),
            // Whitespace except newlines; newline runs are capped separately
            // so the configured cap actually has something to act on.
            horizontal_ws_pattern: Regex::new(r"[^\S\n]+").expect("valid regex"),
            newline_run_pattern: Regex::new(&newline_run).expect("valid regex"),
        })
    }

    /// Cleaner with default options.
    pub fn with_defaults() -> Self {
        Self::new(CleanOptions::default()).expect("default options are valid")
    }

    fn clean(&self, text: &str) -> String {
        let mut text = if self.options.normalize_unicode {
            text.nfkc().collect::<String>()
        } else {
            text.to_string()
        };

        if self.options.remove_urls {
            text = self.url_pattern.replace_all(&text, " ").into_owned();
        }

        if self.options.remove_emails {
            text = self.email_pattern.replace_all(&text, " ").into_owned();
        }

        if self.options.normalize_whitespace {
            text = self.horizontal_ws_pattern.replace_all(&text, " ").into_owned();
            let cap = "\n".repeat(self.options.max_consecutive_newlines);
            text = self
                .newline_run_pattern
                .replace_all(&text, cap.as_str())
                .into_owned();
        }

        if self.options.lowercase {
            text = text.to_lowercase();
        }

        if let Some(max_len) = self.options.max_line_length {
            text = wrap_lines(&text, max_len);
        }

        text
    }
}

/// Wrap lines longer than `max_len` characters at word boundaries.
/// A single word longer than the limit stays on its own line.
fn wrap_lines(text: &str, max_len: usize) -> String {
    let mut wrapped: Vec<String> = Vec::new();

    for line in text.split('\n') {
        if line.chars().count() <= max_len {
            wrapped.push(line.to_string());
            continue;
        }

        let mut current = String::new();
        let mut current_len = 0usize;
        for word in line.split_whitespace() {
            let word_len = word.chars().count();
            if current_len + word_len + 1 <= max_len && !current.is_empty() {
                current.push(' ');
                current.push_str(word);
                current_len += word_len + 1;
            } else if current.is_empty() {
                current.push_str(word);
                current_len = word_len;
            } else {
                wrapped.push(std::mem::take(&mut current));
                current.push_str(word);
                current_len = word_len;
            }
        }
        if !current.is_empty() {
            wrapped.push(current);
        }
    }

    wrapped.join("\n")
}

impl DocumentStage for TextCleaner {
    fn name(&self) -> &'static str {
        "basic_text_cleaning"
    }

    fn phase(&self) -> StagePhase {
        StagePhase::Cleaning
    }

    fn apply(&self, record: &mut ProcessingRecord) -> Result<Disposition> {
        let original_length = record.text.chars().count();
        record.text = self.clean(&record.text);
        let cleaned_length = record.text.chars().count();

        record.push_step(
            self.name(),
            json!({
                "original_length": original_length,
                "cleaned_length": cleaned_length,
                "chars_removed": original_length as i64 - cleaned_length as i64,
                "normalize_unicode": self.options.normalize_unicode,
                "remove_urls": self.options.remove_urls,
                "remove_emails": self.options.remove_emails,
                "lowercase": self.options.lowercase,
            }),
        );

        Ok(Disposition::Retain)
    }
}
