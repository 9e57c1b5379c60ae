//! Character-level normalization: typographic quotes and dashes, ellipses,
//! ampersands, and optional abbreviation/contraction expansion.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;

use lexforge_shared::{Disposition, DocumentStage, ProcessingRecord, Result, StagePhase};

/// Legal abbreviations eligible for expansion.
const ABBREVIATIONS: &[(&str, &str)] = &[
    ("U.S.C.", "United States Code"),
    ("U.S.", "United States"),
    ("C.F.R.", "Code of Federal Regulations"),
    ("Fed. Reg.", "Federal Register"),
    ("et al.", "et alia"),
    ("et seq.", "et sequentes"),
    ("i.e.", "that is"),
    ("e.g.", "for example"),
];

/// English contractions eligible for expansion.
const CONTRACTIONS: &[(&str, &str)] = &[
    ("ain't", "is not"),
    ("aren't", "are not"),
    ("can't", "cannot"),
    ("couldn't", "could not"),
    ("didn't", "did not"),
    ("doesn't", "does not"),
    ("don't", "do not"),
    ("hadn't", "had not"),
    ("hasn't", "has not"),
    ("haven't", "have not"),
    ("he'd", "he would"),
    ("he'll", "he will"),
    ("he's", "he is"),
    ("I'd", "I would"),
    ("I'll", "I will"),
    ("I'm", "I am"),
    ("I've", "I have"),
    ("isn't", "is not"),
    ("it's", "it is"),
    ("let's", "let us"),
    ("mightn't", "might not"),
    ("mustn't", "must not"),
    ("shan't", "shall not"),
    ("she'd", "she would"),
    ("she'll", "she will"),
    ("she's", "she is"),
    ("shouldn't", "should not"),
    ("that's", "that is"),
    ("there's", "there is"),
    ("they'd", "they would"),
    ("they'll", "they will"),
    ("they're", "they are"),
    ("they've", "they have"),
    ("we'd", "we would"),
    ("we're", "we are"),
    ("we've", "we have"),
    ("weren't", "were not"),
    ("what'll", "what will"),
    ("what're", "what are"),
    ("what's", "what is"),
    ("what've", "what have"),
    ("where's", "where is"),
    ("who'd", "who would"),
    ("who'll", "who will"),
    ("who're", "who are"),
    ("who's", "who is"),
    ("who've", "who have"),
    ("won't", "will not"),
    ("wouldn't", "would not"),
    ("you'd", "you would"),
    ("you'll", "you will"),
    ("you're", "you are"),
    ("you've", "you have"),
];

/// Options for [`CharNormalizer`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeOptions {
    /// Map typographic quote variants to ASCII quotes.
    pub normalize_quotes: bool,
    /// Map dash variants to `-`.
    pub normalize_dashes: bool,
    /// Collapse runs of periods to a three-dot ellipsis.
    pub normalize_ellipses: bool,
    /// Expand `&` to `and`.
    pub normalize_ampersands: bool,
    /// Expand the legal abbreviation dictionary.
    pub normalize_abbreviations: bool,
    /// Expand English contractions.
    pub expand_contractions: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            normalize_quotes: true,
            normalize_dashes: true,
            normalize_ellipses: true,
            normalize_ampersands: true,
            normalize_abbreviations: false,
            expand_contractions: false,
        }
    }
}

/// Per-document character normalizer.
///
/// All substitutions are idempotent: applying the stage twice produces the
/// same text as applying it once. Dictionary keys are applied longest
/// first, so `U.S.C.` always wins over its `U.S.` prefix.
pub struct CharNormalizer {
    options: NormalizeOptions,
    ellipsis_pattern: Regex,
    abbreviation_subs: Vec<(Regex, String)>,
    contraction_subs: Vec<(Regex, String)>,
}

impl CharNormalizer {
    /// Build a normalizer, compiling the expansion patterns once.
    pub fn new(options: NormalizeOptions) -> Self {
        let abbreviation_subs = if options.normalize_abbreviations {
            compile_expansions(ABBREVIATIONS)
        } else {
            Vec::new()
        };
        let contraction_subs = if options.expand_contractions {
            compile_expansions(CONTRACTIONS)
        } else {
            Vec::new()
        };

        Self {
            options,
            ellipsis_pattern: Regex::new(r"\.{2,}").expect("valid regex"),
            abbreviation_subs,
            contraction_subs,
        }
    }

    /// Normalizer with default options.
    pub fn with_defaults() -> Self {
        Self::new(NormalizeOptions::default())
    }

    fn normalize(&self, text: &str) -> String {
        let mut text: String = if self.options.normalize_quotes || self.options.normalize_dashes {
            text.chars()
                .map(|c| self.normalize_char(c))
                .collect()
        } else {
            text.to_string()
        };

        if self.options.normalize_ellipses {
            text = self.ellipsis_pattern.replace_all(&text, "...").into_owned();
        }

        if self.options.normalize_ampersands {
            text = text.replace('&', "and");
        }

        for (pattern, replacement) in &self.abbreviation_subs {
            text = pattern.replace_all(&text, replacement.as_str()).into_owned();
        }

        for (pattern, replacement) in &self.contraction_subs {
            text = pattern.replace_all(&text, replacement.as_str()).into_owned();
        }

        text
    }

    fn normalize_char(&self, c: char) -> char {
        if self.options.normalize_quotes {
            match c {
                '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{201F}' => return '"',
                '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201B}' => return '\'',
                _ => {}
            }
        }
        if self.options.normalize_dashes {
            match c {
                '\u{2013}' | '\u{2014}' | '\u{2015}' | '\u{2010}' | '\u{2011}' | '\u{2012}'
                | '\u{2212}' => return '-',
                _ => {}
            }
        }
        c
    }
}

/// Compile word-boundary-safe substitutions, longest key first.
///
/// Keys ending in a period cannot use a trailing `\b` (period-to-space is
/// not a word boundary), so those patterns capture the following non-word
/// character and restore it.
fn compile_expansions(entries: &[(&str, &str)]) -> Vec<(Regex, String)> {
    let mut sorted: Vec<_> = entries.to_vec();
    sorted.sort_by(|a, b| b.0.chars().count().cmp(&a.0.chars().count()).then(a.0.cmp(b.0)));

    sorted
        .into_iter()
        .map(|(key, expansion)| {
            let escaped = regex::escape(key);
            let ends_with_word = key.chars().last().is_some_and(|c| {
                c.is_alphanumeric() || c == '_'
            });
            if ends_with_word {
                (
                    Regex::new(&format!(r"\b{escaped}\b")).expect("valid regex"),
                    expansion.to_string(),
                )
            } else {
                (
                    Regex::new(&format!(r"\b{escaped}(\W|$)")).expect("valid regex"),
                    format!("{expansion}$1"),
                )
            }
        })
        .collect()
}

impl DocumentStage for CharNormalizer {
    fn name(&self) -> &'static str {
        "text_normalization"
    }

    fn phase(&self) -> StagePhase {
        StagePhase::Cleaning
    }

    fn apply(&self, record: &mut ProcessingRecord) -> Result<Disposition> {
        record.text = self.normalize(&record.text);

        record.push_step(
            self.name(),
            json!({
                "normalize_quotes": self.options.normalize_quotes,
                "normalize_dashes": self.options.normalize_dashes,
                "normalize_ellipses": self.options.normalize_ellipses,
                "normalize_ampersands": self.options.normalize_ampersands,
                "normalize_abbreviations": self.options.normalize_abbreviations,
                "expand_contractions": self.options.expand_contractions,
            }),
        );

        Ok(Disposition::Retain)
    }
}
