//! Legal-document cleanup: page/line-number artifacts, redaction markers,
//! section symbols, boilerplate headers, and citation spacing.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;

use lexforge_shared::{Disposition, DocumentStage, ProcessingRecord, Result, StagePhase};

/// Options for [`LegalCleaner`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LegalCleanOptions {
    /// Strip standalone `- N -` page-number lines.
    pub remove_page_numbers: bool,
    /// Strip leading per-line numeric line markers.
    pub remove_line_numbers: bool,
    /// Normalize redaction markers to the canonical `[REDACTED]`.
    pub normalize_redactions: bool,
    /// Rewrite `§ N` references to `Section N`.
    pub normalize_section_markers: bool,
    /// Remove common header/footer boilerplate phrases.
    pub remove_boilerplate: bool,
    /// Canonicalize spacing in citations and `v.` case names.
    pub normalize_citations: bool,
}

impl Default for LegalCleanOptions {
    fn default() -> Self {
        Self {
            remove_page_numbers: true,
            remove_line_numbers: true,
            normalize_redactions: true,
            normalize_section_markers: true,
            remove_boilerplate: true,
            normalize_citations: true,
        }
    }
}

/// Per-document cleaner for legal text artifacts.
///
/// Citation handling canonicalizes spacing only; it does not validate or
/// parse citation formats.
pub struct LegalCleaner {
    options: LegalCleanOptions,
    page_number_pattern: Regex,
    line_number_pattern: Regex,
    redaction_pattern: Regex,
    section_pattern: Regex,
    boilerplate_patterns: Vec<Regex>,
    versus_pattern: Regex,
    us_reporter_pattern: Regex,
    sct_reporter_pattern: Regex,
    federal_reporter_pattern: Regex,
}

impl LegalCleaner {
    /// Build a cleaner, compiling its patterns once.
    pub fn new(options: LegalCleanOptions) -> Self {
        Self {
            options,
            page_number_pattern: Regex::new(r"\n\s*-\s*\d+\s*-\s*\n").expect("valid regex"),
            line_number_pattern: Regex::new(r"(?m)^\s*\d{1,3}\s+").expect("valid regex"),
            redaction_pattern: Regex::new(r"\[(?:REDACTED|redacted|Redacted|\*{2,})\]")
                .expect("valid regex"),
            section_pattern: Regex::new(r"§+\s*(\d+)").expect("valid regex"),
            boilerplate_patterns: vec![
                Regex::new(r"(?i)CONFIDENTIAL").expect("valid regex"),
                Regex::new(r"(?i)FILED UNDER SEAL").expect("valid regex"),
                Regex::new(r"(?i)DOCUMENT SUBJECT TO PROTECTIVE ORDER").expect("valid regex"),
                Regex::new(r"(?i)OFFICIAL TRANSCRIPT").expect("valid regex"),
                Regex::new(r"(?i)CERTIFIED COPY").expect("valid regex"),
                Regex::new(r"(?im)^\s*Page \d+ of \d+\s*$").expect("valid regex"),
                Regex::new(r"(?im)^\s*Case No\.\s+[\w-]+\s*$").expect("valid regex"),
            ],
            // regex has no look-around; capture the flanking word characters
            // and restore them in the replacement.
            versus_pattern: Regex::new(r"(\w)\s+v\.\s+(\w)").expect("valid regex"),
            us_reporter_pattern: Regex::new(r"(\d+)\s*U\.S\.\s*(\d+)").expect("valid regex"),
            sct_reporter_pattern: Regex::new(r"(\d+)\s*S\.\s*Ct\.\s*(\d+)").expect("valid regex"),
            federal_reporter_pattern: Regex::new(r"(\d+)\s*F\.\s*(\d)d\s*(\d+)")
                .expect("valid regex"),
        }
    }

    /// Cleaner with default options.
    pub fn with_defaults() -> Self {
        Self::new(LegalCleanOptions::default())
    }

    fn clean(&self, text: &str) -> String {
        let mut text = text.to_string();

        if self.options.remove_page_numbers {
            text = self.page_number_pattern.replace_all(&text, "\n").into_owned();
        }

        if self.options.remove_line_numbers {
            text = self.line_number_pattern.replace_all(&text, "").into_owned();
        }

        if self.options.normalize_redactions {
            text = self
                .redaction_pattern
                .replace_all(&text, "[REDACTED]")
                .into_owned();
        }

        if self.options.normalize_section_markers {
            text = self.section_pattern.replace_all(&text, "Section $1").into_owned();
        }

        if self.options.remove_boilerplate {
            for pattern in &self.boilerplate_patterns {
                text = pattern.replace_all(&text, "").into_owned();
            }
        }

        if self.options.normalize_citations {
            text = self.versus_pattern.replace_all(&text, "$1 v. $2").into_owned();
            text = self
                .us_reporter_pattern
                .replace_all(&text, "$1 U.S. $2")
                .into_owned();
            text = self
                .sct_reporter_pattern
                .replace_all(&text, "$1 S. Ct. $2")
                .into_owned();
            text = self
                .federal_reporter_pattern
                .replace_all(&text, "$1 F.${2}d $3")
                .into_owned();
        }

        text
    }
}

impl DocumentStage for LegalCleaner {
    fn name(&self) -> &'static str {
        "legal_text_cleaning"
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
                "remove_page_numbers": self.options.remove_page_numbers,
                "remove_line_numbers": self.options.remove_line_numbers,
                "normalize_citations": self.options.normalize_citations,
                "remove_boilerplate": self.options.remove_boilerplate,
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

    fn clean(text: &str) -> String {
        let cleaner = LegalCleaner::with_defaults();
        let mut rec = record(text);
        cleaner.apply(&mut rec).expect("apply");
        rec.text
    }

    #[test]
    fn strips_page_number_lines() {
        let result = clean("end of page\n - 12 - \nstart of next");
        assert!(!result.contains("- 12 -"));
        assert!(result.contains("end of page"));
        assert!(result.contains("start of next"));
    }

    #[test]
    fn strips_leading_line_numbers() {
        let result = clean("1  The witness was sworn.\n2  Direct examination began.");
        assert!(result.starts_with("The witness"));
        assert!(result.contains("Direct examination"));
        assert!(!result.contains('2'));
    }

    #[test]
    fn canonicalizes_redaction_markers() {
        assert_eq!(
            clean("Name [redacted] and account [****]."),
            "Name [REDACTED] and account [REDACTED]."
        );
    }

    #[test]
    fn spells_out_section_symbols() {
        assert_eq!(clean("Under § 1983 a claim"), "Under Section 1983 a claim");
        assert_eq!(clean("See §§2254"), "See Section 2254");
    }

    #[test]
    fn removes_boilerplate_phrases() {
        let result = clean("CONFIDENTIAL\nThe parties agree.\nPage 3 of 10\n");
        assert!(!result.to_lowercase().contains("confidential"));
        assert!(!result.contains("Page 3 of 10"));
        assert!(result.contains("The parties agree."));
    }

    #[test]
    fn normalizes_versus_spacing() {
        assert_eq!(clean("Roe   v.   Wade"), "Roe v. Wade");
        assert_eq!(clean("Roe v. Wade"), "Roe v. Wade");
    }

    #[test]
    fn normalizes_reporter_spacing() {
        assert_eq!(clean("410 U.S.113"), "410 U.S. 113");
        assert_eq!(clean("93 S. Ct.705"), "93 S. Ct. 705");
        assert_eq!(clean("314 F. 2d 133"), "314 F.2d 133");
    }

    #[test]
    fn records_history_entry() {
        let cleaner = LegalCleaner::with_defaults();
        let mut rec = record("Under § 42 the court held.");
        cleaner.apply(&mut rec).expect("apply");
        assert_eq!(rec.processing_history.last().unwrap(), "legal_text_cleaning");
        assert!(rec.processing_metadata.contains_key("legal_text_cleaning"));
    }
}
