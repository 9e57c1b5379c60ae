//! Entity-preserving tokenization for legal text.
//!
//! Citations, case names, statute references, and section references are
//! masked behind placeholder tokens before word tokenization so they
//! survive as single tokens, then substituted back.

use std::collections::HashMap;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;

use lexforge_shared::{Disposition, DocumentStage, ProcessingRecord, Result, StagePhase};

use crate::word::word_tokens;

/// Options for [`LegalTokenizer`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LegalTokenizeOptions {
    /// Keep reporter citations (`410 U.S. 113`) as single tokens.
    pub preserve_citations: bool,
    /// Keep case names (`Roe v. Wade`) as single tokens.
    pub preserve_case_names: bool,
    /// Keep statute references (`42 U.S.C. § 1983`) as single tokens.
    pub preserve_statute_refs: bool,
    /// Keep section references (`§ 230`) as single tokens.
    pub preserve_section_refs: bool,
}

impl Default for LegalTokenizeOptions {
    fn default() -> Self {
        Self {
            preserve_citations: true,
            preserve_case_names: true,
            preserve_statute_refs: true,
            preserve_section_refs: true,
        }
    }
}

/// An entity match found by one of the class patterns.
#[derive(Debug, Clone)]
struct EntitySpan {
    kind: &'static str,
    text: String,
    start: usize,
    end: usize,
}

/// Per-document legal tokenization stage.
pub struct LegalTokenizer {
    options: LegalTokenizeOptions,
    citation_pattern: Regex,
    case_name_pattern: Regex,
    statute_pattern: Regex,
    section_pattern: Regex,
}

impl LegalTokenizer {
    /// Build a tokenizer, compiling the entity patterns once.
    pub fn new(options: LegalTokenizeOptions) -> Self {
        Self {
            options,
            citation_pattern: Regex::new(r"\d+\s+(?:U\.S\.|S\.\s*Ct\.|F\.\d+d)\s+\d+")
                .expect("valid regex"),
            case_name_pattern: Regex::new(
                r"[A-Z][a-zA-Z'\-]+(?:\s+[A-Z][a-zA-Z'\-]+)*\s+v\.\s+[A-Z][a-zA-Z'\-]+(?:\s+[A-Z][a-zA-Z'\-]+)*",
            )
            .expect("valid regex"),
            statute_pattern: Regex::new(r"\d+\s+U\.S\.C\.\s+§+\s*\d+(?:[a-z])?")
                .expect("valid regex"),
            section_pattern: Regex::new(r"§+\s*\d+(?:\.\d+)*(?:[a-z])?").expect("valid regex"),
        }
    }

    /// Tokenizer with default options (all entity classes preserved).
    pub fn with_defaults() -> Self {
        Self::new(LegalTokenizeOptions::default())
    }

    /// Collect entity spans from all enabled classes, merged and
    /// de-overlapped (earliest start wins; on ties the longest span wins).
    fn entity_spans(&self, text: &str) -> Vec<EntitySpan> {
        let mut spans: Vec<EntitySpan> = Vec::new();

        let mut scan = |pattern: &Regex, kind: &'static str| {
            for mat in pattern.find_iter(text) {
                spans.push(EntitySpan {
                    kind,
                    text: mat.as_str().to_string(),
                    start: mat.start(),
                    end: mat.end(),
                });
            }
        };

        if self.options.preserve_citations {
            scan(&self.citation_pattern, "citation");
        }
        if self.options.preserve_case_names {
            scan(&self.case_name_pattern, "case_name");
        }
        if self.options.preserve_statute_refs {
            scan(&self.statute_pattern, "statute");
        }
        if self.options.preserve_section_refs {
            scan(&self.section_pattern, "section");
        }

        spans.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

        // Overlapping matches from different classes would corrupt the
        // mask; keep the earliest (longest on ties) and drop the rest.
        let mut merged: Vec<EntitySpan> = Vec::new();
        for span in spans {
            match merged.last() {
                Some(last) if span.start < last.end => {}
                _ => merged.push(span),
            }
        }
        merged
    }

    fn any_preserve_flag(&self) -> bool {
        self.options.preserve_citations
            || self.options.preserve_case_names
            || self.options.preserve_statute_refs
            || self.options.preserve_section_refs
    }
}

impl DocumentStage for LegalTokenizer {
    fn name(&self) -> &'static str {
        "legal_tokenization"
    }

    fn phase(&self) -> StagePhase {
        StagePhase::Tokenization
    }

    fn apply(&self, record: &mut ProcessingRecord) -> Result<Disposition> {
        let spans = self.entity_spans(&record.text);

        // Rebuild the text left to right with placeholders; no offset
        // arithmetic to drift.
        let mut masked = String::with_capacity(record.text.len());
        let mut mask_map: HashMap<String, String> = HashMap::new();
        let mut cursor = 0usize;

        for (i, span) in spans.iter().enumerate() {
            let placeholder = format!("__LEGAL_{}_{i}__", span.kind.to_uppercase());
            masked.push_str(&record.text[cursor..span.start]);
            masked.push_str(&placeholder);
            mask_map.insert(placeholder, span.text.clone());
            cursor = span.end;
        }
        masked.push_str(&record.text[cursor..]);

        let preserve = self.any_preserve_flag();
        let mut tokens: Vec<String> = Vec::new();
        for token in word_tokens(&masked) {
            match mask_map.get(&token) {
                Some(entity_text) if preserve => tokens.push(entity_text.clone()),
                Some(entity_text) => tokens.extend(word_tokens(entity_text)),
                None => tokens.push(token),
            }
        }

        let token_count = tokens.len();
        record.tokens = Some(tokens);
        record.token_count = Some(token_count);

        record.processing_metadata.insert(
            "legal_entities".into(),
            json!(
                spans
                    .iter()
                    .map(|s| json!({
                        "type": s.kind,
                        "text": s.text,
                        "span": [s.start, s.end],
                    }))
                    .collect::<Vec<_>>()
            ),
        );

        record.push_step(
            self.name(),
            json!({
                "token_count": token_count,
                "legal_entity_count": spans.len(),
                "preserve_citations": self.options.preserve_citations,
                "preserve_case_names": self.options.preserve_case_names,
                "preserve_statute_refs": self.options.preserve_statute_refs,
                "preserve_section_refs": self.options.preserve_section_refs,
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

    #[test]
    fn preserves_citation_as_single_token() {
        let tokenizer = LegalTokenizer::with_defaults();
        let mut rec = record("The Court cited 410 U.S. 113 in its opinion.");
        tokenizer.apply(&mut rec).expect("apply");

        let tokens = rec.tokens.as_deref().unwrap();
        assert!(tokens.contains(&"410 U.S. 113".to_string()));
        assert!(tokens.contains(&"opinion".to_string()));
    }

    #[test]
    fn preserves_case_name_as_single_token() {
        let tokenizer = LegalTokenizer::with_defaults();
        let mut rec = record("Miranda v. Arizona controls the outcome here.");
        tokenizer.apply(&mut rec).expect("apply");

        let tokens = rec.tokens.as_deref().unwrap();
        assert!(tokens.contains(&"Miranda v. Arizona".to_string()));
    }

    #[test]
    fn overlapping_statute_and_section_spans_are_merged() {
        let tokenizer = LegalTokenizer::with_defaults();
        let mut rec = record("A claim under 42 U.S.C. § 1983 requires state action.");
        tokenizer.apply(&mut rec).expect("apply");

        // The statute match starts earlier and subsumes the section match;
        // only one entity survives the merge.
        let entities = rec.processing_metadata["legal_entities"]
            .as_array()
            .unwrap()
            .clone();
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0]["type"], "statute");

        let tokens = rec.tokens.as_deref().unwrap();
        assert!(tokens.contains(&"42 U.S.C. § 1983".to_string()));
    }

    #[test]
    fn standalone_section_reference_is_preserved() {
        let tokenizer = LegalTokenizer::with_defaults();
        let mut rec = record("Immunity under § 230 is broad.");
        tokenizer.apply(&mut rec).expect("apply");

        let tokens = rec.tokens.as_deref().unwrap();
        assert!(tokens.contains(&"§ 230".to_string()));
    }

    #[test]
    fn records_entities_with_spans() {
        let tokenizer = LegalTokenizer::with_defaults();
        let mut rec = record("See 410 U.S. 113 and § 230.");
        tokenizer.apply(&mut rec).expect("apply");

        let entities = rec.processing_metadata["legal_entities"]
            .as_array()
            .unwrap()
            .clone();
        assert_eq!(entities.len(), 2);
        for entity in &entities {
            let span = entity["span"].as_array().unwrap();
            let start = span[0].as_u64().unwrap() as usize;
            let end = span[1].as_u64().unwrap() as usize;
            assert_eq!(rec.text[start..end], *entity["text"].as_str().unwrap());
        }
    }

    #[test]
    fn plain_text_tokenizes_normally() {
        let tokenizer = LegalTokenizer::with_defaults();
        let mut rec = record("No entities appear here.");
        tokenizer.apply(&mut rec).expect("apply");

        assert_eq!(
            rec.tokens.as_deref().unwrap(),
            ["No", "entities", "appear", "here", "."]
        );
        assert_eq!(rec.token_count, Some(5));
    }
}
