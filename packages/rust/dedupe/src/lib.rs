//! Batch-scoped near-duplicate detection.
//!
//! The [`Deduplicator`] is the one stage that needs a whole batch at
//! once: later records' duplicate decisions depend on which earlier
//! records were accepted as unique. State lives only for the duration of
//! a single `apply_batch` call — two identical documents in different
//! batches are never matched against each other.

mod method;
mod signature;

pub use method::{DedupeMethod, HashAlgorithm};
pub use signature::{hamming_similarity, jaccard_similarity, shingle_set, simhash};

use serde::{Deserialize, Serialize};
use serde_json::json;

use lexforge_shared::{BatchStage, LexForgeError, ProcessingRecord, Result, StagePhase};

/// Options for [`Deduplicator`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupeOptions {
    /// Detection method.
    pub method: DedupeMethod,
    /// Digest used by the exact method.
    pub hash_function: HashAlgorithm,
    /// Similarity threshold for the approximate methods.
    pub similarity_threshold: f64,
    /// Character k-gram width for the approximate methods.
    pub ngram_size: usize,
    /// Return only the first occurrence of each duplicate group.
    pub keep_first: bool,
}

impl Default for DedupeOptions {
    fn default() -> Self {
        Self {
            method: DedupeMethod::Exact,
            hash_function: HashAlgorithm::Md5,
            similarity_threshold: 0.9,
            ngram_size: 3,
            keep_first: true,
        }
    }
}

/// Batch-scoped duplicate elimination stage.
///
/// All methods annotate every record with `duplicate` (and `duplicate_of`
/// / `similarity` where applicable) before any removal, and append one
/// history entry per record. With `keep_first` the returned batch
/// contains only the keepers, in their original order; otherwise the full
/// annotated batch is returned unremoved.
pub struct Deduplicator {
    options: DedupeOptions,
}

impl Deduplicator {
    /// Build a deduplicator, validating thresholds.
    ///
    /// Method and hash names arriving as strings are validated by their
    /// `FromStr`/serde parsers before this point; the remaining numeric
    /// checks happen here, before any document is touched.
    pub fn new(options: DedupeOptions) -> Result<Self> {
        if !(0.0..=1.0).contains(&options.similarity_threshold) {
            return Err(LexForgeError::config(format!(
                "similarity_threshold must be within [0, 1], got {}",
                options.similarity_threshold
            )));
        }
        if options.ngram_size == 0 {
            return Err(LexForgeError::config("ngram_size must be at least 1"));
        }
        Ok(Self { options })
    }

    /// Deduplicator with default options (exact MD5, keep first).
    pub fn with_defaults() -> Self {
        Self::new(DedupeOptions::default()).expect("default options are valid")
    }

    fn dedupe_exact(&self, batch: &mut [ProcessingRecord]) {
        use std::collections::HashMap;

        let mut seen: HashMap<String, String> = HashMap::new();

        for record in batch.iter_mut() {
            let digest = self.options.hash_function.hex_digest(record.text.as_bytes());

            match seen.get(&digest) {
                Some(keeper_id) => {
                    record
                        .processing_metadata
                        .insert("duplicate".into(), json!(true));
                    record
                        .processing_metadata
                        .insert("duplicate_of".into(), json!(keeper_id));
                }
                None => {
                    seen.insert(digest, record.id.clone());
                    record
                        .processing_metadata
                        .insert("duplicate".into(), json!(false));
                }
            }

            record.push_step(
                "deduplication",
                json!({
                    "method": self.options.method,
                    "hash_function": self.options.hash_function,
                    "is_duplicate": record.is_duplicate(),
                }),
            );
        }
    }

    fn dedupe_simhash(&self, batch: &mut [ProcessingRecord]) {
        // Accepted uniques in insertion order; first match wins, not best.
        let mut uniques: Vec<(String, u64)> = Vec::new();

        for record in batch.iter_mut() {
            let sig = simhash(&record.text, self.options.ngram_size);

            let matched = uniques.iter().find_map(|(id, unique_sig)| {
                let similarity = hamming_similarity(sig, *unique_sig);
                (similarity >= self.options.similarity_threshold).then_some((id.clone(), similarity))
            });

            let is_new = matched.is_none();
            self.annotate_approximate(record, matched);
            if is_new {
                uniques.push((record.id.clone(), sig));
            }
        }
    }

    fn dedupe_jaccard(&self, batch: &mut [ProcessingRecord]) {
        use std::collections::HashSet;

        let mut uniques: Vec<(String, HashSet<String>)> = Vec::new();

        for record in batch.iter_mut() {
            let shingles = shingle_set(&record.text, self.options.ngram_size);

            let matched = uniques.iter().find_map(|(id, unique_shingles)| {
                let similarity = jaccard_similarity(&shingles, unique_shingles);
                (similarity >= self.options.similarity_threshold).then_some((id.clone(), similarity))
            });

            let is_new = matched.is_none();
            self.annotate_approximate(record, matched);
            if is_new {
                uniques.push((record.id.clone(), shingles));
            }
        }
    }

    /// Shared annotation for the approximate methods.
    fn annotate_approximate(&self, record: &mut ProcessingRecord, matched: Option<(String, f64)>) {
        match matched {
            Some((keeper_id, similarity)) => {
                record
                    .processing_metadata
                    .insert("duplicate".into(), json!(true));
                record
                    .processing_metadata
                    .insert("duplicate_of".into(), json!(keeper_id));
                record
                    .processing_metadata
                    .insert("similarity".into(), json!(similarity));
            }
            None => {
                record
                    .processing_metadata
                    .insert("duplicate".into(), json!(false));
            }
        }

        record.push_step(
            "deduplication",
            json!({
                "method": self.options.method,
                "ngram_size": self.options.ngram_size,
                "similarity_threshold": self.options.similarity_threshold,
                "is_duplicate": record.is_duplicate(),
            }),
        );
    }
}

impl BatchStage for Deduplicator {
    fn name(&self) -> &'static str {
        "deduplication"
    }

    fn phase(&self) -> StagePhase {
        StagePhase::Deduplication
    }

    fn apply_batch(&self, mut batch: Vec<ProcessingRecord>) -> Result<Vec<ProcessingRecord>> {
        match self.options.method {
            DedupeMethod::Exact => self.dedupe_exact(&mut batch),
            DedupeMethod::SimHash => self.dedupe_simhash(&mut batch),
            DedupeMethod::Jaccard => self.dedupe_jaccard(&mut batch),
        }

        let duplicates = batch.iter().filter(|r| r.is_duplicate()).count();
        tracing::debug!(
            method = %serde_json::to_string(&self.options.method).unwrap_or_default(),
            batch_size = batch.len(),
            duplicates,
            "deduplication pass complete"
        );

        if self.options.keep_first {
            Ok(batch.into_iter().filter(|r| !r.is_duplicate()).collect())
        } else {
            Ok(batch)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexforge_shared::RawDocument;

    fn record(id: &str, text: &str) -> ProcessingRecord {
        ProcessingRecord::from_raw(RawDocument {
            id: id.into(),
            text: text.into(),
            metadata: Default::default(),
            source: "test".into(),
            source_id: format!("t-{id}"),
        })
    }

    fn ids(batch: &[ProcessingRecord]) -> Vec<&str> {
        batch.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn exact_md5_keeps_first_of_each_group() {
        let dedupe = Deduplicator::with_defaults();
        let batch = vec![
            record("a", "Hello world."),
            record("b", "Hello world."),
            record("c", "Something else entirely different."),
        ];

        let result = dedupe.apply_batch(batch).expect("apply");
        assert_eq!(ids(&result), ["a", "c"]);
    }

    #[test]
    fn exact_annotates_duplicates_when_keeping_all() {
        let dedupe = Deduplicator::new(DedupeOptions {
            keep_first: false,
            ..DedupeOptions::default()
        })
        .expect("valid options");

        let batch = vec![
            record("a", "Hello world."),
            record("b", "Hello world."),
            record("c", "Something else entirely different."),
        ];

        let result = dedupe.apply_batch(batch).expect("apply");
        assert_eq!(ids(&result), ["a", "b", "c"]);
        assert!(!result[0].is_duplicate());
        assert!(result[1].is_duplicate());
        assert_eq!(
            result[1].processing_metadata["duplicate_of"],
            json!("a")
        );
        assert!(!result[2].is_duplicate());
    }

    #[test]
    fn exact_group_of_k_leaves_n_minus_k_plus_one() {
        let dedupe = Deduplicator::with_defaults();
        let mut batch: Vec<ProcessingRecord> = (0..4)
            .map(|i| record(&format!("dup-{i}"), "identical body"))
            .collect();
        batch.push(record("solo", "a different body"));

        let result = dedupe.apply_batch(batch).expect("apply");
        // n=5, k=4 sharing a text: 5 - 4 + 1 = 2 survive.
        assert_eq!(ids(&result), ["dup-0", "solo"]);
    }

    #[test]
    fn sha256_digest_also_works() {
        let dedupe = Deduplicator::new(DedupeOptions {
            hash_function: HashAlgorithm::Sha256,
            ..DedupeOptions::default()
        })
        .expect("valid options");

        let batch = vec![record("a", "same"), record("b", "same")];
        let result = dedupe.apply_batch(batch).expect("apply");
        assert_eq!(ids(&result), ["a"]);
    }

    #[test]
    fn simhash_flags_near_duplicates() {
        let dedupe = Deduplicator::new(DedupeOptions {
            method: DedupeMethod::SimHash,
            similarity_threshold: 0.85,
            keep_first: false,
            ..DedupeOptions::default()
        })
        .expect("valid options");

        let base = "The district court granted summary judgment to the defendant \
                    on all claims, and the plaintiff appealed the ruling.";
        let near = "The district court granted summary judgment to the defendant \
                    on all claims, and the plaintiff appealed that ruling.";
        let far = "Completely unrelated text about maritime insurance contracts \
                   and the doctrine of uberrimae fidei in admiralty law.";

        let result = dedupe
            .apply_batch(vec![record("a", base), record("b", near), record("c", far)])
            .expect("apply");

        assert!(!result[0].is_duplicate());
        assert!(result[1].is_duplicate());
        assert_eq!(result[1].processing_metadata["duplicate_of"], json!("a"));
        assert!(result[1].processing_metadata["similarity"].as_f64().unwrap() >= 0.85);
        assert!(!result[2].is_duplicate());
    }

    #[test]
    fn jaccard_flags_identical_shingle_sets() {
        let dedupe = Deduplicator::new(DedupeOptions {
            method: DedupeMethod::Jaccard,
            similarity_threshold: 0.8,
            keep_first: true,
            ..DedupeOptions::default()
        })
        .expect("valid options");

        let result = dedupe
            .apply_batch(vec![
                record("a", "the quick brown fox jumps over the lazy dog"),
                record("b", "the quick brown fox jumps over the lazy dog"),
                record("c", "completely different content with other words"),
            ])
            .expect("apply");

        assert_eq!(ids(&result), ["a", "c"]);
    }

    #[test]
    fn approximate_methods_are_deterministic() {
        for method in [DedupeMethod::SimHash, DedupeMethod::Jaccard] {
            let make_batch = || {
                vec![
                    record("a", "some legal text about appellate procedure and review"),
                    record("b", "some legal text about appellate procedure and review!"),
                    record("c", "an entirely distinct body of contract law analysis"),
                ]
            };
            let dedupe = Deduplicator::new(DedupeOptions {
                method,
                similarity_threshold: 0.7,
                keep_first: false,
                ..DedupeOptions::default()
            })
            .expect("valid options");

            let first: Vec<bool> = dedupe
                .apply_batch(make_batch())
                .expect("apply")
                .iter()
                .map(|r| r.is_duplicate())
                .collect();
            let second: Vec<bool> = dedupe
                .apply_batch(make_batch())
                .expect("apply")
                .iter()
                .map(|r| r.is_duplicate())
                .collect();
            assert_eq!(first, second);
        }
    }

    #[test]
    fn every_record_gets_a_history_entry() {
        let dedupe = Deduplicator::new(DedupeOptions {
            keep_first: false,
            ..DedupeOptions::default()
        })
        .expect("valid options");

        let result = dedupe
            .apply_batch(vec![record("a", "same"), record("b", "same")])
            .expect("apply");

        for rec in &result {
            assert_eq!(rec.processing_history.last().unwrap(), "deduplication");
        }
    }

    #[test]
    fn out_of_range_threshold_rejected() {
        let result = Deduplicator::new(DedupeOptions {
            similarity_threshold: 1.5,
            ..DedupeOptions::default()
        });
        assert!(result.is_err());
    }
}
