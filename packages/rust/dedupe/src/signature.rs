//! Similarity primitives: simhash signatures, shingle sets, and the
//! distance measures over them.

use std::collections::HashSet;

use xxhash_rust::xxh3::xxh3_64;

/// Signature width in bits.
const SIGNATURE_BITS: usize = 64;

/// Build a 64-bit simhash signature over character k-grams.
///
/// Every k-gram is hashed with xxh3 (seedless, stable across runs); each
/// bit position accumulates a +1/-1 vote from the corresponding bit of
/// the k-gram hash, and the signature bit is set where the vote is
/// positive. Texts shorter than `ngram_size` characters produce the zero
/// signature.
pub fn simhash(text: &str, ngram_size: usize) -> u64 {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() < ngram_size {
        return 0;
    }

    let mut votes = [0i32; SIGNATURE_BITS];
    let mut gram = String::new();

    for window in chars.windows(ngram_size) {
        gram.clear();
        gram.extend(window.iter());
        let hash = xxh3_64(gram.as_bytes());

        for (bit, vote) in votes.iter_mut().enumerate() {
            if (hash >> bit) & 1 == 1 {
                *vote += 1;
            } else {
                *vote -= 1;
            }
        }
    }

    let mut signature = 0u64;
    for (bit, vote) in votes.iter().enumerate() {
        if *vote > 0 {
            signature |= 1 << bit;
        }
    }
    signature
}

/// Normalized Hamming similarity between two signatures: `1 − distance/64`.
pub fn hamming_similarity(a: u64, b: u64) -> f64 {
    let distance = (a ^ b).count_ones() as f64;
    1.0 - distance / SIGNATURE_BITS as f64
}

/// The set of all character k-grams ("shingles") of `text`.
pub fn shingle_set(text: &str, ngram_size: usize) -> HashSet<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() < ngram_size {
        return HashSet::new();
    }

    chars
        .windows(ngram_size)
        .map(|window| window.iter().collect::<String>())
        .collect()
}

/// Exact Jaccard similarity `|intersection| / |union|`.
/// Empty sets have similarity 0 by convention.
pub fn jaccard_similarity(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count() as f64;
    let union = a.union(b).count() as f64;
    intersection / union
}
