//! Method and digest selection for the deduplicator.

use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha256};

use lexforge_shared::LexForgeError;

// ---------------------------------------------------------------------------
// DedupeMethod
// ---------------------------------------------------------------------------

/// Duplicate detection method.
///
/// `minhash` is accepted as the config spelling of [`Self::Jaccard`] for
/// compatibility: the method computes exact Jaccard similarity over full
/// shingle sets rather than hashed sketches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DedupeMethod {
    /// Exact content hashing.
    Exact,
    /// 64-bit bit-signature similarity (Hamming distance).
    #[serde(rename = "simhash")]
    SimHash,
    /// Exact Jaccard similarity over character shingle sets.
    #[serde(rename = "minhash", alias = "jaccard")]
    Jaccard,
}

impl std::str::FromStr for DedupeMethod {
    type Err = LexForgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exact" => Ok(Self::Exact),
            "simhash" => Ok(Self::SimHash),
            "minhash" | "jaccard" => Ok(Self::Jaccard),
            other => Err(LexForgeError::config(format!(
                "unsupported deduplication method '{other}' (expected exact, simhash, or minhash)"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// HashAlgorithm
// ---------------------------------------------------------------------------

/// Digest used by the exact method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    Md5,
    Sha1,
    Sha256,
}

impl HashAlgorithm {
    /// Hex digest of `bytes` under this algorithm.
    pub fn hex_digest(&self, bytes: &[u8]) -> String {
        match self {
            Self::Md5 => format!("{:x}", md5::compute(bytes)),
            Self::Sha1 => {
                let mut hasher = Sha1::new();
                hasher.update(bytes);
                format!("{:x}", hasher.finalize())
            }
            Self::Sha256 => {
                let mut hasher = Sha256::new();
                hasher.update(bytes);
                format!("{:x}", hasher.finalize())
            }
        }
    }
}

impl std::str::FromStr for HashAlgorithm {
    type Err = LexForgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "md5" => Ok(Self::Md5),
            "sha1" => Ok(Self::Sha1),
            "sha256" => Ok(Self::Sha256),
            other => Err(LexForgeError::config(format!(
                "unsupported hash function '{other}' (expected md5, sha1, or sha256)"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_parses_known_names() {
        assert_eq!("exact".parse::<DedupeMethod>().unwrap(), DedupeMethod::Exact);
        assert_eq!(
            "simhash".parse::<DedupeMethod>().unwrap(),
            DedupeMethod::SimHash
        );
        assert_eq!(
            "minhash".parse::<DedupeMethod>().unwrap(),
            DedupeMethod::Jaccard
        );
        assert_eq!(
            "jaccard".parse::<DedupeMethod>().unwrap(),
            DedupeMethod::Jaccard
        );
    }

    #[test]
    fn unknown_method_rejected() {
        assert!("fuzzy".parse::<DedupeMethod>().is_err());
    }

    #[test]
    fn method_serde_spellings() {
        assert_eq!(
            serde_json::to_string(&DedupeMethod::Jaccard).unwrap(),
            "\"minhash\""
        );
        let parsed: DedupeMethod = serde_json::from_str("\"jaccard\"").unwrap();
        assert_eq!(parsed, DedupeMethod::Jaccard);
    }

    #[test]
    fn unknown_hash_rejected() {
        assert!("crc32".parse::<HashAlgorithm>().is_err());
    }

    #[test]
    fn digests_are_stable() {
        // Known digests of the empty string.
        assert_eq!(
            HashAlgorithm::Md5.hex_digest(b""),
            "d41d8cd98f00b204e9800998ecf8427e"
        );
        assert_eq!(
            HashAlgorithm::Sha1.hex_digest(b""),
            "da39a3ee5e6b4b0d3255bfef95601890afd80709"
        );
        assert_eq!(
            HashAlgorithm::Sha256.hex_digest(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn different_texts_different_digests() {
        for algo in [HashAlgorithm::Md5, HashAlgorithm::Sha1, HashAlgorithm::Sha256] {
            assert_ne!(algo.hex_digest(b"one"), algo.hex_digest(b"two"));
        }
    }
}
