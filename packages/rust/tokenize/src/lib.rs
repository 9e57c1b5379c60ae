//! Tokenization stages for the LexForge pipeline.
//!
//! - [`SentenceSplitter`] — sentence segmentation with word-count filtering
//! - [`WordSplitter`] — word/punctuation tokens onto the record
//! - [`LegalTokenizer`] — entity-preserving tokenization for legal text

mod legal;
mod sentence;
mod word;

pub use legal::{LegalTokenizeOptions, LegalTokenizer};
pub use sentence::{SentenceOptions, SentenceSplitter};
pub use word::{WordOptions, WordSplitter, word_tokens};
