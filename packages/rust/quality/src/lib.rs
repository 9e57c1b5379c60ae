//! Quality assessment and content filtering stages.
//!
//! - [`QualityScorer`] — composite quality score from text statistics
//! - [`ContentFilter`] — threshold/pattern checks with keep-or-drop policy

mod filter;
mod scorer;

pub use filter::{ContentFilter, FilterOptions};
pub use scorer::{QualityOptions, QualityScorer};
