//! KMP Text: deterministic text heuristics used when no LLM is available.
//!
//! Everything here is a pure function over strings: spelling normalization,
//! question similarity, and keyword-vote classification into a fixed set
//! of content categories.

pub mod classify;
pub mod normalize;
pub mod similarity;

pub use classify::{category_scores, classify, contains_any, Category};
pub use normalize::{correct_words, normalize};
pub use similarity::{are_similar, similarity_score};
