//! Semantic resolver used as the last structural fallback when locating targets.
//!
//! Texts are embedded as hashed, L2-normalised bag-of-words vectors and
//! ranked by cosine similarity.

pub mod embedding;
pub mod resolver;

pub use embedding::{tokenize, HashingEmbedder, SparseVector, DEFAULT_DIM};
pub use resolver::{RankedCandidate, SemanticResolver};
