//! Sparse hashed bag-of-words embedding.

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

pub const DEFAULT_DIM: usize = 512;

/// L2-normalised sparse vector: sorted `(bucket, weight)` pairs.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SparseVector {
    entries: Vec<(usize, f32)>,
}

impl SparseVector {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[(usize, f32)] {
        &self.entries
    }

    pub fn dot(&self, other: &SparseVector) -> f32 {
        let (mut i, mut j) = (0, 0);
        let mut sum = 0.0;
        while i < self.entries.len() && j < other.entries.len() {
            let (a_idx, a_val) = self.entries[i];
            let (b_idx, b_val) = other.entries[j];
            match a_idx.cmp(&b_idx) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    sum += a_val * b_val;
                    i += 1;
                    j += 1;
                }
            }
        }
        sum
    }
}

/// Lowercased ASCII alphanumeric runs.
pub fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(|token| token.to_ascii_lowercase())
}

#[derive(Clone, Copy, Debug)]
pub struct HashingEmbedder {
    dim: usize,
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIM)
    }
}

impl HashingEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(1) }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    fn bucket(&self, token: &str) -> usize {
        // Zero-keyed SipHash, stable across runs.
        let mut hasher = DefaultHasher::new();
        token.hash(&mut hasher);
        (hasher.finish() % self.dim as u64) as usize
    }

    pub fn embed(&self, text: &str) -> SparseVector {
        let mut counts: BTreeMap<usize, f32> = BTreeMap::new();
        for token in tokenize(text) {
            *counts.entry(self.bucket(&token)).or_insert(0.0) += 1.0;
        }
        let norm = counts.values().map(|v| v * v).sum::<f32>().sqrt();
        if norm == 0.0 {
            return SparseVector::default();
        }
        SparseVector {
            entries: counts.into_iter().map(|(idx, v)| (idx, v / norm)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_lowercased_alphanumeric_runs() {
        let tokens: Vec<String> = tokenize("Sign-In now! (v2)").collect();
        assert_eq!(tokens, vec!["sign", "in", "now", "v2"]);
    }

    #[test]
    fn embedding_is_unit_length_and_deterministic() {
        let embedder = HashingEmbedder::default();
        let a = embedder.embed("search the docs search");
        let norm: f32 = a.entries().iter().map(|(_, v)| v * v).sum();
        assert!((norm - 1.0).abs() < 1e-5);
        assert_eq!(a, embedder.embed("SEARCH the docs, search"));
        assert!((a.dot(&a) - 1.0).abs() < 1e-5);
        assert!(embedder.embed("!!!").is_empty());
    }
}
