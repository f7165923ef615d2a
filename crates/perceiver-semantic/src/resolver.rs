use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::embedding::{HashingEmbedder, SparseVector};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RankedCandidate {
    /// Position in indexing order.
    pub index: usize,
    pub text: String,
    pub score: f32,
}

/// Cosine ranking of indexed candidate texts against a query.
#[derive(Clone, Debug, Default)]
pub struct SemanticResolver {
    embedder: HashingEmbedder,
    docs: Vec<String>,
    vectors: Vec<SparseVector>,
}

impl SemanticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn index<I, S>(&mut self, texts: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for text in texts {
            let text = text.into();
            self.vectors.push(self.embedder.embed(&text));
            self.docs.push(text);
        }
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Top `k` by cosine similarity; equal scores keep insertion order.
    pub fn rank(&self, query: &str, k: usize) -> Vec<RankedCandidate> {
        let query_vec = self.embedder.embed(query);
        let mut scored: Vec<RankedCandidate> = self
            .vectors
            .iter()
            .zip(&self.docs)
            .enumerate()
            .map(|(index, (vector, text))| RankedCandidate {
                index,
                text: text.clone(),
                score: query_vec.dot(vector),
            })
            .collect();
        // Stable sort keeps insertion order among ties.
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(k);
        debug!(query, candidates = self.docs.len(), top = ?scored.first().map(|c| &c.text), "semantic rank");
        scored
    }

    /// Best candidate with a non-zero score.
    pub fn best(&self, query: &str) -> Option<RankedCandidate> {
        self.rank(query, 1).into_iter().find(|c| c.score > 0.0)
    }
}
