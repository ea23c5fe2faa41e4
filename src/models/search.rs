//! Retrieval results returned by the read path.

use serde::{Deserialize, Serialize};

use super::document::StoredChunk;

/// A retrieved chunk with its similarity score.
///
/// Scores are cosine-like (higher is better). They are not bounded to
/// `[-1, 1]` by contract, though normalized embeddings keep them there in
/// practice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalMatch {
    pub chunk: StoredChunk,
    pub score: f32,
}

/// A retrieval match enriched with a human-readable snippet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub chunk: StoredChunk,
    pub score: f32,
    pub snippet: String,
}

/// Result set for one search request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchOutcome {
    /// Original query text.
    pub query: String,
    /// Query variants used for retrieval, original first.
    pub variants: Vec<String>,
    pub hits: Vec<SearchHit>,
    pub duration_ms: u64,
}

impl SearchOutcome {
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }
}
