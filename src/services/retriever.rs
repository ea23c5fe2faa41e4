//! Multi-query retrieval with max-score fusion.
//!
//! Each query variant runs its own vector search; the per-variant result
//! lists are merged into one ranking keyed by chunk id. A chunk found by
//! several variants keeps its best score, and on an exact tie the earliest
//! variant's hit wins, so fusion is deterministic regardless of which
//! search task finishes first.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::task::JoinSet;

use crate::error::{SearchError, VectorStoreError};
use crate::models::RetrievalMatch;
use crate::services::embedding::EmbeddingProvider;
use crate::services::expander::QueryExpander;
use crate::services::vector_store::{ScoredPoint, VectorStore};
use crate::utils::text::is_blank;

/// Result of one retrieval pass: the variants actually searched plus the
/// fused ranking.
#[derive(Debug)]
pub struct RetrievalOutcome {
    pub variants: Vec<String>,
    pub matches: Vec<RetrievalMatch>,
}

pub struct MultiQueryRetriever {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    expander: QueryExpander,
}

impl MultiQueryRetriever {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        expander: QueryExpander,
    ) -> Self {
        Self {
            embedder,
            store,
            expander,
        }
    }

    pub async fn retrieve(
        &self,
        doc_ids: &[String],
        query: &str,
        top_k: u64,
    ) -> Result<RetrievalOutcome, SearchError> {
        if is_blank(query) {
            return Err(SearchError::QueryRequired);
        }

        let variants = self.expander.expand(query).await;
        let vectors = self.embedder.embed_queries(variants.clone()).await?;
        if vectors.is_empty() {
            return Err(SearchError::EmbeddingFailed);
        }

        // Per-variant searches run concurrently; over-fetching top_k per
        // variant keeps the fused ranking stable when variants overlap.
        let mut tasks = JoinSet::new();
        for (index, vector) in vectors.into_iter().enumerate() {
            let store = self.store.clone();
            let doc_ids = doc_ids.to_vec();
            tasks.spawn(async move {
                let result = store.search(vector, top_k, &doc_ids).await;
                (index, result)
            });
        }

        let mut per_variant: Vec<Vec<ScoredPoint>> = vec![Vec::new(); variants.len()];
        while let Some(joined) = tasks.join_next().await {
            let (index, result) = joined
                .map_err(|e| VectorStoreError::SearchError(format!("search task failed: {e}")))?;
            per_variant[index] = result?;
        }

        Ok(RetrievalOutcome {
            variants,
            matches: fuse(per_variant, top_k as usize),
        })
    }
}

/// Merge variant result lists into one ranking, keeping each chunk's
/// maximum score.
fn fuse(per_variant: Vec<Vec<ScoredPoint>>, top_k: usize) -> Vec<RetrievalMatch> {
    let mut best: HashMap<String, RetrievalMatch> = HashMap::new();
    for points in per_variant {
        for point in points {
            match best.get_mut(&point.chunk.id) {
                Some(existing) if point.score > existing.score => {
                    existing.score = point.score;
                }
                Some(_) => {}
                None => {
                    best.insert(
                        point.chunk.id.clone(),
                        RetrievalMatch {
                            chunk: point.chunk,
                            score: point.score,
                        },
                    );
                }
            }
        }
    }

    let mut matches: Vec<RetrievalMatch> = best.into_values().collect();
    matches.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.chunk.id.cmp(&b.chunk.id))
    });
    matches.truncate(top_k);
    matches
}
