//! In-memory vector store backend.
//!
//! Brute-force cosine similarity over a hash map. Used by tests and small
//! embedded deployments; semantics mirror the Qdrant backend.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use super::{PointRecord, ScoredPoint, VectorStore};
use crate::error::VectorStoreError;
use crate::models::StoredChunk;

#[derive(Debug, Default)]
pub struct MemoryBackend {
    collection: String,
    points: RwLock<HashMap<String, (Vec<f32>, StoredChunk)>>,
}

impl MemoryBackend {
    pub fn new(collection: String) -> Self {
        Self {
            collection,
            points: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored points.
    pub fn len(&self) -> usize {
        self.points.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn cosine_sim(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[async_trait]
impl VectorStore for MemoryBackend {
    async fn ensure_collection(&self) -> Result<(), VectorStoreError> {
        Ok(())
    }

    async fn upsert_points(&self, points: Vec<PointRecord>) -> Result<(), VectorStoreError> {
        let mut guard = self.points.write().expect("lock poisoned");
        for point in points {
            guard.insert(point.id, (point.vector, point.chunk));
        }
        Ok(())
    }

    async fn search(
        &self,
        vector: Vec<f32>,
        limit: u64,
        doc_ids: &[String],
    ) -> Result<Vec<ScoredPoint>, VectorStoreError> {
        let guard = self.points.read().expect("lock poisoned");
        let mut matches: Vec<ScoredPoint> = guard
            .values()
            .filter(|(_, chunk)| doc_ids.is_empty() || doc_ids.contains(&chunk.doc_id))
            .map(|(stored_vector, chunk)| ScoredPoint {
                chunk: chunk.clone(),
                score: cosine_sim(&vector, stored_vector),
            })
            .collect();
        matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        matches.truncate(limit as usize);
        Ok(matches)
    }

    async fn list_point_ids(&self, doc_id: &str) -> Result<Vec<String>, VectorStoreError> {
        let guard = self.points.read().expect("lock poisoned");
        Ok(guard
            .iter()
            .filter(|(_, (_, chunk))| chunk.doc_id == doc_id)
            .map(|(id, _)| id.clone())
            .collect())
    }

    async fn delete_points(&self, ids: Vec<String>) -> Result<(), VectorStoreError> {
        let mut guard = self.points.write().expect("lock poisoned");
        for id in ids {
            guard.remove(&id);
        }
        Ok(())
    }

    async fn delete_by_doc_id(&self, doc_id: &str) -> Result<(), VectorStoreError> {
        let mut guard = self.points.write().expect("lock poisoned");
        guard.retain(|_, (_, chunk)| chunk.doc_id != doc_id);
        Ok(())
    }

    fn collection(&self) -> &str {
        &self.collection
    }
}
