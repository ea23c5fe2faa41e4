//! Vector index synchronization for one document's chunks.
//!
//! Point ids are content-addressed (`UUIDv5(doc_id + "|" + SHA1(text))`), so
//! the upsert is idempotent and order-independent: re-embedding identical
//! text yields the same point, repeated syncs create no duplicates, and
//! partial-failure retries are safe.
//!
//! Sync order is upsert-then-cleanup, never delete-then-upsert: new and
//! changed points land first so a concurrent search never observes a
//! document with zero chunks mid-update; stale points are removed afterward.

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::SyncError;
use crate::models::{ChunkMaterial, StoredChunk};
use crate::services::vector_store::{PointRecord, VectorStore};

pub struct VectorStoreSynchronizer {
    store: Arc<dyn VectorStore>,
}

impl VectorStoreSynchronizer {
    pub fn new(store: Arc<dyn VectorStore>) -> Self {
        Self { store }
    }

    /// Replace a document's chunk set in the vector index.
    ///
    /// `materials` and `embeddings` must be parallel; a length mismatch is an
    /// invariant violation and fails without touching the index. Vector-store
    /// errors propagate: a failed sync is never reported as success.
    pub async fn upsert_doc_chunks(
        &self,
        doc_id: &str,
        materials: &[ChunkMaterial],
        embeddings: Vec<Vec<f32>>,
    ) -> Result<Vec<StoredChunk>, SyncError> {
        if materials.len() != embeddings.len() {
            return Err(SyncError::EmbeddingCountMismatch {
                chunks: materials.len(),
                embeddings: embeddings.len(),
            });
        }

        let created_at = chrono::Utc::now().to_rfc3339();
        let mut chunks = Vec::with_capacity(materials.len());
        let mut points = Vec::with_capacity(materials.len());
        let mut new_ids: HashSet<String> = HashSet::with_capacity(materials.len());

        for (index, (material, vector)) in materials.iter().zip(embeddings).enumerate() {
            let chunk = StoredChunk {
                id: StoredChunk::point_id(doc_id, &material.text),
                doc_id: doc_id.to_string(),
                chunk_index: index as u32,
                text: material.text.clone(),
                start_offset: material.boundary.start as u64,
                end_offset: material.boundary.end as u64,
                label: material.boundary.label.clone(),
                keywords: material.keywords.clone(),
                created_at: created_at.clone(),
            };
            new_ids.insert(chunk.id.clone());
            points.push(PointRecord {
                id: chunk.id.clone(),
                vector,
                chunk: chunk.clone(),
            });
            chunks.push(chunk);
        }

        self.store.ensure_collection().await?;
        self.store.upsert_points(points).await?;

        // Stale-point cleanup: ids that existed for this document before but
        // are not in the new point set.
        let existing = self.store.list_point_ids(doc_id).await?;
        let stale: Vec<String> = existing
            .into_iter()
            .filter(|id| !new_ids.contains(id))
            .collect();
        if !stale.is_empty() {
            tracing::debug!(doc_id, stale = stale.len(), "removing stale chunk points");
            self.store.delete_points(stale).await?;
        }

        Ok(chunks)
    }

    /// Drop every chunk point of a deleted document.
    pub async fn delete_doc_chunks(&self, doc_id: &str) -> Result<(), SyncError> {
        self.store.delete_by_doc_id(doc_id).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChunkBoundary;
    use crate::services::vector_store::MemoryBackend;

    fn material(text: &str, start: usize) -> ChunkMaterial {
        ChunkMaterial {
            boundary: ChunkBoundary::new(start, start + text.len()),
            text: text.to_string(),
            keywords: Vec::new(),
        }
    }

    fn synchronizer() -> (Arc<MemoryBackend>, VectorStoreSynchronizer) {
        let store = Arc::new(MemoryBackend::new("test".into()));
        let sync = VectorStoreSynchronizer::new(store.clone());
        (store, sync)
    }

    #[tokio::test]
    async fn test_double_upsert_is_idempotent() {
        let (store, sync) = synchronizer();
        let materials = vec![material("hello", 0)];
        let embeddings = vec![vec![0.1, 0.2]];

        let first = sync
            .upsert_doc_chunks("doc1", &materials, embeddings.clone())
            .await
            .unwrap();
        let second = sync
            .upsert_doc_chunks("doc1", &materials, embeddings)
            .await
            .unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(first[0].id, second[0].id);
    }

    #[tokio::test]
    async fn test_changed_chunk_changes_only_its_id() {
        let (store, sync) = synchronizer();
        let before = vec![material("alpha", 0), material("beta", 5)];
        let first = sync
            .upsert_doc_chunks("doc1", &before, vec![vec![1.0], vec![2.0]])
            .await
            .unwrap();

        let after = vec![material("alpha", 0), material("beta changed", 5)];
        let second = sync
            .upsert_doc_chunks("doc1", &after, vec![vec![1.0], vec![2.0]])
            .await
            .unwrap();

        // Unchanged chunk keeps its id, the edited one gets a new id, and
        // the stale point for the old text is cleaned up.
        assert_eq!(first[0].id, second[0].id);
        assert_ne!(first[1].id, second[1].id);
        assert_eq!(store.len(), 2);
        let remaining = store.list_point_ids("doc1").await.unwrap();
        assert!(!remaining.contains(&first[1].id));
    }

    #[tokio::test]
    async fn test_count_mismatch_is_fatal_and_writes_nothing() {
        let (store, sync) = synchronizer();
        let err = sync
            .upsert_doc_chunks("doc1", &[material("a", 0)], vec![])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SyncError::EmbeddingCountMismatch {
                chunks: 1,
                embeddings: 0
            }
        ));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_empty_chunk_set_clears_document() {
        let (store, sync) = synchronizer();
        sync.upsert_doc_chunks("doc1", &[material("a", 0)], vec![vec![1.0]])
            .await
            .unwrap();
        sync.upsert_doc_chunks("doc1", &[], vec![]).await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_delete_doc_chunks() {
        let (store, sync) = synchronizer();
        sync.upsert_doc_chunks("doc1", &[material("a", 0)], vec![vec![1.0]])
            .await
            .unwrap();
        sync.upsert_doc_chunks("doc2", &[material("b", 0)], vec![vec![1.0]])
            .await
            .unwrap();

        sync.delete_doc_chunks("doc1").await.unwrap();
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_chunk_metadata_carried() {
        let (_, sync) = synchronizer();
        let mut mat = material("body text", 10);
        mat.boundary.label = Some("Section".to_string());
        mat.keywords = vec!["section".to_string()];
        let chunks = sync
            .upsert_doc_chunks("doc1", &[mat], vec![vec![1.0]])
            .await
            .unwrap();
        assert_eq!(chunks[0].start_offset, 10);
        assert_eq!(chunks[0].end_offset, 19);
        assert_eq!(chunks[0].label.as_deref(), Some("Section"));
        assert_eq!(chunks[0].chunk_index, 0);
    }
}
