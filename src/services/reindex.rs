//! Background reindex sweep.
//!
//! When the embedding model changes, previously indexed vectors live in a
//! different space than new queries. The sweep finds documents whose stored
//! model tag differs from the current one, re-runs the index pipeline for
//! each, and stamps the new model on success. One document failing never
//! stops the sweep.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::error::ReindexError;
use crate::services::pipeline::IndexPipeline;
use crate::store::DocumentStore;
use crate::utils::text::is_blank;

/// Outcome counters for one sweep.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReindexReport {
    pub scanned: usize,
    pub reindexed: usize,
    pub skipped: usize,
    pub failed: usize,
}

pub struct ReindexOrchestrator {
    store: Arc<dyn DocumentStore>,
    pipeline: Arc<IndexPipeline>,
    model: String,
    concurrency: usize,
}

impl ReindexOrchestrator {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        pipeline: Arc<IndexPipeline>,
        model: String,
        concurrency: u32,
    ) -> Self {
        Self {
            store,
            pipeline,
            model,
            concurrency: (concurrency as usize).max(1),
        }
    }

    /// Reindex every document not indexed with the current model.
    pub async fn run(&self) -> Result<ReindexReport, ReindexError> {
        let candidates = self.store.reindex_candidates(&self.model).await?;
        let mut report = ReindexReport {
            scanned: candidates.len(),
            ..Default::default()
        };
        if candidates.is_empty() {
            tracing::info!(model = %self.model, "reindex sweep found nothing to do");
            return Ok(report);
        }

        tracing::info!(
            model = %self.model,
            candidates = candidates.len(),
            concurrency = self.concurrency,
            "starting reindex sweep"
        );

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();

        for candidate in candidates {
            if is_blank(&candidate.content) {
                tracing::warn!(doc_id = %candidate.id, "skipping document with blank content");
                report.skipped += 1;
                continue;
            }

            let semaphore = semaphore.clone();
            let store = self.store.clone();
            let pipeline = self.pipeline.clone();
            let model = self.model.clone();
            tasks.spawn(async move {
                // Holds its permit for the whole document, capping in-flight
                // embedding requests.
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return false;
                };
                let doc_id = candidate.id;

                if let Err(e) = pipeline.ingest(&doc_id, &candidate.content).await {
                    tracing::warn!(doc_id = %doc_id, error = %e, "reindex failed for document");
                    return false;
                }
                if let Err(e) = store.set_embedding_model(&doc_id, &model).await {
                    tracing::warn!(doc_id = %doc_id, error = %e, "failed to record embedding model");
                    return false;
                }
                tracing::debug!(doc_id = %doc_id, "document reindexed");
                true
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(true) => report.reindexed += 1,
                Ok(false) => report.failed += 1,
                Err(e) => {
                    tracing::warn!(error = %e, "reindex task panicked");
                    report.failed += 1;
                }
            }
        }

        tracing::info!(
            scanned = report.scanned,
            reindexed = report.reindexed,
            skipped = report.skipped,
            failed = report.failed,
            "reindex sweep complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{EmbeddingError, StoreError};
    use crate::models::ChunkingConfig;
    use crate::services::embedding::EmbeddingProvider;
    use crate::services::planner::TextChunkPlanner;
    use crate::services::sync::VectorStoreSynchronizer;
    use crate::services::vector_store::MemoryBackend;
    use crate::store::ReindexCandidate;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct FakeStore {
        candidates: Vec<ReindexCandidate>,
        models: Mutex<HashMap<String, String>>,
    }

    impl FakeStore {
        fn new(candidates: Vec<ReindexCandidate>) -> Self {
            Self {
                candidates,
                models: Mutex::new(HashMap::new()),
            }
        }

        fn model_of(&self, doc_id: &str) -> Option<String> {
            self.models.lock().unwrap().get(doc_id).cloned()
        }
    }

    #[async_trait]
    impl DocumentStore for FakeStore {
        async fn reindex_candidates(
            &self,
            _current_model: &str,
        ) -> Result<Vec<ReindexCandidate>, StoreError> {
            Ok(self.candidates.clone())
        }

        async fn set_embedding_model(&self, doc_id: &str, model: &str) -> Result<(), StoreError> {
            self.models
                .lock()
                .unwrap()
                .insert(doc_id.to_string(), model.to_string());
            Ok(())
        }

        async fn fetch_content(&self, doc_id: &str) -> Result<String, StoreError> {
            self.candidates
                .iter()
                .find(|c| c.id == doc_id)
                .map(|c| c.content.clone())
                .ok_or_else(|| StoreError::NotFound(doc_id.to_string()))
        }
    }

    /// Embedder that fails on one marker text to exercise failure isolation.
    struct FlakyEmbedder;

    #[async_trait]
    impl EmbeddingProvider for FlakyEmbedder {
        async fn embed_documents(
            &self,
            texts: Vec<String>,
        ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            if texts.iter().any(|t| t.contains("poison")) {
                return Err(EmbeddingError::ServerError("boom".into()));
            }
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }

        async fn embed_queries(
            &self,
            texts: Vec<String>,
        ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            self.embed_documents(texts).await
        }

        fn model(&self) -> &str {
            "flaky"
        }

        fn dimension(&self) -> u32 {
            2
        }
    }

    fn candidate(id: &str, content: &str) -> ReindexCandidate {
        ReindexCandidate {
            id: id.to_string(),
            content: content.to_string(),
            embedding_model: Some("old-model".to_string()),
        }
    }

    fn orchestrator(store: Arc<FakeStore>) -> ReindexOrchestrator {
        let backend = Arc::new(MemoryBackend::new("test".into()));
        let pipeline = IndexPipeline::new(
            TextChunkPlanner::new(&ChunkingConfig::default()),
            Arc::new(FlakyEmbedder),
            VectorStoreSynchronizer::new(backend),
        );
        ReindexOrchestrator::new(store, Arc::new(pipeline), "new-model".to_string(), 4)
    }

    #[tokio::test]
    async fn test_sweep_updates_model_on_success() {
        let store = Arc::new(FakeStore::new(vec![
            candidate("doc1", "first document body"),
            candidate("doc2", "second document body"),
        ]));
        let report = orchestrator(store.clone()).run().await.unwrap();

        assert_eq!(report.scanned, 2);
        assert_eq!(report.reindexed, 2);
        assert_eq!(report.failed, 0);
        assert_eq!(store.model_of("doc1").as_deref(), Some("new-model"));
        assert_eq!(store.model_of("doc2").as_deref(), Some("new-model"));
    }

    #[tokio::test]
    async fn test_failed_document_does_not_stop_sweep() {
        let store = Arc::new(FakeStore::new(vec![
            candidate("doc1", "fine content"),
            candidate("doc2", "poison content"),
            candidate("doc3", "also fine"),
        ]));
        let report = orchestrator(store.clone()).run().await.unwrap();

        assert_eq!(report.scanned, 3);
        assert_eq!(report.reindexed, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(store.model_of("doc1").as_deref(), Some("new-model"));
        // The failed document keeps its old model tag so the next sweep
        // retries it.
        assert_eq!(store.model_of("doc2"), None);
        assert_eq!(store.model_of("doc3").as_deref(), Some("new-model"));
    }

    #[tokio::test]
    async fn test_blank_content_skipped_without_model_update() {
        let store = Arc::new(FakeStore::new(vec![
            candidate("doc1", "   \n"),
            candidate("doc2", "real content"),
        ]));
        let report = orchestrator(store.clone()).run().await.unwrap();

        assert_eq!(report.skipped, 1);
        assert_eq!(report.reindexed, 1);
        assert_eq!(store.model_of("doc1"), None);
    }

    #[tokio::test]
    async fn test_empty_candidate_list() {
        let store = Arc::new(FakeStore::new(Vec::new()));
        let report = orchestrator(store).run().await.unwrap();
        assert_eq!(report, ReindexReport::default());
    }
}
