//! The write-path and read-path pipelines.
//!
//! `IndexPipeline` turns raw document text into vector points: plan chunk
//! boundaries, materialize chunk text, embed, and synchronize the vector
//! index. `SearchPipeline` goes the other way: expand the query, retrieve
//! with max-score fusion, and decorate each hit with a snippet.

use std::sync::Arc;
use std::time::Instant;

use crate::error::{IngestError, SearchError};
use crate::models::{SearchHit, SearchOutcome, StoredChunk};
use crate::services::embedding::EmbeddingProvider;
use crate::services::materializer::materialize;
use crate::services::planner::TextChunkPlanner;
use crate::services::retriever::MultiQueryRetriever;
use crate::services::snippet::{build_snippet, extract_keywords};
use crate::services::sync::VectorStoreSynchronizer;

pub struct IndexPipeline {
    planner: TextChunkPlanner,
    embedder: Arc<dyn EmbeddingProvider>,
    sync: VectorStoreSynchronizer,
}

impl IndexPipeline {
    pub fn new(
        planner: TextChunkPlanner,
        embedder: Arc<dyn EmbeddingProvider>,
        sync: VectorStoreSynchronizer,
    ) -> Self {
        Self {
            planner,
            embedder,
            sync,
        }
    }

    /// Index one document's content, replacing whatever was indexed before.
    ///
    /// Empty or whitespace-only content plans to zero chunks, which clears
    /// the document's existing points.
    pub async fn ingest(
        &self,
        doc_id: &str,
        content: &str,
    ) -> Result<Vec<StoredChunk>, IngestError> {
        let boundaries = self.planner.plan(content)?;
        if boundaries.is_empty() {
            tracing::debug!(doc_id, "empty chunk plan, clearing indexed points");
            self.sync.delete_doc_chunks(doc_id).await.map_err(IngestError::Sync)?;
            return Ok(Vec::new());
        }

        let materials = materialize(content, &boundaries);
        let texts: Vec<String> = materials.iter().map(|m| m.text.clone()).collect();
        tracing::debug!(doc_id, chunks = texts.len(), "embedding document chunks");
        let embeddings = self.embedder.embed_documents(texts).await?;

        let chunks = self
            .sync
            .upsert_doc_chunks(doc_id, &materials, embeddings)
            .await?;
        tracing::info!(doc_id, chunks = chunks.len(), "document indexed");
        Ok(chunks)
    }

    /// Remove a deleted document's points from the vector index.
    pub async fn remove(&self, doc_id: &str) -> Result<(), IngestError> {
        self.sync.delete_doc_chunks(doc_id).await?;
        Ok(())
    }
}

pub struct SearchPipeline {
    retriever: MultiQueryRetriever,
}

impl SearchPipeline {
    pub fn new(retriever: MultiQueryRetriever) -> Self {
        Self { retriever }
    }

    /// Search the index, optionally scoped to a set of document ids, and
    /// build a display snippet for every hit.
    pub async fn search(
        &self,
        doc_ids: &[String],
        query: &str,
        top_k: u64,
    ) -> Result<SearchOutcome, SearchError> {
        let started = Instant::now();
        let outcome = self.retriever.retrieve(doc_ids, query, top_k).await?;
        let keywords = extract_keywords(query, &outcome.variants);

        let hits: Vec<SearchHit> = outcome
            .matches
            .into_iter()
            .map(|m| {
                let snippet = build_snippet(&m.chunk.text, &keywords);
                SearchHit {
                    chunk: m.chunk,
                    score: m.score,
                    snippet,
                }
            })
            .collect();

        let duration_ms = started.elapsed().as_millis() as u64;
        tracing::info!(
            query,
            variants = outcome.variants.len(),
            hits = hits.len(),
            duration_ms,
            "search completed"
        );
        Ok(SearchOutcome {
            query: query.trim().to_string(),
            variants: outcome.variants,
            hits,
            duration_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CompletionError, EmbeddingError};
    use crate::models::ChunkingConfig;
    use crate::services::completion::ChatCompleter;
    use crate::services::expander::QueryExpander;
    use crate::services::vector_store::{MemoryBackend, VectorStore};
    use async_trait::async_trait;

    /// Deterministic embedder: vector derived from text bytes so identical
    /// text always embeds identically.
    struct HashEmbedder;

    fn text_vector(text: &str) -> Vec<f32> {
        let mut acc = [0.0f32; 4];
        for (i, b) in text.bytes().enumerate() {
            acc[i % 4] += b as f32;
        }
        let norm = acc.iter().map(|v| v * v).sum::<f32>().sqrt().max(1.0);
        acc.iter().map(|v| v / norm).collect()
    }

    #[async_trait]
    impl EmbeddingProvider for HashEmbedder {
        async fn embed_documents(
            &self,
            texts: Vec<String>,
        ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            Ok(texts.iter().map(|t| text_vector(t)).collect())
        }

        async fn embed_queries(
            &self,
            texts: Vec<String>,
        ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            Ok(texts.iter().map(|t| text_vector(t)).collect())
        }

        fn model(&self) -> &str {
            "hash"
        }

        fn dimension(&self) -> u32 {
            4
        }
    }

    struct SilentCompleter;

    #[async_trait]
    impl ChatCompleter for SilentCompleter {
        async fn complete(&self, _system: &str, _user: &str) -> Result<String, CompletionError> {
            Err(CompletionError::ConnectionError("offline".into()))
        }
    }

    fn index_pipeline(store: Arc<MemoryBackend>) -> IndexPipeline {
        IndexPipeline::new(
            TextChunkPlanner::new(&ChunkingConfig::default()),
            Arc::new(HashEmbedder),
            VectorStoreSynchronizer::new(store),
        )
    }

    fn search_pipeline(store: Arc<MemoryBackend>) -> SearchPipeline {
        SearchPipeline::new(MultiQueryRetriever::new(
            Arc::new(HashEmbedder),
            store,
            QueryExpander::new(Arc::new(SilentCompleter), 5),
        ))
    }

    fn init_logging() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    #[tokio::test]
    async fn test_ingest_then_search_round_trip() {
        init_logging();
        let store = Arc::new(MemoryBackend::new("test".into()));
        let pipeline = index_pipeline(store.clone());

        let chunks = pipeline
            .ingest("doc1", "Rust ships a borrow checker.")
            .await
            .unwrap();
        assert_eq!(chunks.len(), 1);

        let search = search_pipeline(store);
        let outcome = search
            .search(&[], "Rust ships a borrow checker.", 5)
            .await
            .unwrap();
        assert_eq!(outcome.hits.len(), 1);
        assert_eq!(outcome.hits[0].chunk.doc_id, "doc1");
        assert!(!outcome.hits[0].snippet.is_empty());
    }

    #[tokio::test]
    async fn test_ingest_blank_content_clears_points() {
        let store = Arc::new(MemoryBackend::new("test".into()));
        let pipeline = index_pipeline(store.clone());

        pipeline.ingest("doc1", "some content here").await.unwrap();
        assert_eq!(store.len(), 1);

        let chunks = pipeline.ingest("doc1", "   \n  ").await.unwrap();
        assert!(chunks.is_empty());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_reingest_replaces_points() {
        let store = Arc::new(MemoryBackend::new("test".into()));
        let pipeline = index_pipeline(store.clone());

        pipeline.ingest("doc1", "first version").await.unwrap();
        pipeline.ingest("doc1", "second version").await.unwrap();

        assert_eq!(store.len(), 1);
        let ids = store.list_point_ids("doc1").await.unwrap();
        assert_eq!(ids.len(), 1);
        assert_eq!(ids[0], StoredChunk::point_id("doc1", "second version"));
    }

    #[tokio::test]
    async fn test_remove_clears_only_target_document() {
        let store = Arc::new(MemoryBackend::new("test".into()));
        let pipeline = index_pipeline(store.clone());

        pipeline.ingest("doc1", "alpha content").await.unwrap();
        pipeline.ingest("doc2", "beta content").await.unwrap();

        pipeline.remove("doc1").await.unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.list_point_ids("doc1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_scoped_to_documents() {
        let store = Arc::new(MemoryBackend::new("test".into()));
        let pipeline = index_pipeline(store.clone());

        pipeline.ingest("doc1", "async runtimes in depth").await.unwrap();
        pipeline.ingest("doc2", "garbage collection basics").await.unwrap();

        let search = search_pipeline(store);
        let outcome = search
            .search(&["doc2".to_string()], "async runtimes", 5)
            .await
            .unwrap();
        assert!(outcome.hits.iter().all(|h| h.chunk.doc_id == "doc2"));
    }
}
