//! Vector store abstraction layer.
//!
//! A trait-based abstraction over vector index backends (Qdrant for
//! production, an in-memory store for tests and embedded use). Collections
//! are partitioned by embedding dimensionality: the factory derives the
//! collection name as `<base>_<dimension>`, so switching embedding models
//! never mixes incompatible vector spaces in one index.

mod memory;
mod qdrant;

pub use memory::MemoryBackend;
pub use qdrant::QdrantBackend;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::VectorStoreError;
use crate::models::{StoredChunk, VectorDriver, VectorStoreConfig};

/// A chunk plus its embedding, ready for upsert.
#[derive(Debug, Clone)]
pub struct PointRecord {
    /// Content-addressed point id, see [`StoredChunk::point_id`].
    pub id: String,
    pub vector: Vec<f32>,
    pub chunk: StoredChunk,
}

/// A search match straight from the index.
#[derive(Debug, Clone)]
pub struct ScoredPoint {
    pub chunk: StoredChunk,
    pub score: f32,
}

/// Abstract vector index operations needed by the pipeline.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create the collection if it does not exist.
    async fn ensure_collection(&self) -> Result<(), VectorStoreError>;

    /// Insert or update points. Upserting an existing id replaces it.
    async fn upsert_points(&self, points: Vec<PointRecord>) -> Result<(), VectorStoreError>;

    /// Similarity search, optionally scoped to a set of document ids
    /// (an empty slice means unscoped). Payloads on, raw vectors off.
    async fn search(
        &self,
        vector: Vec<f32>,
        limit: u64,
        doc_ids: &[String],
    ) -> Result<Vec<ScoredPoint>, VectorStoreError>;

    /// All point ids currently stored for a document, via batch scroll.
    async fn list_point_ids(&self, doc_id: &str) -> Result<Vec<String>, VectorStoreError>;

    /// Delete an explicit id set.
    async fn delete_points(&self, ids: Vec<String>) -> Result<(), VectorStoreError>;

    /// Delete every point belonging to a document.
    async fn delete_by_doc_id(&self, doc_id: &str) -> Result<(), VectorStoreError>;

    /// Collection name (dimension-suffixed).
    fn collection(&self) -> &str;
}

/// Create a vector store backend for the configured driver, with the
/// collection partitioned by embedding dimension.
pub fn create_backend(
    config: &VectorStoreConfig,
    dimension: u32,
) -> Result<Arc<dyn VectorStore>, VectorStoreError> {
    let collection = config.collection_name(dimension);
    match config.driver {
        VectorDriver::Qdrant => {
            let backend = QdrantBackend::new(config, collection, dimension)?;
            Ok(Arc::new(backend))
        }
        VectorDriver::Memory => Ok(Arc::new(MemoryBackend::new(collection))),
    }
}
