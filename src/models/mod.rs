mod config;
mod document;
mod search;

pub use config::{
    ChunkingConfig, CompletionConfig, Config, DEFAULT_COLLECTION_BASE, DEFAULT_COMPLETION_URL,
    DEFAULT_EMBEDDING_DIMENSION, DEFAULT_EMBEDDING_MODEL, DEFAULT_EMBEDDING_URL,
    DEFAULT_QDRANT_URL, DatabaseConfig, EmbeddingConfig, ReindexConfig, SearchConfig,
    VectorDriver, VectorStoreConfig,
};
pub use document::{ChunkBoundary, ChunkMaterial, Document, StoredChunk, normalize_tags};
pub use search::{RetrievalMatch, SearchHit, SearchOutcome};
