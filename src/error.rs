//! Error types for the chunking, indexing, and retrieval pipeline.

use thiserror::Error;

use crate::utils::retry::Retryable;

/// Errors from chunk boundary planning.
#[derive(Debug, Error)]
pub enum ChunkPlanError {
    /// Every candidate chunk size was attempted and none produced a valid
    /// partition of the document content.
    #[error("no valid chunk plan after {attempts} size attempts")]
    InvalidChunkPlan { attempts: usize },
}

/// Errors related to embedding operations.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("failed to connect to embedding server: {0}")]
    ConnectionError(String),

    #[error("embedding server error: {0}")]
    ServerError(String),

    #[error("embedding request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("invalid embedding response: {0}")]
    InvalidResponse(String),

    #[error("embedding timeout")]
    Timeout,
}

impl Retryable for EmbeddingError {
    fn is_retryable(&self) -> bool {
        match self {
            EmbeddingError::ConnectionError(_) | EmbeddingError::Timeout => true,
            EmbeddingError::ServerError(msg) => {
                msg.contains("503")
                    || msg.contains("502")
                    || msg.contains("504")
                    || msg.contains("429")
                    || msg.to_lowercase().contains("unavailable")
                    || msg.to_lowercase().contains("too many requests")
            }
            EmbeddingError::RequestError(e) => e.is_timeout() || e.is_connect(),
            EmbeddingError::InvalidResponse(_) => false,
        }
    }
}

/// Errors from the prompt-completion endpoint used for query expansion.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("failed to connect to completion endpoint: {0}")]
    ConnectionError(String),

    #[error("completion endpoint error: {0}")]
    ServerError(String),

    #[error("completion request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("invalid completion response: {0}")]
    InvalidResponse(String),

    #[error("completion timeout")]
    Timeout,
}

impl Retryable for CompletionError {
    fn is_retryable(&self) -> bool {
        match self {
            CompletionError::ConnectionError(_) | CompletionError::Timeout => true,
            CompletionError::ServerError(msg) => {
                msg.contains("503") || msg.contains("429") || msg.contains("502")
            }
            CompletionError::RequestError(e) => e.is_timeout() || e.is_connect(),
            CompletionError::InvalidResponse(_) => false,
        }
    }
}

/// Errors related to vector store operations.
#[derive(Debug, Error)]
pub enum VectorStoreError {
    #[error("failed to connect to vector store: {0}")]
    ConnectionError(String),

    #[error("collection error: {0}")]
    CollectionError(String),

    #[error("upsert error: {0}")]
    UpsertError(String),

    #[error("search error: {0}")]
    SearchError(String),

    #[error("scroll error: {0}")]
    ScrollError(String),

    #[error("delete error: {0}")]
    DeleteError(String),
}

impl Retryable for VectorStoreError {
    fn is_retryable(&self) -> bool {
        match self {
            VectorStoreError::ConnectionError(_) => true,
            VectorStoreError::CollectionError(msg)
            | VectorStoreError::UpsertError(msg)
            | VectorStoreError::SearchError(msg)
            | VectorStoreError::ScrollError(msg)
            | VectorStoreError::DeleteError(msg) => {
                let msg_lower = msg.to_lowercase();
                msg_lower.contains("timeout")
                    || msg_lower.contains("connection")
                    || msg_lower.contains("unavailable")
                    || msg_lower.contains("too many")
            }
        }
    }
}

/// Errors from synchronizing a document's chunks into the vector index.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Chunk count and embedding count disagree. This is an invariant
    /// violation, never silently truncated or padded.
    #[error("embedding count mismatch: {chunks} chunks but {embeddings} embeddings")]
    EmbeddingCountMismatch { chunks: usize, embeddings: usize },

    #[error("vector store error: {0}")]
    VectorStore(#[from] VectorStoreError),
}

/// Errors on the retrieval (read) path.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search query cannot be blank")]
    QueryRequired,

    #[error("no embeddings were produced for the query variants")]
    EmbeddingFailed,

    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("vector store error: {0}")]
    VectorStore(#[from] VectorStoreError),
}

/// Errors on the document ingest (write) path.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("chunk plan error: {0}")]
    Plan(#[from] ChunkPlanError),

    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("sync error: {0}")]
    Sync(#[from] SyncError),
}

/// Errors from the document metadata store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to connect to document store: {0}")]
    ConnectionError(String),

    #[error("query error: {0}")]
    QueryError(String),

    #[error("document not found: {0}")]
    NotFound(String),
}

/// Errors from the background reindex sweep. Per-document failures are
/// isolated inside the sweep; only listing candidates can fail it outright.
#[derive(Debug, Error)]
pub enum ReindexError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Errors related to configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),

    #[error("path error: {0}")]
    PathError(String),

    #[error("validation error: {0}")]
    ValidationError(String),
}
