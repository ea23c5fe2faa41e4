//! Document metadata store.
//!
//! The pipeline reads document content from a relational store and records
//! which embedding model each document was last indexed with. The trait keeps
//! the reindex sweep testable without a database.

use async_trait::async_trait;

use crate::error::StoreError;

pub mod postgres;

pub use postgres::PostgresDocumentStore;

/// A document whose stored embedding model differs from the current one.
#[derive(Debug, Clone)]
pub struct ReindexCandidate {
    pub id: String,
    pub content: String,
    pub embedding_model: Option<String>,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Documents indexed with a model other than `current_model` (including
    /// never-indexed documents).
    async fn reindex_candidates(
        &self,
        current_model: &str,
    ) -> Result<Vec<ReindexCandidate>, StoreError>;

    /// Record the model a document's vectors were produced with.
    async fn set_embedding_model(&self, doc_id: &str, model: &str) -> Result<(), StoreError>;

    async fn fetch_content(&self, doc_id: &str) -> Result<String, StoreError>;
}
