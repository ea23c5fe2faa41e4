//! Postgres-backed document store.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};

use crate::error::StoreError;
use crate::models::DatabaseConfig;

use super::{DocumentStore, ReindexCandidate};

pub struct PostgresDocumentStore {
    pool: PgPool,
}

impl PostgresDocumentStore {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.pool_max)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect(&config.url)
            .await
            .map_err(|e| StoreError::ConnectionError(e.to_string()))?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentStore for PostgresDocumentStore {
    async fn reindex_candidates(
        &self,
        current_model: &str,
    ) -> Result<Vec<ReindexCandidate>, StoreError> {
        // IS DISTINCT FROM treats NULL (never indexed) as a mismatch too.
        let rows = sqlx::query(
            "SELECT id, content, embedding_model FROM documents \
             WHERE embedding_model IS DISTINCT FROM $1 ORDER BY id",
        )
        .bind(current_model)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::QueryError(e.to_string()))?;

        let mut candidates = Vec::with_capacity(rows.len());
        for row in rows {
            candidates.push(ReindexCandidate {
                id: row
                    .try_get("id")
                    .map_err(|e| StoreError::QueryError(e.to_string()))?,
                content: row
                    .try_get("content")
                    .map_err(|e| StoreError::QueryError(e.to_string()))?,
                embedding_model: row
                    .try_get("embedding_model")
                    .map_err(|e| StoreError::QueryError(e.to_string()))?,
            });
        }
        Ok(candidates)
    }

    async fn set_embedding_model(&self, doc_id: &str, model: &str) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE documents SET embedding_model = $2, updated_at = now() WHERE id = $1",
        )
        .bind(doc_id)
        .bind(model)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::QueryError(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(doc_id.to_string()));
        }
        Ok(())
    }

    async fn fetch_content(&self, doc_id: &str) -> Result<String, StoreError> {
        let row = sqlx::query("SELECT content FROM documents WHERE id = $1")
            .bind(doc_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::QueryError(e.to_string()))?;

        match row {
            Some(row) => row
                .try_get("content")
                .map_err(|e| StoreError::QueryError(e.to_string())),
            None => Err(StoreError::NotFound(doc_id.to_string())),
        }
    }
}
