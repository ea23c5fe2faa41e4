//! Embedding gateway: batching adapter over an external embedding server.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::EmbeddingError;
use crate::models::EmbeddingConfig;

/// Instruction type for embedding generation.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InstructionType {
    /// For indexing documents
    Document,
    /// For search queries
    Query,
}

/// Port for embedding providers. Same-length output is part of the contract:
/// the pipeline treats a count mismatch as a programming error, not a
/// condition to recover from.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed document chunks for indexing.
    async fn embed_documents(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Embed query variants for retrieval.
    async fn embed_queries(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Name of the embedding model in use.
    fn model(&self) -> &str;

    /// Output vector dimensionality.
    fn dimension(&self) -> u32;
}

/// Request body for the /embed endpoint.
#[derive(Debug, Serialize)]
struct EmbedRequest {
    model: String,
    inputs: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    truncate: Option<bool>,
    instruction_type: InstructionType,
}

/// Response from the /embed endpoint.
#[derive(Debug, Deserialize)]
struct EmbedResponse(Vec<Vec<f32>>);

/// HTTP client for an embedding server.
#[derive(Debug, Clone)]
pub struct HttpEmbeddingClient {
    client: Client,
    base_url: String,
    model: String,
    dimension: u32,
    batch_size: usize,
}

impl HttpEmbeddingClient {
    pub fn new(config: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EmbeddingError::ConnectionError(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            dimension: config.dimension,
            batch_size: config.batch_size.max(1) as usize,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check that the embedding server is up.
    pub async fn health_check(&self) -> Result<(), EmbeddingError> {
        let url = format!("{}/health", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| EmbeddingError::ConnectionError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(EmbeddingError::ServerError(format!(
                "health check failed with status: {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn embed_batched(
        &self,
        texts: Vec<String>,
        instruction_type: InstructionType,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut all_embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let embeddings = self.embed_single_batch(batch.to_vec(), instruction_type).await?;
            all_embeddings.extend(embeddings);
        }
        Ok(all_embeddings)
    }

    async fn embed_single_batch(
        &self,
        texts: Vec<String>,
        instruction_type: InstructionType,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let url = format!("{}/embed", self.base_url);
        let expected = texts.len();
        let request = EmbedRequest {
            model: self.model.clone(),
            inputs: texts,
            truncate: Some(true),
            instruction_type,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EmbeddingError::Timeout
                } else {
                    EmbeddingError::RequestError(e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::ServerError(format!(
                "status {}: {}",
                status, body
            )));
        }

        let embed_response: EmbedResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))?;

        if embed_response.0.len() != expected {
            return Err(EmbeddingError::InvalidResponse(format!(
                "server returned {} embeddings for {} inputs",
                embed_response.0.len(),
                expected
            )));
        }

        Ok(embed_response.0)
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingClient {
    async fn embed_documents(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.embed_batched(texts, InstructionType::Document).await
    }

    async fn embed_queries(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.embed_batched(texts, InstructionType::Query).await
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> u32 {
        self.dimension
    }
}
