use serde::{Deserialize, Serialize};

pub const DEFAULT_EMBEDDING_URL: &str = "http://localhost:11411";
pub const DEFAULT_COMPLETION_URL: &str = "http://localhost:11434";
pub const DEFAULT_QDRANT_URL: &str = "http://localhost:16334";
pub const DEFAULT_COLLECTION_BASE: &str = "kb_chunks";
pub const DEFAULT_EMBEDDING_MODEL: &str = "qwen3-embedding-0.6b";
pub const DEFAULT_EMBEDDING_DIMENSION: u32 = 1024;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub completion: CompletionConfig,

    #[serde(default)]
    pub vector_store: VectorStoreConfig,

    #[serde(default)]
    pub chunking: ChunkingConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub reindex: ReindexConfig,

    #[serde(default)]
    pub database: DatabaseConfig,
}

impl Config {
    pub fn config_path() -> Option<std::path::PathBuf> {
        dirs::config_dir().map(|p| p.join("kbpipe").join("config.toml"))
    }

    /// Load configuration from the user config file, then apply environment
    /// overrides (a `.env` file is honored via dotenvy).
    pub fn load() -> Result<Self, crate::error::ConfigError> {
        dotenvy::dotenv().ok();

        let mut config = if let Some(path) = Self::config_path()
            && path.exists()
        {
            let content = std::fs::read_to_string(&path)?;
            toml::from_str(&content)?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    pub fn save(&self) -> Result<(), crate::error::ConfigError> {
        let path = Self::config_path().ok_or_else(|| {
            crate::error::ConfigError::PathError("could not determine config directory".to_string())
        })?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("KBPIPE_EMBEDDING_URL") {
            self.embedding.url = url;
        }
        if let Ok(model) = std::env::var("KBPIPE_EMBEDDING_MODEL") {
            self.embedding.model = model;
        }
        if let Ok(url) = std::env::var("KBPIPE_COMPLETION_URL") {
            self.completion.url = url;
        }
        if let Ok(key) = std::env::var("KBPIPE_COMPLETION_API_KEY") {
            self.completion.api_key = Some(key);
        }
        if let Ok(url) = std::env::var("KBPIPE_QDRANT_URL") {
            self.vector_store.url = url;
        }
        if let Ok(key) = std::env::var("KBPIPE_QDRANT_API_KEY") {
            self.vector_store.api_key = Some(key);
        }
        if let Ok(url) = std::env::var("DATABASE_URL") {
            self.database.url = url;
        }
    }

    pub fn validate(&self) -> Result<(), crate::error::ConfigError> {
        if self.chunking.max_tokens_per_chunk == 0 {
            return Err(crate::error::ConfigError::ValidationError(
                "chunking.max_tokens_per_chunk must be at least 1".to_string(),
            ));
        }
        if self.chunking.max_chunk_count == 0 {
            return Err(crate::error::ConfigError::ValidationError(
                "chunking.max_chunk_count must be at least 1".to_string(),
            ));
        }
        if self.embedding.dimension == 0 {
            return Err(crate::error::ConfigError::ValidationError(
                "embedding.dimension must be at least 1".to_string(),
            ));
        }
        if self.reindex.concurrency == 0 {
            return Err(crate::error::ConfigError::ValidationError(
                "reindex.concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_url")]
    pub url: String,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    #[serde(default = "default_embedding_dimension")]
    pub dimension: u32,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
}

fn default_embedding_url() -> String {
    DEFAULT_EMBEDDING_URL.to_string()
}

fn default_embedding_model() -> String {
    DEFAULT_EMBEDDING_MODEL.to_string()
}

fn default_embedding_dimension() -> u32 {
    DEFAULT_EMBEDDING_DIMENSION
}

fn default_timeout() -> u64 {
    120
}

fn default_batch_size() -> u32 {
    8
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            url: default_embedding_url(),
            model: default_embedding_model(),
            dimension: default_embedding_dimension(),
            timeout_secs: default_timeout(),
            batch_size: default_batch_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    #[serde(default = "default_completion_url")]
    pub url: String,

    #[serde(default = "default_completion_model")]
    pub model: String,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

fn default_completion_url() -> String {
    DEFAULT_COMPLETION_URL.to_string()
}

fn default_completion_model() -> String {
    "qwen3:4b".to_string()
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            url: default_completion_url(),
            model: default_completion_model(),
            timeout_secs: default_timeout(),
            api_key: None,
        }
    }
}

/// Vector store backend selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorDriver {
    #[default]
    Qdrant,
    /// In-process store, for tests and embedded use.
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStoreConfig {
    #[serde(default)]
    pub driver: VectorDriver,

    #[serde(default = "default_qdrant_url")]
    pub url: String,

    /// Base collection name. The actual collection is suffixed with the
    /// embedding dimension so incompatible vector spaces never mix.
    #[serde(default = "default_collection_base")]
    pub collection_base: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

fn default_qdrant_url() -> String {
    DEFAULT_QDRANT_URL.to_string()
}

fn default_collection_base() -> String {
    DEFAULT_COLLECTION_BASE.to_string()
}

impl VectorStoreConfig {
    /// Collection name partitioned by embedding dimensionality.
    pub fn collection_name(&self, dimension: u32) -> String {
        format!("{}_{}", self.collection_base, dimension)
    }
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            driver: VectorDriver::Qdrant,
            url: default_qdrant_url(),
            collection_base: default_collection_base(),
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Token budget per chunk; the planner starts from
    /// `max_tokens_per_chunk * chars_per_token` characters.
    #[serde(default = "default_max_tokens_per_chunk")]
    pub max_tokens_per_chunk: u32,

    #[serde(default = "default_max_chunk_count")]
    pub max_chunk_count: u32,

    /// Rough characters-per-token estimate used to convert the token budget
    /// into a character target.
    #[serde(default = "default_chars_per_token")]
    pub chars_per_token: u32,
}

fn default_max_tokens_per_chunk() -> u32 {
    512
}

fn default_max_chunk_count() -> u32 {
    120
}

fn default_chars_per_token() -> u32 {
    4
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_tokens_per_chunk: default_max_tokens_per_chunk(),
            max_chunk_count: default_max_chunk_count(),
            chars_per_token: default_chars_per_token(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_top_k")]
    pub default_top_k: u32,

    /// Upper bound on query variants used for retrieval, original included.
    #[serde(default = "default_max_query_variants")]
    pub max_query_variants: u32,
}

fn default_top_k() -> u32 {
    10
}

fn default_max_query_variants() -> u32 {
    5
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_top_k: default_top_k(),
            max_query_variants: default_max_query_variants(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReindexConfig {
    /// Hard cap on concurrently reindexed documents.
    #[serde(default = "default_reindex_concurrency")]
    pub concurrency: u32,
}

fn default_reindex_concurrency() -> u32 {
    4
}

impl Default for ReindexConfig {
    fn default() -> Self {
        Self {
            concurrency: default_reindex_concurrency(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,

    #[serde(default = "default_pool_max")]
    pub pool_max: u32,

    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,
}

fn default_database_url() -> String {
    "postgres://localhost:5432/knowledge".to_string()
}

fn default_pool_max() -> u32 {
    5
}

fn default_acquire_timeout() -> u64 {
    10
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            pool_max: default_pool_max(),
            acquire_timeout_secs: default_acquire_timeout(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.embedding.url, DEFAULT_EMBEDDING_URL);
        assert_eq!(config.vector_store.url, DEFAULT_QDRANT_URL);
        assert_eq!(config.vector_store.collection_base, DEFAULT_COLLECTION_BASE);
        assert_eq!(config.reindex.concurrency, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_collection_name_partitioned_by_dimension() {
        let config = VectorStoreConfig::default();
        assert_eq!(config.collection_name(1024), "kb_chunks_1024");
        assert_eq!(config.collection_name(768), "kb_chunks_768");
    }

    #[test]
    fn test_validate_rejects_zero_budgets() {
        let mut config = Config::default();
        config.chunking.max_chunk_count = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.reindex.concurrency = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip_uses_defaults() {
        let parsed: Config = toml::from_str("").unwrap();
        assert_eq!(parsed.chunking.max_tokens_per_chunk, 512);
        assert_eq!(parsed.search.max_query_variants, 5);
    }

    #[test]
    fn test_partial_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[chunking]\nmax_tokens_per_chunk = 256\n\n[vector_store]\ndriver = \"memory\"\n",
        )
        .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let config: Config = toml::from_str(&content).unwrap();
        assert_eq!(config.chunking.max_tokens_per_chunk, 256);
        assert_eq!(config.vector_store.driver, VectorDriver::Memory);
        // Untouched sections keep their defaults.
        assert_eq!(config.embedding.dimension, DEFAULT_EMBEDDING_DIMENSION);
    }
}
