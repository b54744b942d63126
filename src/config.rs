//! Environment-driven configuration for the ingestion pipeline.

use crate::chunking::ChunkParams;
use crate::index::BatchParams;
use crate::pipeline::PipelineParams;
use crate::validate::ChunkTokenBounds;
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the ingestion pipeline.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the search index service.
    pub search_endpoint: String,
    /// Name of the target search index.
    pub search_index: String,
    /// Optional API key presented to the search index service.
    pub search_api_key: Option<String>,
    /// Dimensionality of the embedding vectors.
    pub embedding_dimension: usize,
    /// Token budget per chunk for the semantic and structure-aware strategies.
    pub chunk_max_tokens: usize,
    /// Overlap token budget seeded into each new semantic chunk.
    pub chunk_overlap_tokens: usize,
    /// Window length in tokens for the sliding-window strategy.
    pub window_size: usize,
    /// Overlap in tokens between consecutive windows.
    pub window_overlap: usize,
    /// Minimum chunk token count before the chunk validator flags it.
    pub chunk_min_token_floor: usize,
    /// Maximum chunk token count before the chunk validator flags it.
    pub chunk_max_token_ceiling: usize,
    /// Number of records per upload batch.
    pub upload_batch_size: usize,
    /// Pause in milliseconds between consecutive upload batches.
    pub batch_delay_ms: u64,
}

impl Config {
    /// Load configuration from environment variables, performing validation
    /// along the way. Loads a `.env` file first when one is present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let config = Self {
            search_endpoint: load_env("SEARCH_ENDPOINT")?,
            search_index: load_env("SEARCH_INDEX")?,
            search_api_key: load_env_optional("SEARCH_API_KEY"),
            embedding_dimension: load_env_or("EMBEDDING_DIMENSION", 3072)?,
            chunk_max_tokens: load_env_or("CHUNK_MAX_TOKENS", 512)?,
            chunk_overlap_tokens: load_env_or("CHUNK_OVERLAP_TOKENS", 50)?,
            window_size: load_env_or("WINDOW_SIZE", 512)?,
            window_overlap: load_env_or("WINDOW_OVERLAP", 50)?,
            chunk_min_token_floor: load_env_or("CHUNK_MIN_TOKEN_FLOOR", 10)?,
            chunk_max_token_ceiling: load_env_or("CHUNK_MAX_TOKEN_CEILING", 600)?,
            upload_batch_size: load_env_or("UPLOAD_BATCH_SIZE", 100)?,
            batch_delay_ms: load_env_or("BATCH_DELAY_MS", 500)?,
        };
        tracing::debug!(
            endpoint = %config.search_endpoint,
            index = %config.search_index,
            embedding_dimension = config.embedding_dimension,
            batch_size = config.upload_batch_size,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Assemble pipeline parameters from the loaded configuration.
    pub fn pipeline_params(&self) -> PipelineParams {
        PipelineParams {
            chunk: ChunkParams {
                max_tokens: self.chunk_max_tokens,
                overlap_tokens: self.chunk_overlap_tokens,
                window_size: self.window_size,
                window_overlap: self.window_overlap,
            },
            bounds: ChunkTokenBounds {
                min_tokens: self.chunk_min_token_floor,
                max_tokens: self.chunk_max_token_ceiling,
            },
            batch: BatchParams {
                batch_size: self.upload_batch_size,
                batch_delay: Duration::from_millis(self.batch_delay_ms),
                vector_dimension: self.embedding_dimension,
            },
        }
    }
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingVariable(key.to_string()))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn load_env_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_optional_settings() {
        // Exercises the parsing helpers directly; process-wide env mutation
        // is unreliable under the parallel test runner.
        assert_eq!(load_env_or("UNSET_SETTING_FOR_TEST", 512usize).unwrap(), 512);
        assert!(load_env("UNSET_SETTING_FOR_TEST").is_err());
    }

    #[test]
    fn api_key_is_optional() {
        // An unset or blank key loads as None rather than an error, matching
        // index deployments that skip key auth.
        assert_eq!(load_env_optional("UNSET_SETTING_FOR_TEST"), None);

        let config = Config {
            search_endpoint: "https://search.example.test".into(),
            search_index: "documents".into(),
            search_api_key: None,
            embedding_dimension: 3072,
            chunk_max_tokens: 512,
            chunk_overlap_tokens: 50,
            window_size: 512,
            window_overlap: 50,
            chunk_min_token_floor: 10,
            chunk_max_token_ceiling: 600,
            upload_batch_size: 100,
            batch_delay_ms: 500,
        };
        assert_eq!(config.pipeline_params().batch.batch_size, 100);
    }

    #[test]
    fn pipeline_params_mirror_the_config() {
        let config = Config {
            search_endpoint: "https://search.example.test".into(),
            search_index: "documents".into(),
            search_api_key: Some("key".into()),
            embedding_dimension: 3072,
            chunk_max_tokens: 256,
            chunk_overlap_tokens: 32,
            window_size: 128,
            window_overlap: 16,
            chunk_min_token_floor: 5,
            chunk_max_token_ceiling: 300,
            upload_batch_size: 50,
            batch_delay_ms: 250,
        };

        let params = config.pipeline_params();
        assert_eq!(params.chunk.max_tokens, 256);
        assert_eq!(params.chunk.window_overlap, 16);
        assert_eq!(params.bounds.max_tokens, 300);
        assert_eq!(params.batch.batch_size, 50);
        assert_eq!(params.batch.batch_delay, Duration::from_millis(250));
        assert_eq!(params.batch.vector_dimension, 3072);
    }
}
