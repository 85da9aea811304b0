//! Configuration management for PolicyLens
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default.toml, config/<env>.toml, config/local.toml)
//! - Default values

use crate::errors::{AppError, Result};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Embedding provider configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Generation provider configuration
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Retrieval depth per interaction mode
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Character budgets for externally supplied text
    #[serde(default)]
    pub budgets: BudgetConfig,

    /// Corpus source
    #[serde(default)]
    pub corpus: CorpusConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbeddingConfig {
    /// Embedding provider: openai, hashing
    #[serde(default = "default_embedding_provider")]
    pub provider: String,

    /// API key for embedding service
    pub api_key: Option<String>,

    /// API base URL (OpenAI-compatible endpoint)
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Model to use
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Embedding dimension
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,

    /// Request timeout in seconds
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,

    /// Maximum retries inside the provider
    #[serde(default = "default_embedding_retries")]
    pub max_retries: u32,

    /// Batch size for embedding requests
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Similarity metric used for both index build and query time
    #[serde(default)]
    pub metric: SimilarityMetric,
}

/// Similarity metric. One metric is fixed per index.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityMetric {
    #[default]
    Cosine,
    InnerProduct,
}

impl SimilarityMetric {
    /// Score two vectors of equal length. Higher is always more similar.
    pub fn score(&self, a: &[f32], b: &[f32]) -> f32 {
        let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
        match self {
            SimilarityMetric::InnerProduct => dot,
            SimilarityMetric::Cosine => {
                let norm_a = a.iter().map(|v| v * v).sum::<f32>().sqrt();
                let norm_b = b.iter().map(|v| v * v).sum::<f32>().sqrt();
                if norm_a == 0.0 || norm_b == 0.0 {
                    0.0
                } else {
                    dot / (norm_a * norm_b)
                }
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SimilarityMetric::Cosine => "cosine",
            SimilarityMetric::InnerProduct => "inner_product",
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GenerationConfig {
    /// Generation provider: openai, mock
    #[serde(default = "default_generation_provider")]
    pub provider: String,

    /// API key for generation service
    pub api_key: Option<String>,

    /// API base URL (OpenAI-compatible endpoint)
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Model name
    #[serde(default = "default_generation_model")]
    pub model: String,

    /// Sampling temperature
    #[serde(default)]
    pub temperature: f32,

    /// Maximum output tokens
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    /// Timeout in seconds
    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetrievalConfig {
    /// Entries retrieved for direct Q&A (and report synthesis, which reuses it)
    #[serde(default = "default_k")]
    pub ask_k: usize,

    /// Entries retrieved for document comparison
    #[serde(default = "default_k")]
    pub analyze_k: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BudgetConfig {
    /// Max characters of an external document used to build the retrieval query
    #[serde(default = "default_retrieval_excerpt")]
    pub retrieval_excerpt_chars: usize,

    /// Max characters of an external document passed to the generation prompt
    #[serde(default = "default_generation_excerpt")]
    pub generation_excerpt_chars: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CorpusConfig {
    /// Path to the JSON policy records
    #[serde(default = "default_corpus_path")]
    pub path: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Service name for tracing
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

// Default value functions
fn default_embedding_provider() -> String { "openai".to_string() }
fn default_generation_provider() -> String { "openai".to_string() }
fn default_api_base() -> String { "https://api.greenpt.ai/v1".to_string() }
fn default_embedding_model() -> String { "green-embeddings".to_string() }
fn default_generation_model() -> String { "green-r-raw".to_string() }
fn default_embedding_dimension() -> usize { 1536 }
fn default_embedding_timeout() -> u64 { 30 }
fn default_embedding_retries() -> u32 { 3 }
fn default_batch_size() -> usize { 100 }
fn default_max_tokens() -> usize { 1500 }
fn default_generation_timeout() -> u64 { 60 }
fn default_k() -> usize { 15 }
fn default_retrieval_excerpt() -> usize { 2000 }
fn default_generation_excerpt() -> usize { 4000 }
fn default_corpus_path() -> String { "data/policies.json".to_string() }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_service_name() -> String { "policylens".to_string() }

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            api_key: None,
            api_base: default_api_base(),
            model: default_embedding_model(),
            dimension: default_embedding_dimension(),
            timeout_secs: default_embedding_timeout(),
            max_retries: default_embedding_retries(),
            batch_size: default_batch_size(),
            metric: SimilarityMetric::default(),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: default_generation_provider(),
            api_key: None,
            api_base: default_api_base(),
            model: default_generation_model(),
            temperature: 0.0,
            max_tokens: default_max_tokens(),
            timeout_secs: default_generation_timeout(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            ask_k: default_k(),
            analyze_k: default_k(),
        }
    }
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            retrieval_excerpt_chars: default_retrieval_excerpt(),
            generation_excerpt_chars: default_generation_excerpt(),
        }
    }
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            path: default_corpus_path(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            service_name: default_service_name(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            embedding: EmbeddingConfig::default(),
            generation: GenerationConfig::default(),
            retrieval: RetrievalConfig::default(),
            budgets: BudgetConfig::default(),
            corpus: CorpusConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> std::result::Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))

            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))

            // Load local overrides
            .add_source(File::with_name("config/local").required(false))

            // Load from environment variables with APP__ prefix
            // e.g., APP__EMBEDDING__API_KEY=...
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )

            .build()?;

        config.try_deserialize()
    }

    /// Reject settings the engine cannot honor
    pub fn validate(&self) -> Result<()> {
        if self.retrieval.ask_k == 0 || self.retrieval.analyze_k == 0 {
            return Err(AppError::configuration("retrieval depth must be greater than zero"));
        }
        if self.budgets.retrieval_excerpt_chars == 0 || self.budgets.generation_excerpt_chars == 0 {
            return Err(AppError::configuration("excerpt budgets must be greater than zero"));
        }
        if self.budgets.retrieval_excerpt_chars > self.budgets.generation_excerpt_chars {
            return Err(AppError::configuration(format!(
                "retrieval excerpt budget ({}) exceeds generation excerpt budget ({})",
                self.budgets.retrieval_excerpt_chars, self.budgets.generation_excerpt_chars
            )));
        }
        if self.embedding.batch_size == 0 {
            return Err(AppError::configuration("embedding batch size must be greater than zero"));
        }
        if self.embedding.dimension == 0 {
            return Err(AppError::configuration("embedding dimension must be greater than zero"));
        }
        Ok(())
    }
}
