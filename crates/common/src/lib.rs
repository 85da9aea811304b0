//! PolicyLens Common Library
//!
//! Shared code for the PolicyLens crates including:
//! - Configuration management
//! - Error types and handling
//! - Embedding provider abstraction
//! - Generation provider abstraction
//! - Metrics and observability

pub mod config;
pub mod embeddings;
pub mod errors;
pub mod generation;
pub mod metrics;

// Re-export commonly used types
pub use config::{AppConfig, SimilarityMetric};
pub use embeddings::Embedder;
pub use errors::{AppError, Result};
pub use generation::Generator;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
