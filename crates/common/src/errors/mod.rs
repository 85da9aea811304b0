//! Error types for PolicyLens
//!
//! Provides a single error enum shared by every crate with:
//! - Distinct variants for input, provider, index and configuration failures
//! - Machine-readable error codes
//! - Retry classification for outer layers

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Input errors (1xxx)
    InputRejected,

    // Index errors (4xxx)
    IndexUnavailable,
    DimensionMismatch,
    ModelMismatch,

    // External provider errors (8xxx)
    ProviderError,
    ProviderTimeout,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
    SerializationError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            ErrorCode::InputRejected => 1001,

            ErrorCode::IndexUnavailable => 4001,
            ErrorCode::DimensionMismatch => 4002,
            ErrorCode::ModelMismatch => 4003,

            ErrorCode::ProviderError => 8001,
            ErrorCode::ProviderTimeout => 8002,

            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::SerializationError => 9003,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    /// Caller passed an empty or otherwise unusable argument.
    /// Raised before any provider call is attempted.
    #[error("Input rejected ({field}): {message}")]
    InputRejected { field: String, message: String },

    /// The semantic index is empty or failed to build.
    #[error("Index unavailable: {message}")]
    IndexUnavailable { message: String },

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Embedding model mismatch: index built with `{index_model}`, query embedded with `{query_model}`")]
    ModelMismatch {
        index_model: String,
        query_model: String,
    },

    /// Embedding or generation call failed (network, auth, rate limit, bad payload)
    #[error("Provider `{provider}` failed: {message}")]
    Provider { provider: String, message: String },

    #[error("Provider `{provider}` timed out after {timeout_ms}ms")]
    ProviderTimeout { provider: String, timeout_ms: u64 },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl AppError {
    pub fn input_rejected(field: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::InputRejected {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        AppError::Configuration {
            message: message.into(),
        }
    }

    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::InputRejected { .. } => ErrorCode::InputRejected,
            AppError::IndexUnavailable { .. } => ErrorCode::IndexUnavailable,
            AppError::DimensionMismatch { .. } => ErrorCode::DimensionMismatch,
            AppError::ModelMismatch { .. } => ErrorCode::ModelMismatch,
            AppError::Provider { .. } => ErrorCode::ProviderError,
            AppError::ProviderTimeout { .. } => ErrorCode::ProviderTimeout,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
            AppError::Internal { .. } => ErrorCode::InternalError,
        }
    }

    /// Provider failures are worth retrying by an outer layer
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::Provider { .. } | AppError::ProviderTimeout { .. }
        )
    }

    /// Check if the caller is at fault
    pub fn is_client_error(&self) -> bool {
        matches!(self, AppError::InputRejected { .. })
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration {
            message: err.to_string(),
        }
    }
}
