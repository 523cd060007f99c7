use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid pipeline: {0}")]
    InvalidPipeline(String),

    #[error("Failed to read document: {0}")]
    Document(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Failure of a single LLM call. Never fatal to a pipeline run: the stage that
/// hit it is recorded as failed and its dependents are skipped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvocationError {
    #[error("LLM call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Rate limited by provider: {0}")]
    RateLimited(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("LLM API error: {0}")]
    Api(String),

    #[error("Empty response from provider")]
    EmptyResponse,
}

impl InvocationError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, InvocationError::RateLimited(_) | InvocationError::Network(_))
    }
}
