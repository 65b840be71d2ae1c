//! Error types for ragscope

use thiserror::Error;

/// Result type alias using RagScopeError
pub type Result<T> = std::result::Result<T, RagScopeError>;

/// Error type alias for convenience
pub type Error = RagScopeError;

/// Exit codes for CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const INVALID_INPUT: i32 = 3;
}

/// Main error type for ragscope
#[derive(Debug, Error)]
pub enum RagScopeError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Transport-level failure talking to the embedding or generation
    /// service (connection refused, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Upstream service reachable but returned a non-success status.
    #[error("Upstream service error: {0}")]
    Upstream(String),

    /// Upstream response parsed but missing the contracted payload
    /// (empty embeddings, missing response field).
    #[error("Malformed upstream response: {0}")]
    MalformedResponse(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RagScopeError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidInput(_) => exit_codes::INVALID_INPUT,
            _ => exit_codes::GENERAL_ERROR,
        }
    }
}
