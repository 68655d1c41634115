//! Error types for the studentdesk portal
//!
//! This module provides structured error definitions using thiserror; the
//! binary edge uses anyhow for propagation.

use thiserror::Error;

/// Postgres code for an undefined table
const UNDEFINED_TABLE: &str = "42P01";

/// Main error type for portal operations
#[derive(Error, Debug)]
pub enum PortalError {
    /// The hosted store rejected a request
    #[error("Store error ({code}): {message}")]
    Store { code: String, message: String },

    /// LLM API request failed
    #[error("LLM API error: {0}")]
    LlmApi(String),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Request is not valid for the current state
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Missing or unknown session
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Signed in, but not allowed
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource already exists
    #[error("Resource already exists: {0}")]
    AlreadyExists(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl PortalError {
    pub fn store(code: impl Into<String>, message: impl Into<String>) -> Self {
        PortalError::Store {
            code: code.into(),
            message: message.into(),
        }
    }

    /// True when the store reports that a table is missing or its schema
    /// cache is stale, which happens before the optional tables are migrated.
    pub fn is_missing_relation(&self) -> bool {
        match self {
            PortalError::Store { code, message } => {
                let msg = message.to_lowercase();
                code == UNDEFINED_TABLE
                    || msg.contains("schema cache")
                    || msg.contains("does not exist")
                    || msg.contains("could not find the table")
            }
            _ => false,
        }
    }
}

/// Result type alias for portal operations
pub type Result<T> = std::result::Result<T, PortalError>;

impl From<anyhow::Error> for PortalError {
    fn from(err: anyhow::Error) -> Self {
        PortalError::Other(err.to_string())
    }
}

impl From<config::ConfigError> for PortalError {
    fn from(err: config::ConfigError) -> Self {
        PortalError::Config(err.to_string())
    }
}
