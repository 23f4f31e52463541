// src/error.rs

//! Unified error handling for the posts client.

use std::fmt;

use thiserror::Error;

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed before a response was received
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Remote answered with a non-success status
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Local store query failed
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Remote returned no post for the requested id
    #[error("Post {0} not found")]
    PostNotFound(i64),

    /// Operation invoked before the data it depends on was loaded
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// Work was cancelled together with its scope
    #[error("Operation cancelled")]
    Cancelled,

    /// No async runtime available for spawning background work
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    /// Create a status error for a response.
    pub fn status(status: u16, url: impl fmt::Display) -> Self {
        Self::Status {
            status,
            url: url.to_string(),
        }
    }

    /// Create a precondition error.
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition(message.into())
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// True for failures talking to the remote listing (network, status, payload).
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::Status { .. } | Self::Json(_) | Self::PostNotFound(_)
        )
    }

    /// True when the error only signals cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_is_transport() {
        let err = AppError::status(500, "http://localhost/posts");
        assert!(err.is_transport());
        assert_eq!(err.to_string(), "HTTP 500 from http://localhost/posts");
    }

    #[test]
    fn test_precondition_is_not_transport() {
        let err = AppError::precondition("post not loaded");
        assert!(!err.is_transport());
        assert!(!err.is_cancelled());
        assert!(AppError::Cancelled.is_cancelled());
    }
}
