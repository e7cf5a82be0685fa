//! Custom error types for paperdaily.
//!
//! This module defines all error types used throughout the application.
//! All functions return `Result<T, DigestError>` instead of using `unwrap()`.

use thiserror::Error;

/// Main error type for paperdaily operations.
///
/// Uses `thiserror` for ergonomic error handling and automatic `Display` implementation.
#[derive(Debug, Error)]
pub enum DigestError {
    /// Network/HTTP request error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// External API returned an error status
    #[error("API error: {code} - {message}")]
    Api {
        /// HTTP status code from the API
        code: u16,
        /// Error message from API
        message: String,
    },

    /// Feed/HTML/metadata parsing error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Headless page rendering error
    #[error("Render error: {0}")]
    Render(String),

    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),

    /// LLM request/response error
    #[error("LLM error: {0}")]
    Llm(String),

    /// Email composition/delivery error
    #[error("Mail error: {0}")]
    Mail(String),
}

/// Result type alias using `DigestError`
pub type Result<T> = std::result::Result<T, DigestError>;

/// Extension trait for adding context to Option types
pub trait OptionExt<T> {
    /// Convert Option to Result with a parse error message
    fn ok_or_parse(self, msg: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_parse(self, msg: &str) -> Result<T> {
        self.ok_or_else(|| DigestError::Parse(msg.to_string()))
    }
}
