//! Custom error types for rustgutenberg.
//!
//! Library functions return `Result<T, ScrapeError>`; the binary adds
//! context with `anyhow` at the edge.

use thiserror::Error;

/// Main error type for rustgutenberg operations.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Network/HTTP transport error (includes fetch timeouts)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Origin answered with a non-success status
    #[error("HTTP error: {status} for {url}")]
    Http {
        /// Status code returned by the server
        status: u16,
        /// Requested URL
        url: String,
    },

    /// HTML parsing error
    #[error("Parse error: {0}")]
    Parse(String),

    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV export error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type alias using `ScrapeError`
pub type Result<T> = std::result::Result<T, ScrapeError>;

/// Extension trait for adding context to Option types
pub trait OptionExt<T> {
    /// Convert Option to Result with a parse error message
    fn ok_or_parse(self, msg: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_parse(self, msg: &str) -> Result<T> {
        self.ok_or_else(|| ScrapeError::Parse(msg.to_string()))
    }
}
