//! Error types for blocklist-optimizer.

use thiserror::Error;

/// Error type for blocklist-optimizer operations.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP transport error
    #[error("download error: {0}")]
    Download(#[from] reqwest::Error),

    /// Non-success HTTP status after retries
    #[error("HTTP {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Whitelist pattern that could not be compiled
    #[error("invalid pattern {pattern}: {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

/// Result type alias for blocklist-optimizer operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for compiling a single whitelist pattern.
#[derive(Error, Debug)]
pub enum PatternError {
    /// Empty pattern
    #[error("empty pattern")]
    Empty,

    /// `/.../` body rejected by the regex engine
    #[error("invalid regex: {0}")]
    InvalidRegex(#[source] regex::Error),

    /// Glob that does not translate into a valid regex
    #[error("invalid wildcard: {0}")]
    InvalidWildcard(#[source] regex::Error),
}

impl PatternError {
    /// Attach the offending pattern text, producing a crate-level error.
    pub fn with_pattern(self, pattern: &str) -> Error {
        Error::InvalidPattern {
            pattern: pattern.to_string(),
            reason: self.to_string(),
        }
    }
}
