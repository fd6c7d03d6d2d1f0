//! Error types for the Newswire CLI
//!
//! All errors are user-facing, with messages that say what to fix.

use thiserror::Error;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Error type for CLI operations
#[derive(Error, Debug)]
pub enum CliError {
    /// Feed pipeline operation failed
    #[error("{0}")]
    Feed(#[from] newswire_feed::FeedError),

    /// Command-line argument was understood by the parser but is invalid here
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// File system operation failed
    #[error("File operation failed: {0}. Check file permissions and disk space.")]
    Io(#[from] std::io::Error),

    /// CSV output failed
    #[error("Failed to write CSV output: {0}")]
    Csv(#[from] csv::Error),

    /// JSON output failed
    #[error("Failed to write JSON output: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Create an invalid-argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}
