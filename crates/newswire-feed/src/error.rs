//! Error types for the feed pipeline
//!
//! Only configuration-time problems and infrastructure failures surface as
//! `FeedError`. Per-file failures (absent files, timeouts, unparseable
//! payloads) are data, carried by [`crate::fetch::FetchOutcome`] and
//! [`crate::table::SkipReason`], and never abort a batch.

use thiserror::Error;

/// Result type alias for feed operations
pub type Result<T> = std::result::Result<T, FeedError>;

/// Error type for feed pipeline operations
#[derive(Error, Debug)]
pub enum FeedError {
    /// Invalid query parameters, detected before any I/O
    #[error("Invalid query: {0}")]
    Config(String),

    /// Date string did not match either accepted format
    #[error("Invalid date '{0}': expected YYYY-MM-DD or YYYY-MM-DD-HH-MM-SS")]
    DateFormat(String),

    /// A master index listing could not be fetched or understood
    #[error("Feed index unavailable: {0}")]
    Index(String),

    /// Result cache backend failed (distinct from a corrupt entry, which is
    /// treated as a miss)
    #[error("Cache error: {0}")]
    Cache(String),

    /// A fetched payload could not be decompressed or decoded
    #[error("Parse error: {0}")]
    Parse(String),

    /// No file found while walking back from the current time slot
    #[error("No recent file available for feed '{feed}' within {steps} slots")]
    NoRecentFile { feed: String, steps: u32 },

    /// Ledger database operation failed
    #[error("Ledger error: {0}")]
    Ledger(#[from] rusqlite::Error),

    /// HTTP client could not be constructed (bad proxy URL etc.)
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// File system operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// (De)serialization of persisted state failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FeedError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an index error
    pub fn index(msg: impl Into<String>) -> Self {
        Self::Index(msg.into())
    }

    /// Create a cache error
    pub fn cache(msg: impl Into<String>) -> Self {
        Self::Cache(msg.into())
    }

    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }
}
