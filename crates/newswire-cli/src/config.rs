//! CLI configuration from environment variables
//!
//! - `NEWSWIRE_CACHE_DIR`: result cache directory (default: the per-user
//!   cache directory)
//! - `NEWSWIRE_LEDGER_PATH`: ledger database file (default: alongside the
//!   cache)
//! - `NEWSWIRE_PROXY`: proxy URL, also exposed as `--proxy`

use crate::error::Result;
use newswire_feed::cache::ResultCache;
use newswire_feed::ledger::FetchLedger;
use std::path::PathBuf;

/// Locations of the CLI's persistent state.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub cache_dir: Option<PathBuf>,
    pub ledger_path: Option<PathBuf>,
}

impl CliConfig {
    /// Read configuration from the environment.
    pub fn from_env() -> Self {
        Self {
            cache_dir: std::env::var("NEWSWIRE_CACHE_DIR").ok().map(PathBuf::from),
            ledger_path: std::env::var("NEWSWIRE_LEDGER_PATH")
                .ok()
                .map(PathBuf::from),
        }
    }

    /// Open the configured result cache.
    pub fn open_cache(&self) -> Result<ResultCache> {
        let cache = match &self.cache_dir {
            Some(dir) => ResultCache::new(dir)?,
            None => ResultCache::open_default()?,
        };
        Ok(cache)
    }

    /// Open the configured fetch ledger.
    pub fn open_ledger(&self) -> Result<FetchLedger> {
        let ledger = match &self.ledger_path {
            Some(path) => FetchLedger::open(path)?,
            None => FetchLedger::open_default()?,
        };
        Ok(ledger)
    }
}
