//! Newswire CLI Library
//!
//! Command-line interface for querying time-partitioned news feed archives.
//!
//! # Overview
//!
//! - **Fetching**: Retrieve a feed over a date window (`newswire fetch`)
//! - **Latest Slot**: Grab the freshest available file (`newswire latest`)
//! - **Result Cache**: Inspect and clear cached results (`newswire cache`)
//! - **Fetch Ledger**: Inspect and reset incremental state (`newswire ledger`)

pub mod commands;
pub mod config;
pub mod error;
pub mod output;
pub mod progress;

// Re-export commonly used types
pub use config::CliConfig;
pub use error::{CliError, Result};

use clap::{Args, Parser, Subcommand};

/// Newswire - news feed archive retrieval
#[derive(Parser, Debug)]
#[command(name = "newswire")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Route requests through an HTTP or SOCKS proxy
    #[arg(long, env = "NEWSWIRE_PROXY", global = true)]
    pub proxy: Option<String>,

    /// Print help as markdown (for documentation generation)
    #[arg(long, hide = true)]
    pub markdown_help: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch a feed over a date window and assemble one table
    Fetch(FetchArgs),

    /// Fetch the most recent available file of a feed
    Latest(LatestArgs),

    /// Manage the result cache
    Cache {
        #[command(subcommand)]
        command: CacheCommand,
    },

    /// Manage the incremental fetch ledger
    Ledger {
        #[command(subcommand)]
        command: LedgerCommand,
    },
}

/// Arguments for `newswire fetch`
#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Feed to query (events-v1, events-v2, mentions, gkg-v1, gkg-v2, geg, vgeg)
    pub feed: String,

    /// Window start, YYYY-MM-DD or YYYY-MM-DD-HH-MM-SS
    pub start: String,

    /// Window end (exclusive unless --end-inclusive)
    pub end: String,

    /// Include the window end itself
    #[arg(long)]
    pub end_inclusive: bool,

    /// Use the machine-translated variant (v2 feeds only)
    #[arg(short, long)]
    pub translation: bool,

    /// Station/domain filter (vgeg only, e.g. BBCNEWS)
    #[arg(short, long)]
    pub domain: Option<String>,

    /// Fetch raw annotation payloads (vgeg only)
    #[arg(long)]
    pub raw: bool,

    /// Skip the result cache entirely
    #[arg(long)]
    pub no_cache: bool,

    /// Only fetch files not already recorded for this query
    ///
    /// Files absent upstream are recorded as final, so one published late
    /// is not re-probed; run `newswire ledger clear` for this query or a
    /// non-incremental fetch to pick it up.
    #[arg(short, long)]
    pub incremental: bool,

    /// Ignore a cached result and fetch anew
    #[arg(short, long)]
    pub force_refresh: bool,

    /// Execution model: 'pool' or 'async'
    #[arg(long, default_value = "pool")]
    pub mode: String,

    /// Worker count or in-flight request limit
    #[arg(short, long)]
    pub concurrency: Option<usize>,

    /// Append article full text resolved from the source URL column
    #[arg(long)]
    pub fulltext: bool,

    /// Output format: 'csv' or 'json'
    #[arg(long, default_value = "csv")]
    pub format: String,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<String>,
}

/// Arguments for `newswire latest`
#[derive(Args, Debug)]
pub struct LatestArgs {
    /// Feed to query (interval-named feeds only)
    pub feed: String,

    /// Use the machine-translated variant (v2 feeds only)
    #[arg(short, long)]
    pub translation: bool,

    /// Output format: 'csv' or 'json'
    #[arg(long, default_value = "csv")]
    pub format: String,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<String>,
}

/// Result cache subcommands
#[derive(Subcommand, Debug)]
pub enum CacheCommand {
    /// Show cache size
    Stats,

    /// Remove cached results
    Clear {
        /// Remove only the entry for this fingerprint
        #[arg(long)]
        fingerprint: Option<String>,
    },

    /// Remove entries older than a number of days
    Prune {
        /// Age threshold in days
        #[arg(long, default_value = "30")]
        days: u64,
    },
}

/// Fetch ledger subcommands
#[derive(Subcommand, Debug)]
pub enum LedgerCommand {
    /// Show ledger size
    Stats,

    /// Forget recorded fetches
    Clear {
        /// Forget only the record for this fingerprint
        #[arg(long)]
        fingerprint: Option<String>,
    },
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_structure_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_fetch_args_parse() {
        let cli = Cli::parse_from([
            "newswire",
            "fetch",
            "events-v2",
            "2021-01-01",
            "2021-01-02",
            "--incremental",
            "--mode",
            "pool",
        ]);
        let Some(Commands::Fetch(args)) = cli.command else {
            panic!("expected fetch command");
        };
        assert_eq!(args.feed, "events-v2");
        assert!(args.incremental);
        assert!(!args.force_refresh);
        assert_eq!(args.mode, "pool");
    }

    #[test]
    fn test_cache_clear_parse() {
        let cli = Cli::parse_from(["newswire", "cache", "clear", "--fingerprint", "abc"]);
        let Some(Commands::Cache {
            command: CacheCommand::Clear { fingerprint },
        }) = cli.command
        else {
            panic!("expected cache clear command");
        };
        assert_eq!(fingerprint.as_deref(), Some("abc"));
    }
}
