//! `newswire cache` command implementation

use crate::config::CliConfig;
use crate::error::Result;
use crate::progress::format_bytes;
use crate::CacheCommand;
use colored::Colorize;

/// Manage the result cache
pub async fn run(command: &CacheCommand) -> Result<()> {
    let cache = CliConfig::from_env().open_cache()?;

    match command {
        CacheCommand::Stats => {
            let stats = cache.stats()?;
            println!("Cache directory: {}", cache.dir().display());
            println!("  Entries: {}", stats.entries);
            println!("  Size: {}", format_bytes(stats.bytes));
        },
        CacheCommand::Clear { fingerprint } => match fingerprint {
            Some(fingerprint) => {
                if cache.remove(fingerprint)? {
                    println!("{} Removed entry {}", "✓".green(), fingerprint);
                } else {
                    println!("No entry for {}", fingerprint);
                }
            },
            None => {
                let removed = cache.clear()?;
                println!("{} Removed {} entry(ies)", "✓".green(), removed);
            },
        },
        CacheCommand::Prune { days } => {
            let removed = cache.prune_older_than(*days)?;
            println!(
                "{} Removed {} entry(ies) older than {} day(s)",
                "✓".green(),
                removed,
                days
            );
        },
    }

    Ok(())
}
