//! `newswire ledger` command implementation

use crate::config::CliConfig;
use crate::error::Result;
use crate::LedgerCommand;
use colored::Colorize;

/// Manage the incremental fetch ledger
pub async fn run(command: &LedgerCommand) -> Result<()> {
    let ledger = CliConfig::from_env().open_ledger()?;

    match command {
        LedgerCommand::Stats => {
            let stats = ledger.stats()?;
            println!("Recorded queries: {}", stats.queries);
            println!("Recorded files: {}", stats.files);
        },
        LedgerCommand::Clear { fingerprint } => match fingerprint {
            Some(fingerprint) => {
                if ledger.clear(fingerprint)? {
                    println!("{} Forgot record for {}", "✓".green(), fingerprint);
                } else {
                    println!("No record for {}", fingerprint);
                }
            },
            None => {
                let removed = ledger.clear_all()?;
                println!("{} Forgot {} record(s)", "✓".green(), removed);
            },
        },
    }

    Ok(())
}
