//! Newswire CLI - Main entry point

use clap::Parser;
use newswire_cli::{Cli, Commands};
use newswire_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};
use std::process;
use tracing::error;

#[tokio::main]
async fn main() {
    // Load .env if present (proxy, cache paths)
    let _ = dotenvy::dotenv();

    // Parse command-line arguments
    let cli = Cli::parse();

    // Handle markdown help generation
    if cli.markdown_help {
        println!("{}", clap_markdown::help_markdown::<Cli>());
        return;
    }

    // Ensure a command is provided
    if cli.command.is_none() {
        eprintln!("Error: A subcommand is required");
        eprintln!();
        eprintln!("For more information, try '--help'.");
        process::exit(2);
    }

    // Initialize logging based on verbose flag and environment
    let log_config = if cli.verbose {
        LogConfig::builder()
            .level(LogLevel::Debug)
            .output(LogOutput::Console)
            .log_file_prefix("newswire-cli".to_string())
            .build()
    } else {
        LogConfig::builder()
            .level(LogLevel::Warn)
            .output(LogOutput::Console)
            .log_file_prefix("newswire-cli".to_string())
            .build()
    };

    // Environment variables take precedence when any are set
    let env_configured = [
        "LOG_LEVEL",
        "LOG_OUTPUT",
        "LOG_FORMAT",
        "LOG_DIR",
        "LOG_FILE_PREFIX",
        "LOG_FILTER",
    ]
        .iter()
        .any(|var| std::env::var(var).is_ok());
    let log_config = if env_configured {
        LogConfig::from_env().unwrap_or(log_config)
    } else {
        log_config
    };

    // The CLI still works when logging cannot be set up
    let _ = init_logging(&log_config);

    // Execute command
    let result = execute_command(&cli).await;

    if let Err(e) = result {
        error!(error = %e, "Command failed");
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Execute the CLI command
async fn execute_command(cli: &Cli) -> newswire_cli::Result<()> {
    let Some(ref command) = cli.command else {
        unreachable!("Command should have been validated in main");
    };

    match command {
        Commands::Fetch(args) => newswire_cli::commands::fetch::run(args, cli.proxy.as_deref()).await,

        Commands::Latest(args) => {
            newswire_cli::commands::latest::run(args, cli.proxy.as_deref()).await
        }

        Commands::Cache { command } => newswire_cli::commands::cache::run(command).await,

        Commands::Ledger { command } => newswire_cli::commands::ledger::run(command).await,
    }
}
