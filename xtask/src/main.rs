//! Build automation tasks for Newswire
//!
//! - Generating CLI documentation from source code
//! - Future build-related tasks

use clap::Parser;
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Build automation tasks for Newswire", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Parser)]
enum Command {
    /// Generate CLI documentation in markdown format
    GenerateCliDocs {
        /// Output directory for generated documentation
        #[arg(short, long, default_value = "docs")]
        output_dir: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::GenerateCliDocs { output_dir } => generate_cli_docs(&output_dir)?,
    }

    Ok(())
}

fn generate_cli_docs(output_dir: &str) -> anyhow::Result<()> {
    println!("Generating CLI documentation...");

    // Generate markdown from clap definitions
    let markdown = clap_markdown::help_markdown::<newswire_cli::Cli>();

    let content = format!(
        r#"---
title: CLI Reference
description: Complete command reference for the Newswire CLI
---

# Newswire CLI Reference

This documentation is auto-generated from the CLI source code. Last updated: {}.

## Overview

Newswire retrieves time-partitioned news feed archives, assembles them into
tables, and keeps results cached and incrementally up to date.

## Installation

```bash
cargo install --path crates/newswire-cli
```

## Quick Start

```bash
# Fetch one day of the 15-minute event feed
newswire fetch events-v2 2021-01-01 2021-01-02 --output events.csv

# Re-run later, fetching only files that appeared since
newswire fetch events-v2 2021-01-01 2021-01-02 --incremental --output events.csv

# Grab the freshest available knowledge-graph file
newswire latest gkg-v2

# Inspect local state
newswire cache stats
newswire ledger stats
```

## Commands

{}

## Environment Variables

- `NEWSWIRE_CACHE_DIR` - Result cache directory (default: per-user cache directory)
- `NEWSWIRE_LEDGER_PATH` - Fetch ledger database file
- `NEWSWIRE_PROXY` - HTTP or SOCKS proxy URL
- `LOG_LEVEL`, `LOG_OUTPUT`, `LOG_FORMAT`, `LOG_DIR`, `LOG_FILE_PREFIX`, `LOG_FILTER` - Logging setup

---

*This documentation is automatically generated from the CLI source code. To update, run `cargo xtask generate-cli-docs`.*
"#,
        chrono::Utc::now().format("%Y-%m-%d"),
        markdown
    );

    // Create output directory if it doesn't exist
    let output_path = PathBuf::from(output_dir);
    fs::create_dir_all(&output_path)?;

    let file_path = output_path.join("cli-reference.md");
    fs::write(&file_path, content)?;

    println!("Generated CLI documentation at: {}", file_path.display());
    Ok(())
}
