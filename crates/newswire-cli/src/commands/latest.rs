//! `newswire latest` command implementation

use crate::error::Result;
use crate::output::{write_table, OutputFormat};
use crate::progress::create_spinner;
use crate::LatestArgs;
use colored::Colorize;
use newswire_feed::fetch::{Fetcher, RetryPolicy};
use newswire_feed::pipeline::FeedPipeline;
use newswire_feed::schema::FeedKind;
use std::path::Path;
use std::sync::Arc;

/// Fetch the most recent available file of a feed
pub async fn run(args: &LatestArgs, proxy: Option<&str>) -> Result<()> {
    let feed: FeedKind = args.feed.parse()?;
    let format: OutputFormat = args.format.parse()?;

    let fetcher = Arc::new(Fetcher::new(RetryPolicy::default(), proxy)?);
    let pipeline = FeedPipeline::new(fetcher);

    let spinner = create_spinner(&format!("Looking for the latest {} file...", feed));
    let result = pipeline.fetch_latest(feed, args.translation).await;
    spinner.finish_and_clear();
    let latest = result?;

    eprintln!(
        "{} {} row(s) from the {} slot",
        "✓".green(),
        latest.table.len(),
        latest.slot.format("%Y-%m-%d %H:%M:%S")
    );

    write_table(&latest.table, format, args.output.as_deref().map(Path::new))?;
    Ok(())
}
