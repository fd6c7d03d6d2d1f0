//! `newswire fetch` command implementation

use crate::config::CliConfig;
use crate::error::{CliError, Result};
use crate::output::{write_table, OutputFormat};
use crate::progress::create_spinner;
use crate::FetchArgs;
use colored::Colorize;
use newswire_feed::executor::{ExecutionMode, ExecutorConfig};
use newswire_feed::fetch::{Fetcher, FileFetcher, RetryPolicy};
use newswire_feed::fulltext::FullTextEnricher;
use newswire_feed::pipeline::{FeedPipeline, PipelineOptions};
use newswire_feed::query::Query;
use newswire_feed::schema::FeedKind;
use std::path::Path;
use std::sync::Arc;

/// Column holding per-row article URLs, for feeds that have one.
fn source_url_column(feed: FeedKind) -> Option<&'static str> {
    match feed {
        FeedKind::EventsV1 | FeedKind::EventsV2 => Some("SOURCEURL"),
        FeedKind::Mentions => Some("MentionIdentifier"),
        FeedKind::GkgV2 => Some("V2DOCUMENTIDENTIFIER"),
        FeedKind::Geg => Some("url"),
        FeedKind::GkgV1 | FeedKind::Vgeg => None,
    }
}

/// Fetch a feed over a date window
pub async fn run(args: &FetchArgs, proxy: Option<&str>) -> Result<()> {
    let feed: FeedKind = args.feed.parse()?;
    let mode: ExecutionMode = args.mode.parse()?;
    let format: OutputFormat = args.format.parse()?;

    let query = Query::new(feed, &args.start, &args.end)?
        .with_translation(args.translation)
        .with_domain(args.domain.clone())
        .with_raw(args.raw)
        .with_end_inclusive(args.end_inclusive);

    let config = CliConfig::from_env();
    let fetcher: Arc<dyn FileFetcher> = Arc::new(Fetcher::new(RetryPolicy::default(), proxy)?);
    let mut pipeline = FeedPipeline::new(Arc::clone(&fetcher));
    if !args.no_cache {
        pipeline = pipeline.with_cache(config.open_cache()?);
    }
    if args.incremental {
        pipeline = pipeline.with_ledger(config.open_ledger()?);
    }

    let options = PipelineOptions {
        use_cache: !args.no_cache,
        incremental: args.incremental,
        force_refresh: args.force_refresh,
        executor: ExecutorConfig {
            mode,
            concurrency: args.concurrency,
        },
    };

    let spinner = create_spinner(&format!(
        "Fetching {} from {} to {}...",
        feed, args.start, args.end
    ));
    let result = pipeline.run(&query, &options).await;
    spinner.finish_and_clear();
    let mut output = result?;

    if args.fulltext {
        let column = source_url_column(feed).ok_or_else(|| {
            CliError::invalid_argument(format!(
                "feed '{}' has no per-row source URL, so --fulltext does not apply",
                feed
            ))
        })?;
        let spinner = create_spinner("Fetching article texts...");
        let enricher = FullTextEnricher::new(fetcher);
        let result = enricher.enrich(&mut output.table, column).await;
        spinner.finish_and_clear();
        result?;
    }

    let stats = output.stats;
    let source = if output.from_cache { " (cached)" } else { "" };
    eprintln!(
        "{} {} row(s) from {} of {} file(s){}",
        "✓".green(),
        output.table.len(),
        stats.succeeded,
        stats.attempted,
        source
    );
    if stats.not_found > 0 {
        eprintln!("  {} file(s) not present upstream", stats.not_found);
    }
    if stats.failed > 0 {
        eprintln!(
            "  {} {} file(s) failed; re-run to retry them",
            "!".yellow(),
            stats.failed
        );
    }

    write_table(&output.table, format, args.output.as_deref().map(Path::new))?;
    Ok(())
}
