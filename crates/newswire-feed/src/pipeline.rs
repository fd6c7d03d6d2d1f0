//! Query pipeline
//!
//! Orchestrates one query end to end: validate, consult the result cache,
//! generate the file list, subtract already-fetched files when running
//! incrementally, execute the batch, assemble the table, and persist what
//! completed. The cache and the ledger are both optional collaborators;
//! the pipeline works with any combination of them.

use crate::cache::ResultCache;
use crate::error::{FeedError, Result};
use crate::executor::{self, ExecutorConfig};
use crate::fetch::FileFetcher;
use crate::ledger::FetchLedger;
use crate::naming::{self, FileRef};
use crate::query::Query;
use crate::schema::{schema_for, FeedKind, NamingKind};
use crate::table::{assemble, BatchStats, DataTable, TaskOutcome};
use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Per-run switches; the query itself stays immutable across runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineOptions {
    /// Serve and store whole results keyed by the query fingerprint
    pub use_cache: bool,
    /// Subtract already-fetched files from the batch via the ledger
    pub incremental: bool,
    /// Ignore a cached result and fetch anew (the cache is still written)
    pub force_refresh: bool,
    pub executor: ExecutorConfig,
}

/// Result of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryOutput {
    pub table: DataTable,
    pub stats: BatchStats,
    #[serde(default, skip_serializing)]
    pub from_cache: bool,
}

/// Result of a latest-slot lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct LatestOutput {
    pub slot: NaiveDateTime,
    pub table: DataTable,
}

/// How many slots [`FeedPipeline::fetch_latest`] walks back before giving
/// up. Upstream publishes with a small, variable lag.
const LATEST_WALK_BACK: u32 = 8;

/// The orchestrator. Construct once, run many queries.
pub struct FeedPipeline {
    fetcher: Arc<dyn FileFetcher>,
    cache: Option<ResultCache>,
    ledger: Option<FetchLedger>,
    base_url: Option<String>,
}

impl FeedPipeline {
    pub fn new(fetcher: Arc<dyn FileFetcher>) -> Self {
        Self {
            fetcher,
            cache: None,
            ledger: None,
            base_url: None,
        }
    }

    /// Attach a result cache.
    pub fn with_cache(mut self, cache: ResultCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Attach an incremental fetch ledger.
    pub fn with_ledger(mut self, ledger: FetchLedger) -> Self {
        self.ledger = Some(ledger);
        self
    }

    /// Override the upstream base URL for every feed.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn cache(&self) -> Option<&ResultCache> {
        self.cache.as_ref()
    }

    pub fn ledger(&self) -> Option<&FetchLedger> {
        self.ledger.as_ref()
    }

    /// Run one query to completion.
    pub async fn run(&self, query: &Query, options: &PipelineOptions) -> Result<QueryOutput> {
        query.validate()?;
        let schema = schema_for(query.feed);
        let columns = schema.columns_for(query.raw);
        let fingerprint = query.fingerprint();

        if options.use_cache && !options.force_refresh {
            if let Some(cache) = &self.cache {
                if let Some(mut output) = cache.get::<QueryOutput>(&fingerprint) {
                    info!(feed = %query.feed, fingerprint = %fingerprint, "Serving cached result");
                    output.from_cache = true;
                    return Ok(output);
                }
            }
        }

        let candidates = naming::generate(
            self.fetcher.as_ref(),
            query,
            self.base_url.as_deref(),
        )
        .await?;

        let batch = if options.incremental {
            self.subtract_recorded(&fingerprint, candidates.clone())?
        } else {
            candidates.clone()
        };

        info!(
            feed = %query.feed,
            candidates = candidates.len(),
            fetching = batch.len(),
            "Running batch"
        );

        let covers_whole_window = batch.len() == candidates.len();
        let outcomes = executor::run_batch(
            Arc::clone(&self.fetcher),
            schema,
            query.raw,
            batch,
            options.executor,
        )
        .await;

        let assembly = assemble(outcomes, columns);
        if options.incremental {
            if let Some(ledger) = &self.ledger {
                ledger.record_fetched(&fingerprint, &assembly.completed)?;
            }
        }

        let output = QueryOutput {
            table: assembly.table,
            stats: assembly.stats,
            from_cache: false,
        };

        // A pruned batch yields a partial table, which must not shadow a
        // whole-window result under the same fingerprint.
        if options.use_cache && covers_whole_window {
            if let Some(cache) = &self.cache {
                cache.set(&fingerprint, &output)?;
            }
        }

        Ok(output)
    }

    fn subtract_recorded(
        &self,
        fingerprint: &str,
        candidates: Vec<FileRef>,
    ) -> Result<Vec<FileRef>> {
        let Some(ledger) = &self.ledger else {
            return Ok(candidates);
        };
        let recorded = ledger.recorded(fingerprint)?;
        if recorded.is_empty() {
            return Ok(candidates);
        }
        let before = candidates.len();
        let batch: Vec<_> = candidates
            .into_iter()
            .filter(|file| !recorded.contains(&file.name))
            .collect();
        debug!(
            fingerprint,
            skipped = before - batch.len(),
            "Subtracted already-fetched files"
        );
        Ok(batch)
    }

    /// Fetch the most recent available file of an interval feed, walking
    /// back slot by slot from the current time.
    pub async fn fetch_latest(&self, feed: FeedKind, translation: bool) -> Result<LatestOutput> {
        self.fetch_latest_from(feed, translation, Utc::now().naive_utc())
            .await
    }

    /// Same as [`Self::fetch_latest`], anchored at an explicit moment.
    pub async fn fetch_latest_from(
        &self,
        feed: FeedKind,
        translation: bool,
        now: NaiveDateTime,
    ) -> Result<LatestOutput> {
        let schema = schema_for(feed);
        if schema.naming != NamingKind::Interval {
            return Err(FeedError::config(format!(
                "feed '{}' is index-addressed and has no latest-slot lookup",
                feed
            )));
        }
        if translation && !schema.supports_translation {
            return Err(FeedError::config(format!(
                "feed '{}' has no translation variant",
                feed
            )));
        }

        let base = self.base_url.as_deref().unwrap_or(schema.base_url);
        let step = schema.granularity.step();
        let mut slot = schema.granularity.align_down(now);

        for _ in 0..LATEST_WALK_BACK {
            let name = schema.file_name(slot, translation);
            let file = FileRef {
                url: format!("{}{}", base, name),
                name,
            };
            match executor::run_task(self.fetcher.as_ref(), schema, false, &file).await {
                TaskOutcome::Table(table) => {
                    info!(feed = %feed, slot = %slot, rows = table.len(), "Found latest file");
                    return Ok(LatestOutput { slot, table });
                },
                TaskOutcome::Skipped(reason) => {
                    debug!(feed = %feed, slot = %slot, ?reason, "Slot unavailable, walking back");
                    slot -= step;
                },
            }
        }

        Err(FeedError::NoRecentFile {
            feed: feed.to_string(),
            steps: LATEST_WALK_BACK,
        })
    }
}
