//! Concurrent batch execution
//!
//! Runs one fetch-and-parse task per remote file under one of two
//! interchangeable models. Both honor the same contract: every input file
//! produces exactly one outcome, one file's failure never disturbs the
//! others, and completion order is unspecified.

use crate::fetch::{FetchOutcome, FileFetcher};
use crate::naming::FileRef;
use crate::parse::parse;
use crate::schema::FeedSchema;
use crate::table::{SkipReason, TaskOutcome};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Which concurrency model runs the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// A fixed crew of workers draining a shared queue; suited to long
    /// batches of large files
    #[default]
    WorkerPool,
    /// One task per file, throttled by a semaphore; higher throughput for
    /// many small files
    EventLoop,
}

impl std::str::FromStr for ExecutionMode {
    type Err = crate::error::FeedError;

    fn from_str(s: &str) -> crate::error::Result<Self> {
        match s.to_lowercase().as_str() {
            "pool" | "worker-pool" => Ok(ExecutionMode::WorkerPool),
            "async" | "event-loop" => Ok(ExecutionMode::EventLoop),
            other => Err(crate::error::FeedError::config(format!(
                "unknown execution mode '{}'; expected 'pool' or 'async'",
                other
            ))),
        }
    }
}

/// Concurrency settings for one batch.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecutorConfig {
    pub mode: ExecutionMode,
    /// Worker count (pool) or in-flight limit (event loop); a model-specific
    /// default applies when unset
    pub concurrency: Option<usize>,
}

const DEFAULT_IN_FLIGHT: usize = 16;

fn default_pool_size() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
        * 2
}

/// Run one batch and return an outcome per input file, in completion order.
pub async fn run_batch(
    fetcher: Arc<dyn FileFetcher>,
    schema: &'static FeedSchema,
    raw: bool,
    refs: Vec<FileRef>,
    config: ExecutorConfig,
) -> Vec<(String, TaskOutcome)> {
    if refs.is_empty() {
        return Vec::new();
    }
    match config.mode {
        ExecutionMode::WorkerPool => {
            let workers = config.concurrency.unwrap_or_else(default_pool_size);
            worker_pool(fetcher, schema, raw, refs, workers.max(1)).await
        },
        ExecutionMode::EventLoop => {
            let in_flight = config.concurrency.unwrap_or(DEFAULT_IN_FLIGHT);
            event_loop(fetcher, schema, raw, refs, in_flight.max(1)).await
        },
    }
}

/// Fetch one file and decode it off the async runtime.
pub(crate) async fn run_task(
    fetcher: &dyn FileFetcher,
    schema: &'static FeedSchema,
    raw: bool,
    file: &FileRef,
) -> TaskOutcome {
    let timeout = Duration::from_secs(schema.timeout_secs);
    match fetcher.fetch(&file.url, timeout).await {
        FetchOutcome::Fetched(bytes) => {
            let handle = tokio::task::spawn_blocking(move || parse(&bytes, schema, raw));
            match handle.await {
                Ok(Ok(table)) => {
                    debug!(file = %file.name, rows = table.len(), "Decoded file");
                    TaskOutcome::Table(table)
                },
                Ok(Err(e)) => {
                    warn!(file = %file.name, error = %e, "Skipping undecodable file");
                    TaskOutcome::Skipped(SkipReason::Parse(e.to_string()))
                },
                Err(e) => {
                    warn!(file = %file.name, error = %e, "Decode task aborted");
                    TaskOutcome::Skipped(SkipReason::Parse(format!("decode task aborted: {}", e)))
                },
            }
        },
        FetchOutcome::NotFound => {
            debug!(file = %file.name, "File not present upstream");
            TaskOutcome::Skipped(SkipReason::NotFound)
        },
        FetchOutcome::Failed(e) => TaskOutcome::Skipped(SkipReason::Fetch(e)),
    }
}

async fn worker_pool(
    fetcher: Arc<dyn FileFetcher>,
    schema: &'static FeedSchema,
    raw: bool,
    refs: Vec<FileRef>,
    workers: usize,
) -> Vec<(String, TaskOutcome)> {
    let queue = Arc::new(Mutex::new(refs.into_iter().collect::<VecDeque<_>>()));
    let mut set: JoinSet<Vec<(String, TaskOutcome)>> = JoinSet::new();

    for _ in 0..workers {
        let queue = Arc::clone(&queue);
        let fetcher = Arc::clone(&fetcher);
        set.spawn(async move {
            let mut done = Vec::new();
            loop {
                // Hold the lock only for the pop; the fetch runs unlocked.
                let Some(file) = queue.lock().ok().and_then(|mut q| q.pop_front()) else {
                    return done;
                };
                let outcome = run_task(fetcher.as_ref(), schema, raw, &file).await;
                done.push((file.name, outcome));
            }
        });
    }

    let mut outcomes = Vec::new();
    while let Some(result) = set.join_next().await {
        match result {
            Ok(worker_outcomes) => outcomes.extend(worker_outcomes),
            Err(e) => warn!(error = %e, "Batch worker aborted"),
        }
    }
    outcomes
}

async fn event_loop(
    fetcher: Arc<dyn FileFetcher>,
    schema: &'static FeedSchema,
    raw: bool,
    refs: Vec<FileRef>,
    in_flight: usize,
) -> Vec<(String, TaskOutcome)> {
    let semaphore = Arc::new(Semaphore::new(in_flight));
    let mut set: JoinSet<(String, TaskOutcome)> = JoinSet::new();

    for file in refs {
        let semaphore = Arc::clone(&semaphore);
        let fetcher = Arc::clone(&fetcher);
        set.spawn(async move {
            // Closing the semaphore is not part of this flow, so acquire
            // can only fail if the task itself is being torn down.
            let _permit = semaphore.acquire_owned().await;
            let outcome = run_task(fetcher.as_ref(), schema, raw, &file).await;
            (file.name, outcome)
        });
    }

    let mut outcomes = Vec::new();
    while let Some(result) = set.join_next().await {
        match result {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => warn!(error = %e, "Batch task aborted"),
        }
    }
    outcomes
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::schema::{EVENTS_V1, EVENTS_V2};
    use async_trait::async_trait;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn zip_row() -> Vec<u8> {
        let mut buf = std::io::Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buf);
            writer
                .start_file("data.csv", zip::write::FileOptions::default())
                .unwrap();
            writer.write_all(vec!["x"; 57].join("\t").as_bytes()).unwrap();
            writer.finish().unwrap();
        }
        buf.into_inner()
    }

    /// Routes by URL substring: "good" parses, "missing" is absent, "dead"
    /// fails, "garbage" fetches but cannot be decoded.
    struct RoutingFetcher {
        calls: AtomicUsize,
    }

    impl RoutingFetcher {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl FileFetcher for RoutingFetcher {
        async fn fetch(&self, url: &str, _timeout: Duration) -> FetchOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if url.contains("missing") {
                FetchOutcome::NotFound
            } else if url.contains("dead") {
                FetchOutcome::Failed("connection reset".to_string())
            } else if url.contains("garbage") {
                FetchOutcome::Fetched(b"not a zip".to_vec())
            } else {
                FetchOutcome::Fetched(zip_row())
            }
        }
    }

    fn refs(names: &[&str]) -> Vec<FileRef> {
        names
            .iter()
            .map(|n| FileRef {
                name: n.to_string(),
                url: format!("http://host/{}", n),
            })
            .collect()
    }

    async fn run_mixed(mode: ExecutionMode) {
        let fetcher = Arc::new(RoutingFetcher::new());
        let outcomes = run_batch(
            Arc::clone(&fetcher) as Arc<dyn FileFetcher>,
            &EVENTS_V1,
            false,
            refs(&["good-1", "missing-2", "dead-3", "garbage-4", "good-5"]),
            ExecutorConfig {
                mode,
                concurrency: Some(3),
            },
        )
        .await;

        assert_eq!(outcomes.len(), 5);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 5);

        let outcome_for = |name: &str| {
            outcomes
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, o)| o)
                .unwrap()
        };
        assert!(matches!(outcome_for("good-1"), TaskOutcome::Table(t) if t.len() == 1));
        assert!(matches!(
            outcome_for("missing-2"),
            TaskOutcome::Skipped(SkipReason::NotFound)
        ));
        assert!(matches!(
            outcome_for("dead-3"),
            TaskOutcome::Skipped(SkipReason::Fetch(_))
        ));
        assert!(matches!(
            outcome_for("garbage-4"),
            TaskOutcome::Skipped(SkipReason::Parse(_))
        ));
        assert!(matches!(outcome_for("good-5"), TaskOutcome::Table(_)));
    }

    #[tokio::test]
    async fn test_event_loop_isolates_failures() {
        run_mixed(ExecutionMode::EventLoop).await;
    }

    #[tokio::test]
    async fn test_worker_pool_isolates_failures() {
        run_mixed(ExecutionMode::WorkerPool).await;
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let fetcher = Arc::new(RoutingFetcher::new());
        let outcomes = run_batch(
            fetcher as Arc<dyn FileFetcher>,
            &EVENTS_V2,
            false,
            Vec::new(),
            ExecutorConfig::default(),
        )
        .await;
        assert!(outcomes.is_empty());
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!("pool".parse::<ExecutionMode>().unwrap(), ExecutionMode::WorkerPool);
        assert_eq!("async".parse::<ExecutionMode>().unwrap(), ExecutionMode::EventLoop);
        assert!("threads".parse::<ExecutionMode>().is_err());
    }
}
