//! Newswire Feed Library
//!
//! Retrieval and assembly of time-partitioned news feed archives: a query
//! window is mapped to the set of remote files covering it, the files are
//! fetched and decoded concurrently, and the survivors are assembled into
//! one table. Results can be cached whole and re-runs can be reduced to
//! the not-yet-fetched delta.
//!
//! # Supported Feeds
//!
//! - **events-v1 / events-v2**: coded event tables (daily / 15-minute)
//! - **mentions**: event mention tables (15-minute)
//! - **gkg-v1 / gkg-v2**: knowledge-graph tables (daily / 15-minute)
//! - **geg**: entity-graph files addressed through a master index
//! - **vgeg**: broadcast entity-graph files addressed through daily indexes
//!
//! # Example
//!
//! ```no_run
//! use newswire_feed::fetch::{Fetcher, RetryPolicy};
//! use newswire_feed::pipeline::{FeedPipeline, PipelineOptions};
//! use newswire_feed::query::Query;
//! use newswire_feed::schema::FeedKind;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> newswire_feed::Result<()> {
//!     let fetcher = Arc::new(Fetcher::new(RetryPolicy::default(), None)?);
//!     let pipeline = FeedPipeline::new(fetcher);
//!     let query = Query::new(FeedKind::EventsV2, "2021-01-01", "2021-01-02")?;
//!     let output = pipeline.run(&query, &PipelineOptions::default()).await?;
//!     println!("{} rows", output.table.len());
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod error;
pub mod executor;
pub mod fetch;
pub mod fulltext;
pub mod ledger;
pub mod naming;
pub mod parse;
pub mod pipeline;
pub mod query;
pub mod schema;
pub mod table;

pub use error::{FeedError, Result};
