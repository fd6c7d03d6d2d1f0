//! Remote file name generation
//!
//! Maps a query window to the concrete set of remote files covering it.
//! Interval feeds compute names directly from time slots; indexed feeds
//! fetch an upstream listing and filter it. Either way the output is the
//! definitive work list for the batch, ordered but safe to process in any
//! order.

use crate::error::{FeedError, Result};
use crate::fetch::{FetchOutcome, FileFetcher};
use crate::query::Query;
use crate::schema::{schema_for, FeedSchema, NamingKind};
use chrono::NaiveDateTime;
use std::time::Duration;
use tracing::{debug, info};

/// One remote file of a batch: the short name used for bookkeeping and the
/// full URL used for fetching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRef {
    pub name: String,
    pub url: String,
}

impl FileRef {
    fn from_url(url: String) -> Self {
        let name = url
            .rsplit('/')
            .next()
            .unwrap_or(url.as_str())
            .to_string();
        Self { name, url }
    }
}

/// Generate the file list for a query. `base_url` overrides the schema's
/// upstream host; the fetcher is only used for indexed feeds.
pub async fn generate(
    fetcher: &dyn FileFetcher,
    query: &Query,
    base_url: Option<&str>,
) -> Result<Vec<FileRef>> {
    let schema = schema_for(query.feed);
    let base = base_url.unwrap_or(schema.base_url);

    let refs = match schema.naming {
        NamingKind::Interval => interval_refs(schema, query, base),
        NamingKind::MasterIndex => master_index_refs(fetcher, schema, query, base).await?,
        NamingKind::DailyIndex => daily_index_refs(fetcher, schema, query, base).await?,
    };

    info!(
        feed = %query.feed,
        files = refs.len(),
        "Generated file list"
    );
    Ok(refs)
}

/// Time slots covered by the query window, aligned to the feed's
/// granularity. The window is `[start, end)` unless `end_inclusive`.
fn window_slots(schema: &FeedSchema, query: &Query) -> Vec<NaiveDateTime> {
    let step = schema.granularity.step();
    let mut slot = schema.granularity.align_down(query.start);
    let mut slots = Vec::new();

    while slot < query.end || (query.end_inclusive && slot == query.end) {
        slots.push(slot);
        slot += step;
    }
    slots
}

fn interval_refs(schema: &FeedSchema, query: &Query, base: &str) -> Vec<FileRef> {
    window_slots(schema, query)
        .into_iter()
        .map(|slot| {
            let name = schema.file_name(slot, query.translation);
            let url = format!("{}{}", base, name);
            FileRef { name, url }
        })
        .collect()
}

/// First run of exactly 14 consecutive digits in a URL, which is the
/// timestamp token of an index entry.
fn timestamp_token(url: &str) -> Option<&str> {
    let bytes = url.as_bytes();
    let mut run_start = None;
    for (i, b) in bytes.iter().enumerate() {
        if b.is_ascii_digit() {
            if run_start.is_none() {
                run_start = Some(i);
            }
        } else if let Some(start) = run_start.take() {
            if i - start == 14 {
                return Some(&url[start..i]);
            }
        }
    }
    if let Some(start) = run_start {
        if bytes.len() - start == 14 {
            return Some(&url[start..]);
        }
    }
    None
}

async fn fetch_index(
    fetcher: &dyn FileFetcher,
    schema: &FeedSchema,
    url: &str,
) -> Result<Option<String>> {
    match fetcher
        .fetch(url, Duration::from_secs(schema.timeout_secs))
        .await
    {
        FetchOutcome::Fetched(bytes) => {
            let text = String::from_utf8_lossy(&bytes).into_owned();
            Ok(Some(text))
        },
        FetchOutcome::NotFound => Ok(None),
        FetchOutcome::Failed(e) => Err(FeedError::index(format!(
            "could not fetch index {}: {}",
            url, e
        ))),
    }
}

/// Fetch the master file list and keep the entries whose embedded timestamp
/// falls inside the query window.
async fn master_index_refs(
    fetcher: &dyn FileFetcher,
    schema: &FeedSchema,
    query: &Query,
    base: &str,
) -> Result<Vec<FileRef>> {
    let index_url = format!("{}MASTERFILELIST.TXT", base);
    let listing = fetch_index(fetcher, schema, &index_url)
        .await?
        .ok_or_else(|| FeedError::index(format!("index {} is missing upstream", index_url)))?;

    let start_token = query.start.format("%Y%m%d%H%M%S").to_string();
    let end_token = query.end.format("%Y%m%d%H%M%S").to_string();

    let refs = listing
        .lines()
        .filter_map(|line| {
            // Index rows may carry size/hash columns before the URL.
            let url = line.split_whitespace().last()?;
            let token = timestamp_token(url)?;
            let in_window = token >= start_token.as_str()
                && (token < end_token.as_str()
                    || (query.end_inclusive && token == end_token.as_str()));
            in_window.then(|| FileRef::from_url(url.to_string()))
        })
        .collect();
    Ok(refs)
}

/// Fetch one index listing per day in the window and keep the entries
/// matching the domain and the raw/processed marker. A missing day listing
/// contributes nothing; an unreachable one fails the batch.
async fn daily_index_refs(
    fetcher: &dyn FileFetcher,
    schema: &FeedSchema,
    query: &Query,
    base: &str,
) -> Result<Vec<FileRef>> {
    let domain = query
        .domain
        .as_deref()
        .ok_or_else(|| FeedError::config("the vgeg feed requires a domain filter"))?
        .to_uppercase();
    let marker = if query.raw { "raw" } else { "vgeg.v2" };

    let mut refs = Vec::new();
    for slot in window_slots(schema, query) {
        let index_url = format!("{}{}.txt", base, slot.format("%Y%m%d"));
        let Some(listing) = fetch_index(fetcher, schema, &index_url).await? else {
            debug!(url = %index_url, "No index listing for this day");
            continue;
        };

        refs.extend(
            listing
                .lines()
                .filter_map(|line| line.split_whitespace().last())
                .filter(|url| url.contains(&domain) && url.contains(marker))
                .map(|url| FileRef::from_url(url.to_string())),
        );
    }
    Ok(refs)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::schema::FeedKind;
    use async_trait::async_trait;
    use std::collections::HashMap;

    /// Serves canned index listings keyed by URL; everything else is absent.
    struct StubFetcher {
        listings: HashMap<String, String>,
    }

    #[async_trait]
    impl FileFetcher for StubFetcher {
        async fn fetch(&self, url: &str, _timeout: Duration) -> FetchOutcome {
            match self.listings.get(url) {
                Some(body) => FetchOutcome::Fetched(body.clone().into_bytes()),
                None => FetchOutcome::NotFound,
            }
        }
    }

    fn no_fetcher() -> StubFetcher {
        StubFetcher {
            listings: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn test_interval_daily_window_is_end_exclusive() {
        let query = Query::new(FeedKind::EventsV1, "2021-01-01", "2021-01-04").unwrap();
        let refs = generate(&no_fetcher(), &query, None).await.unwrap();
        let names: Vec<_> = refs.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "20210101.export.CSV.zip",
                "20210102.export.CSV.zip",
                "20210103.export.CSV.zip",
            ]
        );
        assert_eq!(
            refs[0].url,
            "http://data.gdeltproject.org/events/20210101.export.CSV.zip"
        );
    }

    #[tokio::test]
    async fn test_interval_end_inclusive_adds_one_slot() {
        let query = Query::new(FeedKind::EventsV1, "2021-01-01", "2021-01-04")
            .unwrap()
            .with_end_inclusive(true);
        let refs = generate(&no_fetcher(), &query, None).await.unwrap();
        assert_eq!(refs.len(), 4);
        assert_eq!(refs[3].name, "20210104.export.CSV.zip");
    }

    #[tokio::test]
    async fn test_interval_quarter_hour_slots() {
        let query = Query::new(
            FeedKind::EventsV2,
            "2021-01-01-00-00-00",
            "2021-01-01-01-00-00",
        )
        .unwrap();
        let refs = generate(&no_fetcher(), &query, None).await.unwrap();
        let names: Vec<_> = refs.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "20210101000000.export.CSV.zip",
                "20210101001500.export.CSV.zip",
                "20210101003000.export.CSV.zip",
                "20210101004500.export.CSV.zip",
            ]
        );
    }

    #[tokio::test]
    async fn test_generate_is_deterministic() {
        let query = Query::new(
            FeedKind::GkgV2,
            "2021-01-01-00-00-00",
            "2021-01-01-02-00-00",
        )
        .unwrap();
        let first = generate(&no_fetcher(), &query, None).await.unwrap();
        let second = generate(&no_fetcher(), &query, None).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 8);
    }

    #[tokio::test]
    async fn test_interval_empty_window_when_end_before_start() {
        let query = Query::new(FeedKind::EventsV1, "2021-01-04", "2021-01-01").unwrap();
        let refs = generate(&no_fetcher(), &query, None).await.unwrap();
        assert!(refs.is_empty());
    }

    #[test]
    fn test_timestamp_token_extraction() {
        assert_eq!(
            timestamp_token("http://host/20210101123000.geg-gcnlapi.json.gz"),
            Some("20210101123000")
        );
        // shorter digit runs are skipped
        assert_eq!(
            timestamp_token("http://host/v3/20210101123000.json.gz"),
            Some("20210101123000")
        );
        assert_eq!(timestamp_token("http://host/20210101.json.gz"), None);
        assert_eq!(timestamp_token("http://host/nodigits.json.gz"), None);
    }

    #[tokio::test]
    async fn test_master_index_window_filter() {
        let base = "http://host/geg/";
        let listing = "\
http://host/geg/20201231234500.geg-gcnlapi.json.gz
http://host/geg/20210101000000.geg-gcnlapi.json.gz
http://host/geg/20210101234500.geg-gcnlapi.json.gz
http://host/geg/20210102000000.geg-gcnlapi.json.gz
not-an-entry
";
        let fetcher = StubFetcher {
            listings: HashMap::from([(
                format!("{}MASTERFILELIST.TXT", base),
                listing.to_string(),
            )]),
        };

        let query = Query::new(FeedKind::Geg, "2021-01-01", "2021-01-02").unwrap();
        let refs = generate(&fetcher, &query, Some(base)).await.unwrap();
        let names: Vec<_> = refs.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "20210101000000.geg-gcnlapi.json.gz",
                "20210101234500.geg-gcnlapi.json.gz",
            ]
        );

        let inclusive = query.clone().with_end_inclusive(true);
        let refs = generate(&fetcher, &inclusive, Some(base)).await.unwrap();
        assert_eq!(refs.len(), 3);
    }

    #[tokio::test]
    async fn test_master_index_missing_is_an_error() {
        let query = Query::new(FeedKind::Geg, "2021-01-01", "2021-01-02").unwrap();
        let result = generate(&no_fetcher(), &query, Some("http://host/geg/")).await;
        assert!(matches!(result, Err(FeedError::Index(_))));
    }

    #[tokio::test]
    async fn test_daily_index_domain_and_marker_filter() {
        let base = "http://host/vgeg/";
        let listing = "\
http://host/vgeg/BBCNEWS_20210101_000000_Show.vgeg.v2.json.gz
http://host/vgeg/BBCNEWS_20210101_010000_Show.rawvgeg.json.gz
http://host/vgeg/CNNW_20210101_000000_Show.vgeg.v2.json.gz
";
        let fetcher = StubFetcher {
            listings: HashMap::from([(format!("{}20210101.txt", base), listing.to_string())]),
        };

        let query = Query::new(FeedKind::Vgeg, "2021-01-01", "2021-01-02")
            .unwrap()
            .with_domain(Some("bbcnews".to_string()));
        let refs = generate(&fetcher, &query, Some(base)).await.unwrap();
        let names: Vec<_> = refs.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["BBCNEWS_20210101_000000_Show.vgeg.v2.json.gz"]);

        let raw = query.clone().with_raw(true);
        let refs = generate(&fetcher, &raw, Some(base)).await.unwrap();
        let names: Vec<_> = refs.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["BBCNEWS_20210101_010000_Show.rawvgeg.json.gz"]);
    }

    #[tokio::test]
    async fn test_daily_index_missing_day_contributes_nothing() {
        let query = Query::new(FeedKind::Vgeg, "2021-01-01", "2021-01-03")
            .unwrap()
            .with_domain(Some("BBCNEWS".to_string()));
        let refs = generate(&no_fetcher(), &query, Some("http://host/vgeg/"))
            .await
            .unwrap();
        assert!(refs.is_empty());
    }
}
