//! Article full-text enrichment
//!
//! Resolves the source URLs of a result table into article text and
//! appends it as an extra column. Retrieval failures and unextractable
//! pages leave empty cells; enrichment never fails a table.

use crate::error::{FeedError, Result};
use crate::fetch::{FetchOutcome, FileFetcher};
use crate::table::DataTable;
use scraper::{Html, Selector};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Extracted article content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    pub title: Option<String>,
    pub text: String,
}

/// Turns a fetched page into article content. Implementations must be
/// cheap to call from blocking worker threads.
pub trait ArticleExtractor: Send + Sync {
    fn extract(&self, url: &str, html: &str) -> Option<Article>;
}

/// Paragraph-based extractor: the document title plus the concatenated
/// text of all paragraph elements.
#[derive(Debug, Default)]
pub struct HtmlTextExtractor;

impl ArticleExtractor for HtmlTextExtractor {
    fn extract(&self, url: &str, html: &str) -> Option<Article> {
        let document = Html::parse_document(html);
        let title_selector = Selector::parse("title").ok()?;
        let paragraph_selector = Selector::parse("p").ok()?;

        let title = document
            .select(&title_selector)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty());

        let text = document
            .select(&paragraph_selector)
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n");

        if text.is_empty() {
            debug!(url = %url, "No paragraph text found");
            return None;
        }
        Some(Article { title, text })
    }
}

/// Fetches article pages concurrently and appends their text to a table.
pub struct FullTextEnricher {
    fetcher: Arc<dyn FileFetcher>,
    extractor: Arc<dyn ArticleExtractor>,
    concurrency: usize,
    timeout: Duration,
}

impl FullTextEnricher {
    pub fn new(fetcher: Arc<dyn FileFetcher>) -> Self {
        Self {
            fetcher,
            extractor: Arc::new(HtmlTextExtractor),
            concurrency: 8,
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn ArticleExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Fetch and extract article text for a set of URLs. Duplicates are
    /// fetched once; URLs that fail or yield nothing are absent from the
    /// result.
    pub async fn fetch_texts(&self, urls: &[String]) -> HashMap<String, String> {
        let unique: HashSet<_> = urls
            .iter()
            .filter(|u| !u.trim().is_empty())
            .cloned()
            .collect();
        info!(urls = unique.len(), "Fetching article texts");

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut set: JoinSet<Option<(String, String)>> = JoinSet::new();

        for url in unique {
            let semaphore = Arc::clone(&semaphore);
            let fetcher = Arc::clone(&self.fetcher);
            let extractor = Arc::clone(&self.extractor);
            let timeout = self.timeout;
            set.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                let bytes = match fetcher.fetch(&url, timeout).await {
                    FetchOutcome::Fetched(bytes) => bytes,
                    FetchOutcome::NotFound => return None,
                    FetchOutcome::Failed(e) => {
                        debug!(url = %url, error = %e, "Article fetch failed");
                        return None;
                    },
                };
                let handle = tokio::task::spawn_blocking(move || {
                    let html = String::from_utf8_lossy(&bytes);
                    extractor
                        .extract(&url, &html)
                        .map(|article| (url, article.text))
                });
                handle.await.ok().flatten()
            });
        }

        let mut texts = HashMap::new();
        while let Some(result) = set.join_next().await {
            match result {
                Ok(Some((url, text))) => {
                    texts.insert(url, text);
                },
                Ok(None) => {},
                Err(e) => warn!(error = %e, "Article task aborted"),
            }
        }
        texts
    }

    /// Append a `fulltext` column resolved from `url_column`. Rows whose
    /// URL could not be resolved get an empty cell.
    pub async fn enrich(&self, table: &mut DataTable, url_column: &str) -> Result<()> {
        let urls = table.column_values(url_column).ok_or_else(|| {
            FeedError::config(format!(
                "table has no column '{}' to resolve article URLs from",
                url_column
            ))
        })?;

        let texts = self.fetch_texts(&urls).await;
        let cells = urls
            .iter()
            .map(|url| texts.get(url).cloned().unwrap_or_default())
            .collect();
        table.push_column("fulltext", cells);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    const PAGE: &str = "<html><head><title>Headline</title></head>\
        <body><p>First paragraph.</p><nav>menu</nav><p>Second paragraph.</p></body></html>";

    /// Serves `PAGE` for URLs containing "article"; everything else fails.
    struct PageFetcher;

    #[async_trait]
    impl FileFetcher for PageFetcher {
        async fn fetch(&self, url: &str, _timeout: Duration) -> FetchOutcome {
            if url.contains("article") {
                FetchOutcome::Fetched(PAGE.as_bytes().to_vec())
            } else {
                FetchOutcome::Failed("unreachable".to_string())
            }
        }
    }

    #[test]
    fn test_extractor_pulls_title_and_paragraphs() {
        let article = HtmlTextExtractor.extract("http://x", PAGE).unwrap();
        assert_eq!(article.title.as_deref(), Some("Headline"));
        assert_eq!(article.text, "First paragraph.\n\nSecond paragraph.");
    }

    #[test]
    fn test_extractor_rejects_pages_without_paragraphs() {
        let html = "<html><body><div>nothing here</div></body></html>";
        assert!(HtmlTextExtractor.extract("http://x", html).is_none());
    }

    #[tokio::test]
    async fn test_enrich_fills_and_leaves_gaps() {
        let mut table = DataTable::empty(&["id", "SOURCEURL"]);
        table.rows.push(vec!["1".into(), "http://host/article-1".into()]);
        table.rows.push(vec!["2".into(), "http://host/down".into()]);
        table.rows.push(vec!["3".into(), "http://host/article-1".into()]);

        let enricher = FullTextEnricher::new(Arc::new(PageFetcher));
        enricher.enrich(&mut table, "SOURCEURL").await.unwrap();

        assert_eq!(table.columns.last().map(String::as_str), Some("fulltext"));
        assert!(table.rows[0][2].starts_with("First paragraph."));
        assert_eq!(table.rows[1][2], "");
        assert_eq!(table.rows[2][2], table.rows[0][2]);
    }

    #[tokio::test]
    async fn test_enrich_requires_the_url_column() {
        let mut table = DataTable::empty(&["id"]);
        let enricher = FullTextEnricher::new(Arc::new(PageFetcher));
        assert!(enricher.enrich(&mut table, "SOURCEURL").await.is_err());
    }
}
