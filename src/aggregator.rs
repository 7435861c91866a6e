//! Feed-to-summary aggregation.
//!
//! The [`Aggregator`] reads one feed and extracts its entries one after the
//! other until it holds `limit` successful summaries or runs out of entries.
//! A failing entry is logged and skipped; it never aborts the batch and never
//! takes a slot, so later successes keep their relative order.
//!
//! Extraction is strictly sequential: entry N+1 is not requested before
//! entry N has finished, and nothing past the cap is downloaded at all.

use crate::config::FeedCatalog;
use crate::error::ExtractionError;
use crate::models::{AggregationBatch, FeedEntry, FeedSource};
use crate::scrapers::article::{ArticleExtractor, Extract};
use crate::scrapers::feed::{FeedReader, FetchEntries};
use futures::stream::{self, StreamExt};
use reqwest::Client;
use tracing::{debug, error, info, instrument, warn};

#[derive(Debug, Clone)]
pub struct Aggregator<R, E> {
    reader: R,
    extractor: E,
}

impl Aggregator<FeedReader, ArticleExtractor> {
    /// The HTTP feed reader and article extractor over one shared client.
    pub fn with_client(client: Client, catalog: FeedCatalog) -> Self {
        Aggregator::new(
            FeedReader::new(client.clone(), catalog),
            ArticleExtractor::new(client),
        )
    }
}

impl<R, E> Aggregator<R, E>
where
    R: FetchEntries,
    E: Extract,
{
    pub fn new(reader: R, extractor: E) -> Self {
        Self { reader, extractor }
    }

    /// Extract entries in order until `limit` of them succeed.
    ///
    /// A failed extraction is logged and skipped; it never takes a slot.
    /// Entries after the one that fills the batch are never requested.
    ///
    /// # Arguments
    ///
    /// * `entries` - Feed entries in document order
    /// * `limit` - Maximum number of successful summaries to keep
    ///
    /// # Returns
    ///
    /// The successful summaries, in the same relative order as `entries`.
    #[instrument(level = "info", skip_all, fields(entries = entries.len(), limit = limit))]
    pub async fn summarize(&self, entries: Vec<FeedEntry>, limit: usize) -> AggregationBatch {
        if limit == 0 {
            return Vec::new();
        }

        let batch: AggregationBatch = stream::iter(entries.into_iter().enumerate())
            .then(|(index, entry)| async move {
                debug!(
                    index,
                    url = %entry.link,
                    title = entry.title.as_deref().unwrap_or_default(),
                    "Extracting entry"
                );
                match self.extractor.extract(&entry.link).await {
                    Ok(summary) => Some(summary),
                    Err(e) => {
                        warn!(
                            index,
                            url = %entry.link,
                            error = %e,
                            "Extraction failed; skipping entry"
                        );
                        None
                    }
                }
            })
            .filter_map(std::future::ready)
            .take(limit)
            .collect()
            .await;

        info!(count = batch.len(), "Aggregation complete");
        batch
    }

    /// Read `source` and summarize its entries.
    ///
    /// # Arguments
    ///
    /// * `source` - Which feed to read, resolved through the catalog
    /// * `limit` - Maximum number of successful summaries to keep
    ///
    /// # Returns
    ///
    /// The batch from [`summarize`](Self::summarize), or an empty batch when
    /// the feed cannot be fetched or parsed.
    #[instrument(level = "info", skip(self))]
    pub async fn summarize_source(&self, source: FeedSource, limit: usize) -> AggregationBatch {
        match self.reader.fetch_entries(source).await {
            Ok(entries) => self.summarize(entries, limit).await,
            Err(e) => {
                error!(%source, error = %e, "Feed unavailable; returning empty batch");
                Vec::new()
            }
        }
    }

    /// Summarize a single article the user asked for by URL.
    ///
    /// # Returns
    ///
    /// A batch of exactly one summary, or the [`ExtractionError`] so it can
    /// be shown. Unlike batch mode nothing is swallowed.
    #[instrument(level = "info", skip(self))]
    pub async fn summarize_single(&self, url: &str) -> Result<AggregationBatch, ExtractionError> {
        let summary = self.extractor.extract(url).await?;
        Ok(vec![summary])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FeedError;
    use crate::models::{ArticleSummary, ExtractionResult};
    use crate::scrapers::test_server;
    use std::collections::{BTreeMap, HashSet};
    use std::sync::Mutex;

    struct FakeFeed {
        entries: Option<Vec<FeedEntry>>,
    }

    impl FetchEntries for FakeFeed {
        async fn fetch_entries(&self, _source: FeedSource) -> Result<Vec<FeedEntry>, FeedError> {
            self.entries
                .clone()
                .ok_or_else(|| FeedError::Malformed("network down".to_string()))
        }
    }

    #[derive(Default)]
    struct FakeExtractor {
        failing: HashSet<String>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeExtractor {
        fn failing(urls: &[&str]) -> Self {
            Self {
                failing: urls.iter().map(|u| u.to_string()).collect(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Extract for FakeExtractor {
        async fn extract(&self, url: &str) -> ExtractionResult {
            self.calls.lock().unwrap().push(url.to_string());
            if self.failing.contains(url) {
                return Err(ExtractionError::Parse(format!("cannot parse {url}")));
            }
            Ok(ArticleSummary {
                url: url.to_string(),
                title: format!("Title for {url}"),
                authors: vec![],
                publication_date: None,
                summary: format!("Summary for {url}"),
                top_image: None,
                keywords: vec![],
            })
        }
    }

    fn entries(n: usize) -> Vec<FeedEntry> {
        (1..=n).map(|i| FeedEntry::new(format!("https://example.com/{i}"))).collect()
    }

    fn urls(batch: &AggregationBatch) -> Vec<String> {
        batch.iter().map(|s| s.url.clone()).collect()
    }

    #[tokio::test]
    async fn test_skips_failures_and_keeps_feed_order() {
        let extractor = FakeExtractor::failing(&["https://example.com/2", "https://example.com/5"]);
        let aggregator = Aggregator::new(FakeFeed { entries: None }, extractor);

        let batch = aggregator.summarize(entries(8), 5).await;
        assert_eq!(
            urls(&batch),
            vec![
                "https://example.com/1",
                "https://example.com/3",
                "https://example.com/4",
                "https://example.com/6",
                "https://example.com/7",
            ]
        );
        // Entry 8 is never fetched once the cap is reached.
        assert_eq!(aggregator.extractor.calls().len(), 7);
    }

    #[tokio::test]
    async fn test_returns_exactly_limit_when_enough_succeed() {
        let aggregator = Aggregator::new(FakeFeed { entries: None }, FakeExtractor::default());
        let batch = aggregator.summarize(entries(10), 3).await;
        assert_eq!(
            urls(&batch),
            vec!["https://example.com/1", "https://example.com/2", "https://example.com/3"]
        );
        assert_eq!(aggregator.extractor.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_returns_only_successes_when_fewer_than_limit() {
        let failing = ["https://example.com/1", "https://example.com/3", "https://example.com/4"];
        let extractor = FakeExtractor::failing(&failing);
        let aggregator = Aggregator::new(FakeFeed { entries: None }, extractor);

        let batch = aggregator.summarize(entries(4), 5).await;
        assert_eq!(urls(&batch), vec!["https://example.com/2"]);
        assert!(batch.iter().all(|s| !failing.contains(&s.url.as_str())));
        assert_eq!(aggregator.extractor.calls().len(), 4);
    }

    #[tokio::test]
    async fn test_zero_limit_fetches_nothing() {
        let aggregator = Aggregator::new(FakeFeed { entries: None }, FakeExtractor::default());
        assert!(aggregator.summarize(entries(3), 0).await.is_empty());
        assert!(aggregator.extractor.calls().is_empty());
    }

    #[tokio::test]
    async fn test_feed_failure_gives_empty_batch() {
        let aggregator = Aggregator::new(FakeFeed { entries: None }, FakeExtractor::default());
        let batch = aggregator.summarize_source(FeedSource::Top, 5).await;
        assert!(batch.is_empty());
        assert!(aggregator.extractor.calls().is_empty());
    }

    #[tokio::test]
    async fn test_summarize_source_uses_feed_entries() {
        let feed = FakeFeed { entries: Some(entries(2)) };
        let aggregator = Aggregator::new(feed, FakeExtractor::default());
        let batch = aggregator.summarize_source(FeedSource::Sport, 5).await;
        assert_eq!(urls(&batch), vec!["https://example.com/1", "https://example.com/2"]);
    }

    #[tokio::test]
    async fn test_single_article_failure_is_reported() {
        let extractor = FakeExtractor::failing(&["https://example.com/bad"]);
        let aggregator = Aggregator::new(FakeFeed { entries: None }, extractor);

        let err = aggregator.summarize_single("https://example.com/bad").await.unwrap_err();
        assert!(err.to_string().contains("https://example.com/bad"));

        let batch = aggregator.summarize_single("https://example.com/good").await.unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].summary, "Summary for https://example.com/good");
    }

    fn catalog_for(feed_url: String) -> FeedCatalog {
        let overrides = BTreeMap::from([("sport".to_string(), feed_url)]);
        FeedCatalog::from_overrides(&overrides).unwrap()
    }

    #[tokio::test]
    async fn test_http_feed_failure_gives_empty_batch() {
        let feed = test_server::serve(404, "no feed here").await;
        let catalog = catalog_for(format!("{feed}/rss"));
        let aggregator = Aggregator::with_client(test_server::client(), catalog);
        assert!(aggregator.summarize_source(FeedSource::Sport, 5).await.is_empty());
    }

    #[tokio::test]
    async fn test_http_pipeline_skips_failing_articles() {
        let good = test_server::serve(
            200,
            "<html><head><title>Match report</title></head>\
             <body><p>The home side won the final in extra time.</p></body></html>",
        )
        .await;
        let missing = test_server::serve(404, "gone").await;
        let rss = format!(
            "<rss version=\"2.0\"><channel>\
             <item><link>{missing}/a</link></item>\
             <item><link>{good}/b</link></item>\
             <item><link>{good}/c</link></item>\
             </channel></rss>"
        );
        let feed = test_server::serve(200, rss).await;

        let catalog = catalog_for(format!("{feed}/rss"));
        let aggregator = Aggregator::with_client(test_server::client(), catalog);
        let batch = aggregator.summarize_source(FeedSource::Sport, 1).await;
        assert_eq!(urls(&batch), vec![format!("{good}/b")]);
        assert_eq!(batch[0].title, "Match report");
    }
}
