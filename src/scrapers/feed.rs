//! RSS feed reader.
//!
//! Resolves a [`FeedSource`] through the [`FeedCatalog`], downloads the feed
//! document once and returns one [`FeedEntry`] per `<item>`, in document
//! order. There is no retry: a failed download or an unreadable document is
//! reported as a [`FeedError`] and the caller decides what that means.

use crate::config::FeedCatalog;
use crate::error::FeedError;
use crate::models::{FeedEntry, FeedSource};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, instrument};

/// Anything that can list the entries of a feed.
pub trait FetchEntries {
    async fn fetch_entries(&self, source: FeedSource) -> Result<Vec<FeedEntry>, FeedError>;
}

#[derive(Debug, Clone)]
pub struct FeedReader {
    client: Client,
    catalog: FeedCatalog,
}

impl FeedReader {
    pub fn new(client: Client, catalog: FeedCatalog) -> Self {
        Self { client, catalog }
    }
}

impl FetchEntries for FeedReader {
    #[instrument(level = "info", skip(self), fields(url = %self.catalog.url(source)))]
    async fn fetch_entries(&self, source: FeedSource) -> Result<Vec<FeedEntry>, FeedError> {
        let url = self.catalog.url(source);
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        debug!(bytes = body.len(), "Downloaded feed document");
        let entries = parse_entries(&body)?;
        info!(count = entries.len(), %source, "Indexed feed entries");
        Ok(entries)
    }
}

#[derive(Debug, Deserialize)]
struct RssDocument {
    channel: RssChannel,
}

#[derive(Debug, Deserialize)]
struct RssChannel {
    #[serde(rename = "item", default)]
    items: Vec<RssItem>,
}

/// Elements are matched on their local name, so `<link>` and `<atom:link>`
/// land in the same list. The first non-empty text wins.
#[derive(Debug, Deserialize)]
struct RssItem {
    #[serde(rename = "link", default)]
    links: Vec<RssText>,
    #[serde(rename = "title", default)]
    titles: Vec<RssText>,
}

#[derive(Debug, Default, Deserialize)]
struct RssText {
    #[serde(rename = "$text", default)]
    text: String,
}

fn first_text(values: &[RssText]) -> Option<&str> {
    values.iter().map(|v| v.text.trim()).find(|t| !t.is_empty())
}

/// Parse an RSS 2.0 document into its entries.
///
/// # Arguments
///
/// * `xml` - The complete feed document
///
/// # Returns
///
/// One [`FeedEntry`] per `<item>` with a usable `<link>`, in document order.
/// An empty channel is a valid document with zero entries.
///
/// # Errors
///
/// [`FeedError::Malformed`] when the text is not an RSS document.
pub fn parse_entries(xml: &str) -> Result<Vec<FeedEntry>, FeedError> {
    let document: RssDocument =
        quick_xml::de::from_str(xml).map_err(|e| FeedError::Malformed(e.to_string()))?;

    let mut entries = Vec::with_capacity(document.channel.items.len());
    for (index, item) in document.channel.items.into_iter().enumerate() {
        let Some(link) = first_text(&item.links) else {
            debug!(index, "Skipping feed item without a link");
            continue;
        };
        let mut entry = FeedEntry::new(link);
        entry.title = first_text(&item.titles).map(str::to_string);
        entries.push(entry);
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::test_server;
    use std::collections::BTreeMap;

    async fn reader_for(status: u16, body: &str) -> FeedReader {
        let base = test_server::serve(status, body).await;
        let overrides = BTreeMap::from([("top".to_string(), format!("{base}/rss"))]);
        FeedReader::new(test_server::client(), FeedCatalog::from_overrides(&overrides).unwrap())
    }

    const GOOGLE_NEWS_SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<rss version="2.0" xmlns:media="http://search.yahoo.com/mrss/">
  <channel>
    <generator>NFE/5.0</generator>
    <title>Top stories - Google News</title>
    <link>https://news.google.com/?hl=en-US</link>
    <language>en-US</language>
    <description>Google News</description>
    <item>
      <title>First story - Outlet</title>
      <link>https://news.google.com/rss/articles/first?oc=5</link>
      <guid isPermaLink="false">first</guid>
      <pubDate>Tue, 06 May 2025 14:30:00 GMT</pubDate>
    </item>
    <item>
      <title><![CDATA[Second & story]]></title>
      <link>https://example.com/second?a=1&amp;b=2</link>
    </item>
    <item>
      <title>No link here</title>
    </item>
    <item>
      <link>  https://example.com/third  </link>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn test_parse_entries_in_document_order() {
        let entries = parse_entries(GOOGLE_NEWS_SAMPLE).unwrap();
        let links: Vec<&str> = entries.iter().map(|e| e.link.as_str()).collect();
        assert_eq!(
            links,
            vec![
                "https://news.google.com/rss/articles/first?oc=5",
                "https://example.com/second?a=1&b=2",
                "https://example.com/third",
            ]
        );
    }

    #[test]
    fn test_parse_entries_keeps_titles() {
        let entries = parse_entries(GOOGLE_NEWS_SAMPLE).unwrap();
        assert_eq!(entries[0].title.as_deref(), Some("First story - Outlet"));
        assert_eq!(entries[1].title.as_deref(), Some("Second & story"));
        assert_eq!(entries[2].title, None);
    }

    #[test]
    fn test_namespaced_duplicates_keep_the_plain_element() {
        let xml = r#"<rss version="2.0"
    xmlns:atom="http://www.w3.org/2005/Atom" xmlns:media="http://search.yahoo.com/mrss/">
  <channel>
    <atom:link href="https://a/feed.xml" rel="self"/>
    <link>https://a/</link>
    <item>
      <title>A</title>
      <media:title>A (media)</media:title>
      <link>https://a/1</link>
      <atom:link href="https://a/alt"/>
    </item>
    <item>
      <atom:link href="https://b/alt"/>
      <title>B</title>
      <link>https://b/2</link>
    </item>
  </channel>
</rss>"#;
        let entries = parse_entries(xml).unwrap();
        let links: Vec<&str> = entries.iter().map(|e| e.link.as_str()).collect();
        assert_eq!(links, vec!["https://a/1", "https://b/2"]);
        assert_eq!(entries[0].title.as_deref(), Some("A"));
        assert_eq!(entries[1].title.as_deref(), Some("B"));
    }

    #[test]
    fn test_empty_channel_has_no_entries() {
        let xml = r#"<rss version="2.0"><channel><title>Empty</title></channel></rss>"#;
        assert!(parse_entries(xml).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_document_is_an_error() {
        let err = parse_entries("<html><body>not a feed</body></html>").unwrap_err();
        assert!(matches!(err, FeedError::Malformed(_)));

        let err = parse_entries("<rss><channel><item><link>x</link>").unwrap_err();
        assert!(matches!(err, FeedError::Malformed(_)));
    }

    #[tokio::test]
    async fn test_fetch_entries_reports_http_status() {
        let reader = reader_for(404, "gone").await;
        let err = reader.fetch_entries(FeedSource::Top).await.unwrap_err();
        assert!(matches!(err, FeedError::Status { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_fetch_entries_rejects_garbage_body() {
        let reader = reader_for(200, "<html><body>maintenance</body></html>").await;
        let err = reader.fetch_entries(FeedSource::Top).await.unwrap_err();
        assert!(matches!(err, FeedError::Malformed(_)));
    }

    #[tokio::test]
    async fn test_fetch_entries_over_http() {
        let reader = reader_for(200, GOOGLE_NEWS_SAMPLE).await;
        let entries = reader.fetch_entries(FeedSource::Top).await.unwrap();
        assert_eq!(entries.len(), 3);
    }
}
