//! Data models for feeds, extracted articles and playback.
//!
//! This module defines the value types that flow through the pipeline:
//! - [`FeedSource`]: Which remote feed to read
//! - [`FeedEntry`]: One linked item from a feed document
//! - [`ArticleSummary`]: The structured record extracted from one article
//! - [`AggregationBatch`]: The ordered, capped list of summaries for one run
//! - [`PlaybackState`]: The states a `speak` call moves through
//!
//! None of these outlive a single aggregation or playback call.

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Serialize, Serializer};
use std::fmt;

/// Text shown in place of a missing publication date.
pub const NO_DATE: &str = "No date available";

/// Number of summaries kept per feed when the caller does not say otherwise.
pub const DEFAULT_LIMIT: usize = 5;

/// A remote syndication endpoint.
///
/// The URL each source maps to lives in [`FeedCatalog`](crate::config::FeedCatalog)
/// so that it can be overridden from the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, ValueEnum)]
pub enum FeedSource {
    Top,
    #[value(alias = "recent")]
    World,
    #[value(alias = "cinema")]
    Entertainment,
    #[value(alias = "sports")]
    Sport,
}

impl FeedSource {
    pub const ALL: [FeedSource; 4] = [
        FeedSource::Top,
        FeedSource::World,
        FeedSource::Entertainment,
        FeedSource::Sport,
    ];

    /// The lowercase name used in the CLI and the config file.
    pub fn name(self) -> &'static str {
        match self {
            FeedSource::Top => "top",
            FeedSource::World => "world",
            FeedSource::Entertainment => "entertainment",
            FeedSource::Sport => "sport",
        }
    }

    /// The Google News endpoint used when the config file has no override.
    pub fn default_url(self) -> &'static str {
        match self {
            FeedSource::Top => "https://news.google.com/news/rss",
            FeedSource::World => {
                "https://news.google.com/news/rss/headlines/section/topic/WORLD"
            }
            FeedSource::Entertainment => {
                "https://news.google.com/news/rss/headlines/section/entertainment"
            }
            FeedSource::Sport => "https://news.google.com/news/rss/headlines/section/sport",
        }
    }

    /// Parse a source name, accepting the same aliases as the CLI.
    pub fn from_name(name: &str) -> Option<FeedSource> {
        FeedSource::from_str(name, true).ok()
    }
}

impl fmt::Display for FeedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One item from a retrieved feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    /// The article URL from the item's `<link>` element.
    pub link: String,
    /// The item's `<title>`, when the feed provides one.
    pub title: Option<String>,
}

impl FeedEntry {
    pub fn new(link: impl Into<String>) -> Self {
        Self {
            link: link.into(),
            title: None,
        }
    }
}

/// The structured record extracted from one article.
///
/// Partial records are fine (no date, no authors, empty summary); a record
/// only exists at all when the article was downloaded and parsed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArticleSummary {
    pub url: String,
    pub title: String,
    pub authors: Vec<String>,
    #[serde(serialize_with = "serialize_publication_date")]
    pub publication_date: Option<NaiveDate>,
    pub summary: String,
    pub top_image: Option<String>,
    pub keywords: Vec<String>,
}

impl ArticleSummary {
    /// The publication date as `YYYY-MM-DD`, or [`NO_DATE`] when absent.
    pub fn publication_date_text(&self) -> String {
        format_publication_date(self.publication_date)
    }
}

/// Result of extracting one article.
pub type ExtractionResult = Result<ArticleSummary, crate::error::ExtractionError>;

/// Successful summaries from one run, in feed order.
pub type AggregationBatch = Vec<ArticleSummary>;

pub fn format_publication_date(date: Option<NaiveDate>) -> String {
    match date {
        Some(date) => date.format("%Y-%m-%d").to_string(),
        None => NO_DATE.to_string(),
    }
}

fn serialize_publication_date<S>(date: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format_publication_date(*date))
}

/// States of a single `speak` call.
///
/// `Complete` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PlaybackState {
    Idle,
    Synthesizing,
    Playing,
    Complete,
    Failed,
}

impl PlaybackState {
    pub fn is_terminal(self) -> bool {
        matches!(self, PlaybackState::Complete | PlaybackState::Failed)
    }
}
