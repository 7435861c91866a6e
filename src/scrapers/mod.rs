//! Network-facing readers for feeds and articles.
//!
//! The pipeline works in two phases, the same way for every feed:
//!
//! 1. **Indexing**: [`feed`] downloads a syndication document and lists the
//!    article links it contains, in document order.
//! 2. **Extraction**: [`article`] downloads each linked page and parses it
//!    into an [`ArticleSummary`](crate::models::ArticleSummary).
//!
//! Both readers share one `reqwest` client configured from
//! [`Settings`](crate::config::Settings).

pub mod article;
pub mod feed;

use crate::config::Settings;
use reqwest::Client;

/// Build the HTTP client shared by the feed reader and the article extractor.
pub fn build_client(settings: &Settings) -> reqwest::Result<Client> {
    Client::builder()
        .user_agent(settings.user_agent.as_str())
        .timeout(settings.timeout())
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
}
