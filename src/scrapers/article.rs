//! Article download and extraction.
//!
//! Turns one article URL into an [`ArticleSummary`]. Structural fields come
//! from the page markup, looked up in priority order:
//!
//! | Field | Sources |
//! |-------|---------|
//! | title | `og:title`, `<title>`, first `<h1>` |
//! | authors | JSON-LD `author`, `meta[name=author]`, `article:author`, `[rel=author]` |
//! | date | publication metas, JSON-LD `datePublished`, `<time>`, URL date, modified-time metas |
//! | top image | `og:image`, `twitter:image`, first body `<img>` |
//!
//! The body text is the `<p>` content of the page's `<article>` (or of the
//! whole page when there is none), and feeds [`nlp`](crate::nlp) for the
//! summary and keywords.
//!
//! Every failure becomes an [`ExtractionError`]; nothing escapes as a panic.

use crate::error::ExtractionError;
use crate::models::{ArticleSummary, ExtractionResult};
use crate::nlp;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use tracing::{debug, info, instrument};
use url::Url;

/// Anything that can turn an article URL into a summary.
pub trait Extract {
    async fn extract(&self, url: &str) -> ExtractionResult;
}

#[derive(Debug, Clone)]
pub struct ArticleExtractor {
    client: Client,
}

impl ArticleExtractor {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn download(&self, url: &Url) -> Result<String, ExtractionError> {
        let response = self.client.get(url.as_str()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ExtractionError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response.text().await?)
    }
}

impl Extract for ArticleExtractor {
    #[instrument(level = "info", skip(self))]
    async fn extract(&self, url: &str) -> ExtractionResult {
        let page_url = validate_url(url)?;
        let html = self.download(&page_url).await?;
        debug!(bytes = html.len(), "Downloaded article");

        let summary = summarize_html(&page_url, &html)?;
        info!(
            title = %summary.title,
            authors = summary.authors.len(),
            keywords = summary.keywords.len(),
            "Extracted article"
        );
        Ok(summary)
    }
}

/// Accept only absolute http(s) URLs.
pub fn validate_url(url: &str) -> Result<Url, ExtractionError> {
    let parsed = Url::parse(url.trim()).map_err(|e| ExtractionError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(ExtractionError::InvalidUrl {
            url: url.to_string(),
            reason: format!("unsupported scheme {other}"),
        }),
    }
}

/// Parse a downloaded page and run summarization over its body.
///
/// # Arguments
///
/// * `page_url` - Where the page came from; relative image links resolve against it
/// * `html` - The raw document
///
/// # Returns
///
/// The [`ArticleSummary`], possibly with empty fields, or
/// [`ExtractionError::Parse`] when the document is blank.
pub fn summarize_html(page_url: &Url, html: &str) -> ExtractionResult {
    if html.trim().is_empty() {
        return Err(ExtractionError::Parse(format!(
            "{page_url} returned an empty document"
        )));
    }

    let parsed = ParsedPage::parse(page_url, html);
    let summary = nlp::summarize(&parsed.title, &parsed.body, nlp::SUMMARY_SENTENCES);
    let keywords = nlp::keywords(&parsed.body, nlp::KEYWORD_COUNT);

    Ok(ArticleSummary {
        url: page_url.to_string(),
        title: parsed.title,
        authors: parsed.authors,
        publication_date: parsed.publication_date,
        summary,
        top_image: parsed.top_image,
        keywords,
    })
}

/// Structural fields of one article page, before any NLP.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ParsedPage {
    pub title: String,
    pub authors: Vec<String>,
    pub publication_date: Option<NaiveDate>,
    pub top_image: Option<String>,
    pub body: String,
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector")
}

static OG_TITLE: Lazy<Selector> = Lazy::new(|| selector(r#"meta[property="og:title"]"#));
static TITLE: Lazy<Selector> = Lazy::new(|| selector("title"));
static H1: Lazy<Selector> = Lazy::new(|| selector("h1"));
static JSON_LD: Lazy<Selector> =
    Lazy::new(|| selector(r#"script[type="application/ld+json"]"#));
static AUTHOR_META: Lazy<Vec<Selector>> = Lazy::new(|| {
    vec![
        selector(r#"meta[name="author"]"#),
        selector(r#"meta[property="article:author"]"#),
    ]
});
static REL_AUTHOR: Lazy<Selector> = Lazy::new(|| selector(r#"[rel="author"]"#));
static DATE_META: Lazy<Vec<Selector>> = Lazy::new(|| {
    vec![
        selector(r#"meta[property="article:published_time"]"#),
        selector(r#"meta[name="article:published_time"]"#),
        selector(r#"meta[itemprop="datePublished"]"#),
        selector(r#"meta[name="pubdate"]"#),
        selector(r#"meta[name="publishdate"]"#),
        selector(r#"meta[name="parsely-pub-date"]"#),
        selector(r#"meta[name="sailthru.date"]"#),
        selector(r#"meta[name="date"]"#),
    ]
});
static UPDATED_META: Lazy<Vec<Selector>> = Lazy::new(|| {
    vec![
        selector(r#"meta[property="og:updated_time"]"#),
        selector(r#"meta[property="article:modified_time"]"#),
    ]
});
static TIME: Lazy<Selector> = Lazy::new(|| selector("time[datetime]"));
static IMAGE_META: Lazy<Vec<Selector>> = Lazy::new(|| {
    vec![
        selector(r#"meta[property="og:image"]"#),
        selector(r#"meta[name="twitter:image"]"#),
        selector(r#"meta[property="twitter:image"]"#),
    ]
});
static IMG: Lazy<Selector> = Lazy::new(|| selector("img[src]"));
static ARTICLE: Lazy<Selector> = Lazy::new(|| selector("article"));
static PARAGRAPH: Lazy<Selector> = Lazy::new(|| selector("p"));

static URL_DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/((?:19|20)\d{2})[/-](\d{1,2})[/-](\d{1,2})(?:/|$)").expect("valid date regex")
});

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<Vec<_>>().join(" ").split_whitespace().join(" ")
}

fn meta_content(document: &Html, selectors: &[Selector]) -> Option<String> {
    selectors.iter().find_map(|s| {
        document
            .select(s)
            .filter_map(|el| el.value().attr("content"))
            .map(str::trim)
            .find(|c| !c.is_empty())
            .map(str::to_string)
    })
}

impl ParsedPage {
    pub fn parse(page_url: &Url, html: &str) -> ParsedPage {
        let document = Html::parse_document(html);
        let json_ld = json_ld_objects(&document);
        let body_root = document.select(&ARTICLE).next();

        ParsedPage {
            title: extract_title(&document),
            authors: extract_authors(&document, &json_ld),
            publication_date: extract_date(&document, &json_ld, page_url),
            top_image: extract_top_image(&document, body_root, page_url),
            body: extract_body(&document, body_root),
        }
    }
}

fn extract_title(document: &Html) -> String {
    if let Some(title) = meta_content(document, std::slice::from_ref(&*OG_TITLE)) {
        return title;
    }
    [&*TITLE, &*H1]
        .iter()
        .filter_map(|s| document.select(s).next())
        .map(element_text)
        .find(|t| !t.is_empty())
        .unwrap_or_default()
}

/// Every JSON-LD object on the page, flattening arrays and `@graph`.
fn json_ld_objects(document: &Html) -> Vec<Value> {
    fn flatten(value: Value, out: &mut Vec<Value>) {
        match value {
            Value::Array(items) => items.into_iter().for_each(|v| flatten(v, out)),
            Value::Object(mut map) => {
                if let Some(graph) = map.remove("@graph") {
                    flatten(graph, out);
                }
                out.push(Value::Object(map));
            }
            _ => {}
        }
    }

    let mut objects = Vec::new();
    for script in document.select(&JSON_LD) {
        let text = script.text().collect::<String>();
        match serde_json::from_str::<Value>(text.trim()) {
            Ok(value) => flatten(value, &mut objects),
            Err(e) => debug!(error = %e, "Ignoring unreadable JSON-LD block"),
        }
    }
    objects
}

fn json_ld_authors(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(name) => out.push(name.trim().to_string()),
        Value::Array(items) => items.iter().for_each(|v| json_ld_authors(v, out)),
        Value::Object(obj) => {
            if let Some(Value::String(name)) = obj.get("name") {
                out.push(name.trim().to_string());
            }
        }
        _ => {}
    }
}

fn extract_authors(document: &Html, json_ld: &[Value]) -> Vec<String> {
    let mut authors = Vec::new();
    for object in json_ld {
        if let Some(author) = object.get("author") {
            json_ld_authors(author, &mut authors);
        }
    }

    if authors.is_empty() {
        for s in AUTHOR_META.iter() {
            authors.extend(
                document
                    .select(s)
                    .filter_map(|el| el.value().attr("content"))
                    .map(|c| c.trim().to_string()),
            );
        }
    }

    if authors.is_empty() {
        authors.extend(document.select(&REL_AUTHOR).map(element_text));
    }

    authors
        .into_iter()
        .map(|a| a.strip_prefix("By ").map(str::to_string).unwrap_or(a))
        .filter(|a| !a.is_empty() && !a.starts_with("http"))
        .unique()
        .collect()
}

/// Parse the date part of the timestamp formats found in article markup.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Some(dt.date_naive());
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt.date());
        }
    }
    text.get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
}

fn date_from_url(page_url: &Url) -> Option<NaiveDate> {
    let caps = URL_DATE_RE.captures(page_url.path())?;
    let year = caps[1].parse().ok()?;
    let month = caps[2].parse().ok()?;
    let day = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn extract_date(document: &Html, json_ld: &[Value], page_url: &Url) -> Option<NaiveDate> {
    DATE_META
        .iter()
        .filter_map(|s| meta_content(document, std::slice::from_ref(s)))
        .find_map(|c| parse_date(&c))
        .or_else(|| {
            json_ld
                .iter()
                .filter_map(|o| o.get("datePublished").and_then(Value::as_str))
                .find_map(parse_date)
        })
        .or_else(|| {
            document
                .select(&TIME)
                .filter_map(|el| el.value().attr("datetime"))
                .find_map(parse_date)
        })
        .or_else(|| date_from_url(page_url))
        .or_else(|| meta_content(document, &UPDATED_META).and_then(|c| parse_date(&c)))
}

fn extract_top_image(
    document: &Html,
    body_root: Option<ElementRef<'_>>,
    page_url: &Url,
) -> Option<String> {
    let candidate = meta_content(document, &IMAGE_META).or_else(|| {
        let first_img = match body_root {
            Some(root) => root.select(&IMG).next(),
            None => document.select(&IMG).next(),
        };
        first_img
            .and_then(|img| img.value().attr("src"))
            .map(|src| src.trim().to_string())
    })?;

    if candidate.is_empty() || candidate.starts_with("data:") {
        return None;
    }
    page_url.join(&candidate).ok().map(|u| u.to_string())
}

fn extract_body(document: &Html, body_root: Option<ElementRef<'_>>) -> String {
    let paragraphs: Vec<String> = match body_root {
        Some(root) => root.select(&PARAGRAPH).map(element_text).collect(),
        None => document.select(&PARAGRAPH).map(element_text).collect(),
    };
    paragraphs.into_iter().filter(|p| !p.is_empty()).join("\n")
}
