//! Plain text layout of a batch.
//!
//! Each article is one numbered block:
//!
//! ```text
//! News 1:
//! Title: Bridge approved
//! Authors: Jane Doe, John Roe
//! Publication Date: 2025-05-06
//! Summary: The council approved the bridge.
//! Keywords: bridge, council
//! Image: https://example.com/a.jpg
//!
//! ==================================================
//!
//! ```
//!
//! The `Image:` line only appears when the article has a top image.

use crate::models::ArticleSummary;
use std::fmt::Write;

const SEPARATOR_WIDTH: usize = 50;

/// Render one article as the `index`-th block (1-based).
pub fn render_summary(index: usize, article: &ArticleSummary) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = writeln!(out, "News {index}:");
    let _ = writeln!(out, "Title: {}", article.title);
    let _ = writeln!(out, "Authors: {}", article.authors.join(", "));
    let _ = writeln!(out, "Publication Date: {}", article.publication_date_text());
    let _ = writeln!(out, "Summary: {}", article.summary);
    let _ = writeln!(out, "Keywords: {}", article.keywords.join(", "));
    if let Some(image) = &article.top_image {
        let _ = writeln!(out, "Image: {image}");
    }
    let _ = write!(out, "\n{}\n\n", "=".repeat(SEPARATOR_WIDTH));
    out
}

/// Render every article of `batch`, numbered from 1 in batch order.
pub fn render_batch(batch: &[ArticleSummary]) -> String {
    batch
        .iter()
        .enumerate()
        .map(|(i, article)| render_summary(i + 1, article))
        .collect()
}
