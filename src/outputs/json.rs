//! JSON output of a batch.
//!
//! The batch is written as a pretty-printed array of article records, in feed
//! order. Missing dates are rendered as the same placeholder text the
//! terminal view uses.

use crate::models::ArticleSummary;
use std::error::Error;
use std::io::{self, Write};
use tracing::{info, instrument};

/// Serialize `batch` to `writer` followed by a newline.
pub fn write_batch<W: Write>(
    batch: &[ArticleSummary],
    mut writer: W,
) -> Result<(), Box<dyn Error>> {
    serde_json::to_writer_pretty(&mut writer, batch)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

/// Write `batch` as JSON to stdout.
#[instrument(level = "info", skip_all, fields(count = batch.len()))]
pub fn print_batch(batch: &[ArticleSummary]) -> Result<(), Box<dyn Error>> {
    write_batch(batch, io::stdout().lock())?;
    info!("Wrote JSON batch to stdout");
    Ok(())
}
