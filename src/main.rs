//! # News Digest
//!
//! Reads a news feed, summarizes the linked articles and prints them, with
//! optional read-aloud through a text-to-speech service.
//!
//! ## Usage
//!
//! ```sh
//! news_digest feed top --limit 5
//! news_digest article https://example.com/story.html --read
//! news_digest translate "good evening" --to french
//! ```
//!
//! ## Architecture
//!
//! 1. **Indexing**: Resolve the feed source and list its entries
//! 2. **Extraction**: Download and summarize entries one at a time until the
//!    limit of successful summaries is reached
//! 3. **Output**: Print the batch as text or JSON
//! 4. **Playback**: Optionally synthesize each summary and play it to the end

use clap::Parser;
use std::error::Error;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod aggregator;
mod cli;
mod config;
mod error;
mod models;
mod nlp;
mod outputs;
mod playback;
mod scrapers;
mod translate;
mod utils;

use aggregator::Aggregator;
use cli::{Cli, Command, OutputArgs};
use config::{FeedCatalog, Settings};
use models::ArticleSummary;
use outputs::{json, terminal};
use playback::PlaybackEngine;
use reqwest::Client;
use scrapers::build_client;
use translate::Interpreter;

/// Summaries are always read in English.
const READ_ALOUD_LANGUAGE: &str = "en";

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("news_digest starting up");

    let args = Cli::parse();
    debug!(?args.config, ?args.command, "Parsed CLI arguments");

    let settings = Settings::load(args.config.as_deref())?;
    let client = build_client(&settings)?;

    match args.command {
        Command::Feed { source, limit, output } => {
            let catalog = FeedCatalog::from_overrides(&settings.feeds)?;
            let limit = limit.unwrap_or(settings.limit);
            info!(%source, url = %catalog.url(source), limit, "Summarizing feed");

            let aggregator = Aggregator::with_client(client.clone(), catalog);
            let batch = aggregator.summarize_source(source, limit).await;
            if batch.is_empty() {
                warn!(%source, "No articles could be summarized");
            }
            present(&batch, output, &settings, client).await?;
        }
        Command::Article { url, output } => {
            let aggregator = Aggregator::with_client(client.clone(), FeedCatalog::default());
            match aggregator.summarize_single(&url).await {
                Ok(batch) => present(&batch, output, &settings, client).await?,
                Err(e) => {
                    error!(%url, error = %e, "Failed to fetch article");
                    return Err(e.into());
                }
            }
        }
        Command::Speak { text, lang } => {
            let mut engine = PlaybackEngine::from_settings(&settings, client)?;
            engine.speak(&text, &lang).await.into_result()?;
        }
        Command::Translate { text, from, to } => {
            let engine = PlaybackEngine::from_settings(&settings, client.clone())?;
            let interpreter = Arc::new(Interpreter::from_settings(
                &settings,
                client,
                Arc::new(Mutex::new(engine)),
            ));
            match interpreter.spawn_translate_and_speak(text, from, to).await? {
                Some(translated) => println!("{translated}"),
                None => return Err("translate and speak failed".into()),
            }
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}

/// Print `batch` and, when asked, read each summary aloud in order.
///
/// A summary that cannot be read aloud is logged and the rest still play.
async fn present(
    batch: &[ArticleSummary],
    output: OutputArgs,
    settings: &Settings,
    client: Client,
) -> Result<(), Box<dyn Error>> {
    if output.json {
        json::print_batch(batch)?;
    } else {
        print!("{}", terminal::render_batch(batch));
    }

    if output.read && !batch.is_empty() {
        let mut engine = PlaybackEngine::from_settings(settings, client)?;
        for (index, article) in batch.iter().enumerate() {
            info!(index = index + 1, url = %article.url, "Reading summary aloud");
            let outcome = engine.speak(&article.summary, READ_ALOUD_LANGUAGE).await;
            if let Err(e) = outcome.result {
                warn!(index = index + 1, error = %e, "Could not read summary aloud");
            }
        }
    }
    Ok(())
}
