//! Command-line interface definitions for News Digest.
//!
//! This module defines the CLI arguments and subcommands using the `clap`
//! crate. The settings file can also be given through `NEWS_DIGEST_CONFIG`.

use crate::models::FeedSource;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments for the News Digest application.
///
/// # Examples
///
/// ```sh
/// # Five summaries from the sport feed
/// news_digest feed sport
///
/// # Three world stories as JSON, each read aloud
/// news_digest feed recent --limit 3 --json --read
///
/// # One article by URL
/// news_digest article https://example.com/story.html
///
/// # Translate and speak
/// news_digest translate "good morning" --from english --to spanish
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML settings file
    #[arg(short, long, global = true, env = "NEWS_DIGEST_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Summarize the latest articles of a feed
    Feed {
        /// Which feed to read
        #[arg(value_enum)]
        source: FeedSource,

        /// Number of successful summaries to keep (defaults to the settings file)
        #[arg(short, long)]
        limit: Option<usize>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Summarize a single article
    Article {
        /// Article URL (http or https)
        url: String,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Read text aloud
    Speak {
        text: String,

        /// Language code for the voice
        #[arg(short, long, default_value = "en")]
        lang: String,
    },

    /// Translate text and read the translation aloud
    Translate {
        text: String,

        /// Source language name, e.g. "english"
        #[arg(long, default_value = "english")]
        from: String,

        /// Target language name, e.g. "spanish"
        #[arg(long, default_value = "spanish")]
        to: String,
    },
}

#[derive(Args, Debug, Clone, Copy)]
pub struct OutputArgs {
    /// Print the batch as JSON instead of text
    #[arg(long)]
    pub json: bool,

    /// Read each summary aloud after printing
    #[arg(long)]
    pub read: bool,
}
