//! Error types for each stage of the pipeline.
//!
//! Every component owns its own error enum so that callers can decide how far
//! a failure travels: feed and extraction errors are contained by the
//! [`Aggregator`](crate::aggregator::Aggregator), while playback and
//! translation errors are returned to whoever asked for them.

use thiserror::Error;

/// The feed document could not be retrieved or understood.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("feed request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("feed returned HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("malformed feed document: {0}")]
    Malformed(String),
}

/// One article could not be downloaded or parsed.
///
/// Carries only a human readable cause, never partial article data.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("invalid article URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("article download failed: {0}")]
    Download(#[from] reqwest::Error),

    #[error("article returned HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("article parse failed: {0}")]
    Parse(String),
}

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("nothing to speak")]
    EmptyText,

    #[error("speech synthesis failed: {0}")]
    Synthesis(String),

    #[error("audio playback failed: {0}")]
    Playback(String),

    #[error("audio artifact error: {0}")]
    Artifact(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("translation request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("translation service returned HTTP {0}")]
    Status(u16),

    #[error("unexpected translation response: {0}")]
    Response(String),

    #[error(transparent)]
    Playback(#[from] PlaybackError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid feed URL for {source_name}: {url}")]
    FeedUrl { source_name: String, url: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_errors_name_the_url() {
        let err = ExtractionError::Status {
            url: "https://example.com/a".to_string(),
            status: 404,
        };
        assert_eq!(
            err.to_string(),
            "article returned HTTP 404 for https://example.com/a"
        );
    }

    #[test]
    fn test_playback_error_wraps_into_translate_error() {
        let err: TranslateError = PlaybackError::EmptyText.into();
        assert_eq!(err.to_string(), "nothing to speak");
    }
}
