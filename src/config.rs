//! Runtime settings and the feed catalog.
//!
//! Settings come from an optional YAML file (`--config`). Every field has a
//! default so an empty or missing file yields a working setup.
//!
//! ```yaml
//! limit: 5
//! user_agent: "news_digest/0.1"
//! timeout_secs: 30
//! feeds:
//!   sport: "https://example.com/sport.xml"
//! playback:
//!   player: ["mpg123", "-q"]
//!   poll_interval_ms: 100
//! ```

use crate::error::ConfigError;
use crate::models::{DEFAULT_LIMIT, FeedSource};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, instrument};
use url::Url;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Successful summaries kept per feed.
    pub limit: usize,
    pub user_agent: String,
    /// Timeout applied to every HTTP request.
    pub timeout_secs: u64,
    /// Per-source URL overrides keyed by source name.
    pub feeds: BTreeMap<String, String>,
    pub playback: PlaybackSettings,
    pub translate: TranslateSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            user_agent: format!("news_digest/{}", env!("CARGO_PKG_VERSION")),
            timeout_secs: 30,
            feeds: BTreeMap::new(),
            playback: PlaybackSettings::default(),
            translate: TranslateSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    /// Text-to-speech endpoint; queried with `ie`, `q`, `tl` and `client`.
    pub tts_endpoint: String,
    /// Player program followed by its arguments; the artifact path is appended.
    pub player: Vec<String>,
    /// The single transient audio file reused by every `speak` call.
    pub artifact_path: PathBuf,
    pub poll_interval_ms: u64,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            tts_endpoint: "https://translate.google.com/translate_tts".to_string(),
            player: vec!["mpg123".to_string(), "-q".to_string()],
            artifact_path: std::env::temp_dir().join("news_digest_output.mp3"),
            poll_interval_ms: 100,
        }
    }
}

impl PlaybackSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TranslateSettings {
    pub endpoint: String,
}

impl Default for TranslateSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://translate.googleapis.com/translate_a/single".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from `path`, or defaults when no path is given.
    #[instrument(level = "info")]
    pub fn load(path: Option<&Path>) -> Result<Settings, ConfigError> {
        let Some(path) = path else {
            debug!("No config file given; using defaults");
            return Ok(Settings::default());
        };

        let shown = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: shown.clone(),
            source,
        })?;
        let settings = Settings::from_yaml(&text).map_err(|source| ConfigError::Parse {
            path: shown.clone(),
            source,
        })?;
        info!(path = %shown, "Loaded configuration");
        Ok(settings)
    }

    pub fn from_yaml(text: &str) -> Result<Settings, serde_yaml::Error> {
        if text.trim().is_empty() {
            return Ok(Settings::default());
        }
        serde_yaml::from_str(text)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Immutable mapping from [`FeedSource`] to feed URL.
///
/// Built once at start-up; adding a source means adding one binding.
#[derive(Debug, Clone)]
pub struct FeedCatalog {
    urls: HashMap<FeedSource, String>,
}

impl FeedCatalog {
    /// Build the catalog from the default URLs plus any overrides.
    ///
    /// Override keys accept the same names and aliases as the CLI. Unknown
    /// keys and non-http(s) URLs are rejected.
    pub fn from_overrides(
        overrides: &BTreeMap<String, String>,
    ) -> Result<FeedCatalog, ConfigError> {
        let mut urls: HashMap<FeedSource, String> = FeedSource::ALL
            .iter()
            .map(|s| (*s, s.default_url().to_string()))
            .collect();

        for (name, url) in overrides {
            let source = FeedSource::from_name(name).ok_or_else(|| ConfigError::FeedUrl {
                source_name: name.clone(),
                url: url.clone(),
            })?;
            let valid = Url::parse(url)
                .map(|u| u.scheme() == "http" || u.scheme() == "https")
                .unwrap_or(false);
            if !valid {
                return Err(ConfigError::FeedUrl {
                    source_name: name.clone(),
                    url: url.clone(),
                });
            }
            debug!(source = %source, %url, "Feed URL overridden");
            urls.insert(source, url.clone());
        }

        Ok(FeedCatalog { urls })
    }

    pub fn url(&self, source: FeedSource) -> &str {
        self.urls
            .get(&source)
            .map(String::as_str)
            .unwrap_or_else(|| source.default_url())
    }
}

impl Default for FeedCatalog {
    fn default() -> Self {
        FeedCatalog {
            urls: FeedSource::ALL
                .iter()
                .map(|s| (*s, s.default_url().to_string()))
                .collect(),
        }
    }
}
