//! Text-to-speech playback.
//!
//! A [`PlaybackEngine`] turns text into audio and plays it to the end:
//!
//! ```text
//! Idle -> Synthesizing -> Playing -> Complete
//!              |             |
//!              +-------------+-----> Failed
//! ```
//!
//! The audio is written to one well-known artifact file, loaded into an
//! [`AudioOutput`], and the engine polls the output every `poll_interval`
//! until it is no longer busy. The artifact is removed on every exit path by
//! [`ArtifactGuard`], including synthesis and playback failures.
//!
//! Only one `speak` call may run at a time; sharing the engine behind a
//! `tokio::sync::Mutex` gives that for free.

use crate::config::Settings;
use crate::error::PlaybackError;
use crate::models::PlaybackState;
use reqwest::Client;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

/// Longest text sent in one request to the TTS endpoint.
pub const MAX_TTS_CHARS: usize = 200;

/// Text plus language code in, audio bytes out.
///
/// The future is `Send` so playback can run on a spawned task.
pub trait Synthesize {
    fn synthesize(
        &self,
        text: &str,
        language: &str,
    ) -> impl Future<Output = Result<Vec<u8>, PlaybackError>> + Send;
}

/// An audio device that plays one file at a time.
pub trait AudioOutput {
    fn load(&mut self, path: &Path) -> Result<(), PlaybackError>;
    fn play(&mut self) -> Result<(), PlaybackError>;
    /// Whether the loaded file is still playing; an abnormal end is an error.
    fn is_busy(&mut self) -> Result<bool, PlaybackError>;
    /// Stop playback and release the device.
    fn stop(&mut self);
}

/// Deletes the artifact file when dropped.
#[derive(Debug)]
pub struct ArtifactGuard {
    path: PathBuf,
}

impl ArtifactGuard {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ArtifactGuard {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Removed audio artifact"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Could not remove audio artifact")
            }
        }
    }
}

/// One `speak` call: what was asked and which states it went through.
#[derive(Debug, Clone)]
pub struct PlaybackJob {
    pub text: String,
    pub language: String,
    pub artifact: PathBuf,
    history: Vec<PlaybackState>,
}

impl PlaybackJob {
    fn new(text: &str, language: &str, artifact: PathBuf) -> Self {
        Self {
            text: text.to_string(),
            language: language.to_string(),
            artifact,
            history: vec![PlaybackState::Idle],
        }
    }

    fn transition(&mut self, next: PlaybackState) {
        debug_assert!(!self.state().is_terminal(), "no transition out of a terminal state");
        debug!(from = ?self.state(), to = ?next, "Playback state change");
        self.history.push(next);
    }

    pub fn state(&self) -> PlaybackState {
        self.history.last().copied().unwrap_or(PlaybackState::Idle)
    }

    pub fn history(&self) -> &[PlaybackState] {
        &self.history
    }
}

/// The finished job together with how it ended.
#[derive(Debug)]
pub struct PlaybackOutcome {
    pub job: PlaybackJob,
    pub result: Result<(), PlaybackError>,
}

impl PlaybackOutcome {
    pub fn into_result(self) -> Result<PlaybackJob, PlaybackError> {
        self.result.map(|()| self.job)
    }
}

#[derive(Debug)]
pub struct PlaybackEngine<S, O> {
    synthesizer: S,
    output: O,
    artifact_path: PathBuf,
    poll_interval: Duration,
}

impl PlaybackEngine<GoogleTts, CommandPlayer> {
    pub fn from_settings(settings: &Settings, client: Client) -> Result<Self, PlaybackError> {
        let playback = &settings.playback;
        Ok(PlaybackEngine::new(
            GoogleTts::new(client, playback.tts_endpoint.clone()),
            CommandPlayer::new(&playback.player)?,
            playback.artifact_path.clone(),
            playback.poll_interval(),
        ))
    }
}

impl<S, O> PlaybackEngine<S, O>
where
    S: Synthesize,
    O: AudioOutput,
{
    pub fn new(synthesizer: S, output: O, artifact_path: PathBuf, poll_interval: Duration) -> Self {
        Self {
            synthesizer,
            output,
            artifact_path,
            poll_interval,
        }
    }

    pub fn artifact_path(&self) -> &Path {
        &self.artifact_path
    }

    /// Synthesize `text` in `language` and play it to the end.
    ///
    /// Waits, polling every `poll_interval`, until the output is idle. The
    /// artifact file is gone when this returns, whatever the outcome.
    ///
    /// # Arguments
    ///
    /// * `text` - What to say; blank text fails with [`PlaybackError::EmptyText`]
    /// * `language` - Language code for the voice, e.g. `"en"`
    ///
    /// # Returns
    ///
    /// A [`PlaybackOutcome`] holding the job's state history, ending in
    /// `Complete` or `Failed`, and the result.
    #[instrument(level = "info", skip(self, text), fields(chars = text.chars().count()))]
    pub async fn speak(&mut self, text: &str, language: &str) -> PlaybackOutcome {
        let mut job = PlaybackJob::new(text, language, self.artifact_path.clone());
        let result = self.run(&mut job).await;
        match &result {
            Ok(()) => {
                job.transition(PlaybackState::Complete);
                info!("Playback complete");
            }
            Err(e) => {
                job.transition(PlaybackState::Failed);
                error!(error = %e, "Playback failed");
            }
        }
        PlaybackOutcome { job, result }
    }

    async fn run(&mut self, job: &mut PlaybackJob) -> Result<(), PlaybackError> {
        if job.text.trim().is_empty() {
            return Err(PlaybackError::EmptyText);
        }

        let artifact = ArtifactGuard::new(job.artifact.clone());
        job.transition(PlaybackState::Synthesizing);
        let audio = self.synthesizer.synthesize(&job.text, &job.language).await?;
        write_artifact(artifact.path(), &audio).await?;
        debug!(bytes = audio.len(), path = %artifact.path().display(), "Wrote audio artifact");

        job.transition(PlaybackState::Playing);
        let played = self.play_to_end(artifact.path()).await;
        self.output.stop();
        played
    }

    async fn play_to_end(&mut self, path: &Path) -> Result<(), PlaybackError> {
        self.output.load(path)?;
        self.output.play()?;
        while self.output.is_busy()? {
            tokio::time::sleep(self.poll_interval).await;
        }
        Ok(())
    }
}

async fn write_artifact(path: &Path, audio: &[u8]) -> Result<(), PlaybackError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, audio).await?;
    Ok(())
}

/// Split `text` into pieces of at most `max_chars` characters, on word
/// boundaries where possible.
pub fn split_for_tts(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        let current_len = current.chars().count();

        if word_len > max_chars {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
            let chars: Vec<char> = word.chars().collect();
            for piece in chars.chunks(max_chars) {
                chunks.push(piece.iter().collect());
            }
            continue;
        }

        if current.is_empty() {
            current.push_str(word);
        } else if current_len + 1 + word_len <= max_chars {
            current.push(' ');
            current.push_str(word);
        } else {
            chunks.push(std::mem::replace(&mut current, word.to_string()));
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Speech from the Google Translate TTS endpoint, returned as MP3.
#[derive(Debug, Clone)]
pub struct GoogleTts {
    client: Client,
    endpoint: String,
}

impl GoogleTts {
    pub fn new(client: Client, endpoint: String) -> Self {
        Self { client, endpoint }
    }

    fn chunk_url(&self, chunk: &str, language: &str, idx: usize, total: usize) -> String {
        format!(
            "{}?ie=UTF-8&q={}&tl={}&total={}&idx={}&textlen={}&client=tw-ob",
            self.endpoint,
            urlencoding::encode(chunk),
            urlencoding::encode(language),
            total,
            idx,
            chunk.chars().count()
        )
    }
}

impl Synthesize for GoogleTts {
    async fn synthesize(&self, text: &str, language: &str) -> Result<Vec<u8>, PlaybackError> {
        let chunks = split_for_tts(text, MAX_TTS_CHARS);
        let total = chunks.len();
        let mut audio = Vec::new();

        for (idx, chunk) in chunks.iter().enumerate() {
            let response = self
                .client
                .get(self.chunk_url(chunk, language, idx, total))
                .send()
                .await
                .map_err(|e| PlaybackError::Synthesis(e.to_string()))?;
            let status = response.status();
            if !status.is_success() {
                return Err(PlaybackError::Synthesis(format!(
                    "TTS endpoint returned HTTP {} for language {language}",
                    status.as_u16()
                )));
            }
            let bytes = response
                .bytes()
                .await
                .map_err(|e| PlaybackError::Synthesis(e.to_string()))?;
            audio.extend_from_slice(&bytes);
        }

        if audio.is_empty() {
            return Err(PlaybackError::Synthesis("TTS endpoint returned no audio".to_string()));
        }
        Ok(audio)
    }
}

/// Plays audio through an external player program, e.g. `mpg123 -q`.
///
/// The artifact path is appended to the configured arguments. The player is
/// busy for as long as its process is running.
#[derive(Debug)]
pub struct CommandPlayer {
    program: String,
    args: Vec<String>,
    loaded: Option<PathBuf>,
    child: Option<Child>,
}

impl CommandPlayer {
    pub fn new(command: &[String]) -> Result<Self, PlaybackError> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| PlaybackError::Playback("no audio player configured".to_string()))?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            loaded: None,
            child: None,
        })
    }
}

impl AudioOutput for CommandPlayer {
    fn load(&mut self, path: &Path) -> Result<(), PlaybackError> {
        if !path.is_file() {
            return Err(PlaybackError::Playback(format!(
                "{} is not a playable file",
                path.display()
            )));
        }
        self.loaded = Some(path.to_path_buf());
        Ok(())
    }

    fn play(&mut self) -> Result<(), PlaybackError> {
        let path = self
            .loaded
            .as_ref()
            .ok_or_else(|| PlaybackError::Playback("nothing loaded".to_string()))?;
        let child = Command::new(&self.program)
            .args(&self.args)
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                PlaybackError::Playback(format!("could not start {}: {e}", self.program))
            })?;
        debug!(program = %self.program, pid = child.id(), "Started audio player");
        self.child = Some(child);
        Ok(())
    }

    fn is_busy(&mut self) -> Result<bool, PlaybackError> {
        let Some(child) = self.child.as_mut() else {
            return Ok(false);
        };
        match child.try_wait() {
            Ok(None) => Ok(true),
            Ok(Some(status)) if status.success() => Ok(false),
            Ok(Some(status)) => Err(PlaybackError::Playback(format!(
                "{} exited with {status}",
                self.program
            ))),
            Err(e) => Err(PlaybackError::Playback(e.to_string())),
        }
    }

    fn stop(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Ok(None) = child.try_wait() {
                if let Err(e) = child.kill() {
                    warn!(error = %e, "Could not stop audio player");
                }
            }
            let _ = child.wait();
        }
        self.loaded = None;
    }
}
