//! Translate text and read the translation aloud.

use crate::config::Settings;
use crate::error::{PlaybackError, TranslateError};
use crate::playback::{AudioOutput, PlaybackEngine, Synthesize};
use crate::utils::truncate_for_log;
use reqwest::Client;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument};

/// Language used when a name is not recognized.
pub const FALLBACK_LANGUAGE: &str = "en";

const LANGUAGES: &[(&str, &str)] = &[
    ("af", "afrikaans"),
    ("sq", "albanian"),
    ("am", "amharic"),
    ("ar", "arabic"),
    ("hy", "armenian"),
    ("az", "azerbaijani"),
    ("eu", "basque"),
    ("be", "belarusian"),
    ("bn", "bengali"),
    ("bs", "bosnian"),
    ("bg", "bulgarian"),
    ("ca", "catalan"),
    ("ceb", "cebuano"),
    ("ny", "chichewa"),
    ("zh-cn", "chinese (simplified)"),
    ("zh-tw", "chinese (traditional)"),
    ("co", "corsican"),
    ("hr", "croatian"),
    ("cs", "czech"),
    ("da", "danish"),
    ("nl", "dutch"),
    ("en", "english"),
    ("eo", "esperanto"),
    ("et", "estonian"),
    ("tl", "filipino"),
    ("fi", "finnish"),
    ("fr", "french"),
    ("fy", "frisian"),
    ("gl", "galician"),
    ("ka", "georgian"),
    ("de", "german"),
    ("el", "greek"),
    ("gu", "gujarati"),
    ("ht", "haitian creole"),
    ("ha", "hausa"),
    ("haw", "hawaiian"),
    ("iw", "hebrew"),
    ("hi", "hindi"),
    ("hmn", "hmong"),
    ("hu", "hungarian"),
    ("is", "icelandic"),
    ("ig", "igbo"),
    ("id", "indonesian"),
    ("ga", "irish"),
    ("it", "italian"),
    ("ja", "japanese"),
    ("jw", "javanese"),
    ("kn", "kannada"),
    ("kk", "kazakh"),
    ("km", "khmer"),
    ("ko", "korean"),
    ("ku", "kurdish (kurmanji)"),
    ("ky", "kyrgyz"),
    ("lo", "lao"),
    ("la", "latin"),
    ("lv", "latvian"),
    ("lt", "lithuanian"),
    ("lb", "luxembourgish"),
    ("mk", "macedonian"),
    ("mg", "malagasy"),
    ("ms", "malay"),
    ("ml", "malayalam"),
    ("mt", "maltese"),
    ("mi", "maori"),
    ("mr", "marathi"),
    ("mn", "mongolian"),
    ("my", "myanmar (burmese)"),
    ("ne", "nepali"),
    ("no", "norwegian"),
    ("or", "odia"),
    ("ps", "pashto"),
    ("fa", "persian"),
    ("pl", "polish"),
    ("pt", "portuguese"),
    ("pa", "punjabi"),
    ("ro", "romanian"),
    ("ru", "russian"),
    ("sm", "samoan"),
    ("gd", "scots gaelic"),
    ("sr", "serbian"),
    ("st", "sesotho"),
    ("sn", "shona"),
    ("sd", "sindhi"),
    ("si", "sinhala"),
    ("sk", "slovak"),
    ("sl", "slovenian"),
    ("so", "somali"),
    ("es", "spanish"),
    ("su", "sundanese"),
    ("sw", "swahili"),
    ("sv", "swedish"),
    ("tg", "tajik"),
    ("ta", "tamil"),
    ("te", "telugu"),
    ("th", "thai"),
    ("tr", "turkish"),
    ("uk", "ukrainian"),
    ("ur", "urdu"),
    ("ug", "uyghur"),
    ("uz", "uzbek"),
    ("vi", "vietnamese"),
    ("cy", "welsh"),
    ("xh", "xhosa"),
    ("yi", "yiddish"),
    ("yo", "yoruba"),
    ("zu", "zulu"),
];

/// Names and codes of the languages the translation service understands.
#[derive(Debug, Clone, Copy, Default)]
pub struct LanguageTable;

impl LanguageTable {
    /// Code for a language name, e.g. `"Spanish"` -> `"es"`.
    ///
    /// Unknown names map to [`FALLBACK_LANGUAGE`].
    pub fn code(&self, name: &str) -> &'static str {
        let name = name.trim();
        LANGUAGES
            .iter()
            .find(|(_, n)| n.eq_ignore_ascii_case(name))
            .map(|(code, _)| *code)
            .unwrap_or(FALLBACK_LANGUAGE)
    }

    pub fn name(&self, code: &str) -> Option<&'static str> {
        let code = code.trim();
        LANGUAGES
            .iter()
            .find(|(c, _)| c.eq_ignore_ascii_case(code))
            .map(|(_, name)| *name)
    }
}

/// Machine translation between two language codes.
///
/// The future is `Send` so a translation can run on a spawned task.
pub trait Translate {
    fn translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> impl Future<Output = Result<String, TranslateError>> + Send;
}

#[derive(Debug, Clone)]
pub struct GoogleTranslator {
    client: Client,
    endpoint: String,
}

impl GoogleTranslator {
    pub fn new(client: Client, endpoint: String) -> Self {
        Self { client, endpoint }
    }

    fn request_url(&self, text: &str, source: &str, target: &str) -> String {
        format!(
            "{}?client=gtx&sl={}&tl={}&dt=t&q={}",
            self.endpoint,
            urlencoding::encode(source),
            urlencoding::encode(target),
            urlencoding::encode(text)
        )
    }
}

impl Translate for GoogleTranslator {
    #[instrument(level = "debug", skip(self, text), fields(chars = text.chars().count()))]
    async fn translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> Result<String, TranslateError> {
        let response = self.client.get(self.request_url(text, source, target)).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TranslateError::Status(status.as_u16()));
        }
        let body = response.text().await?;
        parse_translation(&body)
    }
}

/// Pull the translated text out of a `translate_a/single` response.
///
/// The body is a nested array whose first element lists the translated
/// segments, each starting with its translated text.
pub fn parse_translation(body: &str) -> Result<String, TranslateError> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| TranslateError::Response(e.to_string()))?;
    let segments = value
        .get(0)
        .and_then(Value::as_array)
        .ok_or_else(|| TranslateError::Response("no translated segments".to_string()))?;

    let text: String = segments
        .iter()
        .filter_map(|segment| segment.get(0).and_then(Value::as_str))
        .collect();
    if text.trim().is_empty() {
        return Err(TranslateError::Response("empty translation".to_string()));
    }
    Ok(text)
}

/// Translates text and speaks the result through a shared playback engine.
pub struct Interpreter<T, S, O> {
    translator: T,
    languages: LanguageTable,
    engine: Arc<Mutex<PlaybackEngine<S, O>>>,
}

impl<S, O> Interpreter<GoogleTranslator, S, O> {
    pub fn from_settings(
        settings: &Settings,
        client: Client,
        engine: Arc<Mutex<PlaybackEngine<S, O>>>,
    ) -> Self {
        Interpreter::new(
            GoogleTranslator::new(client, settings.translate.endpoint.clone()),
            engine,
        )
    }
}

impl<T, S, O> Interpreter<T, S, O> {
    pub fn new(translator: T, engine: Arc<Mutex<PlaybackEngine<S, O>>>) -> Self {
        Self {
            translator,
            languages: LanguageTable,
            engine,
        }
    }
}

impl<T, S, O> Interpreter<T, S, O>
where
    T: Translate,
    S: Synthesize,
    O: AudioOutput,
{
    /// Translate `text` between two language names, then speak it in the
    /// target language.
    ///
    /// # Arguments
    ///
    /// * `text` - Text in the source language
    /// * `from` - Source language name, e.g. `"English"`
    /// * `to` - Target language name; unknown names fall back to English
    ///
    /// # Returns
    ///
    /// The translated text once playback has finished.
    #[instrument(level = "info", skip(self, text))]
    pub async fn translate_and_speak(
        &self,
        text: &str,
        from: &str,
        to: &str,
    ) -> Result<String, TranslateError> {
        if text.trim().is_empty() {
            return Err(PlaybackError::EmptyText.into());
        }
        let source = self.languages.code(from);
        let target = self.languages.code(to);
        debug!(
            source,
            target,
            target_name = self.languages.name(target).unwrap_or_default(),
            "Resolved language codes"
        );

        let translated = self.translator.translate(text, source, target).await?;
        info!(chars = translated.chars().count(), "Translated text");

        let mut engine = self.engine.lock().await;
        engine.speak(&translated, target).await.into_result()?;
        Ok(translated)
    }
}

impl<T, S, O> Interpreter<T, S, O>
where
    T: Translate + Send + Sync + 'static,
    S: Synthesize + Send + 'static,
    O: AudioOutput + Send + 'static,
{
    /// Run [`translate_and_speak`](Self::translate_and_speak) on its own task.
    ///
    /// The handle may be dropped; a failure is logged either way and the
    /// handle resolves to `None`.
    pub fn spawn_translate_and_speak(
        self: &Arc<Self>,
        text: String,
        from: String,
        to: String,
    ) -> JoinHandle<Option<String>> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            match this.translate_and_speak(&text, &from, &to).await {
                Ok(translated) => {
                    info!(translated = %truncate_for_log(&translated, 120), "Spoke translation");
                    Some(translated)
                }
                Err(e) => {
                    error!(error = %e, "Translate and speak failed");
                    None
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    struct FakeTranslator;

    impl Translate for FakeTranslator {
        async fn translate(
            &self,
            text: &str,
            source: &str,
            target: &str,
        ) -> Result<String, TranslateError> {
            if text == "fail" {
                return Err(TranslateError::Status(503));
            }
            Ok(format!("[{source}->{target}] {text}"))
        }
    }

    struct EchoSynth;

    impl Synthesize for EchoSynth {
        async fn synthesize(&self, text: &str, language: &str) -> Result<Vec<u8>, PlaybackError> {
            Ok(format!("{language}|{text}").into_bytes())
        }
    }

    #[derive(Clone, Default)]
    struct RecordingOutput {
        played: Arc<StdMutex<Vec<String>>>,
    }

    impl AudioOutput for RecordingOutput {
        fn load(&mut self, path: &Path) -> Result<(), PlaybackError> {
            let audio = std::fs::read_to_string(path)?;
            self.played.lock().unwrap().push(audio);
            Ok(())
        }

        fn play(&mut self) -> Result<(), PlaybackError> {
            Ok(())
        }

        fn is_busy(&mut self) -> Result<bool, PlaybackError> {
            Ok(false)
        }

        fn stop(&mut self) {}
    }

    fn artifact(name: &str) -> PathBuf {
        let file = format!("news_digest_translate_{name}_{}.mp3", std::process::id());
        std::env::temp_dir().join(file)
    }

    fn interpreter(
        name: &str,
        output: RecordingOutput,
    ) -> Interpreter<FakeTranslator, EchoSynth, RecordingOutput> {
        let poll = Duration::from_millis(1);
        let engine = PlaybackEngine::new(EchoSynth, output, artifact(name), poll);
        Interpreter::new(FakeTranslator, Arc::new(Mutex::new(engine)))
    }

    #[test]
    fn test_language_codes_are_case_insensitive() {
        let table = LanguageTable;
        assert_eq!(table.code("Spanish"), "es");
        assert_eq!(table.code("  GERMAN "), "de");
        assert_eq!(table.code("Chinese (Simplified)"), "zh-cn");
        assert_eq!(table.name("FR"), Some("french"));
    }

    #[test]
    fn test_unknown_language_falls_back_to_english() {
        assert_eq!(LanguageTable.code("klingon"), "en");
        assert_eq!(LanguageTable.code(""), "en");
        assert_eq!(LanguageTable.name("xx"), None);
    }

    #[test]
    fn test_parse_translation_joins_segments() {
        let body = r#"[[["Hola. ","Hello. ",null,null,10],
            ["¿Cómo estás?","How are you?",null,null,10]],null,"en"]"#;
        assert_eq!(parse_translation(body).unwrap(), "Hola. ¿Cómo estás?");
    }

    #[test]
    fn test_parse_translation_rejects_unexpected_shapes() {
        assert!(matches!(parse_translation("{}"), Err(TranslateError::Response(_))));
        assert!(matches!(parse_translation("not json"), Err(TranslateError::Response(_))));
        assert!(matches!(parse_translation("[[]]"), Err(TranslateError::Response(_))));
    }

    #[test]
    fn test_request_url_is_encoded() {
        let endpoint = "https://t.example.com/single".to_string();
        let translator = GoogleTranslator::new(Client::new(), endpoint);
        assert_eq!(
            translator.request_url("a b&c", "en", "es"),
            "https://t.example.com/single?client=gtx&sl=en&tl=es&dt=t&q=a%20b%26c"
        );
    }

    #[tokio::test]
    async fn test_translate_and_speak_uses_target_language() {
        let output = RecordingOutput::default();
        let interpreter = interpreter("speak", output.clone());

        let translated = interpreter
            .translate_and_speak("good morning", "English", "Spanish")
            .await
            .unwrap();
        assert_eq!(translated, "[en->es] good morning");
        assert_eq!(*output.played.lock().unwrap(), vec!["es|[en->es] good morning"]);
        assert!(!artifact("speak").exists());
    }

    #[tokio::test]
    async fn test_translation_failure_skips_playback() {
        let output = RecordingOutput::default();
        let interpreter = interpreter("fail", output.clone());

        let err = interpreter.translate_and_speak("fail", "English", "French").await.unwrap_err();
        assert!(matches!(err, TranslateError::Status(503)));
        assert!(output.played.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_spawned_failure_resolves_to_none() {
        let interpreter = Arc::new(interpreter("spawn_fail", RecordingOutput::default()));
        let handle =
            interpreter.spawn_translate_and_speak("fail".into(), "english".into(), "german".into());
        assert_eq!(handle.await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_empty_text_is_rejected() {
        let interpreter = interpreter("empty", RecordingOutput::default());
        let err = interpreter.translate_and_speak(" ", "English", "French").await.unwrap_err();
        assert!(matches!(err, TranslateError::Playback(PlaybackError::EmptyText)));
    }

    #[tokio::test]
    async fn test_spawned_job_runs_to_completion() {
        let output = RecordingOutput::default();
        let interpreter = Arc::new(interpreter("spawn", output.clone()));

        let translated = interpreter
            .spawn_translate_and_speak("hello".into(), "english".into(), "italian".into())
            .await
            .unwrap();
        assert_eq!(translated.as_deref(), Some("[en->it] hello"));
        assert_eq!(*output.played.lock().unwrap(), vec!["it|[en->it] hello"]);
        assert!(!interpreter.engine.lock().await.artifact_path().exists());
    }
}
