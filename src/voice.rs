//! Voice input and output helpers.
//!
//! Speech recognition and synthesis are platform capabilities (a browser, an
//! OS speech service). They are abstracted as [`SpeechRecognizer`] and
//! [`SpeechSynthesizer`]; this module holds the logic around them:
//! - the supported dictation / read-aloud languages
//! - voice selection by language prefix
//! - the dictation start/stop state

use serde::{Deserialize, Serialize};

use crate::error::MemoryResult;

/// Language used when nothing else is configured
pub const DEFAULT_LANGUAGE: &str = "en-US";

/// A selectable language
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Language {
    /// BCP 47 tag passed to the speech capabilities
    pub code: &'static str,
    pub label: &'static str,
}

/// Languages offered by the language selector
pub const LANGUAGES: &[Language] = &[
    Language {
        code: "en-US",
        label: "English",
    },
    Language {
        code: "ur-PK",
        label: "Urdu",
    },
];

/// Look up a supported language by code
pub fn find_language(code: &str) -> Option<&'static Language> {
    LANGUAGES.iter().find(|l| l.code == code)
}

/// A synthesis voice reported by the platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voice {
    pub name: String,
    /// BCP 47 tag, e.g. "en-GB"
    pub lang: String,
}

/// Pick the first voice whose language starts with `language`.
pub fn select_voice<'a>(voices: &'a [Voice], language: &str) -> Option<&'a Voice> {
    voices.iter().find(|v| v.lang.starts_with(language))
}

/// Platform text-to-speech
pub trait SpeechSynthesizer {
    /// Stop any utterance in progress
    fn cancel(&mut self);

    /// Speak `text`, with the platform default voice when `voice` is `None`
    fn speak(&mut self, text: &str, voice: Option<&Voice>);
}

/// Read `text` aloud in `language`, interrupting whatever is being spoken.
pub fn speak<S: SpeechSynthesizer>(synth: &mut S, voices: &[Voice], language: &str, text: &str) {
    synth.cancel();
    let voice = select_voice(voices, language);
    if voice.is_none() {
        tracing::warn!("No voice found for language: {}. Using default.", language);
    }
    synth.speak(text, voice);
}

/// Platform speech-to-text
pub trait SpeechRecognizer {
    /// Start listening in `language`
    fn start(&mut self, language: &str) -> MemoryResult<()>;

    /// Stop listening
    fn stop(&mut self);
}

/// Dictation state for the add form.
///
/// One final transcript per session; the session ends on result, error or
/// when the platform reports the end of input.
pub struct Dictation<R: SpeechRecognizer> {
    recognizer: R,
    language: String,
    listening: bool,
}

impl<R: SpeechRecognizer> Dictation<R> {
    pub fn new(recognizer: R) -> Self {
        Self {
            recognizer,
            language: DEFAULT_LANGUAGE.to_string(),
            listening: false,
        }
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// Language for the next session
    pub fn set_language(&mut self, language: impl Into<String>) {
        self.language = language.into();
    }

    /// Start listening, or stop if already listening.
    pub fn toggle(&mut self) {
        if self.listening {
            self.recognizer.stop();
            self.listening = false;
            return;
        }
        match self.recognizer.start(&self.language) {
            Ok(()) => self.listening = true,
            Err(e) => tracing::error!("Speech recognition could not start: {}", e),
        }
    }

    /// Final transcript received. Returns the text to put in the input box.
    pub fn on_result(&mut self, transcript: &str) -> String {
        self.listening = false;
        transcript.to_string()
    }

    pub fn on_error(&mut self, error: &str) {
        tracing::error!("Speech recognition error: {}", error);
        self.listening = false;
    }

    pub fn on_end(&mut self) {
        self.listening = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MemoryError;

    fn voices() -> Vec<Voice> {
        vec![
            Voice {
                name: "Samantha".to_string(),
                lang: "en-US".to_string(),
            },
            Voice {
                name: "Daniel".to_string(),
                lang: "en-GB".to_string(),
            },
            Voice {
                name: "Asad".to_string(),
                lang: "ur-PK".to_string(),
            },
        ]
    }

    #[derive(Default)]
    struct FakeSynth {
        log: Vec<String>,
    }

    impl SpeechSynthesizer for FakeSynth {
        fn cancel(&mut self) {
            self.log.push("cancel".to_string());
        }

        fn speak(&mut self, text: &str, voice: Option<&Voice>) {
            let name = voice.map(|v| v.name.as_str()).unwrap_or("default");
            self.log.push(format!("speak {} with {}", text, name));
        }
    }

    #[derive(Default)]
    struct FakeRecognizer {
        fail: bool,
        started: Vec<String>,
        stops: usize,
    }

    impl SpeechRecognizer for FakeRecognizer {
        fn start(&mut self, language: &str) -> MemoryResult<()> {
            if self.fail {
                return Err(MemoryError::Config("not supported".to_string()));
            }
            self.started.push(language.to_string());
            Ok(())
        }

        fn stop(&mut self) {
            self.stops += 1;
        }
    }

    #[test]
    fn test_languages() {
        assert_eq!(find_language("ur-PK").unwrap().label, "Urdu");
        assert!(find_language(DEFAULT_LANGUAGE).is_some());
        assert!(find_language("fr-FR").is_none());
    }

    #[test]
    fn test_select_voice_by_prefix() {
        let voices = voices();
        assert_eq!(select_voice(&voices, "en-US").unwrap().name, "Samantha");
        assert_eq!(select_voice(&voices, "en").unwrap().name, "Samantha");
        assert_eq!(select_voice(&voices, "ur-PK").unwrap().name, "Asad");
        assert!(select_voice(&voices, "fr-FR").is_none());
        assert!(select_voice(&[], "en-US").is_none());
    }

    #[test]
    fn test_speak_cancels_first() {
        let mut synth = FakeSynth::default();
        speak(&mut synth, &voices(), "ur-PK", "buy milk");
        assert_eq!(synth.log, vec!["cancel", "speak buy milk with Asad"]);
    }

    #[test]
    fn test_speak_falls_back_to_default_voice() {
        let mut synth = FakeSynth::default();
        speak(&mut synth, &voices(), "fr-FR", "bonjour");
        assert_eq!(synth.log, vec!["cancel", "speak bonjour with default"]);
    }

    #[test]
    fn test_dictation_toggle_and_result() {
        let mut dictation = Dictation::new(FakeRecognizer::default());
        dictation.set_language("ur-PK");

        dictation.toggle();
        assert!(dictation.is_listening());
        assert_eq!(dictation.recognizer.started, vec!["ur-PK"]);

        let text = dictation.on_result("buy milk");
        assert_eq!(text, "buy milk");
        assert!(!dictation.is_listening());
    }

    #[test]
    fn test_dictation_toggle_stops() {
        let mut dictation = Dictation::new(FakeRecognizer::default());
        dictation.toggle();
        dictation.toggle();
        assert!(!dictation.is_listening());
        assert_eq!(dictation.recognizer.stops, 1);
    }

    #[test]
    fn test_dictation_error_and_end_stop_listening() {
        let mut dictation = Dictation::new(FakeRecognizer::default());
        dictation.toggle();
        dictation.on_error("no-speech");
        assert!(!dictation.is_listening());

        dictation.toggle();
        dictation.on_end();
        assert!(!dictation.is_listening());
    }

    #[test]
    fn test_dictation_start_failure() {
        let mut dictation = Dictation::new(FakeRecognizer {
            fail: true,
            ..Default::default()
        });
        dictation.toggle();
        assert!(!dictation.is_listening());
        assert_eq!(dictation.language(), DEFAULT_LANGUAGE);
    }
}
