//! Speech input and output
//!
//! The session loop talks to speech through two seams: [`Listen`]
//! turns microphone audio into normalized [`Utterance`]s, and
//! [`Speak`] voices replies. Production wiring is
//! [`Listener`] (gate + cpal capture + HTTP transcription) and
//! [`Voice`] (gate + system TTS with one retry).

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

use crate::Result;

mod listen;
mod speak;
mod stt;

pub use listen::Listener;
pub use speak::{SpeakOutcome, SystemTts, TtsEngine, Voice};
pub use stt::HttpStt;

/// A transcribed command phrase, trimmed and uppercased
///
/// All matching downstream runs on this canonical form, so casing
/// from the recognizer never changes behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterance(String);

impl Utterance {
    /// Normalize raw recognizer text into an utterance
    #[must_use]
    pub fn new(raw: &str) -> Self {
        Self(raw.trim().to_uppercase())
    }

    /// The canonical uppercase text
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether any text survived normalization
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Substring test against the canonical form
    #[must_use]
    pub fn contains(&self, needle: &str) -> bool {
        self.0.contains(needle)
    }
}

impl fmt::Display for Utterance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of one listen attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Heard {
    /// Speech was captured and transcribed
    Utterance(Utterance),
    /// No speech started before the timeout
    Silence,
    /// Speech was captured but the recognizer produced nothing usable
    Unintelligible,
}

/// One-shot listen primitive
#[async_trait]
pub trait Listen: Send + Sync {
    /// Listen for a single phrase
    ///
    /// Waits up to `timeout` for speech to start and records at most
    /// `phrase_limit` once it does.
    ///
    /// # Errors
    ///
    /// Returns error if capture or transcription infrastructure fails
    async fn listen_once(&self, timeout: Duration, phrase_limit: Duration) -> Result<Heard>;
}

/// Spoken output seam
///
/// Speaking never fails the caller: delivery problems are handled
/// internally and logged.
#[async_trait]
pub trait Speak: Send + Sync {
    /// Voice a message, waiting for any in-flight speech to finish
    async fn say(&self, text: &str);
}

/// Result of transcribing captured audio
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transcript {
    /// Recognized text
    Text(String),
    /// The audio carried no recognizable speech
    Unrecognized,
}

/// Speech-to-text backend
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Transcribe WAV-encoded audio
    ///
    /// # Errors
    ///
    /// Returns error if the recognizer backend is unreachable or
    /// rejects the request
    async fn transcribe(&self, wav: &[u8]) -> Result<Transcript>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utterance_normalizes_case_and_whitespace() {
        let u = Utterance::new("  hey Lucy, open Notepad  ");
        assert_eq!(u.as_str(), "HEY LUCY, OPEN NOTEPAD");
    }

    #[test]
    fn empty_after_trim_is_empty() {
        assert!(Utterance::new("   ").is_empty());
        assert!(!Utterance::new("x").is_empty());
    }

    #[test]
    fn contains_matches_canonical_form() {
        let u = Utterance::new("set volume 45");
        assert!(u.contains("SET VOLUME"));
        assert!(!u.contains("set volume"));
    }
}
