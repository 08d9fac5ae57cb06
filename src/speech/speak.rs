//! Spoken output with a bounded retry policy
//!
//! [`Voice`] serializes utterances through the audio gate and gives a
//! failing engine exactly one reset-and-retry before dropping the
//! message. Every message is logged whether or not it was voiced, so
//! a dead TTS install still leaves a usable trace of the dialog.

use std::time::Duration;

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::audio::AudioGate;
use crate::speech::Speak;

/// Pause after acquiring the output device, letting the previous
/// playback settle before a new utterance starts
const SETTLE_DELAY: Duration = Duration::from_millis(200);

/// Result of one engine speak attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeakOutcome {
    /// The engine played the message to completion
    Done,
    /// The engine failed to play the message
    Failed,
}

/// Text-to-speech engine seam
#[async_trait]
pub trait TtsEngine: Send + Sync {
    /// Attempt to voice one message
    async fn speak(&self, text: &str) -> SpeakOutcome;

    /// Reinitialize the engine after a failed attempt
    async fn reset(&self);
}

/// Gated speaker with the two-attempt delivery policy
pub struct Voice {
    gate: Arc<AudioGate>,
    engine: Arc<dyn TtsEngine>,
}

impl Voice {
    /// Create a speaker over the given gate and engine
    #[must_use]
    pub fn new(gate: Arc<AudioGate>, engine: Arc<dyn TtsEngine>) -> Self {
        Self { gate, engine }
    }
}

#[async_trait]
impl Speak for Voice {
    async fn say(&self, text: &str) {
        tracing::info!(message = %text, "speaking");

        let _output = self.gate.lock_output().await;
        tokio::time::sleep(SETTLE_DELAY).await;

        if self.engine.speak(text).await == SpeakOutcome::Done {
            return;
        }

        tracing::warn!(message = %text, "speech attempt failed, resetting engine");
        self.engine.reset().await;

        if self.engine.speak(text).await == SpeakOutcome::Failed {
            tracing::error!(message = %text, "speech failed after reset, dropping message");
        }
    }
}

/// TTS engine backed by whatever speech synthesizer the host provides
///
/// Probes for a known synthesizer binary at construction and again on
/// every reset, so an engine installed mid-session is picked up.
pub struct SystemTts {
    program: RwLock<Option<String>>,
}

#[cfg(target_os = "macos")]
const CANDIDATES: &[&str] = &["say"];

#[cfg(not(target_os = "macos"))]
const CANDIDATES: &[&str] = &["espeak-ng", "espeak", "spd-say", "flite"];

impl SystemTts {
    /// Probe the host for a speech synthesizer
    #[must_use]
    pub fn new() -> Self {
        let program = Self::detect();
        if program.is_none() {
            tracing::warn!("no speech synthesizer found, replies will be log-only");
        }
        Self {
            program: RwLock::new(program),
        }
    }

    fn detect() -> Option<String> {
        CANDIDATES.iter().find_map(|candidate| {
            which::which(candidate)
                .ok()
                .map(|path| path.display().to_string())
        })
    }
}

impl Default for SystemTts {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TtsEngine for SystemTts {
    async fn speak(&self, text: &str) -> SpeakOutcome {
        let Some(program) = self.program.read().await.clone() else {
            return SpeakOutcome::Failed;
        };

        match tokio::process::Command::new(&program)
            .arg(text)
            .status()
            .await
        {
            Ok(status) if status.success() => SpeakOutcome::Done,
            Ok(status) => {
                tracing::warn!(program = %program, status = %status, "synthesizer exited nonzero");
                SpeakOutcome::Failed
            }
            Err(e) => {
                tracing::warn!(program = %program, error = %e, "failed to run synthesizer");
                SpeakOutcome::Failed
            }
        }
    }

    async fn reset(&self) {
        let fresh = Self::detect();
        tracing::debug!(program = ?fresh, "speech engine reinitialized");
        *self.program.write().await = fresh;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct FlakyEngine {
        failures: AtomicUsize,
        resets: AtomicUsize,
        spoken: Mutex<Vec<String>>,
    }

    impl FlakyEngine {
        fn failing_first(n: usize) -> Self {
            Self {
                failures: AtomicUsize::new(n),
                resets: AtomicUsize::new(0),
                spoken: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl TtsEngine for FlakyEngine {
        async fn speak(&self, text: &str) -> SpeakOutcome {
            if self
                .failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |f| f.checked_sub(1))
                .is_ok()
            {
                return SpeakOutcome::Failed;
            }
            self.spoken.lock().unwrap().push(text.to_string());
            SpeakOutcome::Done
        }

        async fn reset(&self) {
            self.resets.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn healthy_engine_speaks_once_without_reset() {
        let engine = Arc::new(FlakyEngine::failing_first(0));
        let voice = Voice::new(Arc::new(AudioGate::new()), Arc::clone(&engine) as _);

        voice.say("Welcome sir.").await;

        assert_eq!(engine.spoken.lock().unwrap().as_slice(), ["Welcome sir."]);
        assert_eq!(engine.resets.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_attempt_gets_one_reset_and_retry() {
        let engine = Arc::new(FlakyEngine::failing_first(1));
        let voice = Voice::new(Arc::new(AudioGate::new()), Arc::clone(&engine) as _);

        voice.say("Timer set.").await;

        assert_eq!(engine.spoken.lock().unwrap().as_slice(), ["Timer set."]);
        assert_eq!(engine.resets.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn message_dropped_after_second_failure() {
        let engine = Arc::new(FlakyEngine::failing_first(2));
        let voice = Voice::new(Arc::new(AudioGate::new()), Arc::clone(&engine) as _);

        voice.say("Unreachable.").await;

        assert!(engine.spoken.lock().unwrap().is_empty());
        assert_eq!(engine.resets.load(Ordering::SeqCst), 1);
    }
}
