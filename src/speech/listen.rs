//! Microphone listening pipeline
//!
//! Capture runs under the microphone lock; transcription happens
//! after the lock is released so a slow STT round trip never starves
//! a pending speak.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::audio::{AudioGate, AudioSource, SAMPLE_RATE, samples_to_wav};
use crate::speech::{Heard, Listen, SpeechRecognizer, Transcript, Utterance};
use crate::Result;

/// Gated capture plus transcription
pub struct Listener {
    gate: Arc<AudioGate>,
    source: Arc<dyn AudioSource>,
    recognizer: Arc<dyn SpeechRecognizer>,
}

impl Listener {
    /// Wire a listener over the shared gate
    #[must_use]
    pub fn new(
        gate: Arc<AudioGate>,
        source: Arc<dyn AudioSource>,
        recognizer: Arc<dyn SpeechRecognizer>,
    ) -> Self {
        Self {
            gate,
            source,
            recognizer,
        }
    }
}

#[async_trait]
impl Listen for Listener {
    async fn listen_once(&self, timeout: Duration, phrase_limit: Duration) -> Result<Heard> {
        let captured = self
            .gate
            .with_microphone(|| self.source.capture(timeout, phrase_limit))
            .await?;

        let Some(samples) = captured else {
            return Ok(Heard::Silence);
        };

        let wav = samples_to_wav(&samples, SAMPLE_RATE)?;
        match self.recognizer.transcribe(&wav).await? {
            Transcript::Text(text) => {
                let utterance = Utterance::new(&text);
                if utterance.is_empty() {
                    Ok(Heard::Unintelligible)
                } else {
                    tracing::info!(transcript = %utterance, "heard");
                    Ok(Heard::Utterance(utterance))
                }
            }
            Transcript::Unrecognized => {
                tracing::debug!("phrase captured but not recognized");
                Ok(Heard::Unintelligible)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedSource(Option<Vec<f32>>);

    #[async_trait]
    impl AudioSource for FixedSource {
        async fn capture(&self, _: Duration, _: Duration) -> Result<Option<Vec<f32>>> {
            Ok(self.0.clone())
        }
    }

    struct FixedRecognizer(Transcript);

    #[async_trait]
    impl SpeechRecognizer for FixedRecognizer {
        async fn transcribe(&self, _: &[u8]) -> Result<Transcript> {
            Ok(self.0.clone())
        }
    }

    fn listener(source: FixedSource, recognizer: FixedRecognizer) -> Listener {
        Listener::new(
            Arc::new(AudioGate::new()),
            Arc::new(source),
            Arc::new(recognizer),
        )
    }

    #[tokio::test]
    async fn silence_when_no_speech_starts() {
        let l = listener(
            FixedSource(None),
            FixedRecognizer(Transcript::Text("ignored".into())),
        );
        let heard = l
            .listen_once(Duration::from_secs(5), Duration::from_secs(7))
            .await
            .unwrap();
        assert_eq!(heard, Heard::Silence);
    }

    #[tokio::test]
    async fn transcript_is_normalized() {
        let l = listener(
            FixedSource(Some(vec![0.1; 1600])),
            FixedRecognizer(Transcript::Text("hey lucy what time is it".into())),
        );
        let heard = l
            .listen_once(Duration::from_secs(5), Duration::from_secs(7))
            .await
            .unwrap();
        assert_eq!(
            heard,
            Heard::Utterance(Utterance::new("HEY LUCY WHAT TIME IS IT"))
        );
    }

    #[tokio::test]
    async fn unrecognized_audio_is_unintelligible() {
        let l = listener(
            FixedSource(Some(vec![0.1; 1600])),
            FixedRecognizer(Transcript::Unrecognized),
        );
        let heard = l
            .listen_once(Duration::from_secs(5), Duration::from_secs(7))
            .await
            .unwrap();
        assert_eq!(heard, Heard::Unintelligible);
    }

    #[tokio::test]
    async fn blank_transcript_is_unintelligible() {
        let l = listener(
            FixedSource(Some(vec![0.1; 1600])),
            FixedRecognizer(Transcript::Text("   ".into())),
        );
        let heard = l
            .listen_once(Duration::from_secs(5), Duration::from_secs(7))
            .await
            .unwrap();
        assert_eq!(heard, Heard::Unintelligible);
    }
}
