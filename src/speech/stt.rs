//! Speech-to-text via a Whisper-compatible HTTP API

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::SttSettings;
use crate::speech::{SpeechRecognizer, Transcript};
use crate::{Error, Result};

/// Response payload from a Whisper-compatible transcription endpoint
#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// Whisper-compatible HTTP transcription client
#[derive(Debug, Clone)]
pub struct HttpStt {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
    model: String,
}

impl HttpStt {
    /// Create a new transcription client from settings
    #[must_use]
    pub fn new(settings: &SttSettings) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: settings.api_url.clone(),
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
        }
    }
}

#[async_trait]
impl SpeechRecognizer for HttpStt {
    async fn transcribe(&self, wav: &[u8]) -> Result<Transcript> {
        let part = reqwest::multipart::Part::bytes(wav.to_vec())
            .file_name("audio.wav")
            .mime_str("audio/wav")
            .map_err(|e| Error::Stt(e.to_string()))?;

        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("model", self.model.clone());

        let mut request = self.client.post(&self.api_url).multipart(form);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Stt(format!(
                "transcription request failed ({status}): {body}"
            )));
        }

        let payload: TranscriptionResponse = response.json().await?;
        let text = payload.text.trim().to_string();

        if text.is_empty() {
            tracing::debug!("recognizer returned empty transcript");
            Ok(Transcript::Unrecognized)
        } else {
            tracing::debug!(text = %text, "transcription complete");
            Ok(Transcript::Text(text))
        }
    }
}
