//! Microphone capture with energy-based phrase detection
//!
//! `AudioCapture` wraps a cpal input stream feeding a shared sample
//! buffer. `CpalSource` builds on it to implement the blocking
//! listen-for-a-phrase primitive: calibrate against ambient noise,
//! wait for speech onset, then record until trailing silence or the
//! phrase limit.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleRate, Stream, StreamConfig};

use crate::audio::AudioSource;
use crate::{Error, Result};

/// Sample rate for audio capture (16kHz for speech)
pub const SAMPLE_RATE: u32 = 16000;

/// Minimum RMS energy treated as speech regardless of ambient level
const BASE_ENERGY_THRESHOLD: f32 = 0.01;

/// Ambient calibration window before each capture
const CALIBRATION_WINDOW: Duration = Duration::from_millis(300);

/// Polling interval while watching the stream buffer
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Trailing silence that ends a phrase
const TRAILING_SILENCE: Duration = Duration::from_millis(600);

/// Captures audio from the default input device
pub struct AudioCapture {
    #[allow(dead_code)]
    device: Device,
    config: StreamConfig,
    buffer: Arc<Mutex<Vec<f32>>>,
    stream: Option<Stream>,
}

impl AudioCapture {
    /// Create a new audio capture instance
    ///
    /// # Errors
    ///
    /// Returns error if audio device cannot be opened
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_input_device()
            .ok_or_else(|| Error::Audio("no input device available".to_string()))?;

        let supported_config = device
            .supported_input_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .find(|c| {
                c.channels() == 1
                    && c.min_sample_rate() <= SampleRate(SAMPLE_RATE)
                    && c.max_sample_rate() >= SampleRate(SAMPLE_RATE)
            })
            .ok_or_else(|| Error::Audio("no suitable audio config found".to_string()))?;

        let config = supported_config
            .with_sample_rate(SampleRate(SAMPLE_RATE))
            .config();

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = SAMPLE_RATE,
            channels = config.channels,
            "audio capture initialized"
        );

        Ok(Self {
            device,
            config,
            buffer: Arc::new(Mutex::new(Vec::new())),
            stream: None,
        })
    }

    /// Start capturing audio
    ///
    /// # Errors
    ///
    /// Returns error if capture fails
    pub fn start(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let buffer = Arc::clone(&self.buffer);
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| Error::Audio("no input device".to_string()))?;

        let config = self.config.clone();

        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if let Ok(mut buf) = buffer.lock() {
                        buf.extend_from_slice(data);
                    }
                },
                |err| {
                    tracing::error!(error = %err, "audio capture error");
                },
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))?;

        stream.play().map_err(|e| Error::Audio(e.to_string()))?;
        self.stream = Some(stream);

        tracing::debug!("audio capture started");
        Ok(())
    }

    /// Stop capturing audio
    pub fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            drop(stream);
            tracing::debug!("audio capture stopped");
        }
    }

    /// Get captured audio buffer and clear it
    ///
    /// Returns the audio samples captured since last call
    #[must_use]
    pub fn take_buffer(&self) -> Vec<f32> {
        self.buffer
            .lock()
            .map(|mut buf| std::mem::take(&mut *buf))
            .unwrap_or_default()
    }

    /// Check if currently capturing
    #[must_use]
    pub const fn is_capturing(&self) -> bool {
        self.stream.is_some()
    }
}

/// Root-mean-square energy of a sample window
#[must_use]
pub fn rms_energy(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let mean = samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32;
    mean.sqrt()
}

/// Phrase capture backed by the default cpal input device
///
/// Each call opens the device fresh, so an unplugged or busy
/// microphone surfaces as an error on the next listen rather than
/// wedging a long-lived stream.
#[derive(Debug, Default)]
pub struct CpalSource;

impl CpalSource {
    /// Create a new cpal-backed source
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AudioSource for CpalSource {
    async fn capture(
        &self,
        timeout: Duration,
        phrase_limit: Duration,
    ) -> Result<Option<Vec<f32>>> {
        // cpal streams are not Send, so the whole capture runs on a
        // blocking thread and only the samples cross back.
        tokio::task::spawn_blocking(move || capture_phrase(timeout, phrase_limit))
            .await
            .map_err(|e| Error::Audio(format!("capture task failed: {e}")))?
    }
}

fn capture_phrase(timeout: Duration, phrase_limit: Duration) -> Result<Option<Vec<f32>>> {
    let mut capture = AudioCapture::new()?;
    capture.start()?;

    std::thread::sleep(CALIBRATION_WINDOW);
    let ambient = rms_energy(&capture.take_buffer());
    let threshold = (ambient * 2.0).max(BASE_ENERGY_THRESHOLD);
    tracing::trace!(ambient, threshold, "ambient calibration complete");

    // Wait for speech onset.
    let wait_start = Instant::now();
    let mut phrase: Vec<f32> = Vec::new();
    loop {
        if wait_start.elapsed() >= timeout {
            capture.stop();
            tracing::trace!("no speech detected before timeout");
            return Ok(None);
        }
        std::thread::sleep(POLL_INTERVAL);
        let chunk = capture.take_buffer();
        if rms_energy(&chunk) > threshold {
            phrase.extend_from_slice(&chunk);
            break;
        }
    }

    // Record until trailing silence or the phrase limit.
    let phrase_start = Instant::now();
    let mut silent_for = Duration::ZERO;
    while phrase_start.elapsed() < phrase_limit {
        std::thread::sleep(POLL_INTERVAL);
        let chunk = capture.take_buffer();
        let energy = rms_energy(&chunk);
        phrase.extend_from_slice(&chunk);
        if energy > threshold {
            silent_for = Duration::ZERO;
        } else {
            silent_for += POLL_INTERVAL;
            if silent_for >= TRAILING_SILENCE {
                break;
            }
        }
    }

    capture.stop();
    tracing::debug!(samples = phrase.len(), "phrase captured");
    Ok(Some(phrase))
}

/// Convert f32 samples to WAV bytes for STT APIs
///
/// # Errors
///
/// Returns error if WAV encoding fails
pub fn samples_to_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec).map_err(|e| Error::Audio(e.to_string()))?;

        for &sample in samples {
            // Convert f32 [-1.0, 1.0] to i16
            #[allow(clippy::cast_possible_truncation)]
            let sample_i16 = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
            writer
                .write_sample(sample_i16)
                .map_err(|e| Error::Audio(e.to_string()))?;
        }

        writer.finalize().map_err(|e| Error::Audio(e.to_string()))?;
    }

    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rms_energy_of_silence_is_zero() {
        assert_eq!(rms_energy(&[]), 0.0);
        assert_eq!(rms_energy(&[0.0; 160]), 0.0);
    }

    #[test]
    fn rms_energy_tracks_amplitude() {
        let quiet = vec![0.01_f32; 160];
        let loud = vec![0.5_f32; 160];
        assert!(rms_energy(&loud) > rms_energy(&quiet));
    }

    #[test]
    fn samples_to_wav_produces_riff_header() {
        let samples = vec![0.0_f32; 1600];
        let wav = samples_to_wav(&samples, SAMPLE_RATE).unwrap();
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
    }

    #[test]
    fn samples_to_wav_clamps_out_of_range() {
        let samples = vec![2.0_f32, -2.0];
        let wav = samples_to_wav(&samples, SAMPLE_RATE).unwrap();
        assert!(!wav.is_empty());
    }
}
