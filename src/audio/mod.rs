//! Audio capture and device arbitration

use std::time::Duration;

use async_trait::async_trait;

use crate::Result;

mod capture;
mod gate;

pub use capture::{AudioCapture, CpalSource, SAMPLE_RATE, rms_energy, samples_to_wav};
pub use gate::AudioGate;

/// Source of raw phrase audio
///
/// Implementations block until speech is detected or `timeout`
/// elapses, then record until the phrase ends or `phrase_limit` is
/// reached. `Ok(None)` means no speech was heard in time.
#[async_trait]
pub trait AudioSource: Send + Sync {
    /// Capture one phrase of audio samples
    ///
    /// # Errors
    ///
    /// Returns error if the input device cannot be opened or the
    /// capture stream fails
    async fn capture(&self, timeout: Duration, phrase_limit: Duration)
    -> Result<Option<Vec<f32>>>;
}
