//! Audio device arbitration
//!
//! A single gate owns access to the microphone and the speech output
//! device. Listening holds the microphone lock for the duration of a
//! capture; speaking holds the output lock for the duration of an
//! utterance. Detached alarm tasks and the foreground session loop
//! share the same gate, so speech never overlaps.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{Mutex, MutexGuard};

/// Serializes access to the microphone and speech output
#[derive(Debug, Default)]
pub struct AudioGate {
    microphone: Mutex<()>,
    output: Mutex<()>,
    muted: AtomicBool,
}

impl AudioGate {
    /// Create a new gate with both devices free
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `capture` while holding the microphone exclusively.
    ///
    /// The lock is released when the returned future completes,
    /// whether it resolved or failed.
    pub async fn with_microphone<T, F, Fut>(&self, capture: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let _guard = self.microphone.lock().await;
        capture().await
    }

    /// Acquire the speech output lock, waiting for any in-flight
    /// utterance to finish
    pub async fn lock_output(&self) -> MutexGuard<'_, ()> {
        self.output.lock().await
    }

    /// Record the system mute state toggled through the agent
    pub fn set_muted(&self, muted: bool) {
        self.muted.store(muted, Ordering::Relaxed);
    }

    /// Whether the agent last toggled the system to muted
    #[must_use]
    pub fn is_muted(&self) -> bool {
        self.muted.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn microphone_captures_are_serialized() {
        let gate = Arc::new(AudioGate::new());
        let active = Arc::new(AtomicUsize::new(0));
        let overlapped = Arc::new(AtomicBool::new(false));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let gate = Arc::clone(&gate);
            let active = Arc::clone(&active);
            let overlapped = Arc::clone(&overlapped);
            handles.push(tokio::spawn(async move {
                gate.with_microphone(|| async {
                    if active.fetch_add(1, Ordering::SeqCst) > 0 {
                        overlapped.store(true, Ordering::SeqCst);
                    }
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                })
                .await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert!(!overlapped.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn mute_flag_round_trips() {
        let gate = AudioGate::new();
        assert!(!gate.is_muted());
        gate.set_muted(true);
        assert!(gate.is_muted());
        gate.set_muted(false);
        assert!(!gate.is_muted());
    }

    #[tokio::test]
    async fn microphone_lock_releases_after_capture() {
        let gate = AudioGate::new();
        gate.with_microphone(|| async { 1 }).await;
        // Second capture must not deadlock.
        let value = gate.with_microphone(|| async { 2 }).await;
        assert_eq!(value, 2);
    }
}
