//! Global exit hotkey
//!
//! A dedicated thread watches the system-wide key stream for
//! Ctrl+Alt+Q and reports each chord over a channel. The watcher
//! thread lives for the process lifetime; rdev offers no way to stop
//! a listener once started.

use rdev::{Event, EventType, Key};
use tokio::sync::mpsc;

/// Spawn the hotkey watcher, returning the chord event receiver
///
/// Grab failures (for example a Wayland session without input
/// permissions) are logged and leave the receiver silent rather than
/// failing startup.
#[must_use]
pub fn spawn_exit_hotkey() -> mpsc::Receiver<()> {
    let (tx, rx) = mpsc::channel(1);

    std::thread::spawn(move || {
        let mut ctrl_held = false;
        let mut alt_held = false;

        let callback = move |event: Event| match event.event_type {
            EventType::KeyPress(Key::ControlLeft | Key::ControlRight) => ctrl_held = true,
            EventType::KeyRelease(Key::ControlLeft | Key::ControlRight) => ctrl_held = false,
            EventType::KeyPress(Key::Alt | Key::AltGr) => alt_held = true,
            EventType::KeyRelease(Key::Alt | Key::AltGr) => alt_held = false,
            EventType::KeyPress(Key::KeyQ) => {
                if ctrl_held && alt_held {
                    tracing::info!("exit hotkey pressed");
                    // Full channel means an earlier chord is still
                    // being handled; dropping this one is fine.
                    let _ = tx.try_send(());
                }
            }
            _ => {}
        };

        if let Err(e) = rdev::listen(callback) {
            tracing::warn!(error = ?e, "global hotkey unavailable");
        }
    });

    rx
}
