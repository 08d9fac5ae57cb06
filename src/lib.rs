//! Lucifer - a voice-driven desktop command agent
//!
//! Lucifer idles on a wake phrase, transcribes the command that
//! follows, and executes it against the host: power management,
//! volume, timers and alarms, app launching, and small spoken
//! queries. Destructive actions require a spoken confirmation.
//!
//! ```text
//!  microphone ──► AudioGate ──► Listener ──► Utterance
//!                                               │
//!                     wake phrase? ◄────────────┘
//!                          │
//!                  SessionLoop ──► Intent ──► executors
//!                          │            (power, volume, apps, clock)
//!                          ▼
//!                     Scheduler ──► detached ring tasks
//!                          │
//!                       Voice ──► speech output
//! ```
//!
//! Everything side-effectful sits behind a trait, so the loop and
//! scheduler are exercised end to end in tests with scripted
//! listeners and recording speakers.

pub mod actions;
pub mod audio;
pub mod config;
pub mod error;
pub mod hotkey;
pub mod intent;
pub mod sched;
pub mod session;
pub mod singleton;
pub mod speech;

pub use config::Settings;
pub use error::{Error, Result};
pub use intent::Intent;
pub use session::{Collaborators, SessionLoop, SessionState};
