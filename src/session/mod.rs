//! The listen-transcribe-dispatch session loop
//!
//! Outer loop: wait for an utterance beginning with a wake phrase.
//! A command in the same breath is dispatched immediately; a bare
//! wake phrase opens an active window with one retry. Shutdown and
//! restart detour through the spoken confirmation dialog before
//! anything irreversible happens.

use std::fmt;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use chrono::Local;
use tokio_util::sync::CancellationToken;

use crate::actions::{
    AppCatalog, BatteryReading, ClockDisplay, ClockLaunch, PowerControl, VolumeControl,
};
use crate::audio::AudioGate;
use crate::intent::{Intent, canned_reply, match_intent, strip_wake_prefix};
use crate::sched::{AlarmKind, Scheduler};
use crate::speech::{Heard, Listen, Speak, Utterance};

mod confirm;

pub use confirm::{Confirmation, confirm_action};

/// Listen windows: (timeout, phrase limit)
const WAKE_LISTEN: (Duration, Duration) = (Duration::from_secs(5), Duration::from_secs(7));
const ACTIVE_LISTEN: (Duration, Duration) = (Duration::from_secs(6), Duration::from_secs(8));
const RETRY_LISTEN: (Duration, Duration) = (Duration::from_secs(8), Duration::from_secs(10));
const FOLLOW_UP_LISTEN: (Duration, Duration) = (Duration::from_secs(6), Duration::from_secs(6));
const VOLUME_LISTEN: (Duration, Duration) = (Duration::from_secs(5), Duration::from_secs(5));

/// Backoff after an infrastructure-level listen failure
const LISTEN_ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// Pause between a farewell and loop teardown
const FAREWELL_PAUSE: Duration = Duration::from_secs(1);

/// Volume change applied by an up or down step
const VOLUME_STEP: u8 = 10;

/// Delay handed to shutdown and restart commands
const POWER_DELAY_SECS: u64 = 60;

/// Where the session currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for a wake phrase
    WakeListening,
    /// A wake phrase opened a command window
    ActiveCommand,
    /// A destructive action is waiting on spoken confirmation
    AwaitingConfirmation,
    /// The loop has exited
    Terminated,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::WakeListening => "wake_listening",
            Self::ActiveCommand => "active_command",
            Self::AwaitingConfirmation => "awaiting_confirmation",
            Self::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// Everything the session loop acts through
pub struct Collaborators {
    /// Phrase listener
    pub listener: Arc<dyn Listen>,
    /// Spoken output
    pub voice: Arc<dyn Speak>,
    /// Power and session management
    pub power: Arc<dyn PowerControl>,
    /// Output mixer
    pub volume: Arc<dyn VolumeControl>,
    /// Installed application catalog
    pub apps: Arc<dyn AppCatalog>,
    /// Clock helper windows
    pub clock: Arc<dyn ClockDisplay>,
}

/// The wake-word driven command loop
pub struct SessionLoop {
    listener: Arc<dyn Listen>,
    voice: Arc<dyn Speak>,
    power: Arc<dyn PowerControl>,
    volume: Arc<dyn VolumeControl>,
    apps: Arc<dyn AppCatalog>,
    clock: Arc<dyn ClockDisplay>,
    scheduler: Arc<Scheduler>,
    gate: Arc<AudioGate>,
    cancel: CancellationToken,
    state: Mutex<SessionState>,
}

impl SessionLoop {
    /// Wire the loop over its collaborators
    #[must_use]
    pub fn new(
        collaborators: Collaborators,
        scheduler: Arc<Scheduler>,
        gate: Arc<AudioGate>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            listener: collaborators.listener,
            voice: collaborators.voice,
            power: collaborators.power,
            volume: collaborators.volume,
            apps: collaborators.apps,
            clock: collaborators.clock,
            scheduler,
            gate,
            cancel,
            state: Mutex::new(SessionState::WakeListening),
        }
    }

    /// Current loop state
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state.lock().map_or(SessionState::Terminated, |s| *s)
    }

    fn set_state(&self, next: SessionState) {
        if let Ok(mut state) = self.state.lock() {
            tracing::debug!(from = %state, to = %next, "session state change");
            *state = next;
        }
    }

    /// Run until the cancellation signal fires
    ///
    /// On exit every pending alarm is cancelled and drained.
    pub async fn run(&self) {
        self.set_state(SessionState::WakeListening);

        while !self.cancel.is_cancelled() {
            match self.listener.listen_once(WAKE_LISTEN.0, WAKE_LISTEN.1).await {
                Ok(Heard::Utterance(heard)) => {
                    let Some(remainder) = strip_wake_prefix(&heard) else {
                        tracing::debug!(heard = %heard, "no wake phrase, ignoring");
                        continue;
                    };
                    tracing::info!(command = %remainder, "wake phrase detected");
                    if remainder.is_empty() {
                        self.active_session().await;
                    } else if !self.dispatch(&remainder).await {
                        self.active_session().await;
                    }
                    self.set_state(SessionState::WakeListening);
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::error!(error = %e, "wake listen failed");
                    tokio::time::sleep(LISTEN_ERROR_BACKOFF).await;
                }
            }
        }

        self.set_state(SessionState::Terminated);
        self.scheduler.shutdown().await;
        tracing::info!("session loop terminated");
    }

    /// One active command window: a listen, and on a miss one spoken
    /// retry with wider windows
    async fn active_session(&self) {
        if self.cancel.is_cancelled() {
            return;
        }
        self.set_state(SessionState::ActiveCommand);

        let missed = match self
            .listener
            .listen_once(ACTIVE_LISTEN.0, ACTIVE_LISTEN.1)
            .await
        {
            Ok(Heard::Utterance(command)) => !self.dispatch(&command).await,
            Ok(_) => true,
            Err(e) => {
                tracing::error!(error = %e, "active listen failed");
                self.voice
                    .say("Error processing command. Switching back to wake word mode.")
                    .await;
                return;
            }
        };
        if !missed {
            return;
        }

        self.voice
            .say("Command not recognized. Please try again.")
            .await;
        match self
            .listener
            .listen_once(RETRY_LISTEN.0, RETRY_LISTEN.1)
            .await
        {
            Ok(Heard::Utterance(command)) => {
                if !self.dispatch(&command).await {
                    self.voice
                        .say("Command not recognized. Switching back to wake word mode.")
                        .await;
                }
            }
            Ok(_) => {
                self.voice
                    .say("No command received. Switching back to wake word mode.")
                    .await;
            }
            Err(e) => {
                tracing::error!(error = %e, "retry listen failed");
                self.voice
                    .say("Error processing command. Switching back to wake word mode.")
                    .await;
            }
        }
    }

    /// Dispatch one command; `false` means nothing matched
    async fn dispatch(&self, command: &Utterance) -> bool {
        let intent = match_intent(command);
        if intent == Intent::Unrecognized {
            return false;
        }
        tracing::info!(command = %command, intent = ?intent, "dispatching");

        match intent {
            Intent::CloseClockApp => match self.clock.close_all().await {
                Ok(_) => self.voice.say("Clock app closed.").await,
                Err(e) => {
                    tracing::error!(error = %e, "failed to close clock app");
                    self.voice.say("Failed to close clock app.").await;
                }
            },
            Intent::SetTimer(text) => {
                self.scheduler
                    .schedule(&Utterance::new(&text), AlarmKind::Timer)
                    .await;
            }
            Intent::SetAlarm(text) => {
                self.scheduler
                    .schedule(&Utterance::new(&text), AlarmKind::Alarm)
                    .await;
            }
            Intent::OpenClockApp => {
                if let Err(e) = self.clock.launch(ClockLaunch::clock_face()).await {
                    tracing::error!(error = %e, "failed to open clock app");
                    self.voice.say("Failed to open clock app.").await;
                }
            }
            Intent::OpenApp(name) => self.open_app(&name).await,
            Intent::DayQuery => {
                let now = Local::now();
                self.voice
                    .say(&format!("Today is {}.", now.format("%A, %B %d, %Y")))
                    .await;
            }
            Intent::DateQuery => {
                let now = Local::now();
                self.voice
                    .say(&format!(
                        "Today's date is {} and the day is {}.",
                        now.format("%B %d, %Y"),
                        now.format("%A")
                    ))
                    .await;
            }
            Intent::TimeQuery => {
                let now = Local::now();
                self.voice
                    .say(&format!(
                        "The current time is {}.",
                        now.format("%I:%M:%S %p")
                    ))
                    .await;
            }
            Intent::BatteryQuery => self.battery_status().await,
            Intent::VolumeMute => match self.volume.toggle_mute().await {
                Ok(muted) => {
                    self.gate.set_muted(muted);
                    if muted {
                        self.voice.say("Volume muted.").await;
                    } else {
                        self.voice.say("Volume unmuted.").await;
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "mute toggle failed");
                    self.voice.say("Failed to toggle mute.").await;
                }
            },
            Intent::VolumeUp => self.step_volume(true).await,
            Intent::VolumeDown => self.step_volume(false).await,
            Intent::VolumeSet(Some(percent)) => self.set_volume_spoken(percent).await,
            Intent::VolumeSet(None) => self.ask_volume_percent().await,
            Intent::ExitCommand(farewell) => {
                self.voice.say(farewell).await;
                tokio::time::sleep(FAREWELL_PAUSE).await;
                self.cancel.cancel();
            }
            Intent::ShutdownRequest => self.confirmed_power_action("Shutdown").await,
            Intent::RestartRequest => self.confirmed_power_action("Restart").await,
            Intent::SleepRequest => {
                self.voice.say("Putting computer to sleep").await;
                if let Err(e) = self.power.sleep().await {
                    tracing::error!(error = %e, "sleep failed");
                    self.voice.say("Failed to put computer to sleep.").await;
                }
            }
            Intent::LockRequest => {
                self.voice.say("Locking computer").await;
                if let Err(e) = self.power.lock().await {
                    tracing::error!(error = %e, "lock failed");
                    self.voice.say("Failed to lock computer.").await;
                }
            }
            Intent::CustomReply(key) => {
                if let Some(reply) = canned_reply(key) {
                    self.voice.say(reply).await;
                }
            }
            Intent::Unrecognized => return false,
        }
        true
    }

    /// Shutdown/restart detour through the confirmation dialog
    async fn confirmed_power_action(&self, label: &str) {
        self.set_state(SessionState::AwaitingConfirmation);
        let confirmation = confirm_action(&*self.listener, &*self.voice, label).await;
        self.set_state(SessionState::ActiveCommand);

        if confirmation != Confirmation::Confirmed {
            return;
        }

        let result = match label {
            "Shutdown" => self.power.shutdown(POWER_DELAY_SECS).await,
            _ => self.power.restart(POWER_DELAY_SECS).await,
        };
        if let Err(e) = result {
            tracing::error!(action = label, error = %e, "power command failed");
        }
        // The host is going down either way; stop listening.
        self.cancel.cancel();
    }

    async fn open_app(&self, name: &str) {
        if let Some(command) = self.apps.lookup(name) {
            self.launch_app(name, &command).await;
            return;
        }

        self.voice
            .say(&format!("App {name} not found. Please say the app name again."))
            .await;

        match self
            .listener
            .listen_once(FOLLOW_UP_LISTEN.0, FOLLOW_UP_LISTEN.1)
            .await
        {
            Ok(Heard::Utterance(reply)) => {
                let retry = reply
                    .as_str()
                    .strip_prefix("OPEN ")
                    .unwrap_or(reply.as_str())
                    .trim()
                    .to_string();
                match self.apps.lookup(&retry) {
                    Some(command) => self.launch_app(&retry, &command).await,
                    None => self.voice.say(&format!("App {retry} not found.")).await,
                }
            }
            Ok(_) => {
                self.voice.say("Failed to receive valid app input.").await;
            }
            Err(e) => {
                tracing::error!(error = %e, "app follow-up listen failed");
                self.voice.say("Failed to receive valid app input.").await;
            }
        }
    }

    async fn launch_app(&self, name: &str, command: &str) {
        match self.apps.launch(command).await {
            Ok(()) => self.voice.say(&format!("Opening {name}.")).await,
            Err(e) => {
                tracing::error!(app = name, error = %e, "app launch failed");
                self.voice.say(&format!("Failed to open {name}.")).await;
            }
        }
    }

    async fn step_volume(&self, up: bool) {
        let current = match self.volume.volume().await {
            Ok(v) => v,
            Err(e) => {
                tracing::error!(error = %e, "volume query failed");
                self.voice.say("Failed to retrieve volume.").await;
                return;
            }
        };
        let target = if up {
            current.saturating_add(VOLUME_STEP).min(100)
        } else {
            current.saturating_sub(VOLUME_STEP)
        };
        self.set_volume_spoken(target).await;
    }

    async fn set_volume_spoken(&self, percent: u8) {
        let percent = percent.min(100);
        match self.volume.set_volume(percent).await {
            Ok(()) => {
                self.voice
                    .say(&format!("Volume set to {percent} percent."))
                    .await;
            }
            Err(e) => {
                tracing::error!(error = %e, "volume set failed");
                self.voice.say("Failed to set volume.").await;
            }
        }
    }

    /// One follow-up listen for the missing percentage
    async fn ask_volume_percent(&self) {
        self.voice.say("Please specify volume percentage").await;
        match self
            .listener
            .listen_once(VOLUME_LISTEN.0, VOLUME_LISTEN.1)
            .await
        {
            Ok(Heard::Utterance(reply)) => {
                match crate::intent::extract_percent(reply.as_str()) {
                    Some(percent) => self.set_volume_spoken(percent).await,
                    None => {
                        self.voice
                            .say("No volume percentage provided. Command cancelled.")
                            .await;
                    }
                }
            }
            Ok(_) => {
                self.voice
                    .say("No volume percentage provided. Command cancelled.")
                    .await;
            }
            Err(e) => {
                tracing::error!(error = %e, "volume follow-up listen failed");
                self.voice
                    .say("No volume percentage provided. Command cancelled.")
                    .await;
            }
        }
    }

    async fn battery_status(&self) {
        match self.power.battery().await {
            Ok(Some(reading)) => self.voice.say(&battery_message(reading)).await,
            Ok(None) => {
                self.voice.say("Battery information is not available.").await;
            }
            Err(e) => {
                tracing::error!(error = %e, "battery query failed");
                self.voice.say("Battery information is not available.").await;
            }
        }
    }
}

fn battery_message(reading: BatteryReading) -> String {
    let mut message = format!("Battery level is {}%.", reading.percent);
    if reading.plugged {
        message.push_str(" The laptop is plugged in.");
    } else if reading.percent <= 30 {
        message.push_str(" Charge the laptop before discharge.");
    }
    message
}

/// Interval between unsolicited low-battery checks
const ADVISORY_INTERVAL: Duration = Duration::from_secs(300);

/// Low-battery advisory task
///
/// Speaks a warning at most once per interval while the battery is
/// at or below 30% on battery power. Runs until cancelled.
pub async fn battery_advisory(
    power: Arc<dyn PowerControl>,
    voice: Arc<dyn Speak>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            () = cancel.cancelled() => return,
            () = tokio::time::sleep(ADVISORY_INTERVAL) => {}
        }
        match power.battery().await {
            Ok(Some(reading)) if !reading.plugged && reading.percent <= 30 => {
                voice
                    .say(&format!(
                        "Battery level is {}%. Charge the laptop before discharge.",
                        reading.percent
                    ))
                    .await;
            }
            Ok(_) => {}
            Err(e) => tracing::debug!(error = %e, "battery advisory check failed"),
        }
    }
}
