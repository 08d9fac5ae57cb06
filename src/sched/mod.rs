//! Timers and alarms
//!
//! Spoken requests are parsed into a [`TimeSpec`], then armed as
//! detached tasks. Every armed alarm is tracked in a registry with
//! its own cancellation token, so shutdown can drain the lot instead
//! of leaving orphaned ring tasks behind.

use std::sync::{Arc, LazyLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Local, TimeDelta, Timelike};
use regex::Regex;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::actions::{ClockDisplay, ClockLaunch, ClockMode};
use crate::speech::{Heard, Listen, Speak, Utterance};

/// Listen window for the one clarification follow-up
const FOLLOW_UP_TIMEOUT: Duration = Duration::from_secs(6);
const FOLLOW_UP_PHRASE_LIMIT: Duration = Duration::from_secs(6);

static DURATION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+)\s*(HOURS?|MINUTES?|SECONDS?)").expect("duration pattern is valid")
});

static CLOCK_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2})(?::(\d{2}))?\s*(AM|PM)?\b").expect("clock pattern is valid")
});

/// What kind of ring was requested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmKind {
    /// Countdown timer
    Timer,
    /// Absolute-time alarm
    Alarm,
}

impl AlarmKind {
    /// Spoken label, capitalized for sentence starts
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Timer => "Timer",
            Self::Alarm => "Alarm",
        }
    }

    /// Clock helper mode for this kind
    #[must_use]
    pub const fn mode(self) -> ClockMode {
        match self {
            Self::Timer => ClockMode::Timer,
            Self::Alarm => ClockMode::Alarm,
        }
    }
}

/// A parsed ring request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeSpec {
    /// Ring after an elapsed duration
    After(Duration),
    /// Ring at an absolute local time
    At(DateTime<Local>),
}

impl TimeSpec {
    /// The absolute ring instant for this request
    #[must_use]
    pub fn ring_at(&self, now: DateTime<Local>) -> DateTime<Local> {
        match self {
            Self::After(d) => now + TimeDelta::from_std(*d).unwrap_or(TimeDelta::zero()),
            Self::At(t) => *t,
        }
    }

    /// Spoken description of what was scheduled
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Self::After(d) => describe_duration(*d),
            Self::At(t) => t.format("%I:%M %p").to_string(),
        }
    }
}

/// Sum every `<number> <unit>` pair in the text
///
/// `None` when no units are present or the total is zero, so
/// "0 SECONDS" is rejected rather than armed as an immediate ring.
#[must_use]
pub fn parse_duration(text: &str) -> Option<Duration> {
    let mut total_seconds: u64 = 0;
    for caps in DURATION_PATTERN.captures_iter(text) {
        let value: u64 = caps.get(1)?.as_str().parse().ok()?;
        let unit = caps.get(2)?.as_str();
        let scale = if unit.starts_with("HOUR") {
            3600
        } else if unit.starts_with("MINUTE") {
            60
        } else {
            1
        };
        total_seconds += value * scale;
    }
    (total_seconds > 0).then(|| Duration::from_secs(total_seconds))
}

/// Parse an absolute clock time relative to `now`
///
/// Hours above 23 or minutes above 59 reject the whole request. A
/// time already past today rolls forward: with an AM/PM marker it
/// moves to tomorrow; without one, an hour of 12 or less is first
/// retried 12 hours later before falling back to tomorrow.
#[must_use]
pub fn parse_clock_time(text: &str, now: DateTime<Local>) -> Option<DateTime<Local>> {
    let caps = CLOCK_PATTERN.captures(text)?;
    let mut hour: u32 = caps.get(1)?.as_str().parse().ok()?;
    let minute: u32 = caps
        .get(2)
        .map_or(Ok(0), |m| m.as_str().parse())
        .ok()?;
    if hour > 23 || minute > 59 {
        return None;
    }

    let meridiem = caps.get(3).map(|m| m.as_str());
    if let Some(meridiem) = meridiem {
        if meridiem == "PM" && hour != 12 {
            hour += 12;
        }
        if meridiem == "AM" && hour == 12 {
            hour = 0;
        }
        if hour > 23 {
            return None;
        }
        let candidate = now
            .with_hour(hour)?
            .with_minute(minute)?
            .with_second(0)?
            .with_nanosecond(0)?;
        if candidate <= now {
            Some(candidate + TimeDelta::days(1))
        } else {
            Some(candidate)
        }
    } else {
        let candidate = now
            .with_hour(hour)?
            .with_minute(minute)?
            .with_second(0)?
            .with_nanosecond(0)?;
        if candidate <= now {
            if hour <= 12 {
                let later = candidate + TimeDelta::hours(12);
                if later > now {
                    return Some(later);
                }
            }
            Some(candidate + TimeDelta::days(1))
        } else {
            Some(candidate)
        }
    }
}

/// Parse a request into a ring time, preferring a duration reading
#[must_use]
pub fn parse_time_spec(text: &str, now: DateTime<Local>) -> Option<TimeSpec> {
    if let Some(duration) = parse_duration(text) {
        return Some(TimeSpec::After(duration));
    }
    parse_clock_time(text, now).map(TimeSpec::At)
}

/// Human phrasing for an elapsed duration
#[must_use]
pub fn describe_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    let mut parts = Vec::new();
    for (value, unit) in [(hours, "hour"), (minutes, "minute"), (seconds, "second")] {
        if value == 1 {
            parts.push(format!("1 {unit}"));
        } else if value > 1 {
            parts.push(format!("{value} {unit}s"));
        }
    }
    if parts.is_empty() {
        "0 seconds".to_string()
    } else {
        parts.join(" ")
    }
}

struct PendingAlarm {
    id: u64,
    kind: AlarmKind,
    ring_at: DateTime<Local>,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Registry of armed timers and alarms
pub struct Scheduler {
    clock: Arc<dyn ClockDisplay>,
    voice: Arc<dyn Speak>,
    listener: Arc<dyn Listen>,
    pending: Mutex<Vec<PendingAlarm>>,
    next_id: AtomicU64,
}

impl Scheduler {
    /// Create a scheduler over the shared clock helper and voice
    #[must_use]
    pub fn new(
        clock: Arc<dyn ClockDisplay>,
        voice: Arc<dyn Speak>,
        listener: Arc<dyn Listen>,
    ) -> Self {
        Self {
            clock,
            voice,
            listener,
            pending: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Handle a spoken timer or alarm request end to end
    ///
    /// Parses the request, asking one clarification follow-up if the
    /// first phrasing carried no duration or time, then arms the ring
    /// as a detached task. The caller is never blocked on the ring
    /// itself.
    pub async fn schedule(self: &Arc<Self>, request: &Utterance, kind: AlarmKind) {
        let label = kind.label();
        let now = Local::now();

        if let Some(spec) = parse_time_spec(request.as_str(), now) {
            self.arm(spec, kind, now).await;
            return;
        }

        self.voice
            .say(&format!(
                "{label} command not recognized. Please specify a duration or a time."
            ))
            .await;

        match self
            .listener
            .listen_once(FOLLOW_UP_TIMEOUT, FOLLOW_UP_PHRASE_LIMIT)
            .await
        {
            Ok(Heard::Utterance(extra)) => {
                let now = Local::now();
                if let Some(spec) = parse_time_spec(extra.as_str(), now) {
                    self.arm(spec, kind, now).await;
                } else {
                    self.voice
                        .say(&format!(
                            "{label} command cancelled. Switching back to wake word mode."
                        ))
                        .await;
                }
            }
            Ok(_) => {
                self.voice
                    .say(&format!(
                        "{label} command cancelled. Switching back to wake word mode."
                    ))
                    .await;
            }
            Err(e) => {
                tracing::error!(error = %e, kind = label, "follow-up listen failed");
                self.voice
                    .say(&format!(
                        "Error processing {} command. Switching back to wake word mode.",
                        label.to_lowercase()
                    ))
                    .await;
            }
        }
    }

    async fn arm(self: &Arc<Self>, spec: TimeSpec, kind: AlarmKind, now: DateTime<Local>) {
        let label = kind.label();
        let ring_at = spec.ring_at(now);
        let ring_str = ring_at.format("%I:%M %p").to_string();
        let description = spec.description();

        let confirmation = match &spec {
            TimeSpec::After(_) => {
                format!("{label} set for {description} and it will ring at {ring_str}.")
            }
            TimeSpec::At(_) => format!("{label} set to ring at {ring_str}."),
        };

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let cancel = CancellationToken::new();
        let wait = (ring_at - now).to_std().unwrap_or(Duration::ZERO);

        tracing::info!(
            id,
            kind = label,
            ring_at = %ring_at,
            wait_secs = wait.as_secs(),
            "alarm armed"
        );

        let task = {
            let scheduler = Arc::clone(self);
            let token = cancel.clone();
            let spec = spec.clone();
            tokio::spawn(async move {
                tokio::select! {
                    () = token.cancelled() => {
                        tracing::debug!(id, "alarm cancelled before ring");
                        return;
                    }
                    () = tokio::time::sleep(wait) => {}
                }

                let launch = ClockLaunch {
                    mode: kind.mode(),
                    duration_secs: match spec {
                        TimeSpec::After(d) => Some(d.as_secs()),
                        TimeSpec::At(_) => None,
                    },
                    target_time: Some(ring_at.format("%I:%M:%S %p").to_string()),
                };

                let completion = match scheduler.clock.launch(launch).await {
                    Ok(()) => match spec {
                        TimeSpec::After(_) => {
                            format!("{label} for {description} is ringing now.")
                        }
                        TimeSpec::At(_) => {
                            format!("{label} set for {ring_str} is ringing now.")
                        }
                    },
                    Err(e) => {
                        tracing::error!(id, error = %e, "clock helper launch failed at ring");
                        format!("Failed to ring {}.", label.to_lowercase())
                    }
                };
                scheduler.voice.say(&completion).await;
                scheduler.remove(id).await;
            })
        };

        self.pending.lock().await.push(PendingAlarm {
            id,
            kind,
            ring_at,
            cancel,
            handle: task,
        });

        self.voice.say(&confirmation).await;
    }

    async fn remove(&self, id: u64) {
        self.pending.lock().await.retain(|alarm| alarm.id != id);
    }

    /// Number of armed, not-yet-rung alarms
    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }

    /// Cancel every armed alarm and wait for its task to finish
    pub async fn shutdown(&self) {
        let drained: Vec<PendingAlarm> = std::mem::take(&mut *self.pending.lock().await);
        for alarm in &drained {
            tracing::info!(
                id = alarm.id,
                kind = alarm.kind.label(),
                ring_at = %alarm.ring_at,
                "cancelling pending alarm"
            );
            alarm.cancel.cancel();
        }
        for alarm in drained {
            if let Err(e) = alarm.handle.await {
                if !e.is_cancelled() {
                    tracing::warn!(error = %e, "alarm task join failed");
                }
            }
        }
    }
}
