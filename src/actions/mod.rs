//! System action executors
//!
//! Every side effect the agent can perform on the host sits behind a
//! trait here, so the session loop and scheduler stay testable
//! without touching real power, mixer, or process state.

use async_trait::async_trait;

use crate::Result;

mod apps;
mod clock;
mod power;
mod volume;

pub use apps::SystemAppCatalog;
pub use clock::SystemClockDisplay;
pub use power::SystemPower;
pub use volume::SystemVolume;

/// Battery charge snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatteryReading {
    /// Charge percentage, 0 to 100
    pub percent: u8,
    /// Whether external power is connected
    pub plugged: bool,
}

/// Power and session management
#[async_trait]
pub trait PowerControl: Send + Sync {
    /// Lock the interactive session
    ///
    /// # Errors
    ///
    /// Returns error if the platform lock command fails
    async fn lock(&self) -> Result<()>;

    /// Suspend the machine
    ///
    /// # Errors
    ///
    /// Returns error if the platform suspend command fails
    async fn sleep(&self) -> Result<()>;

    /// Power off after `delay_secs`
    ///
    /// # Errors
    ///
    /// Returns error if the shutdown command cannot be issued
    async fn shutdown(&self, delay_secs: u64) -> Result<()>;

    /// Reboot after `delay_secs`
    ///
    /// # Errors
    ///
    /// Returns error if the restart command cannot be issued
    async fn restart(&self, delay_secs: u64) -> Result<()>;

    /// Current battery state, `None` when the host has no battery
    ///
    /// # Errors
    ///
    /// Returns error if battery state cannot be read
    async fn battery(&self) -> Result<Option<BatteryReading>>;
}

/// Output mixer control
///
/// Percentages are clamped to 0 through 100 by every implementation.
#[async_trait]
pub trait VolumeControl: Send + Sync {
    /// Current output volume percentage
    ///
    /// # Errors
    ///
    /// Returns error if the mixer cannot be queried
    async fn volume(&self) -> Result<u8>;

    /// Set the output volume percentage
    ///
    /// # Errors
    ///
    /// Returns error if the mixer rejects the change
    async fn set_volume(&self, percent: u8) -> Result<()>;

    /// Toggle output mute, returning the new muted state
    ///
    /// # Errors
    ///
    /// Returns error if the mixer cannot be toggled
    async fn toggle_mute(&self) -> Result<bool>;
}

/// Installed application lookup and launch
#[async_trait]
pub trait AppCatalog: Send + Sync {
    /// Resolve a spoken app name to a launch command
    fn lookup(&self, name: &str) -> Option<String>;

    /// Launch a previously resolved command
    ///
    /// # Errors
    ///
    /// Returns error if the process cannot be spawned
    async fn launch(&self, command: &str) -> Result<()>;
}

/// Clock helper display mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockMode {
    /// Plain clock face
    Clock,
    /// Countdown display
    Timer,
    /// Alarm display
    Alarm,
}

impl ClockMode {
    /// Query-string value for the helper page
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Clock => "clock",
            Self::Timer => "timer",
            Self::Alarm => "alarm",
        }
    }
}

/// Parameters for one clock helper window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClockLaunch {
    /// Display mode
    pub mode: ClockMode,
    /// Countdown length, for timer mode
    pub duration_secs: Option<u64>,
    /// Ring time as a spoken-format string, for timer and alarm modes
    pub target_time: Option<String>,
}

impl ClockLaunch {
    /// A plain clock-face launch
    #[must_use]
    pub const fn clock_face() -> Self {
        Self {
            mode: ClockMode::Clock,
            duration_secs: None,
            target_time: None,
        }
    }
}

/// Visual clock helper windows
#[async_trait]
pub trait ClockDisplay: Send + Sync {
    /// Open a helper window and track its process
    ///
    /// # Errors
    ///
    /// Returns error if the helper cannot be launched
    async fn launch(&self, params: ClockLaunch) -> Result<()>;

    /// Close every tracked helper window, returning how many were
    /// closed
    ///
    /// # Errors
    ///
    /// Returns error if termination signalling fails outright
    async fn close_all(&self) -> Result<usize>;
}
