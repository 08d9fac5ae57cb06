//! Shared test doubles for session and scheduler tests

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use lucifer_agent::Result;
use lucifer_agent::actions::{
    AppCatalog, BatteryReading, ClockDisplay, ClockLaunch, PowerControl, VolumeControl,
};
use lucifer_agent::speech::{Heard, Listen, Speak, Utterance};

/// Listener that replays a fixed script of hearings
///
/// When the script runs out it fires the cancellation token so the
/// session loop winds down instead of listening forever.
pub struct ScriptedListener {
    script: Mutex<VecDeque<Heard>>,
    cancel: CancellationToken,
}

impl ScriptedListener {
    pub fn new(lines: &[&str], cancel: CancellationToken) -> Self {
        let script = lines
            .iter()
            .map(|line| Heard::Utterance(Utterance::new(line)))
            .collect();
        Self {
            script: Mutex::new(script),
            cancel,
        }
    }

    pub fn from_hearings(hearings: Vec<Heard>, cancel: CancellationToken) -> Self {
        Self {
            script: Mutex::new(hearings.into()),
            cancel,
        }
    }
}

#[async_trait]
impl Listen for ScriptedListener {
    async fn listen_once(&self, _timeout: Duration, _phrase_limit: Duration) -> Result<Heard> {
        let next = self.script.lock().unwrap().pop_front();
        next.map_or_else(
            || {
                self.cancel.cancel();
                Ok(Heard::Silence)
            },
            Ok,
        )
    }
}

/// Speaker that records every line instead of voicing it
#[derive(Default)]
pub struct RecordingSpeaker {
    lines: Mutex<Vec<String>>,
}

impl RecordingSpeaker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }

    pub fn said_containing(&self, needle: &str) -> bool {
        self.lines().iter().any(|line| line.contains(needle))
    }
}

#[async_trait]
impl Speak for RecordingSpeaker {
    async fn say(&self, text: &str) {
        self.lines.lock().unwrap().push(text.to_string());
    }
}

/// Power executor that counts invocations
#[derive(Default)]
pub struct MockPower {
    pub locks: AtomicUsize,
    pub sleeps: AtomicUsize,
    pub shutdowns: AtomicUsize,
    pub restarts: AtomicUsize,
    pub battery: Option<BatteryReading>,
}

impl MockPower {
    pub fn with_battery(percent: u8, plugged: bool) -> Self {
        Self {
            battery: Some(BatteryReading { percent, plugged }),
            ..Self::default()
        }
    }
}

#[async_trait]
impl PowerControl for MockPower {
    async fn lock(&self) -> Result<()> {
        self.locks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn sleep(&self) -> Result<()> {
        self.sleeps.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn shutdown(&self, _delay_secs: u64) -> Result<()> {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn restart(&self, _delay_secs: u64) -> Result<()> {
        self.restarts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn battery(&self) -> Result<Option<BatteryReading>> {
        Ok(self.battery)
    }
}

/// Mixer double holding a level in memory
pub struct MockVolume {
    level: Mutex<u8>,
    muted: AtomicBool,
}

impl Default for MockVolume {
    fn default() -> Self {
        Self {
            level: Mutex::new(50),
            muted: AtomicBool::new(false),
        }
    }
}

impl MockVolume {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(&self) -> u8 {
        *self.level.lock().unwrap()
    }

    pub fn muted(&self) -> bool {
        self.muted.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VolumeControl for MockVolume {
    async fn volume(&self) -> Result<u8> {
        Ok(self.level())
    }

    async fn set_volume(&self, percent: u8) -> Result<()> {
        *self.level.lock().unwrap() = percent.min(100);
        Ok(())
    }

    async fn toggle_mute(&self) -> Result<bool> {
        Ok(self.muted.fetch_xor(true, Ordering::SeqCst) ^ true)
    }
}

/// App catalog over a fixed table, recording launches
pub struct MockApps {
    table: HashMap<String, String>,
    launched: Mutex<Vec<String>>,
}

impl MockApps {
    pub fn with_apps(pairs: &[(&str, &str)]) -> Self {
        let table = pairs
            .iter()
            .map(|(name, cmd)| (name.to_lowercase(), (*cmd).to_string()))
            .collect();
        Self {
            table,
            launched: Mutex::new(Vec::new()),
        }
    }

    pub fn launched(&self) -> Vec<String> {
        self.launched.lock().unwrap().clone()
    }
}

#[async_trait]
impl AppCatalog for MockApps {
    fn lookup(&self, name: &str) -> Option<String> {
        self.table.get(&name.trim().to_lowercase()).cloned()
    }

    async fn launch(&self, command: &str) -> Result<()> {
        self.launched.lock().unwrap().push(command.to_string());
        Ok(())
    }
}

/// Clock display double recording launches and closes
#[derive(Default)]
pub struct MockClock {
    launches: Mutex<Vec<ClockLaunch>>,
    closes: AtomicUsize,
}

impl MockClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn launches(&self) -> Vec<ClockLaunch> {
        self.launches.lock().unwrap().clone()
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClockDisplay for MockClock {
    async fn launch(&self, params: ClockLaunch) -> Result<()> {
        self.launches.lock().unwrap().push(params);
        Ok(())
    }

    async fn close_all(&self) -> Result<usize> {
        let count = self.launches.lock().unwrap().len();
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(count)
    }
}
