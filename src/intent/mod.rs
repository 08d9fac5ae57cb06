//! Command grammar
//!
//! Wake phrase detection plus the ordered matcher that turns a
//! normalized [`Utterance`] into a typed [`Intent`].

use std::sync::LazyLock;

use regex::Regex;

use crate::speech::Utterance;

mod matcher;

pub use matcher::{canned_reply, exit_farewell, extract_percent, match_intent};

/// Wake phrases, longest variants first so prefix matching never
/// stops at a shorter alternative
pub const WAKE_PHRASES: &[&str] = &["HELLO LUCIFER", "HEY LUCIFER", "HEY LUCY", "LUCIFER", "LUCY"];

static WAKE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    let alternatives = WAKE_PHRASES
        .iter()
        .map(|w| regex::escape(w))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"^(?:{alternatives})\b")).expect("wake pattern is valid")
});

/// Strip a leading wake phrase, returning the command remainder
///
/// Returns `None` when the utterance does not begin with a wake
/// phrase; a wake phrase anywhere else in the text does not count.
#[must_use]
pub fn strip_wake_prefix(utterance: &Utterance) -> Option<Utterance> {
    WAKE_PATTERN
        .find(utterance.as_str())
        .map(|m| Utterance::new(&utterance.as_str()[m.end()..]))
}

/// A recognized command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Terminate the agent, voicing the matched farewell
    ExitCommand(&'static str),
    /// Power off the machine (requires confirmation)
    ShutdownRequest,
    /// Reboot the machine (requires confirmation)
    RestartRequest,
    /// Suspend the machine
    SleepRequest,
    /// Lock the session
    LockRequest,
    /// Step the output volume up
    VolumeUp,
    /// Step the output volume down
    VolumeDown,
    /// Set volume to a percentage; `None` means the percentage was
    /// not spoken and must be asked for
    VolumeSet(Option<u8>),
    /// Toggle system mute
    VolumeMute,
    /// Report battery charge
    BatteryQuery,
    /// Speak the current time
    TimeQuery,
    /// Speak the current weekday
    DayQuery,
    /// Speak the current date
    DateQuery,
    /// Launch a named application
    OpenApp(String),
    /// Launch the clock helper in plain clock mode
    OpenClockApp,
    /// Close all tracked clock helper windows
    CloseClockApp,
    /// Schedule a countdown timer; carries the full request text
    SetTimer(String),
    /// Schedule an absolute-time alarm; carries the full request text
    SetAlarm(String),
    /// Canned conversational reply, keyed by the matched phrase
    CustomReply(&'static str),
    /// Nothing matched
    Unrecognized,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wake_prefix_is_stripped() {
        let stripped = strip_wake_prefix(&Utterance::new("LUCIFER OPEN NOTEPAD")).unwrap();
        assert_eq!(stripped.as_str(), "OPEN NOTEPAD");
    }

    #[test]
    fn longest_wake_phrase_wins() {
        let stripped = strip_wake_prefix(&Utterance::new("HEY LUCY WHAT TIME IS IT")).unwrap();
        assert_eq!(stripped.as_str(), "WHAT TIME IS IT");
    }

    #[test]
    fn bare_wake_phrase_leaves_empty_remainder() {
        let stripped = strip_wake_prefix(&Utterance::new("HEY LUCIFER")).unwrap();
        assert!(stripped.is_empty());
    }

    #[test]
    fn wake_phrase_mid_sentence_does_not_count() {
        assert!(strip_wake_prefix(&Utterance::new("OPEN NOTEPAD LUCIFER")).is_none());
        assert!(strip_wake_prefix(&Utterance::new("TELL LUCY THE TIME")).is_none());
    }

    #[test]
    fn wake_phrase_requires_word_boundary() {
        // LUCIFERS is not a wake phrase.
        assert!(strip_wake_prefix(&Utterance::new("LUCIFERS OPEN NOTEPAD")).is_none());
        // LUCY matches even though LUCIFER shares a prefix.
        assert!(strip_wake_prefix(&Utterance::new("LUCY EXIT")).is_some());
    }
}
