//! Ordered intent matching
//!
//! Rules are evaluated top to bottom and the first hit wins, so more
//! specific phrasings ("SET VOLUME 45", "CLOSE CLOCK APP") are
//! checked before the broad keyword rules ("VOLUME", "TIME") that
//! would otherwise swallow them.

use std::sync::LazyLock;

use regex::Regex;

use crate::intent::Intent;
use crate::speech::Utterance;

const EXIT_PHRASES: &[(&str, &str)] = &[
    ("LUCIFER EXIT", "Exiting program"),
    ("LUCY EXIT", "Exiting program"),
    ("EXIT PROGRAM", "Exiting program"),
    ("GOOD BYE LUCIFER", "Goodbye sir"),
    ("GOOD BYE LUCY", "Goodbye sir"),
    ("BYE BYE LUCIFER", "Goodbye sir"),
    ("BYE LUCIFER", "Goodbye sir"),
    ("BYE LUCY", "Goodbye sir"),
    ("EXIT THE PROGRAM", "Exiting program"),
    ("GOODBYE LUCIFER", "Goodbye sir"),
];

const SHUTDOWN_PHRASES: &[&str] = &[
    "SHUTDOWN COMPUTER",
    "SHUTDOWN THE COMPUTER",
    "SHUTDOWN LAPTOP",
    "SHUTDOWN THE LAPTOP",
    "SHUTDOWN THE PC",
    "SHUT DOWN COMPUTER",
    "SHUT DOWN THE COMPUTER",
    "SHUT DOWN LAPTOP",
    "SHUT DOWN THE LAPTOP",
    "SHUT DOWN THE PC",
    "POWER OFF COMPUTER",
    "POWER OFF THE COMPUTER",
    "POWER OFF LAPTOP",
    "POWER OFF THE LAPTOP",
    "POWER OFF THE PC",
    "TURN OFF COMPUTER",
    "TURN OFF THE COMPUTER",
    "TURN OFF LAPTOP",
    "TURN OFF THE LAPTOP",
    "TURN OFF THE PC",
    "TURN OFF THE SYSTEM",
    "TURN OFF PC",
];

const RESTART_PHRASES: &[&str] = &[
    "RESTART COMPUTER",
    "RESTART LAPTOP",
    "RESTART PC",
    "RESTART THE COMPUTER",
    "RESTART THE LAPTOP",
    "RESTART THE PC",
];

const SLEEP_PHRASES: &[&str] = &[
    "SLEEP COMPUTER",
    "SLEEP LAPTOP",
    "SLEEP PC",
    "SLEEP THE COMPUTER",
    "SLEEP THE LAPTOP",
    "SLEEP THE PC",
    "PUT COMPUTER TO SLEEP",
    "PUT THE LAPTOP TO SLEEP",
    "PUT THE PC TO SLEEP",
    "SLEEP MODE",
];

const LOCK_PHRASES: &[&str] = &[
    "LOCK COMPUTER",
    "LOCK LAPTOP",
    "LOCK PC",
    "LOCK THE COMPUTER",
    "LOCK THE LAPTOP",
    "LOCK THE PC",
    "INITIATE LOCK",
    "SYSTEM LOCK",
];

const MUTE_PHRASES: &[&str] = &[
    "MUTE",
    "SHUT UP",
    "SHUTUP",
    "STOP THAT",
    "UNMUTE",
    "TURN ON SOUND",
    "MUTE SOUND",
    "MUTE SOUNDS",
    "MUTE THE MUSIC",
    "MUTE THE AUDIO",
    "MUTE THE NOISE",
    "MUTE THE SOUNDS",
    "MUTE AUDIO",
    "MUTE NOISE",
];

const DAY_ONLY_PHRASES: &[&str] = &["TELL ONLY THE DAY", "DAY ONLY", "ONLY DAY"];

const DATE_ONLY_PHRASES: &[&str] = &["TELL ONLY THE DATE", "DATE ONLY", "ONLY DATE"];

const DAY_PHRASES: &[&str] = &[
    "WHAT'S TODAY'S DAY",
    "WHAT IS TODAY'S DAY",
    "WHAT'S THE DAY TODAY",
    "WHAT'S THE DAY",
    "WHAT DAY IS TODAY",
    "TELL THE DAY",
    "DAY",
];

const DATE_PHRASES: &[&str] = &[
    "WHAT'S TODAY'S DATE",
    "WHAT IS TODAY'S DATE",
    "WHAT'S THE DATE",
    "WHAT DATE IS TODAY",
    "TELL THE DATE",
    "DATE",
];

const CANNED_REPLIES: &[(&str, &str)] = &[
    ("HELLO", "Hello sir, how can I assist you?"),
    ("HOW ARE YOU", "I am fully operational, thank you sir."),
    ("HOW R U", "I am fully operational, thank you sir."),
    ("HOW R YOU", "I am fully operational, thank you sir."),
    (
        "WHAT CAN YOU DO",
        "I can lock your computer, put it to sleep, shutdown after confirmation, \
         restart upon confirmation, tell you the time, provide battery status, \
         control volume, and manage alarms and timers via the clock app.",
    ),
];

static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)").expect("number pattern is valid"));

type RuleFn = fn(&str) -> Option<Intent>;

/// One precedence step: a named predicate over the canonical text
struct Rule {
    name: &'static str,
    apply: RuleFn,
}

const RULES: &[Rule] = &[
    Rule {
        name: "close-clock-app",
        apply: close_clock_app,
    },
    Rule {
        name: "timer-alarm",
        apply: timer_alarm,
    },
    Rule {
        name: "open-app",
        apply: open_app,
    },
    Rule {
        name: "day-date",
        apply: day_date,
    },
    Rule {
        name: "mute-toggle",
        apply: mute_toggle,
    },
    Rule {
        name: "volume-step",
        apply: volume_step,
    },
    Rule {
        name: "volume-max",
        apply: volume_max,
    },
    Rule {
        name: "volume-set",
        apply: volume_set,
    },
    Rule { name: "exit", apply: exit },
    Rule { name: "power", apply: power },
    Rule {
        name: "battery-time",
        apply: battery_time,
    },
    Rule {
        name: "canned-reply",
        apply: canned,
    },
];

/// Match a command against the precedence-ordered rule list
#[must_use]
pub fn match_intent(utterance: &Utterance) -> Intent {
    let text = utterance.as_str();
    for rule in RULES {
        if let Some(intent) = (rule.apply)(text) {
            tracing::debug!(rule = rule.name, intent = ?intent, "command matched");
            return intent;
        }
    }
    Intent::Unrecognized
}

/// Farewell line for a matched exit phrase
#[must_use]
pub fn exit_farewell(utterance: &Utterance) -> &'static str {
    EXIT_PHRASES
        .iter()
        .find(|(phrase, _)| utterance.contains(phrase))
        .map_or("Exiting program", |(_, reply)| reply)
}

/// Reply text for a canned conversational key
#[must_use]
pub fn canned_reply(key: &str) -> Option<&'static str> {
    CANNED_REPLIES
        .iter()
        .find(|(phrase, _)| *phrase == key)
        .map(|(_, reply)| *reply)
}

fn contains_any(text: &str, phrases: &[&str]) -> bool {
    phrases.iter().any(|p| text.contains(p))
}

fn close_clock_app(text: &str) -> Option<Intent> {
    text.contains("CLOSE CLOCK APP").then_some(Intent::CloseClockApp)
}

fn timer_alarm(text: &str) -> Option<Intent> {
    if text.contains("TIMER") {
        Some(Intent::SetTimer(text.to_string()))
    } else if text.contains("ALARM") {
        Some(Intent::SetAlarm(text.to_string()))
    } else {
        None
    }
}

fn open_app(text: &str) -> Option<Intent> {
    let target = text.strip_prefix("OPEN ")?.trim();
    if target.starts_with("CLOCK APP") {
        return Some(Intent::OpenClockApp);
    }
    let name = target.strip_suffix(" AGAIN").unwrap_or(target).trim();
    Some(Intent::OpenApp(name.to_string()))
}

fn day_date(text: &str) -> Option<Intent> {
    // Specific-date phrasings are checked before the bare DAY keyword,
    // which would otherwise fire on any sentence containing TODAY.
    if contains_any(text, DAY_ONLY_PHRASES) {
        Some(Intent::DayQuery)
    } else if contains_any(text, DATE_ONLY_PHRASES) || contains_any(text, DATE_PHRASES) {
        Some(Intent::DateQuery)
    } else if contains_any(text, DAY_PHRASES) {
        Some(Intent::DayQuery)
    } else {
        None
    }
}

fn mute_toggle(text: &str) -> Option<Intent> {
    contains_any(text, MUTE_PHRASES).then_some(Intent::VolumeMute)
}

fn volume_step(text: &str) -> Option<Intent> {
    let has_volume = text.contains("VOLUME");
    if text.contains("VOLUME UP")
        || text.contains("INCREASE VOLUME")
        || (has_volume && text.contains("TURN UP"))
        || (has_volume && text.contains("RAISE"))
    {
        Some(Intent::VolumeUp)
    } else if text.contains("VOLUME DOWN")
        || text.contains("DECREASE VOLUME")
        || (has_volume && text.contains("TURN DOWN"))
        || (has_volume && text.contains("LOWER"))
    {
        Some(Intent::VolumeDown)
    } else {
        None
    }
}

fn volume_max(text: &str) -> Option<Intent> {
    let explicit = text.contains("MAX VOLUME")
        || text.contains("FULL VOLUME")
        || text.contains("MAXIMUM VOLUME");
    let set_max = text.starts_with("SET VOLUME")
        && (text.contains("MAX") || text.contains("FULL") || text.contains("MAXIMUM"));
    (explicit || set_max).then_some(Intent::VolumeSet(Some(100)))
}

fn volume_set(text: &str) -> Option<Intent> {
    let requested = text.contains("SET VOLUME")
        || text.contains("VOLUME SET")
        || text.contains("PUT VOLUME ")
        || (text.contains("VOLUME") && text.contains("SET"));
    if !requested {
        return None;
    }
    Some(Intent::VolumeSet(extract_percent(text)))
}

fn exit(text: &str) -> Option<Intent> {
    EXIT_PHRASES
        .iter()
        .find(|(phrase, _)| text.contains(phrase))
        .map(|(_, reply)| Intent::ExitCommand(reply))
}

fn power(text: &str) -> Option<Intent> {
    if contains_any(text, SHUTDOWN_PHRASES) {
        Some(Intent::ShutdownRequest)
    } else if contains_any(text, RESTART_PHRASES) {
        Some(Intent::RestartRequest)
    } else if contains_any(text, SLEEP_PHRASES) {
        Some(Intent::SleepRequest)
    } else if contains_any(text, LOCK_PHRASES) {
        Some(Intent::LockRequest)
    } else {
        None
    }
}

fn battery_time(text: &str) -> Option<Intent> {
    if text.contains("BATTERY") {
        Some(Intent::BatteryQuery)
    } else if text.contains("TIME") {
        Some(Intent::TimeQuery)
    } else {
        None
    }
}

fn canned(text: &str) -> Option<Intent> {
    CANNED_REPLIES
        .iter()
        .find(|(phrase, _)| text.contains(phrase))
        .map(|(phrase, _)| Intent::CustomReply(phrase))
}

/// First number in the text, clamped to a percentage
#[must_use]
pub fn extract_percent(text: &str) -> Option<u8> {
    NUMBER
        .find(text)
        .and_then(|m| m.as_str().parse::<u32>().ok())
        .map(|n| u8::try_from(n.min(100)).unwrap_or(100))
}
