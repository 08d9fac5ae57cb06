//! Scheduler behavior under a paused clock

mod common;

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use common::{MockClock, RecordingSpeaker, ScriptedListener};
use lucifer_agent::actions::ClockMode;
use lucifer_agent::sched::{AlarmKind, Scheduler};
use lucifer_agent::speech::{Heard, Utterance};

struct Fixture {
    scheduler: Arc<Scheduler>,
    clock: Arc<MockClock>,
    speaker: Arc<RecordingSpeaker>,
}

fn fixture(follow_up: Vec<Heard>) -> Fixture {
    let clock = Arc::new(MockClock::new());
    let speaker = Arc::new(RecordingSpeaker::new());
    let listener = Arc::new(ScriptedListener::from_hearings(
        follow_up,
        CancellationToken::new(),
    ));
    let scheduler = Arc::new(Scheduler::new(
        Arc::clone(&clock) as _,
        Arc::clone(&speaker) as _,
        listener as _,
    ));
    Fixture {
        scheduler,
        clock,
        speaker,
    }
}

/// Let spawned ring tasks run; the paused clock auto-advances
async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

#[tokio::test(start_paused = true)]
async fn timer_fires_after_its_duration() {
    let f = fixture(Vec::new());
    f.scheduler
        .schedule(&Utterance::new("SET A TIMER FOR 10 SECONDS"), AlarmKind::Timer)
        .await;

    assert_eq!(f.scheduler.pending_count().await, 1);
    assert!(f.speaker.said_containing("Timer set for 10 seconds"));
    assert!(f.clock.launches().is_empty());

    settle().await;
    tokio::time::advance(Duration::from_secs(11)).await;
    settle().await;

    let launches = f.clock.launches();
    assert_eq!(launches.len(), 1);
    assert_eq!(launches[0].mode, ClockMode::Timer);
    assert_eq!(launches[0].duration_secs, Some(10));
    assert!(f.speaker.said_containing("Timer for 10 seconds is ringing now."));
    assert_eq!(f.scheduler.pending_count().await, 0);
}

#[tokio::test(start_paused = true)]
async fn compound_duration_equals_its_total() {
    let f = fixture(Vec::new());
    f.scheduler
        .schedule(
            &Utterance::new("SET A TIMER FOR 1 HOUR 30 MINUTES"),
            AlarmKind::Timer,
        )
        .await;

    // Equivalent to 90 minutes: nothing at 89, ringing by 91.
    settle().await;
    tokio::time::advance(Duration::from_secs(89 * 60)).await;
    settle().await;
    assert!(f.clock.launches().is_empty());

    tokio::time::advance(Duration::from_secs(2 * 60)).await;
    settle().await;
    assert_eq!(f.clock.launches().len(), 1);
    assert_eq!(f.clock.launches()[0].duration_secs, Some(5400));
}

#[tokio::test(start_paused = true)]
async fn alarm_launches_in_alarm_mode() {
    let f = fixture(Vec::new());
    f.scheduler
        .schedule(&Utterance::new("SET AN ALARM FOR 45 SECONDS"), AlarmKind::Alarm)
        .await;

    settle().await;
    tokio::time::advance(Duration::from_secs(46)).await;
    settle().await;

    let launches = f.clock.launches();
    assert_eq!(launches.len(), 1);
    assert_eq!(launches[0].mode, ClockMode::Alarm);
    assert!(launches[0].target_time.is_some());
}

#[tokio::test(start_paused = true)]
async fn shutdown_cancels_pending_rings() {
    let f = fixture(Vec::new());
    f.scheduler
        .schedule(&Utterance::new("SET A TIMER FOR 1 HOUR"), AlarmKind::Timer)
        .await;
    assert_eq!(f.scheduler.pending_count().await, 1);

    f.scheduler.shutdown().await;
    assert_eq!(f.scheduler.pending_count().await, 0);

    tokio::time::advance(Duration::from_secs(7200)).await;
    settle().await;
    assert!(f.clock.launches().is_empty());
}

#[tokio::test(start_paused = true)]
async fn unparseable_request_asks_once_then_arms() {
    let f = fixture(vec![Heard::Utterance(Utterance::new("10 SECONDS"))]);
    f.scheduler
        .schedule(&Utterance::new("SET A TIMER"), AlarmKind::Timer)
        .await;

    assert!(f.speaker.said_containing(
        "Timer command not recognized. Please specify a duration or a time."
    ));
    assert_eq!(f.scheduler.pending_count().await, 1);
}

#[tokio::test(start_paused = true)]
async fn unparseable_follow_up_cancels() {
    let f = fixture(vec![Heard::Utterance(Utterance::new("NO NUMBERS HERE"))]);
    f.scheduler
        .schedule(&Utterance::new("SET A TIMER"), AlarmKind::Timer)
        .await;

    assert!(f.speaker.said_containing("Timer command cancelled."));
    assert_eq!(f.scheduler.pending_count().await, 0);
}

#[tokio::test(start_paused = true)]
async fn silent_follow_up_cancels() {
    let f = fixture(vec![Heard::Silence]);
    f.scheduler
        .schedule(&Utterance::new("SET AN ALARM"), AlarmKind::Alarm)
        .await;

    assert!(f.speaker.said_containing("Alarm command cancelled."));
    assert_eq!(f.scheduler.pending_count().await, 0);
}

#[tokio::test(start_paused = true)]
async fn multiple_timers_ring_independently() {
    let f = fixture(Vec::new());
    f.scheduler
        .schedule(&Utterance::new("SET A TIMER FOR 10 SECONDS"), AlarmKind::Timer)
        .await;
    f.scheduler
        .schedule(&Utterance::new("SET A TIMER FOR 30 SECONDS"), AlarmKind::Timer)
        .await;
    assert_eq!(f.scheduler.pending_count().await, 2);

    settle().await;
    tokio::time::advance(Duration::from_secs(11)).await;
    settle().await;
    assert_eq!(f.clock.launches().len(), 1);
    assert_eq!(f.scheduler.pending_count().await, 1);

    tokio::time::advance(Duration::from_secs(20)).await;
    settle().await;
    assert_eq!(f.clock.launches().len(), 2);
    assert_eq!(f.scheduler.pending_count().await, 0);
}
