//! Scenario tests for the run engine.
//!
//! These tests drive the engine through whole runs with a manual clock and
//! mock ports:
//! - Natural completion of every timer
//! - Pause and resume
//! - Cancel mid-run
//! - Catch-up after the host was suspended
//! - Skip, zero-length timers and the final sound

use std::sync::Arc;

use tokio::sync::mpsc;

use intervals::engine::{EnginePorts, ManualClock, RunEngine, RunEvent};
use intervals::history::HistoryLedger;
use intervals::notification::{MockNotificationScheduler, ScheduledAlert};
use intervals::sound::MockSoundPlayer;
use intervals::types::{NotificationPolicy, Settings, SubTimer, TimerSet, MAX_DURATION_SEC};

// ============================================================================
// Test Helpers
// ============================================================================

const T0: u64 = 1_700_000_000_000;

struct Scenario {
    engine: RunEngine,
    clock: ManualClock,
    sound: Arc<MockSoundPlayer>,
    notifier: Arc<MockNotificationScheduler>,
    history: HistoryLedger,
    events: mpsc::UnboundedReceiver<RunEvent>,
}

impl Scenario {
    fn new() -> Self {
        let clock = ManualClock::new(T0);
        let sound = Arc::new(MockSoundPlayer::new());
        let notifier = Arc::new(MockNotificationScheduler::new());
        let history = HistoryLedger::new();
        let (tx, events) = mpsc::unbounded_channel();
        let engine = RunEngine::new(
            EnginePorts {
                clock: Arc::new(clock.clone()),
                sound: Box::new(sound.clone()),
                notifier: Box::new(notifier.clone()),
                history: history.clone(),
            },
            Settings::default(),
            tx,
        );
        Self {
            engine,
            clock,
            sound,
            notifier,
            history,
            events,
        }
    }

    fn run(set: TimerSet) -> Self {
        let mut scenario = Self::new();
        scenario.engine.select_timer_set(Some(set));
        scenario.engine.start().unwrap();
        scenario
    }

    /// Advances the clock in one-second steps, polling after each.
    fn tick(&mut self, seconds: u64) {
        for _ in 0..seconds {
            self.advance_ms(1000);
        }
    }

    fn advance_ms(&mut self, ms: u64) {
        self.clock.advance(ms);
        self.engine.poll();
    }

    fn drain(&mut self) -> Vec<RunEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }

    fn terminal_events(&mut self) -> Vec<RunEvent> {
        self.drain()
            .into_iter()
            .filter(RunEvent::is_terminal)
            .collect()
    }
}

fn timer_set(durations: &[u64]) -> TimerSet {
    TimerSet::new(
        "シナリオ",
        durations
            .iter()
            .enumerate()
            .map(|(i, d)| SubTimer::new(format!("タイマー{}", i + 1), *d))
            .collect(),
    )
}

// ============================================================================
// Completion
// ============================================================================

#[test]
fn test_all_timers_complete_once() {
    let mut s = Scenario::run(timer_set(&[1, 2, 3]));
    s.tick(6);

    assert_eq!(
        s.terminal_events(),
        vec![RunEvent::Finished {
            timers_run: 3,
            total_duration_sec: 6
        }]
    );
    assert!(!s.engine.is_running());

    let entries = s.history.entries();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].is_closed());
    assert!(!entries[0].is_cancelled());
    assert_eq!(entries[0].timers_run, 3);
    assert_eq!(entries[0].total_duration_sec, 6);
    assert_eq!(entries[0].timer_set_name.as_deref(), Some("シナリオ"));

    // Nothing left to do once finished.
    assert_eq!(s.engine.next_deadline_ms(), None);
    s.tick(5);
    assert!(s.drain().is_empty());
}

#[test]
fn test_focus_break_scenario() {
    let set = TimerSet::new(
        "集中と休憩",
        vec![SubTimer::new("Focus", 3), SubTimer::new("Break", 2)],
    )
    .with_sound("taiko");
    let mut s = Scenario::new();
    s.sound.set_duration("beep", 250);
    s.engine.select_timer_set(Some(set));
    s.engine.start().unwrap();

    s.tick(3);
    // Focus ended: the beep plays and Break waits for it.
    assert_eq!(s.engine.state().current_index, 1);
    assert_eq!(s.sound.played(), vec!["beep".to_string()]);
    assert!(s
        .drain()
        .iter()
        .all(|e| !matches!(e, RunEvent::Started { index: 1, .. })));

    s.advance_ms(250);
    assert!(s.drain().contains(&RunEvent::Started {
        index: 1,
        total: 2,
        label: "Break".to_string(),
        remaining_sec: 2
    }));

    s.tick(2);
    assert_eq!(
        s.terminal_events(),
        vec![RunEvent::Finished {
            timers_run: 2,
            total_duration_sec: 5
        }]
    );
    assert_eq!(
        s.sound.played(),
        vec!["beep".to_string(), "taiko".to_string()]
    );
}

#[test]
fn test_focus_break_full_length() {
    let set = TimerSet::new(
        "ポモドーロ",
        vec![SubTimer::new("Focus", 25 * 60), SubTimer::new("Break", 5 * 60)],
    );
    let mut s = Scenario::run(set);

    s.tick(25 * 60);
    let state = s.engine.state();
    assert_eq!(state.current_index, 1);
    assert_eq!(state.remaining_sec, 300);
    assert_eq!(state.run_count, 1);
    assert_eq!(state.total_elapsed_sec, 1500);

    s.tick(5 * 60);
    assert_eq!(
        s.terminal_events(),
        vec![RunEvent::Finished {
            timers_run: 2,
            total_duration_sec: 1800
        }]
    );
    let entry = &s.history.entries()[0];
    assert!(entry.is_closed());
    assert!(!entry.is_cancelled());
}

#[test]
fn test_end_alerts_follow_each_timer() {
    let set = timer_set(&[3, 2]).with_notifications(NotificationPolicy::enabled());
    let mut s = Scenario::run(set);
    s.tick(5);

    let ends: Vec<_> = s
        .notifier
        .scheduled()
        .into_iter()
        .map(|(_, alert)| alert)
        .collect();
    assert_eq!(
        ends,
        vec![
            ScheduledAlert::End {
                after_sec: 3,
                label: "タイマー1".to_string(),
                is_last: false
            },
            ScheduledAlert::End {
                after_sec: 2,
                label: "タイマー2".to_string(),
                is_last: true
            },
        ]
    );
    assert!(s.notifier.status().is_none());
}

// ============================================================================
// Pause / Resume
// ============================================================================

#[test]
fn test_pause_and_resume_keeps_remaining_time() {
    let mut s = Scenario::run(timer_set(&[10]));
    s.tick(3);
    s.engine.pause().unwrap();

    let paused_at = s.engine.state().remaining_sec;
    assert!((6..=8).contains(&paused_at), "remaining {}", paused_at);

    // Time spent paused does not count.
    s.clock.advance(120_000);
    s.engine.poll();
    assert_eq!(s.engine.state().remaining_sec, paused_at);

    s.engine.start().unwrap();
    assert_eq!(s.engine.state().remaining_sec, paused_at);
    s.tick(paused_at);

    assert_eq!(
        s.terminal_events(),
        vec![RunEvent::Finished {
            timers_run: 1,
            total_duration_sec: 10
        }]
    );
}

#[test]
fn test_sub_second_pause_rounds() {
    let mut s = Scenario::run(timer_set(&[10]));
    s.clock.advance(2_400);
    s.engine.pause().unwrap();
    assert_eq!(s.engine.state().remaining_sec, 8);

    s.engine.start().unwrap();
    s.clock.advance(8_000);
    s.engine.poll();
    assert!(!s.engine.is_running());
}

// ============================================================================
// Cancel
// ============================================================================

#[test]
fn test_cancel_records_completed_timers() {
    let mut s = Scenario::run(timer_set(&[5, 5, 5]));
    s.tick(7);
    s.engine.cancel();

    assert_eq!(
        s.terminal_events(),
        vec![RunEvent::Cancelled {
            timers_run: 1,
            total_duration_sec: 5
        }]
    );

    let entries = s.history.entries();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].is_cancelled());
    assert_eq!(entries[0].timers_run, 1);
    assert_eq!(entries[0].total_duration_sec, 5);

    // Stale continuations never fire after cancel.
    s.tick(20);
    assert!(s.drain().is_empty());
    assert_eq!(s.history.len(), 1);
}

#[test]
fn test_cancel_during_transition_drops_next_start() {
    let mut s = Scenario::new();
    s.sound.set_duration("beep", 900);
    s.engine.select_timer_set(Some(timer_set(&[1, 5])));
    s.engine.start().unwrap();
    s.tick(1);
    s.engine.cancel();
    s.drain();

    s.advance_ms(1_000);
    assert!(s.drain().is_empty());
    assert!(!s.engine.is_running());
    assert_eq!(s.engine.state().current_index, 0);
}

// ============================================================================
// Background catch-up
// ============================================================================

#[test]
fn test_catch_up_lands_mid_timer() {
    let d = 10;
    let mut s = Scenario::run(timer_set(&[d, d, d, d]));
    s.drain();

    // One and a half timers past the first deadline.
    s.clock.advance(d * 1000 + d * 1500);
    s.engine.resume_from_background();

    assert!(s.drain().contains(&RunEvent::CaughtUp {
        index: 2,
        completed: 2
    }));
    let state = s.engine.state();
    assert_eq!(state.current_index, 2);
    assert_eq!(state.remaining_sec, d / 2);
    assert_eq!(state.run_count, 2);
    assert_eq!(state.total_elapsed_sec, 2 * d);
    assert!(state.running);
    // Missed transitions are silent.
    assert_eq!(s.sound.play_count(), 0);

    s.tick(d / 2 + d);
    assert_eq!(
        s.terminal_events(),
        vec![RunEvent::Finished {
            timers_run: 4,
            total_duration_sec: 4 * d
        }]
    );
}

#[test]
fn test_catch_up_past_the_end_finishes() {
    let mut s = Scenario::run(timer_set(&[5, 5]));
    s.clock.advance(60_000);
    s.engine.resume_from_background();

    assert_eq!(
        s.terminal_events(),
        vec![RunEvent::Finished {
            timers_run: 2,
            total_duration_sec: 10
        }]
    );
    assert_eq!(s.sound.played(), vec!["normal".to_string()]);
    assert!(!s.history.entries()[0].is_cancelled());
}

#[test]
fn test_resume_before_deadline_only_refreshes() {
    let mut s = Scenario::run(timer_set(&[30]));
    s.clock.advance(12_000);
    s.engine.resume_from_background();

    assert_eq!(s.engine.state().current_index, 0);
    assert_eq!(s.engine.state().remaining_sec, 18);
    assert!(s
        .drain()
        .iter()
        .all(|e| !matches!(e, RunEvent::CaughtUp { .. })));
}

#[test]
fn test_cancel_after_catch_up_withdraws_alerts() {
    let set = timer_set(&[60, 60, 60]).with_notifications(NotificationPolicy::enabled());
    let mut s = Scenario::run(set);
    s.clock.advance(90_000);
    s.engine.resume_from_background();

    assert_eq!(s.engine.state().current_index, 1);
    assert_eq!(s.engine.state().remaining_sec, 30);
    assert_eq!(s.notifier.active_end_alerts().len(), 1);

    s.engine.cancel();
    assert!(s.notifier.active_end_alerts().is_empty());
    assert!(s.notifier.status().is_none());
}

// ============================================================================
// Oversized durations
// ============================================================================

#[test]
fn test_oversized_duration_is_clamped_and_runs() {
    let set: TimerSet = serde_json::from_str(
        r#"{"id":"huge","name":"巨大","timers":[{"id":"t","label":"永遠","durationSec":18446744073709551615}]}"#,
    )
    .unwrap();
    assert_eq!(set.timers[0].duration_sec, MAX_DURATION_SEC);

    let mut s = Scenario::run(set);
    assert!(s.engine.is_running());
    assert_eq!(s.engine.state().remaining_sec, MAX_DURATION_SEC);

    s.tick(2);
    s.engine.pause().unwrap();
    assert_eq!(s.engine.state().remaining_sec, MAX_DURATION_SEC - 2);

    s.clock.advance(3_600_000);
    s.engine.start().unwrap();
    s.engine.resume_from_background();
    assert_eq!(s.engine.state().current_index, 0);

    s.engine.cancel();
    assert_eq!(
        s.terminal_events(),
        vec![RunEvent::Cancelled {
            timers_run: 0,
            total_duration_sec: 0
        }]
    );
}

// ============================================================================
// Skip, zero-length timers, final sound
// ============================================================================

#[test]
fn test_skip_last_timer_completes_run() {
    let mut s = Scenario::run(timer_set(&[2, 30]));
    s.tick(2);
    s.engine.skip().unwrap();

    assert_eq!(
        s.terminal_events(),
        vec![RunEvent::Finished {
            timers_run: 1,
            total_duration_sec: 2
        }]
    );
    let entry = &s.history.entries()[0];
    assert!(entry.is_closed());
    assert!(!entry.is_cancelled());
}

#[test]
fn test_skip_moves_on_silently() {
    let mut s = Scenario::run(timer_set(&[30, 4]));
    s.engine.skip().unwrap();

    assert!(s.drain().contains(&RunEvent::Skipped { from: 0, to: 1 }));
    assert_eq!(s.engine.state().remaining_sec, 4);
    assert_eq!(s.sound.play_count(), 0);
    assert_eq!(s.engine.state().run_count, 0);
}

#[test]
fn test_zero_length_first_timer_transitions_immediately() {
    let mut s = Scenario::run(timer_set(&[0, 3]));

    assert_eq!(s.engine.state().current_index, 1);
    assert_eq!(s.engine.state().remaining_sec, 3);
    assert_eq!(s.engine.state().run_count, 1);
    assert_eq!(s.sound.played(), vec!["beep".to_string()]);
    assert!(s.drain().contains(&RunEvent::Advanced { from: 0, to: 1 }));
}

#[test]
fn test_notify_off_last_timer_still_plays_final_sound() {
    let set = TimerSet::new(
        "静かな最後",
        vec![
            SubTimer::new("一", 2),
            SubTimer::new("二", 2).with_notify(false),
        ],
    );
    let mut s = Scenario::run(set);
    s.tick(4);

    assert_eq!(
        s.sound.played(),
        vec!["beep".to_string(), "normal".to_string()]
    );
}

#[test]
fn test_notify_off_middle_timer_is_silent() {
    let set = TimerSet::new(
        "静かな途中",
        vec![
            SubTimer::new("一", 2).with_notify(false),
            SubTimer::new("二", 2),
        ],
    )
    .with_sound("none");
    let mut s = Scenario::run(set);
    s.tick(4);

    assert!(s.sound.played().is_empty());
    assert_eq!(s.terminal_events().len(), 1);
}
