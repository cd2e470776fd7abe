//! Run engine for timer sets.
//!
//! [`RunEngine`] owns the whole state of a run: which program is selected,
//! where the countdown is, the open history entry, scheduled alerts and the
//! loaded sounds. Every command is a synchronous `&mut self` call.
//!
//! The countdown is anchored to an absolute end time (`end_at_ms`) rather
//! than counted in ticks. Two continuations exist, both stored as data and
//! tagged with the run token:
//!
//! - the 1-second refresh that recomputes the remaining time
//! - the delayed start of the next timer while the transition sound plays
//!
//! Cancelling, reselecting and finishing bump the token, so continuations
//! from an older run are dropped when they come due. The host calls
//! [`RunEngine::poll`] at [`RunEngine::next_deadline_ms`]; see [`driver`].
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use intervals::engine::{EnginePorts, ManualClock, RunEngine, RunEvent};
//! use intervals::history::HistoryLedger;
//! use intervals::notification::MockNotificationScheduler;
//! use intervals::sound::MockSoundPlayer;
//! use intervals::types::{Settings, SubTimer, TimerSet};
//! use tokio::sync::mpsc;
//!
//! let clock = ManualClock::new(0);
//! let (tx, mut rx) = mpsc::unbounded_channel();
//! let ports = EnginePorts {
//!     clock: Arc::new(clock.clone()),
//!     sound: Box::new(MockSoundPlayer::new()),
//!     notifier: Box::new(MockNotificationScheduler::new()),
//!     history: HistoryLedger::new(),
//! };
//! let mut engine = RunEngine::new(ports, Settings::default(), tx);
//!
//! engine.select_timer_set(Some(TimerSet::new("朝", vec![SubTimer::new("集中", 2)])));
//! engine.start().unwrap();
//! for _ in 0..2 {
//!     clock.advance(1000);
//!     engine.poll();
//! }
//!
//! let mut finished = false;
//! while let Ok(event) = rx.try_recv() {
//!     finished |= matches!(event, RunEvent::Finished { timers_run: 1, .. });
//! }
//! assert!(finished);
//! ```

pub mod catch_up;
mod clock;
pub mod driver;
mod error;
mod state;

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

pub use self::clock::{Clock, ManualClock, SystemClock};
pub use self::error::EngineError;
pub use self::state::{Program, RunState, QUICK_TIMER_NAME};

use crate::history::{EntryId, HistoryLedger, RunOutcome};
use crate::notification::{AlertId, NotificationScheduler};
use crate::sound::{SoundHandle, SoundPlayer, TRANSITION_SOUND};
use crate::types::{Settings, TimerSet, SOUND_NONE};

/// Cadence of the remaining-time refresh.
pub const REFRESH_INTERVAL_MS: u64 = 1000;

// ============================================================================
// RunEvent
// ============================================================================

/// Progress of a run, sent to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    /// A timer started (or resumed) counting down.
    Started {
        index: usize,
        total: usize,
        label: String,
        remaining_sec: u64,
    },
    /// The remaining time was refreshed.
    Tick { index: usize, remaining_sec: u64 },
    /// A timer ended and the run moved on.
    Advanced { from: usize, to: usize },
    /// A timer was skipped.
    Skipped { from: usize, to: usize },
    /// The countdown was paused.
    Paused { remaining_sec: u64 },
    /// The current timer was restored to its full duration.
    Reset { index: usize, remaining_sec: u64 },
    /// Timers that ended while the host was suspended were credited.
    CaughtUp { index: usize, completed: u32 },
    /// Every timer ran to the end.
    Finished {
        timers_run: u32,
        total_duration_sec: u64,
    },
    /// The run was cancelled.
    Cancelled {
        timers_run: u32,
        total_duration_sec: u64,
    },
}

impl RunEvent {
    /// Returns true for events that end a run.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished { .. } | Self::Cancelled { .. })
    }
}

// ============================================================================
// RunEngine
// ============================================================================

/// Wall-clock end of a countdown of `remaining_sec` starting at `now_ms`.
fn end_after(now_ms: u64, remaining_sec: u64) -> u64 {
    now_ms.saturating_add(remaining_sec.saturating_mul(1000))
}

/// Side effects the engine drives.
pub struct EnginePorts {
    pub clock: Arc<dyn Clock>,
    pub sound: Box<dyn SoundPlayer>,
    pub notifier: Box<dyn NotificationScheduler>,
    pub history: HistoryLedger,
}

/// A continuation due at `due_ms`, valid only for run `token`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Scheduled {
    due_ms: u64,
    token: u64,
}

#[derive(Debug, Default)]
struct SoundSlots {
    /// Sound id the `finish` handle was loaded for.
    sound_id: Option<String>,
    transition: Option<SoundHandle>,
    finish: Option<SoundHandle>,
}

impl SoundSlots {
    fn handles(&self) -> impl Iterator<Item = SoundHandle> {
        self.transition.into_iter().chain(self.finish)
    }
}

/// Controller for a single run at a time.
pub struct RunEngine {
    clock: Arc<dyn Clock>,
    sound: Box<dyn SoundPlayer>,
    notifier: Box<dyn NotificationScheduler>,
    history: HistoryLedger,
    settings: Settings,
    event_tx: mpsc::UnboundedSender<RunEvent>,

    program: Program,
    state: RunState,
    entry: Option<EntryId>,
    token: u64,
    refresh: Option<Scheduled>,
    pending_start: Option<Scheduled>,
    alerts: Vec<AlertId>,
    sounds: SoundSlots,
}

impl RunEngine {
    /// Creates an engine with nothing selected.
    pub fn new(
        ports: EnginePorts,
        settings: Settings,
        event_tx: mpsc::UnboundedSender<RunEvent>,
    ) -> Self {
        Self {
            clock: ports.clock,
            sound: ports.sound,
            notifier: ports.notifier,
            history: ports.history,
            settings,
            event_tx,
            program: Program::Idle,
            state: RunState::default(),
            entry: None,
            token: 0,
            refresh: None,
            pending_start: None,
            alerts: Vec::new(),
            sounds: SoundSlots::default(),
        }
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    #[must_use]
    pub fn state(&self) -> &RunState {
        &self.state
    }

    #[must_use]
    pub fn program(&self) -> &Program {
        &self.program
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state.running
    }

    /// Current time on the engine's clock.
    #[must_use]
    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Id of the history entry of the run in progress.
    #[must_use]
    pub fn open_entry(&self) -> Option<&EntryId> {
        self.entry.as_ref()
    }

    #[must_use]
    pub fn history(&self) -> &HistoryLedger {
        &self.history
    }

    /// Share of the program already elapsed, in `[0, 1]`.
    #[must_use]
    pub fn progress(&self) -> f64 {
        match &self.program {
            Program::Set(set) => set.progress(self.state.current_index, self.state.remaining_sec),
            Program::Quick { duration_sec, .. } if *duration_sec > 0 => {
                let elapsed = duration_sec.saturating_sub(self.state.remaining_sec);
                elapsed as f64 / *duration_sec as f64
            }
            _ => 0.0,
        }
    }

    /// Earliest time at which [`poll`](Self::poll) has work to do.
    #[must_use]
    pub fn next_deadline_ms(&self) -> Option<u64> {
        [self.refresh, self.pending_start]
            .into_iter()
            .flatten()
            .filter(|scheduled| scheduled.token == self.token)
            .map(|scheduled| scheduled.due_ms)
            .min()
    }

    // ------------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------------

    /// Selects a timer set (or nothing), abandoning any run in progress.
    pub fn select_timer_set(&mut self, set: Option<TimerSet>) {
        self.select(set.map_or(Program::Idle, Program::Set));
    }

    /// Selects a single ad-hoc countdown.
    pub fn select_quick_timer(&mut self, duration_sec: u64, sound_id: Option<&str>) {
        self.select(Program::quick(duration_sec, sound_id));
    }

    fn select(&mut self, program: Program) {
        self.close_entry(true);
        self.invalidate();
        self.cancel_alerts();
        self.notifier.clear_persistent_status();
        self.stop_sounds();

        self.program = program;
        self.state = RunState::initial(&self.program);
        self.ensure_sounds();
        info!(
            "Selected '{}' ({} timer(s))",
            self.program.display_name(),
            self.program.len()
        );
    }

    /// Starts or resumes the countdown.
    ///
    /// # Errors
    ///
    /// Returns an error if nothing is selected, the selected set is empty,
    /// or the countdown is already running.
    pub fn start(&mut self) -> Result<(), EngineError> {
        match &self.program {
            Program::Idle => return Err(EngineError::NothingSelected),
            Program::Set(set) if set.is_empty() => return Err(EngineError::EmptyTimerSet),
            _ => {}
        }
        if self.state.running {
            return Err(EngineError::AlreadyRunning);
        }

        match &self.program {
            Program::Set(set) if self.entry.is_none() => {
                self.entry = Some(self.history.log_start(Some(&set.id), Some(&set.name)));
                self.state = RunState::initial(&self.program);
            }
            Program::Quick { duration_sec, .. } if self.state.remaining_sec == 0 => {
                if *duration_sec == 0 {
                    debug!("Quick timer has no duration; nothing to start");
                    return Ok(());
                }
                self.state = RunState::initial(&self.program);
            }
            _ => {}
        }

        self.stop_sounds();
        info!(
            "Run started at timer {} with {}s left",
            self.state.current_index, self.state.remaining_sec
        );
        self.arm_current();
        Ok(())
    }

    /// Pauses the countdown, keeping the remaining time.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::NotRunning` if nothing is running.
    pub fn pause(&mut self) -> Result<(), EngineError> {
        if !self.state.running {
            return Err(EngineError::NotRunning);
        }
        self.refresh = None;
        self.pending_start = None;

        let now = self.clock.now_ms();
        let remaining = self.state.remaining_at(now);
        self.state.remaining_sec = remaining;
        self.state.running = false;
        self.state.end_at_ms = Some(end_after(now, remaining));

        self.stop_sounds();
        self.cancel_alerts();
        self.update_status();
        info!("Run paused with {}s left", remaining);
        self.emit(RunEvent::Paused {
            remaining_sec: remaining,
        });
        Ok(())
    }

    /// Restores the current timer to its full duration.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::NothingSelected` if nothing is selected.
    pub fn reset_current(&mut self) -> Result<(), EngineError> {
        if self.program.is_idle() {
            return Err(EngineError::NothingSelected);
        }
        self.refresh = None;
        self.pending_start = None;
        self.cancel_alerts();

        let index = self.state.current_index;
        self.state.remaining_sec = self.program.duration_at(index);
        self.state.end_at_ms = None;
        debug!("Timer {} reset to {}s", index, self.state.remaining_sec);
        self.emit(RunEvent::Reset {
            index,
            remaining_sec: self.state.remaining_sec,
        });

        if self.state.running {
            self.arm_current();
        } else if self.entry.is_some() {
            self.update_status();
        }
        Ok(())
    }

    /// Moves to the next timer without sound and without crediting the
    /// skipped one. Skipping the last timer completes the run.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::NothingSelected` if nothing is selected.
    pub fn skip(&mut self) -> Result<(), EngineError> {
        if self.program.is_idle() {
            return Err(EngineError::NothingSelected);
        }
        self.refresh = None;
        self.pending_start = None;
        self.cancel_alerts();
        self.stop_sounds();

        let from = self.state.current_index;
        if from + 1 >= self.program.len() {
            debug!("Skipped the last timer");
            self.finish_run();
            return Ok(());
        }

        let to = from + 1;
        self.state.current_index = to;
        self.state.remaining_sec = self.program.duration_at(to);
        self.state.end_at_ms = None;
        debug!("Skipped timer {} -> {}", from, to);
        self.emit(RunEvent::Skipped { from, to });

        if self.state.running {
            self.arm_current();
        } else if self.entry.is_some() {
            self.update_status();
        }
        Ok(())
    }

    /// Abandons the run and records it as cancelled.
    pub fn cancel(&mut self) {
        self.invalidate();
        self.state.running = false;
        self.state.end_at_ms = None;
        self.stop_sounds();
        self.cancel_alerts();
        self.notifier.clear_persistent_status();

        let (timers_run, total_duration_sec) =
            (self.state.run_count, self.state.total_elapsed_sec);
        self.close_entry(true);
        self.state = RunState::initial(&self.program);
        info!(
            "Run cancelled after {} timer(s), {}s",
            timers_run, total_duration_sec
        );
        self.emit(RunEvent::Cancelled {
            timers_run,
            total_duration_sec,
        });
    }

    /// Applies new settings: volume goes to the loaded sounds, and pending
    /// end alerts are dropped when notifications get disabled.
    pub fn update_settings(&mut self, settings: Settings) {
        self.settings = settings;
        let volume = settings.volume();
        for handle in self.sounds.handles() {
            self.sound.set_volume(handle, volume);
        }
        if !settings.enable_notifications {
            self.cancel_alerts();
        }
        debug!("Settings updated: {:?}", settings);
    }

    /// Runs whatever continuation is due.
    pub fn poll(&mut self) {
        let now = self.clock.now_ms();

        if let Some(pending) = self.pending_start.filter(|p| p.due_ms <= now) {
            self.pending_start = None;
            if pending.token == self.token && self.state.running {
                self.arm_current();
            } else {
                trace!("Dropped stale delayed start");
            }
        }

        if let Some(refresh) = self.refresh.filter(|r| r.due_ms <= now) {
            if refresh.token == self.token {
                self.refresh_tick(refresh, now);
            } else {
                self.refresh = None;
            }
        }
    }

    /// Brings the run up to date after the host was suspended.
    ///
    /// Timers that ended in the meantime are credited silently. If the whole
    /// set ran out, the final sound plays and the run completes.
    pub fn resume_from_background(&mut self) {
        if !self.state.running {
            return;
        }
        let now = self.clock.now_ms();
        let Some(end_at) = self.state.end_at_ms else {
            // Between timers: the delayed start is simply due now or later.
            self.poll();
            return;
        };

        if now < end_at {
            self.refresh_tick(
                Scheduled {
                    due_ms: now,
                    token: self.token,
                },
                now,
            );
            return;
        }

        let overdue_ms = now - end_at;
        let durations = self.program.durations();
        let walked = catch_up::walk(&durations, self.state.current_index, overdue_ms);
        self.state.run_count = self.state.run_count.saturating_add(walked.completed);
        self.state.total_elapsed_sec = self
            .state
            .total_elapsed_sec
            .saturating_add(walked.completed_sec);
        self.refresh = None;
        self.cancel_alerts();
        info!(
            "Caught up {} timer(s) after {}ms in background",
            walked.completed, overdue_ms
        );

        if walked.finished {
            self.state.current_index = durations.len().saturating_sub(1);
            self.state.remaining_sec = 0;
            self.play_finish();
            self.finish_run();
            return;
        }

        self.state.current_index = walked.index;
        self.state.end_at_ms = Some(now.saturating_add(walked.remaining_ms));
        self.state.remaining_sec = walked.remaining_ms.saturating_add(500) / 1000;
        self.refresh = Some(Scheduled {
            due_ms: now + REFRESH_INTERVAL_MS,
            token: self.token,
        });
        self.schedule_end_alert(self.state.remaining_sec);
        self.update_status();
        self.emit(RunEvent::CaughtUp {
            index: walked.index,
            completed: walked.completed,
        });
    }

    // ------------------------------------------------------------------------
    // Countdown
    // ------------------------------------------------------------------------

    /// Starts counting down the current timer from `remaining_sec`.
    fn arm_current(&mut self) {
        self.state.running = true;
        let remaining = self.state.remaining_sec;
        if remaining == 0 {
            self.end_one();
            return;
        }

        let now = self.clock.now_ms();
        self.state.end_at_ms = Some(end_after(now, remaining));
        self.refresh = Some(Scheduled {
            due_ms: now + REFRESH_INTERVAL_MS,
            token: self.token,
        });
        self.schedule_end_alert(remaining);
        self.update_status();

        let index = self.state.current_index;
        self.emit(RunEvent::Started {
            index,
            total: self.program.len(),
            label: self.program.label_at(index).to_string(),
            remaining_sec: remaining,
        });
    }

    fn refresh_tick(&mut self, refresh: Scheduled, now: u64) {
        let remaining = self.state.remaining_at(now);
        self.state.remaining_sec = remaining;
        if remaining == 0 {
            self.end_one();
            return;
        }

        // Missed ticks are skipped rather than replayed.
        let next = refresh.due_ms + REFRESH_INTERVAL_MS;
        self.refresh = Some(Scheduled {
            due_ms: if next > now {
                next
            } else {
                now + REFRESH_INTERVAL_MS
            },
            token: refresh.token,
        });
        self.update_status();
        self.emit(RunEvent::Tick {
            index: self.state.current_index,
            remaining_sec: remaining,
        });
    }

    /// Handles the natural end of the current timer.
    fn end_one(&mut self) {
        let token = self.token;
        let index = self.state.current_index;
        let is_last = index + 1 >= self.program.len();
        self.refresh = None;
        self.state.end_at_ms = None;
        self.state.remaining_sec = 0;

        let mut delay_ms = 0;
        if self.program.notify_at(index) && !is_last {
            if let Some(handle) = self.sounds.transition {
                self.play(handle);
                delay_ms = self.sound.playback_duration_ms(handle).unwrap_or(0);
            }
        } else if is_last {
            self.play_finish();
        }

        if token != self.token || !self.state.running {
            return;
        }
        self.state.credit(self.program.duration_at(index));

        if is_last {
            self.finish_run();
            return;
        }

        let next = index + 1;
        self.state.current_index = next;
        self.state.remaining_sec = self.program.duration_at(next);
        debug!("Timer {} ended, next is {}", index, next);
        self.emit(RunEvent::Advanced {
            from: index,
            to: next,
        });

        if delay_ms > 0 {
            self.pending_start = Some(Scheduled {
                due_ms: self.clock.now_ms() + delay_ms,
                token,
            });
        } else {
            self.arm_current();
        }
    }

    /// Completes the run: closes the entry and reports the totals.
    fn finish_run(&mut self) {
        self.invalidate();
        self.state.running = false;
        self.state.end_at_ms = None;
        self.alerts.clear();
        self.notifier.clear_persistent_status();
        self.close_entry(false);

        let (timers_run, total_duration_sec) =
            (self.state.run_count, self.state.total_elapsed_sec);
        info!(
            "Run finished: {} timer(s), {}s",
            timers_run, total_duration_sec
        );
        self.emit(RunEvent::Finished {
            timers_run,
            total_duration_sec,
        });
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    /// Drops every scheduled continuation of the current run.
    fn invalidate(&mut self) {
        self.token += 1;
        self.refresh = None;
        self.pending_start = None;
    }

    fn close_entry(&mut self, cancelled: bool) {
        let Some(id) = self.entry.take() else {
            return;
        };
        let (timers_run, total) = (self.state.run_count, self.state.total_elapsed_sec);
        let outcome = if cancelled {
            RunOutcome::cancelled(timers_run, total)
        } else {
            RunOutcome::completed(timers_run, total)
        };
        if let Err(e) = self.history.log_complete(&id, outcome) {
            warn!("Failed to close history entry: {}", e);
        }
    }

    fn emit(&self, event: RunEvent) {
        if self.event_tx.send(event).is_err() {
            trace!("Run event dropped: receiver closed");
        }
    }

    fn schedule_end_alert(&mut self, after_sec: u64) {
        let index = self.state.current_index;
        if !(self.settings.enable_notifications
            && self.program.alerts_enabled()
            && self.program.notify_at(index))
        {
            return;
        }
        let is_last = index + 1 >= self.program.len();
        match self
            .notifier
            .schedule_end_alert(after_sec, self.program.label_at(index), is_last)
        {
            Ok(id) => self.alerts.push(id),
            Err(e) => warn!("Failed to schedule end alert: {}", e),
        }
    }

    fn cancel_alerts(&mut self) {
        if !self.alerts.is_empty() {
            self.notifier.cancel_alerts(&self.alerts);
            self.alerts.clear();
        }
    }

    fn update_status(&self) {
        self.notifier.update_persistent_status(
            self.program.display_name(),
            self.program.label_at(self.state.current_index),
            self.state.remaining_sec,
        );
    }

    /// Loads the transition and end-of-run sounds when the sound id changed.
    fn ensure_sounds(&mut self) {
        let Some(sound_id) = self.program.sound().map(str::to_string) else {
            return;
        };
        if self.sounds.sound_id.as_deref() == Some(sound_id.as_str()) {
            return;
        }
        self.unload_sounds();
        self.sounds.transition = self.load_sound(TRANSITION_SOUND);
        self.sounds.finish = if sound_id == SOUND_NONE {
            None
        } else {
            self.load_sound(&sound_id)
        };
        self.sounds.sound_id = Some(sound_id);
    }

    fn load_sound(&self, sound_id: &str) -> Option<SoundHandle> {
        match self.sound.load(sound_id) {
            Ok(handle) => {
                self.sound.set_volume(handle, self.settings.volume());
                Some(handle)
            }
            Err(e) => {
                warn!("Failed to load sound '{}': {}", sound_id, e);
                None
            }
        }
    }

    fn unload_sounds(&mut self) {
        for handle in self.sounds.handles() {
            self.sound.unload(handle);
        }
        self.sounds = SoundSlots::default();
    }

    fn play(&self, handle: SoundHandle) {
        match self.sound.play(handle) {
            Ok(()) => {}
            Err(e) if e.is_device_error() => warn!("{} ({})", e, e.suggestion()),
            Err(e) => debug!("Sound playback failed: {}", e),
        }
    }

    fn play_finish(&self) {
        if let Some(handle) = self.sounds.finish {
            self.play(handle);
        }
    }

    fn stop_sounds(&self) {
        for handle in self.sounds.handles() {
            self.sound.stop(handle);
        }
    }
}

impl Drop for RunEngine {
    fn drop(&mut self) {
        self.close_entry(true);
        self.cancel_alerts();
        self.notifier.clear_persistent_status();
        self.unload_sounds();
    }
}

impl std::fmt::Debug for RunEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunEngine")
            .field("program", &self.program.display_name())
            .field("state", &self.state)
            .field("entry", &self.entry)
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}
