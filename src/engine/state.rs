//! Run state and the program being run.

use crate::types::{TimerSet, DEFAULT_SOUND};

/// Name and label shown for a quick timer.
pub const QUICK_TIMER_NAME: &str = "クイックタイマー";

/// What the engine has been told to run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Program {
    /// Nothing selected.
    #[default]
    Idle,
    /// A timer set, run timer by timer.
    Set(TimerSet),
    /// A single ad-hoc countdown with no set and no history.
    Quick { duration_sec: u64, sound: String },
}

impl Program {
    #[must_use]
    pub fn quick(duration_sec: u64, sound: Option<&str>) -> Self {
        Self::Quick {
            duration_sec,
            sound: sound.unwrap_or(DEFAULT_SOUND).to_string(),
        }
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    #[must_use]
    pub fn is_quick(&self) -> bool {
        matches!(self, Self::Quick { .. })
    }

    #[must_use]
    pub fn timer_set(&self) -> Option<&TimerSet> {
        match self {
            Self::Set(set) => Some(set),
            _ => None,
        }
    }

    /// Number of timers in the program.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Idle => 0,
            Self::Set(set) => set.len(),
            Self::Quick { .. } => 1,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Full duration of the timer at `index`, 0 when out of range.
    #[must_use]
    pub fn duration_at(&self, index: usize) -> u64 {
        match self {
            Self::Idle => 0,
            Self::Set(set) => set.duration_at(index),
            Self::Quick { duration_sec, .. } => {
                if index == 0 {
                    *duration_sec
                } else {
                    0
                }
            }
        }
    }

    /// All timer durations in order.
    #[must_use]
    pub fn durations(&self) -> Vec<u64> {
        (0..self.len()).map(|i| self.duration_at(i)).collect()
    }

    #[must_use]
    pub fn label_at(&self, index: usize) -> &str {
        match self {
            Self::Set(set) => set
                .timers
                .get(index)
                .map_or("", |timer| timer.label.as_str()),
            Self::Quick { .. } => QUICK_TIMER_NAME,
            Self::Idle => "",
        }
    }

    /// Whether the end of the timer at `index` is announced.
    #[must_use]
    pub fn notify_at(&self, index: usize) -> bool {
        match self {
            Self::Set(set) => set.timers.get(index).is_some_and(|timer| timer.notify),
            Self::Quick { .. } => true,
            Self::Idle => false,
        }
    }

    /// Catalog id of the end-of-run sound.
    #[must_use]
    pub fn sound(&self) -> Option<&str> {
        match self {
            Self::Set(set) => Some(&set.sound),
            Self::Quick { sound, .. } => Some(sound),
            Self::Idle => None,
        }
    }

    /// Name used in the persistent status.
    #[must_use]
    pub fn display_name(&self) -> &str {
        match self {
            Self::Set(set) => &set.name,
            Self::Quick { .. } => QUICK_TIMER_NAME,
            Self::Idle => "",
        }
    }

    /// Whether end alerts may be scheduled. Quick timers have no policy.
    #[must_use]
    pub fn alerts_enabled(&self) -> bool {
        self.timer_set().is_some_and(TimerSet::alerts_enabled)
    }
}

/// Mutable state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunState {
    pub current_index: usize,
    /// Whole seconds left on the current timer.
    pub remaining_sec: u64,
    pub running: bool,
    /// Absolute end of the current countdown in wall-clock milliseconds.
    pub end_at_ms: Option<u64>,
    /// Timers completed in this run.
    pub run_count: u32,
    /// Sum of the completed timers' durations.
    pub total_elapsed_sec: u64,
}

impl RunState {
    /// Fresh state positioned on the first timer of `program`.
    #[must_use]
    pub fn initial(program: &Program) -> Self {
        Self {
            remaining_sec: program.duration_at(0),
            ..Self::default()
        }
    }

    /// Remaining whole seconds at `now_ms`, rounded to the nearest second.
    #[must_use]
    pub fn remaining_at(&self, now_ms: u64) -> u64 {
        match self.end_at_ms {
            Some(end_at) => end_at.saturating_sub(now_ms).saturating_add(500) / 1000,
            None => self.remaining_sec,
        }
    }

    pub fn credit(&mut self, duration_sec: u64) {
        self.run_count = self.run_count.saturating_add(1);
        self.total_elapsed_sec = self.total_elapsed_sec.saturating_add(duration_sec);
    }
}
