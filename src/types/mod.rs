//! Core data types for the interval timer.
//!
//! This module defines the data structures used for:
//! - Sub-timers and timer sets (what a run executes)
//! - User settings with validation
//! - Duration coercion/formatting and reminder policies (submodules)

mod duration;
mod policy;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use duration::{
    coerce_seconds, format_hms, format_quick_digits, pad2, parse_quick_digits, MAX_DURATION_SEC,
    MAX_QUICK_DIGITS,
};
pub use policy::{weekday_from_sunday, NotificationPolicy, RepeatRule, RepeatUnit, StartTrigger};

/// Sound id that disables the end-of-run sound.
pub const SOUND_NONE: &str = "none";

/// Sound id used when a set does not name one.
pub const DEFAULT_SOUND: &str = "normal";

fn default_true() -> bool {
    true
}

fn default_sound() -> String {
    DEFAULT_SOUND.to_string()
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

// ============================================================================
// SubTimer
// ============================================================================

/// One countdown segment within a timer set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubTimer {
    pub id: String,
    pub label: String,
    /// Length in whole seconds. Invalid input is coerced to 0 when loading.
    #[serde(default, deserialize_with = "duration::lenient_seconds")]
    pub duration_sec: u64,
    /// Whether the end of this segment is announced (sound and alert).
    #[serde(default = "default_true")]
    pub notify: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl SubTimer {
    /// Creates a sub-timer with a fresh id and `notify` enabled.
    #[must_use]
    pub fn new(label: impl Into<String>, duration_sec: u64) -> Self {
        Self {
            id: new_id(),
            label: label.into(),
            duration_sec,
            notify: true,
            note: None,
        }
    }

    /// Returns the sub-timer with `notify` set as given.
    #[must_use]
    pub fn with_notify(mut self, notify: bool) -> Self {
        self.notify = notify;
        self
    }
}

// ============================================================================
// TimerSet
// ============================================================================

/// A named, ordered sequence of sub-timers run back-to-back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSet {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub timers: Vec<SubTimer>,
    /// Catalog id of the end-of-run sound, or [`SOUND_NONE`].
    #[serde(default = "default_sound")]
    pub sound: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notifications: Option<NotificationPolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl TimerSet {
    /// Creates a timer set with a fresh id and the default sound.
    #[must_use]
    pub fn new(name: impl Into<String>, timers: Vec<SubTimer>) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            name: name.into(),
            description: None,
            timers,
            sound: default_sound(),
            notifications: None,
            created_at: Some(now),
            updated_at: Some(now),
        }
    }

    /// Sets the end-of-run sound.
    #[must_use]
    pub fn with_sound(mut self, sound: impl Into<String>) -> Self {
        self.sound = sound.into();
        self
    }

    /// Sets the notification policy.
    #[must_use]
    pub fn with_notifications(mut self, policy: NotificationPolicy) -> Self {
        self.notifications = Some(policy);
        self
    }

    /// Returns a copy with a new id and a " (複製)" name suffix.
    ///
    /// The copy has no armed reminders.
    #[must_use]
    pub fn duplicate(&self) -> Self {
        let now = Utc::now();
        let mut copy = Self {
            id: new_id(),
            name: format!("{} (複製)", self.name),
            created_at: Some(now),
            updated_at: Some(now),
            ..self.clone()
        };
        if let Some(policy) = copy.notifications.as_mut() {
            policy.ids.clear();
        }
        copy
    }

    /// Number of sub-timers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.timers.len()
    }

    /// Returns true if the set has no sub-timers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Duration of the sub-timer at `index`, 0 when out of range.
    #[must_use]
    pub fn duration_at(&self, index: usize) -> u64 {
        self.timers.get(index).map_or(0, |t| t.duration_sec)
    }

    /// Sum of all sub-timer durations.
    #[must_use]
    pub fn total_duration_sec(&self) -> u64 {
        self.timers
            .iter()
            .fold(0u64, |sum, t| sum.saturating_add(t.duration_sec))
    }

    /// Sum of the durations of the sub-timers before `index`.
    #[must_use]
    pub fn cumulative_sec(&self, index: usize) -> u64 {
        self.timers
            .iter()
            .take(index)
            .fold(0u64, |sum, t| sum.saturating_add(t.duration_sec))
    }

    /// Overall progress (0.0 ..= 1.0) at `index` with `remaining_sec` left.
    #[must_use]
    pub fn progress(&self, index: usize, remaining_sec: u64) -> f64 {
        let total = self.total_duration_sec();
        if total == 0 {
            return 0.0;
        }
        let current = self.duration_at(index);
        let elapsed = self
            .cumulative_sec(index)
            .saturating_add(current.saturating_sub(remaining_sec));
        (elapsed as f64 / total as f64).clamp(0.0, 1.0)
    }

    /// Returns true if end-of-timer alerts are enabled by the set's policy.
    #[must_use]
    pub fn alerts_enabled(&self) -> bool {
        self.notifications.as_ref().is_some_and(|p| p.enabled)
    }
}

// ============================================================================
// Settings
// ============================================================================

fn default_volume() -> f32 {
    1.0
}

/// User-configurable policy that modulates the run engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Master switch for end-of-timer alerts.
    #[serde(default = "default_true")]
    pub enable_notifications: bool,
    /// Playback volume (0.0 ..= 1.0).
    #[serde(default = "default_volume")]
    pub notification_volume: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enable_notifications: true,
            notification_volume: default_volume(),
        }
    }
}

impl Settings {
    /// Returns the settings with the given volume.
    #[must_use]
    pub fn with_volume(mut self, volume: f32) -> Self {
        self.notification_volume = volume;
        self
    }

    /// Returns the settings with notifications switched on or off.
    #[must_use]
    pub fn with_notifications(mut self, enabled: bool) -> Self {
        self.enable_notifications = enabled;
        self
    }

    /// Validates the settings.
    ///
    /// Returns an error message if validation fails.
    pub fn validate(&self) -> Result<(), String> {
        if !self.notification_volume.is_finite()
            || !(0.0..=1.0).contains(&self.notification_volume)
        {
            return Err("音量は0.0-1.0の範囲で指定してください".to_string());
        }
        Ok(())
    }

    /// Volume clamped into range; non-finite values fall back to full volume.
    #[must_use]
    pub fn volume(&self) -> f32 {
        if self.notification_volume.is_finite() {
            self.notification_volume.clamp(0.0, 1.0)
        } else {
            default_volume()
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
