//! Notifications for timer runs.
//!
//! Three kinds of notification exist:
//!
//! - End alerts, scheduled when a sub-timer starts counting down and
//!   cancelled on pause, cancel or reselection
//! - A persistent status ("<label> 残り <time>") kept up to date during a run
//! - Start reminders for timer sets, driven by a set's [`NotificationPolicy`]
//!
//! The run engine talks to the [`NotificationScheduler`] port only.
//! [`DesktopNotifier`] is the notify-rust backend used by the CLI.

mod content;
mod desktop;
pub mod error;

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::NaiveDateTime;

pub use self::content::{
    end_alert_content, reminder_content, status_content, validate_label, AlertContent,
    AlertContentBuilder,
};
pub use self::desktop::DesktopNotifier;
pub use self::error::NotificationError;

use crate::types::{NotificationPolicy, StartTrigger, TimerSet};

/// Identifier of a scheduled alert.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AlertId(String);

impl AlertId {
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for AlertId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for AlertId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Status shown for the running sub-timer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistentStatus {
    pub set_name: String,
    pub label: String,
    pub remaining_sec: u64,
}

impl PersistentStatus {
    /// One-line rendering, e.g. `朝: 集中 残り 01:30`.
    #[must_use]
    pub fn line(&self) -> String {
        let content = status_content(&self.set_name, &self.label, self.remaining_sec);
        format!("{}: {}", content.title, content.body)
    }
}

/// Port for scheduling and cancelling notifications.
pub trait NotificationScheduler {
    /// Schedules the end-of-timer alert `after_sec` seconds from now.
    ///
    /// # Errors
    ///
    /// Returns an error if the alert could not be scheduled.
    fn schedule_end_alert(
        &self,
        after_sec: u64,
        label: &str,
        is_last: bool,
    ) -> Result<AlertId, NotificationError>;

    /// Cancels scheduled alerts. Unknown ids are ignored.
    fn cancel_alerts(&self, ids: &[AlertId]);

    /// Shows or replaces the persistent status.
    fn update_persistent_status(&self, set_name: &str, label: &str, remaining_sec: u64);

    /// Removes the persistent status.
    fn clear_persistent_status(&self);

    /// Schedules a start reminder for a timer set.
    ///
    /// # Errors
    ///
    /// Returns an error if the trigger never fires or scheduling failed.
    fn schedule_start_alert(
        &self,
        set_name: &str,
        trigger: &StartTrigger,
    ) -> Result<AlertId, NotificationError>;
}

impl<T: NotificationScheduler + ?Sized> NotificationScheduler for Arc<T> {
    fn schedule_end_alert(
        &self,
        after_sec: u64,
        label: &str,
        is_last: bool,
    ) -> Result<AlertId, NotificationError> {
        (**self).schedule_end_alert(after_sec, label, is_last)
    }

    fn cancel_alerts(&self, ids: &[AlertId]) {
        (**self).cancel_alerts(ids);
    }

    fn update_persistent_status(&self, set_name: &str, label: &str, remaining_sec: u64) {
        (**self).update_persistent_status(set_name, label, remaining_sec);
    }

    fn clear_persistent_status(&self) {
        (**self).clear_persistent_status();
    }

    fn schedule_start_alert(
        &self,
        set_name: &str,
        trigger: &StartTrigger,
    ) -> Result<AlertId, NotificationError> {
        (**self).schedule_start_alert(set_name, trigger)
    }
}

// ============================================================================
// Set reminders
// ============================================================================

/// Re-arms the start reminders of a timer set.
///
/// Previously armed reminders are cancelled first. The ids of the new ones
/// are stored on the set's policy. Returns how many were scheduled.
pub fn schedule_set_reminders<N>(scheduler: &N, set: &mut TimerSet, now: NaiveDateTime) -> usize
where
    N: NotificationScheduler + ?Sized,
{
    cancel_set_reminders(scheduler, set);
    let Some(policy) = set.notifications.as_mut() else {
        return 0;
    };

    for trigger in policy.triggers(now) {
        match scheduler.schedule_start_alert(&set.name, &trigger) {
            Ok(id) => policy.ids.push(id.to_string()),
            Err(e) => tracing::warn!("Failed to schedule reminder for '{}': {}", set.name, e),
        }
    }
    tracing::debug!("{} reminder(s) armed for '{}'", policy.ids.len(), set.name);
    policy.ids.len()
}

/// Cancels every reminder armed for a timer set and forgets their ids.
pub fn cancel_set_reminders<N>(scheduler: &N, set: &mut TimerSet)
where
    N: NotificationScheduler + ?Sized,
{
    if let Some(policy) = set.notifications.as_mut() {
        cancel_policy_ids(scheduler, policy);
    }
}

fn cancel_policy_ids<N>(scheduler: &N, policy: &mut NotificationPolicy)
where
    N: NotificationScheduler + ?Sized,
{
    if policy.ids.is_empty() {
        return;
    }
    let ids: Vec<AlertId> = policy.ids.drain(..).map(AlertId::from).collect();
    scheduler.cancel_alerts(&ids);
}

// ============================================================================
// Mock
// ============================================================================

/// Alert recorded by [`MockNotificationScheduler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduledAlert {
    End {
        after_sec: u64,
        label: String,
        is_last: bool,
    },
    Start {
        set_name: String,
        trigger: StartTrigger,
    },
}

#[derive(Debug, Default)]
struct MockState {
    scheduled: Vec<(AlertId, ScheduledAlert)>,
    cancelled: Vec<AlertId>,
    status: Option<PersistentStatus>,
    status_updates: usize,
    status_clears: usize,
}

/// Mock notification scheduler for testing.
#[derive(Debug, Default)]
pub struct MockNotificationScheduler {
    state: Mutex<MockState>,
    should_fail: AtomicBool,
}

impl MockNotificationScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_should_fail(&self, should_fail: bool) {
        self.should_fail.store(should_fail, Ordering::SeqCst);
    }

    /// Every alert ever scheduled, in order.
    #[must_use]
    pub fn scheduled(&self) -> Vec<(AlertId, ScheduledAlert)> {
        self.state().scheduled.clone()
    }

    /// End alerts that were scheduled and not cancelled.
    #[must_use]
    pub fn active_end_alerts(&self) -> Vec<ScheduledAlert> {
        let state = self.state();
        state
            .scheduled
            .iter()
            .filter(|(id, alert)| {
                matches!(alert, ScheduledAlert::End { .. }) && !state.cancelled.contains(id)
            })
            .map(|(_, alert)| alert.clone())
            .collect()
    }

    #[must_use]
    pub fn end_alert_count(&self) -> usize {
        self.state()
            .scheduled
            .iter()
            .filter(|(_, alert)| matches!(alert, ScheduledAlert::End { .. }))
            .count()
    }

    #[must_use]
    pub fn cancelled(&self) -> Vec<AlertId> {
        self.state().cancelled.clone()
    }

    #[must_use]
    pub fn status(&self) -> Option<PersistentStatus> {
        self.state().status.clone()
    }

    #[must_use]
    pub fn status_updates(&self) -> usize {
        self.state().status_updates
    }

    #[must_use]
    pub fn status_clears(&self) -> usize {
        self.state().status_clears
    }

    fn push(&self, alert: ScheduledAlert) -> Result<AlertId, NotificationError> {
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(NotificationError::SendFailed("mock failure".to_string()));
        }
        let id = AlertId::generate();
        self.state().scheduled.push((id.clone(), alert));
        Ok(id)
    }
}

impl NotificationScheduler for MockNotificationScheduler {
    fn schedule_end_alert(
        &self,
        after_sec: u64,
        label: &str,
        is_last: bool,
    ) -> Result<AlertId, NotificationError> {
        self.push(ScheduledAlert::End {
            after_sec,
            label: label.to_string(),
            is_last,
        })
    }

    fn cancel_alerts(&self, ids: &[AlertId]) {
        self.state().cancelled.extend(ids.iter().cloned());
    }

    fn update_persistent_status(&self, set_name: &str, label: &str, remaining_sec: u64) {
        let mut state = self.state();
        state.status = Some(PersistentStatus {
            set_name: set_name.to_string(),
            label: label.to_string(),
            remaining_sec,
        });
        state.status_updates += 1;
    }

    fn clear_persistent_status(&self) {
        let mut state = self.state();
        state.status = None;
        state.status_clears += 1;
    }

    fn schedule_start_alert(
        &self,
        set_name: &str,
        trigger: &StartTrigger,
    ) -> Result<AlertId, NotificationError> {
        self.push(ScheduledAlert::Start {
            set_name: set_name.to_string(),
            trigger: trigger.clone(),
        })
    }
}
