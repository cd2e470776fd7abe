//! Desktop notification backend using notify-rust.
//!
//! Each scheduled alert is a tokio task that sleeps until its fire time and
//! then shows the notification on the blocking pool. Cancelling aborts the
//! task. The persistent status is published on a `watch` channel for the
//! host to render.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Local;
use notify_rust::Notification;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::content::{end_alert_content, reminder_content, AlertContent};
use super::{AlertId, NotificationError, NotificationScheduler, PersistentStatus};
use crate::types::StartTrigger;

const APP_NAME: &str = "intervals";

/// Shows notifications on the desktop.
pub struct DesktopNotifier {
    show_popups: bool,
    alerts: Mutex<HashMap<AlertId, JoinHandle<()>>>,
    status: watch::Sender<Option<PersistentStatus>>,
}

impl DesktopNotifier {
    /// Creates a notifier.
    ///
    /// With `show_popups` false, alerts are still timed and logged but no
    /// desktop notification is shown.
    #[must_use]
    pub fn new(show_popups: bool) -> Self {
        let (status, _) = watch::channel(None);
        Self {
            show_popups,
            alerts: Mutex::new(HashMap::new()),
            status,
        }
    }

    /// Subscribes to persistent status updates.
    #[must_use]
    pub fn subscribe_status(&self) -> watch::Receiver<Option<PersistentStatus>> {
        self.status.subscribe()
    }

    /// Number of alerts that have not fired or been cancelled yet.
    #[must_use]
    pub fn pending_alerts(&self) -> usize {
        let mut alerts = self.alerts();
        alerts.retain(|_, task| !task.is_finished());
        alerts.len()
    }

    fn alerts(&self) -> MutexGuard<'_, HashMap<AlertId, JoinHandle<()>>> {
        self.alerts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn runtime() -> Result<Handle, NotificationError> {
        Handle::try_current().map_err(|e| NotificationError::InitializationFailed(e.to_string()))
    }

    fn register(&self, task: JoinHandle<()>) -> AlertId {
        let id = AlertId::generate();
        let mut alerts = self.alerts();
        alerts.retain(|_, task| !task.is_finished());
        alerts.insert(id.clone(), task);
        id
    }
}

/// Shows a notification on the blocking pool; failures are logged.
async fn show(content: AlertContent, show_popups: bool) {
    debug!("Alert: {} / {}", content.title, content.body);
    if !show_popups {
        return;
    }
    let result = tokio::task::spawn_blocking(move || {
        Notification::new()
            .summary(&content.title)
            .body(&content.body)
            .appname(APP_NAME)
            .show()
            .map(|_| ())
            .map_err(|e| NotificationError::SendFailed(e.to_string()))
    })
    .await;

    match result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("{} ({})", e, e.suggestion()),
        Err(e) => warn!("Notification task failed: {}", e),
    }
}

impl NotificationScheduler for DesktopNotifier {
    fn schedule_end_alert(
        &self,
        after_sec: u64,
        label: &str,
        is_last: bool,
    ) -> Result<AlertId, NotificationError> {
        let runtime = Self::runtime()?;
        let content = end_alert_content(label, is_last);
        let show_popups = self.show_popups;
        let task = runtime.spawn(async move {
            tokio::time::sleep(Duration::from_secs(after_sec)).await;
            show(content, show_popups).await;
        });
        let id = self.register(task);
        debug!("End alert {} scheduled in {}s", id, after_sec);
        Ok(id)
    }

    fn cancel_alerts(&self, ids: &[AlertId]) {
        let mut alerts = self.alerts();
        for id in ids {
            if let Some(task) = alerts.remove(id) {
                task.abort();
                debug!("Alert {} cancelled", id);
            }
        }
    }

    fn update_persistent_status(&self, set_name: &str, label: &str, remaining_sec: u64) {
        self.status.send_replace(Some(PersistentStatus {
            set_name: set_name.to_string(),
            label: label.to_string(),
            remaining_sec,
        }));
    }

    fn clear_persistent_status(&self) {
        self.status.send_replace(None);
    }

    fn schedule_start_alert(
        &self,
        set_name: &str,
        trigger: &StartTrigger,
    ) -> Result<AlertId, NotificationError> {
        let runtime = Self::runtime()?;
        if trigger.next_fire_after(Local::now().naive_local()).is_none() {
            return Err(NotificationError::NoUpcomingFire);
        }

        let trigger = trigger.clone();
        let set_name = set_name.to_string();
        let show_popups = self.show_popups;
        let task = runtime.spawn(async move {
            loop {
                let now = Local::now().naive_local();
                let Some(next) = trigger.next_fire_after(now) else {
                    break;
                };
                let wait = (next - now).to_std().unwrap_or_default();
                tokio::time::sleep(wait).await;
                show(reminder_content(&set_name), show_popups).await;
                if !trigger.repeats() {
                    break;
                }
            }
        });
        let id = self.register(task);
        debug!("Reminder {} scheduled", id);
        Ok(id)
    }
}

impl Drop for DesktopNotifier {
    fn drop(&mut self) {
        for (_, task) in self.alerts().drain() {
            task.abort();
        }
    }
}

impl std::fmt::Debug for DesktopNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DesktopNotifier")
            .field("show_popups", &self.show_popups)
            .field("alerts", &self.alerts().len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedule_without_runtime_fails() {
        let notifier = DesktopNotifier::new(false);
        assert!(matches!(
            notifier.schedule_end_alert(5, "集中", false),
            Err(NotificationError::InitializationFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_cancel_aborts_alert() {
        let notifier = DesktopNotifier::new(false);
        let id = notifier.schedule_end_alert(3600, "集中", false).unwrap();
        assert_eq!(notifier.pending_alerts(), 1);

        notifier.cancel_alerts(&[id]);
        assert_eq!(notifier.pending_alerts(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_alert_fires_after_delay() {
        let notifier = DesktopNotifier::new(false);
        notifier.schedule_end_alert(10, "休憩", true).unwrap();

        tokio::time::sleep(Duration::from_secs(11)).await;
        tokio::task::yield_now().await;
        assert_eq!(notifier.pending_alerts(), 0);
    }

    #[tokio::test]
    async fn test_past_one_shot_reminder_is_rejected() {
        let notifier = DesktopNotifier::new(false);
        let past = Local::now().naive_local() - chrono::Duration::days(1);
        assert!(matches!(
            notifier.schedule_start_alert("読書", &StartTrigger::Once { at: past }),
            Err(NotificationError::NoUpcomingFire)
        ));
    }

    #[tokio::test]
    async fn test_status_channel() {
        let notifier = DesktopNotifier::new(false);
        let rx = notifier.subscribe_status();

        notifier.update_persistent_status("朝", "集中", 90);
        let status = rx.borrow().clone().unwrap();
        assert_eq!(status.remaining_sec, 90);
        assert_eq!(status.line(), "朝: 集中 残り 01:30");

        notifier.clear_persistent_status();
        assert!(rx.borrow().is_none());
    }
}
