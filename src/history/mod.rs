//! Append-only history of run attempts.
//!
//! One [`HistoryEntry`] is opened when a run starts and closed exactly once
//! when it completes or is cancelled. Closed entries are never touched
//! again; the only later change is filling in a missing set name when the
//! set itself is deleted, so old entries stay readable.
//!
//! The ledger is a cheap handle around shared storage: the run engine keeps
//! one clone to log into while the host keeps another to read and persist.

mod error;

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use error::HistoryError;

/// Identifier of a history entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(String);

impl EntryId {
    /// Generates a fresh random id.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EntryId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Persisted record of one run's outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: EntryId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timer_set_id: Option<String>,
    /// Set name snapshot, kept so entries outlive their set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timer_set_name: Option<String>,
    pub timers_run: u32,
    pub total_duration_sec: u64,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled: Option<bool>,
}

impl HistoryEntry {
    /// Returns true once the entry has been completed or cancelled.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.completed_at.is_some()
    }

    /// Returns true if the run was cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled == Some(true)
    }
}

/// Final figures reported when a run ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOutcome {
    pub cancelled: bool,
    pub total_duration_sec: u64,
    pub timers_run: u32,
}

impl RunOutcome {
    #[must_use]
    pub fn completed(timers_run: u32, total_duration_sec: u64) -> Self {
        Self {
            cancelled: false,
            total_duration_sec,
            timers_run,
        }
    }

    #[must_use]
    pub fn cancelled(timers_run: u32, total_duration_sec: u64) -> Self {
        Self {
            cancelled: true,
            total_duration_sec,
            timers_run,
        }
    }
}

/// Shared, append-only ledger of history entries (newest first).
#[derive(Debug, Clone, Default)]
pub struct HistoryLedger {
    entries: Arc<Mutex<Vec<HistoryEntry>>>,
}

impl HistoryLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a ledger from previously persisted entries.
    #[must_use]
    pub fn from_entries(entries: Vec<HistoryEntry>) -> Self {
        Self {
            entries: Arc::new(Mutex::new(entries)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<HistoryEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Opens a new entry for a run and returns its id.
    pub fn log_start(&self, timer_set_id: Option<&str>, timer_set_name: Option<&str>) -> EntryId {
        let id = EntryId::generate();
        let entry = HistoryEntry {
            id: id.clone(),
            timer_set_id: timer_set_id.map(String::from),
            timer_set_name: timer_set_name.map(String::from),
            timers_run: 0,
            total_duration_sec: 0,
            started_at: Utc::now(),
            completed_at: None,
            cancelled: None,
        };
        self.lock().insert(0, entry);
        tracing::debug!("History entry opened: {}", id);
        id
    }

    /// Closes an open entry with the run's final figures.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry does not exist or was already closed.
    pub fn log_complete(&self, id: &EntryId, outcome: RunOutcome) -> Result<(), HistoryError> {
        let mut entries = self.lock();
        let entry = entries
            .iter_mut()
            .find(|e| &e.id == id)
            .ok_or_else(|| HistoryError::UnknownEntry(id.clone()))?;
        if entry.is_closed() {
            return Err(HistoryError::AlreadyCompleted(id.clone()));
        }
        entry.completed_at = Some(Utc::now());
        entry.cancelled = outcome.cancelled.then_some(true);
        entry.total_duration_sec = outcome.total_duration_sec;
        entry.timers_run = outcome.timers_run;
        tracing::debug!(
            "History entry closed: {} (cancelled: {}, timers: {}, seconds: {})",
            id,
            outcome.cancelled,
            outcome.timers_run,
            outcome.total_duration_sec
        );
        Ok(())
    }

    /// Returns a copy of the entry with the given id.
    #[must_use]
    pub fn get(&self, id: &EntryId) -> Option<HistoryEntry> {
        self.lock().iter().find(|e| &e.id == id).cloned()
    }

    /// Returns a copy of all entries, newest first.
    #[must_use]
    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.lock().clone()
    }

    /// Returns the entries recorded for one timer set.
    #[must_use]
    pub fn entries_for_set(&self, timer_set_id: &str) -> Vec<HistoryEntry> {
        self.lock()
            .iter()
            .filter(|e| e.timer_set_id.as_deref() == Some(timer_set_id))
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Records the set name on entries that lack one, before the set goes away.
    pub fn snapshot_set_name(&self, timer_set_id: &str, name: &str) {
        for entry in self
            .lock()
            .iter_mut()
            .filter(|e| e.timer_set_id.as_deref() == Some(timer_set_id))
        {
            if entry.timer_set_name.is_none() {
                entry.timer_set_name = Some(name.to_string());
            }
        }
    }

    /// Drops every entry of a deleted set. Returns how many were removed.
    pub fn remove_by_set(&self, timer_set_id: &str) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|e| e.timer_set_id.as_deref() != Some(timer_set_id));
        before - entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod ledger_tests {
        use super::*;

        #[test]
        fn test_log_start_opens_entry() {
            let ledger = HistoryLedger::new();
            let id = ledger.log_start(Some("set-1"), Some("朝の運動"));

            let entry = ledger.get(&id).unwrap();
            assert_eq!(entry.timer_set_id.as_deref(), Some("set-1"));
            assert_eq!(entry.timer_set_name.as_deref(), Some("朝の運動"));
            assert_eq!(entry.timers_run, 0);
            assert!(!entry.is_closed());
            assert!(!entry.is_cancelled());
        }

        #[test]
        fn test_newest_first() {
            let ledger = HistoryLedger::new();
            let first = ledger.log_start(Some("a"), None);
            let second = ledger.log_start(Some("b"), None);
            let entries = ledger.entries();
            assert_eq!(entries[0].id, second);
            assert_eq!(entries[1].id, first);
        }

        #[test]
        fn test_log_complete() {
            let ledger = HistoryLedger::new();
            let id = ledger.log_start(Some("set-1"), None);
            ledger
                .log_complete(&id, RunOutcome::completed(2, 1800))
                .unwrap();

            let entry = ledger.get(&id).unwrap();
            assert!(entry.is_closed());
            assert_eq!(entry.cancelled, None);
            assert_eq!(entry.timers_run, 2);
            assert_eq!(entry.total_duration_sec, 1800);
        }

        #[test]
        fn test_log_cancelled() {
            let ledger = HistoryLedger::new();
            let id = ledger.log_start(None, None);
            ledger
                .log_complete(&id, RunOutcome::cancelled(1, 60))
                .unwrap();
            assert!(ledger.get(&id).unwrap().is_cancelled());
        }

        #[test]
        fn test_complete_twice_is_rejected() {
            let ledger = HistoryLedger::new();
            let id = ledger.log_start(None, None);
            ledger
                .log_complete(&id, RunOutcome::completed(1, 10))
                .unwrap();
            let err = ledger
                .log_complete(&id, RunOutcome::cancelled(5, 99))
                .unwrap_err();
            assert_eq!(err, HistoryError::AlreadyCompleted(id.clone()));

            // The first outcome stands.
            let entry = ledger.get(&id).unwrap();
            assert_eq!(entry.timers_run, 1);
            assert!(!entry.is_cancelled());
        }

        #[test]
        fn test_complete_unknown() {
            let ledger = HistoryLedger::new();
            let id = EntryId::from("missing");
            assert_eq!(
                ledger.log_complete(&id, RunOutcome::completed(0, 0)),
                Err(HistoryError::UnknownEntry(id))
            );
        }

        #[test]
        fn test_clones_share_storage() {
            let ledger = HistoryLedger::new();
            let reader = ledger.clone();
            ledger.log_start(None, None);
            assert_eq!(reader.len(), 1);
        }
    }

    mod deleted_set_tests {
        use super::*;

        #[test]
        fn test_snapshot_fills_missing_names_only() {
            let ledger = HistoryLedger::new();
            let unnamed = ledger.log_start(Some("s"), None);
            let named = ledger.log_start(Some("s"), Some("旧名"));
            let other = ledger.log_start(Some("t"), None);

            ledger.snapshot_set_name("s", "新名");

            assert_eq!(
                ledger.get(&unnamed).unwrap().timer_set_name.as_deref(),
                Some("新名")
            );
            assert_eq!(
                ledger.get(&named).unwrap().timer_set_name.as_deref(),
                Some("旧名")
            );
            assert_eq!(ledger.get(&other).unwrap().timer_set_name, None);
        }

        #[test]
        fn test_remove_by_set() {
            let ledger = HistoryLedger::new();
            ledger.log_start(Some("s"), None);
            ledger.log_start(Some("s"), None);
            ledger.log_start(Some("t"), None);

            assert_eq!(ledger.remove_by_set("s"), 2);
            assert_eq!(ledger.len(), 1);
            assert_eq!(ledger.entries_for_set("t").len(), 1);
            assert!(ledger.entries_for_set("s").is_empty());
        }
    }

    #[test]
    fn test_entry_serialization_shape() {
        let ledger = HistoryLedger::new();
        let id = ledger.log_start(Some("s"), Some("name"));
        ledger
            .log_complete(&id, RunOutcome::cancelled(1, 30))
            .unwrap();
        let json = serde_json::to_value(ledger.get(&id).unwrap()).unwrap();
        assert_eq!(json["timerSetId"], "s");
        assert_eq!(json["timersRun"], 1);
        assert_eq!(json["totalDurationSec"], 30);
        assert_eq!(json["cancelled"], true);
        assert!(json["startedAt"].is_string());
    }
}
