//! Run engine error types.

use thiserror::Error;

/// Rejected engine commands. State is left untouched.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum EngineError {
    /// No timer set or quick timer is selected.
    #[error("タイマーが選択されていません")]
    NothingSelected,

    /// The selected timer set has no timers.
    #[error("タイマーセットにタイマーがありません")]
    EmptyTimerSet,

    /// `start` while a countdown is already running.
    #[error("タイマーは既に実行中です")]
    AlreadyRunning,

    /// `pause` while nothing is running.
    #[error("タイマーは実行されていません")]
    NotRunning,
}

impl EngineError {
    /// Returns true if the command was a no-op for the current state
    /// rather than a missing selection.
    #[must_use]
    pub fn is_state_conflict(&self) -> bool {
        matches!(self, Self::AlreadyRunning | Self::NotRunning)
    }
}
