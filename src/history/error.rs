//! History ledger error types.

use thiserror::Error;

use super::EntryId;

/// Errors that can occur when closing history entries.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HistoryError {
    /// No entry with the given id exists.
    #[error("履歴エントリが見つかりません: {0}")]
    UnknownEntry(EntryId),

    /// The entry was already completed or cancelled.
    #[error("履歴エントリは既に完了しています: {0}")]
    AlreadyCompleted(EntryId),
}
