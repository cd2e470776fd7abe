//! Notification system error types.

use thiserror::Error;

/// Errors that can occur in the notification system.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// Failed to schedule or show a notification.
    #[error("通知の送信に失敗しました: {0}")]
    SendFailed(String),

    /// A trigger never fires again, so nothing was scheduled.
    #[error("通知の予定時刻がありません")]
    NoUpcomingFire,

    /// No async runtime is available to run the alert timer.
    #[error("通知システムの初期化に失敗しました: {0}")]
    InitializationFailed(String),

    /// The notification service is not available.
    #[error("通知センターが利用できません")]
    NotAvailable,
}

impl NotificationError {
    /// Returns a user-friendly suggestion for resolving this error.
    #[must_use]
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::SendFailed(_) => "通知デーモンが動作しているか確認してください",
            Self::NoUpcomingFire => "通知の日時と繰り返し設定を確認してください",
            Self::InitializationFailed(_) => "アプリケーションを再起動してください",
            Self::NotAvailable => "デスクトップ通知に対応した環境で実行してください",
        }
    }
}
