//! Sound system error types.
//!
//! Every variant is recoverable from the engine's point of view: a broken
//! sound asset must never stop a run, so callers log and move on.

use thiserror::Error;

use super::SoundHandle;

/// Errors that can occur in the sound playback system.
#[derive(Debug, Error)]
pub enum SoundError {
    /// Audio device is not available (e.g., no speakers connected).
    #[error("オーディオデバイスが利用できません: {0}")]
    DeviceNotAvailable(String),

    /// Sound file could not be read.
    #[error("サウンドファイルが見つかりません: {0}")]
    FileNotFound(String),

    /// Failed to decode the audio data.
    #[error("サウンドファイルのデコードに失敗しました: {0}")]
    DecodeError(String),

    /// Failed to create the audio output stream or sink.
    #[error("オーディオストリームの作成に失敗しました: {0}")]
    StreamError(String),

    /// The handle was never loaded or was already unloaded.
    #[error("サウンドハンドルが無効です: {0}")]
    UnknownHandle(SoundHandle),

    /// Generic sound playback error.
    #[error("サウンド再生エラー: {0}")]
    PlaybackError(String),
}

impl SoundError {
    /// Returns true if this error is related to device availability.
    #[must_use]
    pub fn is_device_error(&self) -> bool {
        matches!(self, Self::DeviceNotAvailable(_) | Self::StreamError(_))
    }

    /// Returns true if this error is related to the audio asset.
    #[must_use]
    pub fn is_file_error(&self) -> bool {
        matches!(self, Self::FileNotFound(_) | Self::DecodeError(_))
    }

    /// Returns true if loading should fall back to the embedded sound.
    #[must_use]
    pub fn should_fallback_to_embedded(&self) -> bool {
        self.is_file_error()
    }

    /// Returns a user-friendly suggestion for resolving this error.
    #[must_use]
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::DeviceNotAvailable(_) => "オーディオデバイスを接続してください",
            Self::FileNotFound(_) => "埋め込みサウンドで再生を試みます",
            Self::DecodeError(_) => "サウンドファイルが破損している可能性があります",
            Self::StreamError(_) => "オーディオ設定を確認してください",
            Self::UnknownHandle(_) => "サウンドを再読み込みしてください",
            Self::PlaybackError(_) => "アプリケーションを再起動してください",
        }
    }
}
