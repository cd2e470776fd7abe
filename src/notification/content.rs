//! Notification content construction.
//!
//! Texts for end-of-timer alerts, the persistent status line and set
//! reminders, plus a small builder used by the desktop backend.

use crate::types::format_hms;

/// Maximum length for labels shown in notifications.
const MAX_LABEL_LENGTH: usize = 100;

/// Label used when a sub-timer has no usable name.
const FALLBACK_LABEL: &str = "タイマー";

/// Title and body of a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertContent {
    pub title: String,
    pub body: String,
    /// Whether the alert should make a sound where the platform supports it.
    pub with_sound: bool,
}

/// Builder for constructing notification content.
#[derive(Debug, Default)]
pub struct AlertContentBuilder {
    title: String,
    body: String,
    with_sound: bool,
}

impl AlertContentBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    #[must_use]
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    #[must_use]
    pub fn with_sound(mut self, with_sound: bool) -> Self {
        self.with_sound = with_sound;
        self
    }

    #[must_use]
    pub fn build(self) -> AlertContent {
        AlertContent {
            title: self.title,
            body: self.body,
            with_sound: self.with_sound,
        }
    }
}

/// Sanitizes a label for use in notifications.
///
/// Returns None if nothing printable remains.
pub fn validate_label(label: &str) -> Option<String> {
    let sanitized: String = label
        .chars()
        .filter(|c| !c.is_control())
        .take(MAX_LABEL_LENGTH)
        .collect();
    let trimmed = sanitized.trim();

    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Alert shown when a sub-timer ends. The last timer's alert carries sound.
#[must_use]
pub fn end_alert_content(label: &str, is_last: bool) -> AlertContent {
    let label = validate_label(label).unwrap_or_else(|| FALLBACK_LABEL.to_string());
    AlertContentBuilder::new()
        .title("タイマー終了")
        .body(format!("{} が終了しました", label))
        .with_sound(is_last)
        .build()
}

/// Persistent status shown while a run is active.
#[must_use]
pub fn status_content(set_name: &str, label: &str, remaining_sec: u64) -> AlertContent {
    let label = validate_label(label).unwrap_or_else(|| FALLBACK_LABEL.to_string());
    AlertContentBuilder::new()
        .title(set_name)
        .body(format!("{} 残り {}", label, format_hms(remaining_sec)))
        .build()
}

/// Reminder that a timer set is due to start.
#[must_use]
pub fn reminder_content(set_name: &str) -> AlertContent {
    AlertContentBuilder::new()
        .title("タイマー通知")
        .body(format!("{}の時間です！", set_name))
        .with_sound(true)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_label() {
        assert_eq!(validate_label("集中"), Some("集中".to_string()));
        assert_eq!(validate_label("a\n\tb"), Some("ab".to_string()));
        assert_eq!(validate_label("  \n "), None);
        assert_eq!(
            validate_label(&"x".repeat(150)).map(|s| s.len()),
            Some(MAX_LABEL_LENGTH)
        );
    }

    #[test]
    fn test_end_alert_content() {
        let content = end_alert_content("休憩", false);
        assert_eq!(content.title, "タイマー終了");
        assert_eq!(content.body, "休憩 が終了しました");
        assert!(!content.with_sound);
        assert!(end_alert_content("休憩", true).with_sound);
    }

    #[test]
    fn test_end_alert_fallback_label() {
        assert_eq!(end_alert_content("", true).body, "タイマー が終了しました");
    }

    #[test]
    fn test_status_content() {
        let content = status_content("朝の運動", "ストレッチ", 3725);
        assert_eq!(content.title, "朝の運動");
        assert_eq!(content.body, "ストレッチ 残り 01:02:05");
    }

    #[test]
    fn test_reminder_content() {
        let content = reminder_content("読書");
        assert_eq!(content.title, "タイマー通知");
        assert_eq!(content.body, "読書の時間です！");
    }
}
