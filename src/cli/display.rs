//! Display utilities for the interval timer CLI.
//!
//! This module provides formatted output for:
//! - Run progress events
//! - History and settings listings
//! - Error messages

use std::io::{self, IsTerminal, Write};

use chrono::Local;

use crate::engine::RunEvent;
use crate::history::HistoryEntry;
use crate::types::{format_hms, Settings, TimerSet};

// ============================================================================
// Display
// ============================================================================

/// Display utilities for CLI output.
pub struct Display;

impl Display {
    /// Shows the timers of the set about to run.
    pub fn show_timer_set(set: &TimerSet) {
        println!("{} ({}個, 合計 {})", set.name, set.len(), format_hms(set.total_duration_sec()));
        for (i, timer) in set.timers.iter().enumerate() {
            let mark = if timer.notify { "" } else { "  (通知なし)" };
            println!("  {}. {} {}{}", i + 1, timer.label, format_hms(timer.duration_sec), mark);
        }
    }

    /// Shows the keyboard controls.
    pub fn show_controls() {
        println!("操作: p 一時停止 / s 再開 / n スキップ / r リセット / q キャンセル (Enterで確定)");
    }

    /// Shows a run event. Ticks are only drawn on a terminal.
    pub fn show_event(event: &RunEvent, status: Option<&str>) {
        if let RunEvent::Tick { .. } = event {
            if let Some(line) = status {
                Self::show_status_line(line);
            }
            return;
        }
        if let Some(line) = Self::event_line(event) {
            Self::clear_status_line();
            println!("{}", line);
        }
    }

    /// Redraws the live status line in place.
    pub fn show_status_line(line: &str) {
        let mut stdout = io::stdout();
        if !stdout.is_terminal() {
            return;
        }
        let _ = write!(stdout, "\r\x1b[2K{}", line);
        let _ = stdout.flush();
    }

    fn clear_status_line() {
        let mut stdout = io::stdout();
        if stdout.is_terminal() {
            let _ = write!(stdout, "\r\x1b[2K");
        }
    }

    /// Shows history entries, newest first.
    pub fn show_history(entries: &[HistoryEntry]) {
        if entries.is_empty() {
            println!("履歴はありません");
            return;
        }
        for entry in entries {
            println!("{}", Self::history_line(entry));
        }
    }

    /// Shows how many history entries were deleted for a set.
    pub fn show_forgotten(set_id: &str, count: usize) {
        if count == 0 {
            println!("{} の履歴はありません", set_id);
        } else {
            println!("* {} の履歴を{}件削除しました", set_id, count);
        }
    }

    /// Shows the name of a newly copied set.
    pub fn show_copied(name: &str) {
        println!("* {} を追加しました", name);
    }

    /// Shows the current settings.
    pub fn show_settings(settings: &Settings) {
        println!("設定");
        println!("─────────────────────────────");
        println!(
            "通知: {}",
            if settings.enable_notifications { "オン" } else { "オフ" }
        );
        println!("音量: {:.2}", settings.volume());
    }

    /// Shows a success message for saved settings.
    pub fn show_settings_saved() {
        println!("* 設定を保存しました");
    }

    /// Shows how many start reminders were armed for a set.
    pub fn show_reminders(set_name: &str, count: usize) {
        if count == 0 {
            println!("  {}: 予定された通知はありません", set_name);
        } else {
            println!("  {}: {}件の通知を予約しました", set_name, count);
        }
    }

    /// Shows an error message.
    pub fn show_error(message: &str) {
        eprintln!("エラー: {}", message);
    }

    /// Text for a run event; `None` for events drawn on the status line.
    #[must_use]
    pub fn event_line(event: &RunEvent) -> Option<String> {
        let line = match event {
            RunEvent::Started {
                index,
                total,
                label,
                remaining_sec,
            } => format!("> [{}/{}] {} 残り {}", index + 1, total, label, format_hms(*remaining_sec)),
            RunEvent::Tick { .. } => return None,
            RunEvent::Advanced { from, to } => format!("- {} → {}", from + 1, to + 1),
            RunEvent::Skipped { from, to } => format!(">> スキップ {} → {}", from + 1, to + 1),
            RunEvent::Paused { remaining_sec } => {
                format!("|| 一時停止 (残り {})", format_hms(*remaining_sec))
            }
            RunEvent::Reset {
                index,
                remaining_sec,
            } => format!("<< リセット {} (残り {})", index + 1, format_hms(*remaining_sec)),
            RunEvent::CaughtUp { index, completed } => {
                format!("~ 中断中に{}個のタイマーが終了しました (現在 {})", completed, index + 1)
            }
            RunEvent::Finished {
                timers_run,
                total_duration_sec,
            } => format!(
                "* すべてのタイマーが終了しました ({}個, 合計 {})",
                timers_run,
                format_hms(*total_duration_sec)
            ),
            RunEvent::Cancelled {
                timers_run,
                total_duration_sec,
            } => format!(
                "[] キャンセルしました ({}個完了, 合計 {})",
                timers_run,
                format_hms(*total_duration_sec)
            ),
        };
        Some(line)
    }

    /// One history row: start time, set name, outcome, counts.
    #[must_use]
    pub fn history_line(entry: &HistoryEntry) -> String {
        let started = entry.started_at.with_timezone(&Local).format("%Y-%m-%d %H:%M");
        let name = entry.timer_set_name.as_deref().unwrap_or("(名前なし)");
        let outcome = if entry.is_cancelled() {
            "キャンセル"
        } else if entry.is_closed() {
            "完了"
        } else {
            "実行中"
        };
        format!(
            "{}  {}  {}  {}個  {}",
            started,
            name,
            outcome,
            entry.timers_run,
            format_hms(entry.total_duration_sec)
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
