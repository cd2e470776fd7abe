//! Intervals Library
//!
//! This library provides the core functionality for the intervals CLI.
//! It includes:
//! - Run engine that counts timer sets down on the wall clock
//! - Async driver that hosts the engine and catches up after suspension
//! - Sound playback for transitions and end-of-run
//! - Desktop alerts, start reminders and a live status line
//! - Run history and settings stored as JSON
//! - CLI command parsing and display utilities

pub mod cli;
pub mod config;
pub mod engine;
pub mod history;
pub mod notification;
pub mod sound;
pub mod types;

// Re-export commonly used types for convenience
pub use types::{
    format_hms, parse_quick_digits, NotificationPolicy, RepeatRule, RepeatUnit, Settings,
    StartTrigger, SubTimer, TimerSet,
};

// Re-export engine types
pub use engine::driver::{drive, EngineCommand};
pub use engine::{
    Clock, EngineError, EnginePorts, ManualClock, RunEngine, RunEvent, RunState, SystemClock,
};

// Re-export history types
pub use history::{EntryId, HistoryEntry, HistoryError, HistoryLedger, RunOutcome};

// Re-export notification types
pub use notification::{
    AlertId, DesktopNotifier, MockNotificationScheduler, NotificationError,
    NotificationScheduler, PersistentStatus,
};

// Re-export sound types
pub use sound::{
    MockSoundPlayer, RodioSoundPlayer, SilentSoundPlayer, SoundCatalog, SoundError,
    SoundHandle, SoundPlayer, SoundSource,
};

// Re-export config types
pub use config::{ConfigError, DataDir};
