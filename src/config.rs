//! On-disk configuration and data.
//!
//! The data directory holds `settings.json` and `history.json`. It is taken
//! from `--data-dir`, then `INTERVALS_DATA_DIR`, then the platform data
//! directory (`dirs::data_dir()/intervals`). Timer sets are read from a
//! user-supplied JSON file containing one set or an array of sets.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::history::{HistoryEntry, HistoryLedger};
use crate::types::{Settings, TimerSet};

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "INTERVALS_DATA_DIR";

const APP_DIR_NAME: &str = "intervals";
const SETTINGS_FILE: &str = "settings.json";
const HISTORY_FILE: &str = "history.json";

/// Errors from reading or writing configuration and data files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("データディレクトリを特定できません")]
    NoDataDir,

    #[error("ファイルの読み書きに失敗しました: {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("JSONの解析に失敗しました: {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("設定が不正です: {0}")]
    InvalidSettings(String),

    #[error("タイマーセットがありません: {0}")]
    NoTimerSets(PathBuf),

    #[error("タイマーセットが見つかりません: {0}")]
    SetNotFound(String),
}

impl ConfigError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn parse(path: &Path, source: serde_json::Error) -> Self {
        Self::Parse {
            path: path.to_path_buf(),
            source,
        }
    }
}

// ============================================================================
// DataDir
// ============================================================================

/// Location of persisted settings and history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolves the data directory.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NoDataDir` if no source yields a directory.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Ok(Self::new(path));
        }
        if let Some(path) = std::env::var_os(DATA_DIR_ENV).filter(|v| !v.is_empty()) {
            return Ok(Self::new(path));
        }
        dirs::data_dir()
            .map(|dir| Self::new(dir.join(APP_DIR_NAME)))
            .ok_or(ConfigError::NoDataDir)
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn settings_path(&self) -> PathBuf {
        self.root.join(SETTINGS_FILE)
    }

    #[must_use]
    pub fn history_path(&self) -> PathBuf {
        self.root.join(HISTORY_FILE)
    }

    /// Loads settings, falling back to defaults when the file is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is unreadable, malformed or invalid.
    pub fn load_settings(&self) -> Result<Settings, ConfigError> {
        let settings: Settings = read_json(&self.settings_path())?.unwrap_or_default();
        settings.validate().map_err(ConfigError::InvalidSettings)?;
        Ok(settings)
    }

    /// Validates and writes settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings are invalid or cannot be written.
    pub fn save_settings(&self, settings: &Settings) -> Result<(), ConfigError> {
        settings.validate().map_err(ConfigError::InvalidSettings)?;
        write_json(&self.settings_path(), settings)
    }

    /// Loads the history ledger, empty when the file is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is unreadable or malformed.
    pub fn load_history(&self) -> Result<HistoryLedger, ConfigError> {
        let entries: Vec<HistoryEntry> = read_json(&self.history_path())?.unwrap_or_default();
        debug!("Loaded {} history entries", entries.len());
        Ok(HistoryLedger::from_entries(entries))
    }

    /// Writes the history ledger.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save_history(&self, history: &HistoryLedger) -> Result<(), ConfigError> {
        write_json(&self.history_path(), &history.entries())
    }
}

/// Reads a JSON file; `Ok(None)` when it does not exist.
fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(ConfigError::io(path, e)),
    };
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| ConfigError::parse(path, e))
}

/// Writes JSON through a temporary file so readers never see a partial file.
fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| ConfigError::io(parent, e))?;
    }
    let json = serde_json::to_string_pretty(value).map_err(|e| ConfigError::parse(path, e))?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).map_err(|e| ConfigError::io(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| ConfigError::io(path, e))?;
    debug!("Wrote {}", path.display());
    Ok(())
}

// ============================================================================
// Timer set files
// ============================================================================

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<TimerSet>),
    One(Box<TimerSet>),
}

/// Reads timer sets from a JSON file.
///
/// # Errors
///
/// Returns an error if the file is missing, malformed or holds no sets.
pub fn load_timer_sets(path: &Path) -> Result<Vec<TimerSet>, ConfigError> {
    let content = fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
    let sets = match serde_json::from_str(&content).map_err(|e| ConfigError::parse(path, e))? {
        OneOrMany::Many(sets) => sets,
        OneOrMany::One(set) => vec![*set],
    };
    if sets.is_empty() {
        return Err(ConfigError::NoTimerSets(path.to_path_buf()));
    }
    debug!("Loaded {} timer set(s) from {}", sets.len(), path.display());
    Ok(sets)
}

/// Writes timer sets back to a JSON file as an array.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn save_timer_sets(path: &Path, sets: &[TimerSet]) -> Result<(), ConfigError> {
    write_json(path, sets)
}

/// Picks a set by name or id, or the first one when no name is given.
///
/// # Errors
///
/// Returns `ConfigError::SetNotFound` if nothing matches.
pub fn pick_timer_set(sets: Vec<TimerSet>, name: Option<&str>) -> Result<TimerSet, ConfigError> {
    match name {
        None => sets
            .into_iter()
            .next()
            .ok_or_else(|| ConfigError::SetNotFound(String::new())),
        Some(name) => sets
            .into_iter()
            .find(|set| set.name == name || set.id == name)
            .ok_or_else(|| ConfigError::SetNotFound(name.to_string())),
    }
}
