//! Command definitions for the interval timer CLI.
//!
//! Uses clap derive macro for argument parsing.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::sound::{is_known_sound, TRANSITION_SOUND};
use crate::types::{parse_quick_digits, MAX_QUICK_DIGITS};

// ============================================================================
// CLI Structure
// ============================================================================

/// Interval timer CLI - run timer sets back to back
#[derive(Parser, Debug)]
#[command(
    name = "intervals",
    version,
    about = "連続インターバルタイマーCLI",
    long_about = "タイマーセット（複数のタイマーの並び）を順番に実行するターミナル用タイマー。\n\
                  実行中は p: 一時停止 / s: 開始・再開 / n: スキップ / r: リセット / q: キャンセル",
    propagate_version = true
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Directory for settings and history (default: platform data dir)
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,
}

// ============================================================================
// Subcommands
// ============================================================================

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run a timer set from a JSON file
    Run(RunArgs),

    /// Run a single quick timer (digits: last two are seconds, e.g. 130 = 1:30)
    Quick(QuickArgs),

    /// Show run history
    History(HistoryArgs),

    /// Copy a timer set into the same JSON file under a new id
    Copy(CopyArgs),

    /// Show or change settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },

    /// Arm start reminders for timer sets and wait
    Remind(RemindArgs),

    /// Generate shell completion scripts
    Completions {
        /// Shell type for completion script
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

// ============================================================================
// Command Arguments
// ============================================================================

/// Sound options shared by commands that run timers
#[derive(Args, Debug, Clone, Default)]
pub struct SoundArgs {
    /// Disable all sounds
    #[arg(long)]
    pub no_sound: bool,

    /// Directory with sound files named <id>.mp3 or <id>.wav
    #[arg(long, value_name = "DIR")]
    pub sounds_dir: Option<PathBuf>,
}

/// Arguments for the run command
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// JSON file with one timer set or an array of sets
    pub file: PathBuf,

    /// Name or id of the set to run (default: the first one)
    #[arg(short, long)]
    pub set: Option<String>,

    #[command(flatten)]
    pub sound: SoundArgs,
}

/// Arguments for the quick command
#[derive(Args, Debug, Clone)]
pub struct QuickArgs {
    /// Duration as digits, the last two being seconds (1-6 digits)
    #[arg(value_parser = parse_duration_digits)]
    pub duration: u64,

    /// Sound played at the end
    #[arg(long, default_value = "normal", value_parser = validate_sound)]
    pub end_sound: String,

    #[command(flatten)]
    pub sound: SoundArgs,
}

/// Arguments for the history command
#[derive(Args, Debug, Clone, Default)]
pub struct HistoryArgs {
    /// Print entries as JSON
    #[arg(long)]
    pub json: bool,

    /// Show at most this many entries
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,

    /// Only entries of this timer set id
    #[arg(long)]
    pub set: Option<String>,

    /// Delete every entry of this timer set id
    #[arg(long, value_name = "SET_ID", conflicts_with_all = ["json", "limit", "set"])]
    pub forget: Option<String>,
}

/// Arguments for the copy command
#[derive(Args, Debug, Clone)]
pub struct CopyArgs {
    /// JSON file with one timer set or an array of sets
    pub file: PathBuf,

    /// Name or id of the set to copy (default: the first one)
    #[arg(short, long)]
    pub set: Option<String>,
}

/// Settings subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum SettingsAction {
    /// Print current settings
    Show,

    /// Change settings
    Set {
        /// Sound volume (0.0-1.0)
        #[arg(long)]
        volume: Option<f32>,

        /// Enable or disable end-of-timer alerts
        #[arg(long)]
        notifications: Option<bool>,
    },
}

/// Arguments for the remind command
#[derive(Args, Debug, Clone)]
pub struct RemindArgs {
    /// JSON file with one timer set or an array of sets
    pub file: PathBuf,
}

// ============================================================================
// Validation Functions
// ============================================================================

/// Parses quick timer digits into seconds.
///
/// - Digits only, at most six
/// - Must not be zero
fn parse_duration_digits(s: &str) -> Result<u64, String> {
    if s.is_empty() || !s.chars().all(|c| c.is_ascii_digit()) {
        return Err("時間は数字で指定してください".to_string());
    }
    if s.len() > MAX_QUICK_DIGITS {
        return Err(format!("時間は{}桁以内で指定してください", MAX_QUICK_DIGITS));
    }
    match parse_quick_digits(s) {
        Some(seconds) if seconds > 0 => Ok(seconds),
        _ => Err("0秒のタイマーは開始できません".to_string()),
    }
}

/// Validates a catalog sound id.
fn validate_sound(s: &str) -> Result<String, String> {
    if s == TRANSITION_SOUND || !is_known_sound(s) {
        return Err(format!("不明なサウンドです: {}", s));
    }
    Ok(s.to_string())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // ------------------------------------------------------------------------
    // Cli Tests
    // ------------------------------------------------------------------------

    mod cli_tests {
        use super::*;

        #[test]
        fn test_parse_no_args() {
            let cli = Cli::parse_from(["intervals"]);
            assert!(cli.command.is_none());
            assert!(!cli.verbose);
            assert!(cli.data_dir.is_none());
        }

        #[test]
        fn test_parse_global_flags_after_subcommand() {
            let cli = Cli::parse_from(["intervals", "history", "-v", "--data-dir", "/tmp/d"]);
            assert!(cli.verbose);
            assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/d")));
        }

        #[test]
        fn test_parse_run() {
            let cli = Cli::parse_from(["intervals", "run", "sets.json", "--set", "朝", "--no-sound"]);
            match cli.command {
                Some(Commands::Run(args)) => {
                    assert_eq!(args.file, PathBuf::from("sets.json"));
                    assert_eq!(args.set.as_deref(), Some("朝"));
                    assert!(args.sound.no_sound);
                    assert!(args.sound.sounds_dir.is_none());
                }
                _ => panic!("Expected Run command"),
            }
        }

        #[test]
        fn test_parse_quick() {
            let cli = Cli::parse_from(["intervals", "quick", "130", "--end-sound", "chime"]);
            match cli.command {
                Some(Commands::Quick(args)) => {
                    assert_eq!(args.duration, 90);
                    assert_eq!(args.end_sound, "chime");
                }
                _ => panic!("Expected Quick command"),
            }
        }

        #[test]
        fn test_parse_quick_rejects_bad_input() {
            assert!(Cli::try_parse_from(["intervals", "quick", "0"]).is_err());
            assert!(Cli::try_parse_from(["intervals", "quick", "1234567"]).is_err());
            assert!(Cli::try_parse_from(["intervals", "quick", "1:30"]).is_err());
            assert!(Cli::try_parse_from(["intervals", "quick", "5", "--end-sound", "beep"]).is_err());
        }

        #[test]
        fn test_parse_history() {
            let cli = Cli::parse_from(["intervals", "history", "--json", "-n", "5"]);
            match cli.command {
                Some(Commands::History(args)) => {
                    assert!(args.json);
                    assert_eq!(args.limit, Some(5));
                }
                _ => panic!("Expected History command"),
            }
        }

        #[test]
        fn test_parse_settings_set() {
            let cli = Cli::parse_from([
                "intervals",
                "settings",
                "set",
                "--volume",
                "0.5",
                "--notifications",
                "false",
            ]);
            match cli.command {
                Some(Commands::Settings {
                    action:
                        SettingsAction::Set {
                            volume,
                            notifications,
                        },
                }) => {
                    assert_eq!(volume, Some(0.5));
                    assert_eq!(notifications, Some(false));
                }
                _ => panic!("Expected Settings Set command"),
            }
        }

        #[test]
        fn test_parse_completions() {
            let cli = Cli::parse_from(["intervals", "completions", "bash"]);
            assert!(matches!(
                cli.command,
                Some(Commands::Completions {
                    shell: clap_complete::Shell::Bash
                })
            ));
        }
    }

    // ------------------------------------------------------------------------
    // Validation Tests
    // ------------------------------------------------------------------------

    mod validation_tests {
        use super::*;

        #[test]
        fn test_parse_duration_digits() {
            assert_eq!(parse_duration_digits("5"), Ok(5));
            assert_eq!(parse_duration_digits("130"), Ok(90));
            assert_eq!(parse_duration_digits("999999"), Ok(9999 * 60 + 99));
            assert!(parse_duration_digits("").is_err());
            assert!(parse_duration_digits("00").is_err());
            assert!(parse_duration_digits("12a").is_err());
        }

        #[test]
        fn test_validate_sound() {
            assert_eq!(validate_sound("taiko"), Ok("taiko".to_string()));
            assert_eq!(validate_sound("none"), Ok("none".to_string()));
            assert!(validate_sound("beep").is_err());
            assert!(validate_sound("kazoo").is_err());
        }
    }
}
