//! CLI module for the interval timer.
//!
//! This module provides the command-line interface:
//! - `commands`: Command definitions using clap derive
//! - `display`: Output formatting and display logic
//! - `runner`: Interactive host for a single run

pub mod commands;
pub mod display;
pub mod runner;

pub use commands::{
    Cli, Commands, CopyArgs, HistoryArgs, QuickArgs, RemindArgs, RunArgs, SettingsAction,
    SoundArgs,
};
pub use display::Display;
pub use runner::{parse_key, run_program, RunOptions};
