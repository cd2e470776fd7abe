//! Interactive host for one run.
//!
//! Wires the engine to real ports, reads single-letter commands from stdin
//! on a plain thread and renders events until the run finishes or is
//! cancelled. History is written back to the data directory afterwards.

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, watch};
use tracing::{debug, trace, warn};

use super::display::Display;
use crate::config::DataDir;
use crate::engine::driver::{drive, EngineCommand};
use crate::engine::{EnginePorts, RunEngine, RunEvent, SystemClock};
use crate::notification::{DesktopNotifier, PersistentStatus};
use crate::sound::{try_create_player, SilentSoundPlayer, SoundCatalog, SoundPlayer};

/// How a run is hosted.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub no_sound: bool,
    pub sounds_dir: Option<PathBuf>,
}

/// Maps one line of keyboard input to a command.
#[must_use]
pub fn parse_key(line: &str) -> Option<EngineCommand> {
    match line.trim().to_ascii_lowercase().as_str() {
        "p" => Some(EngineCommand::Pause),
        "s" | "" => Some(EngineCommand::Start),
        "n" => Some(EngineCommand::Skip),
        "r" => Some(EngineCommand::ResetCurrent),
        "q" => Some(EngineCommand::Cancel),
        _ => None,
    }
}

fn sound_player(options: &RunOptions) -> Box<dyn SoundPlayer> {
    if options.no_sound {
        return Box::new(SilentSoundPlayer::new());
    }
    let catalog = options
        .sounds_dir
        .as_ref()
        .map_or_else(SoundCatalog::embedded_only, SoundCatalog::with_dir);
    match try_create_player(catalog) {
        Some(player) => Box::new(player),
        None => {
            warn!("Audio output unavailable, running without sound");
            Box::new(SilentSoundPlayer::new())
        }
    }
}

/// Forwards stdin lines as commands until input closes.
fn spawn_keyboard(commands: mpsc::UnboundedSender<EngineCommand>) {
    let spawned = std::thread::Builder::new()
        .name("keyboard".to_string())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                match parse_key(&line) {
                    Some(command) => {
                        if !send(&commands, command) {
                            break;
                        }
                    }
                    None => Display::show_controls(),
                }
            }
            debug!("Keyboard input closed");
        });
    if let Err(e) = spawned {
        warn!("Failed to start keyboard thread: {}", e);
    }
}

/// Renders events until a terminal one arrives and returns it.
async fn render(
    mut events: mpsc::UnboundedReceiver<RunEvent>,
    status: watch::Receiver<Option<PersistentStatus>>,
    commands: mpsc::UnboundedSender<EngineCommand>,
) -> Option<RunEvent> {
    let mut terminal = None;
    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                let line = status.borrow().as_ref().map(PersistentStatus::line);
                Display::show_event(&event, line.as_deref());
                if event.is_terminal() {
                    terminal = Some(event);
                    break;
                }
            }
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    warn!("Failed to listen for Ctrl-C: {}", e);
                    break;
                }
                send(&commands, EngineCommand::Cancel);
            }
        }
    }
    send(&commands, EngineCommand::Shutdown);
    terminal
}

/// Sends a command to the driver; a stopped driver only gets a trace.
fn send(commands: &mpsc::UnboundedSender<EngineCommand>, command: EngineCommand) -> bool {
    match commands.send(command) {
        Ok(()) => true,
        Err(e) => {
            trace!("Engine driver already stopped, dropped {:?}", e.0);
            false
        }
    }
}

/// Runs the selected program to its end and saves history.
///
/// `selection` is the command that picks the set or quick timer.
///
/// # Errors
///
/// Returns an error if settings or history cannot be read or written.
pub async fn run_program(
    data_dir: &DataDir,
    selection: EngineCommand,
    options: &RunOptions,
) -> Result<Option<RunEvent>> {
    let settings = data_dir.load_settings().context("設定の読み込みに失敗しました")?;
    let history = data_dir.load_history().context("履歴の読み込みに失敗しました")?;
    if let EngineCommand::SelectSet(Some(set)) = &selection {
        history.snapshot_set_name(&set.id, &set.name);
    }

    let notifier = Arc::new(DesktopNotifier::new(true));
    let status = notifier.subscribe_status();
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let engine = RunEngine::new(
        EnginePorts {
            clock: Arc::new(SystemClock),
            sound: sound_player(options),
            notifier: Box::new(notifier),
            history: history.clone(),
        },
        settings,
        event_tx,
    );

    let (command_tx, command_rx) = mpsc::unbounded_channel();
    command_tx
        .send(selection)
        .and_then(|()| command_tx.send(EngineCommand::Start))
        .context("タイマーを開始できませんでした")?;

    Display::show_controls();
    spawn_keyboard(command_tx.clone());

    let (engine, terminal) = tokio::join!(
        drive(engine, command_rx),
        render(event_rx, status, command_tx)
    );
    drop(engine);

    data_dir
        .save_history(&history)
        .context("履歴の保存に失敗しました")?;
    Ok(terminal)
}
