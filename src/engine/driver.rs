//! Async host loop for the run engine.
//!
//! [`drive`] owns the engine on the current task: it sleeps until the next
//! deadline, polls, and applies [`EngineCommand`]s as they arrive. A wake-up
//! that lands far past its deadline on the wall clock means the machine was
//! suspended, so the engine is asked to catch up instead of polled.
//!
//! The engine holds the audio output stream, which is not `Send`, so the
//! driver is awaited in place (e.g. with `tokio::join!`) rather than spawned.

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::{EngineError, RunEngine};
use crate::types::{Settings, TimerSet};

/// Lateness past a deadline that is treated as a suspension.
pub const SUSPEND_GAP_MS: u64 = 5_000;

/// Commands accepted by [`drive`].
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCommand {
    SelectSet(Option<TimerSet>),
    SelectQuick {
        duration_sec: u64,
        sound: Option<String>,
    },
    Start,
    Pause,
    ResetCurrent,
    Skip,
    Cancel,
    /// The host came back to the foreground.
    Foreground,
    UpdateSettings(Settings),
    /// Stops the loop and hands the engine back.
    Shutdown,
}

/// Applies one command to the engine.
///
/// # Errors
///
/// Returns the engine's error when it rejects the command.
pub fn apply(engine: &mut RunEngine, command: EngineCommand) -> Result<(), EngineError> {
    debug!("Command: {:?}", command);
    match command {
        EngineCommand::SelectSet(set) => engine.select_timer_set(set),
        EngineCommand::SelectQuick {
            duration_sec,
            sound,
        } => engine.select_quick_timer(duration_sec, sound.as_deref()),
        EngineCommand::Start => engine.start()?,
        EngineCommand::Pause => engine.pause()?,
        EngineCommand::ResetCurrent => engine.reset_current()?,
        EngineCommand::Skip => engine.skip()?,
        EngineCommand::Cancel => engine.cancel(),
        EngineCommand::Foreground => engine.resume_from_background(),
        EngineCommand::UpdateSettings(settings) => engine.update_settings(settings),
        EngineCommand::Shutdown => {}
    }
    Ok(())
}

/// Runs the engine until `Shutdown` is received or every sender is gone.
pub async fn drive(
    mut engine: RunEngine,
    mut commands: mpsc::UnboundedReceiver<EngineCommand>,
) -> RunEngine {
    info!("Engine driver started");

    loop {
        let deadline = engine.next_deadline_ms();
        let wait_ms = deadline.map_or(0, |due| due.saturating_sub(engine.now_ms()));

        tokio::select! {
            command = commands.recv() => match command {
                None | Some(EngineCommand::Shutdown) => break,
                Some(command) => {
                    match apply(&mut engine, command) {
                        Ok(()) => {}
                        Err(e) if e.is_state_conflict() => debug!("Ignored command: {}", e),
                        Err(e) => warn!("{}", e),
                    }
                }
            },
            () = tokio::time::sleep(Duration::from_millis(wait_ms)), if deadline.is_some() => {
                let due = deadline.unwrap_or_default();
                let now = engine.now_ms();
                if now > due + SUSPEND_GAP_MS {
                    info!("Woke {}ms late, catching up", now - due);
                    engine.resume_from_background();
                } else {
                    engine.poll();
                }
            }
        }
    }

    info!("Engine driver stopped");
    engine
}
