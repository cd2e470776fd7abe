//! Sound playback for timer transitions and run completion.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │   SoundPlayer    │ ← Port used by the run engine
//! └────────┬─────────┘
//!          │ load(id) → SoundHandle
//!          ▼
//! ┌──────────────────┐     ┌──────────────────┐
//! │   SoundCatalog   │────▶│ Installed files  │
//! │                  │     │ (<dir>/<id>.mp3) │
//! │                  │     ├──────────────────┤
//! │                  │────▶│ Embedded sounds  │
//! └──────────────────┘     │  (fallback)      │
//!                          └──────────────────┘
//! ```
//!
//! The engine loads two handles per selection: the transition beep and the
//! set's own end-of-run sound. Failures are logged and never stop a run.

mod embedded;
mod error;
mod player;
mod source;

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub use embedded::{get_embedded_sound, synthesize_tone, BEEP_DURATION_MS, CHIME_DURATION_MS};
pub use error::SoundError;
pub use player::{try_create_player, RodioSoundPlayer};
pub use source::{is_known_sound, SoundCatalog, SoundSource, SOUND_OPTIONS};

/// Sound id played between timers.
pub const TRANSITION_SOUND: &str = "beep";

/// Opaque handle to a loaded sound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SoundHandle(pub u64);

impl fmt::Display for SoundHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sound#{}", self.0)
    }
}

/// Trait for sound playback implementations.
///
/// Playback must be non-blocking. `stop`, `unload` and `set_volume` ignore
/// handles they do not know.
pub trait SoundPlayer {
    /// Loads a catalog sound and returns a handle to it.
    ///
    /// # Errors
    ///
    /// Returns an error if the sound cannot be loaded (including `"none"`).
    fn load(&self, sound_id: &str) -> Result<SoundHandle, SoundError>;

    /// Starts playing a loaded sound from the beginning.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle is unknown or playback fails.
    fn play(&self, handle: SoundHandle) -> Result<(), SoundError>;

    /// Stops a playing sound.
    fn stop(&self, handle: SoundHandle);

    /// Releases a loaded sound.
    fn unload(&self, handle: SoundHandle);

    /// Sets playback volume in `0.0..=1.0`.
    fn set_volume(&self, handle: SoundHandle, volume: f32);

    /// Returns how long the sound plays, if known.
    fn playback_duration_ms(&self, handle: SoundHandle) -> Option<u64>;
}

impl<T: SoundPlayer + ?Sized> SoundPlayer for Arc<T> {
    fn load(&self, sound_id: &str) -> Result<SoundHandle, SoundError> {
        (**self).load(sound_id)
    }

    fn play(&self, handle: SoundHandle) -> Result<(), SoundError> {
        (**self).play(handle)
    }

    fn stop(&self, handle: SoundHandle) {
        (**self).stop(handle);
    }

    fn unload(&self, handle: SoundHandle) {
        (**self).unload(handle);
    }

    fn set_volume(&self, handle: SoundHandle, volume: f32) {
        (**self).set_volume(handle, volume);
    }

    fn playback_duration_ms(&self, handle: SoundHandle) -> Option<u64> {
        (**self).playback_duration_ms(handle)
    }
}

/// Player that accepts every call and produces no sound.
///
/// Used with `--no-sound` and when no audio device is present.
#[derive(Debug, Default)]
pub struct SilentSoundPlayer {
    next_handle: AtomicU64,
}

impl SilentSoundPlayer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SoundPlayer for SilentSoundPlayer {
    fn load(&self, sound_id: &str) -> Result<SoundHandle, SoundError> {
        tracing::trace!("Silent player: load '{}'", sound_id);
        Ok(SoundHandle(self.next_handle.fetch_add(1, Ordering::Relaxed)))
    }

    fn play(&self, _handle: SoundHandle) -> Result<(), SoundError> {
        Ok(())
    }

    fn stop(&self, _handle: SoundHandle) {}

    fn unload(&self, _handle: SoundHandle) {}

    fn set_volume(&self, _handle: SoundHandle, _volume: f32) {}

    fn playback_duration_ms(&self, _handle: SoundHandle) -> Option<u64> {
        None
    }
}

/// A call observed by [`MockSoundPlayer`], keyed by sound id.
#[derive(Debug, Clone, PartialEq)]
pub enum SoundCall {
    Load(String),
    Play(String),
    Stop(String),
    Unload(String),
    SetVolume(String, f32),
}

#[derive(Debug, Default)]
struct MockState {
    calls: Vec<SoundCall>,
    loaded: HashMap<SoundHandle, String>,
    durations: HashMap<String, u64>,
    next_handle: u64,
}

/// Mock sound player for testing.
#[derive(Debug, Default)]
pub struct MockSoundPlayer {
    state: Mutex<MockState>,
    should_fail: AtomicBool,
}

impl MockSoundPlayer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Makes `load` and `play` fail.
    pub fn set_should_fail(&self, should_fail: bool) {
        self.should_fail.store(should_fail, Ordering::SeqCst);
    }

    /// Sets the playback duration reported for a sound id.
    pub fn set_duration(&self, sound_id: &str, duration_ms: u64) {
        self.state()
            .durations
            .insert(sound_id.to_string(), duration_ms);
    }

    #[must_use]
    pub fn calls(&self) -> Vec<SoundCall> {
        self.state().calls.clone()
    }

    /// Ids of sounds played, in order.
    #[must_use]
    pub fn played(&self) -> Vec<String> {
        self.state()
            .calls
            .iter()
            .filter_map(|call| match call {
                SoundCall::Play(id) => Some(id.clone()),
                _ => None,
            })
            .collect()
    }

    #[must_use]
    pub fn play_count(&self) -> usize {
        self.played().len()
    }

    /// Ids currently loaded, sorted.
    #[must_use]
    pub fn loaded(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.state().loaded.values().cloned().collect();
        ids.sort();
        ids
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    fn fail(&self) -> bool {
        self.should_fail.load(Ordering::SeqCst)
    }

    fn record(&self, handle: SoundHandle, call: impl FnOnce(String) -> SoundCall) {
        let mut state = self.state();
        if let Some(id) = state.loaded.get(&handle).cloned() {
            state.calls.push(call(id));
        }
    }
}

impl SoundPlayer for MockSoundPlayer {
    fn load(&self, sound_id: &str) -> Result<SoundHandle, SoundError> {
        if self.fail() {
            return Err(SoundError::FileNotFound(sound_id.to_string()));
        }
        let mut state = self.state();
        state.next_handle += 1;
        let handle = SoundHandle(state.next_handle);
        state.loaded.insert(handle, sound_id.to_string());
        state.calls.push(SoundCall::Load(sound_id.to_string()));
        Ok(handle)
    }

    fn play(&self, handle: SoundHandle) -> Result<(), SoundError> {
        if self.fail() {
            return Err(SoundError::PlaybackError("mock failure".to_string()));
        }
        if !self.state().loaded.contains_key(&handle) {
            return Err(SoundError::UnknownHandle(handle));
        }
        self.record(handle, SoundCall::Play);
        Ok(())
    }

    fn stop(&self, handle: SoundHandle) {
        self.record(handle, SoundCall::Stop);
    }

    fn unload(&self, handle: SoundHandle) {
        self.record(handle, SoundCall::Unload);
        self.state().loaded.remove(&handle);
    }

    fn set_volume(&self, handle: SoundHandle, volume: f32) {
        self.record(handle, |id| SoundCall::SetVolume(id, volume));
    }

    fn playback_duration_ms(&self, handle: SoundHandle) -> Option<u64> {
        let state = self.state();
        state
            .loaded
            .get(&handle)
            .and_then(|id| state.durations.get(id).copied())
    }
}
