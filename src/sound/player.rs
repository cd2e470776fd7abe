//! Sound player implementation using rodio.
//!
//! Each loaded sound keeps its encoded bytes in memory and gets its own
//! [`Sink`] while playing, so it can be stopped or re-volumed independently.

use std::collections::HashMap;
use std::fs;
use std::io::Cursor;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use tracing::{debug, warn};

use super::embedded::get_embedded_sound;
use super::error::SoundError;
use super::source::{SoundCatalog, SoundSource};
use super::{SoundHandle, SoundPlayer};

struct LoadedSound {
    name: String,
    data: Arc<[u8]>,
    duration_ms: Option<u64>,
    volume: f32,
    sink: Option<Sink>,
}

/// A sound player that uses rodio for audio playback.
///
/// Playback is non-blocking; sounds continue playing in the background until
/// they end or are stopped. The output stream is not `Send`, so the player
/// lives on the thread that created it.
pub struct RodioSoundPlayer {
    /// The audio output stream (must be kept alive for playback).
    _stream: OutputStream,
    /// Handle to the output stream for creating sinks.
    stream_handle: OutputStreamHandle,
    catalog: SoundCatalog,
    sounds: Mutex<HashMap<SoundHandle, LoadedSound>>,
    next_handle: AtomicU64,
}

impl RodioSoundPlayer {
    /// Creates a new sound player.
    ///
    /// # Errors
    ///
    /// Returns `SoundError::DeviceNotAvailable` if no audio output device
    /// is available.
    pub fn new(catalog: SoundCatalog) -> Result<Self, SoundError> {
        let (stream, stream_handle) = OutputStream::try_default()
            .map_err(|e| SoundError::DeviceNotAvailable(e.to_string()))?;

        debug!("Audio output stream initialized");

        Ok(Self {
            _stream: stream,
            stream_handle,
            catalog,
            sounds: Mutex::new(HashMap::new()),
            next_handle: AtomicU64::new(1),
        })
    }

    fn sounds(&self) -> MutexGuard<'_, HashMap<SoundHandle, LoadedSound>> {
        self.sounds.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reads the bytes for a source, falling back to the embedded sound when
    /// an installed file is unusable.
    fn read_source(source: &SoundSource) -> Result<(Arc<[u8]>, Option<u64>), SoundError> {
        match source {
            SoundSource::File { name, path } => {
                let attempt = fs::read(path)
                    .map_err(|e| SoundError::FileNotFound(format!("{}: {}", path.display(), e)))
                    .map(Arc::<[u8]>::from)
                    .and_then(|data| {
                        let duration = probe_duration_ms(&data)?;
                        Ok((data, duration))
                    });
                match attempt {
                    Ok(loaded) => Ok(loaded),
                    Err(e) if e.should_fallback_to_embedded() => {
                        warn!(
                            "Failed to load sound '{}': {}, falling back to embedded",
                            name, e
                        );
                        Self::read_embedded(name)
                    }
                    Err(e) => Err(e),
                }
            }
            SoundSource::Embedded { name } => Self::read_embedded(name),
        }
    }

    fn read_embedded(name: &str) -> Result<(Arc<[u8]>, Option<u64>), SoundError> {
        let data = Arc::<[u8]>::from(get_embedded_sound(name));
        let duration = probe_duration_ms(&data)?;
        Ok((data, duration))
    }
}

/// Decodes once to learn the playback length.
fn probe_duration_ms(data: &Arc<[u8]>) -> Result<Option<u64>, SoundError> {
    let decoder =
        Decoder::new(Cursor::new(data.clone())).map_err(|e| SoundError::DecodeError(e.to_string()))?;
    Ok(decoder
        .total_duration()
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX)))
}

impl SoundPlayer for RodioSoundPlayer {
    fn load(&self, sound_id: &str) -> Result<SoundHandle, SoundError> {
        let source = self
            .catalog
            .resolve(sound_id)
            .ok_or_else(|| SoundError::FileNotFound(sound_id.to_string()))?;
        let (data, duration_ms) = Self::read_source(&source)?;

        let handle = SoundHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        debug!(
            "Loaded sound '{}' as {} (embedded: {}, duration: {:?} ms)",
            source.name(),
            handle,
            source.is_embedded(),
            duration_ms
        );
        self.sounds().insert(
            handle,
            LoadedSound {
                name: source.name().to_string(),
                data,
                duration_ms,
                volume: 1.0,
                sink: None,
            },
        );
        Ok(handle)
    }

    fn play(&self, handle: SoundHandle) -> Result<(), SoundError> {
        let mut sounds = self.sounds();
        let sound = sounds
            .get_mut(&handle)
            .ok_or(SoundError::UnknownHandle(handle))?;

        if let Some(previous) = sound.sink.take() {
            previous.stop();
        }

        let decoder = Decoder::new(Cursor::new(sound.data.clone()))
            .map_err(|e| SoundError::DecodeError(format!("{}: {}", sound.name, e)))?;
        let sink = Sink::try_new(&self.stream_handle)
            .map_err(|e| SoundError::StreamError(e.to_string()))?;
        sink.set_volume(sound.volume);
        sink.append(decoder);
        sound.sink = Some(sink);

        debug!("Sound playback started: {}", sound.name);
        Ok(())
    }

    fn stop(&self, handle: SoundHandle) {
        if let Some(sink) = self
            .sounds()
            .get_mut(&handle)
            .and_then(|sound| sound.sink.take())
        {
            sink.stop();
        }
    }

    fn unload(&self, handle: SoundHandle) {
        if let Some(sound) = self.sounds().remove(&handle) {
            if let Some(sink) = sound.sink {
                sink.stop();
            }
            debug!("Unloaded sound '{}'", sound.name);
        }
    }

    fn set_volume(&self, handle: SoundHandle, volume: f32) {
        if let Some(sound) = self.sounds().get_mut(&handle) {
            sound.volume = volume;
            if let Some(sink) = &sound.sink {
                sink.set_volume(volume);
            }
        }
    }

    fn playback_duration_ms(&self, handle: SoundHandle) -> Option<u64> {
        self.sounds().get(&handle).and_then(|sound| sound.duration_ms)
    }
}

impl std::fmt::Debug for RodioSoundPlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RodioSoundPlayer")
            .field("catalog", &self.catalog)
            .field("loaded", &self.sounds().len())
            .finish_non_exhaustive()
    }
}

/// Creates a sound player, returning None if audio is unavailable.
///
/// If audio initialization fails, a warning is logged and None is returned.
#[must_use]
pub fn try_create_player(catalog: SoundCatalog) -> Option<RodioSoundPlayer> {
    match RodioSoundPlayer::new(catalog) {
        Ok(player) => Some(player),
        Err(e) => {
            warn!("Audio not available, sound disabled: {} ({})", e, e.suggestion());
            None
        }
    }
}
