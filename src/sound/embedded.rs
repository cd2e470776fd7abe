//! Embedded sound data.
//!
//! Sounds synthesized at runtime so that a run is audible even when no
//! sound assets are installed. Output is 16-bit mono PCM WAV.

const SAMPLE_RATE: u32 = 22_050;

/// Length of the transition beep in milliseconds.
pub const BEEP_DURATION_MS: u32 = 250;

/// Length of the fallback end-of-run chime in milliseconds.
pub const CHIME_DURATION_MS: u32 = 900;

/// Synthesizes a sine tone with a short linear fade-out as a WAV file.
#[must_use]
pub fn synthesize_tone(frequency_hz: f32, duration_ms: u32) -> Vec<u8> {
    let sample_count = SAMPLE_RATE * duration_ms / 1000;
    let data_len = sample_count * 2;
    let mut wav = Vec::with_capacity(44 + data_len as usize);

    // RIFF header
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&(36 + data_len).to_le_bytes());
    wav.extend_from_slice(b"WAVE");
    // fmt chunk: PCM, mono, 16-bit
    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes());
    wav.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
    wav.extend_from_slice(&(SAMPLE_RATE * 2).to_le_bytes());
    wav.extend_from_slice(&2u16.to_le_bytes());
    wav.extend_from_slice(&16u16.to_le_bytes());
    // data chunk
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&data_len.to_le_bytes());

    let fade_start = sample_count * 3 / 4;
    for i in 0..sample_count {
        let t = i as f32 / SAMPLE_RATE as f32;
        let envelope = if i < fade_start {
            1.0
        } else {
            (sample_count - i) as f32 / (sample_count - fade_start).max(1) as f32
        };
        let value = (t * frequency_hz * std::f32::consts::TAU).sin() * envelope * 0.5;
        let sample = (value * f32::from(i16::MAX)) as i16;
        wav.extend_from_slice(&sample.to_le_bytes());
    }
    wav
}

/// Returns embedded audio for a catalog id.
///
/// The transition beep gets a short high tone; every other id shares the
/// fallback chime.
#[must_use]
pub fn get_embedded_sound(sound_id: &str) -> Vec<u8> {
    if sound_id == super::TRANSITION_SOUND {
        synthesize_tone(880.0, BEEP_DURATION_MS)
    } else {
        synthesize_tone(660.0, CHIME_DURATION_MS)
    }
}
