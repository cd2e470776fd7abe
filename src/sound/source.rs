//! Sound source management.
//!
//! Maps catalog ids (as stored on timer sets) to something playable: an
//! installed file in the sounds directory, or the embedded fallback.

use std::path::{Path, PathBuf};

use crate::types::{DEFAULT_SOUND, SOUND_NONE};

/// Sound ids a timer set may choose, with their display labels.
pub const SOUND_OPTIONS: &[(&str, &str)] = &[
    ("none", "なし"),
    ("normal", "ノーマル"),
    ("normal(high)", "ノーマル（高）"),
    ("simple", "シンプル"),
    ("slow", "スロー"),
    ("speed", "スピード"),
    ("step", "ステップ"),
    ("taiko", "太鼓"),
    ("telephone", "電話"),
    ("bird", "鳥"),
    ("chicken", "ニワトリ"),
    ("chime", "チャイム"),
];

/// File extensions tried, in order, when looking for an installed sound.
const EXTENSIONS: &[&str] = &["mp3", "wav"];

/// Represents the source of a sound to be played.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SoundSource {
    /// An installed sound file.
    File {
        /// Catalog id (e.g., "chime").
        name: String,
        /// Full path to the sound file.
        path: PathBuf,
    },
    /// A sound synthesized into the binary.
    Embedded {
        /// Catalog id the fallback stands in for.
        name: String,
    },
}

impl SoundSource {
    #[must_use]
    pub fn file(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::File {
            name: name.into(),
            path: path.into(),
        }
    }

    #[must_use]
    pub fn embedded(name: impl Into<String>) -> Self {
        Self::Embedded { name: name.into() }
    }

    /// Returns the catalog id of the sound.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::File { name, .. } | Self::Embedded { name } => name,
        }
    }

    #[must_use]
    pub fn is_embedded(&self) -> bool {
        matches!(self, Self::Embedded { .. })
    }
}

/// Returns true if `sound_id` is a selectable catalog id or the transition beep.
#[must_use]
pub fn is_known_sound(sound_id: &str) -> bool {
    sound_id == super::TRANSITION_SOUND || SOUND_OPTIONS.iter().any(|(id, _)| *id == sound_id)
}

/// Resolves catalog ids against an optional sounds directory.
#[derive(Debug, Clone, Default)]
pub struct SoundCatalog {
    dir: Option<PathBuf>,
}

impl SoundCatalog {
    /// Catalog that only knows the embedded sounds.
    #[must_use]
    pub fn embedded_only() -> Self {
        Self { dir: None }
    }

    /// Catalog that prefers files from `dir`.
    #[must_use]
    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
        }
    }

    #[must_use]
    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// Resolves a sound id.
    ///
    /// Returns `None` for [`SOUND_NONE`]. Unknown ids fall back to the default
    /// sound; missing files fall back to the embedded sound.
    #[must_use]
    pub fn resolve(&self, sound_id: &str) -> Option<SoundSource> {
        if sound_id == SOUND_NONE {
            return None;
        }
        let id = if is_known_sound(sound_id) {
            sound_id
        } else {
            tracing::debug!("Unknown sound '{}', using '{}'", sound_id, DEFAULT_SOUND);
            DEFAULT_SOUND
        };

        let installed = self.dir.as_ref().and_then(|dir| {
            EXTENSIONS
                .iter()
                .map(|ext| dir.join(format!("{}.{}", id, ext)))
                .find(|path| path.is_file())
        });

        Some(match installed {
            Some(path) => SoundSource::file(id, path),
            None => SoundSource::embedded(id),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_resolves_to_nothing() {
        assert_eq!(SoundCatalog::embedded_only().resolve("none"), None);
    }

    #[test]
    fn test_unknown_falls_back_to_default() {
        let source = SoundCatalog::embedded_only().resolve("kazoo").unwrap();
        assert_eq!(source.name(), DEFAULT_SOUND);
        assert!(source.is_embedded());
    }

    #[test]
    fn test_known_ids() {
        assert!(is_known_sound("normal(high)"));
        assert!(is_known_sound("beep"));
        assert!(!is_known_sound("../etc/passwd"));
    }

    #[test]
    fn test_installed_file_is_preferred() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("chime.wav"), b"RIFF").unwrap();
        let catalog = SoundCatalog::with_dir(dir.path());

        let source = catalog.resolve("chime").unwrap();
        assert_eq!(source, SoundSource::file("chime", dir.path().join("chime.wav")));

        let missing = catalog.resolve("taiko").unwrap();
        assert_eq!(missing, SoundSource::embedded("taiko"));
    }

    #[test]
    fn test_mp3_before_wav() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bird.wav"), b"x").unwrap();
        std::fs::write(dir.path().join("bird.mp3"), b"x").unwrap();
        let source = SoundCatalog::with_dir(dir.path()).resolve("bird").unwrap();
        assert_eq!(source, SoundSource::file("bird", dir.path().join("bird.mp3")));
    }
}
