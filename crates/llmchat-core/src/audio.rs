//! Temporary on-disk store for audio input.
//!
//! Audio files are staged into a scratch directory before they are handed to a
//! speech-to-text backend, then removed. `cleanup` sweeps anything left behind.

use std::path::{Path, PathBuf};

use tracing::{debug, error, info};

use crate::utils;

/// Errors raised while staging audio files.
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("audio I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not an audio file: {0}")]
    NotAFile(PathBuf),
}

/// Directory of temporary audio files.
pub struct AudioStore {
    dir: PathBuf,
}

impl AudioStore {
    /// Open (and create) a store rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, AudioError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Store under `$TMP/llm-chat-audio`.
    pub fn in_temp_dir() -> Result<Self, AudioError> {
        Self::new(utils::get_audio_temp_path())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Copy `source` into the store as `audio_<unix-seconds>_<name>` and
    /// return the staged path.
    pub fn stage(&self, source: &Path) -> Result<PathBuf, AudioError> {
        if !source.is_file() {
            return Err(AudioError::NotAFile(source.to_path_buf()));
        }
        let name = source
            .file_name()
            .map(|n| utils::safe_filename(&n.to_string_lossy()))
            .unwrap_or_else(|| "clip.wav".to_string());
        let path = self
            .dir
            .join(format!("audio_{}_{}", chrono::Utc::now().timestamp(), name));

        let bytes = std::fs::copy(source, &path)?;
        info!(path = %path.display(), bytes, "Audio file staged");
        Ok(path)
    }

    /// Remove one staged file. Missing files are ignored.
    pub fn remove(&self, staged: &Path) {
        if !staged.starts_with(&self.dir) {
            return;
        }
        match std::fs::remove_file(staged) {
            Ok(()) => debug!(path = %staged.display(), "Staged audio removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => error!("Failed to remove {}: {}", staged.display(), e),
        }
    }

    /// Remove every audio file in the store. Returns how many were removed.
    pub fn cleanup(&self) -> usize {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                error!("Failed to read audio directory: {}", e);
                return 0;
            }
        };

        let mut removed = 0;
        for path in entries.flatten().map(|e| e.path()) {
            if is_audio_file(&path.to_string_lossy()) {
                match std::fs::remove_file(&path) {
                    Ok(()) => removed += 1,
                    Err(e) => error!("Failed to remove {}: {}", path.display(), e),
                }
            }
        }
        debug!(removed, "Temporary audio files cleaned up");
        removed
    }
}

/// Check whether a file path looks like an audio file.
pub fn is_audio_file(path: &str) -> bool {
    let lower = path.to_lowercase();
    [
        ".wav", ".mp3", ".m4a", ".ogg", ".oga", ".opus", ".flac", ".aac", ".webm",
    ]
    .iter()
    .any(|ext| lower.ends_with(ext))
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_stage_and_remove() {
        let src_dir = tempdir().unwrap();
        let source = src_dir.path().join("take one.ogg");
        std::fs::write(&source, b"OggS").unwrap();

        let dir = tempdir().unwrap();
        let store = AudioStore::new(dir.path().join("audio")).unwrap();
        let staged = store.stage(&source).unwrap();

        assert!(staged.starts_with(store.dir()));
        let name = staged.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("audio_"));
        assert!(name.ends_with("_take_one.ogg"));
        assert_eq!(std::fs::read(&staged).unwrap(), b"OggS");
        // Source is left alone
        assert!(source.exists());

        store.remove(&staged);
        assert!(!staged.exists());
        store.remove(&staged);
    }

    #[test]
    fn test_stage_missing_file() {
        let dir = tempdir().unwrap();
        let store = AudioStore::new(dir.path()).unwrap();
        let err = store.stage(&dir.path().join("nope.wav")).unwrap_err();
        assert!(matches!(err, AudioError::NotAFile(_)));
    }

    #[test]
    fn test_remove_outside_store_ignored() {
        let dir = tempdir().unwrap();
        let store = AudioStore::new(dir.path().join("audio")).unwrap();
        let outside = dir.path().join("keep.wav");
        std::fs::write(&outside, b"x").unwrap();
        store.remove(&outside);
        assert!(outside.exists());
    }

    #[test]
    fn test_cleanup_only_audio() {
        let dir = tempdir().unwrap();
        let store = AudioStore::new(dir.path()).unwrap();
        std::fs::write(dir.path().join("a.wav"), b"x").unwrap();
        std::fs::write(dir.path().join("b.mp3"), b"x").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "keep").unwrap();

        assert_eq!(store.cleanup(), 2);
        assert!(dir.path().join("notes.txt").exists());
    }

    #[test]
    fn test_is_audio_file() {
        assert!(is_audio_file("voice.ogg"));
        assert!(is_audio_file("recording.MP3"));
        assert!(is_audio_file("/tmp/clip.wav"));
        assert!(!is_audio_file("photo.jpg"));
        assert!(!is_audio_file("doc.pdf"));
    }
}
