//! Text-to-speech
//!
//! A [`SpeechSynthesizer`] turns text into an audio file that the playback
//! controller plays once and deletes.

mod google;

pub use google::GoogleTts;

use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::error::SpeechResult;

/// Converts text into a playable audio file
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text` spoken in `lang` into a new file under `dest_dir`
    ///
    /// Every call returns a distinct path. The caller owns the file.
    fn synthesize(&self, text: &str, lang: &str, dest_dir: &Path) -> SpeechResult<PathBuf>;
}

/// Create a uniquely named, not yet persisted speech file
///
/// The file is removed on drop unless it is kept with
/// [`NamedTempFile::keep`].
pub fn speech_file(dest_dir: &Path) -> std::io::Result<NamedTempFile> {
    std::fs::create_dir_all(dest_dir)?;
    tempfile::Builder::new()
        .prefix("speech_")
        .suffix(".mp3")
        .tempfile_in(dest_dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_speech_files_are_unique() {
        let dir = tempfile::tempdir().unwrap();
        let first = speech_file(dir.path()).unwrap();
        let second = speech_file(dir.path()).unwrap();
        assert_ne!(first.path(), second.path());

        let name = first.path().file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("speech_"));
        assert!(name.ends_with(".mp3"));
    }

    #[test]
    fn test_unkept_file_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let path = {
            let file = speech_file(&dir.path().join("nested")).unwrap();
            file.path().to_path_buf()
        };
        assert!(!path.exists());
    }
}
