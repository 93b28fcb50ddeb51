//! Silent backend used when the audio feature is disabled

use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

use super::{AudioBackend, AudioError, ClipBuffer, StreamPlayback, Volume};

/// Backend that recognizes audio containers but plays nothing
///
/// Files are accepted when their header looks like WAV, Ogg or MP3 so that
/// library reconciliation still weeds out junk without an output device.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullBackend;

impl NullBackend {
    fn sniff(path: &Path) -> Result<(), AudioError> {
        let mut file =
            File::open(path).map_err(|_| AudioError::FileNotFound(path.to_path_buf()))?;
        let mut header = [0u8; 12];
        let read = file
            .read(&mut header)
            .map_err(|e| AudioError::DecodeError(e.to_string()))?;
        let header = &header[..read];

        let is_wav = header.len() >= 12 && &header[0..4] == b"RIFF" && &header[8..12] == b"WAVE";
        let is_ogg = header.starts_with(b"OggS");
        let is_mp3 = header.starts_with(b"ID3")
            || (header.len() >= 2 && header[0] == 0xFF && header[1] & 0xE0 == 0xE0);

        if is_wav || is_ogg || is_mp3 {
            Ok(())
        } else {
            Err(AudioError::DecodeError(format!(
                "unrecognized audio format: {}",
                path.display()
            )))
        }
    }
}

impl AudioBackend for NullBackend {
    fn decode(&self, path: &Path) -> Result<ClipBuffer, AudioError> {
        Self::sniff(path)?;
        Ok(ClipBuffer::new(Vec::new(), 2, 44100))
    }

    fn play_clip(&self, _clip: &ClipBuffer, _volume: Volume) -> Result<(), AudioError> {
        debug!("Audio playback skipped (feature not enabled)");
        Ok(())
    }

    fn open_stream(
        &self,
        path: &Path,
        _volume: Volume,
    ) -> Result<Box<dyn StreamPlayback>, AudioError> {
        Self::sniff(path)?;
        debug!(path = %path.display(), "Audio streaming skipped (feature not enabled)");
        Ok(Box::new(Finished))
    }
}

struct Finished;

impl StreamPlayback for Finished {
    fn is_busy(&self) -> bool {
        false
    }

    fn stop(&self) {}
}
