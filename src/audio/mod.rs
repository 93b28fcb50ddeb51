//! Audio playback system for sounds, musics and speech
//!
//! This module abstracts the mixing engine behind [`AudioBackend`]. Short
//! sounds are decoded once into a [`ClipBuffer`] and replayed from memory;
//! long-form files are streamed through a [`StreamPlayback`] that the
//! playback controller polls until it finishes or is stopped.

#[cfg(feature = "audio")]
mod player;

#[cfg(feature = "audio")]
pub use player::RodioBackend;

mod stub;

pub use stub::NullBackend;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::error::SoundsError;

/// Errors that can occur during audio playback
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("Failed to create output stream: {0}")]
    StreamError(String),

    #[error("Failed to decode audio: {0}")]
    DecodeError(String),

    #[error("Sound file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Audio system not available")]
    NotAvailable,
}

/// Decoded, ready-to-play audio kept in memory
#[derive(Debug, Clone)]
pub struct ClipBuffer {
    /// Interleaved samples
    pub samples: Arc<[f32]>,
    /// Number of channels
    pub channels: u16,
    /// Samples per second per channel
    pub sample_rate: u32,
}

impl ClipBuffer {
    /// Create a clip from interleaved samples
    pub fn new(samples: Vec<f32>, channels: u16, sample_rate: u32) -> Self {
        Self {
            samples: samples.into(),
            channels,
            sample_rate,
        }
    }

    /// Playback length of the clip
    pub fn duration(&self) -> Duration {
        let samples_per_sec = self.sample_rate as u64 * self.channels.max(1) as u64;
        if samples_per_sec == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples.len() as f64 / samples_per_sec as f64)
    }
}

/// A long-form file being streamed by the backend
pub trait StreamPlayback: Send {
    /// Whether the stream still has audio to play
    fn is_busy(&self) -> bool;

    /// Stop the stream immediately
    fn stop(&self);
}

/// Mixing engine used by the module
///
/// Implementations must be shareable across threads: sounds are triggered
/// from host calls while long-form sessions run on their own thread.
pub trait AudioBackend: Send + Sync {
    /// Decode a file into memory
    fn decode(&self, path: &Path) -> Result<ClipBuffer, AudioError>;

    /// Play a decoded clip, overlapping anything already playing
    fn play_clip(&self, clip: &ClipBuffer, volume: Volume) -> Result<(), AudioError>;

    /// Start streaming a file
    fn open_stream(&self, path: &Path, volume: Volume)
        -> Result<Box<dyn StreamPlayback>, AudioError>;
}

/// Create the platform backend
///
/// Uses rodio when the `audio` feature is enabled, otherwise a backend that
/// validates files but produces no sound.
pub fn create_backend() -> Result<Arc<dyn AudioBackend>, AudioError> {
    #[cfg(feature = "audio")]
    {
        Ok(Arc::new(RodioBackend::new()?))
    }

    #[cfg(not(feature = "audio"))]
    {
        tracing::debug!("Audio feature not enabled, using silent backend");
        Ok(Arc::new(NullBackend))
    }
}

/// Playback volume, 0 to 100 inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Volume(u8);

impl Volume {
    /// Highest accepted volume
    pub const MAX: Volume = Volume(100);

    /// Validate a volume value coming from the host
    pub fn new(value: i64) -> Result<Self, SoundsError> {
        if !(0..=100).contains(&value) {
            return Err(SoundsError::InvalidParameter(
                "Volume value must be 0..100".to_string(),
            ));
        }
        Ok(Self(value as u8))
    }

    /// Raw value
    pub fn get(self) -> u8 {
        self.0
    }

    /// Gain factor for the mixer (0.0 to 1.0)
    pub fn gain(self) -> f32 {
        self.0 as f32 / 100.0
    }
}

impl Default for Volume {
    fn default() -> Self {
        Self(50)
    }
}

/// Process-wide volume shared by sound and music paths
#[derive(Debug, Clone)]
pub struct SharedVolume(Arc<AtomicU8>);

impl SharedVolume {
    /// Create with an initial value
    pub fn new(volume: Volume) -> Self {
        Self(Arc::new(AtomicU8::new(volume.get())))
    }

    /// Current volume
    pub fn get(&self) -> Volume {
        Volume(self.0.load(Ordering::Relaxed))
    }

    /// Replace the volume
    pub fn set(&self, volume: Volume) {
        self.0.store(volume.get(), Ordering::Relaxed);
    }
}

impl Default for SharedVolume {
    fn default() -> Self {
        Self::new(Volume::default())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Backend double used by unit tests

    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize};
    use std::sync::Mutex;
    use std::time::Instant;

    /// Files whose content starts with this marker fail to decode
    pub const CORRUPT: &[u8] = b"corrupt";

    /// In-memory backend; streams stay busy for `stream_length`
    pub struct FakeBackend {
        pub stream_length: Duration,
        pub clips_played: AtomicUsize,
        pub streams: Mutex<Vec<(PathBuf, Volume, Arc<AtomicBool>)>>,
    }

    impl FakeBackend {
        pub fn new(stream_length: Duration) -> Self {
            Self {
                stream_length,
                clips_played: AtomicUsize::new(0),
                streams: Mutex::new(Vec::new()),
            }
        }

        pub fn opened(&self) -> Vec<PathBuf> {
            self.streams
                .lock()
                .unwrap()
                .iter()
                .map(|(p, _, _)| p.clone())
                .collect()
        }

        pub fn live_streams(&self) -> usize {
            self.streams
                .lock()
                .unwrap()
                .iter()
                .filter(|(_, _, live)| live.load(Ordering::SeqCst))
                .count()
        }
    }

    struct FakeStream {
        started: Instant,
        length: Duration,
        live: Arc<AtomicBool>,
    }

    impl StreamPlayback for FakeStream {
        fn is_busy(&self) -> bool {
            let busy = self.live.load(Ordering::SeqCst) && self.started.elapsed() < self.length;
            if !busy {
                self.live.store(false, Ordering::SeqCst);
            }
            busy
        }

        fn stop(&self) {
            self.live.store(false, Ordering::SeqCst);
        }
    }

    impl AudioBackend for FakeBackend {
        fn decode(&self, path: &Path) -> Result<ClipBuffer, AudioError> {
            let bytes = std::fs::read(path).map_err(|_| AudioError::FileNotFound(path.into()))?;
            if bytes.starts_with(CORRUPT) {
                return Err(AudioError::DecodeError("corrupt".to_string()));
            }
            Ok(ClipBuffer::new(vec![0.0; 4], 1, 4))
        }

        fn play_clip(&self, _clip: &ClipBuffer, _volume: Volume) -> Result<(), AudioError> {
            self.clips_played.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn open_stream(
            &self,
            path: &Path,
            volume: Volume,
        ) -> Result<Box<dyn StreamPlayback>, AudioError> {
            if !path.exists() {
                return Err(AudioError::FileNotFound(path.into()));
            }
            let live = Arc::new(AtomicBool::new(true));
            self.streams
                .lock()
                .unwrap()
                .push((path.to_path_buf(), volume, live.clone()));
            Ok(Box::new(FakeStream {
                started: Instant::now(),
                length: self.stream_length,
                live,
            }))
        }
    }
}
