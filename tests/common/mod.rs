//! Shared test doubles for integration tests

#![allow(dead_code)]

use home_sounds::{
    AudioBackend, AudioError, ClipBuffer, Config, SoundsModule, SpeechError, SpeechSynthesizer,
    StreamPlayback, Volume,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// Files starting with this content fail to decode
pub const CORRUPT: &[u8] = b"corrupt";

/// A stream opened by [`ScriptedBackend`]
pub struct OpenedStream {
    pub path: PathBuf,
    pub volume: Volume,
    pub live: Arc<AtomicBool>,
}

/// Backend whose streams play for a fixed length
pub struct ScriptedBackend {
    stream_length: Duration,
    pub clips_played: AtomicUsize,
    pub streams: Mutex<Vec<OpenedStream>>,
}

impl ScriptedBackend {
    pub fn new(stream_length: Duration) -> Self {
        Self {
            stream_length,
            clips_played: AtomicUsize::new(0),
            streams: Mutex::new(Vec::new()),
        }
    }

    /// Streams currently producing audio
    pub fn live_streams(&self) -> Vec<PathBuf> {
        self.streams
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.live.load(Ordering::SeqCst))
            .map(|s| s.path.clone())
            .collect()
    }

    pub fn opened_count(&self) -> usize {
        self.streams.lock().unwrap().len()
    }
}

struct ScriptedStream {
    started: Instant,
    length: Duration,
    live: Arc<AtomicBool>,
}

impl StreamPlayback for ScriptedStream {
    fn is_busy(&self) -> bool {
        if self.started.elapsed() >= self.length {
            self.live.store(false, Ordering::SeqCst);
        }
        self.live.load(Ordering::SeqCst)
    }

    fn stop(&self) {
        self.live.store(false, Ordering::SeqCst);
    }
}

impl AudioBackend for ScriptedBackend {
    fn decode(&self, path: &Path) -> Result<ClipBuffer, AudioError> {
        let bytes =
            std::fs::read(path).map_err(|_| AudioError::FileNotFound(path.to_path_buf()))?;
        if bytes.starts_with(CORRUPT) {
            return Err(AudioError::DecodeError("corrupt file".to_string()));
        }
        Ok(ClipBuffer::new(vec![0.0; 8], 2, 8))
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
            return Err(AudioError::FileNotFound(path.to_path_buf()));
        }
        let live = Arc::new(AtomicBool::new(true));
        self.streams.lock().unwrap().push(OpenedStream {
            path: path.to_path_buf(),
            volume,
            live: live.clone(),
        });
        Ok(Box::new(ScriptedStream {
            started: Instant::now(),
            length: self.stream_length,
            live,
        }))
    }
}

/// Synthesizer writing an empty mp3 and recording every output path
#[derive(Default)]
pub struct RecordingTts {
    pub outputs: Mutex<Vec<PathBuf>>,
}

impl SpeechSynthesizer for RecordingTts {
    fn synthesize(&self, _text: &str, _lang: &str, dest_dir: &Path) -> Result<PathBuf, SpeechError> {
        let file = home_sounds::speech::speech_file(dest_dir)?;
        let (_, path) = file.keep().map_err(|e| e.error)?;
        self.outputs.lock().unwrap().push(path.clone());
        Ok(path)
    }
}

/// Poll interval used by test modules
pub const POLL: Duration = Duration::from_millis(20);

/// Module rooted in a fresh temporary directory
pub struct Harness {
    pub dir: TempDir,
    pub backend: Arc<ScriptedBackend>,
    pub tts: Arc<RecordingTts>,
    pub module: SoundsModule,
}

impl Harness {
    pub fn new(stream_length: Duration) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            poll_interval_ms: POLL.as_millis() as u64,
            ..Config::with_data_dir(dir.path())
        };
        let backend = Arc::new(ScriptedBackend::new(stream_length));
        let tts = Arc::new(RecordingTts::default());
        let module = SoundsModule::new(config, backend.clone(), tts.clone()).unwrap();
        module.configure().unwrap();
        Self {
            dir,
            backend,
            tts,
            module,
        }
    }

    /// Create a file outside the library, ready to be added
    pub fn upload(&self, name: &str, content: &[u8]) -> PathBuf {
        let uploads = self.dir.path().join("uploads");
        std::fs::create_dir_all(&uploads).unwrap();
        let path = uploads.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    pub fn sounds_dir(&self) -> PathBuf {
        self.dir.path().join("sounds")
    }

    pub fn musics_dir(&self) -> PathBuf {
        self.dir.path().join("musics")
    }

    pub fn add_music(&self, name: &str) {
        self.module
            .add_music(&self.upload(name, b"music"))
            .unwrap();
    }
}
