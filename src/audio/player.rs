//! Audio backend implementation using rodio

use rodio::buffer::SamplesBuffer;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::mpsc;
use std::thread;
use tracing::{debug, error, info};

use super::{AudioBackend, AudioError, ClipBuffer, StreamPlayback, Volume};

/// Audio backend playing through the default output device
///
/// The rodio output stream is not `Send`, so it lives on a dedicated thread
/// for as long as the backend exists; only its handle is shared.
pub struct RodioBackend {
    stream_handle: OutputStreamHandle,
    _keepalive: mpsc::Sender<()>,
}

impl RodioBackend {
    /// Open the default output device
    pub fn new() -> Result<Self, AudioError> {
        let (handle_tx, handle_rx) = mpsc::channel();
        let (keepalive_tx, keepalive_rx) = mpsc::channel::<()>();

        thread::Builder::new()
            .name("audio-output".to_string())
            .spawn(move || match OutputStream::try_default() {
                Ok((stream, handle)) => {
                    let _ = handle_tx.send(Ok(handle));
                    // returns once the backend (and its sender) is dropped
                    let _ = keepalive_rx.recv();
                    drop(stream);
                    debug!("Audio output stream closed");
                }
                Err(e) => {
                    error!(error = %e, "Failed to open audio output stream");
                    let _ = handle_tx.send(Err(AudioError::StreamError(e.to_string())));
                }
            })
            .map_err(|e| AudioError::StreamError(e.to_string()))?;

        let stream_handle = handle_rx.recv().map_err(|_| AudioError::NotAvailable)??;

        info!("Audio backend initialized");

        Ok(Self {
            stream_handle,
            _keepalive: keepalive_tx,
        })
    }

    fn open_decoder(path: &Path) -> Result<Decoder<BufReader<File>>, AudioError> {
        if !path.exists() {
            return Err(AudioError::FileNotFound(path.to_path_buf()));
        }

        let file = File::open(path).map_err(|e| AudioError::DecodeError(e.to_string()))?;

        Decoder::new(BufReader::new(file)).map_err(|e| AudioError::DecodeError(e.to_string()))
    }

    fn new_sink(&self, volume: Volume) -> Result<Sink, AudioError> {
        let sink = Sink::try_new(&self.stream_handle)
            .map_err(|e| AudioError::StreamError(e.to_string()))?;
        sink.set_volume(volume.gain());
        Ok(sink)
    }
}

impl AudioBackend for RodioBackend {
    fn decode(&self, path: &Path) -> Result<ClipBuffer, AudioError> {
        debug!(path = %path.display(), "Decoding sound file");

        let decoder = Self::open_decoder(path)?;
        let channels = decoder.channels();
        let sample_rate = decoder.sample_rate();
        let samples: Vec<f32> = decoder.convert_samples().collect();

        if samples.is_empty() {
            return Err(AudioError::DecodeError(format!(
                "no audio in {}",
                path.display()
            )));
        }

        Ok(ClipBuffer::new(samples, channels, sample_rate))
    }

    fn play_clip(&self, clip: &ClipBuffer, volume: Volume) -> Result<(), AudioError> {
        let source = SamplesBuffer::new(clip.channels, clip.sample_rate, clip.samples.to_vec());

        let sink = self.new_sink(volume)?;
        sink.append(source);
        sink.detach();

        Ok(())
    }

    fn open_stream(
        &self,
        path: &Path,
        volume: Volume,
    ) -> Result<Box<dyn StreamPlayback>, AudioError> {
        debug!(path = %path.display(), "Streaming audio file");

        let source = Self::open_decoder(path)?;

        let sink = self.new_sink(volume)?;
        sink.append(source);

        Ok(Box::new(SinkPlayback { sink }))
    }
}

/// Long-form playback backed by its own sink
struct SinkPlayback {
    sink: Sink,
}

impl StreamPlayback for SinkPlayback {
    fn is_busy(&self) -> bool {
        !self.sink.empty()
    }

    fn stop(&self) {
        self.sink.stop();
    }
}
