//! home-sounds library
//!
//! Audio module for home automation: plays short sound effects, plays
//! music tracks one at a time and speaks text through a text-to-speech
//! service. [`SoundsModule`] is the entry point; the other modules are its
//! building blocks.

#![warn(missing_docs)]

pub mod audio;
pub mod cache;
pub mod commands;
pub mod config;
pub mod error;
pub mod formatter;
pub mod library;
pub mod module;
pub mod playback;
pub mod speech;
pub mod watcher;

// Re-export commonly used types
pub use audio::{create_backend, AudioBackend, ClipBuffer, NullBackend, StreamPlayback, Volume};
pub use cache::{ReconcileReport, SoundCache};
pub use config::Config;
pub use error::{AudioError, ConfigError, SoundsError, SpeechError};
pub use formatter::{FormatterRegistry, HostEvent, ProfileFormatter, TextToSpeechProfile};
pub use library::{AudioEntry, Library, LibraryKind, LibraryLayout, MusicEntry, SoundEntry};
pub use module::{LangsInfo, ModuleConfig, SoundsModule};
pub use playback::{ControllerState, PlaybackController, PlaybackRequest, SessionInfo, SessionState};
pub use speech::{GoogleTts, SpeechSynthesizer};
pub use watcher::{LibraryChangeEvent, LibraryWatcher};
