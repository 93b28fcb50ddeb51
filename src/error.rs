// Error types for home-sounds
//
// This module defines error types using thiserror. Every host-facing
// operation returns `SoundsError`; the collaborators (audio backend,
// speech synthesizer, configuration) have their own error enums that
// convert into it.

use std::path::PathBuf;
use thiserror::Error;

pub use crate::audio::AudioError;

/// Main error type for module operations
#[derive(Error, Debug)]
pub enum SoundsError {
    #[error("Missing parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("File not found: {0}")]
    NotFound(PathBuf),

    #[error("Can't play two musics at the same time")]
    Conflict,

    #[error("Sound \"{0}\" is not buffered")]
    NotBuffered(String),

    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    #[error("Speech error: {0}")]
    Speech(#[from] SpeechError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Config directory not found")]
    NoConfigDir,

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Text-to-speech errors
#[derive(Error, Debug)]
pub enum SpeechError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    #[error("Speech service returned no audio")]
    EmptyAudio,

    #[error("Failed to write speech file: {0}")]
    Io(#[from] std::io::Error),
}

// Convenience type aliases for common Result types
pub type Result<T> = std::result::Result<T, SoundsError>;
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
pub type SpeechResult<T> = std::result::Result<T, SpeechError>;
