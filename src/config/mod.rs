// Configuration management

pub mod langs;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, ConfigResult};
use crate::library::LibraryLayout;

/// Module configuration, persisted as TOML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Default speech language (see [`langs::LANGUAGES`])
    #[serde(default = "default_lang")]
    pub lang: String,

    /// Directory holding short sound effects
    #[serde(default = "default_sounds_path")]
    pub sounds_path: PathBuf,

    /// Directory holding music tracks
    #[serde(default = "default_musics_path")]
    pub musics_path: PathBuf,

    /// Directory receiving synthesized speech files
    #[serde(default = "default_speech_path")]
    pub speech_path: PathBuf,

    /// How often a playing session checks for completion or stop requests
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Text-to-speech service settings
    #[serde(default)]
    pub tts: TtsConfig,
}

/// Text-to-speech service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsConfig {
    /// Speech endpoint URL
    #[serde(default = "default_tts_endpoint")]
    pub endpoint: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_tts_timeout")]
    pub timeout_secs: u64,

    /// Attempts per chunk before giving up
    #[serde(default = "default_tts_attempts")]
    pub max_attempts: u32,
}

fn default_lang() -> String {
    langs::DEFAULT_LANG.to_string()
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("home-sounds"))
        .unwrap_or_else(|| PathBuf::from("/var/opt/home-sounds"))
}

fn default_sounds_path() -> PathBuf {
    default_data_dir().join("sounds")
}

fn default_musics_path() -> PathBuf {
    default_data_dir().join("musics")
}

fn default_speech_path() -> PathBuf {
    std::env::temp_dir()
}

fn default_poll_interval_ms() -> u64 {
    100
}

fn default_tts_endpoint() -> String {
    "https://translate.google.com/translate_tts".to_string()
}

fn default_tts_timeout() -> u64 {
    15
}

fn default_tts_attempts() -> u32 {
    3
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            endpoint: default_tts_endpoint(),
            timeout_secs: default_tts_timeout(),
            max_attempts: default_tts_attempts(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            lang: default_lang(),
            sounds_path: default_sounds_path(),
            musics_path: default_musics_path(),
            speech_path: default_speech_path(),
            poll_interval_ms: default_poll_interval_ms(),
            tts: TtsConfig::default(),
        }
    }
}

impl Config {
    /// Configuration rooted in `data_dir`, for embedding and tests
    pub fn with_data_dir(data_dir: &Path) -> Self {
        Self {
            sounds_path: data_dir.join("sounds"),
            musics_path: data_dir.join("musics"),
            speech_path: data_dir.join("speech"),
            ..Self::default()
        }
    }

    /// Load configuration from the default location or create it
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path).context("Failed to load config file")
        } else {
            let config = Self::default();
            config.save()?;
            Ok(config)
        }
    }

    /// Load and validate configuration from an explicit path
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        self.save_to(&config_path)
            .with_context(|| format!("Failed to write config file {}", config_path.display()))
    }

    /// Save configuration to an explicit path, creating parent directories
    pub fn save_to(&self, path: &Path) -> ConfigResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the path to the configuration file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;

        Ok(config_dir.join("home-sounds").join("config.toml"))
    }

    /// Check values that serde cannot
    pub fn validate(&self) -> ConfigResult<()> {
        if !langs::is_supported(&self.lang) {
            return Err(ConfigError::InvalidValue(format!(
                "unsupported lang \"{}\"",
                self.lang
            )));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "poll_interval_ms must be greater than 0".to_string(),
            ));
        }
        if self.tts.max_attempts == 0 {
            return Err(ConfigError::InvalidValue(
                "tts.max_attempts must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Poll interval of playback sessions
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Library directories and allowed extensions
    pub fn layout(&self) -> LibraryLayout {
        LibraryLayout::new(self.sounds_path.clone(), self.musics_path.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.lang, "en");
        assert_eq!(config.poll_interval(), Duration::from_millis(100));
        assert!(config.sounds_path.ends_with("sounds"));
        assert!(config.musics_path.ends_with("musics"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = toml::from_str("lang = \"fr\"").unwrap();
        assert_eq!(config.lang, "fr");
        assert_eq!(config.tts.max_attempts, 3);
        assert_eq!(config.poll_interval_ms, 100);
    }

    #[test]
    fn test_validate_rejects_unknown_lang() {
        let config = Config {
            lang: "klingon".to_string(),
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config {
            lang: "de".to_string(),
            ..Config::with_data_dir(dir.path())
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.lang, "de");
        assert_eq!(loaded.sounds_path, dir.path().join("sounds"));
    }

    #[test]
    fn test_load_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "lang = [").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::ParseError(_))
        ));
    }
}
