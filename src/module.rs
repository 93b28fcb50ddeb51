//! Sounds module
//!
//! [`SoundsModule`] is what the host talks to: it owns the library, the
//! sound cache, the playback controller and the speech synthesizer, and
//! exposes every host command as a method.

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use tracing::{debug, error, info, warn};

use crate::audio::{self, AudioBackend, SharedVolume, Volume};
use crate::cache::{ReconcileReport, SoundCache};
use crate::config::{langs, Config};
use crate::error::{Result, SoundsError};
use crate::formatter::{FormatterRegistry, HostEvent, TextToSpeechProfile};
use crate::library::{Library, LibraryKind, MusicEntry, SoundEntry};
use crate::playback::{PlaybackController, PlaybackRequest};
use crate::speech::{GoogleTts, SpeechSynthesizer};

/// Supported languages and the selected one
#[derive(Debug, Clone, Serialize)]
pub struct LangsInfo {
    /// Code to display name
    pub langs: BTreeMap<&'static str, &'static str>,
    /// Selected default language
    pub lang: String,
}

/// Everything a host UI needs to show the module
#[derive(Debug, Clone, Serialize)]
pub struct ModuleConfig {
    /// Languages
    pub langs: LangsInfo,
    /// Current volume
    pub volume: u8,
    /// Music library
    pub musics: Vec<MusicEntry>,
    /// Sound library
    pub sounds: Vec<SoundEntry>,
}

/// Sounds, musics and text-to-speech module
pub struct SoundsModule {
    config: RwLock<Config>,
    config_path: Option<PathBuf>,
    backend: Arc<dyn AudioBackend>,
    library: Library,
    cache: SoundCache,
    playback: PlaybackController,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    formatters: FormatterRegistry,
    volume: SharedVolume,
    library_lock: Mutex<()>,
}

impl SoundsModule {
    /// Create the module with explicit collaborators
    ///
    /// Library directories are created if missing. Call
    /// [`SoundsModule::configure`] to load the sound cache.
    pub fn new(
        config: Config,
        backend: Arc<dyn AudioBackend>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
    ) -> Result<Self> {
        config.validate()?;

        let library = Library::new(config.layout());
        library.ensure_dirs()?;

        Ok(Self {
            cache: SoundCache::new(backend.clone()),
            playback: PlaybackController::new(backend.clone(), config.poll_interval()),
            config: RwLock::new(config),
            config_path: None,
            backend,
            library,
            synthesizer,
            formatters: FormatterRegistry::with_builtins(),
            volume: SharedVolume::default(),
            library_lock: Mutex::new(()),
        })
    }

    /// Create the module with the platform audio backend and Google speech
    pub fn open(config: Config) -> Result<Self> {
        let backend = audio::create_backend()?;
        let synthesizer = Arc::new(GoogleTts::new(&config.tts)?);
        Self::new(config, backend, synthesizer)
    }

    /// Persist configuration changes to `path`
    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// Load every sound of the library into memory
    ///
    /// Sounds that fail to decode are deleted.
    pub fn configure(&self) -> Result<ReconcileReport> {
        let report = self.sync_sound_cache()?;
        info!(sounds = self.cache.len(), "Sounds module configured");
        Ok(report)
    }

    /// Run the cache reconciliation pass against the sounds directory
    pub fn sync_sound_cache(&self) -> Result<ReconcileReport> {
        let _lock = self.lock_library();
        self.cache.reconcile(&self.library)
    }

    /// Library the module manages
    pub fn library(&self) -> &Library {
        &self.library
    }

    /// Long-form playback controller
    pub fn playback(&self) -> &PlaybackController {
        &self.playback
    }

    /// Copy of the current configuration
    pub fn config(&self) -> Config {
        self.read_config().clone()
    }

    /// Full module state for host UIs
    pub fn get_module_config(&self) -> Result<ModuleConfig> {
        Ok(ModuleConfig {
            langs: self.get_langs(),
            volume: self.get_volume(),
            musics: self.get_musics()?,
            sounds: self.get_sounds()?,
        })
    }

    /// Supported languages and the selected one
    pub fn get_langs(&self) -> LangsInfo {
        LangsInfo {
            langs: langs::table(),
            lang: self.read_config().lang.clone(),
        }
    }

    /// Select the default speech language and persist it
    pub fn set_lang(&self, lang: &str) -> Result<()> {
        if lang.is_empty() {
            return Err(SoundsError::MissingParameter("lang"));
        }
        if !langs::is_supported(lang) {
            return Err(SoundsError::InvalidParameter(format!(
                "Specified lang \"{}\" is invalid",
                lang
            )));
        }

        let mut config = self.config.write().unwrap_or_else(|e| e.into_inner());
        config.lang = lang.to_string();
        if let Some(path) = &self.config_path {
            config.save_to(path)?;
        }
        info!(lang = %lang, "Speech language changed");
        Ok(())
    }

    /// Current volume (0..100)
    pub fn get_volume(&self) -> u8 {
        self.volume.get().get()
    }

    /// Set the volume (0..100)
    pub fn set_volume(&self, volume: i64) -> Result<()> {
        let volume = Volume::new(volume)?;
        self.volume.set(volume);
        debug!(volume = volume.get(), "Volume changed");
        Ok(())
    }

    /// Sounds of the library
    pub fn get_sounds(&self) -> Result<Vec<SoundEntry>> {
        self.library.list(LibraryKind::Sound)
    }

    /// Musics of the library
    pub fn get_musics(&self) -> Result<Vec<MusicEntry>> {
        self.library.list(LibraryKind::Music)
    }

    /// Move a local sound file into the library and load it
    ///
    /// The file is deleted again if it can't be decoded.
    pub fn add_sound(&self, filepath: &Path) -> Result<()> {
        let _lock = self.lock_library();
        let path = self.library.add(LibraryKind::Sound, filepath)?;

        if !self.cache.bufferize(&path) {
            let fullname = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default();
            warn!(sound = %fullname, "Invalid sound file, deleting it");
            self.library.delete(LibraryKind::Sound, fullname)?;
            return Err(SoundsError::InvalidParameter(
                "Sound file format is not supported".to_string(),
            ));
        }
        Ok(())
    }

    /// Move a local music file into the library
    pub fn add_music(&self, filepath: &Path) -> Result<()> {
        let _lock = self.lock_library();
        self.library.add(LibraryKind::Music, filepath)?;
        Ok(())
    }

    /// Delete a sound and drop it from the cache
    pub fn delete_sound(&self, fullname: &str) -> Result<()> {
        let _lock = self.lock_library();
        self.library.delete(LibraryKind::Sound, fullname)?;
        self.cache.evict(fullname);
        Ok(())
    }

    /// Delete a music
    pub fn delete_music(&self, fullname: &str) -> Result<()> {
        let _lock = self.lock_library();
        self.library.delete(LibraryKind::Music, fullname)
    }

    /// Play a sound; sounds may overlap each other and any music
    pub fn play_sound(&self, fullname: &str) -> Result<()> {
        if fullname.is_empty() {
            return Err(SoundsError::MissingParameter("fullname"));
        }

        let clip = {
            let _lock = self.lock_library();
            self.library.resolve(LibraryKind::Sound, fullname)?;
            self.cache
                .get(fullname)
                .ok_or_else(|| SoundsError::NotBuffered(fullname.to_string()))?
        };

        debug!(sound = %fullname, "Playing sound");
        self.backend.play_clip(&clip, self.volume.get())?;
        Ok(())
    }

    /// Play a music of the library
    ///
    /// Only one music (or speech) plays at once: fails with
    /// [`SoundsError::Conflict`] unless `force` stops the current one.
    /// Returns the playback session id.
    pub fn play_music(&self, fullname: &str, force: bool) -> Result<u64> {
        let path = self.library.resolve(LibraryKind::Music, fullname)?;

        self.playback.play(
            PlaybackRequest {
                path,
                volume: self.volume.get(),
                delete_on_finish: false,
            },
            force,
        )
    }

    /// Play a random music of the library, without forcing
    ///
    /// Returns the chosen music, or `None` if the library is empty.
    pub fn play_random_music(&self) -> Result<Option<String>> {
        let musics = self.get_musics()?;
        if musics.is_empty() {
            debug!("No music to play");
            return Ok(None);
        }

        let index = rand::random::<usize>() % musics.len();
        let fullname = musics[index].fullname.clone();
        self.play_music(&fullname, false)?;
        Ok(Some(fullname))
    }

    /// Stop the current music or speech
    pub fn stop_music(&self) -> bool {
        self.playback.stop()
    }

    /// Speak a text
    ///
    /// Returns `Ok(false)` when the text could not be synthesized or played;
    /// parameter and playback-slot errors are returned as errors.
    pub fn speak_text(&self, text: &str, lang: &str, force: bool) -> Result<bool> {
        if text.is_empty() {
            return Err(SoundsError::MissingParameter("text"));
        }
        if lang.is_empty() {
            return Err(SoundsError::MissingParameter("lang"));
        }
        if !langs::is_supported(lang) {
            return Err(SoundsError::InvalidParameter(format!(
                "Specified lang \"{}\" is invalid",
                lang
            )));
        }

        self.playback.ensure_available(force)?;

        let speech_dir = self.read_config().speech_path.clone();
        let path = match self.synthesizer.synthesize(text, lang, &speech_dir) {
            Ok(path) => path,
            Err(e) => {
                error!(text = %text, error = %e, "Exception when converting text to speech");
                return Ok(false);
            }
        };

        let request = PlaybackRequest {
            path,
            volume: self.volume.get(),
            delete_on_finish: true,
        };
        match self.playback.play(request, force) {
            Ok(_) => Ok(true),
            Err(SoundsError::Conflict) => Err(SoundsError::Conflict),
            Err(e) => {
                error!(text = %text, error = %e, "Unable to play speech");
                Ok(false)
            }
        }
    }

    /// Speak a profile with the configured language
    pub fn render(&self, profile: &TextToSpeechProfile) -> Result<bool> {
        let lang = self.read_config().lang.clone();
        self.speak_text(&profile.text, &lang, false)
    }

    /// Render a host event if a formatter handles it
    ///
    /// Returns `None` for events without formatter.
    pub fn handle_event(&self, event: &HostEvent) -> Result<Option<bool>> {
        match self.formatters.format(event) {
            Some(profile) => self.render(&profile).map(Some),
            None => {
                debug!(event = %event.name, "No formatter for event");
                Ok(None)
            }
        }
    }

    fn read_config(&self) -> std::sync::RwLockReadGuard<'_, Config> {
        self.config.read().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_library(&self) -> MutexGuard<'_, ()> {
        self.library_lock.lock().unwrap_or_else(|e| e.into_inner())
    }
}
