//! Sound and music library on disk
//!
//! Two flat directories, one per [`LibraryKind`]. File names are the only
//! identifiers; there is no metadata store.

use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

use crate::error::{Result, SoundsError};

/// Extensions accepted for short sounds
pub const SOUND_EXTENSIONS: &[&str] = &["ogg", "wav"];

/// Extensions accepted for music tracks
pub const MUSIC_EXTENSIONS: &[&str] = &["mp3", "wav", "ogg"];

/// Which half of the library an operation targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LibraryKind {
    /// Short sound effects
    Sound,
    /// Long-form music tracks
    Music,
}

impl fmt::Display for LibraryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LibraryKind::Sound => write!(f, "sound"),
            LibraryKind::Music => write!(f, "music"),
        }
    }
}

/// A file of the library
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AudioEntry {
    /// File name without extension
    pub name: String,
    /// File name with extension
    pub fullname: String,
}

/// Entry of the sounds directory
pub type SoundEntry = AudioEntry;

/// Entry of the musics directory
pub type MusicEntry = AudioEntry;

/// Directories and allowed extensions of a library
#[derive(Debug, Clone)]
pub struct LibraryLayout {
    /// Sounds directory
    pub sounds_dir: PathBuf,
    /// Musics directory
    pub musics_dir: PathBuf,
    /// Allowed sound extensions, lowercase
    pub sound_extensions: Vec<String>,
    /// Allowed music extensions, lowercase
    pub music_extensions: Vec<String>,
}

impl LibraryLayout {
    /// Layout with the default extension allow-lists
    pub fn new(sounds_dir: PathBuf, musics_dir: PathBuf) -> Self {
        Self {
            sounds_dir,
            musics_dir,
            sound_extensions: SOUND_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            music_extensions: MUSIC_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }
}

/// File operations over the sounds and musics directories
#[derive(Debug, Clone)]
pub struct Library {
    layout: LibraryLayout,
}

impl Library {
    /// Create a library; directories are created by [`Library::ensure_dirs`]
    pub fn new(layout: LibraryLayout) -> Self {
        Self { layout }
    }

    /// Directory and extension settings
    pub fn layout(&self) -> &LibraryLayout {
        &self.layout
    }

    /// Directory of the given kind
    pub fn dir(&self, kind: LibraryKind) -> &Path {
        match kind {
            LibraryKind::Sound => &self.layout.sounds_dir,
            LibraryKind::Music => &self.layout.musics_dir,
        }
    }

    fn extensions(&self, kind: LibraryKind) -> &[String] {
        match kind {
            LibraryKind::Sound => &self.layout.sound_extensions,
            LibraryKind::Music => &self.layout.music_extensions,
        }
    }

    /// Create both directories if missing
    pub fn ensure_dirs(&self) -> Result<()> {
        for kind in [LibraryKind::Sound, LibraryKind::Music] {
            let dir = self.dir(kind);
            fs::create_dir_all(dir)?;
            debug!(kind = %kind, path = %dir.display(), "Library directory ready");
        }
        Ok(())
    }

    /// List files of a directory, non-recursively
    pub fn list(&self, kind: LibraryKind) -> Result<Vec<AudioEntry>> {
        let dir = self.dir(kind);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let path = entry.path();
            let (Some(fullname), Some(name)) = (
                path.file_name().and_then(|n| n.to_str()),
                path.file_stem().and_then(|n| n.to_str()),
            ) else {
                continue;
            };
            entries.push(AudioEntry {
                name: name.to_string(),
                fullname: fullname.to_string(),
            });
        }

        Ok(entries)
    }

    /// Resolve an existing file of the library by its full name
    pub fn resolve(&self, kind: LibraryKind, fullname: &str) -> Result<PathBuf> {
        if fullname.is_empty() {
            return Err(SoundsError::MissingParameter("fullname"));
        }
        let path = self.path_of(kind, fullname)?;
        if !path.is_file() {
            return Err(SoundsError::InvalidParameter(format!(
                "Specified {} file \"{}\" is invalid",
                kind, fullname
            )));
        }
        Ok(path)
    }

    /// Path a file of the library would have, without checking existence
    pub fn path_of(&self, kind: LibraryKind, fullname: &str) -> Result<PathBuf> {
        // names must stay inside the library directory
        let is_plain = Path::new(fullname)
            .file_name()
            .is_some_and(|name| name == fullname);
        if !is_plain {
            return Err(SoundsError::InvalidParameter(format!(
                "Invalid {} file name \"{}\"",
                kind, fullname
            )));
        }
        Ok(self.dir(kind).join(fullname))
    }

    /// Move a local file into the library
    ///
    /// Returns the new path. The source is left untouched when validation
    /// fails.
    pub fn add(&self, kind: LibraryKind, source: &Path) -> Result<PathBuf> {
        if source.as_os_str().is_empty() {
            return Err(SoundsError::MissingParameter("filepath"));
        }

        let allowed = self.extensions(kind);
        let extension = source
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        debug!(kind = %kind, extension = ?extension, "Adding file to library");
        if !extension.is_some_and(|ext| allowed.contains(&ext)) {
            return Err(SoundsError::InvalidParameter(format!(
                "Invalid {} file uploaded (only {} are supported)",
                kind,
                allowed.join(",")
            )));
        }

        if !source.is_file() {
            error!(kind = %kind, path = %source.display(), "File to add doesn't exist");
            return Err(SoundsError::NotFound(source.to_path_buf()));
        }

        let name = source
            .file_name()
            .ok_or_else(|| SoundsError::InvalidParameter(source.display().to_string()))?;
        let target = self.dir(kind).join(name);
        move_file(source, &target)?;

        info!(kind = %kind, path = %target.display(), "File added to library");
        Ok(target)
    }

    /// Delete a file of the library by its full name
    pub fn delete(&self, kind: LibraryKind, fullname: &str) -> Result<()> {
        let path = self.resolve(kind, fullname)?;
        fs::remove_file(&path)?;
        info!(kind = %kind, file = %fullname, "File deleted from library");
        Ok(())
    }
}

/// Rename, falling back to copy and remove across filesystems
fn move_file(source: &Path, target: &Path) -> std::io::Result<()> {
    if fs::rename(source, target).is_ok() {
        return Ok(());
    }
    fs::copy(source, target)?;
    fs::remove_file(source)
}
