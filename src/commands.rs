//! Host commands
//!
//! Command lines are parsed with clap and dispatched to a [`SoundsModule`].
//! The same commands serve one-shot invocations of the binary and the
//! line-oriented `serve` loop.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use crate::formatter::HostEvent;
use crate::library::AudioEntry;
use crate::module::SoundsModule;

/// Command line of the `home-sounds` binary
#[derive(Debug, Parser)]
#[command(version, about = "Play sounds, musics and spoken text")]
pub struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Commands understood by the module
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// List speech languages
    Langs,
    /// Set the default speech language
    SetLang { lang: String },
    /// Show or set the volume (0..100)
    Volume {
        #[arg(allow_negative_numbers = true)]
        value: Option<i64>,
    },
    /// List sounds
    Sounds,
    /// List musics
    Musics,
    /// Move a local file into the sounds library
    AddSound { path: PathBuf },
    /// Move a local file into the musics library
    AddMusic { path: PathBuf },
    /// Delete a sound by file name
    DeleteSound { fullname: String },
    /// Delete a music by file name
    DeleteMusic { fullname: String },
    /// Play a sound by file name
    PlaySound { fullname: String },
    /// Play a music by file name
    PlayMusic {
        fullname: String,
        /// Stop the current music first
        #[arg(short, long)]
        force: bool,
    },
    /// Play a random music
    Random,
    /// Stop the current music or speech
    Stop,
    /// Speak a text
    Speak {
        text: String,
        /// Language (defaults to the configured one)
        #[arg(short, long)]
        lang: Option<String>,
        /// Stop the current music first
        #[arg(short, long)]
        force: bool,
    },
    /// Render a host event (e.g. system.time.sunrise)
    Event { name: String },
    /// Show the full module state as JSON
    Config,
    /// Read commands from standard input
    Serve,
    /// Leave the command loop
    Exit,
}

impl Command {
    /// Whether the command starts long-form playback
    pub fn starts_playback(&self) -> bool {
        matches!(
            self,
            Command::PlayMusic { .. } | Command::Random | Command::Speak { .. } | Command::Event { .. }
        )
    }
}

/// Result of a dispatched command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Text to show to the user
    Output(String),
    /// Leave the command loop
    Quit,
}

/// Parse one shell-quoted command line
pub fn parse_line(line: &str) -> Result<Command> {
    let mut args = shlex::split(line).context("Invalid quoting")?;
    args.insert(0, "home-sounds".to_string());
    let cli = Cli::try_parse_from(args)?;
    Ok(cli.command)
}

/// Run a command against the module
pub fn execute(module: &SoundsModule, command: Command) -> Result<Outcome> {
    let output = match command {
        Command::Langs => {
            let info = module.get_langs();
            info.langs
                .iter()
                .map(|(code, name)| {
                    let marker = if *code == info.lang { "*" } else { " " };
                    format!("{} {:<7} {}", marker, code, name)
                })
                .collect::<Vec<_>>()
                .join("\n")
        }
        Command::SetLang { lang } => {
            module.set_lang(&lang)?;
            format!("Language set to {}", lang)
        }
        Command::Volume { value: Some(value) } => {
            module.set_volume(value)?;
            format!("Volume set to {}", value)
        }
        Command::Volume { value: None } => module.get_volume().to_string(),
        Command::Sounds => format_entries(module.get_sounds()?),
        Command::Musics => format_entries(module.get_musics()?),
        Command::AddSound { path } => {
            module.add_sound(&path)?;
            format!("Sound {} added", path.display())
        }
        Command::AddMusic { path } => {
            module.add_music(&path)?;
            format!("Music {} added", path.display())
        }
        Command::DeleteSound { fullname } => {
            module.delete_sound(&fullname)?;
            format!("Sound {} deleted", fullname)
        }
        Command::DeleteMusic { fullname } => {
            module.delete_music(&fullname)?;
            format!("Music {} deleted", fullname)
        }
        Command::PlaySound { fullname } => {
            module.play_sound(&fullname)?;
            format!("Playing sound {}", fullname)
        }
        Command::PlayMusic { fullname, force } => {
            let session = module.play_music(&fullname, force)?;
            format!("Playing music {} (session {})", fullname, session)
        }
        Command::Random => match module.play_random_music()? {
            Some(fullname) => format!("Playing music {}", fullname),
            None => "No music to play".to_string(),
        },
        Command::Stop => {
            if module.stop_music() {
                "Playback stopped".to_string()
            } else {
                "Nothing is playing".to_string()
            }
        }
        Command::Speak { text, lang, force } => {
            let lang = lang.unwrap_or_else(|| module.config().lang);
            if module.speak_text(&text, &lang, force)? {
                "Speaking".to_string()
            } else {
                "Unable to speak text".to_string()
            }
        }
        Command::Event { name } => match module.handle_event(&HostEvent::new(name.clone()))? {
            Some(true) => format!("Event {} rendered", name),
            Some(false) => format!("Unable to render event {}", name),
            None => format!("No formatter for event {}", name),
        },
        Command::Config => serde_json::to_string_pretty(&module.get_module_config()?)?,
        Command::Serve => "Already serving".to_string(),
        Command::Exit => return Ok(Outcome::Quit),
    };

    Ok(Outcome::Output(output))
}

/// Block until long-form playback ends, for one-shot invocations
pub fn wait_for_playback(module: &SoundsModule) {
    // no upper bound: a music plays until its end
    while !module.playback().wait_idle(Duration::from_secs(3600)) {}
}

fn format_entries(entries: Vec<AudioEntry>) -> String {
    if entries.is_empty() {
        return "(empty)".to_string();
    }
    let mut names: Vec<String> = entries.into_iter().map(|e| e.fullname).collect();
    names.sort();
    names.join("\n")
}
