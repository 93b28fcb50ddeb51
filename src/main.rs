// home-sounds - sounds, musics and text-to-speech for home automation

use anyhow::{Context, Result};
use clap::Parser;
use std::io::{BufRead, Write};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use home_sounds::{
    commands::{self, Cli, Command, Outcome},
    config::Config,
    module::SoundsModule,
    watcher::LibraryWatcher,
};

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let (config, config_path) = match &cli.config {
        Some(path) => {
            let config = if path.exists() {
                Config::load_from(path)
                    .with_context(|| format!("Failed to load config {}", path.display()))?
            } else {
                let config = Config::default();
                config.save_to(path)?;
                config
            };
            (config, path.clone())
        }
        None => (Config::load()?, Config::config_path()?),
    };
    tracing::debug!("Configuration loaded: {:?}", config);

    let module = SoundsModule::open(config)
        .context("Failed to initialize sounds module")?
        .with_config_path(config_path);
    module.configure()?;

    match cli.command {
        Command::Serve => serve(Arc::new(module)),
        command => {
            let starts_playback = command.starts_playback();
            let is_sound = matches!(command, Command::PlaySound { .. });
            if let Outcome::Output(text) = commands::execute(&module, command)? {
                println!("{}", text);
            }
            if starts_playback {
                commands::wait_for_playback(&module);
            } else if is_sound {
                // let the clip reach the output before the process exits
                thread::sleep(Duration::from_secs(2));
            }
            Ok(())
        }
    }
}

/// Command loop over standard input
fn serve(module: Arc<SoundsModule>) -> Result<()> {
    tracing::info!("Serving commands from stdin");

    let watcher = LibraryWatcher::new(module.library().dir(home_sounds::LibraryKind::Sound))?;
    let background = module.clone();
    thread::Builder::new()
        .name("library-watcher".to_string())
        .spawn(move || {
            while watcher.next_batch(Duration::from_millis(200)).is_some() {
                if let Err(e) = background.sync_sound_cache() {
                    tracing::error!(error = %e, "Sound cache reconciliation failed");
                }
            }
        })
        .context("Failed to spawn library watcher thread")?;

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    for line in stdin.lock().lines() {
        let line = line.context("Failed to read command")?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let outcome =
            commands::parse_line(line).and_then(|command| commands::execute(&module, command));

        match outcome {
            Ok(Outcome::Output(text)) => writeln!(stdout, "{}", text)?,
            Ok(Outcome::Quit) => break,
            Err(e) => writeln!(stdout, "error: {:#}", e)?,
        }
        stdout.flush()?;
    }

    module.stop_music();
    tracing::info!("Command loop finished");
    Ok(())
}
