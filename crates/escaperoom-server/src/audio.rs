use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::Context;
use escape_engine::AudioPlayer;
use tokio::process::Command;
use tokio::runtime::Handle;

use crate::config::AudioPlayerSettings;

/// Plays sounds by running an external player program in the background.
///
/// Sound names are resolved against the configured base path.
#[derive(Debug, Clone)]
pub struct CommandAudioPlayer {
    base_path: PathBuf,
    program: String,
    args: Vec<String>,
}

impl CommandAudioPlayer {
    pub fn new(base_path: PathBuf, player: &AudioPlayerSettings) -> Self {
        Self {
            base_path,
            program: player.program.clone(),
            args: player.args.clone(),
        }
    }

    fn resolve(&self, sound_file: &str) -> PathBuf {
        self.base_path.join(sound_file)
    }
}

impl AudioPlayer for CommandAudioPlayer {
    fn play(&self, sound_file: &str) {
        let path = self.resolve(sound_file);
        let Ok(runtime) = Handle::try_current() else {
            tracing::error!(path = %path.display(), "No runtime available to play sound");
            return;
        };
        let program = self.program.clone();
        let args = self.args.clone();
        runtime.spawn(async move {
            if let Err(error) = play_file(&program, &args, &path).await {
                tracing::error!(path = %path.display(), "{error:#}");
            }
        });
    }
}

async fn play_file(program: &str, args: &[String], path: &Path) -> anyhow::Result<()> {
    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
        anyhow::bail!("Audio file not found: {}", path.display());
    }

    tracing::info!(path = %path.display(), "Playing sound");
    let status = Command::new(program)
        .args(args)
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .with_context(|| format!("Could not start audio player '{program}'"))?;
    anyhow::ensure!(status.success(), "Audio player '{program}' exited with {status}");

    tracing::debug!(path = %path.display(), "Finished playing sound");
    Ok(())
}
