//! External media player launch.

use std::process::Stdio;

use thiserror::Error;
use tracing::{debug, info, warn};

/// Default player program.
pub const DEFAULT_PLAYER: &str = "mpv";

/// Errors from launching a player.
#[derive(Debug, Error)]
pub enum PlayerError {
    /// The player process could not be started.
    #[error("{source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

impl PlayerError {
    pub fn spawn(program: impl Into<String>, source: std::io::Error) -> Self {
        Self::Spawn {
            program: program.into(),
            source,
        }
    }
}

/// Starts playback of a stream URL without waiting for it to finish.
pub trait Player: Send + Sync {
    /// Name shown in status messages.
    fn name(&self) -> &str;

    /// Launches playback of `url`.
    ///
    /// # Errors
    ///
    /// Returns [`PlayerError::Spawn`] when the process could not be started.
    fn play(&self, url: &str) -> Result<(), PlayerError>;
}

/// Runs a player program with the URL as its last argument.
#[derive(Debug, Clone)]
pub struct ExternalPlayer {
    program: String,
    args: Vec<String>,
}

impl Default for ExternalPlayer {
    fn default() -> Self {
        Self::new(DEFAULT_PLAYER)
    }
}

impl ExternalPlayer {
    /// Builds a player from a command line such as `"mpv --fs"`.
    ///
    /// The first whitespace-separated word is the program; the rest are passed
    /// before the URL. A blank command falls back to [`DEFAULT_PLAYER`].
    #[must_use]
    pub fn new(command: &str) -> Self {
        let mut words = command.split_whitespace().map(str::to_string);
        let program = words.next().unwrap_or_else(|| DEFAULT_PLAYER.to_string());
        Self {
            program,
            args: words.collect(),
        }
    }

    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }
}

impl Player for ExternalPlayer {
    fn name(&self) -> &str {
        &self.program
    }

    fn play(&self, url: &str) -> Result<(), PlayerError> {
        let mut child = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(false)
            .spawn()
            .map_err(|e| PlayerError::spawn(&self.program, e))?;

        info!(player = %self.program, "player launched");
        let program = self.program.clone();
        // Reap the child so it does not linger as a zombie.
        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) => debug!(player = %program, %status, "player exited"),
                Err(e) => warn!(player = %program, error = %e, "failed to wait for player"),
            }
        });
        Ok(())
    }
}
