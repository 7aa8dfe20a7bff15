use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

/// Where diagnostics go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LogTarget<'a> {
    /// Headless runs own stderr.
    Stderr,
    /// Append to a file; the interactive browser owns the terminal.
    File(&'a Path),
    /// No subscriber is installed.
    Discard,
}

/// Chooses the log target for a run.
pub(crate) fn log_target(interactive: bool, log_file: Option<&Path>) -> LogTarget<'_> {
    match (log_file, interactive) {
        (Some(path), _) => LogTarget::File(path),
        (None, true) => LogTarget::Discard,
        (None, false) => LogTarget::Stderr,
    }
}

pub(crate) fn no_color_env_requested() -> bool {
    std::env::var_os("NO_COLOR").is_some_and(|value| !value.is_empty())
}

fn env_filter(default_level: &str, force_cli_level: bool) -> EnvFilter {
    if force_cli_level {
        EnvFilter::new(default_level)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
    }
}

pub(crate) fn init_tracing(
    default_level: &str,
    force_cli_level: bool,
    target: LogTarget<'_>,
) -> Result<()> {
    let filter = env_filter(default_level, force_cli_level);
    match target {
        LogTarget::Discard => {}
        LogTarget::Stderr => {
            let _ = tracing_subscriber::fmt()
                .with_writer(std::io::stderr)
                .with_ansi(!no_color_env_requested())
                .with_env_filter(filter)
                .try_init();
        }
        LogTarget::File(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create log directory '{}'", parent.display())
                })?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file '{}'", path.display()))?;
            let _ = tracing_subscriber::fmt()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_env_filter(filter)
                .try_init();
        }
    }
    Ok(())
}
