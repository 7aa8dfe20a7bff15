//! Configuration loading and CLI override resolution.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use streamdl_core::catalog::{DEFAULT_CATALOG_URL, DEFAULT_SEARCH_LIMIT};
use streamdl_core::player::DEFAULT_PLAYER;
use streamdl_core::{HttpTimeouts, Settings};

use crate::cli::Args;

/// File-backed configuration. Every field is optional; CLI flags win.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    /// Directory downloads are written into.
    pub download_dir: Option<PathBuf>,
    /// Catalog API base URL.
    pub catalog_url: Option<String>,
    /// Stream addon base URL.
    pub addon_url: Option<String>,
    /// Player command line.
    pub player: Option<String>,
    /// Titles requested per search (1..=100).
    pub search_limit: Option<u64>,
    /// Seconds between batch lookup starts (0..=60).
    pub batch_stagger_secs: Option<u64>,
    /// Transfer progress sampling interval (100..=250).
    pub progress_interval_ms: Option<u64>,
    /// HTTP connect timeout in seconds.
    pub connect_timeout_secs: Option<u64>,
    /// HTTP read (idle) timeout in seconds. Applies to lookups and transfers.
    pub read_timeout_secs: Option<u64>,
    /// Log file path.
    pub log_file: Option<PathBuf>,
    /// Default verbosity mode.
    pub verbosity: Option<VerbositySetting>,
}

impl FileConfig {
    /// Validates config values against runtime constraints.
    pub fn validate(&self) -> Result<()> {
        validate_range("search_limit", self.search_limit, 1, 100)?;
        validate_range("batch_stagger_secs", self.batch_stagger_secs, 0, 60)?;
        validate_range("progress_interval_ms", self.progress_interval_ms, 100, 250)?;
        validate_range("connect_timeout_secs", self.connect_timeout_secs, 1, 3600)?;
        validate_range("read_timeout_secs", self.read_timeout_secs, 1, 3600)?;
        Ok(())
    }
}

fn validate_range(field: &str, value: Option<u64>, min: u64, max: u64) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(min..=max).contains(&value) {
        bail!("Invalid config value for `{field}`: {value}. Expected range: {min}..={max}");
    }
    Ok(())
}

/// Supported config verbosity labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerbositySetting {
    Default,
    Verbose,
    Quiet,
    Debug,
}

impl VerbositySetting {
    /// Tracing level this mode maps to.
    #[must_use]
    pub fn level(self) -> &'static str {
        match self {
            Self::Default => "info",
            Self::Verbose => "debug",
            Self::Quiet => "error",
            Self::Debug => "trace",
        }
    }
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/streamdl/config.toml`
/// 2. `$HOME/.config/streamdl/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("streamdl")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("streamdl")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads the config file named on the command line, or the default one if
/// it exists. An explicit path that does not exist is an error.
pub fn load_file_config(explicit: Option<&Path>) -> Result<FileConfig> {
    if let Some(path) = explicit {
        return read_file_config(path);
    }
    match resolve_default_config_path() {
        Some(path) if path.exists() => read_file_config(&path),
        _ => Ok(FileConfig::default()),
    }
}

fn read_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }
        let line_no = line_index + 1;

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!("Invalid config syntax on line {line_no}: expected key = value");
        };

        let key = raw_key.trim();
        let value = raw_value.trim();

        match key {
            "download_dir" => {
                cfg.download_dir = Some(PathBuf::from(string_value(key, value, line_no)?));
            }
            "catalog_url" => cfg.catalog_url = Some(string_value(key, value, line_no)?),
            "addon_url" => cfg.addon_url = Some(string_value(key, value, line_no)?),
            "player" => cfg.player = Some(string_value(key, value, line_no)?),
            "log_file" => cfg.log_file = Some(PathBuf::from(string_value(key, value, line_no)?)),
            "search_limit" => cfg.search_limit = Some(integer_value(key, value, line_no)?),
            "batch_stagger_secs" => {
                cfg.batch_stagger_secs = Some(integer_value(key, value, line_no)?);
            }
            "progress_interval_ms" => {
                cfg.progress_interval_ms = Some(integer_value(key, value, line_no)?);
            }
            "connect_timeout_secs" => {
                cfg.connect_timeout_secs = Some(integer_value(key, value, line_no)?);
            }
            "read_timeout_secs" => {
                cfg.read_timeout_secs = Some(integer_value(key, value, line_no)?);
            }
            "verbosity" => {
                let parsed = string_value(key, value, line_no)?;
                cfg.verbosity = Some(parse_verbosity(&parsed).with_context(|| {
                    format!("Invalid `verbosity` value '{parsed}' on line {line_no}")
                })?);
            }
            unknown => {
                bail!("Unknown configuration key: '{unknown}' on line {line_no}");
            }
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

fn string_value(key: &str, value: &str, line_no: usize) -> Result<String> {
    parse_string_literal(value).with_context(|| format!("Invalid `{key}` value on line {line_no}"))
}

fn integer_value(key: &str, value: &str, line_no: usize) -> Result<u64> {
    parse_integer_u64(value).with_context(|| format!("Invalid `{key}` value on line {line_no}"))
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(raw_value: &str) -> Result<String> {
    if raw_value.len() < 2 || !raw_value.starts_with('"') || !raw_value.ends_with('"') {
        bail!("Expected double-quoted string");
    }
    Ok(raw_value[1..raw_value.len() - 1].to_string())
}

fn parse_integer_u64(raw_value: &str) -> Result<u64> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected integer value");
    }
    let value = token.parse::<i128>()?;
    if value < 0 {
        bail!("Expected non-negative integer");
    }
    u64::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for u64"))
}

fn parse_verbosity(value: &str) -> Result<VerbositySetting> {
    match value {
        "default" => Ok(VerbositySetting::Default),
        "verbose" => Ok(VerbositySetting::Verbose),
        "quiet" => Ok(VerbositySetting::Quiet),
        "debug" => Ok(VerbositySetting::Debug),
        _ => bail!("Expected one of: default, verbose, quiet, debug"),
    }
}

/// Everything the binary needs after merging file config and CLI flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub settings: Settings,
    pub catalog_url: String,
    pub addon_url: Option<String>,
    pub player: String,
    pub lookup_timeouts: HttpTimeouts,
    pub transfer_timeouts: HttpTimeouts,
    pub log_file: Option<PathBuf>,
    /// Default tracing level when `RUST_LOG` is unset.
    pub log_level: &'static str,
    /// `-v`/`-q` were given, so they override `RUST_LOG`.
    pub force_log_level: bool,
}

/// Merges `file` under `args`.
#[must_use]
pub fn resolve(args: &Args, file: FileConfig) -> RunConfig {
    let defaults = Settings::default();
    let connect_secs = file
        .connect_timeout_secs
        .unwrap_or(HttpTimeouts::LOOKUP.connect_secs);

    let settings = Settings {
        download_dir: args
            .output_dir
            .clone()
            .or(file.download_dir)
            .unwrap_or(defaults.download_dir),
        search_limit: file
            .search_limit
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(DEFAULT_SEARCH_LIMIT),
        batch_stagger: args
            .stagger_secs
            .or(file.batch_stagger_secs)
            .map_or(defaults.batch_stagger, Duration::from_secs),
        progress_interval: file
            .progress_interval_ms
            .map_or(defaults.progress_interval, Duration::from_millis),
    };

    RunConfig {
        settings,
        catalog_url: args
            .catalog_url
            .clone()
            .or(file.catalog_url)
            .unwrap_or_else(|| DEFAULT_CATALOG_URL.to_string()),
        addon_url: args.addon_url.clone().or(file.addon_url),
        player: args
            .player
            .clone()
            .or(file.player)
            .unwrap_or_else(|| DEFAULT_PLAYER.to_string()),
        lookup_timeouts: HttpTimeouts {
            connect_secs,
            read_secs: file
                .read_timeout_secs
                .unwrap_or(HttpTimeouts::LOOKUP.read_secs),
        },
        transfer_timeouts: HttpTimeouts {
            connect_secs,
            read_secs: file
                .read_timeout_secs
                .unwrap_or(HttpTimeouts::TRANSFER.read_secs),
        },
        log_file: args.log_file.clone().or(file.log_file),
        log_level: resolve_log_level(args, file.verbosity),
        force_log_level: args.quiet || args.verbose > 0,
    }
}

/// Priority: `--quiet` > `-v` > config verbosity > info. `RUST_LOG` is
/// applied on top by the tracing setup unless a flag was given.
fn resolve_log_level(args: &Args, verbosity: Option<VerbositySetting>) -> &'static str {
    if args.quiet {
        return "error";
    }
    match args.verbose {
        0 => verbosity.map_or("info", VerbositySetting::level),
        1 => "debug",
        _ => "trace",
    }
}
