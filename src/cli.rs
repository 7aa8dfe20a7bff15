//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Browse a media catalog in the terminal and download streams.
///
/// Without a subcommand streamdl opens the interactive browser. Search for a
/// title, drill into seasons and episodes, then play or download a stream.
#[derive(Parser, Debug)]
#[command(name = "streamdl")]
#[command(author, version, about)]
pub struct Args {
    /// Increase log verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the config file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Directory downloads are written into
    #[arg(short = 'o', long, value_name = "DIR", global = true)]
    pub output_dir: Option<PathBuf>,

    /// Catalog API base URL
    #[arg(long, value_name = "URL")]
    pub catalog_url: Option<String>,

    /// Stream addon base URL (item ids are appended as `<id>.json`)
    #[arg(long, value_name = "URL")]
    pub addon_url: Option<String>,

    /// Media player command used for playback
    #[arg(long, value_name = "COMMAND")]
    pub player: Option<String>,

    /// Seconds between batch lookup starts (0-60)
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(0..=60))]
    pub stagger_secs: Option<u64>,

    /// Write logs to this file
    #[arg(long, value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Download a single stream URL without opening the browser
    Download {
        /// Stream URL
        url: String,

        /// Display name used to derive the file name
        #[arg(long)]
        name: Option<String>,
    },
}
