//! CLI entry point for the streamdl browser.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use streamdl_core::{
    App, ExternalPlayer, HttpCatalog, HttpStreamProvider, HttpTransfer, Services, event,
};
use tracing::{debug, info};

mod cli;
mod config;
mod headless;
mod terminal;
mod tui;

use cli::{Args, Command};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    let file_config = config::load_file_config(args.config.as_deref())?;
    let run = config::resolve(&args, file_config);

    let interactive = args.command.is_none();
    terminal::init_tracing(
        run.log_level,
        run.force_log_level,
        terminal::log_target(interactive, run.log_file.as_deref()),
    )?;

    debug!(?args, "CLI arguments parsed");
    info!(version = env!("CARGO_PKG_VERSION"), "streamdl starting");

    if let Some(Command::Download { url, name }) = &args.command {
        let path = headless::run_download(&run, url, name.as_deref(), args.quiet).await?;
        println!("{}", path.display());
        return Ok(());
    }

    let services = Services {
        catalog: Arc::new(HttpCatalog::new(&run.catalog_url, run.lookup_timeouts)?),
        streams: Arc::new(HttpStreamProvider::new(
            run.addon_url.as_deref(),
            run.lookup_timeouts,
        )?),
        transfer: Arc::new(HttpTransfer::new(run.transfer_timeouts)?),
        player: Arc::new(ExternalPlayer::new(&run.player)),
    };
    debug!(
        catalog = %run.catalog_url,
        addon_configured = run.addon_url.is_some(),
        download_dir = %run.settings.download_dir.display(),
        "services ready"
    );

    let (sink, events) = event::channel();
    let app = App::new(services, run.settings, sink.clone());
    tui::run(app, sink, events).await
}
