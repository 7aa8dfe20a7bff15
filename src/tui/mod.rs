//! Interactive terminal front end.
//!
//! Owns the terminal for the lifetime of the browser. Terminal input and a
//! redraw tick are turned into [`AppEvent`]s on the same channel the
//! background tasks report into, so the loop below is the only consumer of
//! application state.

mod input;
mod theme;
mod ui;

use std::io;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::{Backend, CrosstermBackend};
use streamdl_core::{App, AppEvent, EventSink};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;
use tracing::info;

const TICK_INTERVAL: Duration = Duration::from_millis(100);

fn restore_terminal() {
    let _ = disable_raw_mode();
    let _ = execute!(io::stdout(), LeaveAlternateScreen);
}

/// Runs the browser until the user quits.
pub(crate) async fn run(
    mut app: App,
    sink: EventSink,
    mut events: UnboundedReceiver<AppEvent>,
) -> Result<()> {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        restore_terminal();
        original_hook(panic_info);
    }));

    enable_raw_mode().context("Failed to enable raw terminal mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("Failed to enter alternate screen")?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let stop = CancellationToken::new();
    let reader = input::spawn_reader(sink.clone(), stop.clone());
    let ticker = input::spawn_ticker(sink, TICK_INTERVAL, stop.clone());

    let result = event_loop(&mut terminal, &mut app, &mut events).await;

    stop.cancel();
    ticker.abort();
    let _ = reader.await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    info!(
        downloads = app.downloads().downloads().len(),
        active = app.downloads().active_count(),
        "browser closed"
    );
    result
}

async fn event_loop<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    events: &mut UnboundedReceiver<AppEvent>,
) -> Result<()> {
    loop {
        terminal.draw(|frame| ui::draw(frame, app))?;

        let Some(event) = events.recv().await else {
            return Ok(());
        };
        app.handle_event(event);
        while let Ok(event) = events.try_recv() {
            app.handle_event(event);
        }

        if app.should_quit() {
            return Ok(());
        }
    }
}
