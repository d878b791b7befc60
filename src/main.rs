mod audio;
mod config;
mod controller;
mod logging;
mod model;
mod podcast_index;
mod rpc;
mod view;

#[cfg(test)]
mod test_support;

use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::runtime::Handle;

use audio::AudioBackend;
use config::Config;
use controller::{AppController, PlayerController, SearchController};
use model::{FileStore, PlayerStorage, PlayerStore, SearchHistory};
use podcast_index::PodcastIndexClient;
use rpc::PodcastIndexRouter;
use view::AppView;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse first so --help and missing credentials print before the TUI starts
    let config = Config::parse().validate()?;

    if let Err(e) = logging::init_logging() {
        eprintln!("Warning: Failed to initialize logging: {}", e);
    }

    tracing::info!("=== podcast-rs starting ===");
    tracing::debug!(
        endpoint = %config.endpoint,
        data_dir = %config.data_dir.display(),
        "Configuration loaded"
    );

    let client = PodcastIndexClient::new(
        config.credentials(),
        config.endpoint.clone(),
        config.request_timeout(),
    )?;
    let procedures = Arc::new(PodcastIndexRouter::new(Arc::new(client)));

    let storage = PlayerStorage::new(Arc::new(FileStore::new(config.data_dir.clone())));
    let store = PlayerStore::new(storage.clone());
    let history = SearchHistory::load(storage.clone(), config.history_size);

    let audio = AudioBackend::new(Handle::current())?;
    let player = PlayerController::new(store.clone(), storage, Box::new(audio));
    let search = SearchController::new(store.clone(), procedures, history, config.limits());
    let mut controller = AppController::new(store, search, player);

    tracing::info!("Starting TUI...");

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut controller);

    controller.shutdown();

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        tracing::error!(error = ?err, "Application error");
    }

    tracing::info!("podcast-rs shutting down");
    Ok(())
}

/// The loop runs on the runtime thread; searches are spawned and land in the
/// store, so polling for keys never blocks on the network.
fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    controller: &mut AppController,
) -> io::Result<()> {
    loop {
        controller.tick();

        let playback = controller.playback_info();
        let snapshot = controller.snapshot();

        terminal.draw(|f| {
            AppView::render(f, &playback, controller.ui_state(), &snapshot);
        })?;

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                controller.handle_key_event(key);
            }
        }

        if controller.should_quit() {
            break;
        }
    }

    Ok(())
}
