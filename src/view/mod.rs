//! View module - UI rendering
//!
//! This module handles all UI rendering for the application using ratatui.
//! It is organized into submodules by component type:
//!
//! - `utils`: Shared utility functions (formatting, scrollable lists)
//! - `layout`: Top bar and queue panel
//! - `content`: Feed and episode lists
//! - `progress`: Player bar
//! - `overlays`: Error notification and help popup

mod utils;
mod layout;
mod content;
mod progress;
mod overlays;

use ratatui::{
    layout::{Constraint, Direction, Layout},
    Frame,
};

use crate::model::{PlaybackInfo, PlayerStoreState, UiState};

pub struct AppView;

impl AppView {
    pub fn render(frame: &mut Frame, playback: &PlaybackInfo, ui_state: &UiState, store: &PlayerStoreState) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Search bar + status
                Constraint::Min(0),    // Results + queue
                Constraint::Length(3), // Player bar
            ])
            .split(frame.area());

        // Top bar: Search + request status
        layout::render_top_bar(frame, chunks[0], ui_state, store);

        // Middle: Results (feeds or episodes) and the queue
        let main_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
            .split(chunks[1]);

        let playing_id = playback.episode.as_ref().map(|e| e.id);
        content::render_results(frame, main_chunks[0], ui_state, store, playing_id);
        layout::render_queue(frame, main_chunks[1], ui_state, store);

        // Bottom: Progress bar with episode info and controls
        progress::render_progress_bar(frame, chunks[2], playback);

        // Error notification overlay (if there's an error)
        if let Some(error) = &store.error_message {
            overlays::render_error_notification(frame, error);
        }

        // Help popup overlay (if open)
        if ui_state.show_help_popup {
            overlays::render_help_popup(frame);
        }
    }
}
