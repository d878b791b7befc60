//! Controller module - Application logic and event handling
//!
//! - `input`: Key event handling
//! - `search`: Search and open-feed flows
//! - `player`: Binding between the store and the audio output

mod input;
mod player;
mod search;

use std::sync::Arc;

use crate::model::{PlaybackInfo, PlayerStore, PlayerStoreState, UiState, View};

pub use player::PlayerController;
pub use search::{SearchController, SearchLimits};

/// Owned by the main loop; holds everything a key press or a frame can touch
pub struct AppController {
    pub(crate) store: PlayerStore,
    pub(crate) search: SearchController,
    pub(crate) player: PlayerController,
    pub(crate) ui: UiState,
}

impl AppController {
    pub fn new(store: PlayerStore, search: SearchController, player: PlayerController) -> Self {
        let ui = UiState {
            history: search.history(),
            ..Default::default()
        };
        Self {
            store,
            search,
            player,
            ui,
        }
    }

    /// Advance the player and keep selections inside their lists
    pub fn tick(&mut self) {
        self.player.tick();
        if self.ui.history_cursor.is_none() {
            self.ui.history = self.search.history();
        }

        let state = self.store.snapshot();
        let results_len = Self::results_len(&state);
        self.ui.results_selected = self.ui.results_selected.min(results_len.saturating_sub(1));
        self.ui.queue_selected = self.ui.queue_selected.min(state.queue.len().saturating_sub(1));
    }

    pub(crate) fn results_len(state: &PlayerStoreState) -> usize {
        match state.view {
            View::Podcast => state.podcasts.as_ref().map_or(0, |r| r.presentable().len()),
            View::Episode => state.episodes.as_ref().map_or(0, |r| r.presentable().len()),
        }
    }

    pub fn snapshot(&self) -> Arc<PlayerStoreState> {
        self.store.snapshot()
    }

    pub fn ui_state(&self) -> &UiState {
        &self.ui
    }

    pub fn playback_info(&self) -> PlaybackInfo {
        self.player.info()
    }

    pub fn should_quit(&self) -> bool {
        self.ui.should_quit
    }

    pub fn shutdown(&mut self) {
        self.player.shutdown();
    }
}
