//! Key event handling

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::model::{ActiveSection, Episode, View};
use super::AppController;

impl AppController {
    pub fn handle_key_event(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }

        // Ctrl+C / Ctrl+Q quit from anywhere, overlays and search box included
        if key.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('q'))
        {
            self.ui.should_quit = true;
            return;
        }

        // Error message blocks all other interactions
        if self.store.snapshot().error_message.is_some() {
            if matches!(key.code, KeyCode::Esc | KeyCode::Enter) {
                self.store.clear_error();
            }
            return;
        }

        if self.ui.show_help_popup {
            if matches!(
                key.code,
                KeyCode::Esc | KeyCode::Char('h') | KeyCode::Char('H') | KeyCode::Char('?')
            ) {
                self.ui.show_help_popup = false;
            }
            return;
        }

        match key.code {
            KeyCode::Tab => {
                self.ui.active_section = self.ui.active_section.next();
                return;
            }
            KeyCode::BackTab => {
                self.ui.active_section = self.ui.active_section.prev();
                return;
            }
            _ => {}
        }

        if self.ui.active_section == ActiveSection::Search {
            self.handle_search_key(key);
            return;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') => self.ui.should_quit = true,
            KeyCode::Char('h') | KeyCode::Char('H') | KeyCode::Char('?') => {
                self.ui.show_help_popup = true;
            }
            KeyCode::Char('/') => self.ui.active_section = ActiveSection::Search,
            KeyCode::Char(' ') => self.player.toggle_play_pause(),
            KeyCode::Char(']') => self.player.skip_forward(),
            KeyCode::Char('[') => self.player.skip_backward(),
            KeyCode::Char('s') | KeyCode::Char('S') => self.store.stop(),
            // 0-9 jump to 0%-90% of the episode
            KeyCode::Char(c @ '0'..='9') => {
                if let Some(tenths) = c.to_digit(10) {
                    self.player.seek_to_fraction(tenths as u8);
                }
            }
            _ => match self.ui.active_section {
                ActiveSection::Results => self.handle_results_key(key),
                ActiveSection::Queue => self.handle_queue_key(key),
                ActiveSection::Search => {}
            },
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => {
                let term = self.ui.search_query.trim().to_string();
                if term.is_empty() {
                    return;
                }
                self.ui.history_cursor = None;
                self.ui.results_selected = 0;
                self.ui.active_section = ActiveSection::Results;

                let search = self.search.clone();
                tokio::spawn(async move { search.perform_search(&term).await });
            }
            KeyCode::Esc => {
                self.ui.search_query.clear();
                self.ui.history_cursor = None;
            }
            KeyCode::Up => self.recall_history(1),
            KeyCode::Down => self.recall_history(-1),
            KeyCode::Char('x') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.search.clear_history();
                self.ui.history.clear();
                self.ui.history_cursor = None;
            }
            KeyCode::Backspace => {
                self.ui.search_query.pop();
                self.ui.history_cursor = None;
            }
            KeyCode::Char(c) => {
                self.ui.search_query.push(c);
                self.ui.history_cursor = None;
            }
            _ => {}
        }
    }

    /// Step through history: +1 goes to older terms, -1 back towards the input line
    fn recall_history(&mut self, step: isize) {
        self.ui.history = self.search.history();
        let len = self.ui.history.len();
        if len == 0 {
            return;
        }

        let next = match (self.ui.history_cursor, step > 0) {
            (None, true) => Some(0),
            (None, false) => None,
            (Some(i), true) => Some((i + 1).min(len - 1)),
            (Some(0), false) => None,
            (Some(i), false) => Some(i - 1),
        };

        self.ui.history_cursor = next;
        self.ui.search_query = next
            .and_then(|i| self.ui.history.get(i).cloned())
            .unwrap_or_default();
    }

    fn handle_results_key(&mut self, key: KeyEvent) {
        let state = self.store.snapshot();
        let len = Self::results_len(&state);

        match key.code {
            KeyCode::Up => {
                self.ui.results_selected = self.ui.results_selected.saturating_sub(1);
            }
            KeyCode::Down => {
                if self.ui.results_selected + 1 < len {
                    self.ui.results_selected += 1;
                }
            }
            KeyCode::Enter => match state.view {
                View::Podcast => {
                    let feed = state
                        .podcasts
                        .as_ref()
                        .and_then(|r| r.presentable().get(self.ui.results_selected).cloned());
                    if let Some(feed) = feed {
                        self.ui.results_selected = 0;
                        let search = self.search.clone();
                        tokio::spawn(async move { search.open_podcast(feed).await });
                    }
                }
                View::Episode => {
                    if let Some(episode) = self.selected_episode() {
                        self.store.set_selected_episode(Some(episode.clone()));
                        self.store.play(episode);
                    }
                }
            },
            KeyCode::Char('a') | KeyCode::Char('A') if state.view == View::Episode => {
                if let Some(episode) = self.selected_episode() {
                    self.store.enqueue(episode);
                }
            }
            KeyCode::Esc | KeyCode::Backspace if state.view == View::Episode => {
                self.ui.results_selected = 0;
                self.search.show_podcasts();
            }
            _ => {}
        }
    }

    fn selected_episode(&self) -> Option<Episode> {
        self.store
            .snapshot()
            .episodes
            .as_ref()
            .and_then(|r| r.presentable().get(self.ui.results_selected).cloned())
    }

    fn handle_queue_key(&mut self, key: KeyEvent) {
        let state = self.store.snapshot();
        let selected = state.queue.get(self.ui.queue_selected).map(|e| e.id);

        match key.code {
            KeyCode::Up => {
                self.ui.queue_selected = self.ui.queue_selected.saturating_sub(1);
            }
            KeyCode::Down => {
                if self.ui.queue_selected + 1 < state.queue.len() {
                    self.ui.queue_selected += 1;
                }
            }
            KeyCode::Enter => {
                if let Some(id) = selected {
                    self.store.play_from_queue(id);
                }
            }
            KeyCode::Delete | KeyCode::Char('d') | KeyCode::Char('D') => {
                if let Some(id) = selected {
                    self.store.dequeue(id);
                }
            }
            KeyCode::Char('c') | KeyCode::Char('C') => self.store.clear_queue(),
            _ => {}
        }

        let len = self.store.snapshot().queue.len();
        self.ui.queue_selected = self.ui.queue_selected.min(len.saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    use crate::controller::{AppController, PlayerController, SearchController, SearchLimits};
    use crate::model::{
        ActiveSection, EpisodeSearchResult, FeedSearchResult, PlayerState, PlayerStore,
        SearchHistory, View, DEFAULT_HISTORY_SIZE,
    };
    use crate::rpc::{
        PodcastProcedures, RpcError, SearchEpisodeByItunesIdInput, SearchPodcastByTermInput,
    };
    use crate::test_support::{
        FakeAudio, episode, episode_result, feed, feed_result, memory_storage,
    };

    struct CannedProcedures;

    #[async_trait]
    impl PodcastProcedures for CannedProcedures {
        async fn search_podcast_by_term(
            &self,
            input: SearchPodcastByTermInput,
        ) -> Result<FeedSearchResult, RpcError> {
            Ok(feed_result(vec![feed(1, Some(123)), feed(2, None)], &input.term))
        }

        async fn search_episode_by_itunes_id(
            &self,
            input: SearchEpisodeByItunesIdInput,
        ) -> Result<EpisodeSearchResult, RpcError> {
            Ok(episode_result(vec![episode(10), episode(11), episode(12)], &input.id))
        }
    }

    fn app() -> (AppController, FakeAudio) {
        let storage = memory_storage();
        let store = PlayerStore::new(storage.clone());
        let history = SearchHistory::load(storage.clone(), DEFAULT_HISTORY_SIZE);
        let search = SearchController::new(
            store.clone(),
            Arc::new(CannedProcedures),
            history,
            SearchLimits::default(),
        );
        let audio = FakeAudio::with_duration(600.0);
        let player = PlayerController::new(store.clone(), storage, Box::new(audio.clone()));
        (AppController::new(store, search, player), audio)
    }

    fn press(app: &mut AppController, code: KeyCode) {
        app.handle_key_event(KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn type_text(app: &mut AppController, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    async fn settle(app: &AppController) {
        for _ in 0..50 {
            tokio::task::yield_now().await;
            if !app.store.snapshot().is_submitting {
                break;
            }
        }
    }

    #[tokio::test]
    async fn search_open_enqueue_and_play_through_keys() {
        let (mut app, audio) = app();

        type_text(&mut app, "history");
        press(&mut app, KeyCode::Enter);
        settle(&app).await;
        app.tick();

        assert_eq!(app.ui_state().active_section, ActiveSection::Results);
        assert_eq!(app.snapshot().podcasts.as_ref().unwrap().query, "history");
        assert_eq!(app.ui_state().history, vec!["history".to_string()]);

        press(&mut app, KeyCode::Enter);
        tokio::task::yield_now().await;
        settle(&app).await;
        assert_eq!(app.snapshot().view, View::Episode);
        assert_eq!(app.snapshot().episodes.as_ref().unwrap().items.len(), 3);

        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Char('a'));
        press(&mut app, KeyCode::Char('a'));
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Char('a'));
        let queued: Vec<i64> = app.snapshot().queue.iter().map(|e| e.id).collect();
        assert_eq!(queued, vec![11, 12]);

        press(&mut app, KeyCode::Up);
        press(&mut app, KeyCode::Up);
        press(&mut app, KeyCode::Enter);
        app.tick();
        assert_eq!(app.playback_info().episode.map(|e| e.id), Some(10));
        assert_eq!(app.playback_info().state, PlayerState::Playing);
        assert!(audio.is_playing());

        press(&mut app, KeyCode::Char(' '));
        assert_eq!(app.playback_info().state, PlayerState::Paused);

        press(&mut app, KeyCode::Backspace);
        assert_eq!(app.snapshot().view, View::Podcast);
    }

    #[test]
    fn queue_keys_play_remove_and_clear() {
        let (mut app, _audio) = app();
        for id in [1, 2, 3] {
            app.store.enqueue(episode(id));
        }
        app.ui.active_section = ActiveSection::Queue;

        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Delete);
        let queued: Vec<i64> = app.snapshot().queue.iter().map(|e| e.id).collect();
        assert_eq!(queued, vec![1, 3]);

        press(&mut app, KeyCode::Enter);
        assert_eq!(app.snapshot().currently_playing.as_ref().map(|e| e.id), Some(3));
        assert_eq!(app.snapshot().queue.len(), 1);
        assert_eq!(app.ui_state().queue_selected, 0);

        press(&mut app, KeyCode::Char('c'));
        assert!(app.snapshot().queue.is_empty());
    }

    #[tokio::test]
    async fn history_recall_walks_older_and_back() {
        let (mut app, _audio) = app();
        app.search.perform_search("first").await;
        app.search.perform_search("second").await;

        press(&mut app, KeyCode::Up);
        assert_eq!(app.ui_state().search_query, "second");
        press(&mut app, KeyCode::Up);
        assert_eq!(app.ui_state().search_query, "first");
        press(&mut app, KeyCode::Up);
        assert_eq!(app.ui_state().search_query, "first");
        press(&mut app, KeyCode::Down);
        assert_eq!(app.ui_state().search_query, "second");
        press(&mut app, KeyCode::Down);
        assert_eq!(app.ui_state().search_query, "");
        assert_eq!(app.ui_state().history_cursor, None);

        app.handle_key_event(KeyEvent::new(KeyCode::Char('x'), KeyModifiers::CONTROL));
        assert!(app.search.history().is_empty());
        assert!(app.ui_state().history.is_empty());
    }

    #[test]
    fn error_overlay_swallows_keys_until_dismissed() {
        let (mut app, _audio) = app();
        app.store.set_error(Some("Failed to search podcasts: boom".to_string()));

        press(&mut app, KeyCode::Char('x'));
        assert!(app.ui_state().search_query.is_empty());

        press(&mut app, KeyCode::Esc);
        assert!(app.snapshot().error_message.is_none());
        press(&mut app, KeyCode::Char('x'));
        assert_eq!(app.ui_state().search_query, "x");
    }

    #[test]
    fn control_quit_works_from_the_search_box_and_over_an_error() {
        let (mut searching, _audio) = app();
        searching.handle_key_event(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(searching.should_quit());
        assert!(searching.ui_state().search_query.is_empty());

        let (mut failed, _audio) = app();
        failed.store.set_error(Some("Failed to fetch episodes".to_string()));
        failed.handle_key_event(KeyEvent::new(KeyCode::Char('q'), KeyModifiers::CONTROL));
        assert!(failed.should_quit());
    }

    #[test]
    fn digit_keys_seek_to_a_share_of_the_episode() {
        let (mut app, audio) = app();
        app.store.play(episode(1));
        app.tick();
        app.ui.active_section = ActiveSection::Queue;

        press(&mut app, KeyCode::Char('5'));
        assert_eq!(app.playback_info().position_secs, 300.0);
        assert_eq!(audio.state.lock().unwrap().position, 300.0);

        press(&mut app, KeyCode::Char('0'));
        assert_eq!(app.playback_info().position_secs, 0.0);
    }

    #[test]
    fn quit_and_help_outside_the_search_box() {
        let (mut app, _audio) = app();
        press(&mut app, KeyCode::Char('q'));
        assert!(!app.should_quit());

        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Char('h'));
        assert!(app.ui_state().show_help_popup);
        press(&mut app, KeyCode::Esc);
        assert!(!app.ui_state().show_help_popup);

        press(&mut app, KeyCode::Char('q'));
        assert!(app.should_quit());
    }
}
