//! Search and open-feed flows.
//!
//! Both flows drive the store's `is_submitting` and `error_message` slices.
//! Requests may overlap; a generation counter lets only the most recently
//! issued one apply its outcome.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::model::{PlayerStore, PodcastFeed, SearchHistory, View};
use crate::rpc::{PodcastProcedures, SearchEpisodeByItunesIdInput, SearchPodcastByTermInput};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SearchLimits {
    pub podcasts: Option<u32>,
    pub episodes: Option<u32>,
}

#[derive(Clone)]
pub struct SearchController {
    store: PlayerStore,
    procedures: Arc<dyn PodcastProcedures>,
    history: Arc<Mutex<SearchHistory>>,
    generation: Arc<AtomicU64>,
    limits: SearchLimits,
}

impl SearchController {
    pub fn new(
        store: PlayerStore,
        procedures: Arc<dyn PodcastProcedures>,
        history: SearchHistory,
        limits: SearchLimits,
    ) -> Self {
        Self {
            store,
            procedures,
            history: Arc::new(Mutex::new(history)),
            generation: Arc::new(AtomicU64::new(0)),
            limits,
        }
    }

    pub fn history(&self) -> Vec<String> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries()
            .to_vec()
    }

    pub fn clear_history(&self) {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn begin_request(&self) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.store.clear_error();
        self.store.set_submitting(true);
        generation
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    pub async fn perform_search(&self, term: &str) {
        let term = term.trim();
        if term.is_empty() {
            return;
        }
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .record(term);

        let generation = self.begin_request();
        tracing::info!(term, generation, "Searching podcasts");

        let result = self
            .procedures
            .search_podcast_by_term(SearchPodcastByTermInput {
                term: term.to_string(),
                max_results: self.limits.podcasts,
            })
            .await;

        if !self.is_current(generation) {
            tracing::debug!(term, generation, "Discarding superseded search result");
            return;
        }

        match result {
            Ok(podcasts) => {
                tracing::info!(term, count = podcasts.feeds.len(), "Search completed");
                self.store.set_podcasts(Some(podcasts));
                self.store.set_view(View::Podcast);
            }
            Err(e) => {
                self.store
                    .set_error(Some(format!("Failed to search podcasts: {}", e.message)));
            }
        }
        self.store.set_submitting(false);
    }

    /// Switch to the episode view and fetch the feed's episodes
    pub async fn open_podcast(&self, feed: PodcastFeed) {
        let Some(itunes_id) = feed.itunes_id else {
            tracing::debug!(feed_id = feed.id, "Feed has no iTunes id; nothing to open");
            return;
        };

        self.store.set_view(View::Episode);
        self.store.set_selected_podcast(Some(feed));
        let generation = self.begin_request();
        tracing::info!(itunes_id, generation, "Fetching episodes");

        let result = self
            .procedures
            .search_episode_by_itunes_id(SearchEpisodeByItunesIdInput {
                id: itunes_id.to_string(),
                max_results: self.limits.episodes,
            })
            .await;

        if !self.is_current(generation) {
            tracing::debug!(itunes_id, generation, "Discarding superseded episode list");
            return;
        }

        match result {
            Ok(episodes) => {
                tracing::info!(itunes_id, count = episodes.items.len(), "Episodes fetched");
                self.store.set_episodes(Some(episodes));
            }
            Err(e) => {
                tracing::warn!(itunes_id, error = %e, "Episode fetch failed");
                self.store
                    .set_error(Some("Failed to fetch episodes".to_string()));
            }
        }
        self.store.set_submitting(false);
    }

    /// Back from the episode list to the feed list
    pub fn show_podcasts(&self) {
        self.store.set_view(View::Podcast);
        self.store.set_selected_podcast(None);
        self.store.set_episodes(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    use async_trait::async_trait;
    use tokio::sync::Notify;

    use crate::model::{EpisodeSearchResult, FeedSearchResult, PlayerStoreState, DEFAULT_HISTORY_SIZE};
    use crate::rpc::RpcError;
    use crate::test_support::{episode, episode_result, feed, feed_result, memory_storage};

    #[derive(Default)]
    struct FakeProcedures {
        feeds: Mutex<VecDeque<Result<FeedSearchResult, RpcError>>>,
        episodes: Mutex<VecDeque<Result<EpisodeSearchResult, RpcError>>>,
        episode_calls: Mutex<Vec<SearchEpisodeByItunesIdInput>>,
        /// When set, the next podcast search waits for a notification
        gate: Option<Arc<Notify>>,
    }

    #[async_trait]
    impl PodcastProcedures for FakeProcedures {
        async fn search_podcast_by_term(
            &self,
            input: SearchPodcastByTermInput,
        ) -> Result<FeedSearchResult, RpcError> {
            let next = self.feeds.lock().unwrap().pop_front();
            if input.term == "slow" {
                if let Some(gate) = &self.gate {
                    gate.notified().await;
                }
            }
            next.unwrap_or_else(|| Ok(feed_result(Vec::new(), &input.term)))
        }

        async fn search_episode_by_itunes_id(
            &self,
            input: SearchEpisodeByItunesIdInput,
        ) -> Result<EpisodeSearchResult, RpcError> {
            self.episode_calls.lock().unwrap().push(input.clone());
            self.episodes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(episode_result(Vec::new(), &input.id)))
        }
    }

    fn controller(procedures: Arc<FakeProcedures>) -> (PlayerStore, SearchController) {
        let storage = memory_storage();
        let store = PlayerStore::with_state(PlayerStoreState::default());
        let history = SearchHistory::load(storage, DEFAULT_HISTORY_SIZE);
        let limits = SearchLimits {
            podcasts: None,
            episodes: Some(1000),
        };
        let search = SearchController::new(store.clone(), procedures, history, limits);
        (store, search)
    }

    #[tokio::test]
    async fn search_then_open_feed_loads_episodes() {
        let procedures = Arc::new(FakeProcedures::default());
        procedures
            .feeds
            .lock()
            .unwrap()
            .push_back(Ok(feed_result(vec![feed(1, Some(123)), feed(2, Some(456))], "history")));
        procedures
            .episodes
            .lock()
            .unwrap()
            .push_back(Ok(episode_result(vec![episode(1), episode(2)], "123")));
        let (store, search) = controller(procedures.clone());

        store.set_error(Some("stale".to_string()));
        search.perform_search("  history ").await;
        let state = store.snapshot();
        assert_eq!(state.view, View::Podcast);
        assert!(!state.is_submitting);
        assert!(state.error_message.is_none());
        assert_eq!(state.podcasts.as_ref().unwrap().feeds.len(), 2);
        let feed = state
            .podcasts
            .as_ref()
            .unwrap()
            .feeds
            .iter()
            .find(|f| f.itunes_id == Some(123))
            .cloned()
            .unwrap();
        assert_eq!(search.history(), vec!["history".to_string()]);

        search.open_podcast(feed).await;
        let state = store.snapshot();
        assert_eq!(state.view, View::Episode);
        assert_eq!(state.selected_podcast.as_ref().and_then(|f| f.itunes_id), Some(123));
        assert_eq!(state.episodes.as_ref().unwrap().items.len(), 2);
        assert!(!state.is_submitting);

        let calls = procedures.episode_calls.lock().unwrap();
        assert_eq!(calls[0].id, "123");
        assert_eq!(calls[0].max_results, Some(1000));
    }

    #[tokio::test]
    async fn failure_sets_the_error_and_a_new_search_clears_it() {
        let procedures = Arc::new(FakeProcedures::default());
        procedures
            .feeds
            .lock()
            .unwrap()
            .push_back(Err(RpcError::internal("Podcast Index API error: 503 Service Unavailable")));
        let (store, search) = controller(procedures.clone());

        search.perform_search("history").await;
        assert_eq!(
            store.snapshot().error_message.as_deref(),
            Some("Failed to search podcasts: Podcast Index API error: 503 Service Unavailable")
        );
        assert!(!store.snapshot().is_submitting);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        store.subscribe(move |s| {
            sink.lock()
                .unwrap()
                .push((s.is_submitting, s.error_message.clone()));
        });

        search.perform_search("history").await;
        let seen = seen.lock().unwrap();
        assert_eq!(seen[0], (false, None));
        assert_eq!(seen[1], (true, None));
        assert!(store.snapshot().error_message.is_none());
    }

    #[tokio::test]
    async fn blank_terms_are_ignored() {
        let procedures = Arc::new(FakeProcedures::default());
        let (store, search) = controller(procedures);
        search.perform_search("   ").await;
        assert!(store.snapshot().podcasts.is_none());
        assert!(search.history().is_empty());
    }

    #[tokio::test]
    async fn feed_without_itunes_id_is_not_opened() {
        let procedures = Arc::new(FakeProcedures::default());
        let (store, search) = controller(procedures.clone());
        search.open_podcast(feed(1, None)).await;
        assert_eq!(store.snapshot().view, View::Podcast);
        assert!(procedures.episode_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn episode_fetch_failure_uses_fixed_message() {
        let procedures = Arc::new(FakeProcedures::default());
        procedures
            .episodes
            .lock()
            .unwrap()
            .push_back(Err(RpcError::internal("Failed to search episodes")));
        let (store, search) = controller(procedures);

        search.open_podcast(feed(1, Some(5))).await;
        assert_eq!(
            store.snapshot().error_message.as_deref(),
            Some("Failed to fetch episodes")
        );
    }

    #[tokio::test]
    async fn superseded_search_does_not_apply() {
        let gate = Arc::new(Notify::new());
        let procedures = Arc::new(FakeProcedures {
            gate: Some(gate.clone()),
            ..Default::default()
        });
        procedures
            .feeds
            .lock()
            .unwrap()
            .extend([
                Ok(feed_result(vec![feed(1, None)], "slow")),
                Ok(feed_result(vec![feed(2, None)], "fast")),
            ]);
        let (store, search) = controller(procedures);

        let slow = {
            let search = search.clone();
            tokio::spawn(async move { search.perform_search("slow").await })
        };
        tokio::task::yield_now().await;
        while !store.snapshot().is_submitting {
            tokio::task::yield_now().await;
        }

        search.perform_search("fast").await;
        assert_eq!(store.snapshot().podcasts.as_ref().unwrap().query, "fast");
        assert!(!store.snapshot().is_submitting);

        gate.notify_one();
        slow.await.unwrap();
        assert_eq!(store.snapshot().podcasts.as_ref().unwrap().query, "fast");
        assert!(!store.snapshot().is_submitting);
    }

    #[tokio::test]
    async fn going_back_shows_the_feed_list() {
        let procedures = Arc::new(FakeProcedures::default());
        let (store, search) = controller(procedures);
        search.open_podcast(feed(1, Some(5))).await;

        search.show_podcasts();
        let state = store.snapshot();
        assert_eq!(state.view, View::Podcast);
        assert!(state.selected_podcast.is_none());
        assert!(state.episodes.is_none());
    }
}
