//! The player store: search results, navigation view, play queue and the
//! now-playing episode, behind one handle shared by every consumer.
//!
//! Each operation replaces the whole state in a single critical section and
//! then hands the new snapshot to every subscriber. Operations that would not
//! change anything are no-ops and do not notify.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use super::content::{Episode, EpisodeSearchResult, FeedSearchResult, PodcastFeed};
use super::storage::PlayerStorage;
use super::types::View;

#[derive(Clone, Debug, Default)]
pub struct PlayerStoreState {
    pub is_submitting: bool,
    pub view: View,
    pub selected_podcast: Option<PodcastFeed>,
    pub podcasts: Option<Arc<FeedSearchResult>>,
    pub selected_episode: Option<Episode>,
    pub episodes: Option<Arc<EpisodeSearchResult>>,
    pub queue: Arc<Vec<Episode>>,
    pub currently_playing: Option<Episode>,
    pub error_message: Option<String>,
}

impl PlayerStoreState {
    pub fn is_queued(&self, episode_id: i64) -> bool {
        self.queue.iter().any(|e| e.id == episode_id)
    }
}

pub type SubscriptionId = u64;

type Subscriber = Arc<dyn Fn(&PlayerStoreState) + Send + Sync>;

struct StoreInner {
    state: Mutex<Arc<PlayerStoreState>>,
    subscribers: Mutex<Vec<(SubscriptionId, Subscriber)>>,
    next_subscription: AtomicU64,
}

#[derive(Clone)]
pub struct PlayerStore {
    inner: Arc<StoreInner>,
}

impl PlayerStore {
    /// Build a store seeded from persisted queue and playback position, with
    /// the queue persistence observer attached.
    pub fn new(storage: PlayerStorage) -> Self {
        let mut queue: Vec<Episode> = Vec::new();
        for episode in storage.load_queue() {
            if !queue.iter().any(|e| e.id == episode.id) {
                queue.push(episode);
            }
        }
        let position = storage.load_position();

        let initial = PlayerStoreState {
            queue: Arc::new(queue),
            currently_playing: position.episode,
            ..Default::default()
        };
        tracing::debug!(
            queued = initial.queue.len(),
            restored = initial.currently_playing.is_some(),
            "Player store seeded from storage"
        );

        let store = Self::with_state(initial);
        store.attach_queue_persistence(storage);
        store
    }

    /// Build a store with no persistence attached
    pub fn with_state(state: PlayerStoreState) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                state: Mutex::new(Arc::new(state)),
                subscribers: Mutex::new(Vec::new()),
                next_subscription: AtomicU64::new(1),
            }),
        }
    }

    fn attach_queue_persistence(&self, storage: PlayerStorage) {
        let last_saved = Mutex::new(self.snapshot().queue.clone());
        self.subscribe(move |state| {
            let mut last = last_saved.lock().unwrap_or_else(PoisonError::into_inner);
            if Arc::ptr_eq(&last, &state.queue) {
                return;
            }
            *last = state.queue.clone();
            storage.save_queue(&state.queue);
        });
    }

    pub fn snapshot(&self) -> Arc<PlayerStoreState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Register an observer called with every new state.
    ///
    /// Observers must not call mutating operations synchronously.
    pub fn subscribe<F>(&self, subscriber: F) -> SubscriptionId
    where
        F: Fn(&PlayerStoreState) + Send + Sync + 'static,
    {
        let id = self.inner.next_subscription.fetch_add(1, Ordering::Relaxed);
        self.inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(subscriber)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(sid, _)| *sid != id);
    }

    /// Apply a transition. `None` from the closure means no change.
    fn update<F>(&self, transition: F)
    where
        F: FnOnce(&PlayerStoreState) -> Option<PlayerStoreState>,
    {
        let next = {
            let mut state = self.inner.state.lock().unwrap_or_else(PoisonError::into_inner);
            match transition(&state) {
                Some(next) => {
                    let next = Arc::new(next);
                    *state = next.clone();
                    next
                }
                None => return,
            }
        };

        let subscribers: Vec<Subscriber> = self
            .inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, s)| s.clone())
            .collect();
        for subscriber in subscribers {
            subscriber(&next);
        }
    }

    pub fn set_submitting(&self, is_submitting: bool) {
        self.update(|s| {
            Some(PlayerStoreState {
                is_submitting,
                ..s.clone()
            })
        });
    }

    pub fn set_view(&self, view: View) {
        self.update(|s| Some(PlayerStoreState { view, ..s.clone() }));
    }

    pub fn set_selected_podcast(&self, selected_podcast: Option<PodcastFeed>) {
        self.update(|s| {
            Some(PlayerStoreState {
                selected_podcast,
                ..s.clone()
            })
        });
    }

    pub fn set_podcasts(&self, podcasts: Option<FeedSearchResult>) {
        self.update(|s| {
            Some(PlayerStoreState {
                podcasts: podcasts.map(Arc::new),
                ..s.clone()
            })
        });
    }

    pub fn set_selected_episode(&self, selected_episode: Option<Episode>) {
        self.update(|s| {
            Some(PlayerStoreState {
                selected_episode,
                ..s.clone()
            })
        });
    }

    pub fn set_episodes(&self, episodes: Option<EpisodeSearchResult>) {
        self.update(|s| {
            Some(PlayerStoreState {
                episodes: episodes.map(Arc::new),
                ..s.clone()
            })
        });
    }

    pub fn enqueue(&self, episode: Episode) {
        self.update(|s| {
            if s.is_queued(episode.id) {
                return None;
            }
            let mut queue = Vec::with_capacity(s.queue.len() + 1);
            queue.extend(s.queue.iter().cloned());
            queue.push(episode);
            Some(PlayerStoreState {
                queue: Arc::new(queue),
                ..s.clone()
            })
        });
    }

    pub fn dequeue(&self, episode_id: i64) {
        self.update(|s| {
            let index = s.queue.iter().position(|e| e.id == episode_id)?;
            let mut queue = s.queue.as_ref().clone();
            queue.remove(index);
            Some(PlayerStoreState {
                queue: Arc::new(queue),
                ..s.clone()
            })
        });
    }

    pub fn clear_queue(&self) {
        self.update(|s| {
            if s.queue.is_empty() {
                return None;
            }
            Some(PlayerStoreState {
                queue: Arc::new(Vec::new()),
                ..s.clone()
            })
        });
    }

    /// Start an episode directly; the queue is left as it is
    pub fn play(&self, episode: Episode) {
        self.update(|s| {
            Some(PlayerStoreState {
                currently_playing: Some(episode),
                ..s.clone()
            })
        });
    }

    pub fn play_from_queue(&self, episode_id: i64) {
        self.update(|s| {
            let index = s.queue.iter().position(|e| e.id == episode_id)?;
            let mut queue = s.queue.as_ref().clone();
            let episode = queue.remove(index);
            Some(PlayerStoreState {
                currently_playing: Some(episode),
                queue: Arc::new(queue),
                ..s.clone()
            })
        });
    }

    /// Pop the queue head into now-playing, or clear now-playing when the
    /// queue is empty
    pub fn advance_queue(&self) {
        self.update(|s| {
            if s.queue.is_empty() {
                if s.currently_playing.is_none() {
                    return None;
                }
                return Some(PlayerStoreState {
                    currently_playing: None,
                    ..s.clone()
                });
            }
            let mut queue = s.queue.as_ref().clone();
            let next = queue.remove(0);
            Some(PlayerStoreState {
                currently_playing: Some(next),
                queue: Arc::new(queue),
                ..s.clone()
            })
        });
    }

    pub fn stop(&self) {
        self.update(|s| {
            s.currently_playing.as_ref()?;
            Some(PlayerStoreState {
                currently_playing: None,
                ..s.clone()
            })
        });
    }

    pub fn set_error(&self, error_message: Option<String>) {
        self.update(|s| {
            Some(PlayerStoreState {
                error_message,
                ..s.clone()
            })
        });
    }

    pub fn clear_error(&self) {
        self.set_error(None);
    }
}
