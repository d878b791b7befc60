//! Fixtures shared by the unit tests

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::audio::{AudioError, AudioEvent, AudioOutput};
use crate::model::{
    Episode, EpisodeSearchResult, FeedSearchResult, MemoryStore, PlayerStorage, PodcastFeed,
    SearchStatus,
};

pub fn episode(id: i64) -> Episode {
    Episode {
        id,
        title: format!("Episode {id}"),
        description: "<p>Show notes</p>".to_string(),
        guid: format!("guid-{id}"),
        date_published: 1_700_000_000 + id,
        enclosure_url: format!("https://cdn.example.com/episodes/{id}.mp3"),
        enclosure_type: "audio/mpeg".to_string(),
        duration: Some(1800),
        episode: None,
        season: None,
        image: String::new(),
        feed_id: 900,
        feed_image: "https://cdn.example.com/feed.png".to_string(),
        feed_itunes_id: None,
    }
}

pub fn feed(id: i64, itunes_id: Option<i64>) -> PodcastFeed {
    PodcastFeed {
        id,
        podcast_guid: None,
        title: format!("Feed {id}"),
        url: format!("https://feeds.example.com/{id}.xml"),
        description: "A podcast".to_string(),
        author: "Someone".to_string(),
        image: String::new(),
        newest_item_pubdate: 1_700_000_000,
        itunes_id,
        language: "en".to_string(),
        episode_count: 10,
        categories: None,
    }
}

pub fn feed_result(feeds: Vec<PodcastFeed>, query: &str) -> FeedSearchResult {
    FeedSearchResult {
        status: SearchStatus::Ok,
        count: feeds.len() as i64,
        feeds,
        query: query.to_string(),
        description: "Found matching feeds".to_string(),
    }
}

pub fn episode_result(items: Vec<Episode>, query: &str) -> EpisodeSearchResult {
    EpisodeSearchResult {
        status: SearchStatus::Ok,
        count: items.len() as i64,
        items,
        query: query.to_string(),
        description: "Found matching items".to_string(),
    }
}

pub fn memory_storage() -> PlayerStorage {
    PlayerStorage::new(Arc::new(MemoryStore::default()))
}

/// Observable state of a [`FakeAudio`]
#[derive(Debug, Default)]
pub struct FakeAudioState {
    pub source: Option<String>,
    pub loads: Vec<String>,
    pub playing: bool,
    pub position: f64,
    pub duration: Option<f64>,
    pub fail_play: bool,
    pub events: VecDeque<AudioEvent>,
    /// Sources open only when [`FakeAudio::open`] is called
    pub deferred: bool,
    pub opened: bool,
    pub pending_seek: Option<f64>,
}

impl FakeAudioState {
    fn waiting_for_open(&self) -> bool {
        self.deferred && !self.opened
    }
}

/// Scripted audio output. Reports metadata right after every load.
#[derive(Clone, Default)]
pub struct FakeAudio {
    pub state: Arc<Mutex<FakeAudioState>>,
}

impl FakeAudio {
    pub fn with_duration(duration: f64) -> Self {
        let audio = Self::default();
        audio.state.lock().unwrap().duration = Some(duration);
        audio
    }

    /// Like a streamed source: position reads 0 and seeks wait until `open`
    pub fn deferred(duration: f64) -> Self {
        let audio = Self::with_duration(duration);
        audio.state.lock().unwrap().deferred = true;
        audio
    }

    /// Finish opening a deferred source
    pub fn open(&self) {
        let mut state = self.state.lock().unwrap();
        state.opened = true;
        state.position = state.pending_seek.take().unwrap_or(0.0);
        let duration = state.duration;
        state.events.push_back(AudioEvent::MetadataLoaded { duration_secs: duration });
    }

    pub fn push_event(&self, event: AudioEvent) {
        self.state.lock().unwrap().events.push_back(event);
    }

    pub fn set_position(&self, position: f64) {
        self.state.lock().unwrap().position = position;
    }

    pub fn is_playing(&self) -> bool {
        self.state.lock().unwrap().playing
    }
}

impl AudioOutput for FakeAudio {
    fn load(&mut self, url: &str) {
        let mut state = self.state.lock().unwrap();
        state.source = Some(url.to_string());
        state.loads.push(url.to_string());
        state.playing = false;
        state.position = 0.0;
        state.opened = false;
        state.pending_seek = None;
        if !state.deferred {
            state.opened = true;
            let duration = state.duration;
            state.events.push_back(AudioEvent::MetadataLoaded { duration_secs: duration });
        }
    }

    fn play(&mut self) -> Result<(), AudioError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_play {
            return Err(AudioError::Unavailable("blocked".to_string()));
        }
        if state.source.is_none() {
            return Err(AudioError::NoSource);
        }
        state.playing = true;
        Ok(())
    }

    fn pause(&mut self) {
        self.state.lock().unwrap().playing = false;
    }

    fn unload(&mut self) {
        let mut state = self.state.lock().unwrap();
        state.source = None;
        state.playing = false;
        state.position = 0.0;
    }

    fn seek(&mut self, position_secs: f64) {
        let mut state = self.state.lock().unwrap();
        let upper = state.duration.unwrap_or(f64::MAX);
        let position = position_secs.clamp(0.0, upper);
        if state.waiting_for_open() {
            state.pending_seek = Some(position);
        } else {
            state.position = position;
        }
    }

    fn position_secs(&self) -> f64 {
        let state = self.state.lock().unwrap();
        if state.waiting_for_open() { 0.0 } else { state.position }
    }

    fn duration_secs(&self) -> Option<f64> {
        self.state.lock().unwrap().duration
    }

    fn poll_event(&mut self) -> Option<AudioEvent> {
        self.state.lock().unwrap().events.pop_front()
    }
}
