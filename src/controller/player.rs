//! Player controller: binds the store's now-playing slot and queue to the
//! single audio output.
//!
//! The main loop calls [`PlayerController::tick`] on every frame. A tick
//! reconciles the loaded source with `currently_playing`, drains audio events
//! and writes a position checkpoint while playback is running.

use crate::audio::{AudioEvent, AudioOutput};
use crate::model::{Episode, PlaybackInfo, PlaybackPosition, PlayerState, PlayerStorage, PlayerStore};

pub const SKIP_SECONDS: f64 = 15.0;
pub const CHECKPOINT_INTERVAL_SECS: f64 = 5.0;

pub struct PlayerController {
    store: PlayerStore,
    storage: PlayerStorage,
    audio: Box<dyn AudioOutput>,
    state: PlayerState,
    /// State to enter once the loading source reports metadata
    target: PlayerState,
    loaded: Option<Episode>,
    loaded_once: bool,
    restore: Option<PlaybackPosition>,
    current_time: f64,
    duration: f64,
    last_checkpoint: f64,
}

impl PlayerController {
    pub fn new(store: PlayerStore, storage: PlayerStorage, audio: Box<dyn AudioOutput>) -> Self {
        let restore = Some(storage.load_position())
            .filter(|p| p.episode.is_some() && p.current_time_seconds > 0.0);

        Self {
            store,
            storage,
            audio,
            state: PlayerState::Idle,
            target: PlayerState::Idle,
            loaded: None,
            loaded_once: false,
            restore,
            current_time: 0.0,
            duration: 0.0,
            last_checkpoint: 0.0,
        }
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    /// Reconcile the loaded source with `currently_playing`
    pub fn sync(&mut self) {
        let wanted = self.store.snapshot().currently_playing.clone();
        let loaded_id = self.loaded.as_ref().map(|e| e.id);

        match wanted {
            Some(episode) if Some(episode.id) == loaded_id => {}
            Some(episode) => self.load(episode),
            None if loaded_id.is_some() => self.unload(),
            None => {}
        }
    }

    fn load(&mut self, episode: Episode) {
        tracing::info!(episode_id = episode.id, title = %episode.title, "Loading episode");
        self.audio.load(&episode.enclosure_url);
        self.current_time = 0.0;
        self.last_checkpoint = 0.0;
        self.duration = episode.duration.unwrap_or(0) as f64;
        self.state = PlayerState::Loading;

        // Only the first source loaded this session may resume the checkpoint
        let restore = if self.loaded_once { None } else { self.restore.take() };
        self.loaded_once = true;
        let resume_at = restore
            .filter(|p| p.episode.as_ref().is_some_and(|e| e.id == episode.id))
            .map(|p| p.current_time_seconds);

        match resume_at {
            Some(position) => {
                tracing::info!(episode_id = episode.id, position, "Restoring playback position");
                self.audio.seek(position);
                self.current_time = position;
                self.last_checkpoint = position;
                self.target = PlayerState::Paused;
            }
            None => {
                self.target = match self.audio.play() {
                    Ok(()) => PlayerState::Playing,
                    Err(e) => {
                        tracing::warn!(episode_id = episode.id, error = %e, "Playback did not start");
                        PlayerState::Paused
                    }
                };
            }
        }
        self.loaded = Some(episode);
    }

    fn unload(&mut self) {
        tracing::debug!("Unloading audio source");
        self.audio.unload();
        self.loaded = None;
        self.current_time = 0.0;
        self.duration = 0.0;
        self.last_checkpoint = 0.0;
        self.state = PlayerState::Idle;
        self.target = PlayerState::Idle;
        self.storage.clear_position();
    }

    pub fn toggle_play_pause(&mut self) {
        self.sync();

        if self.loaded.is_none() {
            let head = self.store.snapshot().queue.first().map(|e| e.id);
            if let Some(id) = head {
                self.store.play_from_queue(id);
                self.sync();
            }
            return;
        }

        let running = match self.state {
            PlayerState::Playing => true,
            PlayerState::Loading => self.target == PlayerState::Playing,
            _ => false,
        };

        if running {
            self.audio.pause();
            self.current_time = self.position();
            self.set_settled_state(PlayerState::Paused);
            self.checkpoint();
            tracing::info!(position = self.current_time, "Playback paused");
            return;
        }

        match self.audio.play() {
            Ok(()) => {
                self.set_settled_state(PlayerState::Playing);
                tracing::info!(position = self.current_time, "Playback resumed");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Playback did not resume");
                self.set_settled_state(PlayerState::Paused);
            }
        }
    }

    /// While loading only the target changes
    fn set_settled_state(&mut self, state: PlayerState) {
        if self.state == PlayerState::Loading {
            self.target = state;
        } else {
            self.state = state;
        }
    }

    /// The current source finished: move on to the queue head, or stop
    pub fn handle_ended(&mut self) {
        let finished = self.loaded.as_ref().map(|e| e.id);
        tracing::info!(episode_id = ?finished, "Episode ended");
        self.state = PlayerState::Advancing;
        self.store.advance_queue();

        let next = self.store.snapshot().currently_playing.clone();
        match next {
            // The same episode was queued again; replay it from the start
            Some(episode) if Some(episode.id) == finished => self.load(episode),
            _ => self.sync(),
        }
    }

    pub fn skip_forward(&mut self) {
        self.skip_by(SKIP_SECONDS);
    }

    pub fn skip_backward(&mut self) {
        self.skip_by(-SKIP_SECONDS);
    }

    fn skip_by(&mut self, delta: f64) {
        if self.loaded.is_none() || self.duration <= 0.0 {
            return;
        }
        let target = self.position() + delta;
        self.seek_to(target);
    }

    /// Absolute seek, clamped to the source's duration
    pub fn seek_to(&mut self, position_secs: f64) {
        if self.loaded.is_none() || self.duration <= 0.0 {
            return;
        }
        let target = position_secs.clamp(0.0, self.duration);
        self.audio.seek(target);
        self.current_time = match self.state {
            PlayerState::Loading => target,
            _ => self.audio.position_secs(),
        };
        tracing::debug!(position = self.current_time, "Seeked");
    }

    /// Jump to `tenths / 10` of the duration
    pub fn seek_to_fraction(&mut self, tenths: u8) {
        let fraction = f64::from(tenths.min(10)) / 10.0;
        self.seek_to(self.duration * fraction);
    }

    /// The audio output reports 0 until a loading source has opened, so the
    /// controller's own position stands in until then
    fn position(&self) -> f64 {
        match self.state {
            PlayerState::Loading => self.current_time,
            _ => self.audio.position_secs(),
        }
    }

    pub fn tick(&mut self) {
        self.sync();

        while let Some(event) = self.audio.poll_event() {
            self.handle_event(event);
        }

        if self.loaded.is_some() {
            self.current_time = self.position();
            if let Some(duration) = self.audio.duration_secs() {
                self.duration = duration;
            }
        }

        if self.state == PlayerState::Playing
            && (self.current_time - self.last_checkpoint).abs() >= CHECKPOINT_INTERVAL_SECS
        {
            self.checkpoint();
        }
    }

    fn handle_event(&mut self, event: AudioEvent) {
        match event {
            AudioEvent::MetadataLoaded { duration_secs } => {
                if let Some(duration) = duration_secs {
                    self.duration = duration;
                }
                if self.state == PlayerState::Loading {
                    self.state = self.target;
                }
            }
            AudioEvent::Ended => self.handle_ended(),
            AudioEvent::Error(message) => {
                tracing::warn!(error = %message, "Audio playback failed");
                if self.loaded.is_some() {
                    self.audio.pause();
                    self.state = PlayerState::Paused;
                    self.target = PlayerState::Paused;
                }
            }
        }
    }

    fn checkpoint(&mut self) {
        let Some(episode) = self.loaded.as_ref() else {
            return;
        };
        self.storage.save_position(&PlaybackPosition {
            episode: Some(episode.clone()),
            current_time_seconds: self.current_time,
        });
        self.last_checkpoint = self.current_time;
    }

    /// Save the position and pause before exit
    pub fn shutdown(&mut self) {
        if self.loaded.is_some() {
            self.current_time = self.position();
            self.checkpoint();
            self.audio.pause();
            tracing::info!(position = self.current_time, "Player checkpointed for shutdown");
        }
    }

    pub fn info(&self) -> PlaybackInfo {
        PlaybackInfo {
            episode: self.loaded.clone(),
            state: self.state,
            position_secs: self.current_time,
            duration_secs: self.duration,
            queue_len: self.store.snapshot().queue.len(),
        }
    }
}
