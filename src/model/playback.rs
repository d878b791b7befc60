//! Playback-related types shared by the player controller and the view

use super::content::Episode;

/// Lifecycle of the single audio output
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PlayerState {
    #[default]
    Idle,
    Loading,
    Playing,
    Paused,
    Advancing,
}

impl PlayerState {
    pub fn label(self) -> &'static str {
        match self {
            PlayerState::Idle => "Stopped",
            PlayerState::Loading => "Loading",
            PlayerState::Playing => "Playing",
            PlayerState::Paused => "Paused",
            PlayerState::Advancing => "Next",
        }
    }
}

/// Complete playback information for rendering the UI
#[derive(Clone, Debug, Default)]
pub struct PlaybackInfo {
    pub episode: Option<Episode>,
    pub state: PlayerState,
    pub position_secs: f64,
    pub duration_secs: f64,
    pub queue_len: usize,
}

impl PlaybackInfo {
    pub fn is_playing(&self) -> bool {
        self.state == PlayerState::Playing
    }

    /// Progress in `[0, 1]`, zero when the duration is unknown
    pub fn ratio(&self) -> f64 {
        if self.duration_secs > 0.0 {
            (self.position_secs / self.duration_secs).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}
