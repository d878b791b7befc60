//! Player bar rendering

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::Line,
    widgets::{Block, Borders, Gauge},
    Frame,
};

use crate::model::{PlaybackInfo, PlayerState};
use super::utils::format_seconds;

pub fn render_progress_bar(frame: &mut Frame, area: Rect, playback: &PlaybackInfo) {
    let status_text = match &playback.episode {
        None => " No episode playing".to_string(),
        Some(episode) => {
            let icon = match playback.state {
                PlayerState::Playing => " ▶",
                PlayerState::Loading | PlayerState::Advancing => " ⏳",
                _ => "⏸ ",
            };
            format!("{} {} ", icon, episode.title)
        }
    };

    // Format: "{position} / {duration}" inside the gauge
    let time_str = format!(
        "{} / {}",
        format_seconds(playback.position_secs),
        format_seconds(playback.duration_secs)
    );

    let controls_info = format!(
        " {} | Queue: {} | Space play/pause | [ ] ±15s ",
        playback.state.label(),
        playback.queue_len
    );

    let gauge = Gauge::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(status_text)
                .title_bottom(Line::from(controls_info).right_aligned()),
        )
        .gauge_style(Style::default().fg(Color::Green))
        .ratio(playback.ratio())
        .label(time_str);

    frame.render_widget(gauge, area);
}
