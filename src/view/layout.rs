//! Layout rendering (top bar, queue panel)

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, ListItem, Padding, Paragraph},
    Frame,
};

use crate::model::{ActiveSection, PlayerStoreState, UiState};
use super::utils::{format_seconds, render_scrollable_list, truncate_string};

fn border_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(Color::Green)
    } else {
        Style::default()
    }
}

pub fn render_top_bar(frame: &mut Frame, area: Rect, ui_state: &UiState, store: &PlayerStoreState) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Min(0),     // Search input
            Constraint::Length(25), // Request status
        ])
        .split(area);

    let focused = ui_state.active_section == ActiveSection::Search;
    let search_style = if focused {
        Style::default().fg(Color::Green)
    } else {
        Style::default().fg(Color::White)
    };

    let search_text = if ui_state.search_query.is_empty() {
        "Type to search podcasts..."
    } else {
        ui_state.search_query.as_str()
    };

    let title = match ui_state.history_cursor {
        Some(i) => format!(" Search (history {}/{}) ", i + 1, ui_state.history.len()),
        None => " Search ".to_string(),
    };

    let search = Paragraph::new(search_text).style(search_style).block(
        Block::default()
            .borders(Borders::ALL)
            .title(title)
            .padding(Padding::horizontal(1))
            .border_style(border_style(focused)),
    );
    frame.render_widget(search, chunks[0]);

    // Request status
    let (status, color) = if store.is_submitting {
        ("⏳ Searching...", Color::Yellow)
    } else {
        ("🎙 Podcast Index", Color::Cyan)
    };
    let status = Paragraph::new(status)
        .style(Style::default().fg(color))
        .block(Block::default().borders(Borders::ALL).title(" Status "));
    frame.render_widget(status, chunks[1]);
}

pub fn render_queue(frame: &mut Frame, area: Rect, ui_state: &UiState, store: &PlayerStoreState) {
    let focused = ui_state.active_section == ActiveSection::Queue;
    let width = area.width.saturating_sub(12) as usize;

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" Queue ({}) ", store.queue.len()))
        .padding(Padding::horizontal(1))
        .border_style(border_style(focused));

    if store.queue.is_empty() {
        let empty = Paragraph::new("Queue is empty\n\nPress 'a' on an episode to add it")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(empty, area);
        return;
    }

    // Create queue list items
    let items: Vec<ListItem> = store
        .queue
        .iter()
        .enumerate()
        .map(|(i, episode)| {
            let duration = episode
                .duration
                .map(|d| format_seconds(d as f64))
                .unwrap_or_default();
            let text = format!("{} {:>7}", truncate_string(&episode.title, width), duration);
            let style = if i == ui_state.queue_selected && focused {
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::White)
            };
            ListItem::new(text).style(style)
        })
        .collect();

    render_scrollable_list(frame, area, items, ui_state.queue_selected, block);
}
