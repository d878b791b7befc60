//! Results pane: the feed list after a search, or the episode list of the
//! opened feed

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, ListItem, Padding, Paragraph, Wrap},
    Frame,
};

use crate::model::{ActiveSection, Episode, PlayerStoreState, PodcastFeed, UiState, View};
use super::utils::{format_date, format_seconds, render_scrollable_list, strip_markup, truncate_string};

pub fn render_results(
    frame: &mut Frame,
    area: Rect,
    ui_state: &UiState,
    store: &PlayerStoreState,
    playing_id: Option<i64>,
) {
    let is_focused = ui_state.active_section == ActiveSection::Results;
    let border_style = if is_focused {
        Style::default().fg(Color::Green)
    } else {
        Style::default()
    };

    // A request is in flight; the list underneath is about to change
    if store.is_submitting {
        let loading = Paragraph::new("Loading...")
            .style(Style::default().fg(Color::Yellow))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(" Results ")
                    .border_style(border_style),
            );
        frame.render_widget(loading, area);
        return;
    }

    match store.view {
        View::Podcast => {
            let feeds = store.podcasts.as_ref().map(|r| r.presentable()).unwrap_or(&[]);
            if feeds.is_empty() {
                let hint = if store.podcasts.is_some() {
                    "No podcasts found"
                } else {
                    "Type in search and press Enter to find podcasts\n\nUse Tab to navigate between sections\nUse ↑/↓ to select items\nPress Enter to open"
                };
                render_placeholder(frame, area, hint, border_style);
                return;
            }
            render_feeds(frame, area, feeds, ui_state.results_selected, is_focused, border_style);
        }
        View::Episode => {
            let title = store
                .selected_podcast
                .as_ref()
                .map(|f| format!(" {} ", f.title))
                .unwrap_or_else(|| " Episodes ".to_string());
            let episodes = store.episodes.as_ref().map(|r| r.presentable()).unwrap_or(&[]);
            if episodes.is_empty() {
                render_placeholder(frame, area, "No episodes found\n\nBackspace to go back", border_style);
                return;
            }
            render_episodes(
                frame,
                area,
                &title,
                episodes,
                ui_state.results_selected,
                is_focused,
                border_style,
                playing_id,
            );
        }
    }
}

fn render_placeholder(frame: &mut Frame, area: Rect, text: &str, border_style: Style) {
    let content = Paragraph::new(text.to_string())
        .style(Style::default().fg(Color::DarkGray))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .padding(Padding::horizontal(1))
                .border_style(border_style),
        );
    frame.render_widget(content, area);
}

/// List on the left, details of the selected entry on the right
fn split_list_detail(area: Rect) -> (Rect, Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);
    (chunks[0], chunks[1])
}

fn render_feeds(
    frame: &mut Frame,
    area: Rect,
    feeds: &[PodcastFeed],
    selected: usize,
    is_focused: bool,
    border_style: Style,
) {
    let (list_area, detail_area) = split_list_detail(area);
    // Fixed parts: marker(2) + sep(1) + episode count(9) + borders(2)
    let width = list_area.width.saturating_sub(14) as usize;

    let items: Vec<ListItem> = feeds
        .iter()
        .enumerate()
        .map(|(i, feed)| {
            // Feeds without an iTunes id cannot be opened
            let marker = if feed.itunes_id.is_some() { " " } else { "✗" };
            let text = format!(
                "{} {} {:>5} eps",
                marker,
                truncate_string(&feed.title, width),
                feed.episode_count
            );
            let style = if i == selected && is_focused {
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
            } else if i == selected {
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::White)
            };
            ListItem::new(text).style(style)
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" Podcasts ({}) ", feeds.len()))
        .border_style(border_style);
    render_scrollable_list(frame, list_area, items, selected, block);

    if let Some(feed) = feeds.get(selected) {
        let mut lines = vec![
            Line::from(Span::styled(
                feed.title.clone(),
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(feed.author.clone(), Style::default().fg(Color::Cyan))),
            Line::from(""),
            Line::from(format!("Episodes: {}", feed.episode_count)),
            Line::from(format!("Newest episode: {}", format_date(feed.newest_item_pubdate))),
        ];
        let categories = feed.category_labels();
        if !categories.is_empty() {
            lines.push(Line::from(format!("Categories: {}", categories.join(", "))));
        }
        if feed.itunes_id.is_none() {
            lines.push(Line::from(Span::styled(
                "Episodes unavailable (no iTunes id)",
                Style::default().fg(Color::Red),
            )));
        }
        lines.push(Line::from(""));
        lines.push(Line::from(strip_markup(&feed.description)));

        render_detail(frame, detail_area, lines);
    }
}

#[allow(clippy::too_many_arguments)]
fn render_episodes(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    episodes: &[Episode],
    selected: usize,
    is_focused: bool,
    border_style: Style,
    playing_id: Option<i64>,
) {
    let (list_area, detail_area) = split_list_detail(area);
    // Fixed parts: marker(2) + sep(1) + duration(8) + padding and borders
    let width = list_area.width.saturating_sub(16) as usize;

    let items: Vec<ListItem> = episodes
        .iter()
        .enumerate()
        .map(|(i, episode)| {
            // Now-playing indicator
            let is_playing = playing_id == Some(episode.id);
            let marker = if is_playing { "▶" } else { " " };
            let duration = episode
                .duration
                .map(|d| format_seconds(d as f64))
                .unwrap_or_else(|| "--:--".to_string());
            let text = format!(
                "{} {} {:>8}",
                marker,
                truncate_string(&episode.title, width),
                duration
            );
            let style = if i == selected && is_focused {
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
            } else if is_playing {
                Style::default().fg(Color::Cyan)
            } else if i == selected {
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::White)
            };
            ListItem::new(text).style(style)
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .title(title.to_string())
        .title_bottom(Line::from(" Enter play | a queue | Backspace back ").right_aligned())
        .border_style(border_style);
    render_scrollable_list(frame, list_area, items, selected, block);

    if let Some(episode) = episodes.get(selected) {
        let mut lines = vec![
            Line::from(Span::styled(
                episode.title.clone(),
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
            )),
            Line::from(format!("Published: {}", format_date(episode.date_published))),
        ];
        let minutes = episode.duration.unwrap_or(0) / 60;
        lines.push(Line::from(format!("Duration: {} min", minutes)));
        match (episode.season, episode.episode) {
            (Some(season), Some(number)) => lines.push(Line::from(format!("S{season} E{number}"))),
            (None, Some(number)) => lines.push(Line::from(format!("Episode {number}"))),
            _ => {}
        }
        if let Some(artwork) = episode.artwork() {
            lines.push(Line::from(Span::styled(
                artwork.to_string(),
                Style::default().fg(Color::DarkGray),
            )));
        }
        lines.push(Line::from(""));
        lines.push(Line::from(strip_markup(&episode.description)));

        render_detail(frame, detail_area, lines);
    }
}

fn render_detail(frame: &mut Frame, area: Rect, lines: Vec<Line>) {
    let detail = Paragraph::new(lines).wrap(Wrap { trim: true }).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Details ")
            .padding(Padding::horizontal(1)),
    );
    frame.render_widget(detail, area);
}
