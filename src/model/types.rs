//! Core type definitions for the application

/// Which list the results pane shows
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum View {
    #[default]
    Podcast,
    Episode,
}

/// Which section of the UI is currently active/focused
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ActiveSection {
    #[default]
    Search,
    Results,
    Queue,
}

impl ActiveSection {
    pub fn next(self) -> Self {
        match self {
            ActiveSection::Search => ActiveSection::Results,
            ActiveSection::Results => ActiveSection::Queue,
            ActiveSection::Queue => ActiveSection::Search,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            ActiveSection::Search => ActiveSection::Queue,
            ActiveSection::Results => ActiveSection::Search,
            ActiveSection::Queue => ActiveSection::Results,
        }
    }
}

/// UI state owned by the input loop
#[derive(Clone, Debug, Default)]
pub struct UiState {
    pub active_section: ActiveSection,
    pub search_query: String,
    pub results_selected: usize,
    pub queue_selected: usize,
    /// Position while browsing search history with Up/Down, `None` when editing
    pub history_cursor: Option<usize>,
    pub history: Vec<String>,
    pub show_help_popup: bool,
    pub should_quit: bool,
}
