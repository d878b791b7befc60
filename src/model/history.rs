//! Search-term history, most recent first

use super::storage::PlayerStorage;

pub const DEFAULT_HISTORY_SIZE: usize = 10;

pub struct SearchHistory {
    entries: Vec<String>,
    capacity: usize,
    storage: PlayerStorage,
}

impl SearchHistory {
    /// Load persisted history, trimmed to `capacity`
    pub fn load(storage: PlayerStorage, capacity: usize) -> Self {
        let mut entries = storage.load_history();
        entries.retain(|t| !t.trim().is_empty());
        entries.truncate(capacity);
        Self {
            entries,
            capacity,
            storage,
        }
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn record(&mut self, term: &str) {
        let term = term.trim();
        if term.is_empty() || self.capacity == 0 {
            return;
        }
        if self.entries.first().is_some_and(|t| t == term) {
            return;
        }

        self.entries.retain(|t| t != term);
        self.entries.insert(0, term.to_string());
        self.entries.truncate(self.capacity);
        self.storage.save_history(&self.entries);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.storage.save_history(&self.entries);
    }
}
