//! Durable key/value storage for the queue, the playback checkpoint and the
//! search history.
//!
//! Reads never fail: a missing or unparseable value is logged and replaced by
//! an empty default. Writes are best-effort; a failed write is logged and the
//! in-memory state stays authoritative for the session.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Result;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::content::Episode;

pub const QUEUE_STORAGE_KEY: &str = "podcastplayer-queue";
pub const PLAYER_STORAGE_KEY: &str = "podcastplayer-player";
pub const HISTORY_STORAGE_KEY: &str = "podcastplayer-search-history";

/// String-valued storage backend
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// One `<key>.json` file per key inside a directory
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir)?;
        }
        fs::write(self.path_for(key), value)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }
}

/// Last checkpointed playback position
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaybackPosition {
    pub episode: Option<Episode>,
    #[serde(rename = "currentTime", alias = "currentTimeSeconds")]
    pub current_time_seconds: f64,
}

/// Typed access to the three persisted values
#[derive(Clone)]
pub struct PlayerStorage {
    backend: Arc<dyn KeyValueStore>,
}

impl PlayerStorage {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    pub fn load_queue(&self) -> Vec<Episode> {
        self.load_or_default(QUEUE_STORAGE_KEY, "queue")
    }

    pub fn save_queue(&self, queue: &[Episode]) {
        self.save(QUEUE_STORAGE_KEY, "queue", &queue);
    }

    pub fn load_position(&self) -> PlaybackPosition {
        self.load_or_default(PLAYER_STORAGE_KEY, "player state")
    }

    pub fn save_position(&self, position: &PlaybackPosition) {
        self.save(PLAYER_STORAGE_KEY, "player state", position);
    }

    pub fn clear_position(&self) {
        if let Err(e) = self.backend.remove(PLAYER_STORAGE_KEY) {
            tracing::warn!(error = %e, "Failed to clear player state from storage");
        }
    }

    pub fn load_history(&self) -> Vec<String> {
        self.load_or_default(HISTORY_STORAGE_KEY, "search history")
    }

    pub fn save_history(&self, terms: &[String]) {
        self.save(HISTORY_STORAGE_KEY, "search history", &terms);
    }

    fn load_or_default<T: DeserializeOwned + Default>(&self, key: &str, what: &str) -> T {
        let raw = match self.backend.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return T::default(),
            Err(e) => {
                tracing::warn!(key, error = %e, "Failed to load {} from storage", what);
                return T::default();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key, error = %e, "Ignoring corrupt {} in storage", what);
                T::default()
            }
        }
    }

    fn save<T: Serialize + ?Sized>(&self, key: &str, what: &str, value: &T) {
        let result = serde_json::to_string(value)
            .map_err(anyhow::Error::from)
            .and_then(|json| self.backend.set(key, &json));

        if let Err(e) = result {
            tracing::warn!(key, error = %e, "Failed to save {} to storage", what);
        }
    }
}
