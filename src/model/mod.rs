//! Model module - Application state and data types
//!
//! - `types`: UI enums and state owned by the input loop
//! - `playback`: player lifecycle and the snapshot rendered by the player bar
//! - `content`: Podcast Index feeds, episodes and search results
//! - `storage`: durable key/value storage for queue, position and history
//! - `history`: search-term history
//! - `store`: the shared playback/queue store

mod types;
mod playback;
mod content;
mod storage;
mod history;
mod store;

pub use types::{ActiveSection, UiState, View};

pub use playback::{PlaybackInfo, PlayerState};

pub use content::{Episode, EpisodeSearchResult, FeedSearchResult, PodcastFeed, SearchStatus};

pub use storage::{FileStore, MemoryStore, PlaybackPosition, PlayerStorage};

pub use history::{DEFAULT_HISTORY_SIZE, SearchHistory};

pub use store::{PlayerStore, PlayerStoreState};
