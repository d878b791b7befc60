//! Podcast Index entities: feeds, episodes and the search results wrapping them

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// `status` field of a Podcast Index response, sent as the strings "true" / "false"
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchStatus {
    #[serde(rename = "true")]
    Ok,
    #[serde(rename = "false")]
    Failed,
}

/// A podcast returned by search-by-term.
///
/// Fields declared with `deserialize_with = "Option::deserialize"` are nullable
/// but must be present; fields with `#[serde(default)]` may be absent because
/// the two upstream response shapes disagree on them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodcastFeed {
    pub id: i64,
    #[serde(default)]
    pub podcast_guid: Option<String>,
    pub title: String,
    pub url: String,
    pub description: String,
    pub author: String,
    pub image: String,
    pub newest_item_pubdate: i64,
    #[serde(deserialize_with = "Option::deserialize")]
    pub itunes_id: Option<i64>,
    pub language: String,
    pub episode_count: i64,
    #[serde(default)]
    pub categories: Option<BTreeMap<String, String>>,
}

impl PodcastFeed {
    pub fn category_labels(&self) -> Vec<&str> {
        self.categories
            .as_ref()
            .map(|c| c.values().map(String::as_str).collect())
            .unwrap_or_default()
    }
}

/// One playable episode
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Episode {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub guid: String,
    pub date_published: i64,
    pub enclosure_url: String,
    pub enclosure_type: String,
    #[serde(deserialize_with = "Option::deserialize")]
    pub duration: Option<i64>,
    #[serde(default)]
    pub episode: Option<i64>,
    #[serde(default)]
    pub season: Option<i64>,
    pub image: String,
    pub feed_id: i64,
    pub feed_image: String,
    #[serde(default)]
    pub feed_itunes_id: Option<i64>,
}

impl Episode {
    /// Episode artwork, falling back to the feed's artwork
    pub fn artwork(&self) -> Option<&str> {
        [self.image.as_str(), self.feed_image.as_str()]
            .into_iter()
            .find(|s| !s.is_empty())
    }
}

/// Response of `/search/byterm`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeedSearchResult {
    pub status: SearchStatus,
    pub feeds: Vec<PodcastFeed>,
    pub count: i64,
    pub query: String,
    pub description: String,
}

impl FeedSearchResult {
    /// Feeds worth presenting: none when upstream flagged the search as failed
    pub fn presentable(&self) -> &[PodcastFeed] {
        match self.status {
            SearchStatus::Ok => &self.feeds,
            SearchStatus::Failed => &[],
        }
    }
}

/// Response of `/episodes/byitunesid`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EpisodeSearchResult {
    pub status: SearchStatus,
    pub items: Vec<Episode>,
    pub count: i64,
    pub query: String,
    pub description: String,
}

impl EpisodeSearchResult {
    pub fn presentable(&self) -> &[Episode] {
        match self.status {
            SearchStatus::Ok => &self.items,
            SearchStatus::Failed => &[],
        }
    }
}
