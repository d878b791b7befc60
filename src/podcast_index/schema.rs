//! Validation of Podcast Index responses.
//!
//! Bodies are deserialized into the typed model first (types, required keys,
//! integer-ness) and the URL-shaped fields are then checked on their own.

use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use super::error::SchemaError;
use crate::model::{Episode, EpisodeSearchResult, FeedSearchResult, PodcastFeed};

/// Shapes with URL fields that serde cannot check
pub trait Validate {
    fn validate(&self) -> Result<(), SchemaError>;
}

/// Deserialize `value` into `T` and run its URL checks
pub fn parse<T>(value: Value) -> Result<T, SchemaError>
where
    T: DeserializeOwned + Validate,
{
    let parsed: T = serde_json::from_value(value).map_err(|e| SchemaError::new(e.to_string()))?;
    parsed.validate()?;
    Ok(parsed)
}

fn require_url(field: &str, index: usize, value: &str) -> Result<(), SchemaError> {
    Url::parse(value)
        .map(|_| ())
        .map_err(|e| SchemaError::new(format!("[{index}].{field}: {e} ({value:?})")))
}

fn optional_url(field: &str, index: usize, value: &str) -> Result<(), SchemaError> {
    if value.is_empty() {
        Ok(())
    } else {
        require_url(field, index, value)
    }
}

fn check_feed(index: usize, feed: &PodcastFeed) -> Result<(), SchemaError> {
    require_url("url", index, &feed.url)
}

fn check_episode(index: usize, episode: &Episode) -> Result<(), SchemaError> {
    require_url("enclosureUrl", index, &episode.enclosure_url)?;
    optional_url("feedImage", index, &episode.feed_image)
}

impl Validate for FeedSearchResult {
    fn validate(&self) -> Result<(), SchemaError> {
        self.feeds
            .iter()
            .enumerate()
            .try_for_each(|(i, feed)| check_feed(i, feed))
            .map_err(|e| SchemaError::new(format!("feeds{}", e.diagnostic)))
    }
}

impl Validate for EpisodeSearchResult {
    fn validate(&self) -> Result<(), SchemaError> {
        self.items
            .iter()
            .enumerate()
            .try_for_each(|(i, episode)| check_episode(i, episode))
            .map_err(|e| SchemaError::new(format!("items{}", e.diagnostic)))
    }
}
