//! Podcast Index API access
//!
//! - `auth`: per-request signing headers
//! - `schema`: response validation
//! - `client`: the reqwest-backed client
//! - `error`: the single error kind callers see

mod auth;
mod client;
mod error;
mod schema;

use async_trait::async_trait;

use crate::model::{EpisodeSearchResult, FeedSearchResult};

pub use auth::Credentials;
pub use client::{DEFAULT_ENDPOINT, PodcastIndexClient};
pub use error::UpstreamError;

/// The two upstream searches the application needs
#[async_trait]
pub trait PodcastSearchApi: Send + Sync {
    async fn search_podcasts_by_term(
        &self,
        term: &str,
        max_results: Option<u32>,
    ) -> Result<FeedSearchResult, UpstreamError>;

    async fn search_episodes_by_itunes_id(
        &self,
        id: &str,
        max_results: Option<u32>,
    ) -> Result<EpisodeSearchResult, UpstreamError>;
}
