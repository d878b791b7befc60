//! Typed procedure boundary between the UI and the upstream client.
//!
//! Inputs are validated here; every failure leaves as an [`RpcError`] with a
//! code and a user-presentable message.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{EpisodeSearchResult, FeedSearchResult};
use crate::podcast_index::PodcastSearchApi;
use crate::{log_procedure_request, log_procedure_result};

const MAX_INPUT_CHARS: usize = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RpcErrorCode {
    BadRequest,
    InternalServerError,
}

#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct RpcError {
    pub code: RpcErrorCode,
    pub message: String,
}

impl RpcError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            code: RpcErrorCode::BadRequest,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            code: RpcErrorCode::InternalServerError,
            message: message.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPodcastByTermInput {
    pub term: String,
    #[serde(default)]
    pub max_results: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchEpisodeByItunesIdInput {
    pub id: String,
    #[serde(default)]
    pub max_results: Option<u32>,
}

#[async_trait]
pub trait PodcastProcedures: Send + Sync {
    async fn search_podcast_by_term(
        &self,
        input: SearchPodcastByTermInput,
    ) -> Result<FeedSearchResult, RpcError>;

    async fn search_episode_by_itunes_id(
        &self,
        input: SearchEpisodeByItunesIdInput,
    ) -> Result<EpisodeSearchResult, RpcError>;
}

/// Length is counted in characters, not bytes
fn validate_text(value: &str, label: &str) -> Result<(), RpcError> {
    if value.is_empty() {
        return Err(RpcError::bad_request(format!("{label} is required")));
    }
    if value.chars().count() > MAX_INPUT_CHARS {
        return Err(RpcError::bad_request(format!(
            "{label} must be at most {MAX_INPUT_CHARS} characters"
        )));
    }
    Ok(())
}

pub struct PodcastIndexRouter {
    api: Arc<dyn PodcastSearchApi>,
}

impl PodcastIndexRouter {
    pub fn new(api: Arc<dyn PodcastSearchApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl PodcastProcedures for PodcastIndexRouter {
    async fn search_podcast_by_term(
        &self,
        input: SearchPodcastByTermInput,
    ) -> Result<FeedSearchResult, RpcError> {
        const PROCEDURE: &str = "podcastIndex.searchPodcastByTerm";
        validate_text(&input.term, "Search term")?;
        log_procedure_request!(PROCEDURE, term = %input.term, max = ?input.max_results);

        let started = Instant::now();
        let result = self
            .api
            .search_podcasts_by_term(&input.term, input.max_results)
            .await
            .map_err(|e| RpcError::internal(e.to_string()));
        log_procedure_result!(PROCEDURE, started, result);
        result
    }

    async fn search_episode_by_itunes_id(
        &self,
        input: SearchEpisodeByItunesIdInput,
    ) -> Result<EpisodeSearchResult, RpcError> {
        const PROCEDURE: &str = "podcastIndex.searchEpisodeByItunesId";
        validate_text(&input.id, "Search id")?;
        log_procedure_request!(PROCEDURE, id = %input.id, max = ?input.max_results);

        let started = Instant::now();
        let result = self
            .api
            .search_episodes_by_itunes_id(&input.id, input.max_results)
            .await
            .map_err(|e| RpcError::internal(e.to_string()));
        log_procedure_result!(PROCEDURE, started, result);
        result
    }
}
