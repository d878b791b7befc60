//! HTTP client for the Podcast Index API

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error};

use super::auth::{self, Credentials};
use super::error::UpstreamError;
use super::schema::{self, Validate};
use super::PodcastSearchApi;
use crate::model::{EpisodeSearchResult, FeedSearchResult};

pub const DEFAULT_ENDPOINT: &str = "https://api.podcastindex.org/api/1.0";

const SEARCH_PODCASTS: &str = "Failed to search podcasts";
const SEARCH_EPISODES: &str = "Failed to search episodes";

pub struct PodcastIndexClient {
    http: Client,
    credentials: Credentials,
    endpoint: String,
}

impl PodcastIndexClient {
    pub fn new(
        credentials: Credentials,
        endpoint: impl Into<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        // Fail at start-up rather than on the first search
        auth::sign(&credentials, 0)?;
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            credentials,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
        })
    }

    async fn get<T>(
        &self,
        path: &str,
        params: &[(&str, String)],
        operation: &'static str,
    ) -> Result<T, UpstreamError>
    where
        T: DeserializeOwned + Validate,
    {
        let url = format!("{}{}", self.endpoint, path);
        debug!(url = %url, params = params.len(), "GET");

        let headers = auth::sign(&self.credentials, auth::unix_timestamp())
            .map_err(UpstreamError::Credentials)?;

        let response = self
            .http
            .get(&url)
            .headers(headers)
            .query(params)
            .send()
            .await
            .map_err(|source| UpstreamError::Request { operation, source })?;

        self.handle_response(response, operation).await
    }

    async fn handle_response<T>(
        &self,
        response: Response,
        operation: &'static str,
    ) -> Result<T, UpstreamError>
    where
        T: DeserializeOwned + Validate,
    {
        let status = response.status();
        if !status.is_success() {
            let reason = status.canonical_reason().unwrap_or_default().to_string();
            error!(status = status.as_u16(), reason = %reason, "Podcast Index request rejected");
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                reason,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|source| UpstreamError::Request { operation, source })?;
        let value: Value = serde_json::from_str(&body)
            .map_err(|source| UpstreamError::Decode { operation, source })?;

        schema::parse(value).map_err(|e| {
            error!(diagnostic = %e.diagnostic, "Podcast Index response failed validation");
            UpstreamError::InvalidData(e)
        })
    }
}

fn max_param(params: &mut Vec<(&str, String)>, max_results: Option<u32>) {
    if let Some(max) = max_results.filter(|m| *m > 0) {
        params.push(("max", max.to_string()));
    }
}

#[async_trait]
impl PodcastSearchApi for PodcastIndexClient {
    async fn search_podcasts_by_term(
        &self,
        term: &str,
        max_results: Option<u32>,
    ) -> Result<FeedSearchResult, UpstreamError> {
        let mut params = vec![("q", term.to_string())];
        max_param(&mut params, max_results);
        self.get("/search/byterm", &params, SEARCH_PODCASTS).await
    }

    async fn search_episodes_by_itunes_id(
        &self,
        id: &str,
        max_results: Option<u32>,
    ) -> Result<EpisodeSearchResult, UpstreamError> {
        let mut params = vec![("id", id.to_string())];
        max_param(&mut params, max_results);
        self.get("/episodes/byitunesid", &params, SEARCH_EPISODES).await
    }
}
