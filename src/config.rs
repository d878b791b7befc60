//! Command-line and environment configuration

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use url::Url;

use crate::controller::SearchLimits;
use crate::model::DEFAULT_HISTORY_SIZE;
use crate::podcast_index::{Credentials, DEFAULT_ENDPOINT};

#[derive(Parser, Debug, Clone)]
#[command(name = "podcast-rs")]
#[command(about = "Search Podcast Index and play episodes in the terminal")]
#[command(version)]
pub struct Config {
    /// Podcast Index API key
    #[arg(long, env = "PI_AUTH_KEY", hide_env_values = true)]
    pub auth_key: String,

    /// Podcast Index API secret
    #[arg(long, env = "PI_SECRET_KEY", hide_env_values = true)]
    pub secret_key: String,

    #[arg(
        long,
        env = "PI_USER_AGENT",
        default_value = concat!("podcast-rs/", env!("CARGO_PKG_VERSION"))
    )]
    pub user_agent: String,

    /// Base URL of the Podcast Index API
    #[arg(long, env = "PI_API_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// Directory holding the queue, checkpoint and search history
    #[arg(long, env = "PODCAST_DATA_DIR", default_value = ".cache")]
    pub data_dir: PathBuf,

    #[arg(long, env = "PODCAST_HISTORY_SIZE", default_value_t = DEFAULT_HISTORY_SIZE)]
    pub history_size: usize,

    /// Maximum feeds per search; the upstream default applies when unset
    #[arg(long, env = "PODCAST_SEARCH_LIMIT")]
    pub search_limit: Option<u32>,

    #[arg(long, env = "PODCAST_EPISODE_LIMIT", default_value_t = 1000)]
    pub episode_limit: u32,

    #[arg(long, env = "PODCAST_REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub request_timeout_secs: u64,
}

impl Config {
    /// Check the endpoint and normalize it to have no trailing slash
    pub fn validate(mut self) -> Result<Self> {
        let parsed = Url::parse(&self.endpoint)
            .with_context(|| format!("Invalid API endpoint: {}", self.endpoint))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            bail!("API endpoint must be http or https, got {}", parsed.scheme());
        }
        self.endpoint = self.endpoint.trim_end_matches('/').to_string();
        Ok(self)
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            auth_key: self.auth_key.clone(),
            secret_key: self.secret_key.clone(),
            user_agent: self.user_agent.clone(),
        }
    }

    pub fn limits(&self) -> SearchLimits {
        SearchLimits {
            podcasts: self.search_limit,
            episodes: Some(self.episode_limit),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Result<Config> {
        let mut args = vec!["podcast-rs", "--auth-key", "KEY", "--secret-key", "SECRET"];
        args.extend_from_slice(extra);
        Ok(Config::try_parse_from(args)?.validate()?)
    }

    #[test]
    fn explicit_flags_override_defaults() {
        let config = parse(&[
            "--endpoint",
            "http://localhost:8080/api/1.0/",
            "--search-limit",
            "25",
            "--episode-limit",
            "50",
        ])
        .unwrap();

        assert_eq!(config.endpoint, "http://localhost:8080/api/1.0");
        assert_eq!(
            config.limits(),
            SearchLimits {
                podcasts: Some(25),
                episodes: Some(50),
            }
        );
        assert_eq!(config.credentials().auth_key, "KEY");
    }

    #[test]
    fn non_http_endpoint_is_rejected() {
        let err = parse(&["--endpoint", "ftp://example.com"]).unwrap_err();
        assert!(err.to_string().contains("http or https"));

        assert!(parse(&["--endpoint", "not a url"]).is_err());
    }

    #[test]
    fn missing_credentials_fail_to_parse() {
        if std::env::var_os("PI_AUTH_KEY").is_some() {
            return;
        }
        assert!(Config::try_parse_from(["podcast-rs", "--secret-key", "SECRET"]).is_err());
    }
}
