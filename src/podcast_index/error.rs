//! Failures of the Podcast Index client

use thiserror::Error;

/// The response body did not match the expected schema
#[derive(Error, Debug)]
#[error("schema validation failed: {diagnostic}")]
pub struct SchemaError {
    pub diagnostic: String,
}

impl SchemaError {
    pub fn new(diagnostic: impl Into<String>) -> Self {
        Self {
            diagnostic: diagnostic.into(),
        }
    }
}

/// Every failure of an upstream call ends up as one of these
#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("Podcast Index API error: {status} {reason}")]
    Status { status: u16, reason: String },

    #[error("Podcast Index returned invalid data format")]
    InvalidData(#[source] SchemaError),

    #[error("{operation}")]
    Request {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("Podcast Index credentials cannot be sent as headers")]
    Credentials(#[source] reqwest::header::InvalidHeaderValue),

    #[error("{operation}")]
    Decode {
        operation: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_match_the_user_facing_wording() {
        let status = UpstreamError::Status {
            status: 503,
            reason: "Service Unavailable".to_string(),
        };
        assert_eq!(status.to_string(), "Podcast Index API error: 503 Service Unavailable");

        let invalid = UpstreamError::InvalidData(SchemaError::new("missing field `id`"));
        assert_eq!(invalid.to_string(), "Podcast Index returned invalid data format");

        let decode = UpstreamError::Decode {
            operation: "Failed to search episodes",
            source: serde_json::from_str::<serde_json::Value>("<html>").unwrap_err(),
        };
        assert_eq!(decode.to_string(), "Failed to search episodes");
    }
}
