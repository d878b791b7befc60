//! Request signing for the Podcast Index API
//!
//! Every request carries the API key, the current Unix time and the lowercase
//! hex SHA-1 of `key + secret + time`.

use reqwest::header::{
    AUTHORIZATION, HeaderMap, HeaderName, HeaderValue, InvalidHeaderValue, USER_AGENT,
};
use sha1::{Digest, Sha1};

const AUTH_KEY_HEADER: &str = "x-auth-key";
const AUTH_DATE_HEADER: &str = "x-auth-date";

#[derive(Clone)]
pub struct Credentials {
    pub auth_key: String,
    pub secret_key: String,
    pub user_agent: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("auth_key", &self.auth_key)
            .field("secret_key", &"<redacted>")
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

/// Current Unix time in seconds
pub fn unix_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}

/// `hex(sha1(auth_key + secret_key + timestamp))`
pub fn signature(credentials: &Credentials, timestamp: i64) -> String {
    let mut hasher = Sha1::new();
    hasher.update(credentials.auth_key.as_bytes());
    hasher.update(credentials.secret_key.as_bytes());
    hasher.update(timestamp.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

/// The four authentication headers for a request issued at `timestamp`
pub fn sign(credentials: &Credentials, timestamp: i64) -> Result<HeaderMap, InvalidHeaderValue> {
    let mut headers = HeaderMap::with_capacity(4);
    headers.insert(USER_AGENT, HeaderValue::from_str(&credentials.user_agent)?);
    headers.insert(
        HeaderName::from_static(AUTH_KEY_HEADER),
        HeaderValue::from_str(&credentials.auth_key)?,
    );
    headers.insert(
        HeaderName::from_static(AUTH_DATE_HEADER),
        HeaderValue::from(timestamp),
    );
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&signature(credentials, timestamp))?,
    );
    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials(key: &str, secret: &str) -> Credentials {
        Credentials {
            auth_key: key.to_string(),
            secret_key: secret.to_string(),
            user_agent: "podcast-rs/test".to_string(),
        }
    }

    #[test]
    fn signature_is_sha1_of_key_secret_and_time() {
        let creds = credentials("key1", "secret2");
        assert_eq!(
            signature(&creds, 1_700_000_000),
            "c4f200dc6f1dfb533f4230e2113009ba0dfc4f8b"
        );
    }

    #[test]
    fn signing_is_deterministic_for_a_fixed_time() {
        let creds = credentials("authKEY", "secretKEY");
        let first = sign(&creds, 1_234_567_890).unwrap();
        let second = sign(&creds, 1_234_567_890).unwrap();
        assert_eq!(first, second);

        assert_eq!(first["x-auth-key"], "authKEY");
        assert_eq!(first["x-auth-date"], "1234567890");
        assert_eq!(first[USER_AGENT], "podcast-rs/test");
        assert_eq!(
            first[AUTHORIZATION],
            "f157167f3e9b534f37f038b0f23f3f93aae6bc7e"
        );
    }

    #[test]
    fn debug_output_hides_the_secret() {
        let rendered = format!("{:?}", credentials("key", "hunter2"));
        assert!(!rendered.contains("hunter2"));
    }
}
