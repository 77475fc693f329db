//! Request authentication for the two upstream providers.
//!
//! - Discogs: OAuth 1.0a HMAC-SHA1 `Authorization` headers ([`oauth1`])
//! - Spotify: Basic client credentials on the token endpoint, Bearer on resources
//!
//! Handshake sequencing lives in [`flow`].

pub mod flow;
pub mod oauth1;

pub use flow::{DiscogsState, FlowState, Handshake, SpotifyState};
pub use oauth1::{OAuth1Signer, TokenPair};

use crate::config::SpotifyConfig;
use crate::error::AppError;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::RngCore;


/// Spotify application credentials, validated before any network call.
#[derive(Clone, Debug)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl ClientCredentials {
    /// Fails with `MissingConfig` when either half is absent or empty.
    pub fn from_config(config: &SpotifyConfig) -> Result<Self, AppError> {
        let client_id = non_empty(config.client_id.as_deref());
        let client_secret = non_empty(config.client_secret.as_deref());

        match (client_id, client_secret) {
            (Some(id), Some(secret)) => Ok(Self {
                client_id: id.to_string(),
                client_secret: secret.to_string(),
            }),
            _ => Err(AppError::MissingConfig("Spotify")),
        }
    }

    /// `Authorization` header value for token-endpoint calls.
    pub fn basic_auth_header(&self) -> String {
        basic_auth_header(&self.client_id, &self.client_secret)
    }
}

/// Build `Basic base64(id:secret)`
pub fn basic_auth_header(client_id: &str, client_secret: &str) -> String {
    let raw = format!("{}:{}", client_id, client_secret);
    format!("Basic {}", BASE64.encode(raw.as_bytes()))
}

/// Generate an OAuth 2.0 `state` nonce: 16 random bytes, hex-encoded.
pub fn generate_state_nonce() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Exact comparison of the callback `state` against the stored nonce.
///
/// An absent or empty value on either side never matches.
pub fn states_match(received: Option<&str>, stored: Option<&str>) -> bool {
    match (received, stored) {
        (Some(received), Some(stored)) if !received.is_empty() => {
            received.as_bytes() == stored.as_bytes()
        }
        _ => false,
    }
}

/// Whether `url` shares scheme, host and port with `base`.
///
/// Credentials are only attached to URLs taken from upstream responses when
/// this holds.
pub fn same_origin(url: &str, base: &str) -> bool {
    match (reqwest::Url::parse(url), reqwest::Url::parse(base)) {
        (Ok(url), Ok(base)) => {
            url.scheme() == base.scheme()
                && url.host_str() == base.host_str()
                && url.port_or_known_default() == base.port_or_known_default()
        }
        _ => false,
    }
}

/// `None` for absent or empty values.
pub fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
