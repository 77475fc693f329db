//! HTTP surface: auth controllers and proxy routes for both providers.

pub mod discogs;
pub mod spotify;

use crate::auth::{ClientCredentials, OAuth1Signer};
use crate::config::DiscmasterConfig;
use crate::discogs::DiscogsClient;
use crate::error::AppError;
use crate::session::CookiePolicy;
use crate::spotify::{ClientCredentialsCache, SpotifyClient};
use anyhow::{Context, Result};
use axum::{extract::FromRef, http::HeaderMap, Router};
use axum_extra::extract::cookie::Key;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::warn;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<DiscmasterConfig>,
    pub discogs: DiscogsClient,
    pub spotify: SpotifyClient,
    pub spotify_tokens: Arc<ClientCredentialsCache>,
    pub cookie_key: Key,
    pub cookie_policy: CookiePolicy,
}

impl AppState {
    pub fn new(config: DiscmasterConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.server.upstream_timeout_seconds))
            .build()
            .context("Failed to build HTTP client")?;

        let cookie_key = match config.server.cookie_key.as_deref() {
            Some(encoded) => {
                let bytes = BASE64
                    .decode(encoded.trim())
                    .context("Cookie key is not valid base64")?;
                Key::try_from(bytes.as_slice())
                    .map_err(|_| anyhow::anyhow!("Cookie key must be at least 64 bytes"))?
            }
            None => {
                warn!("No cookie key configured; sessions will not survive a restart");
                Key::generate()
            }
        };

        Ok(Self {
            discogs: DiscogsClient::new(http.clone(), &config.discogs),
            spotify: SpotifyClient::new(http, &config.spotify),
            spotify_tokens: Arc::new(ClientCredentialsCache::new()),
            cookie_key,
            cookie_policy: CookiePolicy {
                secure: config.server.cookie_secure,
            },
            config: Arc::new(config),
        })
    }

    pub fn discogs_signer(&self) -> Result<OAuth1Signer, AppError> {
        OAuth1Signer::from_config(&self.config.discogs)
    }

    pub fn spotify_credentials(&self) -> Result<ClientCredentials, AppError> {
        ClientCredentials::from_config(&self.config.spotify)
    }

    /// Client-credentials token from the shared cache.
    pub async fn app_token(&self) -> Result<String, AppError> {
        let creds = self.spotify_credentials()?;
        Ok(self.spotify_tokens.token(&self.spotify, &creds).await?)
    }

    /// Absolute base for callback URLs and redirects.
    pub fn base_url(&self, headers: &HeaderMap) -> String {
        app_base_url(&self.config, headers)
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

impl FromRef<AppState> for CookiePolicy {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_policy
    }
}

/// Configured application URL, else `{scheme}://{Host}` of the request.
pub fn app_base_url(config: &DiscmasterConfig, headers: &HeaderMap) -> String {
    if let Some(url) = crate::auth::non_empty(config.server.app_url.as_deref()) {
        return url.trim_end_matches('/').to_string();
    }

    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(',').next().unwrap_or(v).trim())
            .filter(|v| !v.is_empty())
    };
    let scheme = header("x-forwarded-proto").unwrap_or("http");
    let host = header("host").unwrap_or("localhost:3000");
    format!("{}://{}", scheme, host)
}

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(discogs::create_discogs_router())
        .merge(spotify::create_spotify_router())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
