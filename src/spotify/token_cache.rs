//! Process-wide cache for the client-credentials token.
//!
//! One slot, replaced on refresh. The slot's lock is held across the upstream
//! call so concurrent callers that find it stale wait for a single refresh
//! instead of each issuing their own.

use super::SpotifyClient;
use crate::auth::ClientCredentials;
use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Tokens are treated as expired this long before the provider says so.
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Clone, Debug)]
pub struct CachedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl CachedToken {
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

#[derive(Default)]
pub struct ClientCredentialsCache {
    slot: Mutex<Option<CachedToken>>,
}

impl ClientCredentialsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// A valid app token, refreshing it first when stale.
    pub async fn token(&self, client: &SpotifyClient, creds: &ClientCredentials) -> Result<String> {
        self.token_at(client, creds, Utc::now).await
    }

    pub(crate) async fn token_at<F>(
        &self,
        client: &SpotifyClient,
        creds: &ClientCredentials,
        now: F,
    ) -> Result<String>
    where
        F: Fn() -> DateTime<Utc>,
    {
        let mut slot = self.slot.lock().await;

        if let Some(cached) = slot.as_ref() {
            if cached.is_valid_at(now()) {
                return Ok(cached.token.clone());
            }
            debug!(expired_at = %cached.expires_at, "Client credentials token stale");
        }

        let tokens = client.client_credentials_token(creds).await?;
        let issued_at = now();
        let lifetime = (tokens.expires_in - EXPIRY_MARGIN_SECS).max(0);
        let cached = CachedToken {
            token: tokens.access_token,
            expires_at: issued_at + Duration::seconds(lifetime),
        };

        info!(expires_at = %cached.expires_at, "Client credentials token refreshed");
        let token = cached.token.clone();
        *slot = Some(cached);
        Ok(token)
    }

    #[cfg(test)]
    pub(crate) async fn current(&self) -> Option<CachedToken> {
        self.slot.lock().await.clone()
    }
}
