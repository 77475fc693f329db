//! Cookie-backed session state.
//!
//! Sessions are client-held and server-signed: credentials are written through
//! a [`SignedCookieJar`] and a cookie whose signature fails to verify reads as
//! absent. The Discogs username is written unsigned so client script can show
//! it; it only picks whose collection the signed token queries. [`SessionJar`] is the single boundary where handlers read typed
//! sessions and queue cookie writes.
//!
//! | Cookie | Flags | Max-Age |
//! |---|---|---|
//! | `oauth_token_secret` | httpOnly | 600 |
//! | `discogs_access_token`, `discogs_access_token_secret` | httpOnly | 31 449 600 |
//! | `discogs_username` | unsigned, readable by script | 31 449 600 |
//! | `spotify_auth_state` | httpOnly | 3 600 |
//! | `spotify_access_token` | httpOnly | provider `expires_in` |
//! | `spotify_refresh_token` | httpOnly | 2 592 000 |
//!
//! Removals are always emitted, whether or not the request carried the cookie.

use crate::auth::TokenPair;
use crate::spotify::SpotifyTokens;
use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
    response::{IntoResponseParts, ResponseParts},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, Key, SameSite, SignedCookieJar};
use std::convert::Infallible;
use time::{Duration, OffsetDateTime};

pub const OAUTH_TOKEN_SECRET: &str = "oauth_token_secret";
pub const DISCOGS_ACCESS_TOKEN: &str = "discogs_access_token";
pub const DISCOGS_ACCESS_TOKEN_SECRET: &str = "discogs_access_token_secret";
pub const DISCOGS_USERNAME: &str = "discogs_username";
pub const SPOTIFY_AUTH_STATE: &str = "spotify_auth_state";
pub const SPOTIFY_ACCESS_TOKEN: &str = "spotify_access_token";
pub const SPOTIFY_REFRESH_TOKEN: &str = "spotify_refresh_token";

pub const TEMP_SECRET_MAX_AGE_SECS: i64 = 600;
pub const DISCOGS_SESSION_MAX_AGE_SECS: i64 = 60 * 60 * 24 * 364;
pub const SPOTIFY_STATE_MAX_AGE_SECS: i64 = 60 * 60;
pub const SPOTIFY_REFRESH_MAX_AGE_SECS: i64 = 60 * 60 * 24 * 30;

/// Cookie attributes shared by every session cookie
#[derive(Clone, Copy, Debug, Default)]
pub struct CookiePolicy {
    pub secure: bool,
}

/// Long-lived Discogs session
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiscogsSession {
    pub token: TokenPair,
    pub username: String,
}

/// Reads typed session values from signed cookies and collects writes.
pub struct SessionJar {
    signed: SignedCookieJar,
    /// Unsigned cookies and every removal.
    plain: CookieJar,
    policy: CookiePolicy,
}

#[async_trait]
impl<S> FromRequestParts<S> for SessionJar
where
    S: Send + Sync,
    Key: FromRef<S>,
    CookiePolicy: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let signed = SignedCookieJar::<Key>::from_request_parts(parts, state).await?;
        Ok(Self {
            signed,
            plain: CookieJar::from_headers(&parts.headers),
            policy: CookiePolicy::from_ref(state),
        })
    }
}

impl IntoResponseParts for SessionJar {
    type Error = Infallible;

    fn into_response_parts(self, res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        let res = self.signed.into_response_parts(res)?;
        self.plain.into_response_parts(res)
    }
}

impl SessionJar {
    #[cfg(test)]
    pub(crate) fn from_headers(headers: &axum::http::HeaderMap, key: Key, policy: CookiePolicy) -> Self {
        Self {
            signed: SignedCookieJar::from_headers(headers, key),
            plain: CookieJar::from_headers(headers),
            policy,
        }
    }

    fn value(&self, name: &str) -> Option<String> {
        self.signed
            .get(name)
            .map(|c| c.value().to_string())
            .filter(|v| !v.is_empty())
    }

    fn plain_value(&self, name: &str) -> Option<String> {
        self.plain
            .get(name)
            .map(|c| c.value().to_string())
            .filter(|v| !v.is_empty())
    }

    fn build(&self, name: &'static str, value: String, max_age_secs: i64, http_only: bool) -> Cookie<'static> {
        Cookie::build((name, value))
            .path("/")
            .http_only(http_only)
            .secure(self.policy.secure)
            .same_site(SameSite::Lax)
            .max_age(Duration::seconds(max_age_secs))
            .build()
    }

    fn set(mut self, name: &'static str, value: String, max_age_secs: i64, http_only: bool) -> Self {
        let cookie = self.build(name, value, max_age_secs, http_only);
        self.signed = self.signed.add(cookie);
        self
    }

    fn set_plain(mut self, name: &'static str, value: String, max_age_secs: i64) -> Self {
        let cookie = self.build(name, value, max_age_secs, false);
        self.plain = self.plain.add(cookie);
        self
    }

    fn clear(mut self, name: &'static str) -> Self {
        let cookie = Cookie::build((name, ""))
            .path("/")
            .max_age(Duration::ZERO)
            .expires(OffsetDateTime::UNIX_EPOCH)
            .build();
        self.plain = self.plain.add(cookie);
        self
    }

    // ── Discogs ───────────────────────────────────────────────────────────────

    /// Request-token secret parked between login and callback.
    pub fn temp_token_secret(&self) -> Option<String> {
        self.value(OAUTH_TOKEN_SECRET)
    }

    pub fn set_temp_token_secret(self, secret: String) -> Self {
        self.set(OAUTH_TOKEN_SECRET, secret, TEMP_SECRET_MAX_AGE_SECS, true)
    }

    /// Access token and secret, without requiring the username.
    pub fn discogs_token(&self) -> Option<TokenPair> {
        Some(TokenPair {
            key: self.value(DISCOGS_ACCESS_TOKEN)?,
            secret: self.value(DISCOGS_ACCESS_TOKEN_SECRET)?,
        })
    }

    pub fn discogs_session(&self) -> Option<DiscogsSession> {
        Some(DiscogsSession {
            token: self.discogs_token()?,
            username: self.plain_value(DISCOGS_USERNAME)?,
        })
    }

    /// Persist the access token and username, and drop the request-token secret.
    pub fn establish_discogs(self, session: &DiscogsSession) -> Self {
        self.set(
            DISCOGS_ACCESS_TOKEN,
            session.token.key.clone(),
            DISCOGS_SESSION_MAX_AGE_SECS,
            true,
        )
        .set(
            DISCOGS_ACCESS_TOKEN_SECRET,
            session.token.secret.clone(),
            DISCOGS_SESSION_MAX_AGE_SECS,
            true,
        )
        .set_plain(
            DISCOGS_USERNAME,
            session.username.clone(),
            DISCOGS_SESSION_MAX_AGE_SECS,
        )
        .clear(OAUTH_TOKEN_SECRET)
    }

    pub fn clear_discogs(self) -> Self {
        self.clear(DISCOGS_ACCESS_TOKEN)
            .clear(DISCOGS_ACCESS_TOKEN_SECRET)
            .clear(DISCOGS_USERNAME)
            .clear(OAUTH_TOKEN_SECRET)
    }

    // ── Spotify ───────────────────────────────────────────────────────────────

    pub fn spotify_state(&self) -> Option<String> {
        self.value(SPOTIFY_AUTH_STATE)
    }

    pub fn set_spotify_state(self, nonce: String) -> Self {
        self.set(SPOTIFY_AUTH_STATE, nonce, SPOTIFY_STATE_MAX_AGE_SECS, true)
    }

    pub fn clear_spotify_state(self) -> Self {
        self.clear(SPOTIFY_AUTH_STATE)
    }

    pub fn spotify_access_token(&self) -> Option<String> {
        self.value(SPOTIFY_ACCESS_TOKEN)
    }

    pub fn spotify_refresh_token(&self) -> Option<String> {
        self.value(SPOTIFY_REFRESH_TOKEN)
    }

    /// Store a token-endpoint answer. The refresh cookie is only rewritten
    /// when the provider returned (or rotated) a refresh token.
    pub fn store_spotify_tokens(self, tokens: &SpotifyTokens) -> Self {
        let jar = self.set(
            SPOTIFY_ACCESS_TOKEN,
            tokens.access_token.clone(),
            tokens.expires_in,
            true,
        );
        match &tokens.refresh_token {
            Some(refresh) => jar.set(
                SPOTIFY_REFRESH_TOKEN,
                refresh.clone(),
                SPOTIFY_REFRESH_MAX_AGE_SECS,
                true,
            ),
            None => jar,
        }
    }

    pub fn clear_spotify(self) -> Self {
        self.clear(SPOTIFY_ACCESS_TOKEN)
            .clear(SPOTIFY_REFRESH_TOKEN)
            .clear(SPOTIFY_AUTH_STATE)
    }
}
