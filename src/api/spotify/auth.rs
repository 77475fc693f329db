//! OAuth 2.0 authorization-code flow with Spotify.
//!
//! 1. GET /api/spotify/auth/login → issue state nonce, redirect to Spotify
//! 2. User authorizes on accounts.spotify.com
//! 3. GET /api/spotify/auth/callback → verify state, exchange code, store tokens
//!
//! Refresh is on demand (GET /api/spotify/auth/refresh), never timer-driven.

use super::super::AppState;
use crate::auth::{generate_state_nonce, non_empty, states_match, Handshake, SpotifyState};
use crate::error::{AppError, Result};
use crate::session::SessionJar;
use crate::spotify::{SpotifyTokens, LOGIN_SCOPES};
use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::{Json, Redirect},
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

/// Callback query parameters
#[derive(Debug, Default, Deserialize)]
pub struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

fn redirect_uri(state: &AppState, base: &str) -> String {
    non_empty(state.config.spotify.redirect_uri.as_deref())
        .map(str::to_string)
        .unwrap_or_else(|| format!("{}/api/spotify/auth/callback", base))
}

/// GET /api/spotify/auth/login
pub async fn login(State(state): State<AppState>, headers: HeaderMap, jar: SessionJar) -> (SessionJar, Redirect) {
    let base = state.base_url(&headers);
    let mut flow = Handshake::begin(SpotifyState::Start);

    let Some(client_id) = non_empty(state.config.spotify.client_id.as_deref()) else {
        let err = AppError::MissingConfig("Spotify");
        flow.fail(&err);
        warn!(error = %err, "Spotify login unavailable");
        return (
            jar,
            Redirect::temporary(&format!("{}/settings?error=spotify_not_configured", base)),
        );
    };

    let nonce = generate_state_nonce();
    let target = state
        .spotify
        .authorize_url(client_id, &redirect_uri(&state, &base), &nonce, LOGIN_SCOPES);

    let issued = flow
        .advance(SpotifyState::StateIssued)
        .and_then(|_| flow.advance(SpotifyState::RedirectedToProvider));
    if let Err(err) = issued {
        flow.fail(&err);
        return (jar, settings_error(&base, &err));
    }

    info!("Redirecting to Spotify for authorization");
    (jar.set_spotify_state(nonce), Redirect::temporary(&target))
}

/// GET /api/spotify/auth/callback
///
/// The state cookie is cleared whatever the outcome.
pub async fn callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<CallbackQuery>,
    jar: SessionJar,
) -> (SessionJar, Redirect) {
    let base = state.base_url(&headers);
    let mut flow = Handshake::begin(SpotifyState::AwaitingCallback);

    let result = complete_handshake(&state, &base, &query, &jar, &mut flow).await;
    let jar = jar.clear_spotify_state();

    match result {
        Ok(tokens) => {
            info!(
                expires_in = tokens.expires_in,
                has_refresh_token = tokens.refresh_token.is_some(),
                "Spotify session established"
            );
            (
                jar.store_spotify_tokens(&tokens),
                Redirect::temporary(&format!("{}/settings?spotify=success", base)),
            )
        }
        Err(err) => {
            flow.fail(&err);
            (jar, settings_error(&base, &err))
        }
    }
}

async fn complete_handshake(
    state: &AppState,
    base: &str,
    query: &CallbackQuery,
    jar: &SessionJar,
    flow: &mut Handshake<SpotifyState>,
) -> Result<SpotifyTokens> {
    let stored = jar.spotify_state();
    if !states_match(query.state.as_deref(), stored.as_deref()) {
        return Err(AppError::StateMismatch);
    }
    flow.advance(SpotifyState::StateVerified)?;

    if let Some(error) = non_empty(query.error.as_deref()) {
        return Err(AppError::Upstream(error.to_string()));
    }

    let code = non_empty(query.code.as_deref()).ok_or(AppError::MissingConfig("Spotify"))?;
    let creds = state.spotify_credentials()?;

    let tokens = state
        .spotify
        .exchange_code(&creds, code, &redirect_uri(state, base))
        .await?;
    flow.advance(SpotifyState::CodeExchanged)?;
    flow.advance(SpotifyState::SessionEstablished)?;

    Ok(tokens)
}

/// GET /api/spotify/auth/refresh
pub async fn refresh(State(state): State<AppState>, jar: SessionJar) -> Result<(SessionJar, Json<Value>)> {
    let refresh_token = jar
        .spotify_refresh_token()
        .ok_or_else(|| AppError::Unauthenticated("No refresh token available".to_string()))?;
    let creds = state.spotify_credentials()?;

    let tokens = state.spotify.refresh_token(&creds, &refresh_token).await?;
    debug!(rotated = tokens.refresh_token.is_some(), "Spotify access token refreshed");

    Ok((jar.store_spotify_tokens(&tokens), Json(json!({ "success": true }))))
}

/// GET /api/spotify/auth/logout
pub async fn logout(State(state): State<AppState>, headers: HeaderMap, jar: SessionJar) -> (SessionJar, Redirect) {
    debug!("Clearing Spotify session");
    let target = format!("{}/settings?spotify=logged_out", state.base_url(&headers));
    (jar.clear_spotify(), Redirect::temporary(&target))
}

/// Redirect code for a failed handshake step.
fn error_code(err: &AppError) -> String {
    match err {
        AppError::StateMismatch => "state_mismatch".to_string(),
        AppError::MissingConfig(_) => "missing_config".to_string(),
        other => urlencoding::encode(&other.to_string()).into_owned(),
    }
}

fn settings_error(base: &str, err: &AppError) -> Redirect {
    warn!(error = %err, "Spotify authorization failed");
    Redirect::temporary(&format!("{}/settings?error={}", base, error_code(err)))
}
