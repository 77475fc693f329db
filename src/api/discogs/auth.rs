//! OAuth 1.0a handshake with Discogs.
//!
//! 1. GET /api/discogs/auth/login → request token, park its secret, redirect to Discogs
//! 2. User approves on discogs.com
//! 3. GET /api/discogs/auth/callback → exchange verifier, look up identity, set session
//!
//! Failures never reach the client as errors: each one becomes a redirect to
//! `/profile?error=<code>`.

use super::super::AppState;
use crate::auth::{non_empty, DiscogsState, Handshake, TokenPair};
use crate::discogs::PLACEHOLDER_USERNAME;
use crate::error::AppError;
use crate::session::{DiscogsSession, SessionJar};
use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::{Json, Redirect},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Callback query parameters
#[derive(Debug, Default, Deserialize)]
pub struct CallbackQuery {
    oauth_token: Option<String>,
    oauth_verifier: Option<String>,
}

/// GET /api/discogs/auth/login
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: SessionJar,
) -> (SessionJar, Redirect) {
    let base = state.base_url(&headers);
    let mut flow = Handshake::begin(DiscogsState::Start);

    match request_authorization(&state, &base, &mut flow).await {
        Ok(request_token) => {
            let target = state.discogs.authorize_url(&request_token.key);
            info!("Redirecting to Discogs for authorization");
            (
                jar.set_temp_token_secret(request_token.secret),
                Redirect::temporary(&target),
            )
        }
        Err(err) => {
            flow.fail(&err);
            (jar, profile_error(&base, &err))
        }
    }
}

async fn request_authorization(
    state: &AppState,
    base: &str,
    flow: &mut Handshake<DiscogsState>,
) -> Result<TokenPair, AppError> {
    let signer = state.discogs_signer()?;
    flow.advance(DiscogsState::AwaitingRequestToken)?;

    let callback_url = format!("{}/api/discogs/auth/callback", base);
    let request_token = state.discogs.request_token(&signer, &callback_url).await?;
    flow.advance(DiscogsState::RedirectedToProvider)?;

    Ok(request_token)
}

/// GET /api/discogs/auth/callback
pub async fn callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<CallbackQuery>,
    jar: SessionJar,
) -> (SessionJar, Redirect) {
    let base = state.base_url(&headers);
    let mut flow = Handshake::begin(DiscogsState::AwaitingVerifier);

    match complete_handshake(&state, &query, &jar, &mut flow).await {
        Ok(session) => {
            info!(username = %session.username, "Discogs session established");
            (
                jar.establish_discogs(&session),
                Redirect::temporary(&format!("{}/profile?oauth=success", base)),
            )
        }
        Err(err) => {
            flow.fail(&err);
            (jar, profile_error(&base, &err))
        }
    }
}

async fn complete_handshake(
    state: &AppState,
    query: &CallbackQuery,
    jar: &SessionJar,
    flow: &mut Handshake<DiscogsState>,
) -> Result<DiscogsSession, AppError> {
    let (Some(token), Some(verifier)) = (
        non_empty(query.oauth_token.as_deref()),
        non_empty(query.oauth_verifier.as_deref()),
    ) else {
        return Err(AppError::MissingParams);
    };

    let secret = jar.temp_token_secret().ok_or(AppError::SessionExpired)?;
    let signer = state.discogs_signer()?;

    let request_token = TokenPair {
        key: token.to_string(),
        secret,
    };
    let access_token = state
        .discogs
        .access_token(&signer, &request_token, verifier)
        .await?;
    flow.advance(DiscogsState::Exchanged)?;

    let username = match state.discogs.identity(&signer, &access_token).await {
        Ok(username) => username,
        Err(e) => {
            warn!(error = %e, "Discogs identity lookup failed, using placeholder username");
            PLACEHOLDER_USERNAME.to_string()
        }
    };
    flow.advance(DiscogsState::IdentityFetched)?;
    flow.advance(DiscogsState::SessionEstablished)?;

    Ok(DiscogsSession {
        token: access_token,
        username,
    })
}

/// GET /api/discogs/auth/logout
pub async fn logout(State(state): State<AppState>, headers: HeaderMap, jar: SessionJar) -> (SessionJar, Redirect) {
    debug!("Clearing Discogs session");
    let target = format!("{}/profile", state.base_url(&headers));
    (jar.clear_discogs(), Redirect::temporary(&target))
}

/// Configuration and cookie presence; never values.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugReport {
    consumer_key_present: bool,
    consumer_secret_present: bool,
    user_token_present: bool,
    app_url: String,
    callback_url: String,
    cookies: CookieReport,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CookieReport {
    access_token: bool,
    session: bool,
    temp_secret: bool,
}

/// GET /api/discogs/auth/debug
pub async fn debug(State(state): State<AppState>, headers: HeaderMap, jar: SessionJar) -> Json<DebugReport> {
    let config = &state.config.discogs;
    let base = state.base_url(&headers);

    Json(DebugReport {
        consumer_key_present: non_empty(config.consumer_key.as_deref()).is_some(),
        consumer_secret_present: non_empty(config.consumer_secret.as_deref()).is_some(),
        user_token_present: non_empty(config.user_token.as_deref()).is_some(),
        callback_url: format!("{}/api/discogs/auth/callback", base),
        app_url: base,
        cookies: CookieReport {
            access_token: jar.discogs_token().is_some(),
            session: jar.discogs_session().is_some(),
            temp_secret: jar.temp_token_secret().is_some(),
        },
    })
}

/// Redirect code for a failed handshake step.
fn error_code(err: &AppError) -> String {
    match err {
        AppError::MissingConfig(_) => "oauth_not_configured".to_string(),
        AppError::MissingParams => "missing_callback_params".to_string(),
        AppError::SessionExpired => "session_expired".to_string(),
        other => urlencoding::encode(&other.to_string()).into_owned(),
    }
}

fn profile_error(base: &str, err: &AppError) -> Redirect {
    warn!(error = %err, "Discogs authorization failed");
    Redirect::temporary(&format!("{}/profile?error={}", base, error_code(err)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UpstreamStatus;

    #[test]
    fn test_error_codes() {
        assert_eq!(error_code(&AppError::MissingConfig("Discogs OAuth")), "oauth_not_configured");
        assert_eq!(error_code(&AppError::MissingParams), "missing_callback_params");
        assert_eq!(error_code(&AppError::SessionExpired), "session_expired");

        let upstream: AppError = anyhow::Error::from(UpstreamStatus {
            service: "Discogs",
            status: 401,
        })
        .into();
        assert_eq!(error_code(&upstream), "Discogs%20API%20error%3A%20401");
    }
}
