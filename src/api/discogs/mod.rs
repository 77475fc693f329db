//! Discogs routes: three-legged OAuth 1.0a controller and signed proxies.

mod auth;
mod catalog;
mod user;

use super::AppState;
use crate::error::AppError;
use crate::session::{DiscogsSession, SessionJar};
use axum::{routing::get, Router};

/// Create the Discogs router
pub fn create_discogs_router() -> Router<AppState> {
    Router::new()
        .route("/api/discogs/auth/login", get(auth::login))
        .route("/api/discogs/auth/callback", get(auth::callback))
        .route("/api/discogs/auth/logout", get(auth::logout))
        .route("/api/discogs/auth/debug", get(auth::debug))
        .route("/api/discogs/user/collection", get(user::collection))
        .route("/api/discogs/user/wantlist", get(user::wantlist))
        .route("/api/discogs/user/stats", get(user::stats))
        .route("/api/discogs/search/suggestions", get(catalog::suggestions))
        .route("/api/discogs/release/:id", get(catalog::release))
        .route("/api/discogs/artist/:name", get(catalog::artist))
}

/// Full session or 401, checked before any upstream call.
fn require_session(jar: &SessionJar) -> Result<DiscogsSession, AppError> {
    jar.discogs_session()
        .ok_or_else(|| AppError::Unauthenticated("Not authenticated with Discogs".to_string()))
}
