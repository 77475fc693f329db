//! Spotify routes: authorization-code controller and resource proxies.

mod auth;
mod proxy;

use super::AppState;
use crate::error::AppError;
use crate::session::SessionJar;
use axum::{
    routing::{get, post},
    Router,
};

/// Create the Spotify router
pub fn create_spotify_router() -> Router<AppState> {
    Router::new()
        .route("/api/spotify/auth/login", get(auth::login))
        .route("/api/spotify/auth/callback", get(auth::callback))
        .route("/api/spotify/auth/refresh", get(auth::refresh))
        .route("/api/spotify/auth/logout", get(auth::logout))
        .route("/api/spotify/me", get(proxy::me))
        .route("/api/spotify/search", get(proxy::search))
        .route("/api/spotify/preview", get(proxy::preview))
        .route("/api/spotify/album/:id/tracks", get(proxy::album_tracks))
        .route("/api/spotify/playlist/create", get(proxy::create_playlist))
        .route("/api/spotify/playlist/add-track", post(proxy::add_track))
}

fn require_user_token(jar: &SessionJar) -> Result<String, AppError> {
    jar.spotify_access_token()
        .ok_or_else(|| AppError::Unauthenticated("Not authenticated with Spotify".to_string()))
}
