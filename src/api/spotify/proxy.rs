//! Spotify resource proxies. Catalog lookups use the shared app token;
//! user-scoped calls use the session's access token.

use super::super::AppState;
use super::require_user_token;
use crate::auth::non_empty;
use crate::error::{AppError, Result, UpstreamStatus};
use crate::session::SessionJar;
use crate::spotify::{AlbumSummary, Playlist, TrackSummary};
use anyhow::Context;
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

const PREVIEW_TRACK_LIMIT: u32 = 10;

/// GET /api/spotify/me
///
/// Upstream failures keep the upstream status so the client can tell an
/// expired token (401) from an outage.
pub async fn me(State(state): State<AppState>, jar: SessionJar) -> Response {
    let Some(token) = jar.spotify_access_token() else {
        return disconnected(StatusCode::UNAUTHORIZED, "Not authenticated with Spotify".to_string());
    };

    match state.spotify.current_user(&token).await {
        Ok(user) => Json(json!({
            "connected": true,
            "user": {
                "id": user["id"],
                "display_name": user["display_name"],
                "email": user["email"],
                "images": user["images"],
                "product": user["product"],
                "country": user["country"],
            }
        }))
        .into_response(),
        Err(e) => match e.downcast_ref::<UpstreamStatus>() {
            Some(upstream) => {
                warn!(status = upstream.status, "Spotify profile request rejected");
                let status = StatusCode::from_u16(upstream.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                disconnected(status, "Failed to get user profile".to_string())
            }
            None => {
                warn!(error = %e, "Spotify profile request failed");
                disconnected(StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", e))
            }
        },
    }
}

fn disconnected(status: StatusCode, error: String) -> Response {
    (status, Json(json!({ "error": error, "connected": false }))).into_response()
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    artist: Option<String>,
    album: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    album: Option<AlbumSummary>,
}

/// GET /api/spotify/search?artist=&album=
pub async fn search(State(state): State<AppState>, Query(query): Query<SearchQuery>) -> Result<Json<SearchResponse>> {
    let (Some(artist), Some(album)) = (
        non_empty(query.artist.as_deref()),
        non_empty(query.album.as_deref()),
    ) else {
        return Err(AppError::BadRequest("Missing artist or album parameter".to_string()));
    };

    let token = state.app_token().await?;
    let found = state
        .spotify
        .search_album(&token, &format!("artist:{} album:{}", artist, album))
        .await?;

    debug!(artist = %artist, album = %album, found = found.is_some(), "Spotify album search");
    Ok(Json(SearchResponse { album: found }))
}

#[derive(Debug, Deserialize)]
pub struct PreviewQuery {
    artist: Option<String>,
    title: Option<String>,
}

/// GET /api/spotify/preview?artist=&title=
///
/// First track of the matching album that carries a preview clip.
pub async fn preview(State(state): State<AppState>, Query(query): Query<PreviewQuery>) -> Result<Json<Value>> {
    let (Some(artist), Some(title)) = (
        non_empty(query.artist.as_deref()),
        non_empty(query.title.as_deref()),
    ) else {
        return Err(AppError::BadRequest("Missing artist or title".to_string()));
    };

    let token = state.app_token().await?;
    let Some(album) = state
        .spotify
        .search_album(&token, &format!("album:{} artist:{}", title, artist))
        .await?
    else {
        return Ok(Json(json!({ "previewUrl": null })));
    };

    let tracks = state
        .spotify
        .album_tracks(&token, &album.id, Some(PREVIEW_TRACK_LIMIT))
        .await?;
    let with_preview = tracks.into_iter().find(|t| t.preview_url.is_some());

    Ok(Json(json!({
        "previewUrl": with_preview.as_ref().and_then(|t| t.preview_url.clone()),
        "trackName": with_preview.map(|t| t.name),
        "spotifyUrl": album.external_urls["spotify"],
    })))
}

#[derive(Debug, Serialize)]
pub struct TracksResponse {
    tracks: Vec<TrackSummary>,
}

/// GET /api/spotify/album/:id/tracks
pub async fn album_tracks(
    State(state): State<AppState>,
    Path(album_id): Path<String>,
    jar: SessionJar,
) -> Result<Json<TracksResponse>> {
    let token = match jar.spotify_access_token() {
        Some(token) => token,
        None => state.app_token().await?,
    };

    let tracks = state.spotify.album_tracks(&token, &album_id, None).await?;
    Ok(Json(TracksResponse { tracks }))
}

#[derive(Debug, Serialize)]
pub struct PlaylistResponse {
    playlist: Playlist,
}

/// GET /api/spotify/playlist/create
pub async fn create_playlist(State(state): State<AppState>, jar: SessionJar) -> Result<Json<PlaylistResponse>> {
    let token = require_user_token(&jar)?;
    let playlist = favorites_playlist(&state, &token).await?;
    Ok(Json(PlaylistResponse { playlist }))
}

#[derive(Debug, Deserialize)]
pub struct AddTrackRequest {
    #[serde(rename = "trackUri")]
    track_uri: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddTrackResponse {
    success: bool,
    playlist_id: String,
    message: String,
}

/// POST /api/spotify/playlist/add-track
///
/// Body rejections are reported as JSON errors, after the session check.
pub async fn add_track(
    State(state): State<AppState>,
    jar: SessionJar,
    body: std::result::Result<Json<AddTrackRequest>, JsonRejection>,
) -> Result<Json<AddTrackResponse>> {
    let token = require_user_token(&jar)?;
    let Json(body) = body.map_err(|rejection| {
        AppError::BadRequest(format!("Invalid request body: {}", rejection.body_text()))
    })?;
    let track_uri = non_empty(body.track_uri.as_deref())
        .ok_or_else(|| AppError::BadRequest("Track URI is required".to_string()))?;

    let playlist = favorites_playlist(&state, &token).await?;
    let added = state
        .spotify
        .add_track(&token, &playlist.id, track_uri)
        .await?;

    let message = if added {
        info!(playlist_id = %playlist.id, track_uri = %track_uri, "Track added to favorites");
        "Track added to Discmaster Favorites"
    } else {
        debug!(playlist_id = %playlist.id, track_uri = %track_uri, "Track already in favorites");
        "Track already in Discmaster Favorites"
    };

    Ok(Json(AddTrackResponse {
        success: true,
        playlist_id: playlist.id,
        message: message.to_string(),
    }))
}

async fn favorites_playlist(state: &AppState, token: &str) -> Result<Playlist> {
    let user = state.spotify.current_user(token).await?;
    let user_id = user["id"]
        .as_str()
        .context("Spotify profile has no id")?;
    Ok(state.spotify.get_or_create_favorites(token, user_id).await?)
}
