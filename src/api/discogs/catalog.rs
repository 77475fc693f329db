//! Catalog lookups: search suggestions, release detail, artist page.

use super::super::AppState;
use crate::auth::{non_empty, OAuth1Signer, TokenPair};
use crate::discogs::{ArtistInfo, DiscogsAuth, ReleaseSummary};
use crate::error::{AppError, Result};
use crate::session::SessionJar;
use anyhow::Context;
use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Json},
};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

const RELEASE_CACHE_CONTROL: &str = "public, s-maxage=3600, stale-while-revalidate=7200";
const MIN_SUGGESTION_QUERY_CHARS: usize = 2;

#[derive(Debug, Deserialize)]
pub struct SuggestionQuery {
    q: Option<String>,
}

/// GET /api/discogs/search/suggestions?q=
///
/// Signed when a session exists, retried anonymously if that fails. Never
/// errors: any failure yields an empty list.
pub async fn suggestions(
    State(state): State<AppState>,
    Query(query): Query<SuggestionQuery>,
    jar: SessionJar,
) -> Json<Value> {
    let q = query.q.unwrap_or_default();
    if q.chars().count() < MIN_SUGGESTION_QUERY_CHARS {
        return Json(json!({ "results": [] }));
    }

    let params = [("q", q.as_str()), ("per_page", "5"), ("type", "release")];
    let token = jar.discogs_token();
    let signer = state.discogs_signer().ok();

    let signed = match (signer.as_ref(), token.as_ref()) {
        (Some(signer), Some(token)) => {
            let auth = DiscogsAuth::OAuth { signer, token };
            Some(state.discogs.search(&auth, &params).await)
        }
        _ => None,
    };

    let result = match signed {
        Some(Ok(found)) => Ok(found),
        Some(Err(e)) => {
            debug!(error = %e, "Signed suggestion search failed, retrying anonymously");
            state.discogs.search(&DiscogsAuth::Anonymous, &params).await
        }
        None => state.discogs.search(&DiscogsAuth::Anonymous, &params).await,
    };

    match result {
        Ok(found) => {
            let results = match &found["results"] {
                Value::Array(_) => found["results"].clone(),
                _ => json!([]),
            };
            Json(json!({ "results": results }))
        }
        Err(e) => {
            warn!(error = %e, "Suggestion search failed");
            Json(json!({ "results": [] }))
        }
    }
}

/// GET /api/discogs/release/:id
pub async fn release(
    State(state): State<AppState>,
    Path(id): Path<String>,
    jar: SessionJar,
) -> Result<impl IntoResponse> {
    let token = jar
        .discogs_token()
        .ok_or_else(|| AppError::Unauthenticated("Not authenticated".to_string()))?;
    let signer = state.discogs_signer()?;
    let auth = DiscogsAuth::OAuth {
        signer: &signer,
        token: &token,
    };

    let release = state.discogs.release(&auth, &id).await?;
    Ok(([(header::CACHE_CONTROL, RELEASE_CACHE_CONTROL)], Json(release)))
}

#[derive(Debug, Serialize)]
pub struct ArtistPage {
    artist: Option<ArtistInfo>,
    releases: Vec<ReleaseSummary>,
}

/// GET /api/discogs/artist/:name
///
/// Uses the user's session when present, else the configured personal token,
/// else anonymous calls. A failing artist profile yields `artist: null`; a
/// failing release listing fails the request.
pub async fn artist(
    State(state): State<AppState>,
    Path(name): Path<String>,
    jar: SessionJar,
) -> Result<Json<ArtistPage>> {
    let token = jar.discogs_token();
    let signer = state.discogs_signer().ok();
    let auth = artist_auth(
        signer.as_ref(),
        token.as_ref(),
        state.config.discogs.user_token.as_deref(),
    );

    let (releases, artist) = tokio::join!(
        artist_releases(&state, &auth, &name),
        artist_info(&state, &auth, &name),
    );

    Ok(Json(ArtistPage {
        artist,
        releases: releases?,
    }))
}

fn artist_auth<'a>(
    signer: Option<&'a OAuth1Signer>,
    token: Option<&'a TokenPair>,
    personal_token: Option<&'a str>,
) -> DiscogsAuth<'a> {
    match (signer, token, non_empty(personal_token)) {
        (Some(signer), Some(token), _) => DiscogsAuth::OAuth { signer, token },
        (_, _, Some(personal)) => DiscogsAuth::PersonalToken(personal),
        _ => DiscogsAuth::Anonymous,
    }
}

async fn artist_releases(state: &AppState, auth: &DiscogsAuth<'_>, name: &str) -> Result<Vec<ReleaseSummary>> {
    let Some(artist_id) = state.discogs.find_artist_id(auth, name).await? else {
        return Ok(Vec::new());
    };

    let listing = state.discogs.artist_releases(auth, artist_id).await?;
    let entries = listing["releases"]
        .as_array()
        .context("Artist releases response has no releases")?;

    let details = entries.iter().take(10).map(|entry| async move {
        match state.discogs.release_detail(auth, entry).await {
            Ok(detail) => ReleaseSummary::from_detail(&detail),
            Err(e) => {
                debug!(error = %e, release = %entry["id"], "Release detail failed, using listing data");
                ReleaseSummary::from_basic(entry)
            }
        }
    });

    Ok(join_all(details).await)
}

async fn artist_info(state: &AppState, auth: &DiscogsAuth<'_>, name: &str) -> Option<ArtistInfo> {
    match lookup_artist(state, auth, name).await {
        Ok(artist) => artist.map(|a| ArtistInfo::from_value(&a)),
        Err(e) => {
            warn!(artist = %name, error = %e, "Artist lookup failed");
            None
        }
    }
}

async fn lookup_artist(state: &AppState, auth: &DiscogsAuth<'_>, name: &str) -> anyhow::Result<Option<Value>> {
    match state.discogs.find_artist_id(auth, name).await? {
        Some(id) => state.discogs.artist(auth, id).await.map(Some),
        None => Ok(None),
    }
}
