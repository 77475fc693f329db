//! Signed proxies for the signed-in user's collection, wantlist and stats.

use super::super::AppState;
use super::require_session;
use crate::discogs::{DiscogsAuth, ListQuery};
use crate::error::Result;
use crate::session::SessionJar;
use axum::{
    extract::{Query, State},
    response::Json,
};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

/// GET /api/discogs/user/collection
pub async fn collection(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
    jar: SessionJar,
) -> Result<Json<Value>> {
    let session = require_session(&jar)?;
    let signer = state.discogs_signer()?;
    let auth = DiscogsAuth::OAuth {
        signer: &signer,
        token: &session.token,
    };

    debug!(username = %session.username, "Fetching Discogs collection");
    let releases = state
        .discogs
        .collection_releases(&auth, &session.username, &query)
        .await?;
    Ok(Json(releases))
}

/// GET /api/discogs/user/wantlist
pub async fn wantlist(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
    jar: SessionJar,
) -> Result<Json<Value>> {
    let session = require_session(&jar)?;
    let signer = state.discogs_signer()?;
    let auth = DiscogsAuth::OAuth {
        signer: &signer,
        token: &session.token,
    };

    debug!(username = %session.username, "Fetching Discogs wantlist");
    let wants = state
        .discogs
        .wantlist(&auth, &session.username, &query)
        .await?;
    Ok(Json(wants))
}

/// Profile summary assembled from three upstream calls
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    username: Value,
    name: Value,
    avatar_url: Value,
    stats: StatCounts,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatCounts {
    collection_count: u64,
    wantlist_count: u64,
    inventory_count: u64,
}

impl UserStats {
    fn from_parts(profile: &Value, folder: &Value, wants: &Value) -> Self {
        Self {
            username: profile["username"].clone(),
            name: profile["name"].clone(),
            avatar_url: profile["avatar_url"].clone(),
            stats: StatCounts {
                collection_count: folder["count"].as_u64().unwrap_or(0),
                wantlist_count: wants["pagination"]["items"].as_u64().unwrap_or(0),
                inventory_count: profile["num_for_sale"].as_u64().unwrap_or(0),
            },
        }
    }
}

/// GET /api/discogs/user/stats
///
/// Any failing constituent call fails the whole response.
pub async fn stats(State(state): State<AppState>, jar: SessionJar) -> Result<Json<UserStats>> {
    let session = require_session(&jar)?;
    let signer = state.discogs_signer()?;
    let auth = DiscogsAuth::OAuth {
        signer: &signer,
        token: &session.token,
    };
    let username = session.username.as_str();

    let (profile, folder, wants) = futures::try_join!(
        state.discogs.user_profile(&auth, username),
        state.discogs.collection_folder(&auth, username),
        state.discogs.wants_summary(&auth, username),
    )?;

    Ok(Json(UserStats::from_parts(&profile, &folder, &wants)))
}
