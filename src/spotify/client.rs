use crate::auth::{same_origin, ClientCredentials};
use crate::config::SpotifyConfig;
use crate::error::{AppError, UpstreamStatus};
use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

pub const FAVORITES_PLAYLIST_NAME: &str = "Discmaster Favorites";
pub const FAVORITES_PLAYLIST_DESCRIPTION: &str =
    "Your favorite tracks discovered through Discmaster";

/// Upper bound on `/me/playlists` pages read per lookup (50 playlists each).
pub const MAX_PLAYLIST_PAGES: usize = 20;

/// Token endpoint answer (authorization code, refresh or client credentials)
#[derive(Clone, Debug, Deserialize)]
pub struct SpotifyTokens {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default = "default_expires_in")]
    pub expires_in: i64,
}

fn default_expires_in() -> i64 {
    3600
}

/// Token endpoint error body
#[derive(Debug, Default, Deserialize)]
struct TokenErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArtistName {
    pub name: String,
}

/// Track as returned to the player
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackSummary {
    #[serde(default)]
    pub id: Option<String>,
    pub uri: String,
    pub name: String,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub track_number: u32,
    #[serde(default)]
    pub preview_url: Option<String>,
    #[serde(default)]
    pub artists: Vec<ArtistName>,
}

/// Album search hit
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AlbumSummary {
    pub id: String,
    pub uri: String,
    pub name: String,
    #[serde(default)]
    pub external_urls: Value,
    #[serde(default)]
    pub images: Value,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlaylistOwner {
    pub id: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<PlaylistOwner>,
}

#[derive(Deserialize)]
struct Page<T> {
    items: Vec<T>,
    #[serde(default)]
    next: Option<String>,
}

#[derive(Deserialize)]
struct AlbumSearch {
    albums: Option<Page<AlbumSummary>>,
}

#[derive(Deserialize)]
struct PlaylistItem {
    track: Option<TrackUri>,
}

#[derive(Deserialize)]
struct TrackUri {
    uri: Option<String>,
}

/// HTTP client for the Spotify accounts service and Web API.
#[derive(Clone)]
pub struct SpotifyClient {
    http: Client,
    accounts_base: String,
    api_base: String,
}

impl SpotifyClient {
    pub fn new(http: Client, config: &SpotifyConfig) -> Self {
        Self {
            http,
            accounts_base: config.accounts_base.trim_end_matches('/').to_string(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
        }
    }

    /// Authorization page URL for the code flow.
    pub fn authorize_url(&self, client_id: &str, redirect_uri: &str, state: &str, scopes: &[&str]) -> String {
        let scope = scopes.join(" ");
        format!(
            "{}/authorize?response_type=code&client_id={}&scope={}&redirect_uri={}&state={}",
            self.accounts_base,
            urlencoding::encode(client_id),
            urlencoding::encode(&scope),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(state)
        )
    }

    /// Exchange an authorization code for access and refresh tokens.
    pub async fn exchange_code(
        &self,
        creds: &ClientCredentials,
        code: &str,
        redirect_uri: &str,
    ) -> Result<SpotifyTokens> {
        self.token_request(
            creds,
            &[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", redirect_uri),
            ],
            "Failed to get token",
        )
        .await
    }

    pub async fn refresh_token(
        &self,
        creds: &ClientCredentials,
        refresh_token: &str,
    ) -> Result<SpotifyTokens> {
        self.token_request(
            creds,
            &[("grant_type", "refresh_token"), ("refresh_token", refresh_token)],
            "Failed to refresh token",
        )
        .await
    }

    /// App-only token for calls that need no user.
    pub async fn client_credentials_token(&self, creds: &ClientCredentials) -> Result<SpotifyTokens> {
        self.token_request(
            creds,
            &[("grant_type", "client_credentials")],
            "Failed to get Spotify token",
        )
        .await
    }

    async fn token_request(
        &self,
        creds: &ClientCredentials,
        form: &[(&str, &str)],
        failure: &str,
    ) -> Result<SpotifyTokens> {
        let url = format!("{}/api/token", self.accounts_base);
        debug!(grant_type = form[0].1, "Requesting Spotify token");

        let response = self
            .http
            .post(&url)
            .header("Authorization", creds.basic_auth_header())
            .form(form)
            .send()
            .await
            .context("Failed to send Spotify token request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body: TokenErrorBody = response.json().await.unwrap_or_default();
            let message = body
                .error_description
                .or(body.error)
                .unwrap_or_else(|| failure.to_string());
            debug!(status = status.as_u16(), message = %message, "Spotify token request rejected");
            return Err(AppError::Upstream(message).into());
        }

        response
            .json::<SpotifyTokens>()
            .await
            .context("Failed to parse Spotify token response")
    }

    /// `GET /me` passed through untouched.
    pub async fn current_user(&self, access_token: &str) -> Result<Value> {
        self.get_json(&format!("{}/me", self.api_base), access_token, &[])
            .await
    }

    /// First album matching `query` (Spotify search syntax).
    pub async fn search_album(&self, access_token: &str, query: &str) -> Result<Option<AlbumSummary>> {
        let url = format!("{}/search", self.api_base);
        let value = self
            .get_json(&url, access_token, &[("q", query), ("type", "album"), ("limit", "1")])
            .await?;
        let search: AlbumSearch =
            serde_json::from_value(value).context("Failed to parse album search response")?;
        Ok(search.albums.and_then(|page| page.items.into_iter().next()))
    }

    pub async fn album_tracks(
        &self,
        access_token: &str,
        album_id: &str,
        limit: Option<u32>,
    ) -> Result<Vec<TrackSummary>> {
        let url = format!(
            "{}/albums/{}/tracks",
            self.api_base,
            urlencoding::encode(album_id)
        );
        let limit = limit.map(|l| l.to_string());
        let query: Vec<(&str, &str)> = limit.iter().map(|l| ("limit", l.as_str())).collect();
        let value = self.get_json(&url, access_token, &query).await?;
        let page: Page<TrackSummary> =
            serde_json::from_value(value).context("Failed to parse album tracks response")?;
        Ok(page.items)
    }

    /// All playlists of the current user, following pagination.
    ///
    /// `next` links are only followed on the API origin, and at most
    /// [`MAX_PLAYLIST_PAGES`] pages are read.
    pub async fn user_playlists(&self, access_token: &str) -> Result<Vec<Playlist>> {
        let mut playlists = Vec::new();
        let mut next = Some(format!("{}/me/playlists?limit=50", self.api_base));
        let mut pages = 0;

        while let Some(url) = next.take() {
            let value = self.get_json(&url, access_token, &[]).await?;
            let page: Page<Playlist> =
                serde_json::from_value(value).context("Failed to parse playlists response")?;
            playlists.extend(page.items);
            pages += 1;

            match page.next {
                Some(link) if !same_origin(&link, &self.api_base) => {
                    warn!(next = %link, "Ignoring playlist page outside the Spotify API");
                }
                Some(_) if pages >= MAX_PLAYLIST_PAGES => {
                    warn!(pages, "Stopping playlist pagination at page limit");
                }
                link => next = link,
            }
        }

        Ok(playlists)
    }

    pub async fn create_playlist(&self, access_token: &str, user_id: &str) -> Result<Playlist> {
        let url = format!(
            "{}/users/{}/playlists",
            self.api_base,
            urlencoding::encode(user_id)
        );
        let response = self
            .http
            .post(&url)
            .bearer_auth(access_token)
            .json(&json!({
                "name": FAVORITES_PLAYLIST_NAME,
                "description": FAVORITES_PLAYLIST_DESCRIPTION,
                "public": false,
            }))
            .send()
            .await
            .context("Failed to send create playlist request")?;

        check_response_status(&response)?;
        response
            .json::<Playlist>()
            .await
            .context("Failed to parse created playlist")
    }

    /// The user's own "Discmaster Favorites" playlist, created on first use.
    pub async fn get_or_create_favorites(&self, access_token: &str, user_id: &str) -> Result<Playlist> {
        let existing = self
            .user_playlists(access_token)
            .await?
            .into_iter()
            .find(|p| {
                p.name == FAVORITES_PLAYLIST_NAME
                    && p.owner.as_ref().map(|o| o.id.as_str()) == Some(user_id)
            });

        match existing {
            Some(playlist) => Ok(playlist),
            None => {
                debug!(user_id = %user_id, "Creating favorites playlist");
                self.create_playlist(access_token, user_id).await
            }
        }
    }

    /// Append `track_uri` unless the playlist already holds it.
    ///
    /// Returns `false` when the track was already present.
    pub async fn add_track(&self, access_token: &str, playlist_id: &str, track_uri: &str) -> Result<bool> {
        let url = format!(
            "{}/playlists/{}/tracks",
            self.api_base,
            urlencoding::encode(playlist_id)
        );

        // A failed duplicate check is not fatal; fall through to the add
        if let Ok(value) = self
            .get_json(&url, access_token, &[("fields", "items(track(uri))")])
            .await
        {
            if let Ok(page) = serde_json::from_value::<Page<PlaylistItem>>(value) {
                let present = page.items.iter().any(|item| {
                    item.track.as_ref().and_then(|t| t.uri.as_deref()) == Some(track_uri)
                });
                if present {
                    return Ok(false);
                }
            }
        }

        let response = self
            .http
            .post(&url)
            .bearer_auth(access_token)
            .json(&json!({ "uris": [track_uri] }))
            .send()
            .await
            .context("Failed to send add track request")?;

        check_response_status(&response)?;
        Ok(true)
    }

    async fn get_json(&self, url: &str, access_token: &str, query: &[(&str, &str)]) -> Result<Value> {
        let response = self
            .http
            .get(url)
            .bearer_auth(access_token)
            .query(query)
            .send()
            .await
            .with_context(|| format!("Failed to send Spotify request to {}", url))?;

        check_response_status(&response)?;
        response
            .json::<Value>()
            .await
            .context("Failed to parse Spotify response")
    }
}

fn check_response_status(response: &reqwest::Response) -> Result<()> {
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(UpstreamStatus {
            service: "Spotify",
            status: status.as_u16(),
        }
        .into())
    }
}
