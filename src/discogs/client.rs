use crate::auth::{same_origin, OAuth1Signer, TokenPair};
use crate::config::DiscogsConfig;
use crate::error::{AppError, UpstreamStatus};
use anyhow::{anyhow, Context, Result};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

/// Username stored when the identity lookup fails after a successful exchange.
pub const PLACEHOLDER_USERNAME: &str = "DiscogsUser";

/// How a resource call authenticates.
pub enum DiscogsAuth<'a> {
    /// User session: OAuth 1.0a signed with the access token.
    OAuth {
        signer: &'a OAuth1Signer,
        token: &'a TokenPair,
    },
    /// Personal access token from configuration.
    PersonalToken(&'a str),
    Anonymous,
}

/// Paging and sorting for collection and wantlist listings
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<String>,
    pub per_page: Option<String>,
    pub sort: Option<String>,
    pub sort_order: Option<String>,
    /// Free-text filter (collection only)
    pub q: Option<String>,
}

impl ListQuery {
    fn to_query_string(&self, include_filter: bool) -> String {
        let or = |v: &Option<String>, default: &str| {
            v.as_deref()
                .filter(|s| !s.is_empty())
                .unwrap_or(default)
                .to_string()
        };
        let mut query = format!(
            "page={}&per_page={}&sort={}&sort_order={}",
            urlencoding::encode(&or(&self.page, "1")),
            urlencoding::encode(&or(&self.per_page, "50")),
            urlencoding::encode(&or(&self.sort, "added")),
            urlencoding::encode(&or(&self.sort_order, "desc")),
        );
        if include_filter {
            if let Some(q) = self.q.as_deref().filter(|q| !q.is_empty()) {
                query.push_str(&format!("&q={}", urlencoding::encode(q)));
            }
        }
        query
    }
}

/// Token endpoint body (`application/x-www-form-urlencoded`)
#[derive(Deserialize)]
struct TokenBody {
    oauth_token: Option<String>,
    oauth_token_secret: Option<String>,
}

#[derive(Deserialize)]
struct Identity {
    username: Option<String>,
}

/// HTTP client for the Discogs API.
#[derive(Clone)]
pub struct DiscogsClient {
    http: Client,
    api_base: String,
    web_base: String,
    user_agent: String,
}

impl DiscogsClient {
    pub fn new(http: Client, config: &DiscogsConfig) -> Self {
        Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            web_base: config.web_base.trim_end_matches('/').to_string(),
            user_agent: config.user_agent.clone(),
        }
    }

    // ── OAuth 1.0a handshake ──────────────────────────────────────────────────

    /// Leg one: obtain a request token bound to `callback_url`.
    pub async fn request_token(&self, signer: &OAuth1Signer, callback_url: &str) -> Result<TokenPair> {
        let url = format!("{}/oauth/request_token", self.api_base);
        self.token_request(
            signer,
            &url,
            None,
            &[("oauth_callback", callback_url)],
            "Invalid response from Discogs",
        )
        .await
    }

    /// Leg two: where the user agent is sent to approve the request token.
    pub fn authorize_url(&self, request_token: &str) -> String {
        format!(
            "{}/oauth/authorize?oauth_token={}",
            self.web_base,
            urlencoding::encode(request_token)
        )
    }

    /// Leg three: trade the approved request token and verifier for an access token.
    pub async fn access_token(
        &self,
        signer: &OAuth1Signer,
        request_token: &TokenPair,
        verifier: &str,
    ) -> Result<TokenPair> {
        let url = format!("{}/oauth/access_token", self.api_base);
        self.token_request(
            signer,
            &url,
            Some(request_token),
            &[("oauth_verifier", verifier)],
            "Failed to parse access tokens",
        )
        .await
    }

    /// Username of the token's owner.
    pub async fn identity(&self, signer: &OAuth1Signer, token: &TokenPair) -> Result<String> {
        let url = format!("{}/oauth/identity", self.api_base);
        let auth = DiscogsAuth::OAuth { signer, token };
        let value = self.get(&auth, &url).await?;
        let identity: Identity =
            serde_json::from_value(value).context("Failed to parse identity response")?;
        identity
            .username
            .filter(|u| !u.is_empty())
            .ok_or_else(|| anyhow!("Identity response has no username"))
    }

    async fn token_request(
        &self,
        signer: &OAuth1Signer,
        url: &str,
        token: Option<&TokenPair>,
        extra: &[(&str, &str)],
        missing_fields: &str,
    ) -> Result<TokenPair> {
        let authorization = signer.authorization_header("POST", url, token, extra)?;

        debug!(url = %url, "Requesting Discogs OAuth token");
        let response = self
            .http
            .post(url)
            .header("Authorization", authorization)
            .header("User-Agent", &self.user_agent)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .send()
            .await
            .context("Failed to send Discogs token request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            debug!(status = status.as_u16(), body = %body, "Discogs token request rejected");
            return Err(UpstreamStatus {
                service: "Discogs",
                status: status.as_u16(),
            }
            .into());
        }

        let text = response
            .text()
            .await
            .context("Failed to read Discogs token response")?;
        let body: TokenBody = serde_urlencoded::from_str(&text)
            .map_err(|_| AppError::InvalidResponse(missing_fields.to_string()))?;

        match (body.oauth_token, body.oauth_token_secret) {
            (Some(key), Some(secret)) if !key.is_empty() && !secret.is_empty() => {
                Ok(TokenPair { key, secret })
            }
            _ => Err(AppError::InvalidResponse(missing_fields.to_string()).into()),
        }
    }

    // ── Resources ─────────────────────────────────────────────────────────────

    /// Releases in the user's "All" collection folder.
    pub async fn collection_releases(
        &self,
        auth: &DiscogsAuth<'_>,
        username: &str,
        query: &ListQuery,
    ) -> Result<Value> {
        let url = format!(
            "{}/users/{}/collection/folders/0/releases?{}",
            self.api_base,
            urlencoding::encode(username),
            query.to_query_string(true)
        );
        self.get(auth, &url).await
    }

    pub async fn wantlist(&self, auth: &DiscogsAuth<'_>, username: &str, query: &ListQuery) -> Result<Value> {
        let url = format!(
            "{}/users/{}/wants?{}",
            self.api_base,
            urlencoding::encode(username),
            query.to_query_string(false)
        );
        self.get(auth, &url).await
    }

    pub async fn user_profile(&self, auth: &DiscogsAuth<'_>, username: &str) -> Result<Value> {
        let url = format!("{}/users/{}", self.api_base, urlencoding::encode(username));
        self.get(auth, &url).await
    }

    /// Folder 0 ("All"), whose `count` is the collection size.
    pub async fn collection_folder(&self, auth: &DiscogsAuth<'_>, username: &str) -> Result<Value> {
        let url = format!(
            "{}/users/{}/collection/folders/0",
            self.api_base,
            urlencoding::encode(username)
        );
        self.get(auth, &url).await
    }

    /// First page of the wantlist; only `pagination.items` is read from it.
    pub async fn wants_summary(&self, auth: &DiscogsAuth<'_>, username: &str) -> Result<Value> {
        let url = format!("{}/users/{}/wants", self.api_base, urlencoding::encode(username));
        self.get(auth, &url).await
    }

    /// Database search; `params` are appended in order.
    pub async fn search(&self, auth: &DiscogsAuth<'_>, params: &[(&str, &str)]) -> Result<Value> {
        let query = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        let url = format!("{}/database/search?{}", self.api_base, query);
        self.get(auth, &url).await
    }

    pub async fn release(&self, auth: &DiscogsAuth<'_>, id: &str) -> Result<Value> {
        let url = format!("{}/releases/{}", self.api_base, urlencoding::encode(id));
        self.get(auth, &url).await
    }

    pub async fn artist(&self, auth: &DiscogsAuth<'_>, id: u64) -> Result<Value> {
        let url = format!("{}/artists/{}", self.api_base, id);
        self.get(auth, &url).await
    }

    /// Ten most recent releases of an artist.
    pub async fn artist_releases(&self, auth: &DiscogsAuth<'_>, id: u64) -> Result<Value> {
        let url = format!(
            "{}/artists/{}/releases?sort=year&sort_order=desc&per_page=10",
            self.api_base, id
        );
        self.get(auth, &url).await
    }

    /// Id of the best artist match for `name`, if any.
    pub async fn find_artist_id(&self, auth: &DiscogsAuth<'_>, name: &str) -> Result<Option<u64>> {
        let results = self
            .search(auth, &[("q", name), ("type", "artist"), ("per_page", "1")])
            .await?;
        Ok(results["results"]
            .as_array()
            .and_then(|r| r.first())
            .and_then(|hit| hit["id"].as_u64()))
    }

    /// Detail record for an artist-releases entry: its `resource_url` when
    /// that points at this API, else `/releases/{id}`.
    pub async fn release_detail(&self, auth: &DiscogsAuth<'_>, entry: &Value) -> Result<Value> {
        let url = match entry["resource_url"].as_str() {
            Some(url) if same_origin(url, &self.api_base) => url.to_string(),
            _ => {
                let id = entry["id"]
                    .as_u64()
                    .ok_or_else(|| anyhow!("Release entry has no id"))?;
                format!("{}/releases/{}", self.api_base, id)
            }
        };
        self.get(auth, &url).await
    }

    async fn get(&self, auth: &DiscogsAuth<'_>, url: &str) -> Result<Value> {
        let mut request = self
            .http
            .get(url)
            .header("User-Agent", &self.user_agent);

        request = match auth {
            DiscogsAuth::OAuth { signer, token } => {
                request.header("Authorization", signer.authorization_header("GET", url, Some(*token), &[])?)
            }
            DiscogsAuth::PersonalToken(token) => {
                request.header("Authorization", format!("Discogs token={}", token))
            }
            DiscogsAuth::Anonymous => request,
        };

        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to send Discogs request to {}", url))?;

        check_response_status(&response)?;
        response
            .json::<Value>()
            .await
            .context("Failed to parse Discogs response")
    }
}

/// Map non-2xx answers; 401/403 mean the stored session is no longer accepted.
fn check_response_status(response: &reqwest::Response) -> Result<()> {
    match response.status() {
        s @ (StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) => Err(anyhow!(
            "Discogs API: Unauthorized ({}). Please sign in again.",
            s.as_u16()
        )),
        s if !s.is_success() => Err(UpstreamStatus {
            service: "Discogs",
            status: s.as_u16(),
        }
        .into()),
        _ => Ok(()),
    }
}
