// Shared helpers for router-level integration tests

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue, Request, Response},
    response::IntoResponse,
    Router,
};
use axum_extra::extract::cookie::{Cookie, Key, SignedCookieJar};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use discmaster::api::{create_router, AppState};
use discmaster::config::DiscmasterConfig;
use tower::ServiceExt;

pub const APP_URL: &str = "http://app.test";
const COOKIE_KEY: [u8; 64] = [42u8; 64];

pub fn key() -> Key {
    Key::from(&COOKIE_KEY[..])
}

/// Fully configured app pointing every upstream at `upstream_url`.
pub fn test_config(upstream_url: &str) -> DiscmasterConfig {
    let mut config = DiscmasterConfig::default();
    config.server.app_url = Some(APP_URL.to_string());
    config.server.cookie_key = Some(BASE64.encode(COOKIE_KEY));

    config.discogs.consumer_key = Some("consumer-key".to_string());
    config.discogs.consumer_secret = Some("consumer-secret".to_string());
    config.discogs.api_base = upstream_url.to_string();
    config.discogs.web_base = format!("{}/web", upstream_url);

    config.spotify.client_id = Some("spotify-id".to_string());
    config.spotify.client_secret = Some("spotify-secret".to_string());
    config.spotify.accounts_base = upstream_url.to_string();
    config.spotify.api_base = upstream_url.to_string();
    config
}

pub fn app(config: DiscmasterConfig) -> Router {
    create_router(AppState::new(config).unwrap())
}

/// `Cookie` header carrying `pairs` signed with the test key.
pub fn signed_cookie_header(pairs: &[(&str, &str)]) -> String {
    let mut jar = SignedCookieJar::new(key());
    for (name, value) in pairs {
        jar = jar.add(Cookie::new(name.to_string(), value.to_string()));
    }
    let response = jar.into_response();
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().split(';').next().unwrap().to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

pub async fn get(app: Router, uri: &str, cookies: Option<String>) -> Response<Body> {
    let mut request = Request::builder().uri(uri);
    if let Some(cookies) = cookies {
        request = request.header(header::COOKIE, cookies);
    }
    app.oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: &str, cookies: Option<String>) -> Response<Body> {
    let mut request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookies) = cookies {
        request = request.header(header::COOKIE, cookies);
    }
    app.oneshot(request.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap()
}

pub async fn json_body(response: Response<Body>) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

pub fn location(response: &Response<Body>) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string()
}

/// Every `Set-Cookie` on the response, parsed.
pub fn set_cookies(response: &Response<Body>) -> Vec<Cookie<'static>> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| Cookie::parse(v.to_str().unwrap().to_string()).unwrap())
        .collect()
}

pub fn find_cookie<'a>(cookies: &'a [Cookie<'static>], name: &str) -> Option<&'a Cookie<'static>> {
    cookies.iter().find(|c| c.name() == name)
}

pub fn is_removal(cookie: &Cookie<'_>) -> bool {
    cookie.value().is_empty() && cookie.max_age() == Some(time::Duration::ZERO)
}

/// Verified value of a signed cookie set by the response.
pub fn signed_value(response: &Response<Body>, name: &str) -> Option<String> {
    let pairs = set_cookies(response)
        .iter()
        .map(|c| format!("{}={}", c.name(), c.value()))
        .collect::<Vec<_>>()
        .join("; ");
    let mut headers = HeaderMap::new();
    headers.insert(header::COOKIE, HeaderValue::from_str(&pairs).unwrap());
    SignedCookieJar::from_headers(&headers, key())
        .get(name)
        .map(|c| c.value().to_string())
}

/// Replay every cookie the response set as the next request's `Cookie` header.
pub fn replay_cookies(response: &Response<Body>) -> String {
    set_cookies(response)
        .iter()
        .filter(|c| !c.value().is_empty())
        .map(|c| format!("{}={}", c.name(), c.value()))
        .collect::<Vec<_>>()
        .join("; ")
}
