// Integration tests for the Discogs OAuth 1.0a handshake

mod common;

use axum::http::StatusCode;
use common::*;
use mockito::{Matcher, Server};

#[tokio::test]
async fn test_login_without_consumer_key_redirects_without_upstream_call() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/oauth/request_token")
        .expect(0)
        .create_async()
        .await;

    let mut config = test_config(&server.url());
    config.discogs.consumer_key = None;

    let response = get(app(config), "/api/discogs/auth/login", None).await;

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        location(&response),
        format!("{}/profile?error=oauth_not_configured", APP_URL)
    );
    assert!(set_cookies(&response).is_empty());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_login_upstream_failure_carries_message() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/oauth/request_token")
        .with_status(401)
        .with_body("Invalid consumer.")
        .create_async()
        .await;

    let response = get(app(test_config(&server.url())), "/api/discogs/auth/login", None).await;

    assert_eq!(
        location(&response),
        format!("{}/profile?error=Discogs%20API%20error%3A%20401", APP_URL)
    );
}

#[tokio::test]
async fn test_callback_without_temp_secret_is_session_expired() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/oauth/access_token")
        .expect(0)
        .create_async()
        .await;

    let response = get(
        app(test_config(&server.url())),
        "/api/discogs/auth/callback?oauth_token=req&oauth_verifier=wrong",
        None,
    )
    .await;

    assert_eq!(
        location(&response),
        format!("{}/profile?error=session_expired", APP_URL)
    );
    mock.assert_async().await;
}

#[tokio::test]
async fn test_callback_with_tampered_temp_secret_is_session_expired() {
    let server = Server::new_async().await;

    let response = get(
        app(test_config(&server.url())),
        "/api/discogs/auth/callback?oauth_token=req&oauth_verifier=v",
        Some("oauth_token_secret=forged-value".to_string()),
    )
    .await;

    assert_eq!(
        location(&response),
        format!("{}/profile?error=session_expired", APP_URL)
    );
}

#[tokio::test]
async fn test_callback_missing_params() {
    let server = Server::new_async().await;
    let cookies = signed_cookie_header(&[("oauth_token_secret", "req-secret")]);

    let response = get(
        app(test_config(&server.url())),
        "/api/discogs/auth/callback?oauth_token=req",
        Some(cookies),
    )
    .await;

    assert_eq!(
        location(&response),
        format!("{}/profile?error=missing_callback_params", APP_URL)
    );
}

#[tokio::test]
async fn test_full_handshake_establishes_session() {
    let mut server = Server::new_async().await;
    let request_token = server
        .mock("POST", "/oauth/request_token")
        .match_header(
            "authorization",
            Matcher::Regex("oauth_callback=\"http%3A%2F%2Fapp.test%2Fapi%2Fdiscogs%2Fauth%2Fcallback\"".into()),
        )
        .with_status(200)
        .with_body("oauth_token=req-token&oauth_token_secret=req-secret&oauth_callback_confirmed=true")
        .create_async()
        .await;
    let access_token = server
        .mock("POST", "/oauth/access_token")
        .match_header(
            "authorization",
            Matcher::AllOf(vec![
                Matcher::Regex("oauth_token=\"req-token\"".into()),
                Matcher::Regex("oauth_verifier=\"verifier-1\"".into()),
            ]),
        )
        .with_status(200)
        .with_body("oauth_token=acc-token&oauth_token_secret=acc-secret")
        .create_async()
        .await;
    let identity = server
        .mock("GET", "/oauth/identity")
        .match_header("authorization", Matcher::Regex("oauth_token=\"acc-token\"".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id":1,"username":"crate_digger","resource_url":"x","consumer_name":"DiscMaster"}"#)
        .create_async()
        .await;

    let config = test_config(&server.url());

    // Leg one: login parks the request-token secret and sends the user to Discogs
    let login = get(app(config.clone()), "/api/discogs/auth/login", None).await;
    assert_eq!(login.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        location(&login),
        format!("{}/web/oauth/authorize?oauth_token=req-token", server.url())
    );
    let temp = set_cookies(&login);
    let temp_cookie = find_cookie(&temp, "oauth_token_secret").unwrap();
    assert_eq!(temp_cookie.max_age(), Some(time::Duration::seconds(600)));
    assert_eq!(temp_cookie.http_only(), Some(true));
    assert_eq!(signed_value(&login, "oauth_token_secret").as_deref(), Some("req-secret"));

    // Leg three: callback exchanges the verifier with the parked secret
    let callback = get(
        app(config),
        "/api/discogs/auth/callback?oauth_token=req-token&oauth_verifier=verifier-1",
        Some(replay_cookies(&login)),
    )
    .await;

    assert_eq!(
        location(&callback),
        format!("{}/profile?oauth=success", APP_URL)
    );

    let cookies = set_cookies(&callback);
    let persistent: Vec<_> = cookies.iter().filter(|c| !is_removal(c)).collect();
    assert_eq!(persistent.len(), 3);
    for cookie in &persistent {
        assert_eq!(cookie.max_age(), Some(time::Duration::seconds(31_449_600)));
    }
    // Readable by client script: unsigned and without HttpOnly
    let username = find_cookie(&cookies, "discogs_username").unwrap();
    assert_ne!(username.http_only(), Some(true));
    assert_eq!(username.value(), "crate_digger");
    assert!(is_removal(find_cookie(&cookies, "oauth_token_secret").unwrap()));

    assert_eq!(signed_value(&callback, "discogs_access_token").as_deref(), Some("acc-token"));
    assert_eq!(
        signed_value(&callback, "discogs_access_token_secret").as_deref(),
        Some("acc-secret")
    );

    request_token.assert_async().await;
    access_token.assert_async().await;
    identity.assert_async().await;
}

#[tokio::test]
async fn test_identity_failure_falls_back_to_placeholder() {
    let mut server = Server::new_async().await;
    let _access = server
        .mock("POST", "/oauth/access_token")
        .with_status(200)
        .with_body("oauth_token=acc&oauth_token_secret=sec")
        .create_async()
        .await;
    let _identity = server
        .mock("GET", "/oauth/identity")
        .with_status(503)
        .create_async()
        .await;

    let cookies = signed_cookie_header(&[("oauth_token_secret", "req-secret")]);
    let response = get(
        app(test_config(&server.url())),
        "/api/discogs/auth/callback?oauth_token=req&oauth_verifier=v",
        Some(cookies),
    )
    .await;

    assert_eq!(location(&response), format!("{}/profile?oauth=success", APP_URL));
    assert_eq!(
        find_cookie(&set_cookies(&response), "discogs_username").unwrap().value(),
        "DiscogsUser"
    );
}

#[tokio::test]
async fn test_access_token_missing_fields_is_invalid_response() {
    let mut server = Server::new_async().await;
    let _access = server
        .mock("POST", "/oauth/access_token")
        .with_status(200)
        .with_body("oauth_token=acc")
        .create_async()
        .await;

    let cookies = signed_cookie_header(&[("oauth_token_secret", "req-secret")]);
    let response = get(
        app(test_config(&server.url())),
        "/api/discogs/auth/callback?oauth_token=req&oauth_verifier=v",
        Some(cookies),
    )
    .await;

    assert_eq!(
        location(&response),
        format!("{}/profile?error=Failed%20to%20parse%20access%20tokens", APP_URL)
    );
    assert!(signed_value(&response, "discogs_access_token").is_none());
}

#[tokio::test]
async fn test_logout_is_idempotent() {
    let server = Server::new_async().await;

    for cookies in [
        None,
        Some(signed_cookie_header(&[
            ("discogs_access_token", "acc"),
            ("discogs_access_token_secret", "sec"),
            ("discogs_username", "crate_digger"),
        ])),
    ] {
        let response = get(app(test_config(&server.url())), "/api/discogs/auth/logout", cookies).await;

        assert_eq!(location(&response), format!("{}/profile", APP_URL));
        let set = set_cookies(&response);
        for name in [
            "discogs_access_token",
            "discogs_access_token_secret",
            "discogs_username",
            "oauth_token_secret",
        ] {
            let cookie = find_cookie(&set, name).unwrap();
            assert!(is_removal(cookie), "{} not cleared", name);
            assert_eq!(cookie.path(), Some("/"));
        }
    }
}

#[tokio::test]
async fn test_debug_reports_presence_only() {
    let server = Server::new_async().await;
    let cookies = signed_cookie_header(&[("discogs_access_token", "acc")]);

    let response = get(app(test_config(&server.url())), "/api/discogs/auth/debug", Some(cookies)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["consumerKeyPresent"], true);
    assert_eq!(json["userTokenPresent"], false);
    assert_eq!(json["callbackUrl"], "http://app.test/api/discogs/auth/callback");
    assert_eq!(json["cookies"]["session"], false);
    assert!(!json.to_string().contains("consumer-secret"));
}
