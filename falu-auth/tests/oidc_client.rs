use chrono::{Duration, Utc};
use falu_auth::{
    authenticate, login, AuthError, CredentialStore, LoginOptions, LoginPrompt, OidcClient,
    Settings, StoredCredentials,
};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn settings(server: &MockServer) -> Settings {
    Settings {
        authority: server.uri(),
        browser_delay_secs: 0,
        ..Settings::default()
    }
}

#[tokio::test]
async fn test_login_persists_tokens() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/device/authorize"))
        .and(body_string_contains("client_id=cli"))
        .and(body_string_contains("scope=openid"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "device_code": "dc_1",
            "user_code": "ABCD-EFGH",
            "verification_uri": "https://login.falu.io/device",
            "expires_in": 600,
            "interval": 1
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("device_code=dc_1"))
        .and(body_string_contains(
            "grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Adevice_code",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "at_1",
            "refresh_token": "rt_1",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let store = CredentialStore::at(dir.path().join("credentials.json"));
    let settings = settings(&server);
    let mut shown = Vec::new();

    let credentials = login(
        OidcClient::new(&settings).unwrap(),
        &store,
        settings.browser_delay(),
        &LoginOptions { no_browser: true },
        &CancellationToken::new(),
        |prompt| match prompt {
            LoginPrompt::Authorization(authorization) => shown.push(authorization.user_code.clone()),
            LoginPrompt::Waiting => shown.push("waiting".to_string()),
            other => panic!("unexpected prompt: {:?}", other),
        },
    )
    .await
    .unwrap();

    assert_eq!(shown, vec!["ABCD-EFGH", "waiting"]);
    assert_eq!(credentials.access_token, "at_1");
    let saved = store.load().unwrap().credentials.unwrap();
    assert_eq!(saved.refresh_token.as_deref(), Some("rt_1"));
}

#[tokio::test]
async fn test_login_authorization_error_is_fatal() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/device/authorize"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_client",
            "error_description": "Unknown client"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let store = CredentialStore::at(dir.path().join("credentials.json"));
    let settings = settings(&server);

    let err = login(
        OidcClient::new(&settings).unwrap(),
        &store,
        settings.browser_delay(),
        &LoginOptions { no_browser: true },
        &CancellationToken::new(),
        |_| {},
    )
    .await
    .unwrap_err();

    assert_eq!(err.to_string(), "OIDC error: invalid_client: Unknown client");
    assert!(store.load().unwrap().credentials.is_none());
}

#[tokio::test]
async fn test_authenticate_refreshes_expired_token() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=rt_old"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "at_new",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let store = CredentialStore::at(dir.path().join("credentials.json"));
    store
        .save_credentials(&StoredCredentials {
            access_token: "at_old".into(),
            refresh_token: Some("rt_old".into()),
            expires_at: Utc::now() - Duration::minutes(1),
        })
        .unwrap();

    let credentials = authenticate(
        OidcClient::new(&settings(&server)).unwrap(),
        &store,
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(credentials.access_token, "at_new");
    // Refresh token is kept when the provider does not rotate it
    assert_eq!(credentials.refresh_token.as_deref(), Some("rt_old"));
    let saved = store.load().unwrap().credentials.unwrap();
    assert_eq!(saved.access_token, "at_new");
    assert_eq!(saved.expires_at.timestamp(), credentials.expires_at.timestamp());
}

#[tokio::test]
async fn test_authenticate_clears_credentials_when_refresh_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant"
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let store = CredentialStore::at(dir.path().join("credentials.json"));
    store
        .save_credentials(&StoredCredentials {
            access_token: "at_old".into(),
            refresh_token: Some("rt_old".into()),
            expires_at: Utc::now() - Duration::minutes(1),
        })
        .unwrap();

    let err = authenticate(
        OidcClient::new(&settings(&server)).unwrap(),
        &store,
        &CancellationToken::new(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, AuthError::NotLoggedIn));
    assert!(store.load().unwrap().credentials.is_none());
}

#[tokio::test]
async fn test_authenticate_without_credentials() {
    let dir = tempfile::tempdir().unwrap();
    let store = CredentialStore::at(dir.path().join("credentials.json"));

    let err = authenticate(
        OidcClient::new(&Settings::default()).unwrap(),
        &store,
        &CancellationToken::new(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, AuthError::NotLoggedIn));
}

fn cancel_after(delay: std::time::Duration) -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        trigger.cancel();
    });
    cancel
}

#[tokio::test]
async fn test_login_cancelled_while_requesting_authorization() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/device/authorize"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({
                    "device_code": "dc_1",
                    "user_code": "ABCD-EFGH",
                    "verification_uri": "https://login.falu.io/device",
                    "expires_in": 600
                }))
                .set_delay(std::time::Duration::from_secs(30)),
        )
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let store = CredentialStore::at(dir.path().join("credentials.json"));
    let settings = settings(&server);
    let mut prompts = 0;

    let started = std::time::Instant::now();
    let err = login(
        OidcClient::new(&settings).unwrap(),
        &store,
        settings.browser_delay(),
        &LoginOptions { no_browser: true },
        &cancel_after(std::time::Duration::from_millis(100)),
        |_| prompts += 1,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, AuthError::Cancelled));
    assert!(started.elapsed() < std::time::Duration::from_secs(10));
    assert_eq!(prompts, 0);
    assert!(store.load().unwrap().credentials.is_none());
}

#[tokio::test]
async fn test_login_with_cancelled_token_sends_nothing() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let store = CredentialStore::at(dir.path().join("credentials.json"));
    let settings = settings(&server);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = login(
        OidcClient::new(&settings).unwrap(),
        &store,
        settings.browser_delay(),
        &LoginOptions { no_browser: true },
        &cancel,
        |_| {},
    )
    .await
    .unwrap_err();

    assert!(matches!(err, AuthError::Cancelled));
}

#[tokio::test]
async fn test_authenticate_cancelled_during_refresh_keeps_credentials() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({
                    "access_token": "at_new",
                    "expires_in": 3600
                }))
                .set_delay(std::time::Duration::from_secs(30)),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let store = CredentialStore::at(dir.path().join("credentials.json"));
    store
        .save_credentials(&StoredCredentials {
            access_token: "at_old".into(),
            refresh_token: Some("rt_old".into()),
            expires_at: Utc::now() - Duration::minutes(1),
        })
        .unwrap();

    let started = std::time::Instant::now();
    let err = authenticate(
        OidcClient::new(&settings(&server)).unwrap(),
        &store,
        &cancel_after(std::time::Duration::from_millis(100)),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, AuthError::Cancelled));
    assert!(started.elapsed() < std::time::Duration::from_secs(10));
    let saved = store.load().unwrap().credentials.unwrap();
    assert_eq!(saved.access_token, "at_old");
}
