// ======================================
// tests/integration/store_failure_tests.rs
// ======================================
//! A token store that stops answering must surface as 503, never as a
//! login denial
use async_trait::async_trait;
use axum::http::StatusCode;
use backend_lib::{
    error::AppError,
    storage::{InMemoryTokenRepository, RotateOutcome, TokenRepository},
};
use chrono::{DateTime, Utc};
use formguard_common::PersistentLogin;
use std::sync::Arc;

use crate::test_utils::{body_string, location, set_cookies, test_settings, TestApp};

/// Repository whose every call hangs
struct StalledRepository;

#[async_trait]
impl TokenRepository for StalledRepository {
    async fn create_new_token(&self, _: PersistentLogin) -> Result<(), AppError> {
        std::future::pending().await
    }
    async fn get_token_for_series(&self, _: &str) -> Result<Option<PersistentLogin>, AppError> {
        std::future::pending().await
    }
    async fn rotate_token(
        &self,
        _: &str,
        _: &str,
        _: &str,
        _: DateTime<Utc>,
        _: chrono::Duration,
    ) -> Result<RotateOutcome, AppError> {
        std::future::pending().await
    }
    async fn remove_series(&self, _: &str) -> Result<bool, AppError> {
        std::future::pending().await
    }
    async fn remove_user_tokens(&self, _: &str) -> Result<usize, AppError> {
        std::future::pending().await
    }
    async fn remove_expired(&self, _: DateTime<Utc>) -> Result<usize, AppError> {
        std::future::pending().await
    }
}

fn stalled_app() -> TestApp {
    let mut settings = test_settings();
    settings.remember_me.store_timeout_ms = 50;
    TestApp::with_repository(
        settings,
        Arc::new(StalledRepository),
        InMemoryTokenRepository::new(),
    )
}

#[tokio::test]
async fn test_remember_me_with_stalled_store_is_503() {
    let app = stalled_app();
    let cookie = backend_lib::auth::cookie::encode_remember_me("series", "value");

    let response = app.get("/user", &[("remember-me", cookie.as_str())]).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    // The cookie is kept: nothing proved it bad
    assert!(set_cookies(&response).is_empty());

    let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["error"]["code"], "STORE_001");
}

#[tokio::test]
async fn test_login_survives_stalled_store_without_remember_me() {
    let app = stalled_app();
    let cookies = app.login(true).await;

    assert!(cookies.contains_key("SESSIONID"));
    assert!(!cookies.contains_key("remember-me"));

    let session = cookies["SESSIONID"].value.clone();
    let response = app.get("/user", &[("SESSIONID", session.as_str())]).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_session_requests_never_touch_the_store() {
    let app = stalled_app();
    let session = app.login(false).await["SESSIONID"].value.clone();

    // Live session short-circuits before the cookie is looked at
    let cookie = backend_lib::auth::cookie::encode_remember_me("series", "value");
    let response = app
        .get(
            "/user",
            &[("SESSIONID", session.as_str()), ("remember-me", cookie.as_str())],
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_logout_with_stalled_store_still_clears_cookies() {
    let app = stalled_app();
    let session = app.login(false).await["SESSIONID"].value.clone();
    let cookie = backend_lib::auth::cookie::encode_remember_me("series", "value");

    let response = app
        .post_form(
            "/logout",
            "",
            &[("SESSIONID", session.as_str()), ("remember-me", cookie.as_str())],
        )
        .await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(location(&response), None);

    let cleared = set_cookies(&response);
    assert!(cleared["SESSIONID"].is_removal());
    assert!(cleared["remember-me"].is_removal());
    // Session side of the logout happened regardless
    assert!(app.state.sessions.is_empty().await);
}
