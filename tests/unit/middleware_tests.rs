// ==============================
// tests/unit/middleware_tests.rs
// ==============================
//! Unit tests for the decision middleware on a bare router
use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue, Request, StatusCode},
    middleware::from_fn_with_state,
    routing::get,
    Router,
};
use backend_lib::middleware::{credentials_from, require_auth, CurrentSession};
use tower::ServiceExt;

use crate::test_utils::{body_string, location, TestApp};

async fn whoami(request: Request<Body>) -> String {
    request
        .extensions()
        .get::<CurrentSession>()
        .map_or_else(|| "nobody".to_string(), |CurrentSession(s)| s.username.clone())
}

fn guarded(app: &TestApp) -> Router {
    Router::new()
        .route("/whoami", get(whoami))
        .route("/public/whoami", get(whoami))
        .layer(from_fn_with_state(app.state.clone(), require_auth))
        .with_state(app.state.clone())
}

#[tokio::test]
async fn test_authenticated_request_carries_session() {
    let app = TestApp::new();
    let session = app.login(false).await["SESSIONID"].value.clone();

    let request = crate::test_utils::request(
        "GET",
        "/whoami",
        &[("SESSIONID", session.as_str())],
        Body::empty(),
    );
    let response = guarded(&app).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "alice");
}

#[tokio::test]
async fn test_public_request_has_no_session() {
    let app = TestApp::new();
    let session = app.login(false).await["SESSIONID"].value.clone();

    // Even a valid session is not attached on an allow-listed path
    let request = crate::test_utils::request(
        "GET",
        "/public/whoami",
        &[("SESSIONID", session.as_str())],
        Body::empty(),
    );
    let response = guarded(&app).oneshot(request).await.unwrap();
    assert_eq!(body_string(response).await, "nobody");
}

#[tokio::test]
async fn test_unauthenticated_request_redirected() {
    let app = TestApp::new();
    let request = crate::test_utils::request("GET", "/whoami", &[], Body::empty());
    let response = guarded(&app).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/login"));
}

#[test]
fn test_credentials_from_cookie_header() {
    let app = TestApp::new();
    let mut headers = HeaderMap::new();
    headers.insert(
        header::COOKIE,
        HeaderValue::from_static("theme=dark; SESSIONID=abc; remember-me=c2VyaWVzOnRva2Vu"),
    );

    let credentials = credentials_from(&app.state, &headers);
    assert_eq!(credentials.session_id.as_deref(), Some("abc"));
    assert_eq!(credentials.remember_me.as_deref(), Some("c2VyaWVzOnRva2Vu"));

    let credentials = credentials_from(&app.state, &HeaderMap::new());
    assert!(credentials.session_id.is_none());
    assert!(credentials.remember_me.is_none());
}
