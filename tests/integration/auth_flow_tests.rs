// ==================================
// tests/integration/auth_flow_tests.rs
// ==================================
//! Form login, path policy, session and logout flows through the router
use axum::http::StatusCode;
use backend_lib::auth::{PasswordEncoder, ScryptEncoder};

use crate::test_utils::{
    body_string, location, set_cookies, test_settings, TestApp, PASSWORD, USERNAME,
};

#[tokio::test]
async fn test_public_paths_need_no_credentials() {
    let app = TestApp::new();

    let response = app.get("/login", &[]).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_string(response).await.contains("Sign in"));

    // Allowed through to the fallback instead of being redirected
    let response = app.get("/static/css/app.css", &[]).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Bogus cookies on a public path are never inspected
    let response = app
        .get("/favicon.ico", &[("SESSIONID", "nope"), ("remember-me", "nope")])
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(set_cookies(&response).is_empty());
}

#[tokio::test]
async fn test_protected_paths_redirect_to_login() {
    let app = TestApp::new();

    for path in ["/", "/user", "/health", "/admin/anything", "/login/extra"] {
        let response = app.get(path, &[]).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{path}");
        assert_eq!(location(&response), Some("/login"), "{path}");
    }
}

#[tokio::test]
async fn test_login_success_establishes_session() {
    let app = TestApp::new();
    let cookies = app.login(false).await;

    let session = cookies.get("SESSIONID").expect("session cookie");
    assert!(session.attributes.contains("HttpOnly"));
    assert!(!session.attributes.contains("Max-Age"));
    assert!(!cookies.contains_key("remember-me"));
    assert!(app.repo.is_empty());

    let response = app.get("/user", &[("SESSIONID", session.value.as_str())]).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_string(response).await.contains(USERNAME));

    let response = app.get("/health", &[("SESSIONID", session.value.as_str())]).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_login_failure_redirects_with_error_flag() {
    let app = TestApp::new();

    let response = app
        .post_form("/login", &format!("username={USERNAME}&password=wrong"), &[])
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/login?error=true"));
    assert!(set_cookies(&response).is_empty());
    assert!(app.state.sessions.is_empty().await);

    let response = app.get("/login?error=true", &[]).await;
    assert!(body_string(response)
        .await
        .contains("Invalid username or password"));
}

#[tokio::test]
async fn test_malformed_login_input_is_a_plain_failure() {
    let app = TestApp::new();
    let response = app
        .post_form("/login", "username=%3Cscript%3E&password=x", &[])
        .await;
    assert_eq!(location(&response), Some("/login?error=true"));
}

#[tokio::test]
async fn test_unknown_user_hidden_by_default() {
    let app = TestApp::new();
    let response = app
        .post_form("/login", "username=mallory&password=whatever", &[])
        .await;
    assert_eq!(location(&response), Some("/login?error=true"));
}

#[tokio::test]
async fn test_unknown_user_disclosed_when_configured() {
    let mut settings = test_settings();
    settings.security.reveal_user_not_found = true;
    let app = TestApp::with_settings(settings);

    let response = app
        .post_form("/login", "username=mallory&password=whatever", &[])
        .await;
    assert_eq!(location(&response), Some("/login?error=user_not_found"));

    let response = app.get("/login?error=user_not_found", &[]).await;
    assert!(body_string(response).await.contains("User not found"));

    // A wrong password for a real account stays generic
    let response = app
        .post_form("/login", &format!("username={USERNAME}&password=wrong"), &[])
        .await;
    assert_eq!(location(&response), Some("/login?error=true"));
}

#[tokio::test]
async fn test_login_replaces_existing_session_id() {
    let app = TestApp::new();
    let first = app.login(false).await["SESSIONID"].value.clone();

    let response = app
        .post_form(
            "/login",
            &format!("username={USERNAME}&password={PASSWORD}"),
            &[("SESSIONID", first.as_str())],
        )
        .await;
    let second = set_cookies(&response)["SESSIONID"].value.clone();
    assert_ne!(first, second);

    // The old id is dead and is treated as an expired session
    let response = app.get("/user", &[("SESSIONID", first.as_str())]).await;
    assert_eq!(location(&response), Some("/login"));
    assert!(set_cookies(&response)["SESSIONID"].is_removal());

    let response = app.get("/user", &[("SESSIONID", second.as_str())]).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_dead_session_goes_to_invalid_session_url() {
    let mut settings = test_settings();
    settings.security.invalid_session_url = "/login?expired".to_string();
    let app = TestApp::with_settings(settings);

    let response = app.get("/user", &[("SESSIONID", "long-gone")]).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/login?expired"));

    // No session cookie at all is a plain challenge
    let response = app.get("/user", &[]).await;
    assert_eq!(location(&response), Some("/login"));
}

#[tokio::test]
async fn test_logout_clears_session_and_token() {
    let app = TestApp::new();
    let cookies = app.login(true).await;
    let session = cookies["SESSIONID"].value.clone();
    let remember = cookies["remember-me"].value.clone();
    assert_eq!(app.repo.len(), 1);

    let jar = [("SESSIONID", session.as_str()), ("remember-me", remember.as_str())];
    let response = app.post_form("/logout", "", &jar).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/login?logout"));

    let cleared = set_cookies(&response);
    assert!(cleared["SESSIONID"].is_removal());
    assert!(cleared["remember-me"].is_removal());
    assert!(app.repo.is_empty());
    assert!(app.state.sessions.is_empty().await);

    // Neither credential works any more
    let response = app.get("/user", &jar).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let response = app.get("/login?logout", &[]).await;
    assert!(body_string(response).await.contains("signed out"));
}

#[tokio::test]
async fn test_logout_via_get_without_credentials() {
    let app = TestApp::new();
    let response = app.get("/logout", &[]).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/login?logout"));
}

#[tokio::test]
async fn test_csrf_guards_logout_when_enabled() {
    let mut settings = test_settings();
    settings.security.csrf_enabled = true;
    let app = TestApp::with_settings(settings);

    let session_id = app.login(false).await["SESSIONID"].value.clone();
    let jar = [("SESSIONID", session_id.as_str())];
    let csrf = app
        .state
        .sessions
        .get(&session_id)
        .await
        .expect("live session")
        .csrf_token;

    // The page carries the token for the logout form
    let response = app.get("/user", &jar).await;
    assert!(body_string(response).await.contains(&csrf));

    let response = app.post_form("/logout", "", &jar).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(app.state.sessions.get(&session_id).await.is_some());

    let response = app.post_form("/logout", "_csrf=forged", &jar).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .post_form("/logout", &format!("_csrf={csrf}"), &jar)
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(app.state.sessions.get(&session_id).await.is_none());
}

#[tokio::test]
async fn test_csrf_header_accepted() {
    let mut settings = test_settings();
    settings.security.csrf_enabled = true;
    let app = TestApp::with_settings(settings);

    let session_id = app.login(false).await["SESSIONID"].value.clone();
    let csrf = app.state.sessions.get(&session_id).await.unwrap().csrf_token;

    let mut request = crate::test_utils::request(
        "POST",
        "/logout",
        &[("SESSIONID", session_id.as_str())],
        axum::body::Body::empty(),
    );
    request
        .headers_mut()
        .insert("x-csrf-token", csrf.parse().unwrap());
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_legacy_scrypt_hash_still_logs_in() {
    let app = TestApp::new();
    let scrypt_hash = ScryptEncoder::with_params(4, 8, 1)
        .unwrap()
        .encode("correct horse")
        .unwrap();
    app.users.insert("bob", &scrypt_hash);

    let response = app
        .post_form("/login", "username=bob&password=correct+horse", &[])
        .await;
    assert_eq!(location(&response), Some("/user"));
}
