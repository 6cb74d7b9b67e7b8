// ============================
// crates/backend-lib/src/handlers/pages.rs
// ============================
//! Sample pages behind the login.
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::Html,
};

use super::escape_html;
use crate::middleware::CurrentSession;
use crate::AppState;

fn render_page(state: &AppState, title: &str, request: &Request<Body>) -> Html<String> {
    let current = request.extensions().get::<CurrentSession>();
    let username = current.map_or("anonymous", |CurrentSession(session)| session.username.as_str());

    let csrf_field = match current {
        Some(CurrentSession(session)) if state.settings.security.csrf_enabled => format!(
            r#"<input type="hidden" name="_csrf" value="{}">"#,
            escape_html(&session.csrf_token)
        ),
        _ => String::new(),
    };

    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head><title>{title}</title></head>
<body>
<h1>{title}</h1>
<p>Signed in as <strong>{username}</strong></p>
<form method="post" action="{logout}">
  {csrf_field}
  <button type="submit">Sign out</button>
</form>
</body>
</html>
"#,
        title = escape_html(title),
        username = escape_html(username),
        logout = escape_html(&state.settings.security.logout_url),
    ))
}

/// `GET /`
pub async fn home_page(State(state): State<Arc<AppState>>, request: Request<Body>) -> Html<String> {
    render_page(&state, "Home", &request)
}

/// `GET /user`
pub async fn user_page(State(state): State<Arc<AppState>>, request: Request<Body>) -> Html<String> {
    render_page(&state, "User", &request)
}

/// `GET /health`
pub async fn health() -> &'static str {
    "ok"
}

pub async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "Not Found")
}
