// ============================
// crates/backend-lib/src/handlers/login.rs
// ============================
//! Login entry point: the form and its submission.
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap},
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use formguard_common::{LoginFailure, LoginForm, LoginQuery};

use super::escape_html;
use crate::auth::cookie::{get_cookie, set_cookie};
use crate::{error::AppError, AppState};

/// `GET /login`
pub async fn login_page(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LoginQuery>,
) -> Html<String> {
    let mut notice = String::new();
    if let Some(failure) = query.failure() {
        notice.push_str(&format!(
            r#"<p class="error">{}</p>"#,
            escape_html(failure.message())
        ));
    }
    if query.logout.is_some() {
        notice.push_str(r#"<p class="notice">You have been signed out.</p>"#);
    }

    let action = escape_html(&state.settings.security.login_url);
    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head><title>Sign in</title></head>
<body>
<h1>Sign in</h1>
{notice}
<form method="post" action="{action}">
  <label>Username <input type="text" name="username" autofocus></label>
  <label>Password <input type="password" name="password"></label>
  <label><input type="checkbox" name="remember-me"> Remember me</label>
  <button type="submit">Sign in</button>
</form>
</body>
</html>
"#
    ))
}

/// `POST /login`
pub async fn login_submit(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let security = &state.settings.security;
    let previous = get_cookie(&headers, &security.session_cookie_name);

    let success = match state.auth.login(form, previous.as_deref()).await {
        Ok(success) => success,
        Err(AppError::UserNotFound) => {
            let target = format!(
                "{}?error={}",
                security.login_url,
                LoginFailure::UserNotFound.as_flag()
            );
            return Ok(Redirect::to(&target).into_response());
        },
        Err(AppError::InvalidCredentials | AppError::InvalidInput(_)) => {
            return Ok(Redirect::to(&security.failure_url).into_response());
        },
        Err(err) => return Err(err),
    };

    let options = state.cookie_options();
    let mut response = Redirect::to(&security.default_success_url).into_response();
    response.headers_mut().append(
        header::SET_COOKIE,
        set_cookie(&security.session_cookie_name, &success.session.id, None, options)?,
    );
    if let Some(token) = success.remember_me {
        response.headers_mut().append(
            header::SET_COOKIE,
            set_cookie(
                &state.settings.remember_me.cookie_name,
                &token.cookie_value(),
                Some(state.tokens.max_age().num_seconds()),
                options,
            )?,
        );
    }
    Ok(response)
}
