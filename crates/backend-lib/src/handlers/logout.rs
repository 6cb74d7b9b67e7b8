// ============================
// crates/backend-lib/src/handlers/logout.rs
// ============================
//! Logout endpoint. Mounted outside the decision middleware so an expired
//! session can still log out.
use std::sync::Arc;

use axum::{
    extract::{rejection::FormRejection, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;

use crate::auth::cookie::expire_cookie;
use crate::middleware::credentials_from;
use crate::{error::AppError, AppState};

/// Header carrying the CSRF token on scripted requests
pub const CSRF_HEADER: &str = "x-csrf-token";

/// Optional form body (or query string) of a logout request
#[derive(Debug, Default, Deserialize)]
pub struct LogoutForm {
    #[serde(rename = "_csrf", default)]
    pub csrf: Option<String>,
}

/// `GET|POST /logout`
pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    form: Result<Form<LogoutForm>, FormRejection>,
) -> Result<Response, AppError> {
    let credentials = credentials_from(&state, &headers);

    let presented = headers
        .get(CSRF_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .or_else(|| form.ok().and_then(|Form(form)| form.csrf));
    let session = match credentials.session_id.as_deref() {
        Some(id) => state.auth.session(id).await,
        None => None,
    };
    state.auth.check_csrf(session.as_ref(), presented.as_deref())?;

    let mut response = match state.auth.logout(&credentials).await {
        Ok(()) => Redirect::to(&state.settings.security.logout_success_url).into_response(),
        Err(err) => {
            tracing::error!(error = %err, "logout could not revoke remember-me token");
            err.into_response()
        },
    };

    // Cookies go regardless of whether the store answered
    let options = state.cookie_options();
    for name in [
        &state.settings.security.session_cookie_name,
        &state.settings.remember_me.cookie_name,
    ] {
        response
            .headers_mut()
            .append(header::SET_COOKIE, expire_cookie(name, options)?);
    }
    Ok(response)
}
