//! Request guard: asks the decision engine about every request and turns
//! its answer into a pass-through, a pass-through with fresh cookies, or
//! a redirect to the login entry point.
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::auth::cookie::{expire_cookie, get_cookie, set_cookie};
use crate::auth::{ChallengeReason, Credentials, Decision, Session};
use crate::{error::AppError, AppState};

/// Session of the authenticated caller, inserted as a request extension
#[derive(Debug, Clone)]
pub struct CurrentSession(pub Session);

/// Read the session and remember-me cookies from a request
pub fn credentials_from(state: &AppState, headers: &HeaderMap) -> Credentials {
    Credentials {
        session_id: get_cookie(headers, &state.settings.security.session_cookie_name),
        remember_me: get_cookie(headers, &state.settings.remember_me.cookie_name),
    }
}

/// Decision middleware
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let path = request.uri().path().to_string();
    let credentials = credentials_from(&state, request.headers());
    let options = state.cookie_options();

    match state.auth.decide(&path, &credentials).await? {
        Decision::Allow => Ok(next.run(request).await),
        Decision::Authenticated {
            session,
            established,
        } => {
            let mut cookies = Vec::new();
            if let Some(established) = established {
                cookies.push(set_cookie(
                    &state.settings.security.session_cookie_name,
                    &session.id,
                    None,
                    options,
                )?);
                cookies.push(set_cookie(
                    &state.settings.remember_me.cookie_name,
                    &established.remember_me.cookie_value(),
                    Some(state.tokens.max_age().num_seconds()),
                    options,
                )?);
            }

            request.extensions_mut().insert(CurrentSession(session));
            let mut response = next.run(request).await;
            for cookie in cookies {
                response.headers_mut().append(header::SET_COOKIE, cookie);
            }
            Ok(response)
        },
        Decision::Challenge {
            reason,
            clear_remember_me,
        } => {
            let security = &state.settings.security;
            let target = match reason {
                ChallengeReason::SessionExpired => security.invalid_session_url.as_str(),
                ChallengeReason::Unauthenticated => security.login_url.as_str(),
            };

            let mut response = Redirect::to(target).into_response();
            if reason == ChallengeReason::SessionExpired {
                response.headers_mut().append(
                    header::SET_COOKIE,
                    expire_cookie(&security.session_cookie_name, options)?,
                );
            }
            if clear_remember_me {
                response.headers_mut().append(
                    header::SET_COOKIE,
                    expire_cookie(&state.settings.remember_me.cookie_name, options)?,
                );
            }
            Ok(response)
        },
    }
}
