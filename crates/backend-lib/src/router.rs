// ============================
// formguard-backend-lib/src/router.rs
// ============================
//! HTTP router.
use std::sync::Arc;

use axum::{middleware::from_fn_with_state, routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::handlers::{health, home_page, login_page, login_submit, logout, not_found, user_page};
use crate::middleware::require_auth;
use crate::AppState;

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let security = &state.settings.security;

    // Every route here, and anything unmatched, goes through the decision middleware
    let guarded = Router::new()
        .route("/", get(home_page))
        .route("/user", get(user_page))
        .route("/health", get(health))
        .fallback(not_found)
        .layer(from_fn_with_state(state.clone(), require_auth));

    // The login and logout endpoints answer whatever the public patterns say
    Router::new()
        .route(&security.login_url, get(login_page).post(login_submit))
        .route(&security.logout_url, get(logout).post(logout))
        .merge(guarded)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
