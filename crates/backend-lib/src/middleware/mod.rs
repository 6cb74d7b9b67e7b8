// crates/backend-lib/src/middleware/mod.rs

//! Middleware for the `formguard` server.

pub mod auth_guard;

pub use auth_guard::{credentials_from, require_auth, CurrentSession};
