// ============================
// crates/backend-lib/src/handlers/mod.rs
// ============================
//! HTTP handlers for the login, logout and sample pages.

pub mod login;
pub mod logout;
pub mod pages;

pub use login::{login_page, login_submit};
pub use logout::logout;
pub use pages::{health, home_page, not_found, user_page};

/// Escape text for inclusion in HTML
pub(crate) fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
