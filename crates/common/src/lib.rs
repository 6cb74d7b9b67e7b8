// ================
// common/src/lib.rs
// ================
//! Common types shared between the formguard HTTP surface and its
//! storage layer: the login form, the login page query, and the
//! persisted remember-me row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Form posted to `POST /login`
#[derive(Deserialize, Debug, Clone)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    /// The "remember me" checkbox. Browsers omit unchecked boxes entirely.
    #[serde(rename = "remember-me", default, deserialize_with = "checkbox")]
    pub remember_me: bool,
}

/// Query string accepted by `GET /login`
#[derive(Deserialize, Debug, Clone, Default)]
pub struct LoginQuery {
    /// Failure flag set by the login redirect
    #[serde(default)]
    pub error: Option<String>,
    /// Present after a successful logout
    #[serde(default)]
    pub logout: Option<String>,
}

impl LoginQuery {
    /// Which failure, if any, the login page should render
    pub fn failure(&self) -> Option<LoginFailure> {
        self.error.as_deref().map(LoginFailure::from_flag)
    }
}

/// Failure state rendered by the login page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginFailure {
    /// Generic "bad username or password"
    BadCredentials,
    /// Disclosed "no such user" (only when disclosure is configured)
    UserNotFound,
}

impl LoginFailure {
    /// Value carried in the `error` query parameter
    pub fn as_flag(self) -> &'static str {
        match self {
            LoginFailure::BadCredentials => "true",
            LoginFailure::UserNotFound => "user_not_found",
        }
    }

    /// Parse the `error` query parameter; unknown values fall back to the generic failure
    pub fn from_flag(flag: &str) -> Self {
        match flag {
            "user_not_found" => LoginFailure::UserNotFound,
            _ => LoginFailure::BadCredentials,
        }
    }

    /// Message shown to the user
    pub fn message(self) -> &'static str {
        match self {
            LoginFailure::BadCredentials => "Invalid username or password",
            LoginFailure::UserNotFound => "User not found",
        }
    }
}

/// One persisted remember-me lineage, keyed by `series`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PersistentLogin {
    /// Stable identifier for one remembered browser/device
    pub series: String,
    /// Secret rotated on every successful use
    pub token_value: String,
    /// Owning principal
    pub username: String,
    /// Time of issue or of the last successful validation
    pub last_used: DateTime<Utc>,
}

impl PersistentLogin {
    /// Whether this row is older than `max_age` at `now`
    pub fn is_expired(&self, now: DateTime<Utc>, max_age: chrono::Duration) -> bool {
        self.last_used + max_age < now
    }
}

fn checkbox<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "on" | "true" | "yes" | "1"
    ))
}
