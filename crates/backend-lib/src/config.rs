// ============================
// formguard-backend-lib/src/config.rs
// ============================
//! Configuration management.
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Default config file, relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Prefix for environment overrides, nested keys separated by `__`
pub const ENV_PREFIX: &str = "FORMGUARD_";

/// Upper bound on `remember_me.token_validity_secs` (10 years)
pub const MAX_TOKEN_VALIDITY_SECS: u64 = 60 * 60 * 24 * 365 * 10;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub security: SecuritySettings,
    pub remember_me: RememberMeSettings,
    /// Accounts seeded into the in-memory user store
    pub users: Vec<UserSeed>,
}

/// Listener and process settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Server bind address
    pub bind_addr: SocketAddr,
    /// Data directory path (flat-file token store lives here)
    pub data_dir: PathBuf,
    /// Log level
    pub log_level: String,
}

/// Form-login, authorization and session settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecuritySettings {
    /// Ant-style patterns reachable without authentication
    pub public_patterns: Vec<String>,
    /// Whether paths outside `public_patterns` require a principal
    pub protected_default: bool,
    /// Login entry point
    pub login_url: String,
    /// Where a successful login lands
    pub default_success_url: String,
    /// Where a failed login lands
    pub failure_url: String,
    /// Logout endpoint
    pub logout_url: String,
    /// Where a logout lands
    pub logout_success_url: String,
    /// Where a request carrying a dead session lands
    pub invalid_session_url: String,
    /// CSRF protection for state-changing requests
    pub csrf_enabled: bool,
    /// Report unknown usernames distinctly from bad passwords
    pub reveal_user_not_found: bool,
    /// Session cookie name
    pub session_cookie_name: String,
    /// Session idle timeout in seconds
    pub session_idle_ttl_secs: u64,
    /// Session absolute lifetime in seconds
    pub session_absolute_ttl_secs: u64,
    /// Mark cookies `Secure`
    pub cookie_secure: bool,
}

/// Persistent remember-me token settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RememberMeSettings {
    /// Cookie carrying `series:token`
    pub cookie_name: String,
    /// Maximum token age in seconds, measured from last use
    pub token_validity_secs: u64,
    /// Random bytes in a series identifier
    pub series_bytes: usize,
    /// Random bytes in a token value
    pub token_bytes: usize,
    /// Backing repository
    pub store: TokenStoreKind,
    /// Upper bound on any single repository call
    pub store_timeout_ms: u64,
    /// Interval between expiry sweeps
    pub sweep_interval_secs: u64,
}

/// Which `TokenRepository` backs the remember-me store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenStoreKind {
    Memory,
    File,
}

/// One configured account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSeed {
    pub username: String,
    /// PHC string, see `formguard hash-password`
    pub password_hash: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            data_dir: PathBuf::from("data"),
            log_level: "info".to_string(),
        }
    }
}

impl Default for SecuritySettings {
    fn default() -> Self {
        Self {
            public_patterns: [
                "/static/**",
                "/webjars/**",
                "/public/**",
                "/login",
                "/register",
                "/favicon.ico",
            ]
            .iter()
            .map(|p| p.to_string())
            .collect(),
            protected_default: true,
            login_url: "/login".to_string(),
            default_success_url: "/user".to_string(),
            failure_url: "/login?error=true".to_string(),
            logout_url: "/logout".to_string(),
            logout_success_url: "/login?logout".to_string(),
            invalid_session_url: "/login".to_string(),
            csrf_enabled: false,
            reveal_user_not_found: false,
            session_cookie_name: "SESSIONID".to_string(),
            session_idle_ttl_secs: 30 * 60, // 30 minutes
            session_absolute_ttl_secs: 60 * 60 * 12, // 12 hours
            cookie_secure: false,
        }
    }
}

impl Default for RememberMeSettings {
    fn default() -> Self {
        Self {
            cookie_name: "remember-me".to_string(),
            token_validity_secs: 60 * 60 * 24 * 14, // 14 days
            series_bytes: 16,
            token_bytes: 16,
            store: TokenStoreKind::File,
            store_timeout_ms: 2_000,
            sweep_interval_secs: 60 * 60,
        }
    }
}

impl SecuritySettings {
    pub fn session_idle_ttl(&self) -> Duration {
        Duration::from_secs(self.session_idle_ttl_secs)
    }

    pub fn session_absolute_ttl(&self) -> Duration {
        Duration::from_secs(self.session_absolute_ttl_secs)
    }
}

impl RememberMeSettings {
    pub fn token_validity(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.token_validity_secs.min(MAX_TOKEN_VALIDITY_SECS) as i64)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl Settings {
    /// Load from `config/default.toml` (if present) and the environment
    pub fn load() -> Result<Self> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load from an explicit file (missing files are skipped) and the environment
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let settings: Settings = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings the rest of the crate cannot work with
    pub fn validate(&self) -> Result<(), AppError> {
        if !LOG_LEVELS.contains(&self.server.log_level.to_lowercase().as_str()) {
            return Err(AppError::Config(format!(
                "unknown log level '{}'",
                self.server.log_level
            )));
        }

        let sec = &self.security;
        if sec.session_idle_ttl_secs == 0 || sec.session_absolute_ttl_secs == 0 {
            return Err(AppError::Config("session TTLs must be non-zero".to_string()));
        }
        if sec.session_cookie_name.is_empty() {
            return Err(AppError::Config("session cookie name is empty".to_string()));
        }
        for pattern in &sec.public_patterns {
            if !pattern.starts_with('/') {
                return Err(AppError::Config(format!(
                    "public pattern '{pattern}' must start with '/'"
                )));
            }
        }
        for (name, url) in [
            ("login_url", &sec.login_url),
            ("default_success_url", &sec.default_success_url),
            ("failure_url", &sec.failure_url),
            ("logout_url", &sec.logout_url),
            ("logout_success_url", &sec.logout_success_url),
            ("invalid_session_url", &sec.invalid_session_url),
        ] {
            if !url.starts_with('/') {
                return Err(AppError::Config(format!("{name} '{url}' must start with '/'")));
            }
        }

        // These two are mounted as routes
        for (name, url) in [("login_url", &sec.login_url), ("logout_url", &sec.logout_url)] {
            if url.contains('?') || url.contains('*') {
                return Err(AppError::Config(format!("{name} '{url}' must be a plain path")));
            }
            if ["/", "/user", "/health"].contains(&url.as_str()) {
                return Err(AppError::Config(format!("{name} '{url}' collides with a page route")));
            }
        }
        if sec.login_url == sec.logout_url {
            return Err(AppError::Config("login_url and logout_url must differ".to_string()));
        }

        let rm = &self.remember_me;
        if rm.cookie_name.is_empty() {
            return Err(AppError::Config("remember-me cookie name is empty".to_string()));
        }
        if rm.cookie_name == sec.session_cookie_name {
            return Err(AppError::Config(
                "remember-me and session cookies must have different names".to_string(),
            ));
        }
        if rm.token_validity_secs == 0 || rm.token_validity_secs > MAX_TOKEN_VALIDITY_SECS {
            return Err(AppError::Config(format!(
                "token validity must be between 1 and {MAX_TOKEN_VALIDITY_SECS} seconds"
            )));
        }
        if rm.series_bytes == 0 || rm.token_bytes == 0 {
            return Err(AppError::Config("token sizes must be non-zero".to_string()));
        }
        if rm.store_timeout_ms == 0 || rm.sweep_interval_secs == 0 {
            return Err(AppError::Config(
                "store timeout and sweep interval must be non-zero".to_string(),
            ));
        }

        Ok(())
    }
}
