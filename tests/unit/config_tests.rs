// ==========================
// tests/unit/config_tests.rs
// ==========================
//! Unit tests for the configuration module
use backend_lib::config::{Settings, TokenStoreKind};
use std::path::PathBuf;

fn shipped_config() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("config")
        .join("default.toml")
}

#[test]
fn test_shipped_config_loads() {
    let settings = Settings::load_from(shipped_config()).expect("shipped config is valid");

    assert_eq!(settings.server.bind_addr.to_string(), "127.0.0.1:8080");
    assert_eq!(settings.security.login_url, "/login");
    assert_eq!(settings.security.failure_url, "/login?error=true");
    assert_eq!(settings.remember_me.store, TokenStoreKind::File);
    assert!(!settings.security.csrf_enabled);
}

#[test]
fn test_shipped_config_opts_into_user_disclosure() {
    // Built-in default hides unknown accounts; the shipped file turns it on
    assert!(!Settings::default().security.reveal_user_not_found);
    let settings = Settings::load_from(shipped_config()).unwrap();
    assert!(settings.security.reveal_user_not_found);
}

#[test]
fn test_shipped_config_matches_defaults_elsewhere() {
    let shipped = Settings::load_from(shipped_config()).unwrap();
    let defaults = Settings::default();

    assert_eq!(shipped.security.public_patterns, defaults.security.public_patterns);
    assert_eq!(
        shipped.remember_me.token_validity_secs,
        defaults.remember_me.token_validity_secs
    );
    assert_eq!(
        shipped.security.session_cookie_name,
        defaults.security.session_cookie_name
    );
    assert!(shipped.users.is_empty());
}
