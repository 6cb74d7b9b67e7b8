// ============================
// crates/backend-lib/src/validation/mod.rs
// ============================
//! Login form validation.
//!
//! Runs before any credential lookup so oversized or hostile input never
//! reaches the password hasher.

use crate::error::AppError;
use formguard_common::LoginForm;
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

const MAX_USERNAME_LENGTH: usize = 64;
const MAX_PASSWORD_LENGTH: usize = 128;

static USERNAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._@+-]+$").expect("static username pattern"));

/// Possible validation errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid username: {0}")]
    InvalidUsername(String),

    #[error("Invalid password: {0}")]
    InvalidPassword(String),
}

pub type ValidationResult<T> = Result<T, ValidationError>;

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::InvalidInput(err.to_string())
    }
}

/// Validate a submitted username
pub fn validate_username(username: &str) -> ValidationResult<&str> {
    if username.is_empty() {
        return Err(ValidationError::InvalidUsername(
            "Username must not be empty".to_string(),
        ));
    }

    if username.len() > MAX_USERNAME_LENGTH {
        return Err(ValidationError::InvalidUsername(format!(
            "Username cannot exceed {MAX_USERNAME_LENGTH} characters"
        )));
    }

    if !USERNAME_REGEX.is_match(username) {
        return Err(ValidationError::InvalidUsername(
            "Username contains invalid characters".to_string(),
        ));
    }

    Ok(username)
}

/// Validate a submitted password. Strength is not checked here; this
/// only bounds what is handed to the hasher.
pub fn validate_password(password: &str) -> ValidationResult<&str> {
    if password.is_empty() {
        return Err(ValidationError::InvalidPassword(
            "Password must not be empty".to_string(),
        ));
    }

    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::InvalidPassword(format!(
            "Password cannot exceed {MAX_PASSWORD_LENGTH} characters"
        )));
    }

    Ok(password)
}

/// Validate a whole login form
pub fn validate_login_form(form: &LoginForm) -> ValidationResult<()> {
    validate_username(form.username.trim())?;
    validate_password(&form.password)?;
    Ok(())
}
