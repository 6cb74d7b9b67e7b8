//! Cookie helpers: reading the `Cookie` header, building `Set-Cookie`
//! values, and the remember-me `series:token` encoding.
use axum::http::{header, HeaderMap, HeaderValue};
use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};

use crate::error::{AppError, TokenRejection};

const DELIMITER: char = ':';

/// Encode a remember-me pair as `base64(series:token)` without padding
pub fn encode_remember_me(series: &str, token_value: &str) -> String {
    STANDARD_NO_PAD.encode(format!("{series}{DELIMITER}{token_value}"))
}

/// Decode a remember-me cookie value into `(series, token_value)`
pub fn decode_remember_me(cookie_value: &str) -> Result<(String, String), AppError> {
    let malformed = || AppError::TokenRejected(TokenRejection::Malformed);

    // Tolerate padded values written by other encoders
    let trimmed = cookie_value.trim().trim_end_matches('=');
    let bytes = STANDARD_NO_PAD.decode(trimmed).map_err(|_| malformed())?;
    let decoded = String::from_utf8(bytes).map_err(|_| malformed())?;

    let (series, token_value) = decoded.split_once(DELIMITER).ok_or_else(malformed)?;
    if series.is_empty() || token_value.is_empty() || token_value.contains(DELIMITER) {
        return Err(malformed());
    }
    Ok((series.to_string(), token_value.to_string()))
}

/// Value of the named cookie in the request, if present and non-empty
pub fn get_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim_matches('"').to_string())
        .filter(|value| !value.is_empty())
}

/// Attributes shared by every cookie this crate sets
#[derive(Debug, Clone, Copy)]
pub struct CookieOptions {
    pub secure: bool,
}

/// Build a `Set-Cookie` value. `max_age` of `None` yields a browser-session cookie.
pub fn set_cookie(
    name: &str,
    value: &str,
    max_age: Option<i64>,
    options: CookieOptions,
) -> Result<HeaderValue, AppError> {
    let mut cookie = format!("{name}={value}; Path=/; HttpOnly; SameSite=Lax");
    if let Some(seconds) = max_age {
        cookie.push_str(&format!("; Max-Age={seconds}"));
    }
    if options.secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
        .map_err(|_| AppError::InvalidInput(format!("cookie {name} has an invalid value")))
}

/// Build a `Set-Cookie` value that removes the cookie from the client
pub fn expire_cookie(name: &str, options: CookieOptions) -> Result<HeaderValue, AppError> {
    set_cookie(name, "", Some(0), options)
}
