//! Random identifiers handed to clients: session ids, CSRF tokens and the
//! two halves of a remember-me cookie. All are URL-safe base64 without
//! padding so they can sit in a cookie or a form field unescaped.
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::RngCore;

/// 256 bits for anything that alone identifies a session
pub const SESSION_ID_BYTES: usize = 32;
pub const CSRF_TOKEN_BYTES: usize = 32;

/// `bytes` of OS-seeded randomness, encoded
pub fn random_token(bytes: usize) -> String {
    let mut buffer = vec![0u8; bytes];
    rand::rng().fill_bytes(&mut buffer);
    URL_SAFE_NO_PAD.encode(buffer)
}

pub fn session_id() -> String {
    random_token(SESSION_ID_BYTES)
}

pub fn csrf_token() -> String {
    random_token(CSRF_TOKEN_BYTES)
}
