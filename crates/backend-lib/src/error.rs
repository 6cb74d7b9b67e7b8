// crates/backend-lib/src/error.rs

//! Central error type + Axum integration.
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use std::fmt;
use thiserror::Error;

/// Why a remember-me token was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenRejection {
    /// Cookie value could not be decoded into `series:token`
    Malformed,
    /// No row for the presented series
    UnknownSeries,
    /// Series known but the value differs: possible theft or replay
    Mismatch,
    /// Row older than the configured validity
    Expired,
    /// Row refers to an account that no longer exists
    UnknownUser,
}

impl fmt::Display for TokenRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            TokenRejection::Malformed => "malformed cookie",
            TokenRejection::UnknownSeries => "unknown series",
            TokenRejection::Mismatch => "token mismatch",
            TokenRejection::Expired => "token expired",
            TokenRejection::UnknownUser => "unknown user",
        };
        f.write_str(reason)
    }
}

/// Application error types with error codes and context
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("User not found")]
    UserNotFound,

    #[error("Remember-me token rejected: {0}")]
    TokenRejected(TokenRejection),

    #[error("Session expired")]
    SessionExpired,

    #[error("Token store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("CSRF token missing or invalid")]
    CsrfRejected,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AppError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidCredentials
            | AppError::UserNotFound
            | AppError::TokenRejected(_)
            | AppError::SessionExpired => StatusCode::UNAUTHORIZED,
            AppError::CsrfRejected => StatusCode::FORBIDDEN,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::InvalidCredentials => "AUTH_001",
            AppError::UserNotFound => "AUTH_002",
            AppError::TokenRejected(_) => "AUTH_003",
            AppError::SessionExpired => "AUTH_004",
            AppError::CsrfRejected => "AUTH_005",
            AppError::StoreUnavailable(_) => "STORE_001",
            AppError::InvalidInput(_) => "VAL_001",
            AppError::Config(_) => "CFG_001",
            AppError::Internal(_) => "INT_001",
            AppError::Io(_) => "IO_001",
            AppError::Json(_) => "JSON_001",
        }
    }

    /// Get a sanitized message suitable for production use
    pub fn sanitized_message(&self) -> String {
        match self {
            AppError::InvalidCredentials | AppError::TokenRejected(_) => {
                "Authentication failed".to_string()
            },
            // Only reachable when disclosure is configured
            AppError::UserNotFound => "User not found".to_string(),
            AppError::SessionExpired => "Session expired, please sign in again".to_string(),
            AppError::CsrfRejected => "Forbidden".to_string(),
            AppError::StoreUnavailable(_) => {
                "Service temporarily unavailable, please retry".to_string()
            },
            AppError::InvalidInput(_) => "Invalid input provided".to_string(),
            AppError::Json(_) => "Invalid request format".to_string(),
            AppError::Config(_) | AppError::Internal(_) | AppError::Io(_) => {
                "An internal server error occurred".to_string()
            },
        }
    }

    /// Whether the caller may retry the same request later
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::StoreUnavailable(_))
    }
}

/// Seconds a client should wait before retrying after a store outage
const RETRY_AFTER_SECS: &str = "5";

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let retryable = self.is_retryable();

        // Full detail only in debug builds
        let message = if cfg!(debug_assertions) {
            self.to_string()
        } else {
            self.sanitized_message()
        };

        let body = serde_json::json!({
            "error": {
                "code": self.error_code(),
                "message": message,
                "retryable": retryable,
            }
        });

        let mut response = (status, axum::Json(body)).into_response();
        if retryable {
            response.headers_mut().insert(
                header::RETRY_AFTER,
                HeaderValue::from_static(RETRY_AFTER_SECS),
            );
        }
        response
    }
}

impl From<tokio::time::error::Elapsed> for AppError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        AppError::StoreUnavailable("operation timed out".to_string())
    }
}
