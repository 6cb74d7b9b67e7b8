// =========================
// tests/unit/error_tests.rs
// =========================
//! Unit tests for the error module
use axum::http::StatusCode;
use axum::response::IntoResponse;
use backend_lib::error::{AppError, TokenRejection};

use crate::test_utils::body_string;

#[test]
fn test_security_denials_are_not_infrastructure_failures() {
    let denials = [
        AppError::InvalidCredentials,
        AppError::UserNotFound,
        AppError::TokenRejected(TokenRejection::Mismatch),
        AppError::SessionExpired,
    ];
    for err in denials {
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED, "{err}");
        assert!(!err.is_retryable(), "{err}");
    }

    let outage = AppError::StoreUnavailable("timed out".to_string());
    assert_eq!(outage.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(outage.is_retryable());
}

#[test]
fn test_rejection_reasons_share_one_code() {
    let codes: Vec<_> = [
        TokenRejection::Malformed,
        TokenRejection::UnknownSeries,
        TokenRejection::Mismatch,
        TokenRejection::Expired,
        TokenRejection::UnknownUser,
    ]
    .into_iter()
    .map(|reason| AppError::TokenRejected(reason).error_code())
    .collect();
    assert!(codes.windows(2).all(|pair| pair[0] == pair[1]));
}

#[tokio::test]
async fn test_error_response_body() {
    let response = AppError::CsrfRejected.into_response();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["error"]["code"], AppError::CsrfRejected.error_code());
    assert!(body["error"]["message"].is_string());
}

#[tokio::test]
async fn test_internal_details_not_leaked_in_sanitized_message() {
    let err = AppError::Internal("db password is hunter2".to_string());
    assert!(!err.sanitized_message().contains("hunter2"));

    let response = err.into_response();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
