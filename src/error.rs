// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
///
/// Callers branch on the variant, never on message text, so every distinct
/// failure the login/refresh flows can hit gets its own variant. Clients use
/// the stable `error` code to decide between "resend code", "re-login" and
/// "contact support" paths.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid or malformed token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("Token has been revoked")]
    TokenRevoked,

    #[error("Phone number is not a valid E.164 value: {0}")]
    InvalidPhone(String),

    #[error("No active verification code for this phone")]
    NoActiveChallenge,

    #[error("Verification code expired")]
    OtpExpired,

    #[error("Verification attempts exhausted")]
    AttemptsExhausted,

    #[error("Verification code does not match")]
    CodeMismatch,

    #[error("Code delivery failed: {0}")]
    DeliveryFailed(String),

    #[error("Provider rejected the token: {0}")]
    InvalidProviderToken(String),

    #[error("Identity provider unreachable: {0}")]
    ProviderUnreachable(String),

    #[error("Upstream call timed out: {0}")]
    Timeout(String),

    #[error("Account is blocked")]
    AccountBlocked,

    #[error("Account is pending deletion")]
    AccountPendingDeletion,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid_token", None),
            AppError::TokenExpired => (StatusCode::UNAUTHORIZED, "token_expired", None),
            AppError::TokenRevoked => (StatusCode::UNAUTHORIZED, "token_revoked", None),
            AppError::InvalidPhone(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_phone", Some(msg.clone()))
            }
            AppError::NoActiveChallenge => (StatusCode::BAD_REQUEST, "no_active_challenge", None),
            AppError::OtpExpired => (StatusCode::BAD_REQUEST, "otp_expired", None),
            AppError::AttemptsExhausted => (StatusCode::BAD_REQUEST, "attempts_exhausted", None),
            AppError::CodeMismatch => (StatusCode::BAD_REQUEST, "code_mismatch", None),
            AppError::DeliveryFailed(msg) => {
                (StatusCode::BAD_GATEWAY, "delivery_failed", Some(msg.clone()))
            }
            AppError::InvalidProviderToken(msg) => (
                StatusCode::UNAUTHORIZED,
                "invalid_provider_token",
                Some(msg.clone()),
            ),
            AppError::ProviderUnreachable(msg) => (
                StatusCode::BAD_GATEWAY,
                "provider_unreachable",
                Some(msg.clone()),
            ),
            AppError::Timeout(msg) => (StatusCode::GATEWAY_TIMEOUT, "timeout", Some(msg.clone())),
            AppError::AccountBlocked => (StatusCode::FORBIDDEN, "account_blocked", None),
            AppError::AccountPendingDeletion => {
                (StatusCode::FORBIDDEN, "account_pending_deletion", None)
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
