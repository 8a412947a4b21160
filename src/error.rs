// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::collections::BTreeMap;

/// Field name -> human readable message.
pub type FieldErrors = BTreeMap<String, String>;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    ExpiredToken,

    #[error("Session expired or revoked")]
    SessionExpired,

    #[error("Not allowed to modify this resource")]
    Forbidden,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Constraint violation: {0:?}")]
    ConstraintViolation(FieldErrors),

    #[error("Validation failed: {0:?}")]
    Validation(FieldErrors),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Request body too large")]
    PayloadTooLarge,

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Build a constraint violation carrying a single field message.
    pub fn constraint(field: &str, message: &str) -> Self {
        AppError::ConstraintViolation(BTreeMap::from([(field.to_string(), message.to_string())]))
    }

    /// True for every variant the auth middleware turns into a 401.
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            AppError::Unauthorized
                | AppError::InvalidCredentials
                | AppError::InvalidToken
                | AppError::ExpiredToken
                | AppError::SessionExpired
        )
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let fields = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let message = errs
                    .first()
                    .and_then(|e| e.message.as_ref())
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("invalid {}", field));
                (field.to_string(), message)
            })
            .collect();
        AppError::Validation(fields)
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<FieldErrors>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details, fields) = match self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None, None),
            AppError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "invalid_credentials", None, None)
            }
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid_token", None, None),
            AppError::ExpiredToken => (StatusCode::UNAUTHORIZED, "expired_token", None, None),
            AppError::SessionExpired => (StatusCode::UNAUTHORIZED, "session_expired", None, None),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "forbidden", None, None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg), None),
            AppError::ConstraintViolation(fields) => (
                StatusCode::CONFLICT,
                "constraint_violation",
                None,
                Some(fields),
            ),
            AppError::Validation(fields) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_failed",
                None,
                Some(fields),
            ),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", Some(msg), None),
            AppError::PayloadTooLarge => {
                (StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large", None, None)
            }
            AppError::UpstreamUnavailable(msg) => {
                tracing::error!(error = %msg, "Upstream unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "upstream_unavailable",
                    None,
                    None,
                )
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None, None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
            fields,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constraint_violation_maps_to_conflict() {
        let response = AppError::constraint("unique_title", "title already taken").into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_auth_errors_are_unauthorized() {
        for err in [
            AppError::InvalidToken,
            AppError::ExpiredToken,
            AppError::SessionExpired,
            AppError::InvalidCredentials,
        ] {
            assert!(err.is_auth_error());
            assert_eq!(err.into_response().status(), StatusCode::UNAUTHORIZED);
        }
        assert!(!AppError::NotFound("food".to_string()).is_auth_error());
    }

    #[test]
    fn test_internal_details_are_not_leaked() {
        let response =
            AppError::UpstreamUnavailable("redis at 10.0.0.3 refused".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
