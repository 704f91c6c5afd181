//! Request-path error taxonomy and HTTP mapping.
//!
//! Three client-visible failure classes: validation problems map to 400 with
//! a human-readable message, missing resources to 404, and record-source or
//! other internal failures to 500. A failed sub-query always fails the whole
//! response — a silently substituted zero would be indistinguishable from
//! "no activity" on the dashboard.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::source::SourceError;

// ---

/// JSON error body returned to the dashboard client.
#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        // ---
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Application error for HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    /// Malformed client input: bad date string, non-positive span or bin
    /// count, unknown clade, invalid rank code.
    Validation(String),
    /// Resource missing entirely (not the per-record thumbnail case, which
    /// degrades locally instead).
    NotFound(String),
    /// The record source failed; reported, never retried or zeroed out.
    Source(SourceError),
    /// Anything else.
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // ---
        let (status, error) = match self {
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, ApiError::new("VALIDATION_ERROR", msg))
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ApiError::new("NOT_FOUND", msg)),
            AppError::Source(e) => {
                tracing::error!("record source failure: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiError::new("SOURCE_ERROR", e.to_string()),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("internal error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiError::new("INTERNAL_ERROR", msg),
                )
            }
        };

        (status, Json(error)).into_response()
    }
}

impl From<SourceError> for AppError {
    fn from(err: SourceError) -> Self {
        AppError::Source(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}
