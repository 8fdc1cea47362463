//! Error types for Noisemap.
//!
//! [`StoreError`] and [`FilterError`] are library errors. [`ApiError`] wraps
//! them at the HTTP boundary and renders a consistent JSON body.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Failures from a report store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No report with this id exists.
    #[error("report {id} not found")]
    NotFound { id: String },

    /// A report with this id is already stored.
    #[error("report {id} already exists")]
    DuplicateId { id: String },

    /// A stored row could not be decoded back into a report.
    #[error("corrupt report row: {0}")]
    Corrupt(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    pub fn not_found(id: &str) -> Self {
        StoreError::NotFound { id: id.to_string() }
    }
}

/// Rejected filter input. Only produced in strict filter mode.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FilterError {
    #[error("unrecognized time range '{0}' (expected week, month or all)")]
    InvalidTimeRange(String),

    #[error("unrecognized status '{0}' (expected pending, reviewed, resolved or all)")]
    InvalidStatus(String),

    #[error("unrecognized category '{0}'")]
    InvalidCategory(String),

    #[error("invalid decibel bound '{0}'")]
    InvalidDecibel(String),

    #[error("decibel range is inverted: min {min} > max {max}")]
    InvertedDecibelRange { min: f64, max: f64 },
}

/// Error type for HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error("bad request: {0}")]
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::Store(StoreError::NotFound { .. }) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", self.to_string())
            }
            ApiError::Store(StoreError::DuplicateId { .. }) => {
                (StatusCode::CONFLICT, "CONFLICT", self.to_string())
            }
            ApiError::Store(err) => {
                tracing::error!(error = %err, "Store failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
            ApiError::Filter(err) => (StatusCode::BAD_REQUEST, "INVALID_FILTER", err.to_string()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, Json(body)).into_response()
    }
}
