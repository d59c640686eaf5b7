//! Error types and handling
//!
//! Every handler error is converted to the same JSON body, so clients see one
//! shape for bad filters, rejected request bodies and server faults alike.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::models::FilterError;

/// Application error types
#[derive(Debug, Error)]
pub enum AppError {
    /// Resource not found (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request - malformed input (400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Forbidden - the acting user may not do this (403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Conflict - resource already exists or state conflict (409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Input failed field validation (400)
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        code: Option<&'static str>,
        details: serde_json::Value,
    },

    /// Internal server error (500)
    #[error("Internal error: {0}")]
    Internal(String),

    /// Database error (500)
    #[error("Database error: {0}")]
    Database(String),
}

impl AppError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        AppError::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        AppError::BadRequest(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        AppError::Forbidden(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        AppError::Conflict(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) | AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(_) | AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error response body
#[derive(Serialize, Debug)]
pub struct ErrorResponse {
    /// Error type identifier
    pub error: String,
    /// Human-readable error message
    pub message: String,
    /// Additional error details (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    /// Error code for programmatic handling (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            details: None,
            code: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (error_type, should_log) = match &self {
            AppError::NotFound(_) => ("not_found", false),
            AppError::BadRequest(_) => ("bad_request", false),
            AppError::Forbidden(_) => ("forbidden", true),
            AppError::Conflict(_) => ("conflict", false),
            AppError::Validation { .. } => ("validation_error", false),
            AppError::Internal(_) => ("internal_error", true),
            AppError::Database(_) => ("database_error", true),
        };

        if should_log {
            error!(error = %self, error_type = error_type, "Request error");
        }

        let mut body = ErrorResponse::new(error_type, self.to_string());
        if let AppError::Validation { code, details, .. } = self {
            body = body.with_details(details);
            if let Some(code) = code {
                body = body.with_code(code);
            }
        }

        (status, Json(body)).into_response()
    }
}

fn from_sqlx_ref(err: &sqlx::Error) -> AppError {
    match err {
        sqlx::Error::RowNotFound => AppError::NotFound("Record not found".to_string()),
        sqlx::Error::Database(db_err) if db_err.message().contains("UNIQUE constraint failed") => {
            AppError::Conflict("Resource already exists".to_string())
        }
        _ => AppError::Database(err.to_string()),
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast_ref::<sqlx::Error>() {
            Some(sqlx_err) => from_sqlx_ref(sqlx_err),
            None => AppError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        from_sqlx_ref(&err)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(format!("JSON parsing error: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        let details = serde_json::to_value(&err).unwrap_or(serde_json::Value::Null);
        AppError::Validation {
            message: err.to_string(),
            code: Some("invalid_body"),
            details,
        }
    }
}

impl From<FilterError> for AppError {
    fn from(err: FilterError) -> Self {
        let details = err
            .errors()
            .iter()
            .map(|e| {
                serde_json::json!({
                    "field": e.field,
                    "kind": e.kind,
                    "message": e.to_string(),
                })
            })
            .collect::<Vec<_>>();
        AppError::Validation {
            message: err.to_string(),
            code: Some("invalid_filter"),
            details: serde_json::Value::Array(details),
        }
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
