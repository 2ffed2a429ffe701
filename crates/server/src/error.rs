//! Unified error handling with Sentry integration.
//!
//! Handlers return `Result<T, AppError>`. Server-side failures are captured
//! to Sentry before responding; clients only ever see a short message in a
//! `{"error": ...}` body.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::claim::ClaimError;
use crate::services::email::EmailError;

/// Application-level error type for the registry server.
#[derive(Debug, Error)]
pub enum AppError {
    /// Request failed validation.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Missing or wrong admin code.
    #[error("Unauthorized")]
    Unauthorized,

    /// The item is already claimed (or does not exist).
    #[error("Already claimed")]
    Conflict,

    /// Store operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// A mandatory email could not be delivered.
    #[error("Email error: {0}")]
    Email(#[from] EmailError),

    /// Too many requests from this client.
    #[error("Rate limited")]
    RateLimited,
}

impl From<ClaimError> for AppError {
    fn from(err: ClaimError) -> Self {
        match err {
            ClaimError::AlreadyClaimed => Self::Conflict,
            ClaimError::Store { source, .. } => Self::Database(source),
            ClaimError::ConfirmationFailed { source, .. } => Self::Email(source),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<gift_registry_core::EmailError> for AppError {
    fn from(_: gift_registry_core::EmailError) -> Self {
        Self::BadRequest("Invalid email address".to_string())
    }
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Conflict => StatusCode::CONFLICT,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Database(_) | Self::Email(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if matches!(self, Self::Database(_) | Self::Email(_)) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        // Don't expose internal error details to clients
        let message = match &self {
            Self::BadRequest(msg) => msg.clone(),
            Self::Database(_) => "Internal server error".to_string(),
            Self::Email(_) => "Email delivery failed".to_string(),
            _ => self.to_string(),
        };

        (self.status(), Json(json!({ "error": message }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
