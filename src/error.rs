//! Relay error types with HTTP status code mapping.
//!
//! [`ChatError`] is the central error type for the gateway. Each variant
//! maps to a specific HTTP status code and structured JSON error response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 1001,
///     "message": "invalid argument: message text must not be empty",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code (see code ranges on [`ChatError`]).
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category              | HTTP Status |
/// |-----------|-----------------------|-------------|
/// | 1000–1999 | Validation/Identity   | 400 / 401   |
/// | 2000–2999 | State/Authorization   | 404 / 403   |
/// | 3000–3999 | Server/Infrastructure | 500 / 503   |
///
/// Propagation policy: [`ChatError::NotFound`], [`ChatError::Forbidden`] and
/// [`ChatError::InvalidArgument`] are rejected operations with no state
/// change. [`ChatError::Storage`] aborts an ingest entirely — nothing is
/// published. [`ChatError::Bus`] is swallowed and logged at the publish call
/// site; it only surfaces when a subscription cannot be established.
/// [`ChatError::Transport`] tears down the affected session, never the
/// process. No operation is automatically retried.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// Request carried no trusted principal identity.
    #[error("missing or empty principal identity")]
    Unauthorized,

    /// Conversation with the given ID was not found.
    #[error("conversation not found: {0}")]
    NotFound(uuid::Uuid),

    /// Principal is not a participant of the conversation.
    #[error("principal is not a participant of this conversation")]
    Forbidden,

    /// Request validation failed (empty message text, malformed input).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Persistence layer failure.
    #[error("storage error: {0}")]
    Storage(String),

    /// Connection upgrade or socket write failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// Broadcast bus publish/subscribe failure.
    #[error("bus error: {0}")]
    Bus(String),
}

impl ChatError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidArgument(_) => 1001,
            Self::Unauthorized => 1002,
            Self::NotFound(_) => 2001,
            Self::Forbidden => 2002,
            Self::Storage(_) => 3001,
            Self::Transport(_) => 3002,
            Self::Bus(_) => 3003,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Storage(_) | Self::Transport(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Bus(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(
            ChatError::NotFound(uuid::Uuid::new_v4()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(ChatError::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            ChatError::InvalidArgument("x".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ChatError::Storage("down".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ChatError::Unauthorized.status_code(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn error_codes_are_unique() {
        let codes = [
            ChatError::Unauthorized.error_code(),
            ChatError::NotFound(uuid::Uuid::new_v4()).error_code(),
            ChatError::Forbidden.error_code(),
            ChatError::InvalidArgument(String::new()).error_code(),
            ChatError::Storage(String::new()).error_code(),
            ChatError::Transport(String::new()).error_code(),
            ChatError::Bus(String::new()).error_code(),
        ];
        let mut deduped = codes.to_vec();
        deduped.sort_unstable();
        deduped.dedup();
        assert_eq!(deduped.len(), codes.len());
    }
}
