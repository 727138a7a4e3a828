//! # Error Handling
//!
//! Custom error types and their conversion to HTTP responses.
//!
//! ## Taxonomy:
//! - **Configuration**: missing/invalid server credential or settings —
//!   sessions are rejected before any upstream connection is attempted
//! - **Transport**: upstream socket failures — surfaced to the caller and
//!   subject to the bounded reconnect policy
//! - **Decode**: malformed payloads (base64, WAV, wire JSON) — absorbed at
//!   the decoding boundary wherever possible
//! - **Capture**: microphone/device failures — recorded, never fatal to
//!   the session
//! - **BadRequest / Internal**: the usual HTTP-facing categories
//!
//! Action application deliberately has no error type: the reducer's policy
//! is silent tolerance, because assistant output must not be able to crash
//! the document state machine.

use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use std::fmt;

/// Application error categories.
#[derive(Debug)]
pub enum AppError {
    /// Missing or invalid configuration (e.g. absent server credential)
    Configuration(String),

    /// Upstream connection failures
    Transport(String),

    /// Malformed payload that could not be decoded
    Decode(String),

    /// Microphone or capture-device failure
    Capture(String),

    /// Client sent invalid or malformed data
    BadRequest(String),

    /// Anything else that went wrong server-side
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Transport(msg) => write!(f, "Transport error: {}", msg),
            AppError::Decode(msg) => write!(f, "Decode error: {}", msg),
            AppError::Capture(msg) => write!(f, "Capture error: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

/// Map each error category to an HTTP status and a stable machine-readable
/// type string. All error responses share one JSON envelope.
impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let (status, error_type, message) = match self {
            AppError::Configuration(msg) => (
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                "configuration_error",
                msg.clone(),
            ),
            AppError::Transport(msg) => (
                actix_web::http::StatusCode::BAD_GATEWAY,
                "transport_error",
                msg.clone(),
            ),
            AppError::Decode(msg) => (
                actix_web::http::StatusCode::UNPROCESSABLE_ENTITY,
                "decode_error",
                msg.clone(),
            ),
            AppError::Capture(msg) => (
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                "capture_error",
                msg.clone(),
            ),
            AppError::BadRequest(msg) => (
                actix_web::http::StatusCode::BAD_REQUEST,
                "bad_request",
                msg.clone(),
            ),
            AppError::Internal(msg) => (
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                msg.clone(),
            ),
        };

        HttpResponse::build(status).json(json!({
            "error": {
                "type": error_type,
                "message": message,
                "timestamp": chrono::Utc::now().to_rfc3339()
            }
        }))
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

/// JSON parsing failures on client input map to a 400, not a 500.
impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(format!("JSON parsing error: {}", err))
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration(err.to_string())
    }
}

impl From<base64::DecodeError> for AppError {
    fn from(err: base64::DecodeError) -> Self {
        AppError::Decode(format!("invalid base64: {}", err))
    }
}

/// Shorthand for Results using the application error type.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_category() {
        let err = AppError::Configuration("OPENAI_API_KEY not set".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: OPENAI_API_KEY not set"
        );
    }

    #[test]
    fn test_base64_error_converts_to_decode() {
        let err = crate::audio::codec::decode_base64("%%%").unwrap_err();
        let app_err: AppError = err.into();
        assert!(matches!(app_err, AppError::Decode(_)));
    }

    #[test]
    fn test_status_code_mapping() {
        use actix_web::http::StatusCode;
        assert_eq!(
            AppError::Transport("x".into()).error_response().status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::BadRequest("x".into()).error_response().status(),
            StatusCode::BAD_REQUEST
        );
    }
}
