//! API error handling.
//!
//! Structured error responses with proper HTTP status codes and request
//! tracking. Domain errors map onto the wire here; handlers never build
//! status codes by hand.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::LedgerError;

/// Top-level API error response with request tracking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub request_id: String,
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Error code (UNAUTHORIZED, VALIDATION_FAILED, etc.)
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details (can be any JSON)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[derive(Debug)]
pub struct ApiError {
    pub kind: LedgerError,
    pub request_id: String,
    /// Cookie to expire in the response, set when a presented token is
    /// rejected so the client does not keep replaying it.
    pub clear_cookie: Option<String>,
}

impl ApiError {
    pub fn new(request_id: impl Into<String>, kind: LedgerError) -> Self {
        Self {
            kind,
            request_id: request_id.into(),
            clear_cookie: None,
        }
    }

    pub fn unauthorized(request_id: impl Into<String>, cookie: &str) -> Self {
        Self {
            kind: LedgerError::Unauthorized,
            request_id: request_id.into(),
            clear_cookie: Some(cookie.to_string()),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.request_id, self.kind)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self.kind {
            LedgerError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_FAILED",
                "one or more fields failed validation".to_string(),
                Some(serde_json::json!(errors)),
            ),
            LedgerError::DuplicateUsername => (
                StatusCode::CONFLICT,
                "DUPLICATE_USERNAME",
                "username already exists".to_string(),
                None,
            ),
            LedgerError::DuplicateName => (
                StatusCode::CONFLICT,
                "DUPLICATE_NAME",
                "name already exists".to_string(),
                None,
            ),
            LedgerError::InsufficientBalance => (
                StatusCode::BAD_REQUEST,
                "INSUFFICIENT_BALANCE",
                "insufficient balance".to_string(),
                None,
            ),
            LedgerError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("{what} not found"),
                None,
            ),
            LedgerError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "authentication required".to_string(),
                None,
            ),
            LedgerError::Suspended => (
                StatusCode::UNAUTHORIZED,
                "ACCOUNT_SUSPENDED",
                "account is suspended".to_string(),
                None,
            ),
            LedgerError::Conflict => (
                StatusCode::CONFLICT,
                "WRITE_CONFLICT",
                "concurrent update, please retry".to_string(),
                None,
            ),
        };

        let body = Json(ErrorResponse {
            request_id: self.request_id,
            error: ErrorBody {
                code: code.to_string(),
                message,
                details,
            },
        });

        let mut response = (status, body).into_response();
        if let Some(cookie) = self.clear_cookie {
            let expired = format!("{cookie}=; Max-Age=0; HttpOnly; Path=/");
            if let Ok(value) = HeaderValue::from_str(&expired) {
                response.headers_mut().insert(header::SET_COOKIE, value);
            }
        }
        response
    }
}
