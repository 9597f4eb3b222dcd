use std::fmt;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use super::{host::HostError, ticket::ValidationError};

#[derive(Debug)]
pub enum AuthError {
    /// Ticket validation failed: transport error, timeout, rejection by the
    /// SSO service, or a malformed validation response
    ValidationFailed(ValidationError),

    /// The SSO service vouched for an empty principal
    EmptyPrincipal,

    /// The host boundary failed while the bridge was delegating to it
    Security(HostError),

    /// Internal error in the bridge itself
    #[allow(dead_code)] // Error variant for route-level failures
    Internal(String),
}

/// Error body shape shared by all failure responses.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Serialize)]
struct ErrorDetail {
    #[serde(rename = "type")]
    kind: &'static str,
    code: &'static str,
    message: String,
}

impl ErrorBody {
    fn new(kind: &'static str, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                kind,
                code,
                message: message.into(),
            },
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AuthError::ValidationFailed(cause) => (
                StatusCode::UNAUTHORIZED,
                "validation_failed",
                format!("Service ticket validation failed: {}", cause),
            ),
            AuthError::EmptyPrincipal => (
                StatusCode::UNAUTHORIZED,
                "empty_principal",
                "Service ticket validated but no principal was asserted".to_string(),
            ),
            AuthError::Security(cause) => (
                StatusCode::BAD_GATEWAY,
                "host_unreachable",
                format!("Host authentication boundary failed: {}", cause),
            ),
            AuthError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                msg.clone(),
            ),
        };

        let body = ErrorBody::new("authentication_error", code, message);
        (status, Json(body)).into_response()
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::ValidationFailed(cause) => {
                write!(f, "Service ticket validation failed: {}", cause)
            }
            AuthError::EmptyPrincipal => {
                write!(f, "Service ticket validated but no principal was asserted")
            }
            AuthError::Security(cause) => {
                write!(f, "Host authentication boundary failed: {}", cause)
            }
            AuthError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AuthError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AuthError::ValidationFailed(cause) => Some(cause),
            AuthError::Security(cause) => Some(cause),
            _ => None,
        }
    }
}
