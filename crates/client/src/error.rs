//! Client error types

use crate::store::StoreError;
use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Message returned when an expired session could not be refreshed
pub const SESSION_EXPIRED_MESSAGE: &str = "Your session has expired. Please log in again.";

/// Substrings that mark a 401 message as a token problem worth refreshing.
///
/// Matching on free text is fragile: a business error that happens to mention
/// "token" will also trigger a refresh attempt.
const AUTH_ERROR_MARKERS: [&str; 4] = ["token", "expired", "unauthorized", "authentication"];

/// Client error types
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network or request error
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Access token expired and the refresh exchange failed
    #[error("{}", SESSION_EXPIRED_MESSAGE)]
    SessionExpired,

    /// 401 that is not recoverable through a token refresh
    #[error("{message}")]
    Unauthorized { message: String },

    /// Server rejected the payload with structured field errors
    #[error("{message}")]
    Validation { status: u16, message: String },

    /// Bad request
    #[error("{message}")]
    BadRequest { message: String },

    /// Forbidden
    #[error("{message}")]
    Forbidden { message: String },

    /// Resource not found
    #[error("{message}")]
    NotFound { message: String },

    /// Any other non-success status
    #[error("{message}")]
    Server { status: u16, message: String },

    /// Successful status with a payload that does not match the API envelope
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Token store could not be read or written
    #[error("Token store error: {0}")]
    Store(#[from] StoreError),
}

impl ClientError {
    /// Build an error from a non-success response and its parsed body
    pub fn from_response(status: StatusCode, body: &Value) -> Self {
        if let Some(message) = first_validation_error(body) {
            return Self::Validation {
                status: status.as_u16(),
                message: message.to_string(),
            };
        }

        let message = error_message(status, body);
        match status.as_u16() {
            400 => Self::BadRequest { message },
            401 => Self::Unauthorized { message },
            403 => Self::Forbidden { message },
            404 => Self::NotFound { message },
            code => Self::Server {
                status: code,
                message,
            },
        }
    }

    /// HTTP status behind this error, when the server produced one
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::SessionExpired | Self::Unauthorized { .. } => Some(401),
            Self::Validation { status, .. } | Self::Server { status, .. } => Some(*status),
            Self::BadRequest { .. } => Some(400),
            Self::Forbidden { .. } => Some(403),
            Self::NotFound { .. } => Some(404),
            Self::Request(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether the caller has to log in again
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::SessionExpired)
    }
}

/// Human-readable message for a failed response.
///
/// Priority: first `errors[].message`, then `message`, then `error`, then a
/// generic status line.
pub fn error_message(status: StatusCode, body: &Value) -> String {
    first_validation_error(body)
        .or_else(|| body.get("message").and_then(Value::as_str))
        .or_else(|| body.get("error").and_then(Value::as_str))
        .map_or_else(
            || format!("Request failed with status {}", status.as_u16()),
            str::to_string,
        )
}

/// Whether a 401 message describes an expired or invalid token
pub fn is_auth_error(message: &str) -> bool {
    let message = message.to_lowercase();
    AUTH_ERROR_MARKERS
        .iter()
        .any(|marker| message.contains(marker))
}

fn first_validation_error(body: &Value) -> Option<&str> {
    body.get("errors")?
        .as_array()?
        .first()?
        .get("message")?
        .as_str()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn validation_error_message_wins() {
        let body = json!({
            "message": "Validation failed",
            "errors": [{ "field": "email", "message": "Email is required" }]
        });
        let err = ClientError::from_response(StatusCode::UNPROCESSABLE_ENTITY, &body);

        assert!(matches!(err, ClientError::Validation { status: 422, .. }));
        assert_eq!(err.to_string(), "Email is required");
    }

    #[test]
    fn server_message_used_without_errors_array() {
        let body = json!({ "message": "Workspace not found" });
        let err = ClientError::from_response(StatusCode::NOT_FOUND, &body);

        assert!(matches!(err, ClientError::NotFound { .. }));
        assert_eq!(err.to_string(), "Workspace not found");
    }

    #[test]
    fn error_field_and_generic_fallback() {
        let body = json!({ "error": "Booking slot taken" });
        assert_eq!(
            error_message(StatusCode::CONFLICT, &body),
            "Booking slot taken"
        );

        let empty = json!({});
        let err = ClientError::from_response(StatusCode::INTERNAL_SERVER_ERROR, &empty);
        assert_eq!(err.to_string(), "Request failed with status 500");
        assert_eq!(err.status(), Some(500));
    }

    #[test]
    fn empty_errors_array_falls_through() {
        let body = json!({ "errors": [], "message": "Nope" });
        let err = ClientError::from_response(StatusCode::BAD_REQUEST, &body);
        assert!(matches!(err, ClientError::BadRequest { .. }));
        assert_eq!(err.to_string(), "Nope");
    }

    #[test]
    fn auth_error_classification_is_case_insensitive() {
        assert!(is_auth_error("Token expired"));
        assert!(is_auth_error("JWT EXPIRED"));
        assert!(is_auth_error("Unauthorized"));
        assert!(is_auth_error("Authentication required"));
        assert!(!is_auth_error("Invalid credentials"));
        assert!(!is_auth_error("Request failed with status 401"));
    }

    #[test]
    fn session_expired_message() {
        let err = ClientError::SessionExpired;
        assert_eq!(err.to_string(), SESSION_EXPIRED_MESSAGE);
        assert!(err.is_auth_expired());
        assert_eq!(err.status(), Some(401));
    }
}
