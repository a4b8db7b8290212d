//! Error types for the finance API client.
//!
//! # Design
//! `NotFound` and `BackendUnavailable` get dedicated variants because callers
//! branch on them: a missing record is rendered differently from a server
//! failure, and an unreachable backend switches views to sample data. Every
//! other non-2xx response lands in `Server` with the server's own message
//! when it sent one.

use thiserror::Error;

use crate::storage::StorageError;

/// Errors returned by the API client and the session store.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Form input was rejected before any request was built.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The server returned 404.
    #[error("resource not found")]
    NotFound,

    /// The server returned a non-2xx status other than 404.
    #[error("{message}")]
    Server { status: u16, message: String },

    /// The request never produced a response: connection refused, DNS
    /// failure or timeout.
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ApiError {
    pub fn is_backend_unavailable(&self) -> bool {
        matches!(self, ApiError::BackendUnavailable(_))
    }

    /// HTTP status for errors that came back from the server.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::NotFound => Some(404),
            ApiError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<TransportError> for ApiError {
    fn from(err: TransportError) -> Self {
        ApiError::BackendUnavailable(err.to_string())
    }
}

/// Client-side form validation failures. Never sent to the network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("{0} is not a valid email address")]
    InvalidEmail(String),

    #[error("password must be at least {min} characters")]
    PasswordTooShort { min: usize },

    #[error("passwords do not match")]
    PasswordMismatch,

    #[error("{field} must be positive")]
    NotPositive { field: &'static str },
}

/// Failures below the HTTP layer, reported by a `Transport`.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connection(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_error_displays_message_verbatim() {
        let err = ApiError::Server {
            status: 401,
            message: "Invalid credentials".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid credentials");
        assert_eq!(err.status(), Some(401));
    }

    #[test]
    fn transport_errors_collapse_into_backend_unavailable() {
        let err: ApiError = TransportError::Timeout.into();
        assert!(err.is_backend_unavailable());
        assert_eq!(err.status(), None);
    }

    #[test]
    fn validation_error_is_transparent() {
        let err: ApiError = ValidationError::PasswordMismatch.into();
        assert_eq!(err.to_string(), "passwords do not match");
    }
}
