//! Error types for the accounting API client.
//!
//! # Design
//! Every failed exchange surfaces as `ApiError` inside `Response::Failure`.
//! `TypeMismatch` means the service answered with valid JSON of the wrong
//! shape; `Service` means the exchange itself failed. Missing or malformed
//! pagination and rate-limit headers are never errors.

use thiserror::Error;

use crate::resource::Resource;
use crate::response::Shape;

/// Errors carried by `Response::Failure`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    /// The body decoded, but not into the shape the call site expected.
    #[error("expected {expected} in response, found {found}")]
    TypeMismatch { expected: Shape, found: Shape },

    /// The transport or the remote service reported a failure.
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// The resource does not accept this kind of operation.
    #[error("{resource} does not support {operation}")]
    UnsupportedOperation {
        resource: Resource,
        operation: &'static str,
    },
}

/// Failures reported by the transport or the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// The server returned 404.
    #[error("resource not found")]
    NotFound,

    /// The server returned a non-2xx status other than 404.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// No response was received.
    #[error("transport failed: {0}")]
    Transport(String),

    /// The response body was not valid JSON.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The request parameters could not be encoded.
    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl ApiError {
    /// HTTP status of the failed exchange, when the service answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Service(ServiceError::NotFound) => Some(404),
            ApiError::Service(ServiceError::Http { status, .. }) => Some(*status),
            _ => None,
        }
    }
}

/// Errors raised while assembling a `ClientConfig`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}
