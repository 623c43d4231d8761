//! Error types for the Context Memory client.
//!
//! # Design
//! Every error derived from an HTTP exchange carries the same `ErrorDetail`
//! payload (message, status code, raw body) so callers can log or inspect it
//! uniformly. The variant tells *which* failure mode occurred; `RateLimit`
//! additionally carries the server's retry hint. `Request` is the catch-all
//! kind: unmatched 4xx/5xx statuses, plain 403 Forbidden, and transport
//! failures that never produced a response.

use std::fmt;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ApiError>;

/// Payload shared by every HTTP-derived error kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDetail {
    pub message: String,
    pub status: Option<u16>,
    pub body: Option<String>,
}

impl ErrorDetail {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
            body: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        let body = body.into();
        if !body.is_empty() {
            self.body = Some(body);
        }
        self
    }
}

impl fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} (HTTP {status})", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Errors returned by `ContextMemory` operations.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or rejected API key (HTTP 401, or no key at construction).
    #[error("authentication failed: {0}")]
    Authentication(ErrorDetail),

    /// Request throttled (HTTP 429). `retry_after` is in seconds.
    #[error("rate limited: {detail}")]
    RateLimit {
        detail: ErrorDetail,
        retry_after: Option<u64>,
    },

    /// The addressed namespace or entry does not exist (HTTP 404).
    #[error("not found: {0}")]
    NotFound(ErrorDetail),

    /// The server rejected the request payload (HTTP 422).
    #[error("validation failed: {0}")]
    Validation(ErrorDetail),

    /// An account quota is exhausted (HTTP 403 with a `limit` field).
    #[error("limit exceeded: {0}")]
    LimitExceeded(ErrorDetail),

    /// Any other failure: unmatched error status, plain 403, or transport.
    #[error("{0}")]
    Request(ErrorDetail),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// A success response body could not be decoded into the expected type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),
}

impl ApiError {
    /// Wrap a transport failure that happened before any response arrived.
    pub fn request_failed(cause: impl fmt::Display) -> Self {
        ApiError::Request(ErrorDetail::new(format!("Request failed: {cause}")))
    }

    /// The shared payload, absent for the (de)serialization variants.
    pub fn detail(&self) -> Option<&ErrorDetail> {
        match self {
            ApiError::Authentication(d)
            | ApiError::NotFound(d)
            | ApiError::Validation(d)
            | ApiError::LimitExceeded(d)
            | ApiError::Request(d) => Some(d),
            ApiError::RateLimit { detail, .. } => Some(detail),
            ApiError::Serialization(_) | ApiError::Deserialization(_) => None,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ApiError::Serialization(msg) | ApiError::Deserialization(msg) => msg,
            other => other.detail().map(|d| d.message.as_str()).unwrap_or_default(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        self.detail().and_then(|d| d.status)
    }

    pub fn body(&self) -> Option<&str> {
        self.detail().and_then(|d| d.body.as_deref())
    }

    /// Seconds the server asked us to wait; only set on `RateLimit`.
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            ApiError::RateLimit { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}
