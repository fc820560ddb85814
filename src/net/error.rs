//! Errors surfaced by the network layer.

use serde_json::Value;

/// Errors produced by requests through the authenticated client.
///
/// `Clone` so one shared refresh outcome can be handed to every waiter.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ApiError {
    /// No response reached the client (connect failure, timeout, reset).
    #[error("network error: {0}")]
    Network(String),

    /// The backend answered with a non-success status. `body` is the
    /// decoded JSON payload, kept verbatim for validation messages.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: Value },

    /// A success response body did not match the expected shape.
    #[error("response decode failed: {0}")]
    Decode(String),

    /// The refresh endpoint answered 2xx without an `access` field.
    #[error("refresh response did not include an access token")]
    MissingAccess,

    /// Refresh refused or discarded because the session was logged out.
    #[error("session is logged out")]
    LoggedOut,

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl ApiError {
    /// HTTP status for `Status` errors.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    /// Response body for `Status` errors, e.g. field errors from a 400.
    #[must_use]
    pub fn body(&self) -> Option<&Value> {
        match self {
            Self::Status { body, .. } => Some(body),
            _ => None,
        }
    }
}
