//! Common error types for tubeup.

use thiserror::Error;

/// HTTP statuses the upload loop treats as transient.
pub const TRANSIENT_STATUSES: [u16; 4] = [500, 502, 503, 504];

/// Top-level error type for tubeup operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The OAuth client registration file is missing or unusable.
    #[error("Missing app credential: {0}")]
    MissingAppCredential(String),

    /// The local video file does not exist.
    #[error("Video file not found: {0}")]
    FileNotFound(String),

    /// The user declined consent on the provider's page.
    #[error("Authorization denied: {0}")]
    AuthorizationDenied(String),

    /// The local callback address is not registered with the provider.
    #[error("Redirect URI mismatch: {0}")]
    RedirectMismatch(String),

    /// Token exchange, refresh or callback handling failed.
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// The remote service answered with a non-success status.
    #[error("HTTP error {status}: {message}")]
    Http {
        /// Status code returned by the service.
        status: u16,
        /// Response body or reason.
        message: String,
    },

    /// Transport-level failure (connect, TLS, body read).
    #[error("Network error: {0}")]
    Network(String),

    /// A response arrived but lacked the fields we need.
    #[error("Unexpected service response: {0}")]
    UnexpectedResponse(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Check whether the error is a transient HTTP failure worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Http { status, .. } if TRANSIENT_STATUSES.contains(status))
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;
