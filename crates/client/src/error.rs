//! Client error type.

use thiserror::Error;

/// Errors raised by the storefront client and the cart session.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport failure or undecodable response body.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// A cart call was attempted without a bearer token.
    #[error("Not signed in")]
    Unauthenticated,

    /// Snapshot file could not be read or written.
    #[error("Snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot file did not hold a valid snapshot.
    #[error("Snapshot parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid client configuration.
    #[error("Invalid environment variable {0}: {1}")]
    Config(String, String),
}

impl ClientError {
    /// Whether the server rejected the bearer token.
    #[must_use]
    pub const fn is_auth_rejection(&self) -> bool {
        matches!(
            self,
            Self::Unauthenticated | Self::Status { status: 401 | 403, .. }
        )
    }
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
