//! Error types for the visibility service.

use thiserror::Error;

use crate::directory::DirectoryError;

/// Error type for visibility operations.
///
/// Bad *rule* data never surfaces here; it is resolved by the configured
/// malformed-rule policy. Only infrastructure failures and cancellation do.
#[derive(Debug, Error)]
pub enum VisibilityError {
    /// The user directory or group membership store failed.
    #[error("User resolution failed: {0}")]
    Directory(#[from] DirectoryError),

    /// The caller cancelled the request while the user lookup was outstanding.
    #[error("Visibility evaluation cancelled")]
    Cancelled,

    /// Page content is not a JSON array of widgets.
    #[error("Content is not a JSON widget array: {0}")]
    InvalidContent(String),
}

/// Result type for visibility operations.
pub type Result<T> = std::result::Result<T, VisibilityError>;
