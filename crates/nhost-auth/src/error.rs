//! Authentication error types.

use thiserror::Error;

/// Authentication error type.
///
/// Variants carry only their kind and a message so that a single in-flight
/// refresh outcome can be cloned out to every caller awaiting it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Sign-in rejected (bad email/password)
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// Refresh token rejected by the server (expired, revoked, consumed)
    #[error("Refresh token rejected: {0}")]
    RefreshRejected(String),

    /// No session available for the requested operation
    #[error("Not signed in")]
    NotSignedIn,

    /// Network-level failure (connect, DNS, 5xx)
    #[error("Network error: {0}")]
    Network(String),

    /// Request or connect timeout
    #[error("Operation timed out")]
    Timeout,

    /// Response body did not match the expected shape
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// Secure storage failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Invalid transition in the auth state machine
    #[error("Invalid auth state transition: {0}")]
    InvalidStateTransition(String),

    /// The client has been closed
    #[error("Auth client is closed")]
    Closed,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl AuthError {
    /// Returns true if the operation may be retried without changing state.
    ///
    /// Transient errors leave the current session intact; authentication
    /// rejections do not.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AuthError::Network(_) | AuthError::Timeout | AuthError::Malformed(_)
        )
    }
}

impl From<nhost_keystore::StorageError> for AuthError {
    fn from(e: nhost_keystore::StorageError) -> Self {
        AuthError::Storage(e.to_string())
    }
}

/// Result type alias using AuthError.
pub type AuthResult<T> = Result<T, AuthError>;
