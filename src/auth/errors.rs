//! # Auth Errors
//!
//! Error types for the API-key gate.

use thiserror::Error;

/// Result type for auth operations
pub type AuthResult<T> = Result<T, AuthError>;

/// API-key errors
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    // ==================
    // Request Errors
    // ==================
    /// No key on the request
    #[error("API key is missing")]
    MissingKey,

    /// Key is unknown or revoked (generic - don't leak which)
    #[error("API key is invalid")]
    InvalidKey,

    /// Key is past its expiry
    #[error("API key has expired")]
    ExpiredKey,

    // ==================
    // Management Errors
    // ==================
    /// No key with this id
    #[error("API key not found: {0}")]
    KeyNotFound(String),

    /// Key name is empty
    #[error("Invalid key name: {0}")]
    InvalidName(String),

    // ==================
    // Internal Errors
    // ==================
    /// Storage operation failed
    #[error("Storage error: {0}")]
    StorageError(String),
}

impl AuthError {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request
            AuthError::InvalidName(_) => 400,

            // 401 Unauthorized
            AuthError::MissingKey => 401,
            AuthError::InvalidKey => 401,
            AuthError::ExpiredKey => 401,

            // 404 Not Found
            AuthError::KeyNotFound(_) => 404,

            // 500 Internal Server Error
            AuthError::StorageError(_) => 500,
        }
    }

    /// Returns whether this error should be logged at warn level
    pub fn is_client_error(&self) -> bool {
        self.status_code() < 500
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(AuthError::MissingKey.status_code(), 401);
        assert_eq!(AuthError::ExpiredKey.status_code(), 401);
        assert_eq!(AuthError::KeyNotFound("x".to_string()).status_code(), 404);
        assert_eq!(AuthError::StorageError("x".to_string()).status_code(), 500);
        assert!(!AuthError::StorageError("x".to_string()).is_client_error());
    }

    #[test]
    fn test_invalid_key_does_not_leak_revocation() {
        let err = AuthError::InvalidKey;
        assert!(!err.to_string().contains("revoked"));
    }
}
