//! Authentication error types.

use thiserror::Error;

use crate::auth::jwt::TokenError;
use crate::db::DbError;
use crate::error::ErrorKind;

/// Authentication errors
#[derive(Debug, Error)]
pub enum AuthError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    /// Password hashing failed
    #[error("Password hashing failed")]
    HashingFailed,

    /// Unknown email or wrong password; the two are never told apart
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Access token rejected
    #[error("Invalid access token: {0}")]
    InvalidAccessToken(#[from] TokenError),

    /// Access token could not be signed
    #[error("Token signing failed: {0}")]
    SigningFailed(String),

    /// Refresh secret unknown, expired or already rotated
    #[error("Invalid refresh token")]
    InvalidRefreshToken,

    /// Reset secret unknown, expired or already consumed
    #[error("Invalid or expired reset token")]
    InvalidResetToken,

    /// Token referenced a user that no longer exists
    #[error("User not found")]
    UserNotFound,

    /// Password too weak
    #[error("Password too weak: {0}")]
    WeakPassword(String),
}

impl AuthError {
    /// Caller-facing class of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::InvalidCredentials
            | AuthError::InvalidAccessToken(_)
            | AuthError::InvalidRefreshToken
            | AuthError::InvalidResetToken
            | AuthError::UserNotFound => ErrorKind::Unauthorized,
            AuthError::WeakPassword(_) => ErrorKind::BadRequest,
            AuthError::Database(_)
            | AuthError::HashingFailed
            | AuthError::SigningFailed(_) => ErrorKind::Internal,
        }
    }

    /// Get a client-safe error message that doesn't leak sensitive information
    ///
    /// Every unauthorized outcome yields the same message, so callers cannot
    /// tell an unknown account from a wrong secret or an expired token.
    pub fn client_message(&self) -> String {
        match self.kind() {
            ErrorKind::Unauthorized => "Unauthorized".to_string(),
            ErrorKind::Internal => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Result type for authentication operations
pub type AuthResult<T> = Result<T, AuthError>;
