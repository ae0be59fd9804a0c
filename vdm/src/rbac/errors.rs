//! Role mutation error types.

use thiserror::Error;

use super::models::RoleName;
use crate::db::DbError;
use crate::error::ErrorKind;

/// Role management errors
#[derive(Debug, Error)]
pub enum RoleError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    /// Malformed tag, unknown role name, or the administrator role as target
    #[error("Invalid user tag or role name")]
    InvalidInput,

    /// No user carries this tag
    #[error("User with tag {0} not found")]
    UserNotFound(String),

    /// Grant of a role the user already holds
    #[error("User with tag {tag} already has role {role}")]
    AlreadyGranted { tag: String, role: RoleName },

    /// Revoke of a role the user does not hold
    #[error("User with tag {tag} has no role {role}")]
    NotGranted { tag: String, role: RoleName },

    /// Target user is an administrator
    #[error("User with tag {0} is ADMIN")]
    AdminProtected(String),
}

impl RoleError {
    /// Caller-facing class of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            RoleError::Database(_) => ErrorKind::Internal,
            RoleError::InvalidInput => ErrorKind::BadRequest,
            RoleError::UserNotFound(_) => ErrorKind::NotFound,
            RoleError::AlreadyGranted { .. } | RoleError::NotGranted { .. } => ErrorKind::Conflict,
            RoleError::AdminProtected(_) => ErrorKind::Forbidden,
        }
    }

    /// Get a client-safe error message
    ///
    /// Database errors are sanitized; the rest only echo the caller's own input.
    pub fn client_message(&self) -> String {
        match self {
            RoleError::Database(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Result type for role operations
pub type RoleResult<T> = Result<T, RoleError>;
