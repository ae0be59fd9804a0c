//! Caller-facing error taxonomy.
//!
//! Every module error in this crate collapses into exactly one [`ErrorKind`]
//! at the flow-controller / guard boundary. The HTTP layer maps kinds to
//! status codes; nothing below that boundary reaches the caller verbatim.

use serde::Serialize;
use std::fmt;

/// Outcome class of a failed operation, as observed by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad credentials, bad/expired/rotated token, bad/expired reset token.
    Unauthorized,
    /// Malformed input such as an unknown role name or a short tag.
    BadRequest,
    /// The referenced user does not exist.
    NotFound,
    /// The state already satisfies the opposite of the requested change.
    Conflict,
    /// The change would violate a protection invariant.
    Forbidden,
    /// Persistence, signing or delivery failure not caused by the caller.
    Internal,
}

impl ErrorKind {
    /// HTTP status code associated with this kind.
    pub fn status_code(self) -> u16 {
        match self {
            ErrorKind::Unauthorized => 401,
            ErrorKind::BadRequest => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::Forbidden => 403,
            ErrorKind::Internal => 500,
        }
    }

    /// Whether the failure should be logged with full detail server-side.
    pub fn is_internal(self) -> bool {
        matches!(self, ErrorKind::Internal)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::BadRequest => "bad request",
            ErrorKind::NotFound => "not found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::Internal => "internal error",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ErrorKind::Unauthorized.status_code(), 401);
        assert_eq!(ErrorKind::BadRequest.status_code(), 400);
        assert_eq!(ErrorKind::NotFound.status_code(), 404);
        assert_eq!(ErrorKind::Conflict.status_code(), 409);
        assert_eq!(ErrorKind::Forbidden.status_code(), 403);
        assert_eq!(ErrorKind::Internal.status_code(), 500);
    }

    #[test]
    fn test_only_internal_is_internal() {
        assert!(ErrorKind::Internal.is_internal());
        assert!(!ErrorKind::Unauthorized.is_internal());
        assert!(!ErrorKind::Conflict.is_internal());
    }
}
