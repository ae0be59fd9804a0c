//! Authentication data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::rbac::RoleName;

/// User ID type
pub type UserId = Uuid;

/// User model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub tag: String,
    /// Argon2 PHC string, never the plaintext
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub roles: Vec<RoleName>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Returns `true` if the user holds the given role.
    pub fn has_role(&self, role: RoleName) -> bool {
        self.roles.contains(&role)
    }
}

/// Category of a stored user token.
///
/// Refresh and password-reset tokens share one table; the category keeps the
/// "at most one live token per user" invariant separate for each kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
    Refresh,
    PasswordReset,
}

impl TokenKind {
    /// Value stored in `user_tokens.category`
    pub fn as_str(self) -> &'static str {
        match self {
            TokenKind::Refresh => "REFRESH",
            TokenKind::PasswordReset => "PASSWORD",
        }
    }
}

/// A token row about to be persisted.
///
/// Holds the keyed hash of the secret; the raw secret only ever leaves the
/// process through the client (cookie) or the mail collaborator.
#[derive(Debug, Clone)]
pub struct NewUserToken {
    pub user_id: UserId,
    pub kind: TokenKind,
    pub hash: String,
    pub expiry: DateTime<Utc>,
}

/// JWT claims for access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    pub sub: UserId,
    pub iat: i64,
    pub exp: i64,
}

/// Tokens handed to the client after sign-in or refresh
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionTokens {
    pub access_token: String,
    pub access_expiry: DateTime<Utc>,
    pub refresh_token: String,
    pub refresh_expiry: DateTime<Utc>,
}

/// Result of a successful sign-in or refresh
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: UserId,
    pub tag: String,
    pub roles: Vec<RoleName>,
    pub tokens: SessionTokens,
}

/// Sign-in request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

/// Verified identity of the caller for the lifetime of one request.
///
/// `roles` is `None` until a guard that needs them has loaded them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthedUser {
    pub id: UserId,
    pub roles: Option<Vec<RoleName>>,
}

impl AuthedUser {
    /// Identity resolved from an access token, roles not yet loaded
    pub fn from_claims(claims: &AccessTokenClaims) -> Self {
        Self {
            id: claims.sub,
            roles: None,
        }
    }

    /// Returns `true` if roles are loaded and contain `role`.
    pub fn has_role(&self, role: RoleName) -> bool {
        self.roles.as_ref().is_some_and(|roles| roles.contains(&role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_kind_categories() {
        assert_eq!(TokenKind::Refresh.as_str(), "REFRESH");
        assert_eq!(TokenKind::PasswordReset.as_str(), "PASSWORD");
    }

    #[test]
    fn test_user_serialization_hides_password_hash() {
        let user = User {
            id: Uuid::new_v4(),
            email: "user@test.com".to_string(),
            tag: "user0123".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            roles: vec![RoleName::Moderator],
            created_at: Utc::now(),
        };

        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("argon2"));
        assert!(json.contains("MODERATOR"));
    }

    #[test]
    fn test_authed_user_roles_not_loaded() {
        let claims = AccessTokenClaims {
            sub: Uuid::new_v4(),
            iat: 0,
            exp: 60,
        };
        let mut authed = AuthedUser::from_claims(&claims);
        assert_eq!(authed.id, claims.sub);
        assert!(!authed.has_role(RoleName::Admin));

        authed.roles = Some(vec![RoleName::Admin]);
        assert!(authed.has_role(RoleName::Admin));
    }
}
