//! Authentication flow controller: sign-in, refresh rotation and sign-out.

use chrono::Utc;
use std::sync::Arc;

use super::{
    config::SecurityConfig,
    errors::{AuthError, AuthResult},
    jwt::AccessTokenCodec,
    models::{
        AccessTokenClaims, NewUserToken, Session, SessionTokens, SignInRequest, TokenKind, User,
        UserId,
    },
    password::CredentialVerifier,
    tokens::TokenHasher,
};
use crate::db::AuthRepository;

/// Authentication manager
#[derive(Clone)]
pub struct AuthManager {
    repo: Arc<dyn AuthRepository>,
    verifier: CredentialVerifier,
    access_codec: AccessTokenCodec,
    refresh_hasher: TokenHasher,
    access_token_ttl: chrono::Duration,
    refresh_token_ttl: chrono::Duration,
}

impl AuthManager {
    /// Create a new authentication manager
    ///
    /// # Arguments
    ///
    /// * `repo` - Persistence collaborator
    /// * `config` - Secrets and token lifetimes
    ///
    /// # Errors
    ///
    /// * `AuthError::HashingFailed` - Password hashing parameters are invalid
    pub fn new(repo: Arc<dyn AuthRepository>, config: &SecurityConfig) -> AuthResult<Self> {
        Ok(Self {
            repo,
            verifier: CredentialVerifier::new(config.password_hashing)?,
            access_codec: AccessTokenCodec::new(&config.access_token_secret),
            refresh_hasher: TokenHasher::new(&config.refresh_token_secret),
            access_token_ttl: config.access_token_ttl,
            refresh_token_ttl: config.refresh_token_ttl,
        })
    }

    /// Sign a user in with email and password
    ///
    /// Replaces any refresh token the user already had.
    ///
    /// # Errors
    ///
    /// * `AuthError::InvalidCredentials` - Unknown email or wrong password
    /// * `AuthError::Database` - Session could not be persisted
    pub async fn sign_in(&self, request: SignInRequest) -> AuthResult<Session> {
        let user = self.repo.find_user_by_email(&request.email).await?;

        let user = match user {
            Some(user) if self.verifier.verify(&user.password_hash, &request.password) => user,
            Some(user) => {
                log::debug!("Sign-in rejected for user {}: password mismatch", user.id);
                return Err(AuthError::InvalidCredentials);
            }
            None => {
                self.verifier.verify_decoy(&request.password);
                log::debug!("Sign-in rejected: unknown email");
                return Err(AuthError::InvalidCredentials);
            }
        };

        let (refresh_token, refresh_hash) = self.refresh_hasher.generate()?;
        let refresh_expiry = Utc::now() + self.refresh_token_ttl;

        self.repo
            .replace_token(&NewUserToken {
                user_id: user.id,
                kind: TokenKind::Refresh,
                hash: refresh_hash,
                expiry: refresh_expiry,
            })
            .await?;

        log::info!("User {} signed in", user.id);
        self.session_for(user, refresh_token, refresh_expiry)
    }

    /// Exchange a refresh secret for a new access token and refresh secret
    ///
    /// The presented secret is deleted in the same transaction that stores
    /// its replacement, so it can succeed at most once.
    ///
    /// # Errors
    ///
    /// * `AuthError::InvalidRefreshToken` - Unknown, expired or already rotated
    /// * `AuthError::Database` - Rotation transaction failed
    pub async fn refresh(&self, refresh_token: &str) -> AuthResult<Session> {
        if refresh_token.is_empty() {
            return Err(AuthError::InvalidRefreshToken);
        }

        let presented_hash = self.refresh_hasher.hash(refresh_token)?;
        let (next_token, next_hash) = self.refresh_hasher.generate()?;
        let next_expiry = Utc::now() + self.refresh_token_ttl;

        let user_id = self
            .repo
            .rotate_token(TokenKind::Refresh, &presented_hash, &next_hash, next_expiry)
            .await?
            .ok_or(AuthError::InvalidRefreshToken)?;

        let user = self
            .repo
            .find_user_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        log::debug!("Rotated refresh token for user {}", user.id);
        self.session_for(user, next_token, next_expiry)
    }

    /// End the user's refresh session
    ///
    /// Access tokens already issued stay valid until they expire.
    pub async fn sign_out(&self, user_id: UserId) -> AuthResult<()> {
        let deleted = self.repo.delete_tokens(user_id, TokenKind::Refresh).await?;
        log::info!("User {user_id} signed out ({deleted} refresh token(s) removed)");
        Ok(())
    }

    /// Verify an access token
    pub fn verify_access_token(&self, token: &str) -> AuthResult<AccessTokenClaims> {
        Ok(self.access_codec.verify(token)?)
    }

    fn session_for(
        &self,
        user: User,
        refresh_token: String,
        refresh_expiry: chrono::DateTime<Utc>,
    ) -> AuthResult<Session> {
        let access_expiry = Utc::now() + self.access_token_ttl;
        let access_token = self.access_codec.issue(user.id, access_expiry)?;

        Ok(Session {
            user_id: user.id,
            tag: user.tag,
            roles: user.roles,
            tokens: SessionTokens {
                access_token,
                access_expiry,
                refresh_token,
                refresh_expiry,
            },
        })
    }
}
