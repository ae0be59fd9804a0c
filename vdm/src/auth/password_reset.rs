//! Single-use password-reset tokens and the password update they authorize.

use chrono::Utc;
use std::sync::Arc;

use super::{
    config::SecurityConfig,
    errors::{AuthError, AuthResult},
    models::{NewUserToken, TokenKind, User, UserId},
    password::{CredentialVerifier, validate_password},
    tokens::TokenHasher,
};
use crate::db::AuthRepository;
use crate::mail::Mailer;

/// Issues, delivers and redeems password-reset tokens
#[derive(Clone)]
pub struct PasswordResetManager {
    repo: Arc<dyn AuthRepository>,
    mailer: Arc<dyn Mailer>,
    verifier: CredentialVerifier,
    hasher: TokenHasher,
    token_ttl: chrono::Duration,
    client_url: String,
}

impl PasswordResetManager {
    /// Create a reset manager.
    ///
    /// `client_url` is the front-end origin the emailed link points at.
    pub fn new(
        repo: Arc<dyn AuthRepository>,
        mailer: Arc<dyn Mailer>,
        config: &SecurityConfig,
        client_url: impl Into<String>,
    ) -> AuthResult<Self> {
        Ok(Self {
            repo,
            mailer,
            verifier: CredentialVerifier::new(config.password_hashing)?,
            hasher: TokenHasher::new(&config.password_token_secret),
            token_ttl: config.password_token_ttl,
            client_url: client_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Issue a reset token for `user`, replacing any earlier one.
    ///
    /// Returns the raw secret; only its keyed hash is stored.
    pub async fn issue(&self, user: &User) -> AuthResult<String> {
        let (secret, hash) = self.hasher.generate()?;

        self.repo
            .replace_token(&NewUserToken {
                user_id: user.id,
                kind: TokenKind::PasswordReset,
                hash,
                expiry: Utc::now() + self.token_ttl,
            })
            .await?;

        Ok(secret)
    }

    /// Redeem a reset secret, returning its owner.
    ///
    /// # Errors
    ///
    /// * `AuthError::InvalidResetToken` - Unknown, expired or already used
    pub async fn consume(&self, secret: &str) -> AuthResult<UserId> {
        if secret.is_empty() {
            return Err(AuthError::InvalidResetToken);
        }

        let hash = self.hasher.hash(secret)?;
        self.repo
            .consume_token(TokenKind::PasswordReset, &hash)
            .await?
            .ok_or(AuthError::InvalidResetToken)
    }

    /// Start a reset for `email`.
    ///
    /// Succeeds whether or not the address belongs to a user. A delivery
    /// failure is logged and not reported, so the outcome never reveals
    /// whether the account exists.
    ///
    /// # Errors
    ///
    /// * `AuthError::Database` - User lookup or token persistence failed
    pub async fn inquire(&self, email: &str) -> AuthResult<()> {
        let Some(user) = self.repo.find_user_by_email(email).await? else {
            log::debug!("Password reset requested for unknown email");
            return Ok(());
        };

        let secret = self.issue(&user).await?;
        let link = self.reset_link(&secret);

        match self.mailer.send_password_reset(&user.email, &link).await {
            Ok(()) => log::info!("Password reset issued for user {}", user.id),
            Err(e) => log::error!("Failed to deliver reset link for user {}: {e}", user.id),
        }
        Ok(())
    }

    /// Set a new password using a reset secret.
    ///
    /// The strength check runs first so a weak password leaves the token
    /// usable; the Argon2 hash runs only once the token has been redeemed.
    /// Every refresh session of the user ends in the same transaction.
    ///
    /// # Errors
    ///
    /// * `AuthError::WeakPassword` - New password fails the strength rules
    /// * `AuthError::InvalidResetToken` - Unknown, expired or already used
    pub async fn update_password(&self, secret: &str, new_password: &str) -> AuthResult<()> {
        validate_password(new_password)?;
        let user_id = self.consume(secret).await?;

        let password_hash = self.verifier.hash(new_password)?;
        self.repo.update_password(user_id, &password_hash).await?;

        log::info!("Password updated for user {user_id}");
        Ok(())
    }

    fn reset_link(&self, secret: &str) -> String {
        format!("{}/password-update?token={secret}", self.client_url)
    }
}
