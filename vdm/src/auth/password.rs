//! Credential verification and password hashing (Argon2id).

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use super::config::PasswordHashingConfig;
use super::errors::{AuthError, AuthResult};

/// Checks supplied passwords against stored Argon2 hashes.
#[derive(Clone)]
pub struct CredentialVerifier {
    argon2: Argon2<'static>,
    decoy_hash: String,
}

impl CredentialVerifier {
    /// Create a verifier with fixed cost parameters
    ///
    /// Computes a decoy hash once so that [`verify_decoy`](Self::verify_decoy)
    /// costs as much as a real verification.
    ///
    /// # Errors
    ///
    /// * `AuthError::HashingFailed` - Cost parameters rejected by Argon2
    pub fn new(config: PasswordHashingConfig) -> AuthResult<Self> {
        let params = Params::new(config.memory_kib, config.iterations, config.parallelism, None)
            .map_err(|_| AuthError::HashingFailed)?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let mut verifier = Self {
            argon2,
            decoy_hash: String::new(),
        };
        verifier.decoy_hash = verifier.hash("decoy-password-never-matches")?;
        Ok(verifier)
    }

    /// Hash a password with a fresh random salt
    pub fn hash(&self, password: &str) -> AuthResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        Ok(self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|_| AuthError::HashingFailed)?
            .to_string())
    }

    /// Returns `true` if `password` matches `stored_hash`.
    ///
    /// A stored hash that cannot be parsed never matches.
    pub fn verify(&self, stored_hash: &str, password: &str) -> bool {
        let Ok(parsed_hash) = PasswordHash::new(stored_hash) else {
            log::warn!("Stored password hash could not be parsed");
            return false;
        };

        self.argon2
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok()
    }

    /// Spend the same work as [`verify`](Self::verify) without a real account.
    ///
    /// Called for unknown emails so response time does not reveal whether an
    /// account exists. Always returns `false`.
    pub fn verify_decoy(&self, password: &str) -> bool {
        let _ = self.verify(&self.decoy_hash, password);
        false
    }
}

/// Validate password strength
///
/// At least 8 characters with one digit, one uppercase and one lowercase letter.
pub fn validate_password(password: &str) -> AuthResult<()> {
    if password.chars().count() < 8 {
        return Err(AuthError::WeakPassword(
            "Password must be at least 8 characters".to_string(),
        ));
    }

    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_uppercase = password.chars().any(|c| c.is_ascii_uppercase());
    let has_lowercase = password.chars().any(|c| c.is_ascii_lowercase());

    if !has_digit || !has_uppercase || !has_lowercase {
        return Err(AuthError::WeakPassword(
            "Password must contain at least one number, one uppercase and one lowercase letter"
                .to_string(),
        ));
    }

    Ok(())
}
