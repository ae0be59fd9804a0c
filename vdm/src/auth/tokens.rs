//! Opaque token secrets and their keyed hashes.
//!
//! Refresh and reset secrets are random bytes handed to the client as hex.
//! Only `HMAC-SHA256(key, secret)` is stored, with one key per token kind, so
//! a leaked `user_tokens` table cannot be replayed and a refresh secret can
//! never be presented as a reset secret.

use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

use super::errors::{AuthError, AuthResult};

type HmacSha256 = Hmac<Sha256>;

/// Length of a raw secret in bytes
pub const SECRET_LEN: usize = 32;

/// Generate a new random secret, hex-encoded
pub fn generate_secret() -> String {
    let mut bytes = [0u8; SECRET_LEN];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Keyed one-way hash for one token kind
#[derive(Clone)]
pub struct TokenHasher {
    key: Vec<u8>,
}

impl TokenHasher {
    pub fn new(key: &str) -> Self {
        Self {
            key: key.as_bytes().to_vec(),
        }
    }

    /// Hash a raw secret for storage or lookup
    pub fn hash(&self, secret: &str) -> AuthResult<String> {
        let mut mac = HmacSha256::new_from_slice(&self.key).map_err(|_| AuthError::HashingFailed)?;
        mac.update(secret.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Generate a secret and its hash in one step
    pub fn generate(&self) -> AuthResult<(String, String)> {
        let secret = generate_secret();
        let hash = self.hash(&secret)?;
        Ok((secret, hash))
    }
}
