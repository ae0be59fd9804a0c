//! Access token codec.
//!
//! Access tokens are stateless HS256 JWTs carrying only the subject id,
//! issue time and expiry. They are never looked up in the database: a token
//! stays valid until its `exp`, so the short access TTL bounds how long a
//! revoked account can keep acting.

use chrono::{DateTime, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
    errors::ErrorKind as JwtErrorKind,
};
use thiserror::Error;

use super::errors::{AuthError, AuthResult};
use super::models::{AccessTokenClaims, UserId};

/// Why an access token was rejected.
///
/// All variants are reported to the caller as the same unauthorized outcome;
/// the distinction only feeds server-side diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("signature mismatch")]
    BadSignature,
    #[error("token expired")]
    Expired,
}

/// Issues and verifies access tokens with a symmetric secret.
#[derive(Clone)]
pub struct AccessTokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl AccessTokenCodec {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Sign a token for `user_id` that expires at `expiry`
    pub fn issue(&self, user_id: UserId, expiry: DateTime<Utc>) -> AuthResult<String> {
        let claims = AccessTokenClaims {
            sub: user_id,
            iat: Utc::now().timestamp(),
            exp: expiry.timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::SigningFailed(e.to_string()))
    }

    /// Verify signature and expiry, returning the embedded claims
    pub fn verify(&self, token: &str) -> Result<AccessTokenClaims, TokenError> {
        decode::<AccessTokenClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                JwtErrorKind::ExpiredSignature => TokenError::Expired,
                JwtErrorKind::InvalidSignature => TokenError::BadSignature,
                _ => TokenError::Malformed,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use uuid::Uuid;

    const SECRET: &str = "test_access_secret_with_enough_entropy_000";

    #[test]
    fn test_issue_and_verify() {
        let codec = AccessTokenCodec::new(SECRET);
        let user_id = Uuid::new_v4();
        let expiry = Utc::now() + Duration::minutes(1);

        let token = codec.issue(user_id, expiry).unwrap();
        let claims = codec.verify(&token).unwrap();

        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.exp, expiry.timestamp());
        assert!(claims.iat <= claims.exp);
    }

    #[test]
    fn test_expired_token_rejected() {
        let codec = AccessTokenCodec::new(SECRET);
        let token = codec
            .issue(Uuid::new_v4(), Utc::now() - Duration::minutes(1))
            .unwrap();

        assert_eq!(codec.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn test_different_secret_rejected() {
        let issuer = AccessTokenCodec::new(SECRET);
        let verifier = AccessTokenCodec::new("another_secret_with_enough_entropy_0000000");
        let token = issuer
            .issue(Uuid::new_v4(), Utc::now() + Duration::minutes(1))
            .unwrap();

        assert_eq!(verifier.verify(&token), Err(TokenError::BadSignature));
    }

    #[test]
    fn test_malformed_token_rejected() {
        let codec = AccessTokenCodec::new(SECRET);
        assert_eq!(codec.verify("invalid.token.here"), Err(TokenError::Malformed));
        assert_eq!(codec.verify(""), Err(TokenError::Malformed));
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let codec = AccessTokenCodec::new(SECRET);
        let token = codec
            .issue(Uuid::new_v4(), Utc::now() + Duration::minutes(1))
            .unwrap();
        let other = codec
            .issue(Uuid::new_v4(), Utc::now() + Duration::minutes(1))
            .unwrap();

        // Header and signature of one token around the payload of another
        let parts: Vec<&str> = token.split('.').collect();
        let other_parts: Vec<&str> = other.split('.').collect();
        let forged = format!("{}.{}.{}", parts[0], other_parts[1], parts[2]);

        assert_eq!(codec.verify(&forged), Err(TokenError::BadSignature));
    }
}
