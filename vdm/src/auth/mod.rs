//! Authentication module providing sign-in, session rotation and password reset.
//!
//! This module implements:
//! - Argon2id credential verification with a decoy path for unknown emails
//! - HS256 access tokens, verified statelessly
//! - Rotating refresh tokens, stored only as keyed HMAC-SHA256 hashes
//! - Single-use password-reset tokens delivered through a [`Mailer`](crate::mail::Mailer)
//!
//! ## Example
//!
//! ```no_run
//! use vdm::auth::{AuthManager, SecurityConfig, SignInRequest};
//! use vdm::db::{Database, DatabaseConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::new(&DatabaseConfig::development()).await?;
//!     let auth = AuthManager::new(Arc::new(db.auth_repository()), &SecurityConfig::development())?;
//!
//!     let session = auth
//!         .sign_in(SignInRequest {
//!             email: "admin@vdm.local".to_string(),
//!             password: "Test123!".to_string(),
//!         })
//!         .await?;
//!     println!("Signed in as {} with roles {:?}", session.tag, session.roles);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod errors;
pub mod jwt;
pub mod manager;
pub mod models;
pub mod password;
pub mod password_reset;
pub mod tokens;

pub use config::{PasswordHashingConfig, SecurityConfig};
pub use errors::{AuthError, AuthResult};
pub use jwt::{AccessTokenCodec, TokenError};
pub use manager::AuthManager;
pub use models::{
    AccessTokenClaims, AuthedUser, NewUserToken, Session, SessionTokens, SignInRequest, TokenKind,
    User, UserId,
};
pub use password::{CredentialVerifier, validate_password};
pub use password_reset::PasswordResetManager;
pub use tokens::TokenHasher;
