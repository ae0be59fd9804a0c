//! Security configuration passed to the authentication components.

use chrono::Duration;

/// Argon2id cost parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordHashingConfig {
    /// Memory cost in KiB
    pub memory_kib: u32,
    /// Number of passes
    pub iterations: u32,
    /// Degree of parallelism
    pub parallelism: u32,
}

impl Default for PasswordHashingConfig {
    /// OWASP recommended minimum for Argon2id (19 MiB, 2 passes, 1 lane)
    fn default() -> Self {
        Self {
            memory_kib: 19 * 1024,
            iterations: 2,
            parallelism: 1,
        }
    }
}

/// Secrets, lifetimes and transport names for every token kind.
///
/// Each component receives this value at construction; nothing reads secrets
/// from the environment on its own.
#[derive(Debug, Clone)]
pub struct SecurityConfig {
    /// HS256 key for access tokens
    pub access_token_secret: String,
    /// HMAC key for refresh token hashes
    pub refresh_token_secret: String,
    /// HMAC key for password-reset token hashes
    pub password_token_secret: String,
    /// Access token lifetime
    pub access_token_ttl: Duration,
    /// Refresh token lifetime
    pub refresh_token_ttl: Duration,
    /// Password-reset token lifetime
    pub password_token_ttl: Duration,
    /// Cookie carrying the access token
    pub access_cookie_name: String,
    /// Cookie carrying the refresh token
    pub refresh_cookie_name: String,
    /// Whether cookies are flagged `Secure`
    pub secure_cookies: bool,
    /// Argon2 cost
    pub password_hashing: PasswordHashingConfig,
}

impl SecurityConfig {
    /// Configuration with placeholder secrets for local development
    ///
    /// Uses the production lifetimes: 15 minutes for access tokens, 7 days
    /// for refresh tokens and 15 minutes for reset tokens.
    pub fn development() -> Self {
        Self {
            access_token_secret: "dev_access_secret_change_in_production_0000".to_string(),
            refresh_token_secret: "dev_refresh_secret_change_in_production_000".to_string(),
            password_token_secret: "dev_password_secret_change_in_production_00".to_string(),
            access_token_ttl: Duration::minutes(15),
            refresh_token_ttl: Duration::days(7),
            password_token_ttl: Duration::minutes(15),
            access_cookie_name: "vdm_access".to_string(),
            refresh_cookie_name: "vdm_refresh".to_string(),
            secure_cookies: false,
            password_hashing: PasswordHashingConfig::default(),
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self::development()
    }
}
