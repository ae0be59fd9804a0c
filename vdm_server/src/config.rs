//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddr};
use std::str::FromStr;

use vdm::auth::{PasswordHashingConfig, SecurityConfig};
use vdm::db::DatabaseConfig;
use vdm::rbac::{DEFAULT_MIN_TAG_LENGTH, RbacConfig};

/// Minimum length of every token secret (256-bit keys as hex or text)
pub const MIN_SECRET_LENGTH: usize = 32;

/// Longest accepted token lifetime (one year)
pub const MAX_TOKEN_TTL_SECS: i64 = 365 * 24 * 60 * 60;

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Token secrets, lifetimes and cookie settings
    pub security: SecurityConfig,
    /// Role mutation rules
    pub rbac: RbacConfig,
    /// Front-end origin, used for reset links and CORS
    pub client_url: String,
    /// Prometheus exporter address; metrics are off when unset
    pub metrics_bind: Option<SocketAddr>,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    /// * `database_url_override` - Optional database URL override (from CLI args)
    ///
    /// # Errors
    ///
    /// Returns error if required variables are missing or unparsable
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        database_url_override: Option<String>,
    ) -> Result<Self, ConfigError> {
        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::from_vars(&vars, bind_override, database_url_override)
    }

    /// Load configuration from an explicit variable map
    pub fn from_vars(
        vars: &HashMap<String, String>,
        bind_override: Option<SocketAddr>,
        database_url_override: Option<String>,
    ) -> Result<Self, ConfigError> {
        let env = Env(vars);

        let bind = match bind_override {
            Some(addr) => addr,
            None => env.parse_or(
                "SERVER_BIND",
                SocketAddr::from((Ipv4Addr::LOCALHOST, 8080)),
            )?,
        };

        let database_url = database_url_override
            .or_else(|| env.get("DATABASE_URL"))
            .unwrap_or_else(|| DatabaseConfig::development().database_url);

        let database = DatabaseConfig {
            max_connections: env.parse_or("DB_MAX_CONNECTIONS", 20)?,
            min_connections: env.parse_or("DB_MIN_CONNECTIONS", 2)?,
            connection_timeout_secs: env.parse_or("DB_CONNECTION_TIMEOUT_SECS", 5)?,
            idle_timeout_secs: env.parse_or("DB_IDLE_TIMEOUT_SECS", 300)?,
            max_lifetime_secs: env.parse_or("DB_MAX_LIFETIME_SECS", 1800)?,
            ..DatabaseConfig::with_url(database_url)
        };

        // Security configuration (REQUIRED)
        let defaults = SecurityConfig::development();
        let security = SecurityConfig {
            access_token_secret: env.require("ACCESS_TOKEN_SECRET")?,
            refresh_token_secret: env.require("REFRESH_TOKEN_SECRET")?,
            password_token_secret: env.require("PASSWORD_TOKEN_SECRET")?,
            access_token_ttl: env.ttl_or("ACCESS_TOKEN_TTL_SECS", 15 * 60)?,
            refresh_token_ttl: env.ttl_or("REFRESH_TOKEN_TTL_SECS", 7 * 24 * 60 * 60)?,
            password_token_ttl: env.ttl_or("PASSWORD_TOKEN_TTL_SECS", 15 * 60)?,
            access_cookie_name: env
                .get("ACCESS_COOKIE_NAME")
                .unwrap_or(defaults.access_cookie_name),
            refresh_cookie_name: env
                .get("REFRESH_COOKIE_NAME")
                .unwrap_or(defaults.refresh_cookie_name),
            secure_cookies: env.parse_or("SECURE_COOKIES", true)?,
            password_hashing: PasswordHashingConfig {
                memory_kib: env.parse_or("ARGON2_MEMORY_KIB", defaults.password_hashing.memory_kib)?,
                iterations: env.parse_or("ARGON2_ITERATIONS", defaults.password_hashing.iterations)?,
                parallelism: env
                    .parse_or("ARGON2_PARALLELISM", defaults.password_hashing.parallelism)?,
            },
        };

        let rbac = RbacConfig {
            min_tag_length: env.parse_or("RBAC_MIN_TAG_LENGTH", DEFAULT_MIN_TAG_LENGTH)?,
        };

        let client_url = env
            .get("CLIENT_URL")
            .unwrap_or_else(|| "http://localhost:5173".to_string());

        let metrics_bind = env
            .get("METRICS_BIND")
            .map(|raw| {
                raw.parse().map_err(|_| ConfigError::Invalid {
                    var: "METRICS_BIND".to_string(),
                    reason: format!("Not a socket address: {raw}"),
                })
            })
            .transpose()?;

        Ok(ServerConfig {
            bind,
            database,
            security,
            rbac,
            client_url,
            metrics_bind,
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        let secrets = [
            ("ACCESS_TOKEN_SECRET", &self.security.access_token_secret),
            ("REFRESH_TOKEN_SECRET", &self.security.refresh_token_secret),
            ("PASSWORD_TOKEN_SECRET", &self.security.password_token_secret),
        ];

        for (var, secret) in secrets {
            if secret.len() < MIN_SECRET_LENGTH {
                return Err(ConfigError::Invalid {
                    var: var.to_string(),
                    reason: format!("Must be at least {MIN_SECRET_LENGTH} characters"),
                });
            }
        }

        for (i, (var, secret)) in secrets.iter().enumerate() {
            if let Some((other, _)) = secrets[i + 1..].iter().find(|(_, s)| s == secret) {
                return Err(ConfigError::Invalid {
                    var: var.to_string(),
                    reason: format!("Must differ from {other}"),
                });
            }
        }

        let ttls = [
            ("ACCESS_TOKEN_TTL_SECS", self.security.access_token_ttl),
            ("REFRESH_TOKEN_TTL_SECS", self.security.refresh_token_ttl),
            ("PASSWORD_TOKEN_TTL_SECS", self.security.password_token_ttl),
        ];

        for (var, ttl) in ttls {
            if ttl <= chrono::Duration::zero() {
                return Err(ConfigError::Invalid {
                    var: var.to_string(),
                    reason: "Must be greater than 0".to_string(),
                });
            }
            if ttl > chrono::Duration::seconds(MAX_TOKEN_TTL_SECS) {
                return Err(ConfigError::Invalid {
                    var: var.to_string(),
                    reason: format!("Must not exceed {MAX_TOKEN_TTL_SECS} seconds"),
                });
            }
        }

        if self.security.access_token_ttl >= self.security.refresh_token_ttl {
            return Err(ConfigError::Invalid {
                var: "ACCESS_TOKEN_TTL_SECS".to_string(),
                reason: "Must be shorter than the refresh token lifetime".to_string(),
            });
        }

        if self.rbac.min_tag_length == 0 {
            return Err(ConfigError::Invalid {
                var: "RBAC_MIN_TAG_LENGTH".to_string(),
                reason: "Must be at least 1".to_string(),
            });
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigError::Invalid {
                var: "DB_MIN_CONNECTIONS".to_string(),
                reason: format!(
                    "Cannot exceed DB_MAX_CONNECTIONS ({})",
                    self.database.max_connections
                ),
            });
        }

        if self.client_url.is_empty() {
            return Err(ConfigError::Invalid {
                var: "CLIENT_URL".to_string(),
                reason: "Must not be empty".to_string(),
            });
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

struct Env<'a>(&'a HashMap<String, String>);

impl Env<'_> {
    fn get(&self, key: &str) -> Option<String> {
        self.0.get(key).filter(|v| !v.is_empty()).cloned()
    }

    fn require(&self, key: &str) -> Result<String, ConfigError> {
        self.get(key).ok_or_else(|| ConfigError::MissingRequired {
            var: key.to_string(),
            hint: "Generate with: openssl rand -hex 32".to_string(),
        })
    }

    /// Parse a variable, falling back to `default` only when it is unset
    fn parse_or<T: FromStr>(&self, key: &str, default: T) -> Result<T, ConfigError> {
        match self.get(key) {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                var: key.to_string(),
                reason: format!("Cannot parse {raw:?}"),
            }),
            None => Ok(default),
        }
    }

    /// Parse a lifetime in seconds; values chrono cannot represent are errors
    fn ttl_or(&self, key: &str, default_secs: i64) -> Result<chrono::Duration, ConfigError> {
        let secs = self.parse_or(key, default_secs)?;
        chrono::Duration::try_seconds(secs).ok_or_else(|| ConfigError::Invalid {
            var: key.to_string(),
            reason: format!("{secs} seconds is out of range"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(extra: &[(&str, &str)]) -> HashMap<String, String> {
        let mut vars: HashMap<String, String> = [
            ("ACCESS_TOKEN_SECRET", "a".repeat(32)),
            ("REFRESH_TOKEN_SECRET", "r".repeat(32)),
            ("PASSWORD_TOKEN_SECRET", "p".repeat(32)),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        for (k, v) in extra {
            vars.insert(k.to_string(), v.to_string());
        }
        vars
    }

    fn load(extra: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        ServerConfig::from_vars(&vars(extra), None, None)
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::MissingRequired {
            var: "ACCESS_TOKEN_SECRET".to_string(),
            hint: "Use openssl".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("ACCESS_TOKEN_SECRET"));
        assert!(msg.contains("Use openssl"));
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        config.validate().unwrap();

        assert_eq!(config.bind, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(config.security.access_token_ttl, chrono::Duration::minutes(15));
        assert_eq!(config.security.refresh_token_ttl, chrono::Duration::days(7));
        assert_eq!(config.security.password_token_ttl, chrono::Duration::minutes(15));
        assert!(config.security.secure_cookies);
        assert_eq!(config.rbac.min_tag_length, 6);
        assert!(config.metrics_bind.is_none());
    }

    #[test]
    fn test_overrides_take_priority() {
        let vars = vars(&[
            ("SERVER_BIND", "0.0.0.0:9000"),
            ("DATABASE_URL", "postgres://env/db"),
        ]);
        let config = ServerConfig::from_vars(
            &vars,
            Some("127.0.0.1:7000".parse().unwrap()),
            Some("postgres://cli/db".to_string()),
        )
        .unwrap();

        assert_eq!(config.bind.port(), 7000);
        assert_eq!(config.database.database_url, "postgres://cli/db");
    }

    #[test]
    fn test_missing_secret() {
        let mut vars = vars(&[]);
        vars.remove("REFRESH_TOKEN_SECRET");

        let err = ServerConfig::from_vars(&vars, None, None).unwrap_err();
        assert!(matches!(err, ConfigError::MissingRequired { var, .. } if var == "REFRESH_TOKEN_SECRET"));
    }

    #[test]
    fn test_unparsable_value_is_error() {
        let err = load(&[("RBAC_MIN_TAG_LENGTH", "six")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var, .. } if var == "RBAC_MIN_TAG_LENGTH"));

        let err = load(&[("METRICS_BIND", "nowhere")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var, .. } if var == "METRICS_BIND"));
    }

    #[test]
    fn test_validation_short_secret() {
        let config = load(&[("PASSWORD_TOKEN_SECRET", "short")]).unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var, .. } if var == "PASSWORD_TOKEN_SECRET"));
    }

    #[test]
    fn test_validation_shared_secret() {
        let shared = "s".repeat(40);
        let config = load(&[
            ("ACCESS_TOKEN_SECRET", shared.as_str()),
            ("PASSWORD_TOKEN_SECRET", shared.as_str()),
        ])
        .unwrap();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("PASSWORD_TOKEN_SECRET"));
    }

    #[test]
    fn test_validation_ttls() {
        let config = load(&[("PASSWORD_TOKEN_TTL_SECS", "0")]).unwrap();
        assert!(config.validate().is_err());

        let config = load(&[
            ("ACCESS_TOKEN_TTL_SECS", "3600"),
            ("REFRESH_TOKEN_TTL_SECS", "3600"),
        ])
        .unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var, .. } if var == "ACCESS_TOKEN_TTL_SECS"));
    }

    #[test]
    fn test_validation_tag_length() {
        let config = load(&[("RBAC_MIN_TAG_LENGTH", "0")]).unwrap();
        assert!(config.validate().is_err());

        let config = load(&[("RBAC_MIN_TAG_LENGTH", "1")]).unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_huge_ttl_is_error_not_panic() {
        let huge = i64::MAX.to_string();
        let err = load(&[("REFRESH_TOKEN_TTL_SECS", huge.as_str())]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var, .. } if var == "REFRESH_TOKEN_TTL_SECS"));

        let config = load(&[("REFRESH_TOKEN_TTL_SECS", "31536001")]).unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var, .. } if var == "REFRESH_TOKEN_TTL_SECS"));

        let config = load(&[("REFRESH_TOKEN_TTL_SECS", "31536000")]).unwrap();
        assert!(config.validate().is_ok());
    }
}
