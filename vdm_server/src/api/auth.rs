//! Authentication API handlers.
//!
//! Tokens travel only in HTTP-only cookies; response bodies carry the
//! caller's public tag and roles.
//!
//! # Examples
//!
//! Sign in:
//! ```bash
//! curl -i -X POST http://localhost:8080/api/v1/auth/sign-in \
//!   -H "Content-Type: application/json" \
//!   -d '{"email": "user@vdm.local", "password": "Test123!"}'
//! ```
//!
//! Rotate the refresh cookie:
//! ```bash
//! curl -i -X POST http://localhost:8080/api/v1/auth/refresh \
//!   --cookie "vdm_refresh=<secret>"
//! ```

use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use vdm::auth::{AuthedUser, SecurityConfig, Session, SignInRequest};
use vdm::rbac::RoleName;

use super::{AppState, error::ApiError};
use crate::logging::log_security_event;
use crate::metrics::{self, Outcome};

/// Names and attributes of the session cookies
#[derive(Debug, Clone)]
pub struct CookieSettings {
    pub access_name: String,
    pub refresh_name: String,
    pub secure: bool,
}

impl From<&SecurityConfig> for CookieSettings {
    fn from(config: &SecurityConfig) -> Self {
        Self {
            access_name: config.access_cookie_name.clone(),
            refresh_name: config.refresh_cookie_name.clone(),
            secure: config.secure_cookies,
        }
    }
}

impl CookieSettings {
    fn cookie(&self, name: &str, value: String, max_age_secs: i64) -> Cookie<'static> {
        Cookie::build((name.to_string(), value))
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .max_age(time::Duration::seconds(max_age_secs.max(0)))
            .build()
    }

    /// Add both session cookies, each expiring with its token
    pub fn set_session(&self, jar: CookieJar, session: &Session) -> CookieJar {
        let now = chrono::Utc::now();
        let tokens = &session.tokens;

        jar.add(self.cookie(
            &self.access_name,
            tokens.access_token.clone(),
            (tokens.access_expiry - now).num_seconds(),
        ))
        .add(self.cookie(
            &self.refresh_name,
            tokens.refresh_token.clone(),
            (tokens.refresh_expiry - now).num_seconds(),
        ))
    }

    /// Expire both session cookies
    pub fn clear_session(&self, jar: CookieJar) -> CookieJar {
        jar.remove(Cookie::build((self.access_name.clone(), "")).path("/"))
            .remove(Cookie::build((self.refresh_name.clone(), "")).path("/"))
    }
}

#[derive(Debug, Deserialize)]
pub struct SignInPayload {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub tag: String,
    pub roles: Vec<RoleName>,
}

impl From<&Session> for SessionResponse {
    fn from(session: &Session) -> Self {
        Self {
            tag: session.tag.clone(),
            roles: session.roles.clone(),
        }
    }
}

/// Authenticate with email and password.
///
/// # Response
///
/// `200 OK` with the access and refresh cookies set:
/// ```json
/// { "tag": "user0001", "roles": ["MODERATOR"] }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Body is not a valid sign-in payload
/// - `401 Unauthorized`: Unknown email or wrong password (indistinguishable)
pub async fn sign_in(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Result<Json<SignInPayload>, JsonRejection>,
) -> Result<(CookieJar, Json<SessionResponse>), ApiError> {
    let Json(payload) = payload?;

    let result = state
        .auth
        .sign_in(SignInRequest {
            email: payload.email,
            password: payload.password,
        })
        .await;
    metrics::sign_in_attempts_total(Outcome::of(&result, |e| e.kind()));

    let session = result.inspect_err(|e| {
        if !e.kind().is_internal() {
            log_security_event("sign_in_failed", None, "Invalid credentials");
        }
    })?;

    let jar = state.cookies.set_session(jar, &session);
    Ok((jar, Json(SessionResponse::from(&session))))
}

/// Exchange the refresh cookie for a fresh pair of cookies.
///
/// The presented refresh secret is spent whether or not the response reaches
/// the client.
///
/// # Errors
///
/// - `401 Unauthorized`: Missing, unknown, expired or already rotated refresh token
pub async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<SessionResponse>), ApiError> {
    let secret = jar
        .get(&state.cookies.refresh_name)
        .map(|cookie| cookie.value().to_string())
        .ok_or(ApiError::Unauthenticated)?;

    let result = state.auth.refresh(&secret).await;
    metrics::refresh_rotations_total(Outcome::of(&result, |e| e.kind()));

    let session = result.inspect_err(|e| {
        if !e.kind().is_internal() {
            log_security_event("refresh_rejected", None, "Refresh token rejected");
        }
    })?;

    let jar = state.cookies.set_session(jar, &session);
    Ok((jar, Json(SessionResponse::from(&session))))
}

/// End the caller's refresh session and clear both cookies.
///
/// The access token keeps verifying until it expires.
pub async fn sign_out(
    State(state): State<AppState>,
    Extension(user): Extension<AuthedUser>,
    jar: CookieJar,
) -> Result<(CookieJar, StatusCode), ApiError> {
    state.auth.sign_out(user.id).await?;
    Ok((state.cookies.clear_session(jar), StatusCode::NO_CONTENT))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> CookieSettings {
        CookieSettings::from(&SecurityConfig::development())
    }

    #[test]
    fn test_cookie_attributes() {
        let cookie = settings().cookie("vdm_access", "token".to_string(), 900);

        assert_eq!(cookie.name(), "vdm_access");
        assert_eq!(cookie.value(), "token");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.max_age(), Some(time::Duration::seconds(900)));
    }

    #[test]
    fn test_negative_max_age_clamped() {
        let cookie = settings().cookie("vdm_access", "token".to_string(), -5);
        assert_eq!(cookie.max_age(), Some(time::Duration::ZERO));
    }

    #[test]
    fn test_secure_flag_follows_config() {
        let mut config = SecurityConfig::development();
        config.secure_cookies = true;
        let cookie = CookieSettings::from(&config).cookie("c", String::new(), 1);
        assert_eq!(cookie.secure(), Some(true));
    }
}
