//! HTTP API for the authentication and role management core.
//!
//! # Modules
//!
//! - [`auth`]: Sign-in, refresh rotation and sign-out over HTTP-only cookies
//! - [`password`]: Password-reset inquiry and password update
//! - [`admin`]: User lookup and role grant/revoke (ADMIN only)
//! - [`middleware`]: Access-cookie verification and role guards
//! - [`request_id`]: Request correlation
//!
//! # Endpoints Overview
//!
//! ```text
//! GET    /livez                                           - Process is up
//! GET    /healthz                                         - Database reachable
//! POST   /api/v1/auth/sign-in                             - Email + password
//! POST   /api/v1/auth/refresh                             - Rotate refresh cookie
//! POST   /api/v1/auth/sign-out                            - End session (auth required)
//! POST   /api/v1/password-update/inquire                  - Request reset link
//! POST   /api/v1/password-update                          - Set password with reset token
//! GET    /api/v1/admin/users/{user_tag}                   - Look up user (ADMIN)
//! POST   /api/v1/admin/users/{user_tag}/roles/{role_name} - Grant role (ADMIN)
//! DELETE /api/v1/admin/users/{user_tag}/roles/{role_name} - Revoke role (ADMIN)
//! ```
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use vdm::auth::SecurityConfig;
//! use vdm::db::{Database, DatabaseConfig};
//! use vdm::mail::LogMailer;
//! use vdm::rbac::RbacConfig;
//! use vdm_server::api::{AppState, create_router};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::new(&DatabaseConfig::development()).await?;
//! let state = AppState::new(
//!     Arc::new(db.auth_repository()),
//!     Arc::new(LogMailer),
//!     &SecurityConfig::development(),
//!     RbacConfig::default(),
//!     "http://localhost:5173",
//! )?;
//!
//! let app = create_router(state);
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

pub mod admin;
pub mod auth;
pub mod error;
pub mod middleware;
pub mod password;
pub mod request_id;

use axum::{
    Router,
    extract::State,
    http::{HeaderValue, Method, StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Json},
    routing::{get, post},
};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use vdm::auth::{AuthManager, AuthResult, PasswordResetManager, SecurityConfig};
use vdm::db::AuthRepository;
use vdm::mail::Mailer;
use vdm::rbac::{RbacConfig, RoleManager};

pub use auth::CookieSettings;

/// Application state shared across all HTTP handlers.
///
/// Cloned for each request (cheap due to Arc wrappers).
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthManager>,
    pub password_reset: Arc<PasswordResetManager>,
    pub roles: Arc<RoleManager>,
    pub repository: Arc<dyn AuthRepository>,
    pub cookies: Arc<CookieSettings>,
    /// Origin allowed to call the API with credentials
    pub client_origin: Option<HeaderValue>,
}

impl AppState {
    /// Build every manager over one repository
    ///
    /// # Errors
    ///
    /// * `AuthError::HashingFailed` - Password hashing parameters are invalid
    pub fn new(
        repository: Arc<dyn AuthRepository>,
        mailer: Arc<dyn Mailer>,
        security: &SecurityConfig,
        rbac: RbacConfig,
        client_url: &str,
    ) -> AuthResult<Self> {
        let client_url = client_url.trim_end_matches('/');

        Ok(Self {
            auth: Arc::new(AuthManager::new(repository.clone(), security)?),
            password_reset: Arc::new(PasswordResetManager::new(
                repository.clone(),
                mailer,
                security,
                client_url,
            )?),
            roles: Arc::new(RoleManager::new(repository.clone(), rbac)),
            repository,
            cookies: Arc::new(CookieSettings::from(security)),
            client_origin: HeaderValue::from_str(client_url).ok(),
        })
    }
}

/// Create the complete API router with all endpoints and middleware.
pub fn create_router(state: AppState) -> Router {
    let v1_routes = create_v1_router(state.clone());

    let cors = match &state.client_origin {
        Some(origin) => CorsLayer::new()
            .allow_origin(origin.clone())
            .allow_credentials(true)
            .allow_methods([Method::GET, Method::POST, Method::DELETE])
            .allow_headers([CONTENT_TYPE]),
        None => CorsLayer::new(),
    };

    Router::new()
        .route("/livez", get(livez))
        .route("/healthz", get(healthz))
        .nest("/api/v1", v1_routes)
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(cors)
        .with_state(state)
}

/// Create API v1 router with all versioned endpoints.
fn create_v1_router(state: AppState) -> Router<AppState> {
    let public_routes = Router::new()
        .route("/auth/sign-in", post(auth::sign_in))
        .route("/auth/refresh", post(auth::refresh))
        .route("/password-update/inquire", post(password::inquire))
        .route("/password-update", post(password::update_password));

    let protected_routes = Router::new()
        .route("/auth/sign-out", post(auth::sign_out))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::authed_user_middleware,
        ));

    // Layers run outside-in: the access cookie is verified before roles load
    let admin_routes = Router::new()
        .route("/admin/users/{user_tag}", get(admin::find_user))
        .route(
            "/admin/users/{user_tag}/roles/{role_name}",
            post(admin::grant_role).delete(admin::revoke_role),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::require_admin,
        ))
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::authed_user_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(admin_routes)
}

/// Liveness probe; answers as long as the process serves requests.
async fn livez() -> impl IntoResponse {
    Json(json!({ "status": "alive" }))
}

/// Readiness probe; `503 Service Unavailable` when the database does not answer.
///
/// ```bash
/// curl http://localhost:8080/healthz
/// # {"status":"healthy","database":true,"version":"0.4.0","timestamp":"2026-01-01T10:30:00Z"}
/// ```
async fn healthz(State(state): State<AppState>) -> impl IntoResponse {
    let db_healthy = match state.repository.health_check().await {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(error = %e, "Database health check failed");
            false
        }
    };

    let status_code = if db_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if db_healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "database": db_healthy,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}
