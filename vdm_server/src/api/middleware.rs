//! Authentication and role guards for protected endpoints.
//!
//! [`authed_user_middleware`] reads the access cookie, verifies it and injects
//! an [`AuthedUser`] into request extensions. Role guards such as
//! [`require_admin`] run after it, load the caller's roles from persistence
//! and reject callers lacking the role.
//!
//! # Usage
//!
//! ```rust,no_run
//! use axum::{Router, routing::get, middleware};
//! # use vdm_server::api::middleware::{authed_user_middleware, require_admin};
//! # use vdm_server::api::AppState;
//! # async fn handler() {}
//! # let state: AppState = unimplemented!();
//!
//! let admin_routes: Router<AppState> = Router::new()
//!     .route("/admin/ping", get(handler))
//!     .route_layer(middleware::from_fn_with_state(state.clone(), require_admin))
//!     .route_layer(middleware::from_fn_with_state(state, authed_user_middleware));
//! # let _ = admin_routes;
//! ```

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use vdm::auth::{AuthError, AuthedUser};
use vdm::rbac::RoleName;

use super::{AppState, error::ApiError};
use crate::logging::log_security_event;

/// Verifies the access cookie and injects [`AuthedUser`] with roles unloaded.
///
/// # Behavior
///
/// - **Success**: Injects `AuthedUser { id, roles: None }` and calls the next handler
/// - **Missing cookie**: `401 Unauthorized`
/// - **Malformed, forged or expired token**: `401 Unauthorized`
pub async fn authed_user_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let jar = CookieJar::from_headers(request.headers());
    let token = jar
        .get(&state.cookies.access_name)
        .map(|cookie| cookie.value().to_string())
        .ok_or(ApiError::Unauthenticated)?;

    let claims = state.auth.verify_access_token(&token).map_err(|e| {
        if let AuthError::InvalidAccessToken(reason) = &e {
            tracing::debug!(%reason, "Access token rejected");
        }
        e
    })?;

    request
        .extensions_mut()
        .insert(AuthedUser::from_claims(&claims));
    Ok(next.run(request).await)
}

/// Loads the caller's roles and rejects them unless `role` is among them.
///
/// Must run after [`authed_user_middleware`]. The updated [`AuthedUser`],
/// roles included, replaces the one in request extensions.
pub async fn require_role(
    state: &AppState,
    role: RoleName,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let mut user = request
        .extensions()
        .get::<AuthedUser>()
        .cloned()
        .ok_or(ApiError::Unauthenticated)?;

    user.roles = Some(state.roles.roles_of(user.id).await?);

    if !user.has_role(role) {
        log_security_event(
            "role_required",
            Some(user.id),
            &format!("Rejected request lacking role {role}"),
        );
        return Err(ApiError::Forbidden);
    }

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Guard for the administration routes
pub async fn require_admin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    require_role(&state, RoleName::Admin, request, next).await
}
