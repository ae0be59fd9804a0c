//! Administration API handlers: user lookup and role mutation.
//!
//! Mounted behind [`require_admin`](super::middleware::require_admin).

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use vdm::auth::AuthedUser;
use vdm::rbac::RoleName;

use super::{AppState, error::ApiError};
use crate::logging::log_security_event;
use crate::metrics::{self, Outcome};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub tag: String,
    pub created_at: DateTime<Utc>,
    pub roles: Vec<RoleName>,
}

/// Look up a user by public tag.
///
/// # Errors
///
/// - `404 Not Found`: No user carries this tag
pub async fn find_user(
    State(state): State<AppState>,
    Path(user_tag): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.roles.find_user(&user_tag).await?;

    Ok(Json(UserResponse {
        tag: user.tag,
        created_at: user.created_at,
        roles: user.roles,
    }))
}

/// Grant a non-administrator role.
///
/// # Errors
///
/// - `400 Bad Request`: Short tag, unknown role or `ADMIN`
/// - `404 Not Found`: No user carries this tag
/// - `409 Conflict`: Role already held
pub async fn grant_role(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthedUser>,
    Path((user_tag, role_name)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let result = state.roles.grant_role(&user_tag, &role_name).await;
    metrics::role_mutations_total("grant", Outcome::of(&result, |e| e.kind()));
    result?;

    log_security_event(
        "role_granted",
        Some(admin.id),
        &format!("Granted {role_name} to {user_tag}"),
    );
    Ok(StatusCode::NO_CONTENT)
}

/// Revoke a non-administrator role.
///
/// # Errors
///
/// - `400 Bad Request`: Short tag, unknown role or `ADMIN`
/// - `403 Forbidden`: Target user is an administrator
/// - `404 Not Found`: No user carries this tag
/// - `409 Conflict`: Role not held
pub async fn revoke_role(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthedUser>,
    Path((user_tag, role_name)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let result = state.roles.revoke_role(&user_tag, &role_name).await;
    metrics::role_mutations_total("revoke", Outcome::of(&result, |e| e.kind()));
    result?;

    log_security_event(
        "role_revoked",
        Some(admin.id),
        &format!("Revoked {role_name} from {user_tag}"),
    );
    Ok(StatusCode::NO_CONTENT)
}
