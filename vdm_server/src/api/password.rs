//! Password-reset API handlers.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::Deserialize;

use super::{AppState, error::ApiError};
use crate::metrics::{self, Outcome};

#[derive(Debug, Deserialize)]
pub struct InquirePayload {
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordUpdatePayload {
    pub token: String,
    pub new_password: String,
}

/// Request a password-reset link.
///
/// Answers `204 No Content` whether or not the email belongs to a user.
///
/// # Errors
///
/// - `400 Bad Request`: Body is not `{ "email": ... }`
/// - `500 Internal Server Error`: Token could not be stored
pub async fn inquire(
    State(state): State<AppState>,
    payload: Result<Json<InquirePayload>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(payload) = payload?;

    let result = state.password_reset.inquire(payload.email.trim()).await;
    metrics::password_reset_requests_total("inquire", Outcome::of(&result, |e| e.kind()));
    result?;

    Ok(StatusCode::NO_CONTENT)
}

/// Set a new password with a reset token.
///
/// Every refresh session of the user ends.
///
/// # Request Body
///
/// ```json
/// { "token": "<reset secret>", "newPassword": "NewPass456" }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: New password too weak
/// - `401 Unauthorized`: Unknown, expired or already used token
pub async fn update_password(
    State(state): State<AppState>,
    payload: Result<Json<PasswordUpdatePayload>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(payload) = payload?;

    let result = state
        .password_reset
        .update_password(&payload.token, &payload.new_password)
        .await;
    metrics::password_reset_requests_total("update", Outcome::of(&result, |e| e.kind()));
    result?;

    Ok(StatusCode::NO_CONTENT)
}
