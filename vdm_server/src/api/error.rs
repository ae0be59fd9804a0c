//! Conversion of core errors into HTTP responses.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use vdm::{ErrorKind, auth::AuthError, rbac::RoleError};

/// Error body returned by every endpoint
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Any failure a handler or guard can produce
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Role(#[from] RoleError),

    /// Request body could not be decoded
    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    /// No credential cookie was presented
    #[error("Missing credentials")]
    Unauthenticated,

    /// Caller lacks the role a route requires
    #[error("Forbidden")]
    Forbidden,
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Auth(e) => e.kind(),
            ApiError::Role(e) => e.kind(),
            ApiError::InvalidBody(_) => ErrorKind::BadRequest,
            ApiError::Unauthenticated => ErrorKind::Unauthorized,
            ApiError::Forbidden => ErrorKind::Forbidden,
        }
    }

    pub fn client_message(&self) -> String {
        match self {
            ApiError::Auth(e) => e.client_message(),
            ApiError::Role(e) => e.client_message(),
            ApiError::InvalidBody(_) => self.to_string(),
            ApiError::Unauthenticated => "Unauthorized".to_string(),
            ApiError::Forbidden => "Forbidden".to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidBody(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        if kind.is_internal() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, kind = %kind, "Request rejected");
        }

        let status = StatusCode::from_u16(kind.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        (
            status,
            Json(ErrorResponse {
                error: self.client_message(),
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use std::time::Duration;
    use vdm::db::DbError;

    async fn body_text(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_unauthorized_response() {
        let response = ApiError::from(AuthError::InvalidRefreshToken).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_text(response).await, r#"{"error":"Unauthorized"}"#);
    }

    #[tokio::test]
    async fn test_internal_details_hidden() {
        let err = AuthError::Database(DbError::Timeout(Duration::from_secs(5)));
        let response = ApiError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_text(response).await;
        assert!(body.contains("Internal server error"));
        assert!(!body.contains("timed out"));
    }

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ApiError::Forbidden, StatusCode::FORBIDDEN),
            (ApiError::Unauthenticated, StatusCode::UNAUTHORIZED),
            (ApiError::InvalidBody("x".to_string()), StatusCode::BAD_REQUEST),
            (ApiError::Role(RoleError::InvalidInput), StatusCode::BAD_REQUEST),
            (
                ApiError::Role(RoleError::UserNotFound("ghost01".to_string())),
                StatusCode::NOT_FOUND,
            ),
            (
                ApiError::Role(RoleError::AdminProtected("admin01".to_string())),
                StatusCode::FORBIDDEN,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }
}
