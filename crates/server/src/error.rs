//! Unified error handling with Sentry integration.
//!
//! Every route handler returns `Result<T, AppError>`. The response body is
//! always `{"error": <kind>, "message": <text>}`; server-side failures are
//! captured to Sentry and logged in full, while the client only sees a
//! generic message.

use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::{AuthError, AuthzError};

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed or incomplete input.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Unique key or pair already exists.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The database could not be reached.
    #[error("Database unavailable: {0}")]
    Unavailable(String),

    /// No valid identity was presented.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Identity lacks the required permission.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// A multi-row write was rolled back.
    #[error("Transaction failed: {0}")]
    Transaction(String),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Map a store error, naming the entity in `NotFound` messages.
    #[must_use]
    pub fn from_store(err: RepositoryError, entity: &str) -> Self {
        match err {
            RepositoryError::NotFound => Self::NotFound(format!("{entity} not found")),
            RepositoryError::Conflict(msg) => Self::Conflict(msg),
            RepositoryError::Unavailable(msg) => Self::Unavailable(msg),
            RepositoryError::Transaction(msg) => Self::Transaction(msg),
            other @ (RepositoryError::Database(_) | RepositoryError::DataCorruption(_)) => {
                Self::Database(other)
            }
        }
    }

    /// Status code and `error` tag for this error.
    #[must_use]
    pub const fn kind(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            Self::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            Self::Unavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "connection_error"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthenticated"),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
            Self::Transaction(_) => (StatusCode::INTERNAL_SERVER_ERROR, "transaction_error"),
            Self::Database(_) | Self::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "unauthenticated"),
                AuthError::UserAlreadyExists => (StatusCode::CONFLICT, "conflict"),
                AuthError::WeakPassword(_)
                | AuthError::InvalidEmail(_)
                | AuthError::InvalidUsername => (StatusCode::BAD_REQUEST, "validation_error"),
                AuthError::Repository(RepositoryError::Unavailable(_)) => {
                    (StatusCode::SERVICE_UNAVAILABLE, "connection_error")
                }
                AuthError::Repository(RepositoryError::NotFound) => {
                    (StatusCode::NOT_FOUND, "not_found")
                }
                AuthError::Repository(_) | AuthError::PasswordHash => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
                }
            },
        }
    }

    /// Message safe to show the client.
    fn public_message(&self) -> String {
        match self {
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::Unavailable(_) => "Database temporarily unavailable".to_string(),
            Self::Transaction(_) => "Operation failed and was rolled back".to_string(),
            Self::Validation(msg)
            | Self::NotFound(msg)
            | Self::Conflict(msg)
            | Self::Unauthorized(msg)
            | Self::Forbidden(msg) => msg.clone(),
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => "Invalid credentials".to_string(),
                AuthError::UserAlreadyExists => "Username or email already exists".to_string(),
                AuthError::WeakPassword(msg) => msg.clone(),
                AuthError::InvalidEmail(_) => "Invalid email address".to_string(),
                AuthError::InvalidUsername => "Username cannot be empty".to_string(),
                AuthError::Repository(RepositoryError::Unavailable(_)) => {
                    "Database temporarily unavailable".to_string()
                }
                AuthError::Repository(RepositoryError::NotFound) => "User not found".to_string(),
                AuthError::Repository(_) | AuthError::PasswordHash => {
                    "Internal server error".to_string()
                }
            },
        }
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        Self::from_store(err, "resource")
    }
}

impl From<AuthzError> for AppError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::Unauthenticated => Self::Unauthorized(err.to_string()),
            AuthzError::Forbidden(_) => Self::Forbidden(err.to_string()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, kind) = self.kind();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                kind,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, kind, "Request rejected");
        }

        let body = json!({
            "error": kind,
            "message": self.public_message(),
        });

        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Called by the identity extractor so errors are associated with users.
pub fn set_sentry_user(user_id: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            ..Default::default()
        }));
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::to_bytes;
    use serde_json::Value;

    use super::*;

    async fn body_of(err: AppError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("firm not found".to_string());
        assert_eq!(err.to_string(), "Not found: firm not found");

        let err = AppError::Validation("name_1 is required".to_string());
        assert_eq!(err.to_string(), "Validation error: name_1 is required");
    }

    #[test]
    fn test_app_error_status_codes() {
        fn get_status(err: AppError) -> StatusCode {
            err.into_response().status()
        }

        assert_eq!(
            get_status(AppError::Validation("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Conflict("test".to_string())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AppError::Unavailable("test".to_string())),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Forbidden("test".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::Transaction("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_store_errors_keep_their_kind() {
        assert!(matches!(
            AppError::from_store(RepositoryError::NotFound, "role"),
            AppError::NotFound(ref m) if m == "role not found"
        ));
        assert!(matches!(
            AppError::from(RepositoryError::Conflict("dup".to_string())),
            AppError::Conflict(_)
        ));
        assert!(matches!(
            AppError::from(RepositoryError::Unavailable("down".to_string())),
            AppError::Unavailable(_)
        ));
        assert!(matches!(
            AppError::from(RepositoryError::Transaction("rolled back".to_string())),
            AppError::Transaction(_)
        ));
    }

    #[test]
    fn test_gate_errors_map_to_401_and_403() {
        assert_eq!(
            AppError::from(AuthzError::Unauthenticated).kind(),
            (StatusCode::UNAUTHORIZED, "unauthenticated")
        );
        assert_eq!(
            AppError::from(AuthzError::Forbidden("view_firms".to_string())).kind(),
            (StatusCode::FORBIDDEN, "forbidden")
        );
    }

    #[tokio::test]
    async fn test_body_carries_kind_and_message() {
        let (status, body) = body_of(AppError::Conflict("role already assigned to user".into())).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "conflict");
        assert_eq!(body["message"], "role already assigned to user");
    }

    #[tokio::test]
    async fn test_internal_details_are_hidden() {
        let (_, body) = body_of(AppError::Transaction(
            "linking contact 9: referenced row does not exist".into(),
        ))
        .await;
        assert_eq!(body["error"], "transaction_error");
        assert!(!body["message"].as_str().unwrap().contains("contact 9"));

        let (_, body) = body_of(AppError::Unavailable("connection refused 10.0.0.5".into())).await;
        assert_eq!(body["error"], "connection_error");
        assert!(!body["message"].as_str().unwrap().contains("10.0.0.5"));
    }
}
