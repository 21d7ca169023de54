//! Server error types.

use agenda_protocol::{ApiError, ErrorCode, ErrorResponse};
use agenda_store::StoreError;
use auth::AuthError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Server error type.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Invalid request parameters.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Authentication required.
    #[error("Authentication required")]
    AuthenticationRequired,

    /// Store error.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Authentication error.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),
}

impl ServerError {
    fn status_and_code(&self) -> (StatusCode, ErrorCode) {
        match self {
            ServerError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, ErrorCode::InvalidRequest),
            ServerError::AuthenticationRequired => {
                (StatusCode::UNAUTHORIZED, ErrorCode::Unauthenticated)
            }
            ServerError::Store(e) => match e {
                StoreError::NotFound { .. } => (StatusCode::NOT_FOUND, ErrorCode::NotFound),
                StoreError::PermissionDenied(_) => {
                    (StatusCode::FORBIDDEN, ErrorCode::PermissionDenied)
                }
                StoreError::InvalidDate(_) => (StatusCode::BAD_REQUEST, ErrorCode::InvalidParams),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::InternalError),
            },
            ServerError::Auth(e) => match e {
                AuthError::TokenExpired
                | AuthError::InvalidToken
                | AuthError::JwtValidation(_) => {
                    (StatusCode::UNAUTHORIZED, ErrorCode::Unauthenticated)
                }
                AuthError::InvalidState(_)
                | AuthError::SignInRejected(_)
                | AuthError::PopupBlocked
                | AuthError::PopupClosed => (StatusCode::BAD_REQUEST, ErrorCode::SignInFailed),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::InternalError),
            },
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let body = ErrorResponse::from(ApiError::new(code, self.to_string()));
        (status, Json(body)).into_response()
    }
}

/// Result type alias for server operations.
pub type ServerResult<T> = Result<T, ServerError>;
