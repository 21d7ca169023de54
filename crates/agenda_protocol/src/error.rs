//! API error types

use serde::{Deserialize, Serialize};

/// Error codes reported by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// The request body or parameters are malformed
    InvalidRequest = -32600,
    /// A parameter value was rejected, such as an unparseable date
    InvalidParams = -32602,
    /// Internal server error
    InternalError = -32603,

    // Server-defined errors (-32000 to -32099)
    /// Authentication required
    Unauthenticated = -32001,
    /// User is authenticated but not allowed to perform this action
    PermissionDenied = -32002,
    /// The requested resource was not found
    NotFound = -32003,
    /// Sign-in could not be started or completed
    SignInFailed = -32004,
}

impl From<i32> for ErrorCode {
    fn from(code: i32) -> Self {
        match code {
            -32600 => ErrorCode::InvalidRequest,
            -32602 => ErrorCode::InvalidParams,
            -32603 => ErrorCode::InternalError,
            -32001 => ErrorCode::Unauthenticated,
            -32002 => ErrorCode::PermissionDenied,
            -32003 => ErrorCode::NotFound,
            -32004 => ErrorCode::SignInFailed,
            _ => ErrorCode::InternalError,
        }
    }
}

/// Error object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("[{code}] {message}")]
pub struct ApiError {
    /// Error code
    pub code: i32,
    /// Error message
    pub message: String,
}

impl ApiError {
    /// Creates a new error
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code as i32,
            message: message.into(),
        }
    }

    /// Returns the typed error code
    pub fn error_code(&self) -> ErrorCode {
        ErrorCode::from(self.code)
    }

    /// Creates an unauthenticated error
    pub fn unauthenticated() -> Self {
        Self::new(ErrorCode::Unauthenticated, "Authentication required")
    }
}

/// Body of every error response: `{"error": {"code", "message"}}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ApiError,
}

impl From<ApiError> for ErrorResponse {
    fn from(error: ApiError) -> Self {
        Self { error }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_envelope() {
        let body = ErrorResponse::from(ApiError::new(
            ErrorCode::NotFound,
            "agendamentos/x not found",
        ));
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["error"]["code"], -32003);
        assert_eq!(json["error"]["message"], "agendamentos/x not found");
    }

    #[test]
    fn test_error_code_round_trip() {
        let error = ApiError::unauthenticated();
        assert_eq!(error.error_code(), ErrorCode::Unauthenticated);
        assert_eq!(ErrorCode::from(12345), ErrorCode::InternalError);
        assert_eq!(error.to_string(), "[-32001] Authentication required");
    }
}
