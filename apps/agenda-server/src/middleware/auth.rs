//! Authentication middleware.

use auth::{AuthenticatedUser, JwtManager};
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use crate::state::SharedState;

/// Extracts the JWT token from the Authorization header.
fn extract_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
}

/// Returns the user a bearer token was issued to, if the token is valid.
fn user_from_token(jwt_manager: &JwtManager, token: &str) -> Option<AuthenticatedUser> {
    match jwt_manager.validate_token(token) {
        Ok(claims) => Some(claims.user()),
        Err(e) => {
            tracing::debug!(error = %e, "Ignoring invalid bearer token");
            None
        }
    }
}

/// Optional authentication middleware.
///
/// Validates the bearer token, if any, and stores the user in the request
/// extensions. Requests without a valid token pass through anonymously;
/// handlers decide whether that is an error.
pub async fn optional_auth_middleware(
    State(state): State<SharedState>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(user) =
        extract_token(&request).and_then(|token| user_from_token(&state.jwt_manager, token))
    {
        request.extensions_mut().insert(user);
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use auth::JwtConfig;
    use axum::body::Body;

    use super::*;

    const SECRET: &str = "test-secret-key-must-be-long-enough-for-security";

    #[test]
    fn test_extract_token() {
        let request = Request::builder()
            .header(AUTHORIZATION, "Bearer test-token-123")
            .body(Body::empty())
            .unwrap();
        assert_eq!(extract_token(&request), Some("test-token-123"));

        let basic = Request::builder()
            .header(AUTHORIZATION, "Basic credentials")
            .body(Body::empty())
            .unwrap();
        assert_eq!(extract_token(&basic), None);
    }

    #[test]
    fn test_user_from_token() {
        let manager = JwtManager::new(JwtConfig::new(SECRET));
        let user = AuthenticatedUser::new("u-1").with_email("ana@example.com");
        let token = manager.generate_token(&user).unwrap();

        assert_eq!(user_from_token(&manager, &token), Some(user));
        assert_eq!(user_from_token(&manager, "garbage"), None);
    }
}
