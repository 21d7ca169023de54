//! Authentication API endpoints.
//!
//! The client opens `login_url` in a popup; the provider redirects the popup
//! to the callback, which answers with a session token.

use agenda_protocol::{requests::AuthCallbackQuery, responses::*};
use auth::{AuthenticatedUser, AuthorizationState, LOGIN_ROUTE, SignInStateStore};
use axum::{
    Extension, Json,
    extract::{Query, State},
};

use crate::error::{ServerError, ServerResult};
use crate::state::SharedState;

/// Starts a popup sign-in and returns the URL to open.
pub async fn get_login_url(
    State(state): State<SharedState>,
) -> ServerResult<Json<GetLoginUrlResponse>> {
    let oidc = state
        .backend
        .oidc
        .as_ref()
        .ok_or_else(|| ServerError::InvalidRequest("OIDC is not configured".to_string()))?;

    let removed = state.sign_in_states.cleanup_expired().await?;
    if removed > 0 {
        tracing::debug!(removed, "Dropped expired sign-in states");
    }

    let pending = AuthorizationState::new();
    let login_url = oidc.auth().authorization_url(&pending)?;
    state.sign_in_states.store(&pending).await?;

    tracing::info!("Generated login URL for popup sign-in");

    Ok(Json(GetLoginUrlResponse {
        login_url,
        state: pending.state,
    }))
}

/// Completes a popup sign-in and issues a session token.
pub async fn handle_callback(
    State(state): State<SharedState>,
    Query(query): Query<AuthCallbackQuery>,
) -> ServerResult<Json<AuthCallbackResponse>> {
    let oidc = state
        .backend
        .oidc
        .as_ref()
        .ok_or_else(|| ServerError::InvalidRequest("OIDC is not configured".to_string()))?;

    let pending = state.sign_in_states.take(&query.state).await?;
    let user = oidc.complete_sign_in(&query.code, &pending).await?;
    let access_token = state.jwt_manager.generate_token(&user)?;

    tracing::info!(user_id = %user.id, "Issued session token");

    Ok(Json(AuthCallbackResponse {
        access_token,
        expires_in: state.jwt_manager.expiration_seconds(),
        user,
    }))
}

/// Gets the current authenticated user.
pub async fn get_current_user(
    user: Option<Extension<AuthenticatedUser>>,
) -> ServerResult<Json<GetCurrentUserResponse>> {
    let Extension(user) = user.ok_or(ServerError::AuthenticationRequired)?;
    Ok(Json(GetCurrentUserResponse { user }))
}

/// Signs out.
///
/// Session tokens are stateless, so the client discards its token and
/// navigates to the returned route.
pub async fn logout(user: Option<Extension<AuthenticatedUser>>) -> Json<LogoutResponse> {
    if let Some(Extension(user)) = user {
        tracing::info!(user_id = %user.id, "Signed out");
    }

    Json(LogoutResponse {
        redirect_to: LOGIN_ROUTE.to_string(),
    })
}
