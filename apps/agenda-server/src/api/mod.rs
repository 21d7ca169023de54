//! API endpoints.

pub mod appointment;
pub mod auth;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::SharedState;

/// Creates the API router with all endpoints.
pub fn create_router() -> Router<SharedState> {
    Router::new()
        // Appointment endpoints
        .route("/api/agendamento/create", post(appointment::create_appointment))
        .route("/api/agendamento/list", post(appointment::list_appointments))
        .route("/api/agendamento/edit", post(appointment::edit_appointment))
        .route("/api/agendamento/delete", post(appointment::delete_appointment))
        // Auth endpoints
        .route("/api/auth/login-url", post(self::auth::get_login_url))
        .route("/api/auth/callback", get(self::auth::handle_callback))
        .route("/api/auth/me", get(self::auth::get_current_user))
        .route("/api/auth/logout", post(self::auth::logout))
        // Health check
        .route("/health", get(health_check))
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}
