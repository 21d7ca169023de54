//! Response bodies.

use auth::AuthenticatedUser;
use entities::Appointment;
use serde::{Deserialize, Serialize};

// ============================================================================
// Auth Responses
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetLoginUrlResponse {
    /// URL to open in the sign-in popup.
    pub login_url: String,
    /// CSRF token the callback must echo back.
    pub state: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthCallbackResponse {
    /// Bearer token for subsequent requests.
    pub access_token: String,
    /// Seconds until `access_token` expires.
    pub expires_in: u64,
    pub user: AuthenticatedUser,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetCurrentUserResponse {
    pub user: AuthenticatedUser,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogoutResponse {
    /// Route the client should navigate to.
    pub redirect_to: String,
}

// ============================================================================
// Appointment Responses
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAppointmentResponse {
    pub appointment: Appointment,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListAppointmentsResponse {
    pub appointments: Vec<Appointment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditAppointmentResponse {
    pub appointment: Appointment,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteAppointmentResponse {}
