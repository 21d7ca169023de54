//! Request bodies.

use entities::AppointmentForm;
use serde::{Deserialize, Serialize};

// ============================================================================
// Auth Requests
// ============================================================================

/// Query parameters the identity provider appends to the redirect URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthCallbackQuery {
    pub code: String,
    pub state: String,
}

// ============================================================================
// Appointment Requests
// ============================================================================

/// Body of `/api/agendamento/create`: the form fields at the top level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAppointmentRequest {
    #[serde(flatten)]
    pub form: AppointmentForm,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListAppointmentsRequest {}

/// Body of `/api/agendamento/edit`: the id plus the replacement form fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditAppointmentRequest {
    pub id: String,
    #[serde(flatten)]
    pub form: AppointmentForm,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteAppointmentRequest {
    pub id: String,
}
