//! Appointment API endpoints.

use agenda_protocol::{requests::*, responses::*};
use agenda_store::Scoped;
use auth::AuthenticatedUser;
use axum::{Extension, Json, extract::State};

use crate::error::{ServerError, ServerResult};
use crate::state::SharedState;

fn signed_in<T>(scoped: Scoped<T>) -> ServerResult<T> {
    scoped.into_option().ok_or(ServerError::AuthenticationRequired)
}

fn caller(user: Option<Extension<AuthenticatedUser>>) -> Option<AuthenticatedUser> {
    user.map(|Extension(user)| user)
}

/// Creates an appointment owned by the caller.
pub async fn create_appointment(
    State(state): State<SharedState>,
    user: Option<Extension<AuthenticatedUser>>,
    Json(request): Json<CreateAppointmentRequest>,
) -> ServerResult<Json<CreateAppointmentResponse>> {
    let appointment = signed_in(state.repository(caller(user)).create(&request.form).await?)?;
    Ok(Json(CreateAppointmentResponse { appointment }))
}

/// Lists the caller's appointments.
pub async fn list_appointments(
    State(state): State<SharedState>,
    user: Option<Extension<AuthenticatedUser>>,
    Json(_request): Json<ListAppointmentsRequest>,
) -> ServerResult<Json<ListAppointmentsResponse>> {
    let appointments = signed_in(state.repository(caller(user)).list().await?)?;
    Ok(Json(ListAppointmentsResponse { appointments }))
}

/// Replaces the form fields of one of the caller's appointments.
pub async fn edit_appointment(
    State(state): State<SharedState>,
    user: Option<Extension<AuthenticatedUser>>,
    Json(request): Json<EditAppointmentRequest>,
) -> ServerResult<Json<EditAppointmentResponse>> {
    let appointment = signed_in(
        state
            .repository(caller(user))
            .edit(&request.id, &request.form)
            .await?,
    )?;
    Ok(Json(EditAppointmentResponse { appointment }))
}

/// Deletes one of the caller's appointments.
pub async fn delete_appointment(
    State(state): State<SharedState>,
    user: Option<Extension<AuthenticatedUser>>,
    Json(request): Json<DeleteAppointmentRequest>,
) -> ServerResult<Json<DeleteAppointmentResponse>> {
    signed_in(state.repository(caller(user)).delete(&request.id).await?)?;
    Ok(Json(DeleteAppointmentResponse {}))
}
