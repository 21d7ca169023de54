//! Owner-scoped appointment repository.

use std::sync::Arc;

use auth::Session;
use entities::{Appointment, AppointmentForm};
use serde_json::Value;

use crate::{AccessRules, AuthContext, Document, DocumentStore, DocumentWrite, Query, StoreResult};

/// Collection holding appointments.
pub const APPOINTMENTS_COLLECTION: &str = "agendamentos";

/// Field naming the owner of an appointment.
pub const OWNER_FIELD: &str = "userId";

/// Access rules for a store that holds appointments.
pub fn appointment_rules() -> AccessRules {
    AccessRules::new().owner_scoped(APPOINTMENTS_COLLECTION, OWNER_FIELD)
}

/// Outcome of a call that needs a signed-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scoped<T> {
    /// The call ran on behalf of the signed-in user.
    Authenticated(T),
    /// Nobody was signed in; nothing was read or written.
    Unauthenticated,
}

impl<T> Scoped<T> {
    /// Returns true if nobody was signed in.
    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, Self::Unauthenticated)
    }

    /// Converts into an `Option`, dropping the unauthenticated case.
    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Authenticated(value) => Some(value),
            Self::Unauthenticated => None,
        }
    }

    /// Maps the authenticated value.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Scoped<U> {
        match self {
            Self::Authenticated(value) => Scoped::Authenticated(f(value)),
            Self::Unauthenticated => Scoped::Unauthenticated,
        }
    }
}

impl<T: Default> Scoped<T> {
    /// Returns the value, or `T::default()` when nobody was signed in.
    ///
    /// An empty list for `list`, unit for `delete`.
    pub fn unwrap_or_default(self) -> T {
        self.into_option().unwrap_or_default()
    }
}

/// Appointments of the signed-in user.
///
/// The caller is read from the session at the start of every call. All
/// ownership checks are made by the store's access rules, so the store must
/// be configured with [`appointment_rules`].
#[derive(Clone)]
pub struct AppointmentRepository {
    store: Arc<dyn DocumentStore>,
    session: Session,
}

impl AppointmentRepository {
    /// Creates a repository over `store` acting for whoever `session` reports.
    pub fn new(store: Arc<dyn DocumentStore>, session: Session) -> Self {
        Self { store, session }
    }

    /// Returns the signed-in user's ID.
    fn caller(&self) -> Option<String> {
        self.session.current_user().map(|user| user.id)
    }

    /// Creates an appointment owned by the caller and returns it as stored.
    pub async fn create(&self, form: &AppointmentForm) -> StoreResult<Scoped<Appointment>> {
        let Some(uid) = self.caller() else {
            return Ok(Scoped::Unauthenticated);
        };
        let auth = AuthContext::user(uid.as_str());

        let write = form_write(form)?
            .set(OWNER_FIELD, uid)
            .server_timestamp("createdAt");
        let document = self.store.add(&auth, APPOINTMENTS_COLLECTION, write).await?;

        tracing::info!(id = %document.id, "Appointment created");
        decode(&document).map(Scoped::Authenticated)
    }

    /// Replaces the form fields of appointment `id` and returns it as stored.
    ///
    /// The owner and creation time are left alone.
    pub async fn edit(&self, id: &str, form: &AppointmentForm) -> StoreResult<Scoped<Appointment>> {
        let Some(uid) = self.caller() else {
            return Ok(Scoped::Unauthenticated);
        };
        let auth = AuthContext::user(uid);

        let write = form_write(form)?;
        let document = self
            .store
            .update(&auth, APPOINTMENTS_COLLECTION, id, write)
            .await?;

        tracing::info!(id = %id, "Appointment updated");
        decode(&document).map(Scoped::Authenticated)
    }

    /// Lists the caller's appointments in insertion order.
    pub async fn list(&self) -> StoreResult<Scoped<Vec<Appointment>>> {
        let Some(uid) = self.caller() else {
            return Ok(Scoped::Unauthenticated);
        };
        let auth = AuthContext::user(uid.as_str());
        let query = Query::new(APPOINTMENTS_COLLECTION).where_eq(OWNER_FIELD, uid);

        let documents = self.store.query(&auth, &query).await?;
        let appointments = documents
            .iter()
            .map(decode)
            .collect::<StoreResult<Vec<_>>>()?;

        tracing::debug!(count = appointments.len(), "Appointments listed");
        Ok(Scoped::Authenticated(appointments))
    }

    /// Deletes appointment `id`. Deleting a missing appointment succeeds.
    pub async fn delete(&self, id: &str) -> StoreResult<Scoped<()>> {
        let Some(uid) = self.caller() else {
            return Ok(Scoped::Unauthenticated);
        };
        let auth = AuthContext::user(uid);

        self.store
            .delete(&auth, APPOINTMENTS_COLLECTION, id)
            .await?;

        tracing::info!(id = %id, "Appointment deleted");
        Ok(Scoped::Authenticated(()))
    }
}

/// The five user-editable fields, with the date normalized.
fn form_write(form: &AppointmentForm) -> StoreResult<DocumentWrite> {
    let scheduled_at = form.scheduled_at()?;

    Ok(DocumentWrite::new()
        .set("cliente", form.client_name.as_str())
        .set("telefone", form.phone.clone().map_or(Value::Null, Value::String))
        .set("endereco", form.address.as_str())
        .set("descricao", form.description.as_str())
        .set_timestamp("data", scheduled_at))
}

fn decode(document: &Document) -> StoreResult<Appointment> {
    document.decode()
}
