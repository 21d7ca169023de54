//! Appointment entity definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{DateParseError, normalize_date};

/// A scheduled appointment ("agendamento") as stored.
///
/// Field names on the wire follow the stored document layout so that records
/// written by other clients of the same collection deserialize unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    /// Identifier assigned by the store.
    pub id: String,
    /// Client name.
    #[serde(rename = "cliente")]
    pub client_name: String,
    /// Contact phone.
    #[serde(rename = "telefone", default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Service address.
    #[serde(rename = "endereco")]
    pub address: String,
    /// Free-text description.
    #[serde(rename = "descricao")]
    pub description: String,
    /// When the appointment takes place.
    #[serde(rename = "data")]
    pub scheduled_at: DateTime<Utc>,
    /// Identifier of the owning user.
    #[serde(rename = "userId")]
    pub user_id: String,
    /// When the store accepted the record.
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl Appointment {
    /// Returns true if `user_id` owns this appointment.
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }

    /// Returns the user-editable part of this appointment.
    ///
    /// The scheduled time is rendered in RFC 3339 so that it parses back to
    /// the same instant.
    pub fn to_form(&self) -> AppointmentForm {
        AppointmentForm {
            client_name: self.client_name.clone(),
            phone: self.phone.clone(),
            address: self.address.clone(),
            description: self.description.clone(),
            date: self.scheduled_at.to_rfc3339(),
        }
    }
}

/// The fields a user submits when creating or editing an appointment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentForm {
    /// Client name.
    #[serde(rename = "cliente")]
    pub client_name: String,
    /// Contact phone.
    #[serde(rename = "telefone", default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Service address.
    #[serde(rename = "endereco")]
    pub address: String,
    /// Free-text description.
    #[serde(rename = "descricao")]
    pub description: String,
    /// Date or date-time string, see [`normalize_date`].
    #[serde(rename = "data")]
    pub date: String,
}

impl AppointmentForm {
    /// Creates a form without a phone number.
    pub fn new(
        client_name: impl Into<String>,
        address: impl Into<String>,
        description: impl Into<String>,
        date: impl Into<String>,
    ) -> Self {
        Self {
            client_name: client_name.into(),
            phone: None,
            address: address.into(),
            description: description.into(),
            date: date.into(),
        }
    }

    /// Sets the phone number.
    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    /// Parses the submitted date.
    pub fn scheduled_at(&self) -> Result<DateTime<Utc>, DateParseError> {
        normalize_date(&self.date)
    }
}
