//! Core entity definitions for Agenda.
//!
//! This crate defines the data shapes shared by the appointment store, the
//! HTTP surface, and clients: stored appointments, the form a user submits,
//! and the rule that turns the form's date string into a timestamp.

mod appointment;
mod date;

pub use appointment::*;
pub use date::*;
