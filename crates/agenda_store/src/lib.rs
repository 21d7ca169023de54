//! Document storage and the appointment repository for Agenda
//!
//! This crate provides a document store abstraction modelled on hosted
//! document databases: schemaless JSON documents in named collections,
//! server-assigned ids and timestamps, and access rules evaluated by the
//! store itself. It ships an in-memory backend and a SQLite backend, and the
//! owner-scoped [`AppointmentRepository`] built on top of them.

mod document;
mod error;
mod memory;
mod repository;
mod rules;
mod sqlite;
mod store;

pub use document::*;
pub use error::*;
pub use memory::*;
pub use repository::*;
pub use rules::*;
pub use sqlite::*;
pub use store::*;
