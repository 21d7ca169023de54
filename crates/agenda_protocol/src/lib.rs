//! HTTP protocol definitions for Agenda server/client communication
//!
//! This crate defines the JSON bodies exchanged with the Agenda server: the
//! auth endpoints used by the sign-in popup, the appointment endpoints, and
//! the error envelope every failing endpoint returns.

mod error;
pub mod requests;
pub mod responses;

pub use error::*;
