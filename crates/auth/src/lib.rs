//! Federated sign-in and session state for Agenda.
//!
//! This crate provides:
//! - An identity provider seam with popup sign-in and a change stream
//! - The observable session shared by every component that needs identity
//! - OIDC authorization code flow with PKCE (Google by default)
//! - Session tokens (JWT) for the HTTP surface

mod error;
mod jwt;
mod oidc;
mod provider;
mod session;
mod state_store;
mod user;

pub use error::*;
pub use jwt::*;
pub use oidc::*;
pub use provider::*;
pub use session::*;
pub use state_store::*;
pub use user::*;

/// Default JWT expiration time in hours.
pub const DEFAULT_JWT_EXPIRATION_HOURS: u64 = 24;

/// Default JWT issuer.
pub const DEFAULT_JWT_ISSUER: &str = "agenda";

/// Route the UI shows to signed-out users.
pub const LOGIN_ROUTE: &str = "/login";

/// Maximum age of a pending sign-in, in seconds.
pub const SIGN_IN_STATE_MAX_AGE_SECS: i64 = 600;
