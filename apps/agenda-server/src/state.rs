//! Application state.

use std::sync::Arc;

use agenda_store::AppointmentRepository;
use auth::{AuthenticatedUser, JwtConfig, JwtManager, MemorySignInStateStore, Session};

use crate::backend::Backend;
use crate::config::Config;

/// Shared application state.
pub struct AppState {
    /// Server configuration.
    pub config: Config,
    /// Store and identity provider.
    pub backend: Backend,
    /// Issues and validates session tokens.
    pub jwt_manager: JwtManager,
    /// Sign-ins waiting for their popup callback.
    pub sign_in_states: MemorySignInStateStore,
}

impl AppState {
    /// Creates new application state.
    pub fn new(config: Config, backend: Backend) -> Self {
        let jwt_manager = JwtManager::new(
            JwtConfig::new(&config.jwt_secret).with_expiration_hours(config.jwt_expiration_hours),
        );

        Self {
            config,
            backend,
            jwt_manager,
            sign_in_states: MemorySignInStateStore::default(),
        }
    }

    /// Returns a repository acting for `user` for the duration of one request.
    pub fn repository(&self, user: Option<AuthenticatedUser>) -> AppointmentRepository {
        AppointmentRepository::new(self.backend.store.clone(), Session::for_user(user))
    }
}

/// Type alias for shared state.
pub type SharedState = Arc<AppState>;

/// Creates shared state from config and backend.
pub fn create_shared_state(config: Config, backend: Backend) -> SharedState {
    Arc::new(AppState::new(config, backend))
}
