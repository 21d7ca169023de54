//! Pending sign-in storage
//!
//! Between opening the popup and receiving its callback, the authorization
//! state (CSRF token and PKCE verifier) is kept here.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{AuthError, AuthResult, AuthorizationState};

/// Trait for pending sign-in storage
#[async_trait]
pub trait SignInStateStore: Send + Sync {
    /// Store an authorization state
    async fn store(&self, state: &AuthorizationState) -> AuthResult<()>;

    /// Retrieve and remove an authorization state by state token
    ///
    /// A state can be taken once. Unknown or expired tokens are rejected with
    /// [`AuthError::InvalidState`].
    async fn take(&self, state_token: &str) -> AuthResult<AuthorizationState>;

    /// Remove expired states, returning how many were removed
    async fn cleanup_expired(&self) -> AuthResult<usize>;
}

/// In-memory pending sign-in store
#[derive(Debug)]
pub struct MemorySignInStateStore {
    states: RwLock<HashMap<String, AuthorizationState>>,
    max_age_secs: i64,
}

impl MemorySignInStateStore {
    /// Create a store whose states expire after `max_age_secs`
    pub fn new(max_age_secs: i64) -> Self {
        Self {
            states: RwLock::new(HashMap::new()),
            max_age_secs,
        }
    }

    /// Number of pending states, expired ones included
    pub async fn len(&self) -> usize {
        self.states.read().await.len()
    }

    /// Returns true if no sign-in is pending
    pub async fn is_empty(&self) -> bool {
        self.states.read().await.is_empty()
    }
}

impl Default for MemorySignInStateStore {
    fn default() -> Self {
        Self::new(crate::SIGN_IN_STATE_MAX_AGE_SECS)
    }
}

#[async_trait]
impl SignInStateStore for MemorySignInStateStore {
    async fn store(&self, state: &AuthorizationState) -> AuthResult<()> {
        let mut states = self.states.write().await;
        states.insert(state.state.clone(), state.clone());
        Ok(())
    }

    async fn take(&self, state_token: &str) -> AuthResult<AuthorizationState> {
        let mut states = self.states.write().await;
        let state = states
            .remove(state_token)
            .ok_or_else(|| AuthError::InvalidState("unknown or already used".to_string()))?;

        if state.is_expired(self.max_age_secs) {
            tracing::debug!("Rejected expired sign-in state");
            return Err(AuthError::InvalidState("expired".to_string()));
        }

        Ok(state)
    }

    async fn cleanup_expired(&self) -> AuthResult<usize> {
        let mut states = self.states.write().await;
        let before_count = states.len();
        states.retain(|_, state| !state.is_expired(self.max_age_secs));
        Ok(before_count - states.len())
    }
}
