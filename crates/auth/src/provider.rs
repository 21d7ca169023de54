//! Identity provider seam
//!
//! The session manager never talks to a provider's protocol directly. It asks
//! an [`IdentityProvider`] to run a popup sign-in, to sign out, and for a
//! stream of auth-state changes.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::watch;

use crate::{
    AuthError, AuthResult, AuthenticatedUser, AuthorizationState, MemorySignInStateStore,
    OidcClient, SignInStateStore, SELECT_ACCOUNT_PROMPT,
};

/// Options for a popup sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SignInOptions {
    /// `prompt` parameter forwarded to the provider.
    pub prompt: Option<String>,
}

impl SignInOptions {
    /// Options that always show the account chooser.
    pub fn select_account() -> Self {
        Self {
            prompt: Some(SELECT_ACCOUNT_PROMPT.to_string()),
        }
    }
}

/// A federated identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Runs a popup sign-in and resolves once the provider completes.
    ///
    /// The signed-in user is also published on [`auth_state_changes`].
    ///
    /// [`auth_state_changes`]: IdentityProvider::auth_state_changes
    async fn sign_in_with_popup(&self, options: &SignInOptions) -> AuthResult<AuthenticatedUser>;

    /// Signs the current user out.
    async fn sign_out(&self) -> AuthResult<()>;

    /// Returns a receiver that holds the current user and observes every change.
    fn auth_state_changes(&self) -> watch::Receiver<Option<AuthenticatedUser>>;
}

/// What the next popup does in a [`MemoryIdentityProvider`].
#[derive(Debug, Clone)]
pub enum PopupOutcome {
    /// The user picks this account.
    SelectAccount(AuthenticatedUser),
    /// The user closes the popup.
    Close,
    /// The browser blocks the popup.
    Block,
}

/// Scripted identity provider for tests and local development.
///
/// Each popup consumes the next queued [`PopupOutcome`]; with nothing queued
/// the popup behaves as if the user closed it.
#[derive(Debug)]
pub struct MemoryIdentityProvider {
    current: watch::Sender<Option<AuthenticatedUser>>,
    outcomes: Mutex<VecDeque<PopupOutcome>>,
    last_options: Mutex<Option<SignInOptions>>,
}

impl MemoryIdentityProvider {
    /// Creates a provider with nobody signed in.
    pub fn new() -> Self {
        Self {
            current: watch::Sender::new(None),
            outcomes: Mutex::new(VecDeque::new()),
            last_options: Mutex::new(None),
        }
    }

    /// Creates a provider with a restored sign-in.
    pub fn signed_in(user: AuthenticatedUser) -> Self {
        let provider = Self::new();
        provider.current.send_replace(Some(user));
        provider
    }

    /// Queues the outcome of the next popup.
    pub fn queue_popup(&self, outcome: PopupOutcome) {
        self.outcomes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(outcome);
    }

    /// Replaces the current user as if the provider changed it on its own
    /// (token revoked, account switched in another tab).
    pub fn set_current_user(&self, user: Option<AuthenticatedUser>) {
        self.current.send_replace(user);
    }

    /// Returns the options passed to the most recent popup.
    pub fn last_sign_in_options(&self) -> Option<SignInOptions> {
        self.last_options
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for MemoryIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    async fn sign_in_with_popup(&self, options: &SignInOptions) -> AuthResult<AuthenticatedUser> {
        *self
            .last_options
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(options.clone());

        let outcome = self
            .outcomes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();

        match outcome {
            Some(PopupOutcome::SelectAccount(user)) => {
                self.current.send_replace(Some(user.clone()));
                Ok(user)
            }
            Some(PopupOutcome::Block) => Err(AuthError::PopupBlocked),
            Some(PopupOutcome::Close) | None => Err(AuthError::PopupClosed),
        }
    }

    async fn sign_out(&self) -> AuthResult<()> {
        self.current.send_replace(None);
        Ok(())
    }

    fn auth_state_changes(&self) -> watch::Receiver<Option<AuthenticatedUser>> {
        self.current.subscribe()
    }
}

/// Query parameters the provider appends to the redirect URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopupCallback {
    /// Authorization code.
    pub code: String,
    /// CSRF state echoed back.
    pub state: String,
}

/// Opens the sign-in popup and waits for it to reach the redirect URL.
#[async_trait]
pub trait PopupLauncher: Send + Sync {
    /// Opens `authorization_url` and returns the callback parameters.
    ///
    /// Implementations report a blocked window as [`AuthError::PopupBlocked`]
    /// and a window closed before the redirect as [`AuthError::PopupClosed`].
    async fn open(&self, authorization_url: &str) -> AuthResult<PopupCallback>;
}

/// Identity provider backed by an OIDC issuer.
pub struct OidcIdentityProvider<L> {
    client: OidcClient,
    launcher: L,
    pending: MemorySignInStateStore,
    current: watch::Sender<Option<AuthenticatedUser>>,
}

impl<L: PopupLauncher> OidcIdentityProvider<L> {
    /// Creates a provider from a discovered client and a popup launcher.
    pub fn new(client: OidcClient, launcher: L) -> Self {
        Self {
            client,
            launcher,
            pending: MemorySignInStateStore::default(),
            current: watch::Sender::new(None),
        }
    }

    async fn open_popup(
        &self,
        state: &AuthorizationState,
        options: &SignInOptions,
    ) -> AuthResult<PopupCallback> {
        let url = self
            .client
            .auth()
            .authorization_url_with_prompt(state, options.prompt.as_deref())?;
        self.launcher.open(&url).await
    }

    /// Drops the pending state of a sign-in that will never complete.
    async fn abandon(&self, state: &AuthorizationState) {
        if self.pending.take(&state.state).await.is_ok() {
            tracing::debug!("Discarded pending sign-in state");
        }
    }
}

#[async_trait]
impl<L: PopupLauncher> IdentityProvider for OidcIdentityProvider<L> {
    async fn sign_in_with_popup(&self, options: &SignInOptions) -> AuthResult<AuthenticatedUser> {
        let expired = self.pending.cleanup_expired().await?;
        if expired > 0 {
            tracing::debug!(expired, "Removed expired sign-in states");
        }

        let state = AuthorizationState::new();
        self.pending.store(&state).await?;

        let callback = match self.open_popup(&state, options).await {
            Ok(callback) => callback,
            Err(e) => {
                self.abandon(&state).await;
                return Err(e);
            }
        };

        let pending = match self.pending.take(&callback.state).await {
            Ok(pending) => pending,
            Err(e) => {
                tracing::warn!("Popup callback carried an unknown state");
                self.abandon(&state).await;
                return Err(e);
            }
        };
        let user = self.client.complete_sign_in(&callback.code, &pending).await?;

        self.current.send_replace(Some(user.clone()));
        Ok(user)
    }

    async fn sign_out(&self) -> AuthResult<()> {
        self.current.send_replace(None);
        Ok(())
    }

    fn auth_state_changes(&self) -> watch::Receiver<Option<AuthenticatedUser>> {
        self.current.subscribe()
    }
}
