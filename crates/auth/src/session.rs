//! Observable session state
//!
//! [`SessionManager`] is the single writer of the session: it mirrors the
//! identity provider's change stream into a `watch` channel. Everything else
//! reads through cloneable [`Session`] handles.

use std::sync::{Arc, OnceLock};

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::{AuthResult, AuthenticatedUser, IdentityProvider, SignInOptions, LOGIN_ROUTE};

/// Who is signed in, as far as this process knows.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    /// The provider has not reported yet.
    #[default]
    Loading,
    /// A user is signed in.
    Authenticated(AuthenticatedUser),
    /// Nobody is signed in.
    Anonymous,
}

impl SessionState {
    /// Maps a provider notification to a resolved state.
    pub fn from_user(user: Option<AuthenticatedUser>) -> Self {
        match user {
            Some(user) => Self::Authenticated(user),
            None => Self::Anonymous,
        }
    }

    /// Returns the signed-in user, if any.
    pub fn user(&self) -> Option<&AuthenticatedUser> {
        match self {
            Self::Authenticated(user) => Some(user),
            Self::Loading | Self::Anonymous => None,
        }
    }

    /// Returns true until the provider has reported once.
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }
}

/// Read-only handle to the session.
#[derive(Debug, Clone)]
pub struct Session {
    rx: watch::Receiver<SessionState>,
}

impl Session {
    /// Creates a handle that always reports `state`.
    ///
    /// Used where identity is established per request rather than by a
    /// long-lived [`SessionManager`].
    pub fn fixed(state: SessionState) -> Self {
        let (_tx, rx) = watch::channel(state);
        Self { rx }
    }

    /// Shorthand for a fixed session for `user`, or an anonymous one.
    pub fn for_user(user: Option<AuthenticatedUser>) -> Self {
        Self::fixed(SessionState::from_user(user))
    }

    /// Returns a snapshot of the current state.
    pub fn state(&self) -> SessionState {
        self.rx.borrow().clone()
    }

    /// Returns the signed-in user, if any.
    pub fn current_user(&self) -> Option<AuthenticatedUser> {
        self.rx.borrow().user().cloned()
    }

    /// Returns true until the provider has reported once.
    pub fn is_loading(&self) -> bool {
        self.rx.borrow().is_loading()
    }

    /// Waits for the next state change and returns the new state.
    ///
    /// Returns `None` once the writer is gone and no further change can happen.
    pub async fn changed(&mut self) -> Option<SessionState> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Waits until the state is no longer [`SessionState::Loading`].
    ///
    /// Returns the current state unchanged if the writer is gone first.
    pub async fn resolved(&mut self) -> SessionState {
        let resolved = self
            .rx
            .wait_for(|state| !state.is_loading())
            .await
            .map(|state| state.clone());
        resolved.unwrap_or_else(|_| self.state())
    }
}

/// Client-side route changes.
pub trait Navigator: Send + Sync {
    /// Moves the UI to `route`. Fire and forget.
    fn navigate_to(&self, route: &str);
}

/// Owns the session and drives it from the identity provider.
pub struct SessionManager {
    provider: Arc<dyn IdentityProvider>,
    navigator: Arc<dyn Navigator>,
    state: Arc<watch::Sender<SessionState>>,
    listener: OnceLock<JoinHandle<()>>,
}

impl SessionManager {
    /// Creates a manager in the [`SessionState::Loading`] state.
    pub fn new(provider: Arc<dyn IdentityProvider>, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            provider,
            navigator,
            state: Arc::new(watch::Sender::new(SessionState::Loading)),
            listener: OnceLock::new(),
        }
    }

    /// Returns a read handle to the session.
    pub fn session(&self) -> Session {
        Session {
            rx: self.state.subscribe(),
        }
    }

    /// Subscribes to the provider's auth-state changes.
    ///
    /// The provider's current value is applied immediately, then every change
    /// overwrites the session. Only the first call subscribes; the listener
    /// lives as long as the manager. Must be called within a tokio runtime.
    pub fn init_auth(&self) {
        self.listener.get_or_init(|| {
            let mut changes = self.provider.auth_state_changes();
            let state = Arc::clone(&self.state);

            tokio::spawn(async move {
                loop {
                    let next = SessionState::from_user(changes.borrow_and_update().clone());
                    match next.user() {
                        Some(user) => tracing::info!(user_id = %user.id, "Session authenticated"),
                        None => tracing::info!("Session anonymous"),
                    }
                    state.send_replace(next);

                    if changes.changed().await.is_err() {
                        tracing::debug!("Identity provider change stream closed");
                        break;
                    }
                }
            })
        });
    }

    /// Opens the Google account chooser popup.
    ///
    /// Resolves when the provider finishes. The session itself is updated by
    /// the subscription started in [`init_auth`](Self::init_auth). Provider
    /// failures, including a blocked or closed popup, are returned as-is.
    pub async fn login_with_google(&self) -> AuthResult<()> {
        let user = self
            .provider
            .sign_in_with_popup(&SignInOptions::select_account())
            .await?;

        tracing::info!(user_id = %user.id, "Popup sign-in completed");
        Ok(())
    }

    /// Signs out, clears the session, then navigates to the login view.
    pub async fn logout(&self) -> AuthResult<()> {
        self.provider.sign_out().await?;

        // Cleared before navigating so the next view never sees the old user.
        self.state.send_replace(SessionState::Anonymous);
        self.navigator.navigate_to(LOGIN_ROUTE);

        tracing::info!("Signed out");
        Ok(())
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.get() {
            listener.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::{AuthError, MemoryIdentityProvider, PopupOutcome};

    #[derive(Default)]
    struct RecordingNavigator {
        routes: Mutex<Vec<String>>,
        seen_on_navigate: Mutex<Vec<SessionState>>,
        session: Mutex<Option<Session>>,
    }

    impl Navigator for RecordingNavigator {
        fn navigate_to(&self, route: &str) {
            self.routes.lock().unwrap().push(route.to_string());
            if let Some(session) = self.session.lock().unwrap().as_ref() {
                self.seen_on_navigate.lock().unwrap().push(session.state());
            }
        }
    }

    fn manager(
        provider: Arc<MemoryIdentityProvider>,
    ) -> (SessionManager, Arc<RecordingNavigator>) {
        let navigator = Arc::new(RecordingNavigator::default());
        let manager = SessionManager::new(provider, navigator.clone());
        *navigator.session.lock().unwrap() = Some(manager.session());
        (manager, navigator)
    }

    #[tokio::test]
    async fn test_starts_loading_until_provider_reports() {
        let provider = Arc::new(MemoryIdentityProvider::new());
        let (manager, _) = manager(provider);
        let mut session = manager.session();

        assert!(session.is_loading());
        assert_eq!(session.current_user(), None);

        manager.init_auth();

        assert_eq!(session.resolved().await, SessionState::Anonymous);
        assert!(!session.is_loading());
    }

    #[tokio::test]
    async fn test_restored_sign_in_is_applied() {
        let user = AuthenticatedUser::new("u-1");
        let provider = Arc::new(MemoryIdentityProvider::signed_in(user.clone()));
        let (manager, _) = manager(provider);
        let mut session = manager.session();

        manager.init_auth();

        assert_eq!(session.resolved().await, SessionState::Authenticated(user));
    }

    #[tokio::test]
    async fn test_login_updates_session_through_subscription() {
        let provider = Arc::new(MemoryIdentityProvider::new());
        let user = AuthenticatedUser::new("u-1").with_name("Ana");
        provider.queue_popup(PopupOutcome::SelectAccount(user.clone()));

        let (manager, _) = manager(provider.clone());
        let mut session = manager.session();
        manager.init_auth();
        session.resolved().await;

        manager.login_with_google().await.unwrap();

        assert_eq!(
            session.changed().await,
            Some(SessionState::Authenticated(user.clone()))
        );
        assert_eq!(session.current_user(), Some(user));
        assert_eq!(
            provider.last_sign_in_options(),
            Some(SignInOptions::select_account())
        );
    }

    #[tokio::test]
    async fn test_login_failure_propagates() {
        let provider = Arc::new(MemoryIdentityProvider::new());
        provider.queue_popup(PopupOutcome::Block);

        let (manager, _) = manager(provider);
        manager.init_auth();

        assert!(matches!(
            manager.login_with_google().await,
            Err(AuthError::PopupBlocked)
        ));
        assert!(matches!(
            manager.login_with_google().await,
            Err(AuthError::PopupClosed)
        ));
    }

    #[tokio::test]
    async fn test_logout_clears_before_navigating() {
        let provider = Arc::new(MemoryIdentityProvider::signed_in(AuthenticatedUser::new(
            "u-1",
        )));
        let (manager, navigator) = manager(provider);
        let mut session = manager.session();
        manager.init_auth();
        assert!(session.resolved().await.user().is_some());

        manager.logout().await.unwrap();

        assert_eq!(session.current_user(), None);
        assert_eq!(*navigator.routes.lock().unwrap(), vec![LOGIN_ROUTE.to_string()]);
        assert_eq!(
            *navigator.seen_on_navigate.lock().unwrap(),
            vec![SessionState::Anonymous]
        );
    }

    #[tokio::test]
    async fn test_init_auth_subscribes_once() {
        let provider = Arc::new(MemoryIdentityProvider::new());
        let (manager, _) = manager(provider.clone());
        let mut session = manager.session();

        manager.init_auth();
        manager.init_auth();
        session.resolved().await;

        provider.set_current_user(Some(AuthenticatedUser::new("u-2")));
        let next = session.changed().await.unwrap();
        assert_eq!(next.user().map(|u| u.id.as_str()), Some("u-2"));
    }

    #[test]
    fn test_fixed_session() {
        let session = Session::for_user(Some(AuthenticatedUser::new("u-1")));
        assert_eq!(session.current_user().map(|u| u.id), Some("u-1".to_string()));
        assert!(!session.is_loading());

        let anonymous = Session::for_user(None);
        assert_eq!(anonymous.state(), SessionState::Anonymous);
    }
}
