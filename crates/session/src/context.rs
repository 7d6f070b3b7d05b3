//! Session state machine
//!
//! ```text
//! Unauthenticated -> Authenticating -> Authenticated <-> Refreshing
//!        ^                 |                                 |
//!        +-----------------+----------- Expired <------------+
//! ```
//!
//! The context is the only writer of the identity. Credential renewal is
//! driven by the [`ApiClient`]; the context follows it through a
//! [`SessionObserver`] and, when renewal fails, drops the identity and sends
//! the user back to the login page.

use crate::navigator::{Navigator, Route};
use hrdesk_core::{CredentialPair, Identity, Role};
use hrdesk_http::types::{LoginRequest, RegistrationRequest, UserResponse};
use hrdesk_http::{ApiClient, ClientError, SessionObserver};
use std::sync::{Arc, Weak};
use tokio::sync::watch;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Unauthenticated,
    Authenticating,
    Authenticated,
    Refreshing,
    Expired,
}

/// Snapshot published to subscribers on every transition
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub phase: SessionPhase,
    pub identity: Option<Identity>,
    /// User-facing message of the last failed login or registration
    pub last_error: Option<String>,
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.identity.as_ref().is_some_and(Identity::is_admin)
    }

    pub fn is_employee(&self) -> bool {
        self.identity.as_ref().is_some_and(Identity::is_employee)
    }

    fn signed_out() -> Self {
        Self::default()
    }
}

/// Authenticated session bound to an [`ApiClient`]
///
/// Cloning is cheap; clones share state.
#[derive(Clone)]
pub struct SessionContext {
    inner: Arc<Inner>,
}

struct Inner {
    client: ApiClient,
    navigator: Arc<dyn Navigator>,
    state: watch::Sender<SessionState>,
}

impl SessionContext {
    /// Create a signed-out session and register it as the client's observer
    pub fn new(client: ApiClient, navigator: Arc<dyn Navigator>) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        let inner = Arc::new(Inner {
            client,
            navigator,
            state,
        });
        inner.client.set_observer(Arc::new(RenewalEvents {
            session: Arc::downgrade(&inner),
        }));
        Self { inner }
    }

    pub fn client(&self) -> &ApiClient {
        &self.inner.client
    }

    /// Receive every state change
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    pub fn state(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    pub fn phase(&self) -> SessionPhase {
        self.inner.state.borrow().phase
    }

    pub fn identity(&self) -> Option<Identity> {
        self.inner.state.borrow().identity.clone()
    }

    pub fn last_error(&self) -> Option<String> {
        self.inner.state.borrow().last_error.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.state.borrow().is_authenticated()
    }

    pub fn is_admin(&self) -> bool {
        self.inner.state.borrow().is_admin()
    }

    pub fn is_employee(&self) -> bool {
        self.inner.state.borrow().is_employee()
    }

    /// Sign in and navigate to the role's home page.
    ///
    /// Employees may pass their employee number instead of an email. On
    /// failure the previous session (signed in or not) is left as it was
    /// and the error is also kept in [`SessionState::last_error`].
    pub async fn login(
        &self,
        identifier: &str,
        secret: &str,
        role: Role,
    ) -> Result<Identity, ClientError> {
        let previous = self.begin();
        info!(%role, "signing in");

        let request = LoginRequest::new(identifier, secret, role);
        let result = match self.inner.client.login(&request).await {
            Ok(response) => {
                let pair = response.credentials();
                self.establish(pair, response.user).await
            }
            Err(error) => Err(error),
        };

        self.conclude(result, previous)
    }

    /// Create an account.
    ///
    /// When the backend answers with credentials this is an implicit login
    /// and the identity is returned. Otherwise the session stays signed out,
    /// the user is sent to the landing page, and `None` is returned.
    pub async fn register(
        &self,
        request: &RegistrationRequest,
    ) -> Result<Option<Identity>, ClientError> {
        let previous = self.begin();
        info!(role = %request.user_type, "registering account");

        let credentials = match self.inner.client.register(request).await {
            Ok(response) => response.credentials(),
            Err(error) => return self.conclude(Err(error), previous).map(Some),
        };

        let Some(pair) = credentials else {
            info!("account created, no credentials issued");
            self.inner.state.send_replace(SessionState::signed_out());
            self.inner.navigator.navigate(Route::Landing);
            return Ok(None);
        };

        let result = self.establish(pair, None).await;
        self.conclude(result, previous).map(Some)
    }

    /// Sign out locally and go to the landing page
    pub fn logout(&self) {
        info!("signing out");
        self.inner.client.token_store().clear();
        self.inner.state.send_replace(SessionState::signed_out());
        self.inner.navigator.navigate(Route::Landing);
    }

    /// Load the identity for the stored credential.
    ///
    /// Returns `None` without touching anything when no credential is
    /// stored. Any failure to load the profile signs the session out.
    pub async fn fetch_identity(&self) -> Option<Identity> {
        if self.inner.client.token_store().access_token().is_none() {
            debug!("no stored credential, skipping identity fetch");
            return None;
        }

        match self.inner.client.current_user().await {
            Ok(user) => {
                let identity = Identity::from(user);
                debug!(id = identity.id, role = %identity.role, "identity loaded");
                self.inner.state.send_modify(|state| {
                    state.phase = SessionPhase::Authenticated;
                    state.identity = Some(identity.clone());
                });
                Some(identity)
            }
            Err(error) => {
                warn!(%error, "failed to load identity, signing out");
                self.inner.client.token_store().clear();
                self.inner.state.send_replace(SessionState::signed_out());
                None
            }
        }
    }

    /// Revalidate persisted credentials at startup
    pub async fn restore(&self) -> Option<Identity> {
        if self.inner.client.token_store().get().is_none() {
            self.inner.state.send_replace(SessionState::signed_out());
            return None;
        }

        self.inner
            .state
            .send_modify(|state| state.phase = SessionPhase::Authenticating);
        self.fetch_identity().await
    }

    /// Enter `Authenticating`, returning the state to fall back to
    fn begin(&self) -> SessionState {
        let mut previous = SessionState::default();
        self.inner.state.send_modify(|state| {
            previous = state.clone();
            state.phase = SessionPhase::Authenticating;
            state.last_error = None;
        });
        previous
    }

    /// Store freshly issued credentials and resolve who they belong to.
    /// If that fails, the credentials stored before are put back.
    async fn establish(
        &self,
        pair: CredentialPair,
        user: Option<UserResponse>,
    ) -> Result<Identity, ClientError> {
        let store = self.inner.client.token_store();
        let replaced = store.get();
        store.set(pair);

        if let Some(user) = user {
            return Ok(user.into());
        }

        self.inner
            .client
            .current_user()
            .await
            .map(Identity::from)
            .map_err(|error| {
                warn!(%error, "signed in but the profile could not be loaded");
                match replaced {
                    Some(pair) => store.set(pair),
                    None => store.clear(),
                }
                ClientError::AuthenticationFailed("unable to load user profile".to_string())
            })
    }

    fn conclude(
        &self,
        result: Result<Identity, ClientError>,
        previous: SessionState,
    ) -> Result<Identity, ClientError> {
        match result {
            Ok(identity) => {
                info!(id = identity.id, role = %identity.role, "signed in");
                self.inner.state.send_replace(SessionState {
                    phase: SessionPhase::Authenticated,
                    identity: Some(identity.clone()),
                    last_error: None,
                });
                self.inner.navigator.navigate(Route::home_for(&identity));
                Ok(identity)
            }
            Err(error) => {
                warn!(%error, "sign in failed");
                self.inner.state.send_replace(SessionState {
                    last_error: Some(error.user_message()),
                    ..previous
                });
                Err(error)
            }
        }
    }
}

/// Follows the client's credential renewals
struct RenewalEvents {
    session: Weak<Inner>,
}

impl SessionObserver for RenewalEvents {
    fn renewal_started(&self) {
        if let Some(inner) = self.session.upgrade() {
            inner.state.send_if_modified(|state| {
                let renewing = state.phase == SessionPhase::Authenticated;
                if renewing {
                    state.phase = SessionPhase::Refreshing;
                }
                renewing
            });
        }
    }

    fn renewal_succeeded(&self) {
        if let Some(inner) = self.session.upgrade() {
            inner.state.send_if_modified(|state| {
                let renewed = state.phase == SessionPhase::Refreshing;
                if renewed {
                    state.phase = SessionPhase::Authenticated;
                }
                renewed
            });
        }
    }

    fn session_expired(&self) {
        let Some(inner) = self.session.upgrade() else {
            return;
        };

        info!("session expired, redirecting to login");
        inner.state.send_modify(|state| {
            state.phase = SessionPhase::Expired;
            state.identity = None;
        });
        inner.state.send_replace(SessionState::signed_out());
        inner.navigator.navigate(Route::Login);
    }
}
