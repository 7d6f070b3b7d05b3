//! Single-flight credential renewal
//!
//! When a business call is answered with 401, the caller asks the
//! [`Refresher`] for a fresh access credential. At most one renewal request
//! is in flight at any time: the first caller creates it and parks it in a
//! shared slot, every later caller awaits that same future. The renewed
//! pair is written to the [`TokenStore`] inside the renewal itself, so it is
//! visible before any waiter wakes up and replays its request.

use super::store::TokenStore;
use crate::types::{RefreshRequest, RefreshResponse};
use futures::future::{FutureExt, Shared};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// Renewal endpoint, relative to the API base URL
pub const REFRESH_PATH: &str = "/api/auth/token/refresh/";

/// Why a renewal did not produce a new access credential
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenewalError {
    #[error("no refresh credential stored")]
    MissingRefreshToken,

    #[error("refresh credential rejected with status {status}")]
    Rejected { status: u16 },

    #[error("renewal request failed: {0}")]
    Transport(String),

    #[error("malformed renewal response: {0}")]
    Malformed(String),

    /// Credentials were cleared by someone else (logout, an earlier failed
    /// renewal) while this request was outstanding
    #[error("session was signed out")]
    SignedOut,
}

/// Receives session lifecycle events raised by the refresher
pub trait SessionObserver: Send + Sync {
    /// A renewal request has been started
    fn renewal_started(&self) {}

    /// The renewed credential has been stored
    fn renewal_succeeded(&self) {}

    /// Renewal failed; credentials have already been cleared
    fn session_expired(&self);
}

type RenewalOutcome = Result<String, RenewalError>;

#[cfg(not(target_arch = "wasm32"))]
type RenewalTask = futures::future::BoxFuture<'static, RenewalOutcome>;
#[cfg(target_arch = "wasm32")]
type RenewalTask = futures::future::LocalBoxFuture<'static, RenewalOutcome>;

type Renewal = Shared<RenewalTask>;

/// Coordinates credential renewal for every request issued by a client
pub struct Refresher {
    http: reqwest::Client,
    url: String,
    store: Arc<dyn TokenStore>,
    in_flight: Mutex<Option<Renewal>>,
    observer: RwLock<Option<Arc<dyn SessionObserver>>>,
}

impl Refresher {
    pub fn new(http: reqwest::Client, base_url: &str, store: Arc<dyn TokenStore>) -> Self {
        Self {
            http,
            url: format!("{base_url}{REFRESH_PATH}"),
            store,
            in_flight: Mutex::new(None),
            observer: RwLock::new(None),
        }
    }

    /// Register (or remove) the session observer
    pub fn set_observer(&self, observer: Option<Arc<dyn SessionObserver>>) {
        *self.observer.write().unwrap_or_else(PoisonError::into_inner) = observer;
    }

    fn observer(&self) -> Option<Arc<dyn SessionObserver>> {
        self.observer
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether a renewal request is currently outstanding
    pub fn is_renewing(&self) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Produce an access credential to replay a request that was refused
    /// while carrying `rejected`.
    ///
    /// If the store already holds a different credential, another request
    /// has completed a renewal in the meantime and that credential is used
    /// as is.
    pub async fn recover(&self, rejected: Option<&str>) -> RenewalOutcome {
        match (self.store.access_token(), rejected) {
            (Some(current), Some(rejected)) if current != rejected => {
                debug!("access credential already rotated, replaying");
                return Ok(current);
            }
            (None, Some(_)) => return Err(RenewalError::SignedOut),
            _ => {}
        }

        self.renew().await
    }

    /// Start a renewal, or join the one already in flight
    pub async fn renew(&self) -> RenewalOutcome {
        let renewal = self.join_or_start();
        let outcome = renewal.clone().await;
        self.release(&renewal);
        outcome
    }

    fn join_or_start(&self) -> Renewal {
        let (renewal, observer) = {
            let mut slot = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(renewal) = slot.as_ref() {
                debug!("joining renewal already in flight");
                return renewal.clone();
            }

            let observer = self.observer();
            let task: RenewalTask = Box::pin(renew_access(
                self.http.clone(),
                self.url.clone(),
                Arc::clone(&self.store),
                observer.clone(),
            ));
            let renewal = task.shared();
            *slot = Some(renewal.clone());
            (renewal, observer)
        };

        info!("access credential expired, starting renewal");
        if let Some(observer) = observer {
            observer.renewal_started();
        }
        renewal
    }

    /// Empty the slot if it still holds `renewal`
    fn release(&self, renewal: &Renewal) {
        let mut slot = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if slot
            .as_ref()
            .is_some_and(|current| current.ptr_eq(renewal))
        {
            *slot = None;
        }
    }
}

async fn renew_access(
    http: reqwest::Client,
    url: String,
    store: Arc<dyn TokenStore>,
    observer: Option<Arc<dyn SessionObserver>>,
) -> RenewalOutcome {
    let outcome = request_access(&http, &url, &*store).await;

    match &outcome {
        Ok(_) => {
            info!("access credential renewed");
            if let Some(observer) = &observer {
                observer.renewal_succeeded();
            }
        }
        Err(RenewalError::SignedOut) => {
            debug!("signed out while renewing, discarding renewed credential");
        }
        Err(error) => {
            warn!(%error, "credential renewal failed, signing out");
            store.clear();
            if let Some(observer) = &observer {
                observer.session_expired();
            }
        }
    }

    outcome
}

async fn request_access(
    http: &reqwest::Client,
    url: &str,
    store: &dyn TokenStore,
) -> RenewalOutcome {
    let pair = store.get().ok_or(RenewalError::MissingRefreshToken)?;

    let response = http
        .post(url)
        .json(&RefreshRequest {
            refresh: &pair.refresh,
        })
        .send()
        .await
        .map_err(|e| RenewalError::Transport(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(RenewalError::Rejected {
            status: status.as_u16(),
        });
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| RenewalError::Transport(e.to_string()))?;
    let renewed: RefreshResponse =
        serde_json::from_slice(&body).map_err(|e| RenewalError::Malformed(e.to_string()))?;

    // a logout that raced the renewal wins
    if store.get().as_ref().map(|current| &current.refresh) != Some(&pair.refresh) {
        return Err(RenewalError::SignedOut);
    }

    store.set(pair.rotate(renewed.access.clone(), renewed.refresh));
    Ok(renewed.access)
}
