use std::path::PathBuf;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;

use super::activity::{ActivityListener, ActivityMonitor, IdleStatus};
use super::config::SessionConfig;
use super::credentials::CredentialStore;
use super::profile::{ProfileError, ProfileSync};
use super::stores::{FileStore, MemoryStore};
use super::traits::{AuthBackend, KeyValueStore};
use super::types::{RegisterRequest, SessionSnapshot};
use crate::error::{BackendError, Error};
use crate::types::{Identity, SessionToken};

/// The durable and ephemeral tiers the session token is kept in.
#[derive(Clone)]
pub struct StorageTiers {
    durable: Arc<dyn KeyValueStore>,
    ephemeral: Arc<dyn KeyValueStore>,
}

impl StorageTiers {
    #[must_use]
    pub fn new(durable: Arc<dyn KeyValueStore>, ephemeral: Arc<dyn KeyValueStore>) -> Self {
        Self { durable, ephemeral }
    }

    /// Durable tier in a JSON file at `path`, ephemeral tier in memory.
    #[must_use]
    pub fn on_disk(path: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(FileStore::new(path)), Arc::new(MemoryStore::new()))
    }

    /// Both tiers in memory.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()), Arc::new(MemoryStore::new()))
    }
}

/// Owns the session of a running application.
///
/// Construct one at the application root and hand out clones; every clone
/// shares the same session. Consumers read [`snapshot`](Self::snapshot) or
/// [`subscribe`](Self::subscribe) to changes.
///
/// ```rust,ignore
/// let session = SessionController::new(backend, StorageTiers::on_disk(path), SessionConfig::from_env()?);
/// session.resolve().await;
///
/// let user = session.login("alice", "secret").await?;
/// assert_eq!(session.snapshot().user.as_ref(), Some(&user));
/// ```
pub struct SessionController<B> {
    inner: Arc<Inner<B>>,
}

// Manual Clone: avoid derive adding a `B: Clone` bound.
impl<B> Clone for SessionController<B> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

struct Inner<B> {
    backend: Arc<B>,
    profiles: ProfileSync<B>,
    credentials: CredentialStore,
    monitor: ActivityMonitor,
    idle_limit: Duration,
    state: watch::Sender<SessionSnapshot>,
    // held for the synchronous part of every state transition
    transition: Mutex<()>,
    // token whose profile fetch is in flight
    fetching: Mutex<Option<SessionToken>>,
}

/// Releases the in-flight slot even if the fetch future is dropped.
struct InFlight<'a> {
    slot: &'a Mutex<Option<SessionToken>>,
    token: &'a SessionToken,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut slot = self.slot.lock();
        // a fetch for a newer token may have taken the slot over
        if slot.as_ref() == Some(self.token) {
            *slot = None;
        }
    }
}

impl<B: AuthBackend> SessionController<B> {
    #[must_use]
    pub fn new(backend: B, tiers: StorageTiers, config: SessionConfig) -> Self {
        let backend = Arc::new(backend);
        let (state, _) = watch::channel(SessionSnapshot::resolving());
        Self {
            inner: Arc::new(Inner {
                profiles: ProfileSync::new(backend.clone()),
                backend,
                credentials: CredentialStore::new(tiers.durable, tiers.ephemeral, config.token_key),
                monitor: ActivityMonitor::new(config.check_interval, config.warning_lead),
                idle_limit: config.idle_limit,
                state,
                transition: Mutex::new(()),
                fetching: Mutex::new(None),
            }),
        }
    }

    /// Current `{token, user, loading}` view.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.state.borrow().clone()
    }

    /// Receiver notified on every session change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.state.subscribe()
    }

    /// Handle for feeding interaction events to the idle monitor.
    #[must_use]
    pub fn activity_listener(&self) -> ActivityListener {
        self.inner.monitor.listener()
    }

    /// Idle state, for rendering an expiry warning.
    #[must_use]
    pub fn idle_status(&self) -> watch::Receiver<IdleStatus> {
        self.inner.monitor.status()
    }

    /// Resolve the session at application start.
    ///
    /// Picks up a token left by the same browser session and fetches its
    /// profile. `loading` stays `true` until this returns.
    pub async fn resolve(&self) {
        let Some(token) = self.inner.credentials.initialize() else {
            tracing::debug!("No session token found");
            self.inner.state.send_modify(|s| s.loading = false);
            return;
        };

        {
            let _t = self.inner.transition.lock();
            self.inner.state.send_modify(|s| {
                s.token = Some(token.clone());
                s.loading = true;
            });
        }
        self.sync_profile(token).await;
    }

    /// Sign in and resolve the profile before returning.
    ///
    /// # Errors
    ///
    /// - [`Error::Authentication`] if the credentials are rejected
    /// - [`Error::InvalidToken`] / [`Error::Transient`] if the profile fetch
    ///   for the new token fails; nothing is stored in that case
    /// - [`Error::Storage`] if the token could not be persisted
    pub async fn login(&self, username: &str, password: &str) -> Result<Identity, Error> {
        let token = self
            .inner
            .backend
            .login(username, password)
            .await
            .map_err(|e| credential_error("Login", e))?;

        let user = self.inner.profiles.fetch_profile(&token).await.map_err(|e| {
            tracing::error!(error = %e, username = %username, "Profile fetch after login failed");
            Error::from(e)
        })?;

        self.establish(token, user.clone())?;
        tracing::info!(username = %user.username, role = %user.role, "Login successful");
        Ok(user)
    }

    /// Create an account and sign in with the same credentials.
    ///
    /// # Errors
    ///
    /// [`Error::Authentication`] if the backend rejects the registration
    /// (including mismatched password confirmation), otherwise the errors of
    /// [`login`](Self::login).
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
        confirm_password: &str,
    ) -> Result<Identity, Error> {
        let request = RegisterRequest::new(username, email, password, confirm_password);
        self.inner
            .backend
            .register(&request)
            .await
            .map_err(|e| credential_error("Registration", e))?;

        tracing::info!(username = %username, "Registration accepted");
        self.login(username, password).await
    }

    /// Sign out. Local state is cleared before the backend is contacted and
    /// regardless of whether that call succeeds.
    pub async fn logout(&self) {
        let previous = self.clear_local(None);
        if let Some(token) = previous {
            self.invalidate_remote(&token).await;
            tracing::info!("Logged out");
        }
    }

    /// Re-fetch the profile for the current token. No-op without a token.
    pub async fn refresh_user(&self) {
        let Some(token) = self.inner.state.borrow().token.clone() else {
            return;
        };
        self.sync_profile(token).await;
    }

    async fn sync_profile(&self, token: SessionToken) {
        {
            let mut fetching = self.inner.fetching.lock();
            if fetching.as_ref() == Some(&token) {
                tracing::debug!("Profile fetch already in flight");
                return;
            }
            *fetching = Some(token.clone());
        }
        let _in_flight = InFlight {
            slot: &self.inner.fetching,
            token: &token,
        };

        {
            let _t = self.inner.transition.lock();
            self.inner.state.send_if_modified(|s| {
                if s.token.as_ref() != Some(&token) || s.loading {
                    return false;
                }
                s.loading = true;
                true
            });
        }

        let result = self.inner.profiles.fetch_profile(&token).await;
        self.apply_profile(&token, result);
    }

    fn apply_profile(&self, token: &SessionToken, result: Result<Identity, ProfileError>) {
        let _t = self.inner.transition.lock();
        if self.inner.state.borrow().token.as_ref() != Some(token) {
            tracing::debug!("Discarding profile result for a replaced token");
            return;
        }

        match result {
            Ok(user) => {
                self.inner.state.send_modify(|s| {
                    s.user = Some(user);
                    s.loading = false;
                });
                if !self.inner.monitor.is_running() {
                    self.start_monitor(token.clone());
                }
            }
            Err(ProfileError::InvalidToken) => {
                self.inner.monitor.stop();
                if let Err(e) = self.inner.credentials.clear() {
                    tracing::warn!(error = %e, "Credential clear failed");
                }
                self.inner.state.send_replace(SessionSnapshot::anonymous());
            }
            Err(ProfileError::Transient(_)) => {
                self.inner.state.send_modify(|s| s.loading = false);
            }
        }
    }

    fn establish(&self, token: SessionToken, user: Identity) -> Result<(), Error> {
        let _t = self.inner.transition.lock();
        self.inner.credentials.save(&token)?;
        self.inner.state.send_replace(SessionSnapshot {
            token: Some(token.clone()),
            user: Some(user),
            loading: false,
        });
        self.start_monitor(token);
        Ok(())
    }

    /// Drop the local session, returning the token that was active.
    ///
    /// With `expected` set, nothing happens unless that token is current.
    fn clear_local(&self, expected: Option<&SessionToken>) -> Option<SessionToken> {
        let _t = self.inner.transition.lock();
        if let Some(expected) = expected {
            if self.inner.state.borrow().token.as_ref() != Some(expected) {
                return None;
            }
        }

        self.inner.monitor.stop();
        if let Err(e) = self.inner.credentials.clear() {
            tracing::warn!(error = %e, "Credential clear failed during logout");
        }
        self.inner.state.send_replace(SessionSnapshot::anonymous()).token
    }

    async fn invalidate_remote(&self, token: &SessionToken) {
        if let Err(e) = self.inner.backend.logout(token).await {
            tracing::warn!(error = %e, "Backend logout failed, local session already cleared");
        }
    }

    fn start_monitor(&self, token: SessionToken) {
        let weak: Weak<Inner<B>> = Arc::downgrade(&self.inner);
        self.inner.monitor.start(
            move || {
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                let controller = SessionController { inner };
                let token = token.clone();
                tokio::spawn(async move { controller.expire(&token).await });
            },
            self.inner.idle_limit,
        );
    }

    async fn expire(&self, token: &SessionToken) {
        if self.clear_local(Some(token)).is_some() {
            tracing::info!("Session ended after inactivity");
            self.invalidate_remote(token).await;
        }
    }
}

fn credential_error(operation: &'static str, e: BackendError) -> Error {
    if e.is_credential_rejection() {
        tracing::warn!(status = ?e.status(), "{operation} rejected");
        return Error::Authentication {
            status: e.status().unwrap_or_default(),
            detail: e.detail(),
        };
    }
    tracing::error!(error = %e, "{operation} request failed");
    Error::Transient(e.to_string())
}
