//! Session management backed by the durable key-value store
//!
//! The manager owns the bearer token, the identity decoded from it and the
//! single-shot timer that logs the user out when the token expires. Every
//! failure inside the manager resolves to the guest state.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::error::DatabaseError;
use common::kv::KeyValueStore;
use thiserror::Error;
use tokio::sync::{Mutex, MutexGuard, broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::claims::{Claims, TokenError};
use crate::models::{Session, SessionNotice, SessionStatus, SessionUser};

/// Key under which the token is persisted
pub const TOKEN_KEY: &str = "token";

/// Errors returned by [`SessionManager::login`]
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Invalid session token: {0}")]
    InvalidToken(#[from] TokenError),

    #[error("Session storage error: {0}")]
    Storage(#[from] DatabaseError),

    #[error("Session has not been restored yet")]
    NotRestored,
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Handle to the armed expiry callback; dropping it cancels the callback
#[derive(Debug)]
struct ExpiryTimer {
    generation: u64,
    handle: Option<JoinHandle<()>>,
}

impl ExpiryTimer {
    /// Release the handle without aborting, for use by the firing task itself
    fn disarm(mut self) {
        self.handle.take();
    }
}

impl Drop for ExpiryTimer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

#[derive(Debug)]
struct SessionState {
    status: SessionStatus,
    token: Option<String>,
    user: Option<SessionUser>,
    expires_at: Option<DateTime<Utc>>,
    timer: Option<ExpiryTimer>,
    generation: u64,
}

impl SessionState {
    fn clear(&mut self) {
        self.token = None;
        self.user = None;
        self.expires_at = None;
        self.timer = None;
        self.status = SessionStatus::Guest;
    }

    fn snapshot(&self) -> Session {
        Session {
            status: self.status,
            token: self.token.clone(),
            user: self.user.clone(),
            expires_at: self.expires_at,
        }
    }
}

struct Shared {
    store: Arc<dyn KeyValueStore>,
    state: Mutex<SessionState>,
    loading: watch::Sender<bool>,
    notices: broadcast::Sender<SessionNotice>,
}

/// Session manager for the current device
///
/// Cloning is cheap; all clones share the same session.
#[derive(Clone)]
pub struct SessionManager {
    shared: Arc<Shared>,
}

impl SessionManager {
    /// Create a new session manager in the `Uninitialized` state
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        let (loading, _) = watch::channel(true);
        let (notices, _) = broadcast::channel(16);

        Self {
            shared: Arc::new(Shared {
                store,
                state: Mutex::new(SessionState {
                    status: SessionStatus::Uninitialized,
                    token: None,
                    user: None,
                    expires_at: None,
                    timer: None,
                    generation: 0,
                }),
                loading,
                notices,
            }),
        }
    }

    /// Load the persisted token and resolve to `Guest` or `Authenticated`
    ///
    /// Only the first call does any work; `loading` turns false when it ends.
    pub async fn restore(&self) -> Session {
        let mut state = self.shared.state.lock().await;

        if state.status != SessionStatus::Uninitialized {
            warn!("Session restore requested more than once; ignoring");
            return state.snapshot();
        }
        state.status = SessionStatus::Restoring;

        let stored = match self.shared.store.get(TOKEN_KEY).await {
            Ok(stored) => stored,
            Err(e) => {
                error!("Failed to read stored session token: {}", e);
                None
            }
        };

        match stored {
            None => {
                info!("No stored session, continuing as guest");
                state.status = SessionStatus::Guest;
            }
            Some(token) => match Claims::decode(&token) {
                Ok(claims) if !claims.is_expired_at(Utc::now()) => {
                    info!(user_id = %claims.id, "Restored session");
                    self.establish(&mut state, token, &claims).await;
                }
                Ok(claims) => {
                    info!(user_id = %claims.id, "Stored session token expired");
                    self.clear_session(&mut state).await;
                }
                Err(e) => {
                    warn!("Stored session token is invalid: {}", e);
                    self.clear_session(&mut state).await;
                }
            },
        }

        self.shared.loading.send_replace(false);
        state.snapshot()
    }

    /// Start a session from a freshly issued token
    ///
    /// Returns the decoded user, or `None` when the token was already expired
    /// and the session fell straight back to guest. A malformed token also
    /// leaves the session as guest, and is reported as an error.
    pub async fn login(&self, token: &str) -> SessionResult<Option<SessionUser>> {
        let mut state = self.shared.state.lock().await;

        if matches!(
            state.status,
            SessionStatus::Uninitialized | SessionStatus::Restoring
        ) {
            return Err(SessionError::NotRestored);
        }

        let claims = match Claims::decode(token) {
            Ok(claims) => claims,
            Err(e) => {
                error!("Failed to decode token: {}", e);
                self.clear_session(&mut state).await;
                return Err(e.into());
            }
        };

        self.shared.store.set(TOKEN_KEY, token).await?;
        self.establish(&mut state, token.to_string(), &claims).await;

        if state.user.is_some() {
            info!(user_id = %claims.id, "Session established");
        }
        Ok(state.user.clone())
    }

    /// End the current session; a no-op when there is none
    pub async fn logout(&self) {
        let mut state = self.shared.state.lock().await;

        if state.token.is_none() && state.timer.is_none() {
            debug!("Logout requested without an active session");
            return;
        }

        self.clear_session(&mut state).await;
        info!("Logged out");
    }

    pub async fn snapshot(&self) -> Session {
        self.current().await.snapshot()
    }

    pub async fn status(&self) -> SessionStatus {
        self.current().await.status
    }

    pub async fn user(&self) -> Option<SessionUser> {
        self.current().await.user.clone()
    }

    pub async fn token(&self) -> Option<String> {
        self.current().await.token.clone()
    }

    /// Whether an expiry callback is currently armed
    pub async fn expiry_armed(&self) -> bool {
        self.current().await.timer.is_some()
    }

    /// True until the first [`restore`](Self::restore) has completed
    pub fn is_loading(&self) -> bool {
        *self.shared.loading.borrow()
    }

    /// Wait for the first [`restore`](Self::restore) to complete
    pub async fn wait_until_ready(&self) {
        let mut loading = self.shared.loading.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = loading.wait_for(|loading| !*loading).await;
    }

    /// Receive session notices such as expiry
    pub fn subscribe(&self) -> broadcast::Receiver<SessionNotice> {
        self.shared.notices.subscribe()
    }

    /// Lock the state, first expiring a session whose token is past due
    ///
    /// The expiry timer sleeps on a monotonic clock, which stops while the
    /// device is suspended; the wall clock decides here.
    async fn current(&self) -> MutexGuard<'_, SessionState> {
        let mut state = self.shared.state.lock().await;

        let overdue = state.status == SessionStatus::Authenticated
            && state
                .expires_at
                .is_some_and(|expires_at| expires_at <= Utc::now());

        if overdue {
            info!("Session expired before its timer fired");
            self.clear_session(&mut state).await;
            // Nobody listening is fine.
            let _ = self.shared.notices.send(SessionNotice::Expired);
        }

        state
    }

    /// Populate the state from decoded claims and arm the expiry timer
    async fn establish(&self, state: &mut SessionState, token: String, claims: &Claims) {
        let expires_at = match claims.expires_at() {
            Ok(expires_at) => expires_at,
            Err(e) => {
                warn!("Discarding token with unusable expiry: {}", e);
                self.clear_session(state).await;
                return;
            }
        };

        state.token = Some(token);
        state.user = Some(claims.user());
        state.expires_at = Some(expires_at);
        state.status = SessionStatus::Authenticated;

        self.arm_expiry(state, expires_at).await;
    }

    /// Replace any armed timer with one firing at `expires_at`
    async fn arm_expiry(&self, state: &mut SessionState, expires_at: DateTime<Utc>) {
        state.timer = None;

        let delay = (expires_at - Utc::now())
            .to_std()
            .ok()
            .filter(|delay| !delay.is_zero());

        let Some(delay) = delay else {
            info!("Session token already expired, logging out");
            self.clear_session(state).await;
            return;
        };

        state.generation += 1;
        let generation = state.generation;
        let shared = Arc::downgrade(&self.shared);

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(shared) = shared.upgrade() {
                SessionManager { shared }.expire(generation).await;
            }
        });

        debug!(delay_secs = delay.as_secs(), "Armed session expiry timer");
        state.timer = Some(ExpiryTimer {
            generation,
            handle: Some(handle),
        });
    }

    /// Timer callback: log out if `generation` is still the armed timer
    async fn expire(&self, generation: u64) {
        let mut state = self.shared.state.lock().await;

        match state.timer.take() {
            Some(timer) if timer.generation == generation => timer.disarm(),
            other => {
                state.timer = other;
                debug!(generation, "Ignoring stale expiry timer");
                return;
            }
        }

        info!("Session expired");
        self.clear_session(&mut state).await;
        drop(state);

        // Nobody listening is fine.
        let _ = self.shared.notices.send(SessionNotice::Expired);
    }

    /// Remove the persisted token and reset to guest
    async fn clear_session(&self, state: &mut SessionState) {
        if let Err(e) = self.shared.store.remove(TOKEN_KEY).await {
            warn!("Failed to remove stored session token: {}", e);
        }
        state.clear();
    }
}
