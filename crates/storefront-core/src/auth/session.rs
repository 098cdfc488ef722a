//! Session facade consumed by front-ends.
//!
//! `SessionManager` owns the observable [`SessionState`] and keeps it
//! consistent with the [`CredentialStore`](super::CredentialStore) on every
//! mutating operation. Failures never escape these operations; they land in
//! `SessionState::error` instead.

use serde::Serialize;
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::api::{ApiClient, ApiError, ApiRequest, AuthFallback};
use crate::models::{Credentials, Profile, Registration, TokenPair};

use super::credentials::{CredentialStore, SessionUpdate};

pub const LOGIN_PATH: &str = "/auth/token/";
pub const PROFILE_PATH: &str = "/auth/me/";
pub const REGISTER_PATH: &str = "/register/";

/// Projection of the stored session for display
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
pub struct SessionState {
    pub username: String,
    pub is_authenticated: bool,
    pub is_privileged: bool,
    pub loading: bool,
    pub error: String,
}

/// Coarse session state for display, derived from [`SessionState`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
pub enum SessionPhase {
    Anonymous,
    Authenticating,
    Authenticated,
}

impl SessionState {
    fn from_store(store: &CredentialStore) -> Self {
        let stored = match store.snapshot() {
            Ok(stored) => stored,
            Err(e) => {
                warn!(error = %e, "Failed to read stored session, starting anonymous");
                return Self::default();
            }
        };
        let username = stored.username.unwrap_or_default();
        Self {
            is_authenticated: !username.is_empty(),
            username,
            is_privileged: stored.is_privileged,
            loading: false,
            error: String::new(),
        }
    }

    pub fn phase(&self) -> SessionPhase {
        if self.loading {
            SessionPhase::Authenticating
        } else if self.is_authenticated {
            SessionPhase::Authenticated
        } else {
            SessionPhase::Anonymous
        }
    }
}

pub struct SessionManager {
    api: ApiClient,
    state: watch::Sender<SessionState>,
}

impl SessionManager {
    /// Create the facade, initializing its state from the credential store
    pub fn new(api: ApiClient) -> Self {
        let initial = SessionState::from_store(api.store());
        debug!(username = %initial.username, authenticated = initial.is_authenticated, "Session state initialized");
        let (state, _) = watch::channel(initial);
        Self { api, state }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Current state snapshot
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Receive every state change from now on
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Log in with username and password.
    /// Returns whether the session ended up authenticated.
    pub async fn login(&self, username: &str, password: &str) -> bool {
        self.begin();
        let ok = self.authenticate(username, password).await;
        self.finish();
        ok
    }

    /// Create an account, then log into it with the same credentials
    pub async fn register(&self, registration: &Registration) -> bool {
        self.begin();
        let ok = match self.api.post::<Value, _>(REGISTER_PATH, registration).await {
            Ok(_) => {
                info!(username = %registration.username, "Account registered");
                self.authenticate(&registration.username, &registration.password)
                    .await
            }
            Err(e) => {
                error!(error = %e, "Registration failed");
                self.set_error(&e);
                false
            }
        };
        self.finish();
        ok
    }

    /// Forget the session. No network call.
    pub fn logout(&self) {
        if let Err(e) = self.api.store().clear() {
            warn!(error = %e, "Failed to clear credential store on logout");
        }
        self.state.send_replace(SessionState::default());
        info!("Logged out");
    }

    /// Look up the current user and refresh the privilege flag.
    ///
    /// Any failure, including an expired session, leaves the user
    /// non-privileged instead of surfacing an error.
    pub async fn fetch_profile(&self) -> Option<Profile> {
        let request = ApiRequest::get(PROFILE_PATH).auth_fallback(AuthFallback::Fail);
        match self.api.send_as::<Profile>(&request).await {
            Ok(profile) => {
                let is_privileged = profile.is_staff;
                if let Err(e) = self.api.store().set(&SessionUpdate::privileged(is_privileged)) {
                    warn!(error = %e, "Failed to persist privilege flag");
                }
                self.state.send_modify(|s| s.is_privileged = is_privileged);
                Some(profile)
            }
            Err(e) => {
                debug!(error = %e, "Profile unavailable, treating user as non-privileged");
                self.state.send_modify(|s| s.is_privileged = false);
                self.resync_after_clear();
                None
            }
        }
    }

    async fn authenticate(&self, username: &str, password: &str) -> bool {
        match self.exchange_credentials(username, password).await {
            Ok(()) => {
                self.fetch_profile().await;
                true
            }
            Err(e) => {
                error!(error = %e, "Login failed");
                self.state.send_modify(|s| {
                    s.error = e.to_string();
                    s.is_authenticated = false;
                });
                false
            }
        }
    }

    async fn exchange_credentials(&self, username: &str, password: &str) -> Result<(), ApiError> {
        let tokens: TokenPair = self
            .api
            .post(LOGIN_PATH, &Credentials { username, password })
            .await?;

        self.api.store().set(&SessionUpdate {
            access: Some(tokens.access),
            refresh: Some(tokens.refresh),
            username: Some(username.to_string()),
            is_privileged: None,
        })?;

        self.state.send_modify(|s| {
            s.username = username.to_string();
            s.is_authenticated = true;
        });
        info!(username, "Logged in");
        Ok(())
    }

    /// If the pipeline wiped the store, drop the stale projection too
    fn resync_after_clear(&self) {
        match self.api.store().username() {
            Ok(None) => {
                self.state.send_if_modified(|s| {
                    if !s.is_authenticated && s.username.is_empty() {
                        return false;
                    }
                    s.username.clear();
                    s.is_authenticated = false;
                    true
                });
            }
            Ok(Some(_)) => {}
            Err(e) => warn!(error = %e, "Failed to read stored username"),
        }
    }

    fn begin(&self) {
        self.state.send_modify(|s| {
            s.loading = true;
            s.error.clear();
        });
    }

    fn finish(&self) {
        self.state.send_modify(|s| s.loading = false);
    }

    fn set_error(&self, err: &ApiError) {
        let message = err.to_string();
        self.state.send_modify(|s| s.error = message);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::auth::{MemoryStore, StoredSession};

    fn manager_with(update: SessionUpdate) -> SessionManager {
        let store = CredentialStore::new(Arc::new(MemoryStore::new()));
        store.set(&update).unwrap();
        // Unroutable base URL: these tests never touch the network
        let api = ApiClient::new("http://127.0.0.1:9", store).unwrap();
        SessionManager::new(api)
    }

    #[test]
    fn test_state_initialized_from_store() {
        let manager = manager_with(SessionUpdate {
            username: Some("alice".into()),
            is_privileged: Some(true),
            ..SessionUpdate::default()
        });
        let state = manager.state();
        assert_eq!(state.username, "alice");
        assert!(state.is_authenticated);
        assert!(state.is_privileged);
        assert_eq!(state.phase(), SessionPhase::Authenticated);
    }

    #[test]
    fn test_empty_store_is_anonymous() {
        let manager = manager_with(SessionUpdate::default());
        assert_eq!(manager.state(), SessionState::default());
        assert_eq!(manager.state().phase(), SessionPhase::Anonymous);
    }

    #[test]
    fn test_phase_serializes_snake_case() {
        let loading = SessionState {
            loading: true,
            ..SessionState::default()
        };
        assert_eq!(loading.phase(), SessionPhase::Authenticating);
        assert_eq!(
            serde_json::to_value(loading.phase()).unwrap(),
            serde_json::json!("authenticating")
        );
    }

    #[test]
    fn test_logout_is_idempotent() {
        let manager = manager_with(SessionUpdate {
            access: Some("A".into()),
            refresh: Some("R".into()),
            username: Some("alice".into()),
            is_privileged: Some(true),
        });
        let mut rx = manager.subscribe();

        manager.logout();
        let first = manager.state();
        manager.logout();

        assert_eq!(first, SessionState::default());
        assert_eq!(manager.state(), first);
        assert_eq!(manager.api().store().snapshot().unwrap(), StoredSession::default());
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), SessionState::default());
    }
}
