/// Session manager
///
/// Owns the bearer token, the resolved identity and the derived admin
/// capability. It is the only writer of the token store. State changes are
/// published on a `watch` channel so guards can re-evaluate reactively.
use std::sync::Arc;

use tokio::sync::watch;

use crate::{
    db::TokenStore,
    error::ApiResult,
    models::Identity,
    services::catalog::CatalogApi,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// Startup revalidation has not finished yet
    Initializing,
    /// Terminal; logout never returns the session to `Initializing`
    Ready,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub token: Option<String>,
    pub identity: Option<Identity>,
    pub is_admin: bool,
    pub readiness: Readiness,
}

impl SessionSnapshot {
    fn initializing() -> Self {
        Self {
            token: None,
            identity: None,
            is_admin: false,
            readiness: Readiness::Initializing,
        }
    }

    fn logged_out() -> Self {
        Self {
            token: None,
            identity: None,
            is_admin: false,
            readiness: Readiness::Ready,
        }
    }

    /// Both the login path and the revalidation path build their state here
    fn logged_in(token: String, identity: Identity) -> Self {
        Self {
            is_admin: identity.is_admin(),
            token: Some(token),
            identity: Some(identity),
            readiness: Readiness::Ready,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some() && self.identity.is_some()
    }

    pub fn is_ready(&self) -> bool {
        self.readiness == Readiness::Ready
    }
}

pub struct SessionManager {
    api: CatalogApi,
    store: Arc<dyn TokenStore>,
    state: watch::Sender<SessionSnapshot>,
}

impl SessionManager {
    pub fn new(api: CatalogApi, store: Arc<dyn TokenStore>) -> Self {
        let (state, _rx) = watch::channel(SessionSnapshot::initializing());
        Self { api, store, state }
    }

    /// Revalidates any persisted token and marks the session ready
    ///
    /// A rejected or unverifiable token is purged silently. Calling this
    /// again after the session is ready is a no-op.
    pub async fn start(&self) -> SessionSnapshot {
        if self.state.borrow().is_ready() {
            return self.snapshot();
        }

        let stored = match self.store.load() {
            Ok(token) => token,
            Err(e) => {
                tracing::error!(error = %e, "Failed to read persisted token, starting logged out");
                self.purge_token();
                None
            }
        };

        // The token that failed revalidation, purged only if nothing replaced it
        let (next, rejected) = match stored {
            None => {
                tracing::info!("No persisted token, session ready (logged out)");
                (SessionSnapshot::logged_out(), None)
            }
            Some(token) => match self.api.current_user(&token).await {
                Ok(identity) => {
                    tracing::info!(user_id = identity.id, "Persisted token revalidated");
                    (SessionSnapshot::logged_in(token, identity), None)
                }
                Err(e) if e.is_auth_rejection() => {
                    tracing::warn!(error = %e, "Persisted token is invalid or expired, logging out");
                    (SessionSnapshot::logged_out(), Some(token))
                }
                Err(e) => {
                    tracing::error!(error = %e, "Could not revalidate persisted token, logging out");
                    (SessionSnapshot::logged_out(), Some(token))
                }
            },
        };

        self.state.send_modify(|state| {
            // An explicit login that raced the revalidation wins, on disk too
            if state.is_authenticated() {
                state.readiness = Readiness::Ready;
                return;
            }
            if let Some(rejected) = rejected.as_deref() {
                self.purge_if_unchanged(rejected);
            }
            *state = next;
        });

        self.snapshot()
    }

    /// Persists `token` and installs `identity`
    ///
    /// Navigation and notifications are the caller's business.
    pub fn login(&self, token: String, identity: Identity) -> ApiResult<()> {
        self.store.save(&token)?;
        tracing::info!(user_id = identity.id, is_admin = identity.is_admin(), "Logged in");
        self.state
            .send_replace(SessionSnapshot::logged_in(token, identity));
        Ok(())
    }

    /// Purges the token and identity; a no-op when already logged out
    pub fn logout(&self) {
        let logged_out = {
            let state = self.state.borrow();
            state.token.is_none() && state.identity.is_none()
        };
        if logged_out {
            return;
        }

        self.purge_token();
        self.state.send_modify(|state| {
            state.token = None;
            state.identity = None;
            state.is_admin = false;
        });
        tracing::info!("Logged out");
    }

    /// The current bearer token, for read-only use by other components
    pub fn token(&self) -> Option<String> {
        self.state.borrow().token.clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.subscribe()
    }

    /// Clears the store only while it still holds `rejected`
    fn purge_if_unchanged(&self, rejected: &str) {
        match self.store.load() {
            Ok(Some(current)) if current != rejected => {
                tracing::info!("Persisted token replaced during revalidation, keeping it");
            }
            Ok(_) => self.purge_token(),
            Err(e) => {
                tracing::error!(error = %e, "Failed to re-read persisted token");
                self.purge_token();
            }
        }
    }

    fn purge_token(&self) {
        if let Err(e) = self.store.clear() {
            tracing::error!(error = %e, "Failed to remove persisted token");
        }
    }
}
