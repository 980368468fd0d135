//! Session state shared between the login flow and the membership cache.
//!
//! The current bearer token lives in a `tokio::sync::watch` channel: its
//! presence is the session flag, and every login/logout is a transition that
//! subscribers observe through [`SessionWatcher`].

use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::watch;

/// Opaque bearer token issued by the Pipoqueiro auth endpoints
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Raw token value for the `Authorization` header
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AuthToken(***)")
    }
}

/// Cloneable handle to the current session
#[derive(Clone, Debug)]
pub struct SessionState {
    tx: Arc<watch::Sender<Option<AuthToken>>>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    /// Creates a logged-out session
    pub fn new() -> Self {
        Self::with_token(None)
    }

    pub fn with_token(token: Option<AuthToken>) -> Self {
        let (tx, _) = watch::channel(token);
        Self { tx: Arc::new(tx) }
    }

    pub fn is_authenticated(&self) -> bool {
        self.tx.borrow().is_some()
    }

    pub fn token(&self) -> Option<AuthToken> {
        self.tx.borrow().clone()
    }

    /// Stores a token. Returns false if the same token was already active.
    pub fn login(&self, token: AuthToken) -> bool {
        let changed = self.tx.send_if_modified(|current| {
            if current.as_ref() == Some(&token) {
                return false;
            }
            *current = Some(token);
            true
        });
        if changed {
            tracing::info!("Session logged in");
        }
        changed
    }

    /// Drops the token. Returns false if there was no session.
    pub fn logout(&self) -> bool {
        let changed = self.tx.send_if_modified(|current| current.take().is_some());
        if changed {
            tracing::info!("Session logged out");
        }
        changed
    }

    pub fn subscribe(&self) -> SessionWatcher {
        SessionWatcher {
            rx: self.tx.subscribe(),
        }
    }
}

/// Receiving side of the session channel
///
/// Rapid transitions are coalesced: a watcher only ever sees the latest state.
#[derive(Debug)]
pub struct SessionWatcher {
    rx: watch::Receiver<Option<AuthToken>>,
}

impl SessionWatcher {
    /// Reads the current flag and marks it as seen
    pub fn mark_seen(&mut self) -> bool {
        self.rx.borrow_and_update().is_some()
    }

    /// Waits for the next transition and returns the new flag
    ///
    /// Returns `None` once every [`SessionState`] handle has been dropped.
    pub async fn changed(&mut self) -> Option<bool> {
        self.rx.changed().await.ok()?;
        Some(self.mark_seen())
    }
}
