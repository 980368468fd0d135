use std::sync::atomic::Ordering;
use tokio::{runtime::Handle, sync::mpsc, task::JoinHandle};

use super::store::MembershipCache;
use crate::{
    error::{AppError, AppResult},
    session::SessionWatcher,
};

/// Handle for tearing down the session listener
///
/// Dropping the handle stops the listener as well.
pub struct SessionListenerHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl SessionListenerHandle {
    /// Signals the listener to stop and waits for it to exit
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Session listener task failed");
        }
        tracing::info!("Session listener stopped");
    }
}

impl MembershipCache {
    /// Starts reacting to login/logout
    ///
    /// Runs the initial sync right away (reload when a session exists, clear
    /// otherwise), then reloads on every login and clears on every logout.
    /// A cache can be attached once; later calls fail with
    /// [`AppError::AlreadyAttached`].
    pub fn spawn_session_listener(&self) -> AppResult<SessionListenerHandle> {
        let runtime = Handle::try_current().map_err(|e| {
            AppError::Internal(format!("session listener requires a Tokio runtime: {}", e))
        })?;

        if self.inner.attached.swap(true, Ordering::SeqCst) {
            return Err(AppError::AlreadyAttached);
        }

        let watcher = self.inner.session.subscribe();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let cache = self.clone();
        let task = runtime.spawn(async move {
            cache.session_listener_task(watcher, shutdown_rx).await;
        });

        Ok(SessionListenerHandle { shutdown_tx, task })
    }

    async fn session_listener_task(
        self,
        mut watcher: SessionWatcher,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        tracing::info!("Session listener started");

        let authenticated = watcher.mark_seen();
        self.on_session_change(authenticated).await;

        loop {
            tokio::select! {
                changed = watcher.changed() => match changed {
                    Some(authenticated) => self.on_session_change(authenticated).await,
                    None => {
                        tracing::info!("Session state dropped, stopping session listener");
                        break;
                    }
                },
                _ = shutdown_rx.recv() => {
                    tracing::info!("Session listener shutting down");
                    break;
                }
            }
        }
    }

    async fn on_session_change(&self, authenticated: bool) {
        tracing::debug!(authenticated, "Session changed");
        if authenticated {
            self.reload().await;
        } else {
            self.clear();
        }
    }
}
