use std::sync::Arc;

use pipoqueiro_lists::{
    Config, MembershipCache, NoticeBus, PipoqueiroListService, RemoteListService, SessionState,
};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("pipoqueiro_lists=info")),
        )
        .init();

    let config = Config::from_env()?;

    let session = SessionState::with_token(config.initial_token());
    let notices = NoticeBus::new(config.notice_capacity);
    let remote = PipoqueiroListService::from_config(&config, session.clone())?;

    tracing::info!(
        api_url = %config.api_url,
        provider = remote.name(),
        authenticated = session.is_authenticated(),
        policy = ?config.same_item_policy,
        "Starting list membership sync"
    );

    let cache = MembershipCache::new(
        Arc::new(remote),
        session,
        notices.clone(),
        config.same_item_policy,
    );

    let mut snapshots = cache.subscribe();
    let mut notice_rx = notices.subscribe();
    let listener = cache.spawn_session_listener()?;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                tracing::info!(
                    version = snapshot.version,
                    favorites = ?snapshot.favorites.to_sorted_vec(),
                    watchlist = ?snapshot.watchlist.to_sorted_vec(),
                    "Membership updated"
                );
            }
            notice = notice_rx.recv() => match notice {
                Ok(notice) => tracing::warn!(notice = %notice, "User notice"),
                Err(RecvError::Lagged(skipped)) => tracing::warn!(skipped, "Dropped notices"),
                Err(RecvError::Closed) => break,
            },
            _ = &mut shutdown => {
                tracing::info!("Shutdown signal received");
                break;
            }
        }
    }

    listener.shutdown().await;
    Ok(())
}
