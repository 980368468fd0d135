use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::{
    fmt::Debug,
    future::Future,
    pin::Pin,
    str::FromStr,
    sync::{atomic::AtomicBool, Arc, Mutex, MutexGuard, PoisonError},
    task::{Context, Poll},
};
use tokio::{
    runtime::Handle,
    sync::{broadcast, watch},
    task::JoinHandle,
};

use super::{
    membership::{MembershipSet, MembershipSnapshot},
    pending::{PendingMutation, PendingMutations, Resolution},
};
use crate::{
    error::{AppError, AppResult},
    models::{Direction, ListKind, ToItemId},
    notice::{Notice, NoticeBus},
    services::RemoteListService,
    session::SessionState,
};

/// How a toggle is treated while an earlier toggle on the same item is in flight
///
/// `Allow` processes every toggle independently: each one flips whatever the
/// local state is at call time and rolls back to exactly that on failure.
/// Local and remote state can then disagree. If the remote settles two
/// same-item calls out of order, the final remote state may not match the
/// user's last gesture. Even in order, when both calls fail the rollbacks
/// replay in sequence and the item ends at the second toggle's prior
/// membership, which is the opposite of what the remote holds.
/// `Reject` refuses the second toggle synchronously instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum SameItemPolicy {
    #[default]
    Allow,
    Reject,
}

impl FromStr for SameItemPolicy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "allow" => Ok(SameItemPolicy::Allow),
            "reject" => Ok(SameItemPolicy::Reject),
            other => Err(AppError::Internal(format!(
                "unknown same-item policy: {}",
                other
            ))),
        }
    }
}

impl TryFrom<String> for SameItemPolicy {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Default)]
struct CacheState {
    favorites: MembershipSet,
    watchlist: MembershipSet,
    pending: PendingMutations,
    /// Moves on whenever both sets are replaced wholesale (reload applied, clear)
    epoch: u64,
    /// Moves on whenever a reload starts or the sets are cleared
    reload_seq: u64,
    version: u64,
    loaded_at: Option<DateTime<Utc>>,
}

impl CacheState {
    fn list(&self, list: ListKind) -> &MembershipSet {
        match list {
            ListKind::Favorites => &self.favorites,
            ListKind::Watchlist => &self.watchlist,
        }
    }

    fn list_mut(&mut self, list: ListKind) -> &mut MembershipSet {
        match list {
            ListKind::Favorites => &mut self.favorites,
            ListKind::Watchlist => &mut self.watchlist,
        }
    }

    fn replace(
        &mut self,
        favorites: MembershipSet,
        watchlist: MembershipSet,
        loaded_at: Option<DateTime<Utc>>,
    ) {
        self.favorites = favorites;
        self.watchlist = watchlist;
        self.loaded_at = loaded_at;
        self.epoch += 1;
    }

    /// Stamps a new version and returns the snapshot to publish
    fn commit(&mut self) -> MembershipSnapshot {
        self.version += 1;
        MembershipSnapshot {
            favorites: self.favorites.clone(),
            watchlist: self.watchlist.clone(),
            version: self.version,
            loaded_at: self.loaded_at,
        }
    }
}

pub(super) struct Inner {
    remote: Arc<dyn RemoteListService>,
    pub(super) session: SessionState,
    notices: NoticeBus,
    policy: SameItemPolicy,
    state: Mutex<CacheState>,
    snapshots: watch::Sender<MembershipSnapshot>,
    pub(super) attached: AtomicBool,
}

/// Favorites and watchlist membership of the current user
///
/// One instance is created at startup and handed to every consumer; clones
/// share the same state. Membership queries are synchronous. Writes only
/// happen through [`toggle`](Self::toggle), [`reload`](Self::reload) and
/// [`clear`](Self::clear).
#[derive(Clone)]
pub struct MembershipCache {
    pub(super) inner: Arc<Inner>,
}

impl MembershipCache {
    pub fn new(
        remote: Arc<dyn RemoteListService>,
        session: SessionState,
        notices: NoticeBus,
        policy: SameItemPolicy,
    ) -> Self {
        let (snapshots, _) = watch::channel(MembershipSnapshot::default());

        Self {
            inner: Arc::new(Inner {
                remote,
                session,
                notices,
                policy,
                state: Mutex::new(CacheState::default()),
                snapshots,
                attached: AtomicBool::new(false),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Publishes a snapshot unless a newer one already went out
    fn publish(&self, snapshot: MembershipSnapshot) {
        self.inner.snapshots.send_if_modified(|current| {
            if snapshot.version <= current.version {
                return false;
            }
            *current = snapshot;
            true
        });
    }

    pub fn session(&self) -> &SessionState {
        &self.inner.session
    }

    pub fn policy(&self) -> SameItemPolicy {
        self.inner.policy
    }

    /// Whether the item is currently in the list. Malformed ids are never members.
    pub fn is_member(&self, list: ListKind, item: impl ToItemId) -> bool {
        match item.to_item_id() {
            Some(item) => self.lock().list(list).contains(item),
            None => false,
        }
    }

    /// Whether a toggle of the item is waiting for the remote
    pub fn is_pending(&self, list: ListKind, item: impl ToItemId) -> bool {
        match item.to_item_id() {
            Some(item) => self.lock().pending.is_pending(list, item),
            None => false,
        }
    }

    pub fn pending_count(&self) -> usize {
        self.lock().pending.len()
    }

    /// In-flight mutations, oldest first
    pub fn pending_mutations(&self) -> Vec<PendingMutation> {
        let mut pending: Vec<PendingMutation> = self.lock().pending.iter().cloned().collect();
        pending.sort_by_key(|m| m.started_at);
        pending
    }

    pub fn snapshot(&self) -> MembershipSnapshot {
        self.inner.snapshots.borrow().clone()
    }

    /// Receives a new snapshot after every change to either list
    pub fn subscribe(&self) -> watch::Receiver<MembershipSnapshot> {
        self.inner.snapshots.subscribe()
    }

    pub fn notices(&self) -> broadcast::Receiver<Notice> {
        self.inner.notices.subscribe()
    }

    /// Empties both lists and invalidates any reload still in flight
    pub fn clear(&self) {
        let snapshot = {
            let mut state = self.lock();
            state.reload_seq += 1;
            state.replace(MembershipSet::new(), MembershipSet::new(), None);
            state.commit()
        };
        self.publish(snapshot);
        tracing::info!("List membership cleared");
    }

    /// Replaces both lists with what the remote currently holds
    ///
    /// Without a session this only clears. Both lists are fetched concurrently;
    /// if either fetch fails both lists end up empty. When several reloads
    /// overlap, only the one started last is applied. Never returns an error:
    /// failures are logged.
    pub async fn reload(&self) {
        if !self.inner.session.is_authenticated() {
            self.clear();
            return;
        }

        let seq = {
            let mut state = self.lock();
            state.reload_seq += 1;
            state.reload_seq
        };

        tracing::debug!(seq, "Reloading list membership");

        let remote = &self.inner.remote;
        let (favorites, watchlist) = tokio::join!(
            remote.fetch_all(ListKind::Favorites),
            remote.fetch_all(ListKind::Watchlist)
        );

        let snapshot = {
            let mut state = self.lock();
            if state.reload_seq != seq {
                tracing::debug!(
                    seq,
                    latest = state.reload_seq,
                    "Discarding superseded reload"
                );
                return;
            }

            match (favorites, watchlist) {
                (Ok(favorites), Ok(watchlist)) if self.inner.session.is_authenticated() => {
                    let favorites = MembershipSet::from_entries(&favorites);
                    let watchlist = MembershipSet::from_entries(&watchlist);
                    tracing::info!(
                        favorites = favorites.len(),
                        watchlist = watchlist.len(),
                        "List membership reloaded"
                    );
                    state.replace(favorites, watchlist, Some(Utc::now()));
                }
                (Ok(_), Ok(_)) => {
                    tracing::info!("Session ended during reload, clearing lists");
                    state.replace(MembershipSet::new(), MembershipSet::new(), None);
                }
                (Err(e), _) | (_, Err(e)) => {
                    tracing::error!(
                        error = %e,
                        "Failed to reload list membership, clearing both lists"
                    );
                    state.replace(MembershipSet::new(), MembershipSet::new(), None);
                }
            }

            state.commit()
        };

        self.publish(snapshot);
    }

    /// Flips the membership of one item, optimistically
    ///
    /// The local flip is applied and published before this returns; the
    /// remote add/remove runs on a spawned task, so it settles even if the
    /// returned [`PendingToggle`] is dropped. Resolves to the applied
    /// direction once the remote confirms, or to the error after the flip has
    /// been rolled back.
    ///
    /// Fails immediately, without touching state or the network, when the
    /// item id is not an integer, when there is no session (a login notice
    /// is published), or when the same item is in flight under
    /// [`SameItemPolicy::Reject`].
    pub fn toggle<T>(&self, list: ListKind, item: T) -> PendingToggle
    where
        T: ToItemId + Debug,
    {
        let Some(item_id) = item.to_item_id() else {
            tracing::warn!(list = %list, item = ?item, "Rejected toggle for malformed item id");
            return PendingToggle::ready(Err(AppError::InvalidItemId(format!("{:?}", item))));
        };

        if !self.inner.session.is_authenticated() {
            tracing::debug!(list = %list, item_id = %item_id, "Toggle attempted without a session");
            self.inner.notices.publish(Notice::LoginRequired { list });
            return PendingToggle::ready(Err(AppError::Unauthenticated));
        }

        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                return PendingToggle::ready(Err(AppError::Internal(format!(
                    "toggle requires a Tokio runtime: {}",
                    e
                ))))
            }
        };

        let (mutation, snapshot) = {
            let mut guard = self.lock();
            let state = &mut *guard;

            if self.inner.policy == SameItemPolicy::Reject
                && state.pending.is_pending(list, item_id)
            {
                tracing::debug!(
                    list = %list,
                    item_id = %item_id,
                    "Rejected toggle while another is in flight"
                );
                return PendingToggle::ready(Err(AppError::ToggleInFlight {
                    list,
                    item: item_id,
                }));
            }

            let direction = Direction::from_membership(state.list(list).contains(item_id));
            state
                .list_mut(list)
                .set(item_id, direction.target_membership());
            let mutation = state.pending.begin(list, item_id, direction, state.epoch);

            (mutation, state.commit())
        };

        self.publish(snapshot);

        tracing::debug!(
            mutation_id = %mutation.id,
            list = %list,
            item_id = %item_id,
            direction = %mutation.direction,
            "Optimistic toggle applied"
        );

        let cache = self.clone();
        let task = runtime.spawn(async move { cache.settle(mutation).await });

        PendingToggle::in_flight(task)
    }

    /// Second phase of a toggle: wait for the remote, then confirm or roll back
    async fn settle(&self, mutation: PendingMutation) -> AppResult<Direction> {
        let remote = &self.inner.remote;
        let result = match mutation.direction {
            Direction::Add => remote.add(mutation.list, mutation.item).await,
            Direction::Remove => remote.remove(mutation.list, mutation.item).await,
        };

        let (resolution, snapshot) = {
            let mut guard = self.lock();
            let state = &mut *guard;
            state.pending.finish(mutation.id);

            let resolution = mutation.resolve(result.is_ok(), state.epoch);
            let snapshot = match resolution {
                Resolution::RolledBack => {
                    state
                        .list_mut(mutation.list)
                        .set(mutation.item, mutation.prior_membership());
                    Some(state.commit())
                }
                Resolution::Confirmed | Resolution::Superseded => None,
            };

            (resolution, snapshot)
        };

        if let Some(snapshot) = snapshot {
            self.publish(snapshot);
        }

        match result {
            Ok(()) => {
                tracing::info!(
                    mutation_id = %mutation.id,
                    list = %mutation.list,
                    item_id = %mutation.item,
                    direction = %mutation.direction,
                    "Toggle confirmed"
                );
                Ok(mutation.direction)
            }
            Err(e) => {
                tracing::warn!(
                    mutation_id = %mutation.id,
                    list = %mutation.list,
                    item_id = %mutation.item,
                    direction = %mutation.direction,
                    resolution = ?resolution,
                    error = %e,
                    "Toggle failed"
                );

                let notice = if e.is_unauthenticated() {
                    Notice::LoginRequired {
                        list: mutation.list,
                    }
                } else {
                    Notice::ToggleFailed {
                        list: mutation.list,
                        item: mutation.item,
                        direction: mutation.direction,
                        reason: e.to_string(),
                    }
                };
                self.inner.notices.publish(notice);

                Err(e)
            }
        }
    }
}

/// Outcome of a [`MembershipCache::toggle`] call
///
/// `Ok` carries the confirmed direction; `Err` means the toggle failed and
/// any optimistic flip has already been undone.
pub struct PendingToggle {
    state: ToggleState,
}

enum ToggleState {
    Ready(Option<AppResult<Direction>>),
    InFlight(JoinHandle<AppResult<Direction>>),
}

impl PendingToggle {
    fn ready(result: AppResult<Direction>) -> Self {
        Self {
            state: ToggleState::Ready(Some(result)),
        }
    }

    fn in_flight(task: JoinHandle<AppResult<Direction>>) -> Self {
        Self {
            state: ToggleState::InFlight(task),
        }
    }

    /// Whether a remote call was issued for this toggle
    pub fn is_in_flight(&self) -> bool {
        matches!(self.state, ToggleState::InFlight(_))
    }

    /// Resolves to true on confirmed success, false on any failure
    pub async fn succeeded(self) -> bool {
        self.await.is_ok()
    }
}

impl Future for PendingToggle {
    type Output = AppResult<Direction>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.get_mut().state {
            ToggleState::Ready(result) => Poll::Ready(result.take().unwrap_or_else(|| {
                Err(AppError::Internal(
                    "toggle polled after completion".to_string(),
                ))
            })),
            ToggleState::InFlight(task) => Pin::new(task).poll(cx).map(|joined| {
                joined.unwrap_or_else(|e| {
                    Err(AppError::Internal(format!("toggle task failed: {}", e)))
                })
            }),
        }
    }
}
