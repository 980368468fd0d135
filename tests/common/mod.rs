#![allow(dead_code)]

use std::{
    collections::{BTreeSet, HashMap, HashSet},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
};

use async_trait::async_trait;
use pipoqueiro_lists::{
    AppError, AppResult, AuthToken, ItemId, ListEntry, ListKind, MembershipCache, NoticeBus,
    RemoteListService, SameItemPolicy, SessionState,
};
use reqwest::StatusCode;
use tokio::sync::Semaphore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Fetch(ListKind),
    Add(ListKind, i64),
    Remove(ListKind, i64),
}

/// Holds calls until the test lets them through
pub struct Gate {
    held: AtomicBool,
    permits: Semaphore,
}

impl Gate {
    fn new() -> Self {
        Self {
            held: AtomicBool::new(false),
            permits: Semaphore::new(0),
        }
    }

    pub fn hold(&self) {
        self.held.store(true, Ordering::SeqCst);
    }

    pub fn release(&self, calls: usize) {
        self.permits.add_permits(calls);
    }

    async fn pass(&self) {
        if self.held.load(Ordering::SeqCst) {
            if let Ok(permit) = self.permits.acquire().await {
                permit.forget();
            }
        }
    }
}

/// In-memory stand-in for the Pipoqueiro list API
pub struct FakeRemote {
    lists: Mutex<HashMap<ListKind, BTreeSet<i64>>>,
    failing_fetches: Mutex<HashSet<ListKind>>,
    failing_items: Mutex<HashSet<i64>>,
    calls: Mutex<Vec<Call>>,
    pub fetch_gate: Gate,
    pub write_gate: Gate,
}

impl FakeRemote {
    pub fn new(favorites: &[i64], watchlist: &[i64]) -> Arc<Self> {
        let remote = Self {
            lists: Mutex::new(HashMap::new()),
            failing_fetches: Mutex::new(HashSet::new()),
            failing_items: Mutex::new(HashSet::new()),
            calls: Mutex::new(Vec::new()),
            fetch_gate: Gate::new(),
            write_gate: Gate::new(),
        };
        remote.set_list(ListKind::Favorites, favorites);
        remote.set_list(ListKind::Watchlist, watchlist);
        Arc::new(remote)
    }

    /// Replaces the server-side list, as another device would
    pub fn set_list(&self, list: ListKind, ids: &[i64]) {
        self.lists
            .lock()
            .unwrap()
            .insert(list, ids.iter().copied().collect());
    }

    pub fn list(&self, list: ListKind) -> Vec<i64> {
        self.lists
            .lock()
            .unwrap()
            .get(&list)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn fail_fetch(&self, list: ListKind) {
        self.failing_fetches.lock().unwrap().insert(list);
    }

    pub fn heal_fetches(&self) {
        self.failing_fetches.lock().unwrap().clear();
    }

    pub fn fail_writes_for(&self, item: i64) {
        self.failing_items.lock().unwrap().insert(item);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn write_calls(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| !matches!(call, Call::Fetch(_)))
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn check_write(&self, item: ItemId) -> AppResult<()> {
        if self.failing_items.lock().unwrap().contains(&item.get()) {
            return Err(AppError::remote(
                StatusCode::INTERNAL_SERVER_ERROR,
                "simulated outage",
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteListService for FakeRemote {
    async fn fetch_all(&self, list: ListKind) -> AppResult<Vec<ListEntry>> {
        self.record(Call::Fetch(list));
        // Captured at request time, like a real server answering before the gate opens
        let ids = self.list(list);
        let failing = self.failing_fetches.lock().unwrap().contains(&list);

        self.fetch_gate.pass().await;

        if failing {
            return Err(AppError::remote(StatusCode::BAD_GATEWAY, "fetch failed"));
        }
        Ok(ids
            .into_iter()
            .map(|id| ListEntry::new(ItemId::new(id)))
            .collect())
    }

    async fn add(&self, list: ListKind, item: ItemId) -> AppResult<()> {
        self.record(Call::Add(list, item.get()));
        self.write_gate.pass().await;
        self.check_write(item)?;

        let mut lists = self.lists.lock().unwrap();
        if !lists.entry(list).or_default().insert(item.get()) {
            return Err(AppError::remote(StatusCode::CONFLICT, "already present"));
        }
        Ok(())
    }

    async fn remove(&self, list: ListKind, item: ItemId) -> AppResult<()> {
        self.record(Call::Remove(list, item.get()));
        self.write_gate.pass().await;
        self.check_write(item)?;

        let mut lists = self.lists.lock().unwrap();
        if !lists.entry(list).or_default().remove(&item.get()) {
            return Err(AppError::remote(StatusCode::NOT_FOUND, "not present"));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

pub fn logged_in() -> SessionState {
    SessionState::with_token(Some(AuthToken::new("test-token")))
}

pub fn create_cache(
    remote: &Arc<FakeRemote>,
    session: SessionState,
    policy: SameItemPolicy,
) -> MembershipCache {
    let remote: Arc<dyn RemoteListService> = remote.clone();
    MembershipCache::new(remote, session, NoticeBus::default(), policy)
}

/// Lets spawned toggle tasks run up to their next suspension point
pub async fn settle_tasks() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}
