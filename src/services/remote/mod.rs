/// Remote list service abstraction
///
/// The membership cache never talks HTTP itself. It goes through this trait,
/// which exposes the three operations the Pipoqueiro backend offers for each
/// list kind: fetch everything, add one movie, remove one movie.
use crate::{
    error::AppResult,
    models::{ItemId, ListEntry, ListKind},
};

pub mod pipoqueiro;

pub use pipoqueiro::PipoqueiroListService;

/// Trait for remote list backends
///
/// Implementations must reject (return `Err`) on any failure, including
/// application-level ones such as adding a movie that is already present.
/// Retrying `add` is not guaranteed to be idempotent.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RemoteListService: Send + Sync {
    /// Fetch every entry of the authenticated user's list
    async fn fetch_all(&self, list: ListKind) -> AppResult<Vec<ListEntry>>;

    /// Add a movie to the list
    async fn add(&self, list: ListKind, item: ItemId) -> AppResult<()>;

    /// Remove a movie from the list
    async fn remove(&self, list: ListKind, item: ItemId) -> AppResult<()>;

    /// Backend name for logging and debugging
    fn name(&self) -> &'static str;
}
