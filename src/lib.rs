//! Favorites and watchlist synchronisation for Pipoqueiro clients.
//!
//! The [`MembershipCache`] keeps both per-user lists in memory, answers
//! membership queries synchronously and flips membership optimistically in
//! front of the Pipoqueiro REST API, rolling back when the remote rejects a
//! change.

pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod notice;
pub mod services;
pub mod session;

pub use cache::{MembershipCache, MembershipSnapshot, PendingToggle, SameItemPolicy, SessionListenerHandle};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{Direction, ItemId, ListEntry, ListKind, ToItemId};
pub use notice::{Notice, NoticeBus};
pub use services::{PipoqueiroListService, RemoteListService};
pub use session::{AuthToken, SessionState};
