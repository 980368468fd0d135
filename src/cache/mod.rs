//! List membership cache.
//!
//! Keeps the current user's favorites and watchlist in memory so UI code can
//! ask "is movie X in list K?" synchronously, and flips membership
//! optimistically: the local set changes at once, the remote call follows,
//! and a failed call puts the item back the way it was.

mod listener;
mod membership;
mod pending;
mod store;

pub use listener::SessionListenerHandle;
pub use membership::{MembershipSet, MembershipSnapshot};
pub use pending::{PendingMutation, Resolution};
pub use store::{MembershipCache, PendingToggle, SameItemPolicy};
