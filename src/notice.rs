//! User-facing notifications raised by the membership cache.
//!
//! The UI layer subscribes to a `tokio::sync::broadcast` channel and renders
//! each [`Notice`] as a transient toast.

use std::fmt::Display;
use tokio::sync::broadcast;

use crate::models::{Direction, ItemId, ListKind};

const DEFAULT_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// A toggle was attempted without a session
    LoginRequired { list: ListKind },
    /// A remote add/remove failed and the change was rolled back
    ToggleFailed {
        list: ListKind,
        item: ItemId,
        direction: Direction,
        reason: String,
    },
}

impl Notice {
    pub fn message(&self) -> String {
        match self {
            Notice::LoginRequired { list } => {
                format!("Log in to keep movies in your {}", list_label(*list))
            }
            Notice::ToggleFailed {
                list,
                item,
                direction: Direction::Add,
                ..
            } => format!("Could not add movie {} to your {}", item, list_label(*list)),
            Notice::ToggleFailed {
                list,
                item,
                direction: Direction::Remove,
                ..
            } => format!(
                "Could not remove movie {} from your {}",
                item,
                list_label(*list)
            ),
        }
    }
}

impl Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message())
    }
}

fn list_label(list: ListKind) -> &'static str {
    match list {
        ListKind::Favorites => "favorites",
        ListKind::Watchlist => "watch-later list",
    }
}

/// Thin wrapper around a `broadcast::Sender<Notice>`
#[derive(Clone, Debug)]
pub struct NoticeBus {
    tx: broadcast::Sender<Notice>,
}

impl Default for NoticeBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl NoticeBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publishes a notice. Returns the number of receivers that got it.
    pub fn publish(&self, notice: Notice) -> usize {
        // Err only means nobody is listening
        self.tx.send(notice).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.tx.subscribe()
    }
}
