use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};

use crate::error::AppError;

pub mod item_id;
pub mod list_entry;

pub use item_id::{ItemId, ToItemId};
pub use list_entry::ListEntry;

/// One of the two independent per-user movie lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListKind {
    /// Movies the user marked with the heart icon
    Favorites,
    /// Movies the user saved to watch later
    Watchlist,
}

impl ListKind {
    pub const ALL: [ListKind; 2] = [ListKind::Favorites, ListKind::Watchlist];

    /// Path segment used by the remote list API
    pub fn as_str(&self) -> &'static str {
        match self {
            ListKind::Favorites => "favorites",
            ListKind::Watchlist => "watchlist",
        }
    }
}

impl Display for ListKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ListKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "favorites" | "favourites" | "favoritos" => Ok(ListKind::Favorites),
            "watchlist" | "watch-later" | "watch_later" => Ok(ListKind::Watchlist),
            other => Err(AppError::UnknownListKind(other.to_string())),
        }
    }
}

/// Direction of a membership change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Add,
    Remove,
}

impl Direction {
    /// Picks the direction that flips the given membership
    pub fn from_membership(is_member: bool) -> Self {
        if is_member {
            Direction::Remove
        } else {
            Direction::Add
        }
    }

    /// Membership once this change is applied
    pub fn target_membership(self) -> bool {
        matches!(self, Direction::Add)
    }

    /// Membership before this change was applied
    pub fn prior_membership(self) -> bool {
        !self.target_membership()
    }
}

impl Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Add => f.write_str("add"),
            Direction::Remove => f.write_str("remove"),
        }
    }
}
