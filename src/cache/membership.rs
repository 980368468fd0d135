use chrono::{DateTime, Utc};
use std::collections::HashSet;

use crate::models::{ItemId, ListEntry, ListKind};

/// The set of movies that belong to one list of the current user
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipSet {
    items: HashSet<ItemId>,
}

impl MembershipSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set from remote entries, dropping ids that are not integers
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a ListEntry>) -> Self {
        entries.into_iter().filter_map(ListEntry::item).collect()
    }

    pub fn contains(&self, item: ItemId) -> bool {
        self.items.contains(&item)
    }

    /// Forces the membership of one item. Returns true if it changed.
    pub(crate) fn set(&mut self, item: ItemId, member: bool) -> bool {
        if member {
            self.items.insert(item)
        } else {
            self.items.remove(&item)
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.items.iter().copied()
    }

    pub fn to_sorted_vec(&self) -> Vec<ItemId> {
        let mut items: Vec<ItemId> = self.iter().collect();
        items.sort_unstable();
        items
    }
}

impl FromIterator<ItemId> for MembershipSet {
    fn from_iter<I: IntoIterator<Item = ItemId>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

/// Point-in-time copy of both lists, published to subscribers after every change
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MembershipSnapshot {
    pub favorites: MembershipSet,
    pub watchlist: MembershipSet,
    /// Increases by one with every published change
    pub version: u64,
    /// When the last successful reload was applied
    pub loaded_at: Option<DateTime<Utc>>,
}

impl MembershipSnapshot {
    pub fn list(&self, list: ListKind) -> &MembershipSet {
        match list {
            ListKind::Favorites => &self.favorites,
            ListKind::Watchlist => &self.watchlist,
        }
    }

    pub fn contains(&self, list: ListKind, item: ItemId) -> bool {
        self.list(list).contains(item)
    }
}
