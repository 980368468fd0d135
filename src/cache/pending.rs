use chrono::{DateTime, Utc};
use std::collections::HashMap;
use uuid::Uuid;

use crate::models::{Direction, ItemId, ListKind};

/// One optimistic toggle waiting for the remote to confirm it
///
/// Created when the local flip is applied, dropped once the remote call
/// settles. `epoch` is the cache epoch at creation; a reload or clear in the
/// meantime moves the epoch on and makes the mutation stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMutation {
    pub id: Uuid,
    pub list: ListKind,
    pub item: ItemId,
    pub direction: Direction,
    pub epoch: u64,
    pub started_at: DateTime<Utc>,
}

/// What settling a pending mutation does to the local sets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Remote accepted the change; the optimistic flip stands
    Confirmed,
    /// Remote rejected the change; the item goes back to its prior membership
    RolledBack,
    /// Remote rejected the change, but a reload or clear already replaced the
    /// sets, so the authoritative state is left alone
    Superseded,
}

impl PendingMutation {
    /// Membership of the item right before the optimistic flip
    pub fn prior_membership(&self) -> bool {
        self.direction.prior_membership()
    }

    pub fn resolve(&self, succeeded: bool, current_epoch: u64) -> Resolution {
        if succeeded {
            Resolution::Confirmed
        } else if self.epoch == current_epoch {
            Resolution::RolledBack
        } else {
            Resolution::Superseded
        }
    }
}

/// In-flight mutations keyed by their id
#[derive(Debug, Default)]
pub struct PendingMutations {
    by_id: HashMap<Uuid, PendingMutation>,
}

impl PendingMutations {
    pub fn begin(
        &mut self,
        list: ListKind,
        item: ItemId,
        direction: Direction,
        epoch: u64,
    ) -> PendingMutation {
        let mutation = PendingMutation {
            id: Uuid::new_v4(),
            list,
            item,
            direction,
            epoch,
            started_at: Utc::now(),
        };
        self.by_id.insert(mutation.id, mutation.clone());
        mutation
    }

    pub fn finish(&mut self, id: Uuid) -> Option<PendingMutation> {
        self.by_id.remove(&id)
    }

    pub fn is_pending(&self, list: ListKind, item: ItemId) -> bool {
        self.by_id
            .values()
            .any(|m| m.list == list && m.item == item)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingMutation> {
        self.by_id.values()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve() {
        let mut pending = PendingMutations::default();
        let mutation = pending.begin(ListKind::Favorites, ItemId::new(10), Direction::Remove, 3);

        assert_eq!(mutation.resolve(true, 3), Resolution::Confirmed);
        assert_eq!(mutation.resolve(true, 4), Resolution::Confirmed);
        assert_eq!(mutation.resolve(false, 3), Resolution::RolledBack);
        assert_eq!(mutation.resolve(false, 4), Resolution::Superseded);
        assert!(mutation.prior_membership());
    }

    #[test]
    fn test_begin_and_finish() {
        let mut pending = PendingMutations::default();
        let first = pending.begin(ListKind::Watchlist, ItemId::new(5), Direction::Add, 0);
        let second = pending.begin(ListKind::Watchlist, ItemId::new(5), Direction::Remove, 0);

        assert_eq!(pending.len(), 2);
        assert!(pending.is_pending(ListKind::Watchlist, ItemId::new(5)));
        assert!(!pending.is_pending(ListKind::Favorites, ItemId::new(5)));

        assert_eq!(pending.finish(first.id), Some(first.clone()));
        assert!(pending.is_pending(ListKind::Watchlist, ItemId::new(5)));
        assert_eq!(pending.finish(first.id), None);

        pending.finish(second.id);
        assert_eq!(pending.len(), 0);
    }
}
