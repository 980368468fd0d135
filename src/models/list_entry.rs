use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ItemId, ToItemId};

/// One row of a user's favorites or watchlist as returned by the remote API
///
/// `id` is the primary key of the membership record itself and is never used
/// as a set key; only the movie id in `item_id` is. The movie id is kept as a
/// raw JSON value so a single malformed row is dropped during coercion instead
/// of failing the whole list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListEntry {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default, alias = "tmdb_id", alias = "itemId", alias = "filme_id")]
    pub item_id: Value,
    #[serde(default, alias = "titulo")]
    pub title: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default, alias = "created_at")]
    pub added_at: Option<DateTime<Utc>>,
}

impl ListEntry {
    /// Creates an entry carrying only a movie id
    pub fn new(item: ItemId) -> Self {
        Self {
            id: None,
            item_id: Value::from(item.get()),
            title: None,
            poster_path: None,
            added_at: None,
        }
    }

    /// The movie id coerced to an integer, if it is one
    pub fn item(&self) -> Option<ItemId> {
        self.item_id.to_item_id()
    }
}
