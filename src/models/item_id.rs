use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Display;

/// Normalised movie identifier used as the key of every membership set
///
/// Callers hold movie ids in several shapes (JSON numbers, numeric strings
/// from route params, membership-record rows). Everything is funnelled through
/// [`ToItemId`] so that `"10"`, `10` and `10.0` all land on the same key, and
/// anything that is not an integer never becomes a key at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(i64);

impl ItemId {
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ItemId {
    fn from(raw: i64) -> Self {
        Self(raw)
    }
}

/// Integer coercion for anything that may carry a movie id
///
/// Returns `None` for values that are not integers: empty or non-numeric text,
/// fractional numbers, NaN/infinity, out-of-range values, and JSON values that
/// are neither numbers nor strings.
pub trait ToItemId {
    fn to_item_id(&self) -> Option<ItemId>;
}

impl ToItemId for ItemId {
    fn to_item_id(&self) -> Option<ItemId> {
        Some(*self)
    }
}

macro_rules! impl_to_item_id_for_int {
    ($($t:ty),*) => {
        $(
            impl ToItemId for $t {
                fn to_item_id(&self) -> Option<ItemId> {
                    i64::try_from(*self).ok().map(ItemId)
                }
            }
        )*
    };
}

impl_to_item_id_for_int!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

impl ToItemId for f64 {
    fn to_item_id(&self) -> Option<ItemId> {
        from_float(*self)
    }
}

impl ToItemId for str {
    fn to_item_id(&self) -> Option<ItemId> {
        let text = self.trim();
        if text.is_empty() {
            return None;
        }
        match text.parse::<i64>() {
            Ok(raw) => Some(ItemId(raw)),
            Err(_) => text.parse::<f64>().ok().and_then(from_float),
        }
    }
}

impl ToItemId for String {
    fn to_item_id(&self) -> Option<ItemId> {
        self.as_str().to_item_id()
    }
}

impl ToItemId for Value {
    fn to_item_id(&self) -> Option<ItemId> {
        match self {
            Value::Number(n) => n
                .as_i64()
                .map(ItemId)
                .or_else(|| n.as_f64().and_then(from_float)),
            Value::String(s) => s.to_item_id(),
            _ => None,
        }
    }
}

impl<T: ToItemId + ?Sized> ToItemId for &T {
    fn to_item_id(&self) -> Option<ItemId> {
        (**self).to_item_id()
    }
}

fn from_float(raw: f64) -> Option<ItemId> {
    // i64::MAX as f64 rounds up to 2^63, hence the strict upper bound
    if !raw.is_finite() || raw.fract() != 0.0 || raw < i64::MIN as f64 || raw >= i64::MAX as f64
    {
        return None;
    }
    Some(ItemId(raw as i64))
}
