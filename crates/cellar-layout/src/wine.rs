//! Wine identifiers

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Identifier of the wine held in a slot
///
/// One bottle per slot; the same id may legitimately appear in several
/// slots of the inventory only when the data is inconsistent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WineId(pub u64);

impl WineId {
    /// Raw numeric id
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for WineId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl Display for WineId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
