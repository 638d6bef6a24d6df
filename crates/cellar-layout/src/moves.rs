//! Physical relocation operations

use crate::slot::SlotCode;
use crate::wine::WineId;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// How a move is carried out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveType {
    /// Bottle goes to a slot that is (or will be) empty
    #[default]
    Move,
    /// Half of a two-slot exchange
    Swap,
}

/// Relocate one bottle from one slot to another
///
/// Valid only if, when executed, `from` holds exactly `wine_id` and `to` is
/// empty or is itself the `from` of another move in the same batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Move {
    /// Bottle being moved
    pub wine_id: WineId,
    /// Display label for the bottle
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wine_name: Option<String>,
    /// Source slot
    pub from: SlotCode,
    /// Destination slot
    pub to: SlotCode,
    /// Plain move or swap half
    #[serde(default)]
    pub move_type: MoveType,
}

impl Move {
    /// Plain move of `wine_id` from `from` to `to`
    #[inline]
    #[must_use]
    pub fn new(wine_id: WineId, from: SlotCode, to: SlotCode) -> Self {
        Self {
            wine_id,
            wine_name: None,
            from,
            to,
            move_type: MoveType::Move,
        }
    }

    /// Set move type
    #[inline]
    #[must_use]
    pub fn with_type(mut self, move_type: MoveType) -> Self {
        self.move_type = move_type;
        self
    }

    /// Set display label
    #[inline]
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.wine_name = Some(name.into());
        self
    }

    /// Whether this is half of a swap
    #[inline]
    #[must_use]
    pub fn is_swap(&self) -> bool {
        self.move_type == MoveType::Swap
    }

    /// Whether the bottle changes between cellar and fridge
    #[inline]
    #[must_use]
    pub fn crosses_zone(&self) -> bool {
        self.from.capability() != self.to.capability()
    }

    /// Whether `other` moves the bottle back along the same two slots
    #[inline]
    #[must_use]
    pub fn mirrors(&self, other: &Self) -> bool {
        self.from == other.to && self.to == other.from
    }
}

impl Display for Move {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.wine_name {
            Some(name) => write!(f, "{name} ({}): {} → {}", self.wine_id, self.from, self.to),
            None => write!(f, "{}: {} → {}", self.wine_id, self.from, self.to),
        }
    }
}
