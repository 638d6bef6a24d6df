//! Current-versus-target slot classification
//!
//! [`diff`] compares two assignments over the union of their slots and
//! produces one [`SlotDiff`] per slot plus the raw move list needed to turn
//! `current` into `target`. It is pure and never fails: inconsistent input is
//! reported through [`Classification::Unplaceable`].

use crate::resolver::detect_swap_pairs;
use cellar_layout::{Assignment, Move, MoveType, SlotCode, WineId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Per-slot outcome of a diff
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Classification {
    /// Same occupant in both assignments
    Stay,
    /// Empty now, a bottle arrives
    MoveIn,
    /// Current bottle leaves
    MoveOut,
    /// Slot exchanges its bottle with one other slot
    Swap,
    /// Empty in both
    Empty,
    /// Inconsistent data; no safe move can be derived
    Unplaceable,
}

/// Why a slot was classified unplaceable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnplaceableReason {
    /// Target places the same wine in several slots
    DuplicateTarget,
    /// Current inventory holds the same wine in several slots
    DuplicateCurrent,
    /// Target wants a wine that no current slot holds
    MissingFromCurrent,
    /// Current bottle must leave but has no target slot
    NoDestination,
    /// Current bottle's target slot keeps a bottle that cannot leave
    DestinationBlocked,
}

/// Classification of one slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotDiff {
    /// Slot being classified
    pub slot: SlotCode,
    /// Occupant now
    pub current: Option<WineId>,
    /// Occupant wanted
    pub target: Option<WineId>,
    /// Outcome
    pub classification: Classification,
    /// Set for unplaceable slots
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<UnplaceableReason>,
}

/// Classification counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DiffStats {
    /// Slots keeping their bottle
    pub stay: usize,
    /// Slots receiving a bottle
    pub move_in: usize,
    /// Slots losing their bottle
    pub move_out: usize,
    /// Distinct two-slot exchanges
    pub swap_pairs: usize,
    /// Slots empty on both sides
    pub empty: usize,
    /// Slots with inconsistent data
    pub unplaceable: usize,
}

impl DiffStats {
    fn record(&mut self, classification: Classification) {
        match classification {
            Classification::Stay => self.stay += 1,
            Classification::MoveIn => self.move_in += 1,
            Classification::MoveOut => self.move_out += 1,
            Classification::Empty => self.empty += 1,
            Classification::Unplaceable => self.unplaceable += 1,
            // Counted as pairs from the move list
            Classification::Swap => {}
        }
    }
}

/// Result of comparing two assignments
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutDiff {
    /// One entry per slot, natural slot order
    pub slots: Vec<SlotDiff>,
    /// Aggregate counts
    pub stats: DiffStats,
    /// Raw moves ordered by source slot; swap halves carry `MoveType::Swap`
    pub moves: Vec<Move>,
}

impl LayoutDiff {
    /// Classification of `slot`
    #[must_use]
    pub fn slot(&self, slot: &SlotCode) -> Option<&SlotDiff> {
        self.slots.iter().find(|d| &d.slot == slot)
    }

    /// Unplaceable slots
    pub fn unplaceable(&self) -> impl Iterator<Item = &SlotDiff> + '_ {
        self.slots
            .iter()
            .filter(|d| d.classification == Classification::Unplaceable)
    }

    /// Whether any bottle has to move
    #[inline]
    #[must_use]
    pub fn has_moves(&self) -> bool {
        !self.moves.is_empty()
    }
}

/// Classify every slot of `current ∪ target` and derive the raw move list
#[must_use]
pub fn diff(current: &Assignment, target: &Assignment) -> LayoutDiff {
    let current_dups = current.duplicates();
    let target_dups = target.duplicates();
    let mut flagged: BTreeMap<SlotCode, UnplaceableReason> = BTreeMap::new();

    for slots in target_dups.values() {
        for slot in slots {
            flagged.insert(slot.clone(), UnplaceableReason::DuplicateTarget);
        }
    }
    for slots in current_dups.values() {
        for slot in slots {
            flagged
                .entry(slot.clone())
                .or_insert(UnplaceableReason::DuplicateCurrent);
        }
    }
    // The other side of a double-booked wine cannot be resolved either
    for (slot, wine) in current.occupied() {
        if target_dups.contains_key(&wine) {
            flagged
                .entry(slot.clone())
                .or_insert(UnplaceableReason::DuplicateTarget);
        }
    }
    for (slot, wine) in target.occupied() {
        if current_dups.contains_key(&wine) {
            flagged
                .entry(slot.clone())
                .or_insert(UnplaceableReason::DuplicateCurrent);
        }
    }

    let inconsistent = |wine: &WineId| current_dups.contains_key(wine) || target_dups.contains_key(wine);
    let source_of: HashMap<WineId, &SlotCode> = current
        .occupied()
        .filter(|(_, wine)| !inconsistent(wine))
        .map(|(slot, wine)| (wine, slot))
        .collect();
    let targeted: BTreeSet<WineId> = target.occupied().map(|(_, wine)| wine).collect();

    let mut moves = Vec::new();
    for (slot, wine) in target.occupied() {
        if inconsistent(&wine) {
            continue;
        }
        match source_of.get(&wine) {
            Some(&from) if from != slot => moves.push(Move::new(wine, from.clone(), slot.clone())),
            Some(_) => {}
            None => {
                flagged
                    .entry(slot.clone())
                    .or_insert(UnplaceableReason::MissingFromCurrent);
            }
        }
    }
    for (slot, wine) in current.occupied() {
        if !inconsistent(&wine) && !targeted.contains(&wine) {
            flagged
                .entry(slot.clone())
                .or_insert(UnplaceableReason::NoDestination);
        }
    }
    drop_blocked_moves(current, &mut moves, &mut flagged);
    moves.sort_by(|a, b| a.from.cmp(&b.from));

    let pairs = detect_swap_pairs(&moves);
    let mut swap_slots = BTreeSet::new();
    for &i in pairs.keys() {
        moves[i].move_type = MoveType::Swap;
        swap_slots.insert(moves[i].from.clone());
    }

    let mut stats = DiffStats {
        swap_pairs: pairs.len() / 2,
        ..DiffStats::default()
    };
    let slots = current
        .union_slots(target)
        .into_iter()
        .map(|slot| {
            let now = current.get(slot);
            let wanted = target.get(slot);
            let reason = flagged.get(slot).copied();
            let classification = match (now, wanted) {
                (None, None) => Classification::Empty,
                (a, b) if a == b => Classification::Stay,
                _ if reason.is_some() => Classification::Unplaceable,
                _ if swap_slots.contains(slot) => Classification::Swap,
                (Some(_), _) => Classification::MoveOut,
                (None, Some(_)) => Classification::MoveIn,
            };
            stats.record(classification);
            SlotDiff {
                slot: slot.clone(),
                current: now,
                target: wanted,
                classification,
                reason: reason.filter(|_| classification == Classification::Unplaceable),
            }
        })
        .collect();

    LayoutDiff {
        slots,
        stats,
        moves,
    }
}

/// Remove moves into slots whose bottle never leaves
///
/// A slot is stuck when its current bottle has no move out of it. Dropping a
/// move into a stuck slot leaves that move's bottle in place, so its source
/// becomes stuck too; repeat until nothing changes.
fn drop_blocked_moves(
    current: &Assignment,
    moves: &mut Vec<Move>,
    flagged: &mut BTreeMap<SlotCode, UnplaceableReason>,
) {
    let leaving: BTreeSet<&SlotCode> = moves.iter().map(|m| &m.from).collect();
    let mut stuck: BTreeSet<SlotCode> = current
        .occupied()
        .filter(|(slot, _)| !leaving.contains(slot))
        .map(|(slot, _)| slot.clone())
        .collect();

    loop {
        let (blocked, kept): (Vec<Move>, Vec<Move>) =
            moves.drain(..).partition(|m| stuck.contains(&m.to));
        *moves = kept;
        if blocked.is_empty() {
            return;
        }
        for m in blocked {
            flagged
                .entry(m.from.clone())
                .or_insert(UnplaceableReason::DestinationBlocked);
            stuck.insert(m.from);
        }
    }
}
