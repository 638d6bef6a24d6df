//! Slot assignments
//!
//! An [`Assignment`] maps every slot of a layout to its occupant. The review
//! flow compares two of them: `current` (ground truth from the inventory) and
//! `target` (goal from the placement solver).

use crate::error::LayoutError;
use crate::hash::LayoutHash;
use crate::moves::Move;
use crate::slot::{Slot, SlotCode};
use crate::wine::WineId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Mapping from slot code to occupant
///
/// Enumerates its slot universe, empty slots included. Slots absent from the
/// map are treated as empty. Iteration follows natural slot order.
///
/// Serialises as `{ "R1C1": 10, "R1C2": null }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Assignment(BTreeMap<SlotCode, Option<WineId>>);

impl Assignment {
    /// Empty assignment with no slots
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assignment over `slots`, all empty
    #[must_use]
    pub fn empty_layout<'a>(slots: impl IntoIterator<Item = &'a Slot>) -> Self {
        Self(slots.into_iter().map(|s| (s.code.clone(), None)).collect())
    }

    /// Occupant of `slot` (`None` when empty or unknown)
    #[inline]
    #[must_use]
    pub fn get(&self, slot: &SlotCode) -> Option<WineId> {
        self.0.get(slot).copied().flatten()
    }

    /// Whether `slot` belongs to this assignment's universe
    #[inline]
    #[must_use]
    pub fn contains_slot(&self, slot: &SlotCode) -> bool {
        self.0.contains_key(slot)
    }

    /// Set the occupant of `slot`, returning the previous one
    pub fn set(&mut self, slot: SlotCode, occupant: Option<WineId>) -> Option<WineId> {
        self.0.insert(slot, occupant).flatten()
    }

    /// Empty `slot`, returning the bottle it held
    pub fn clear(&mut self, slot: &SlotCode) -> Option<WineId> {
        self.0.get_mut(slot).and_then(Option::take)
    }

    /// Exchange the occupants of two slots
    ///
    /// Slots outside the universe are added. Swapping a slot with itself is
    /// a no-op.
    pub fn swap(&mut self, a: &SlotCode, b: &SlotCode) {
        if a == b {
            return;
        }
        let first = self.get(a);
        let second = self.get(b);
        self.0.insert(a.clone(), second);
        self.0.insert(b.clone(), first);
    }

    /// First slot (natural order) holding `wine`
    #[must_use]
    pub fn locate(&self, wine: WineId) -> Option<&SlotCode> {
        self.occupied().find(|(_, w)| *w == wine).map(|(slot, _)| slot)
    }

    /// Every slot with its occupant
    pub fn entries(&self) -> impl Iterator<Item = (&SlotCode, Option<WineId>)> + '_ {
        self.0.iter().map(|(slot, wine)| (slot, *wine))
    }

    /// Occupied slots only
    pub fn occupied(&self) -> impl Iterator<Item = (&SlotCode, WineId)> + '_ {
        self.0.iter().filter_map(|(slot, wine)| wine.map(|w| (slot, w)))
    }

    /// Slot universe
    pub fn slots(&self) -> impl Iterator<Item = &SlotCode> + '_ {
        self.0.keys()
    }

    /// Number of slots in the universe
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the universe is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of occupied slots
    #[must_use]
    pub fn occupied_count(&self) -> usize {
        self.0.values().filter(|w| w.is_some()).count()
    }

    /// Union of both slot universes, in natural order
    #[must_use]
    pub fn union_slots<'a>(&'a self, other: &'a Self) -> BTreeSet<&'a SlotCode> {
        self.slots().chain(other.slots()).collect()
    }

    /// Wines appearing in more than one slot, with every slot they occupy
    #[must_use]
    pub fn duplicates(&self) -> BTreeMap<WineId, Vec<SlotCode>> {
        let mut seen: BTreeMap<WineId, Vec<SlotCode>> = BTreeMap::new();
        for (slot, wine) in self.occupied() {
            seen.entry(wine).or_default().push(slot.clone());
        }
        seen.retain(|_, slots| slots.len() > 1);
        seen
    }

    /// Check that no wine is double-booked
    ///
    /// # Errors
    /// `LayoutError::DuplicateWine` for the lowest double-booked wine id
    pub fn check_unique(&self) -> Result<(), LayoutError> {
        match self.duplicates().into_iter().next() {
            Some((wine, slots)) => Err(LayoutError::DuplicateWine { wine, slots }),
            None => Ok(()),
        }
    }

    /// Apply a confirmed batch of moves simultaneously
    ///
    /// All sources are vacated before any destination is filled, so swap
    /// pairs and chains land correctly regardless of order. A move whose
    /// source does not hold its wine is skipped. Returns the number of moves
    /// applied.
    pub fn apply_moves(&mut self, moves: &[Move]) -> usize {
        let held: Vec<&Move> = moves
            .iter()
            .filter(|mv| self.get(&mv.from) == Some(mv.wine_id))
            .collect();
        for mv in &held {
            self.clear(&mv.from);
        }
        for mv in &held {
            self.0.insert(mv.to.clone(), Some(mv.wine_id));
        }
        held.len()
    }

    /// Content hash of the occupancy
    ///
    /// Only occupied slots contribute, so an explicit empty slot and an
    /// absent one hash the same.
    #[must_use]
    pub fn content_hash(&self) -> LayoutHash {
        let mut hasher = blake3::Hasher::new();
        for (slot, wine) in self.occupied() {
            hasher.update(slot.as_str().as_bytes());
            hasher.update(&[0]);
            hasher.update(&wine.get().to_le_bytes());
        }
        LayoutHash::new(*hasher.finalize().as_bytes())
    }
}

impl FromIterator<(SlotCode, Option<WineId>)> for Assignment {
    fn from_iter<I: IntoIterator<Item = (SlotCode, Option<WineId>)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
