//! User adjustments to the proposed target
//!
//! Every override exchanges the intended occupants of two slots in the
//! target assignment. Because each edit is a transposition, the target never
//! gains a double-booked wine, and every edit can be undone exactly.

use cellar_layout::{Assignment, SlotCode, WineId};
use serde::{Deserialize, Serialize};

/// Override rejected before touching the target
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OverrideError {
    /// Slot is not part of the layout under review
    #[error("unknown slot: {0}")]
    UnknownSlot(SlotCode),

    /// Source and destination are the same slot
    #[error("cannot exchange slot {0} with itself")]
    SameSlot(SlotCode),

    /// Both slots are empty in the target
    #[error("slots {from} and {to} are both empty")]
    NoOp {
        /// Dragged slot
        from: SlotCode,
        /// Drop slot
        to: SlotCode,
    },
}

/// One applied override, with what it replaced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideEntry {
    /// Dragged slot
    pub from: SlotCode,
    /// Drop slot
    pub to: SlotCode,
    /// Target occupant of `from` before the edit
    pub previous_from: Option<WineId>,
    /// Target occupant of `to` before the edit
    pub previous_to: Option<WineId>,
}

/// Undo-capable stack of target overrides
#[derive(Debug, Clone)]
pub struct OverrideStore {
    original: Assignment,
    target: Assignment,
    stack: Vec<OverrideEntry>,
}

impl OverrideStore {
    /// Start from the solver's proposal
    #[must_use]
    pub fn new(proposal: Assignment) -> Self {
        Self {
            target: proposal.clone(),
            original: proposal,
            stack: Vec::new(),
        }
    }

    /// Exchange the intended occupants of `from` and `to`
    ///
    /// Only the target changes; the current assignment is never touched.
    ///
    /// # Errors
    /// - `OverrideError::UnknownSlot` if either slot is outside the layout
    /// - `OverrideError::SameSlot` if both are the same slot
    /// - `OverrideError::NoOp` if both are empty
    pub fn apply_override(
        &mut self,
        from: &SlotCode,
        to: &SlotCode,
    ) -> Result<&Assignment, OverrideError> {
        for slot in [from, to] {
            if !self.target.contains_slot(slot) {
                return Err(OverrideError::UnknownSlot(slot.clone()));
            }
        }
        if from == to {
            return Err(OverrideError::SameSlot(from.clone()));
        }
        let previous_from = self.target.get(from);
        let previous_to = self.target.get(to);
        if previous_from.is_none() && previous_to.is_none() {
            return Err(OverrideError::NoOp {
                from: from.clone(),
                to: to.clone(),
            });
        }

        self.target.swap(from, to);
        self.stack.push(OverrideEntry {
            from: from.clone(),
            to: to.clone(),
            previous_from,
            previous_to,
        });
        Ok(&self.target)
    }

    /// Revert the most recent override
    pub fn pop_undo(&mut self) -> Option<OverrideEntry> {
        let entry = self.stack.pop()?;
        self.target.set(entry.from.clone(), entry.previous_from);
        self.target.set(entry.to.clone(), entry.previous_to);
        Some(entry)
    }

    /// Whether the target deviates from the proposal through overrides
    #[inline]
    #[must_use]
    pub fn has_overrides(&self) -> bool {
        !self.stack.is_empty()
    }

    /// Drop every override and restore the proposal
    pub fn reset(&mut self) -> &Assignment {
        self.stack.clear();
        self.target = self.original.clone();
        &self.target
    }

    /// Target with overrides applied
    #[inline]
    #[must_use]
    pub fn target(&self) -> &Assignment {
        &self.target
    }

    /// The untouched proposal
    #[inline]
    #[must_use]
    pub fn original(&self) -> &Assignment {
        &self.original
    }

    /// Applied overrides, oldest first
    #[inline]
    #[must_use]
    pub fn entries(&self) -> &[OverrideEntry] {
        &self.stack
    }
}
