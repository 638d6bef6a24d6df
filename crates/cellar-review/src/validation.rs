//! Pre-execution validation gate
//!
//! Moves are checked as one batch immediately before execution. Four error
//! kinds exist; any one of them blocks the whole batch:
//!
//! | kind               | meaning                                              |
//! |--------------------|------------------------------------------------------|
//! | `duplicate_target` | two moves land in the same slot                      |
//! | `duplicate_wine`   | the same wine is moved twice                         |
//! | `source_mismatch`  | `from` no longer holds the expected wine             |
//! | `target_occupied`  | `to` is full and is not vacated by the same batch    |
//!
//! The first two need no live state and are checked locally before any
//! network call.

use crate::error::InventoryError;
use crate::inventory::InventoryService;
use cellar_layout::{Assignment, Move, SlotCode, WineId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

/// Category of a validation failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationErrorKind {
    /// Two moves share a destination
    DuplicateTarget,
    /// Destination is occupied and not vacated in the batch
    TargetOccupied,
    /// Source does not hold the expected wine
    SourceMismatch,
    /// Same wine moved more than once
    DuplicateWine,
}

impl ValidationErrorKind {
    /// Every kind, in report order
    pub const ALL: [Self; 4] = [
        Self::SourceMismatch,
        Self::TargetOccupied,
        Self::DuplicateTarget,
        Self::DuplicateWine,
    ];

    /// Heading used in user-facing summaries
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::DuplicateTarget => "Duplicate destination",
            Self::TargetOccupied => "Destination occupied",
            Self::SourceMismatch => "Bottle not where expected",
            Self::DuplicateWine => "Wine moved twice",
        }
    }
}

impl Display for ValidationErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::DuplicateTarget => "duplicate_target",
            Self::TargetOccupied => "target_occupied",
            Self::SourceMismatch => "source_mismatch",
            Self::DuplicateWine => "duplicate_wine",
        };
        f.write_str(name)
    }
}

/// One reason a batch cannot run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationError {
    /// Category
    #[serde(rename = "type")]
    pub kind: ValidationErrorKind,
    /// Human-readable detail
    pub message: String,
    /// Slot the error is about
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot: Option<SlotCode>,
    /// Wine the error is about
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wine_id: Option<WineId>,
}

impl ValidationError {
    /// Error of `kind` with a message and no location
    #[must_use]
    pub fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            slot: None,
            wine_id: None,
        }
    }

    /// Attach the slot concerned
    #[inline]
    #[must_use]
    pub fn at(mut self, slot: SlotCode) -> Self {
        self.slot = Some(slot);
        self
    }

    /// Attach the wine concerned
    #[inline]
    #[must_use]
    pub fn for_wine(mut self, wine: WineId) -> Self {
        self.wine_id = Some(wine);
        self
    }
}

/// Outcome of validating one batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Whether the batch may run
    pub valid: bool,
    /// Every problem found
    #[serde(default)]
    pub errors: Vec<ValidationError>,
}

impl ValidationReport {
    /// Report with no problems
    #[must_use]
    pub fn passed() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
        }
    }

    /// Report built from collected errors; valid only when there are none
    #[must_use]
    pub fn from_errors(mut errors: Vec<ValidationError>) -> Self {
        errors.sort_by_key(|e| ValidationErrorKind::ALL.iter().position(|k| *k == e.kind));
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }

    /// Errors of one kind
    pub fn of_kind(&self, kind: ValidationErrorKind) -> impl Iterator<Item = &ValidationError> + '_ {
        self.errors.iter().filter(move |e| e.kind == kind)
    }

    /// Whether any error has `kind`
    #[must_use]
    pub fn has(&self, kind: ValidationErrorKind) -> bool {
        self.of_kind(kind).next().is_some()
    }

    /// User-readable breakdown grouped by kind
    ///
    /// Always states that nothing was applied, since a blocked batch never
    /// runs partially.
    #[must_use]
    pub fn summary(&self) -> String {
        if self.valid && self.errors.is_empty() {
            return "All moves passed validation.".to_string();
        }
        let count = self.errors.len();
        let mut out = match count {
            0 => "Move plan blocked by the inventory.".to_string(),
            1 => "Move plan blocked by 1 problem.".to_string(),
            n => format!("Move plan blocked by {n} problems."),
        };
        out.push_str(" No changes were applied; moves run as a single all-or-nothing batch.");
        for kind in ValidationErrorKind::ALL {
            let group: Vec<&ValidationError> = self.of_kind(kind).collect();
            if group.is_empty() {
                continue;
            }
            out.push_str(&format!("\n{} ({}):", kind.label(), group.len()));
            for error in group {
                out.push_str(&format!("\n  - {}", error.message));
            }
        }
        out
    }
}

/// Checks that need only the batch itself
#[must_use]
pub fn check_structure(moves: &[Move]) -> Vec<ValidationError> {
    let mut by_target: BTreeMap<&SlotCode, usize> = BTreeMap::new();
    let mut by_wine: BTreeMap<WineId, usize> = BTreeMap::new();
    for mv in moves {
        *by_target.entry(&mv.to).or_default() += 1;
        *by_wine.entry(mv.wine_id).or_default() += 1;
    }

    let mut errors = Vec::new();
    for (slot, count) in by_target.into_iter().filter(|(_, n)| *n > 1) {
        errors.push(
            ValidationError::new(
                ValidationErrorKind::DuplicateTarget,
                format!("{count} moves target slot {slot}"),
            )
            .at(slot.clone()),
        );
    }
    for (wine, count) in by_wine.into_iter().filter(|(_, n)| *n > 1) {
        errors.push(
            ValidationError::new(
                ValidationErrorKind::DuplicateWine,
                format!("Wine {wine} is moved {count} times"),
            )
            .for_wine(wine),
        );
    }
    errors
}

/// All four checks against a given live layout
///
/// Reference implementation for backends and fakes.
#[must_use]
pub fn check_moves(moves: &[Move], live: &Assignment) -> ValidationReport {
    let mut errors = check_structure(moves);
    let vacated: BTreeSet<&SlotCode> = moves.iter().map(|m| &m.from).collect();

    for mv in moves {
        let found = live.get(&mv.from);
        if found != Some(mv.wine_id) {
            let detail = match found {
                Some(other) => format!("wine {other}"),
                None => "an empty slot".to_string(),
            };
            errors.push(
                ValidationError::new(
                    ValidationErrorKind::SourceMismatch,
                    format!("Expected wine {} in {}, found {detail}", mv.wine_id, mv.from),
                )
                .at(mv.from.clone())
                .for_wine(mv.wine_id),
            );
        }
        if let Some(occupant) = live.get(&mv.to) {
            if !vacated.contains(&mv.to) {
                errors.push(
                    ValidationError::new(
                        ValidationErrorKind::TargetOccupied,
                        format!("{} is occupied by wine {occupant}", mv.to),
                    )
                    .at(mv.to.clone())
                    .for_wine(mv.wine_id),
                );
            }
        }
    }
    ValidationReport::from_errors(errors)
}

/// Runs the local pre-check, then the backend's live validation
#[derive(Clone)]
pub struct ValidationGate {
    service: Arc<dyn InventoryService>,
    live_check: bool,
}

impl ValidationGate {
    /// Gate backed by `service`
    #[must_use]
    pub fn new(service: Arc<dyn InventoryService>) -> Self {
        Self {
            service,
            live_check: true,
        }
    }

    /// Enable or disable the backend call
    #[inline]
    #[must_use]
    pub fn with_live_check(mut self, enabled: bool) -> Self {
        self.live_check = enabled;
        self
    }

    /// Validate `moves` as one batch
    ///
    /// # Errors
    /// Propagates backend failures; a failed check is a report, not an error.
    pub async fn validate(&self, moves: &[Move]) -> Result<ValidationReport, InventoryError> {
        let local = check_structure(moves);
        if !local.is_empty() {
            tracing::debug!(errors = local.len(), "batch failed local pre-check");
            return Ok(ValidationReport::from_errors(local));
        }
        if !self.live_check {
            return Ok(ValidationReport::passed());
        }
        self.service.validate_moves(moves).await
    }
}

impl std::fmt::Debug for ValidationGate {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationGate")
            .field("live_check", &self.live_check)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(code: &str) -> SlotCode {
        SlotCode::new(code)
    }

    fn mv(wine: u64, from: &str, to: &str) -> Move {
        Move::new(WineId(wine), slot(from), slot(to))
    }

    fn live(entries: &[(&str, Option<u64>)]) -> Assignment {
        entries
            .iter()
            .map(|(code, wine)| (slot(code), wine.map(WineId)))
            .collect()
    }

    #[test]
    fn clean_batch_passes() {
        let layout = live(&[("A", Some(1)), ("B", None)]);
        let report = check_moves(&[mv(1, "A", "B")], &layout);
        assert!(report.valid);
        assert!(report.errors.is_empty());
    }

    #[test]
    fn swap_halves_vacate_each_other() {
        let layout = live(&[("A", Some(1)), ("B", Some(2))]);
        let report = check_moves(&[mv(1, "A", "B"), mv(2, "B", "A")], &layout);
        assert!(report.valid);
    }

    #[test]
    fn source_mismatch_detected() {
        let layout = live(&[("A", Some(9)), ("B", None)]);
        let report = check_moves(&[mv(1, "A", "B")], &layout);
        assert!(!report.valid);
        assert!(report.has(ValidationErrorKind::SourceMismatch));
        assert_eq!(report.errors[0].message, "Expected wine 1 in A, found wine 9");
        assert_eq!(report.errors[0].slot, Some(slot("A")));
    }

    #[test]
    fn occupied_target_not_vacated() {
        let layout = live(&[("A", Some(1)), ("B", Some(2))]);
        let report = check_moves(&[mv(1, "A", "B")], &layout);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].kind, ValidationErrorKind::TargetOccupied);
    }

    #[test]
    fn structural_errors_need_no_live_state() {
        let errors = check_structure(&[mv(1, "A", "C"), mv(2, "B", "C"), mv(1, "D", "E")]);
        let kinds: Vec<_> = errors.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            [ValidationErrorKind::DuplicateTarget, ValidationErrorKind::DuplicateWine]
        );
    }

    #[test]
    fn summary_groups_by_kind() {
        let layout = live(&[("A", None), ("B", Some(5)), ("C", None)]);
        let report = check_moves(&[mv(1, "A", "B"), mv(2, "C", "B")], &layout);
        let text = report.summary();
        assert!(text.starts_with("Move plan blocked by 5 problems."));
        assert!(text.contains("No changes were applied"));
        assert!(text.contains("Bottle not where expected (2):"));
        assert!(text.contains("Destination occupied (2):"));
        assert!(text.contains("Duplicate destination (1):"));
        assert!(!text.contains("Wine moved twice"));
    }

    #[test]
    fn summary_of_bare_rejection() {
        let report = ValidationReport {
            valid: false,
            errors: Vec::new(),
        };
        assert!(report.summary().contains("No changes were applied"));
        assert_eq!(ValidationReport::passed().summary(), "All moves passed validation.");
    }

    #[test]
    fn wire_format_uses_type_tag() {
        let error = ValidationError::new(ValidationErrorKind::SourceMismatch, "gone").at(slot("R1C1"));
        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(json["type"], "source_mismatch");
        assert_eq!(json["slot"], "R1C1");
        assert!(json.get("wineId").is_none());
    }
}
