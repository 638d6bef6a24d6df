//! Cellar Review Sessions
//!
//! Async layer between a move plan and the live inventory.
//!
//! # Core Concepts
//!
//! - [`ReviewSession`]: One review, from proposal to applied batch
//! - [`InventoryService`]: Backend seam (proposal, live layout, validate, execute)
//! - [`ValidationGate`]: Local pre-check plus live validation before every batch
//! - [`ReviewState`]: `Idle → Proposed ⇄ Adjusting → Validating → Executing`
//! - [`ReviewObserver`]: Change notifications for whatever renders the review
//!
//! # Guarantees
//!
//! - A batch runs only after a fresh staleness check and a passing validation
//! - Swap pairs always travel in one `execute_moves` call
//! - The session's current layout changes only after a backend confirmation
//! - Blocked or failed applies keep the plan for another attempt

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod config;
mod error;
mod inventory;
pub mod logging;
mod observer;
mod session;
mod state;
mod validation;

// Re-exports
pub use config::ReviewConfig;
pub use error::{InventoryError, ReviewError};
pub use inventory::{ExecuteResponse, InventoryService, MoveBatch, ProposedLayout};
pub use observer::{NoopObserver, ReviewObserver};
pub use session::{ApplyOutcome, GuidedProgress, ReviewSession, SessionId};
pub use state::{allowed_transitions, validate_transition, ReviewState};
pub use validation::{
    check_moves, check_structure, ValidationError, ValidationErrorKind, ValidationGate,
    ValidationReport,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::*;
    use cellar_layout::{Assignment, SlotCode, WineId};
    use cellar_plan::plan_layouts;

    fn layout(entries: &[(&str, Option<u64>)]) -> Assignment {
        entries
            .iter()
            .map(|(code, wine)| (SlotCode::new(*code), wine.map(WineId)))
            .collect()
    }

    #[test]
    fn derived_plans_pass_live_checks() {
        let current = layout(&[
            ("R1C1", Some(10)),
            ("R1C2", Some(20)),
            ("R1C3", Some(30)),
            ("R1C4", None),
        ]);
        let target = layout(&[
            ("R1C1", Some(20)),
            ("R1C2", Some(10)),
            ("R1C3", None),
            ("R1C4", Some(30)),
        ]);
        let (_, plan) = plan_layouts(&current, &target);
        let report = check_moves(&plan.moves, &current);
        assert!(report.valid, "{}", report.summary());
    }

    #[test]
    fn lone_swap_half_is_rejected() {
        let current = layout(&[("R1C1", Some(10)), ("R1C2", Some(20))]);
        let target = layout(&[("R1C1", Some(20)), ("R1C2", Some(10))]);
        let (_, plan) = plan_layouts(&current, &target);

        let report = check_moves(&plan.moves[..1], &current);
        assert!(report.has(ValidationErrorKind::TargetOccupied));
        assert!(check_moves(&plan.steps[0].moves().into_iter().cloned().collect::<Vec<_>>(), &current).valid);
    }
}
