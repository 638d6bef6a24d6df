//! Cellar Move Planning
//!
//! Pure transformation layer between a current and a target layout.
//!
//! # Core Concepts
//!
//! - [`diff`]: Classify every slot as stay / moveIn / moveOut / swap / empty / unplaceable
//! - [`detect_swap_pairs`] / [`resolve`]: Swap pairs, dependent moves and long cycles
//! - [`build_plan`]: Ordered, numbered steps for guided or batch execution
//! - [`OverrideStore`]: Undo-capable user edits to the target
//!
//! # Example
//!
//! ```rust
//! use cellar_layout::{Assignment, SlotCode, WineId};
//! use cellar_plan::{plan_layouts, Classification};
//!
//! let current: Assignment = [
//!     (SlotCode::new("R1C1"), Some(WineId(10))),
//!     (SlotCode::new("R1C2"), Some(WineId(20))),
//! ]
//! .into_iter()
//! .collect();
//! let target: Assignment = [
//!     (SlotCode::new("R1C1"), Some(WineId(20))),
//!     (SlotCode::new("R1C2"), Some(WineId(10))),
//! ]
//! .into_iter()
//! .collect();
//!
//! let (diff, plan) = plan_layouts(&current, &target);
//! assert_eq!(diff.stats.swap_pairs, 1);
//! assert_eq!(plan.steps.len(), 1);
//! assert!(diff.slots.iter().all(|s| s.classification == Classification::Swap));
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod diff;
mod overrides;
mod plan;
mod resolver;

// Re-exports
pub use diff::{diff, Classification, DiffStats, LayoutDiff, SlotDiff, UnplaceableReason};
pub use overrides::{OverrideEntry, OverrideError, OverrideStore};
pub use plan::{build_plan, plan_layouts, Plan, PlanStep, StepKind};
pub use resolver::{
    blocker_of, dependent_moves, detect_swap_pairs, long_cycles, resolve, Resolution,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
