//! Cellar Layout Model
//!
//! Slots, assignments and moves shared by the planning and review crates.
//!
//! # Core Concepts
//!
//! - [`SlotCode`]: Immutable identity of a physical storage slot
//! - [`Capability`]: Cellar row slot or fridge slot
//! - [`Assignment`]: Slot → occupant mapping (current or target)
//! - [`Move`]: One bottle relocation
//! - [`LayoutHash`]: Blake3 digest of an assignment's occupancy
//!
//! # Example
//!
//! ```rust
//! use cellar_layout::{Assignment, SlotCode, WineId};
//!
//! let mut current = Assignment::new();
//! current.set(SlotCode::new("R1C1"), Some(WineId(10)));
//! current.set(SlotCode::new("R1C2"), None);
//!
//! let snapshot = current.content_hash();
//! current.swap(&SlotCode::new("R1C1"), &SlotCode::new("R1C2"));
//! assert_ne!(snapshot, current.content_hash());
//! ```

#![warn(unreachable_pub)]

mod assignment;
mod error;
mod hash;
mod moves;
mod slot;
mod wine;

// Re-exports
pub use assignment::Assignment;
pub use error::{HashError, LayoutError};
pub use hash::LayoutHash;
pub use moves::{Move, MoveType};
pub use slot::{
    expand_range, standard_layout, Capability, Slot, SlotCode, SlotKind, CELLAR_ROWS,
    FIRST_ROW_COLUMNS, FRIDGE_SLOTS, ROW_COLUMNS,
};
pub use wine::WineId;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
