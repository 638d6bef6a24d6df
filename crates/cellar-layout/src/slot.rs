//! Physical storage slots
//!
//! Provides [`SlotCode`], the immutable identity of a storage position, and
//! [`Capability`], the kind of storage it offers.
//!
//! # Location codes
//! - `R<row>C<col>` → cellar row slot (e.g. `R3C1`)
//! - `F<index>` → fridge slot (e.g. `F4`)
//!
//! Codes that match neither form are kept as opaque identifiers so foreign
//! layouts can still be compared; strict parsing via [`FromStr`] rejects them.

use crate::error::LayoutError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Number of fridge slots in the standard layout
pub const FRIDGE_SLOTS: u32 = 9;

/// Number of cellar rows in the standard layout
pub const CELLAR_ROWS: u32 = 19;

/// Columns in the first cellar row
pub const FIRST_ROW_COLUMNS: u32 = 7;

/// Columns in every other cellar row
pub const ROW_COLUMNS: u32 = 9;

/// Storage capability of a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    /// Cellar row slot
    Cellar,
    /// Fridge slot
    Fridge,
}

impl Display for Capability {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cellar => f.write_str("cellar"),
            Self::Fridge => f.write_str("fridge"),
        }
    }
}

/// Parsed structure of a location code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    /// Fridge slot `F<index>`
    Fridge {
        /// 1-based fridge position
        index: u32,
    },
    /// Cellar slot `R<row>C<col>`
    Cellar {
        /// 1-based row
        row: u32,
        /// 1-based column
        col: u32,
    },
    /// Code with no recognised structure
    Other,
}

impl SlotKind {
    fn parse(code: &str) -> Self {
        if let Some(rest) = code.strip_prefix('F') {
            if let Some(index) = parse_positive(rest) {
                return Self::Fridge { index };
            }
        } else if let Some(rest) = code.strip_prefix('R') {
            if let Some((row, col)) = rest.split_once('C') {
                if let (Some(row), Some(col)) = (parse_positive(row), parse_positive(col)) {
                    return Self::Cellar { row, col };
                }
            }
        }
        Self::Other
    }

    fn sort_key(self) -> (u8, u32, u32) {
        match self {
            Self::Fridge { index } => (0, index, 0),
            Self::Cellar { row, col } => (1, row, col),
            Self::Other => (2, 0, 0),
        }
    }
}

fn parse_positive(digits: &str) -> Option<u32> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok().filter(|n| *n > 0)
}

/// Location code identifying one physical slot
///
/// Ordered naturally: fridge slots by index, then cellar slots by
/// `(row, col)`, then opaque codes lexicographically. `R2C1 < R10C1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotCode(String);

impl SlotCode {
    /// Create a slot code without validating its structure
    #[inline]
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Cellar slot at `row`, `col`
    #[inline]
    #[must_use]
    pub fn cellar(row: u32, col: u32) -> Self {
        Self(format!("R{row}C{col}"))
    }

    /// Fridge slot at `index`
    #[inline]
    #[must_use]
    pub fn fridge(index: u32) -> Self {
        Self(format!("F{index}"))
    }

    /// Raw location code
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parsed structure of this code
    #[inline]
    #[must_use]
    pub fn kind(&self) -> SlotKind {
        SlotKind::parse(&self.0)
    }

    /// Storage capability (opaque codes count as cellar storage)
    #[inline]
    #[must_use]
    pub fn capability(&self) -> Capability {
        match self.kind() {
            SlotKind::Fridge { .. } => Capability::Fridge,
            SlotKind::Cellar { .. } | SlotKind::Other => Capability::Cellar,
        }
    }
}

impl Ord for SlotCode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.kind()
            .sort_key()
            .cmp(&other.kind().sort_key())
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for SlotCode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Display for SlotCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SlotCode {
    type Err = LayoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = Self::new(s);
        match code.kind() {
            SlotKind::Other => Err(LayoutError::InvalidSlotCode(s.to_string())),
            _ => Ok(code),
        }
    }
}

impl From<&str> for SlotCode {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

impl AsRef<str> for SlotCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A physical slot: immutable code plus capability tag
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Slot {
    /// Location code
    pub code: SlotCode,
    /// Storage capability
    pub capability: Capability,
}

impl Slot {
    /// Slot with the capability implied by its code
    #[inline]
    #[must_use]
    pub fn new(code: SlotCode) -> Self {
        let capability = code.capability();
        Self { code, capability }
    }
}

/// The reference physical layout
///
/// Fridge `F1..F9`, cellar row `R1` with 7 columns and rows `R2..R19`
/// with 9 columns each, in natural order.
#[must_use]
pub fn standard_layout() -> Vec<Slot> {
    let fridge = (1..=FRIDGE_SLOTS).map(SlotCode::fridge);
    let cellar = (1..=CELLAR_ROWS).flat_map(|row| {
        let cols = if row == 1 { FIRST_ROW_COLUMNS } else { ROW_COLUMNS };
        (1..=cols).map(move |col| SlotCode::cellar(row, col))
    });
    fridge.chain(cellar).map(Slot::new).collect()
}

/// Expand a location range into individual codes
///
/// `expand_range("R10C1", Some("R10C3"))` yields `R10C1, R10C2, R10C3`.
/// Without an end, or for fridge codes, the start expands to itself.
///
/// # Errors
/// - `LayoutError::InvalidSlotCode` if either end fails to parse
/// - `LayoutError::InvalidRange` if the range spans rows or runs backwards
pub fn expand_range(start: &str, end: Option<&str>) -> Result<Vec<SlotCode>, LayoutError> {
    let first: SlotCode = start.trim().parse()?;
    let Some(end) = end.map(str::trim).filter(|e| !e.is_empty()) else {
        return Ok(vec![first]);
    };
    let last: SlotCode = end.parse()?;

    match (first.kind(), last.kind()) {
        (SlotKind::Cellar { row, col: from }, SlotKind::Cellar { row: end_row, col: to }) => {
            if row != end_row {
                return Err(LayoutError::invalid_range(start, end, "range spans rows"));
            }
            if to < from {
                return Err(LayoutError::invalid_range(start, end, "range runs backwards"));
            }
            Ok((from..=to).map(|col| SlotCode::cellar(row, col)).collect())
        }
        _ => Ok(vec![first]),
    }
}
