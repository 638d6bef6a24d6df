//! Error types for the layout model

use crate::slot::SlotCode;
use crate::wine::WineId;

/// Errors raised when constructing or checking layout values
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    /// Location code is neither `R<row>C<col>` nor `F<index>`
    #[error("invalid slot code: {0:?}")]
    InvalidSlotCode(String),

    /// Location range cannot be expanded
    #[error("invalid location range {start}..{end}: {reason}")]
    InvalidRange {
        /// First code of the range
        start: String,
        /// Last code of the range
        end: String,
        /// Why the range was rejected
        reason: &'static str,
    },

    /// A wine occupies more than one slot
    #[error("wine {wine} occupies {} slots", slots.len())]
    DuplicateWine {
        /// Double-booked wine
        wine: WineId,
        /// Every slot holding it
        slots: Vec<SlotCode>,
    },
}

impl LayoutError {
    #[inline]
    pub(crate) fn invalid_range(start: &str, end: &str, reason: &'static str) -> Self {
        Self::InvalidRange {
            start: start.to_string(),
            end: end.to_string(),
            reason,
        }
    }
}

/// Errors that can occur when working with layout hashes
#[derive(Debug, thiserror::Error)]
pub enum HashError {
    /// Invalid hash length
    #[error("invalid hash length: expected {expected}, got {actual}")]
    InvalidLength {
        /// Required byte count
        expected: usize,
        /// Supplied byte count
        actual: usize,
    },

    /// Hex encoding error
    #[error("hex decode error: {0}")]
    HexDecode(#[from] hex::FromHexError),
}
