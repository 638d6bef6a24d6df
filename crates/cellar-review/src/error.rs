//! Error types for review sessions
//!
//! Split along the seam the session talks across:
//! - [`InventoryError`]: anything the backend or its transport reports
//! - [`ReviewError`]: everything a session operation can fail with
//!
//! Validation failures and stale snapshots are not errors; they come back
//! as [`ApplyOutcome`](crate::ApplyOutcome) variants.

use crate::state::ReviewState;
use cellar_plan::OverrideError;

/// Failure talking to the inventory backend
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InventoryError {
    /// Request never produced a response
    #[error("transport error: {0}")]
    Transport(String),

    /// Backend answered with a non-success status
    #[error("backend returned {status}: {message}")]
    Backend {
        /// HTTP-like status code
        status: u16,
        /// Message reported by the backend
        message: String,
    },

    /// Response body could not be understood
    #[error("could not decode backend response: {0}")]
    Decode(String),
}

impl InventoryError {
    /// Message suitable for showing the user unchanged
    ///
    /// Backend messages are passed through verbatim.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Backend { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Check if the same request may succeed when repeated
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Backend { status, .. } => *status >= 500,
            Self::Decode(_) => false,
        }
    }
}

/// Main review session error type
#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    /// Backend call failed outside of execution
    #[error("inventory error: {0}")]
    Inventory(#[from] InventoryError),

    /// Batch execution failed; nothing is assumed to have moved
    #[error("execution failed: {message}")]
    Execution {
        /// Backend message, verbatim
        message: String,
        /// Whether repeating the batch may succeed
        retryable: bool,
    },

    /// Session state does not permit the operation
    #[error("illegal state transition: {from} -> {to}")]
    IllegalTransition {
        /// State the session is in
        from: ReviewState,
        /// State the operation needed
        to: ReviewState,
    },

    /// No step with this number in the current plan
    #[error("unknown step {0}")]
    UnknownStep(usize),

    /// Step is blocked behind other pending moves
    #[error("step {step} depends on other pending moves; apply them as one batch")]
    StepRequiresBatch {
        /// Rejected step
        step: usize,
    },

    /// Step was already executed in this session
    #[error("step {0} has already been applied")]
    StepAlreadyDone(usize),

    /// Plan has no pending moves
    #[error("nothing to apply")]
    NothingToApply,

    /// Target edit rejected
    #[error("override rejected: {0}")]
    Override(#[from] OverrideError),

    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(String),
}

impl ReviewError {
    /// Check if error is retryable
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Inventory(e) => e.is_retryable(),
            Self::Execution { retryable, .. } => *retryable,
            _ => false,
        }
    }

    /// Build an execution failure from a backend error
    pub(crate) fn execution(err: &InventoryError) -> Self {
        Self::Execution {
            message: err.message(),
            retryable: err.is_retryable(),
        }
    }
}
