//! Review session lifecycle
//!
//! ```text
//! Idle -> Proposed <-> Adjusting
//!            |
//!            v
//!        Validating -> Executing -> Idle (batch done)
//!            |             |
//!            +-------------+-> Proposed (blocked, stale, failed, step done)
//! ```
//!
//! Closing is allowed from every state except `Executing`.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Where a review session currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewState {
    /// No plan loaded
    Idle,
    /// Plan shown to the user
    Proposed,
    /// Override being applied
    Adjusting,
    /// Staleness and validation checks running
    Validating,
    /// Batch submitted to the backend
    Executing,
}

impl ReviewState {
    /// Whether the session holds a plan the user can act on
    #[inline]
    #[must_use]
    pub fn is_reviewable(self) -> bool {
        matches!(self, Self::Proposed)
    }

    /// Whether the user may still abandon the session
    #[inline]
    #[must_use]
    pub fn is_closable(self) -> bool {
        !matches!(self, Self::Executing)
    }
}

impl Display for ReviewState {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Proposed => "proposed",
            Self::Adjusting => "adjusting",
            Self::Validating => "validating",
            Self::Executing => "executing",
        };
        f.write_str(name)
    }
}

/// States reachable from `from` in one transition
#[must_use]
pub fn allowed_transitions(from: ReviewState) -> Vec<ReviewState> {
    use ReviewState::{Adjusting, Executing, Idle, Proposed, Validating};
    match from {
        Idle => vec![Proposed],
        Proposed => vec![Adjusting, Validating, Idle],
        Adjusting => vec![Proposed, Idle],
        Validating => vec![Executing, Proposed, Idle],
        Executing => vec![Idle, Proposed],
    }
}

/// Validates a state transition
///
/// # Errors
/// `ReviewError::IllegalTransition` when `to` is not reachable from `from`.
pub fn validate_transition(
    from: ReviewState,
    to: ReviewState,
) -> Result<(), crate::ReviewError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(crate::ReviewError::IllegalTransition { from, to })
    }
}
