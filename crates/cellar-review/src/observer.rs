//! Change notifications for whatever renders the review

use crate::state::ReviewState;
use cellar_layout::Assignment;
use cellar_plan::Plan;

/// Receives session changes
///
/// Every method defaults to doing nothing. Called synchronously from the
/// session, so implementations should return quickly.
pub trait ReviewObserver: Send + Sync {
    /// A new plan replaced the previous one
    fn on_plan_changed(&self, _plan: &Plan) {}

    /// The target changed through an override, undo or reset
    fn on_override_changed(&self, _target: &Assignment) {}

    /// The session moved between states
    fn on_state_changed(&self, _from: ReviewState, _to: ReviewState) {}
}

/// Observer that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl ReviewObserver for NoopObserver {}
