//! Review sessions
//!
//! A [`ReviewSession`] owns everything one review needs: the current
//! snapshot, the override stack, the derived plan and the guided-mode
//! progress. Nothing is shared between sessions and nothing outlives one.
//!
//! # Apply flow
//!
//! Every apply, whole-plan or single-step, runs the same sequence:
//!
//! 1. fetch the live layout and compare its hash with the snapshot; on a
//!    mismatch stop and re-analyse, without validating
//! 2. validate the batch; on failure stop, keep the plan
//! 3. execute the batch as one call; only a confirmed success touches the
//!    session's current snapshot
//!
//! Apply methods take `&mut self`, so at most one sequence is in flight.

use crate::config::ReviewConfig;
use crate::error::ReviewError;
use crate::inventory::{InventoryService, ProposedLayout};
use crate::observer::{NoopObserver, ReviewObserver};
use crate::state::{validate_transition, ReviewState};
use crate::validation::{ValidationGate, ValidationReport};
use cellar_layout::{Assignment, LayoutHash, Move, SlotCode};
use cellar_plan::{plan_layouts, LayoutDiff, OverrideEntry, OverrideStore, Plan, PlanStep};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::{self, Display, Formatter};
use std::sync::Arc;
use tracing::{debug, info, warn};
use ulid::Ulid;

/// Unique review session identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub Ulid);

impl SessionId {
    /// Generate new session ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for SessionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How an apply ended when it did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Backend confirmed the batch
    Applied {
        /// Bottles moved
        moved: usize,
        /// Guided steps still open; zero after a whole-plan apply
        remaining_steps: usize,
    },
    /// Validation rejected the batch; nothing moved, plan retained
    Blocked(ValidationReport),
    /// Live layout differed from the snapshot; a fresh plan was loaded
    Reanalysed {
        /// Snapshot the old plan was built on
        previous: LayoutHash,
        /// Snapshot of the fresh plan
        current: LayoutHash,
    },
    /// Live layout differed and re-analysis is disabled
    Stale {
        /// Snapshot hash
        expected: LayoutHash,
        /// Live hash
        found: LayoutHash,
    },
}

impl ApplyOutcome {
    /// Whether bottles were moved
    #[inline]
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }

    /// Message for the user
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Applied { moved: 1, .. } => "Moved 1 bottle.".to_string(),
            Self::Applied { moved, .. } => format!("Moved {moved} bottles."),
            Self::Blocked(report) => report.summary(),
            Self::Reanalysed { .. } => "The cellar changed since this plan was proposed. \
                 A fresh plan has been loaded; review it before applying."
                .to_string(),
            Self::Stale { .. } => "The cellar changed since this plan was proposed. \
                 Reopen the review to get a fresh plan."
                .to_string(),
        }
    }
}

/// Guided-mode bookkeeping by step number
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuidedProgress {
    completed: BTreeSet<usize>,
    dismissed: BTreeSet<usize>,
}

impl GuidedProgress {
    /// Steps the backend confirmed
    #[inline]
    #[must_use]
    pub fn completed(&self) -> &BTreeSet<usize> {
        &self.completed
    }

    /// Steps the user skipped
    #[inline]
    #[must_use]
    pub fn dismissed(&self) -> &BTreeSet<usize> {
        &self.dismissed
    }

    /// Whether step `number` was applied
    #[inline]
    #[must_use]
    pub fn is_completed(&self, number: usize) -> bool {
        self.completed.contains(&number)
    }

    /// First step neither applied nor skipped
    #[must_use]
    pub fn next_step<'p>(&self, plan: &'p Plan) -> Option<&'p PlanStep> {
        plan.steps
            .iter()
            .find(|s| !self.completed.contains(&s.number) && !self.dismissed.contains(&s.number))
    }

    /// Steps not yet applied, skipped ones included
    #[must_use]
    pub fn remaining(&self, plan: &Plan) -> usize {
        plan.steps
            .iter()
            .filter(|s| !self.completed.contains(&s.number))
            .count()
    }
}

enum Submission {
    Confirmed(usize),
    Halted(ApplyOutcome),
}

/// One review of a proposed layout
pub struct ReviewSession {
    id: SessionId,
    service: Arc<dyn InventoryService>,
    gate: ValidationGate,
    config: ReviewConfig,
    observer: Arc<dyn ReviewObserver>,
    state: ReviewState,
    current: Assignment,
    snapshot: LayoutHash,
    overrides: OverrideStore,
    diff: LayoutDiff,
    plan: Plan,
    progress: GuidedProgress,
}

impl ReviewSession {
    /// Fetch the proposal and build the first plan
    ///
    /// # Errors
    /// Propagates the backend failure if the proposal cannot be fetched.
    pub async fn open_review(
        service: Arc<dyn InventoryService>,
        config: ReviewConfig,
        observer: Arc<dyn ReviewObserver>,
    ) -> Result<Self, ReviewError> {
        let proposal = service.get_proposed_layout().await?;
        let gate =
            ValidationGate::new(Arc::clone(&service)).with_live_check(config.validate_before_execute);
        let empty = Assignment::new();
        let mut session = Self {
            id: SessionId::new(),
            service,
            gate,
            config,
            observer,
            state: ReviewState::Idle,
            snapshot: empty.content_hash(),
            overrides: OverrideStore::new(empty.clone()),
            current: empty,
            diff: LayoutDiff::default(),
            plan: Plan::empty(),
            progress: GuidedProgress::default(),
        };
        session.seed(proposal);
        session.transition(ReviewState::Proposed)?;
        info!(
            session = %session.id,
            snapshot = %session.snapshot.short(),
            plan = %session.plan.summary(),
            "review opened"
        );
        Ok(session)
    }

    /// Open with default configuration and no observer
    ///
    /// # Errors
    /// See [`ReviewSession::open_review`].
    pub async fn open(service: Arc<dyn InventoryService>) -> Result<Self, ReviewError> {
        Self::open_review(service, ReviewConfig::default(), Arc::new(NoopObserver)).await
    }

    /// Session identifier
    #[inline]
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Lifecycle state
    #[inline]
    #[must_use]
    pub fn state(&self) -> ReviewState {
        self.state
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ReviewConfig {
        &self.config
    }

    /// Current plan
    #[inline]
    #[must_use]
    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    /// Slot classifications behind the plan
    #[inline]
    #[must_use]
    pub fn diff(&self) -> &LayoutDiff {
        &self.diff
    }

    /// Current layout as last confirmed
    #[inline]
    #[must_use]
    pub fn current(&self) -> &Assignment {
        &self.current
    }

    /// Target with overrides applied
    #[inline]
    #[must_use]
    pub fn target(&self) -> &Assignment {
        self.overrides.target()
    }

    /// Hash of [`ReviewSession::current`]
    #[inline]
    #[must_use]
    pub fn snapshot(&self) -> LayoutHash {
        self.snapshot
    }

    /// Applied overrides, oldest first
    #[inline]
    #[must_use]
    pub fn overrides(&self) -> &[OverrideEntry] {
        self.overrides.entries()
    }

    /// Guided-mode progress
    #[inline]
    #[must_use]
    pub fn progress(&self) -> &GuidedProgress {
        &self.progress
    }

    /// Next step to show in guided mode
    #[must_use]
    pub fn next_step(&self) -> Option<&PlanStep> {
        self.progress.next_step(&self.plan)
    }

    /// Exchange the intended occupants of two target slots and rebuild
    ///
    /// # Errors
    /// - `ReviewError::IllegalTransition` outside the proposed state
    /// - `ReviewError::Override` if the edit is rejected; the plan is unchanged
    pub fn apply_override(&mut self, from: &SlotCode, to: &SlotCode) -> Result<&Plan, ReviewError> {
        self.transition(ReviewState::Adjusting)?;
        let edited = self.overrides.apply_override(from, to).map(|_| ());
        match edited {
            Ok(()) => {
                debug!(session = %self.id, %from, %to, "override applied");
                self.finish_adjustment(true)?;
                Ok(&self.plan)
            }
            Err(e) => {
                self.finish_adjustment(false)?;
                Err(e.into())
            }
        }
    }

    /// Revert the most recent override
    ///
    /// # Errors
    /// `ReviewError::IllegalTransition` outside the proposed state.
    pub fn undo_override(&mut self) -> Result<Option<OverrideEntry>, ReviewError> {
        self.transition(ReviewState::Adjusting)?;
        let entry = self.overrides.pop_undo();
        if let Some(e) = &entry {
            debug!(session = %self.id, from = %e.from, to = %e.to, "override undone");
        }
        self.finish_adjustment(entry.is_some())?;
        Ok(entry)
    }

    /// Drop every override and return to the solver's proposal
    ///
    /// # Errors
    /// `ReviewError::IllegalTransition` outside the proposed state.
    pub fn reset_overrides(&mut self) -> Result<&Plan, ReviewError> {
        self.transition(ReviewState::Adjusting)?;
        let had_overrides = self.overrides.has_overrides();
        self.overrides.reset();
        self.finish_adjustment(had_overrides)?;
        Ok(&self.plan)
    }

    /// Apply every pending move as one atomic batch
    ///
    /// Steps already applied in guided mode are left out; skipped steps are
    /// included. On success the session is done and returns to idle.
    ///
    /// # Errors
    /// - `ReviewError::NothingToApply` if no move is pending
    /// - `ReviewError::Execution` if the backend failed the batch; the plan
    ///   is retained for a retry
    /// - `ReviewError::Inventory` if a check could not reach the backend
    pub async fn apply_all(&mut self) -> Result<ApplyOutcome, ReviewError> {
        self.transition(ReviewState::Validating)?;
        let moves: Vec<Move> = self
            .plan
            .pending_moves(self.progress.completed())
            .into_iter()
            .filter_map(|i| self.plan.moves.get(i).cloned())
            .collect();
        if moves.is_empty() {
            self.transition(ReviewState::Proposed)?;
            return Err(ReviewError::NothingToApply);
        }

        info!(session = %self.id, moves = moves.len(), "applying plan");
        match self.submit(&moves).await? {
            Submission::Halted(outcome) => Ok(outcome),
            Submission::Confirmed(moved) => {
                self.finish_review()?;
                Ok(ApplyOutcome::Applied {
                    moved,
                    remaining_steps: 0,
                })
            }
        }
    }

    /// Apply one guided step
    ///
    /// A swap step submits both halves in one call. A move step whose
    /// destination is still held by a pending move is rejected unless
    /// `allow_dependent_steps` is set, in which case the whole chain behind
    /// it is submitted as one batch and every step it covers is completed.
    ///
    /// # Errors
    /// - `ReviewError::UnknownStep` / `ReviewError::StepAlreadyDone`
    /// - `ReviewError::StepRequiresBatch` for a dependent step
    /// - as [`ReviewSession::apply_all`] otherwise
    pub async fn apply_step(&mut self, number: usize) -> Result<ApplyOutcome, ReviewError> {
        self.ensure_reviewable()?;
        let step = self.plan.step(number).ok_or(ReviewError::UnknownStep(number))?;
        if self.progress.is_completed(number) {
            return Err(ReviewError::StepAlreadyDone(number));
        }

        let completed = self.progress.completed();
        let indices = if self.plan.is_step_ready(number, completed) {
            step.move_indices.clone()
        } else if self.config.allow_dependent_steps {
            self.plan.batch_for_step(number, completed)
        } else {
            return Err(ReviewError::StepRequiresBatch { step: number });
        };
        let moves: Vec<Move> = indices
            .iter()
            .filter_map(|&i| self.plan.moves.get(i).cloned())
            .collect();

        self.transition(ReviewState::Validating)?;
        info!(session = %self.id, step = number, moves = moves.len(), "applying step");
        let moved = match self.submit(&moves).await? {
            Submission::Halted(outcome) => return Ok(outcome),
            Submission::Confirmed(moved) => moved,
        };

        let batch: BTreeSet<usize> = indices.into_iter().collect();
        let covered: Vec<usize> = self
            .plan
            .steps
            .iter()
            .filter(|s| s.move_indices.iter().all(|i| batch.contains(i)))
            .map(|s| s.number)
            .collect();
        for n in covered {
            self.progress.completed.insert(n);
            self.progress.dismissed.remove(&n);
        }

        let remaining_steps = self.progress.remaining(&self.plan);
        if remaining_steps == 0 {
            self.finish_review()?;
        } else {
            self.transition(ReviewState::Proposed)?;
        }
        Ok(ApplyOutcome::Applied {
            moved,
            remaining_steps,
        })
    }

    /// Dismiss a guided step without touching the backend
    ///
    /// # Errors
    /// - `ReviewError::IllegalTransition` outside the proposed state
    /// - `ReviewError::UnknownStep` / `ReviewError::StepAlreadyDone`
    pub fn skip_step(&mut self, number: usize) -> Result<(), ReviewError> {
        self.ensure_reviewable()?;
        self.plan.step(number).ok_or(ReviewError::UnknownStep(number))?;
        if self.progress.is_completed(number) {
            return Err(ReviewError::StepAlreadyDone(number));
        }
        self.progress.dismissed.insert(number);
        debug!(session = %self.id, step = number, "step skipped");
        Ok(())
    }

    /// Discard the plan, overrides and progress
    ///
    /// Has no backend effect. Closing an idle session is a no-op.
    ///
    /// # Errors
    /// `ReviewError::IllegalTransition` while a batch is executing.
    pub fn close_review(&mut self) -> Result<(), ReviewError> {
        if !self.state.is_closable() {
            return Err(ReviewError::IllegalTransition {
                from: self.state,
                to: ReviewState::Idle,
            });
        }
        if self.state == ReviewState::Idle {
            return Ok(());
        }
        self.transition(ReviewState::Idle)?;
        self.discard();
        info!(session = %self.id, "review closed");
        Ok(())
    }

    async fn submit(&mut self, moves: &[Move]) -> Result<Submission, ReviewError> {
        if self.config.check_staleness {
            if let Some(outcome) = self.check_staleness().await? {
                return Ok(Submission::Halted(outcome));
            }
        }

        let report = match self.gate.validate(moves).await {
            Ok(report) => report,
            Err(e) => {
                warn!(session = %self.id, error = %e, "validation unavailable");
                self.transition(ReviewState::Proposed)?;
                return Err(e.into());
            }
        };
        if !report.valid {
            warn!(session = %self.id, errors = report.errors.len(), "batch blocked by validation");
            self.transition(ReviewState::Proposed)?;
            return Ok(Submission::Halted(ApplyOutcome::Blocked(report)));
        }

        self.transition(ReviewState::Executing)?;
        let response = match self.service.execute_moves(moves).await {
            Ok(response) => response,
            Err(e) => {
                warn!(session = %self.id, error = %e, "batch execution failed");
                self.transition(ReviewState::Proposed)?;
                return Err(ReviewError::execution(&e));
            }
        };

        if response.success {
            let tracked = self.current.apply_moves(moves);
            if tracked != moves.len() {
                warn!(
                    session = %self.id,
                    confirmed = moves.len(),
                    tracked,
                    "snapshot does not hold every confirmed move's source"
                );
            }
            self.snapshot = self.current.content_hash();
            let moved = response.moved.unwrap_or(moves.len());
            info!(session = %self.id, moved, snapshot = %self.snapshot.short(), "batch applied");
            return Ok(Submission::Confirmed(moved));
        }

        self.transition(ReviewState::Proposed)?;
        match response.validation {
            Some(report) if !report.valid => {
                warn!(session = %self.id, errors = report.errors.len(), "backend rejected batch");
                Ok(Submission::Halted(ApplyOutcome::Blocked(report)))
            }
            _ => {
                let message = response
                    .error
                    .unwrap_or_else(|| "the inventory reported a failure without details".to_string());
                warn!(session = %self.id, %message, "batch execution failed");
                Err(ReviewError::Execution {
                    message,
                    retryable: true,
                })
            }
        }
    }

    /// `Some` when the live layout no longer matches the snapshot
    async fn check_staleness(&mut self) -> Result<Option<ApplyOutcome>, ReviewError> {
        let live = match self.service.fetch_current_layout().await {
            Ok(live) => live,
            Err(e) => {
                self.transition(ReviewState::Proposed)?;
                return Err(e.into());
            }
        };
        let found = live.content_hash();
        if found == self.snapshot {
            return Ok(None);
        }

        let expected = self.snapshot;
        warn!(
            session = %self.id,
            expected = %expected.short(),
            found = %found.short(),
            "cellar changed since the plan was proposed"
        );
        self.transition(ReviewState::Proposed)?;
        if !self.config.reanalyse_on_stale {
            return Ok(Some(ApplyOutcome::Stale { expected, found }));
        }

        let proposal = self.service.get_proposed_layout().await?;
        self.seed(proposal);
        info!(session = %self.id, plan = %self.plan.summary(), "plan re-analysed");
        Ok(Some(ApplyOutcome::Reanalysed {
            previous: expected,
            current: self.snapshot,
        }))
    }

    fn seed(&mut self, proposal: ProposedLayout) {
        let ProposedLayout {
            current_layout,
            mut target_layout,
            sort_plan,
            ..
        } = proposal;

        // Every live slot is a valid drop target for overrides
        for slot in current_layout.slots() {
            if !target_layout.contains_slot(slot) {
                target_layout.set(slot.clone(), None);
            }
        }

        self.snapshot = current_layout.content_hash();
        self.current = current_layout;
        self.overrides = OverrideStore::new(target_layout);
        self.rebuild();

        if !sort_plan.is_empty() && !same_moves(&sort_plan, &self.plan.moves) {
            warn!(
                session = %self.id,
                solver = sort_plan.len(),
                local = self.plan.moves.len(),
                "solver move list disagrees with derived plan; using derived plan"
            );
        }
    }

    fn rebuild(&mut self) {
        let (diff, plan) = plan_layouts(&self.current, self.overrides.target());
        self.diff = diff;
        self.plan = plan;
        self.progress = GuidedProgress::default();
        debug!(session = %self.id, plan = %self.plan.summary(), "plan rebuilt");
        if !self.plan.unplaceable.is_empty() {
            warn!(
                session = %self.id,
                unplaceable = self.plan.unplaceable.len(),
                "some slots have inconsistent data and are left out of the plan"
            );
        }
        self.observer.on_plan_changed(&self.plan);
    }

    fn finish_adjustment(&mut self, edited: bool) -> Result<(), ReviewError> {
        if edited {
            self.observer.on_override_changed(self.overrides.target());
            self.rebuild();
        }
        self.transition(ReviewState::Proposed)
    }

    fn finish_review(&mut self) -> Result<(), ReviewError> {
        self.transition(ReviewState::Idle)?;
        self.discard();
        info!(session = %self.id, "review complete");
        Ok(())
    }

    fn discard(&mut self) {
        self.overrides = OverrideStore::new(Assignment::new());
        self.diff = LayoutDiff::default();
        self.plan = Plan::empty();
        self.progress = GuidedProgress::default();
        self.observer.on_plan_changed(&self.plan);
    }

    fn ensure_reviewable(&self) -> Result<(), ReviewError> {
        if self.state.is_reviewable() {
            Ok(())
        } else {
            Err(ReviewError::IllegalTransition {
                from: self.state,
                to: ReviewState::Validating,
            })
        }
    }

    fn transition(&mut self, to: ReviewState) -> Result<(), ReviewError> {
        validate_transition(self.state, to)?;
        let from = std::mem::replace(&mut self.state, to);
        debug!(session = %self.id, %from, %to, "state changed");
        self.observer.on_state_changed(from, to);
        Ok(())
    }
}

impl fmt::Debug for ReviewSession {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReviewSession")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("config", &self.config)
            .field("snapshot", &self.snapshot)
            .field("plan", &self.plan.summary())
            .field("progress", &self.progress)
            .finish_non_exhaustive()
    }
}

/// Same `(wine, from, to)` triples, ignoring order and move type
fn same_moves(a: &[Move], b: &[Move]) -> bool {
    let key = |m: &Move| (m.wine_id, m.from.clone(), m.to.clone());
    let left: BTreeSet<_> = a.iter().map(key).collect();
    let right: BTreeSet<_> = b.iter().map(key).collect();
    left == right
}
