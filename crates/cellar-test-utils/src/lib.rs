//! Testing utilities for the cellar workspace
//!
//! Shared fixtures, an in-memory inventory backend and a recording observer.

#![allow(missing_docs)]

use async_trait::async_trait;
use cellar_layout::{Assignment, Move, SlotCode, WineId};
use cellar_plan::{plan_layouts, Plan};
use cellar_review::{
    check_moves, ExecuteResponse, InventoryError, InventoryService, ProposedLayout, ReviewObserver,
    ReviewState, ValidationReport,
};
use parking_lot::Mutex;

/// Build an assignment from `(slot, occupant)` pairs
pub fn layout(entries: &[(&str, Option<u64>)]) -> Assignment {
    entries
        .iter()
        .map(|(code, wine)| (SlotCode::new(*code), wine.map(WineId)))
        .collect()
}

pub fn slot(code: &str) -> SlotCode {
    SlotCode::new(code)
}

pub fn mv(wine: u64, from: &str, to: &str) -> Move {
    Move::new(WineId(wine), slot(from), slot(to))
}

/// Proposal the way a solver would send it, move list included
pub fn proposal(current: Assignment, target: Assignment) -> ProposedLayout {
    let (diff, plan) = plan_layouts(&current, &target);
    ProposedLayout {
        current_layout: current,
        target_layout: target,
        sort_plan: plan.moves,
        stats: diff.stats,
    }
}

/// R1C1 and R1C2 exchange bottles 10 and 20
pub fn swap_layouts() -> (Assignment, Assignment) {
    (
        layout(&[("R1C1", Some(10)), ("R1C2", Some(20))]),
        layout(&[("R1C1", Some(20)), ("R1C2", Some(10))]),
    )
}

/// Bottle 1 moves from A to the empty slot B
pub fn single_move_layouts() -> (Assignment, Assignment) {
    (
        layout(&[("A", Some(1)), ("B", None)]),
        layout(&[("A", None), ("B", Some(1))]),
    )
}

/// Swap F1↔F2, a free move R3C1→R3C2 and a chain R1C1→R1C2→R1C3
pub fn mixed_layouts() -> (Assignment, Assignment) {
    (
        layout(&[
            ("F1", Some(1)),
            ("F2", Some(2)),
            ("R1C1", Some(3)),
            ("R1C2", Some(4)),
            ("R1C3", None),
            ("R3C1", Some(5)),
            ("R3C2", None),
        ]),
        layout(&[
            ("F1", Some(2)),
            ("F2", Some(1)),
            ("R1C1", None),
            ("R1C2", Some(3)),
            ("R1C3", Some(4)),
            ("R3C1", None),
            ("R3C2", Some(5)),
        ]),
    )
}

/// Call counters of a [`MemoryInventory`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub proposals: usize,
    pub fetches: usize,
    pub validations: usize,
    pub executions: usize,
}

#[derive(Debug)]
struct Inner {
    live: Assignment,
    target: Assignment,
    calls: CallCounts,
    executed: Vec<Vec<Move>>,
    next_execute: Option<Result<ExecuteResponse, InventoryError>>,
}

/// In-memory inventory backend
///
/// Validates with [`check_moves`] against its live layout and applies
/// confirmed batches atomically. The proposal is always the configured
/// target over the live layout.
#[derive(Debug)]
pub struct MemoryInventory {
    inner: Mutex<Inner>,
}

impl MemoryInventory {
    pub fn new(live: Assignment, target: Assignment) -> Self {
        Self {
            inner: Mutex::new(Inner {
                live,
                target,
                calls: CallCounts::default(),
                executed: Vec::new(),
                next_execute: None,
            }),
        }
    }

    /// Change a live slot behind the session's back
    pub fn set_live(&self, slot: &str, wine: Option<u64>) {
        self.inner.lock().live.set(SlotCode::new(slot), wine.map(WineId));
    }

    /// Replace the solver target returned by later proposals
    pub fn set_target(&self, target: Assignment) {
        self.inner.lock().target = target;
    }

    /// Answer the next execute call with `result` instead of running it
    pub fn script_next_execute(&self, result: Result<ExecuteResponse, InventoryError>) {
        self.inner.lock().next_execute = Some(result);
    }

    pub fn live(&self) -> Assignment {
        self.inner.lock().live.clone()
    }

    pub fn calls(&self) -> CallCounts {
        self.inner.lock().calls
    }

    /// Batches applied so far, in order
    pub fn executed(&self) -> Vec<Vec<Move>> {
        self.inner.lock().executed.clone()
    }
}

#[async_trait]
impl InventoryService for MemoryInventory {
    async fn get_proposed_layout(&self) -> Result<ProposedLayout, InventoryError> {
        let mut inner = self.inner.lock();
        inner.calls.proposals += 1;
        Ok(proposal(inner.live.clone(), inner.target.clone()))
    }

    async fn fetch_current_layout(&self) -> Result<Assignment, InventoryError> {
        let mut inner = self.inner.lock();
        inner.calls.fetches += 1;
        Ok(inner.live.clone())
    }

    async fn validate_moves(&self, moves: &[Move]) -> Result<ValidationReport, InventoryError> {
        let mut inner = self.inner.lock();
        inner.calls.validations += 1;
        Ok(check_moves(moves, &inner.live))
    }

    async fn execute_moves(&self, moves: &[Move]) -> Result<ExecuteResponse, InventoryError> {
        let mut inner = self.inner.lock();
        inner.calls.executions += 1;
        if let Some(scripted) = inner.next_execute.take() {
            return scripted;
        }
        let report = check_moves(moves, &inner.live);
        if !report.valid {
            return Ok(ExecuteResponse::rejected(report));
        }
        inner.live.apply_moves(moves);
        inner.executed.push(moves.to_vec());
        Ok(ExecuteResponse::applied(moves.len()))
    }
}

/// Something a [`RecordingObserver`] saw
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observed {
    Plan { moves: usize },
    Target(Assignment),
    State(ReviewState, ReviewState),
}

/// Observer that keeps every notification
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<Observed>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<Observed> {
        self.events.lock().clone()
    }

    /// Recorded `(from, to)` state changes
    pub fn transitions(&self) -> Vec<(ReviewState, ReviewState)> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                Observed::State(from, to) => Some((*from, *to)),
                _ => None,
            })
            .collect()
    }
}

impl ReviewObserver for RecordingObserver {
    fn on_plan_changed(&self, plan: &Plan) {
        self.events.lock().push(Observed::Plan {
            moves: plan.moves.len(),
        });
    }

    fn on_override_changed(&self, target: &Assignment) {
        self.events.lock().push(Observed::Target(target.clone()));
    }

    fn on_state_changed(&self, from: ReviewState, to: ReviewState) {
        self.events.lock().push(Observed::State(from, to));
    }
}
