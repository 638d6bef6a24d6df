//! Ordered, human-followable move plans
//!
//! [`build_plan`] turns a [`LayoutDiff`] into numbered steps: swap pairs
//! first, then moves with no occupancy dependency, then dependent moves in
//! chain order. A plan is never patched; any change to the target produces a
//! new one.

use crate::diff::{diff, DiffStats, LayoutDiff, SlotDiff};
use crate::resolver::{blocker_of, resolve, Resolution};
use cellar_layout::{Assignment, Move, SlotCode};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Display, Formatter};

/// What a single step asks the user to do
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum StepKind {
    /// Exchange two bottles; both halves run together
    Swap {
        /// Half leaving the lower slot
        first: Move,
        /// Half leaving the higher slot
        second: Move,
    },
    /// Relocate one bottle
    Move {
        /// The relocation
        #[serde(rename = "move")]
        mv: Move,
        /// Blocked behind another pending move; batch-only
        dependent: bool,
    },
}

/// One numbered step of a guided walkthrough
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanStep {
    /// 1-based step number
    pub number: usize,
    /// The work to do
    #[serde(flatten)]
    pub kind: StepKind,
    /// Positions of this step's moves in [`Plan::moves`]
    pub move_indices: Vec<usize>,
}

impl PlanStep {
    /// Whether the step is a swap pair
    #[inline]
    #[must_use]
    pub fn is_swap(&self) -> bool {
        matches!(self.kind, StepKind::Swap { .. })
    }

    /// Moves of this step
    #[must_use]
    pub fn moves(&self) -> Vec<&Move> {
        match &self.kind {
            StepKind::Swap { first, second } => vec![first, second],
            StepKind::Move { mv, .. } => vec![mv],
        }
    }
}

impl Display for PlanStep {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.kind {
            StepKind::Swap { first, second } => write!(
                f,
                "Step {}: swap {} ↔ {} ({} ↔ {})",
                self.number, first.from, second.from, first.wine_id, second.wine_id
            ),
            StepKind::Move { mv, dependent } => {
                write!(f, "Step {}: move {mv}", self.number)?;
                if *dependent {
                    f.write_str(" [batch only]")?;
                }
                Ok(())
            }
        }
    }
}

/// Ordered move plan plus aggregate statistics
///
/// `moves` is the flattened step order and is what a batch apply submits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    /// Numbered steps
    pub steps: Vec<PlanStep>,
    /// All moves in step order
    pub moves: Vec<Move>,
    /// Classification counts from the diff
    pub stats: DiffStats,
    /// Slots whose data is inconsistent
    pub unplaceable: Vec<SlotDiff>,
    #[serde(skip)]
    resolution: Resolution,
}

impl Plan {
    /// Plan with nothing to do
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether there is nothing to move
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    /// Step by 1-based number
    #[must_use]
    pub fn step(&self, number: usize) -> Option<&PlanStep> {
        number.checked_sub(1).and_then(|i| self.steps.get(i))
    }

    /// Swap pairs and dependency flags over [`Plan::moves`]
    #[inline]
    #[must_use]
    pub fn resolution(&self) -> &Resolution {
        &self.resolution
    }

    /// Move positions not covered by `completed` steps
    #[must_use]
    pub fn pending_moves(&self, completed: &BTreeSet<usize>) -> BTreeSet<usize> {
        self.steps
            .iter()
            .filter(|s| !completed.contains(&s.number))
            .flat_map(|s| s.move_indices.iter().copied())
            .collect()
    }

    /// Whether step `number` can run on its own once `completed` are done
    ///
    /// Swap steps are always ready. A move step is ready when nothing still
    /// pending occupies its destination.
    #[must_use]
    pub fn is_step_ready(&self, number: usize, completed: &BTreeSet<usize>) -> bool {
        let Some(step) = self.step(number) else {
            return false;
        };
        if step.is_swap() {
            return true;
        }
        let pending = self.pending_moves(completed);
        let dependent = self.resolution.dependent_among(&self.moves, &pending);
        step.move_indices.iter().all(|i| !dependent.contains(i))
    }

    /// Moves that have to travel with step `number` in one batch
    ///
    /// Follows the chain of pending moves that must vacate each destination,
    /// stopping at an empty destination or when the chain closes on itself.
    /// Returned in submission order: the step's own moves first.
    #[must_use]
    pub fn batch_for_step(&self, number: usize, completed: &BTreeSet<usize>) -> Vec<usize> {
        let Some(step) = self.step(number) else {
            return Vec::new();
        };
        let pending = self.pending_moves(completed);
        let mut batch = step.move_indices.clone();
        let mut seen: BTreeSet<usize> = batch.iter().copied().collect();
        let mut cursor = batch.last().copied();
        while let Some(i) = cursor {
            cursor = blocker_of(&self.moves, &self.resolution.pairs, &pending, i)
                .filter(|j| seen.insert(*j));
            if let Some(j) = cursor {
                batch.push(j);
            }
        }
        batch
    }

    /// One-line summary for logs
    #[must_use]
    pub fn summary(&self) -> String {
        let swaps = self.steps.iter().filter(|s| s.is_swap()).count();
        let singles = self.steps.len() - swaps;
        let batch_only = self
            .steps
            .iter()
            .filter(|s| matches!(s.kind, StepKind::Move { dependent: true, .. }))
            .count();
        let mut out = format!(
            "{} steps: {swaps} swaps, {singles} moves ({batch_only} batch-only)",
            self.steps.len()
        );
        if !self.unplaceable.is_empty() {
            out.push_str(&format!(", {} unplaceable", self.unplaceable.len()));
        }
        out
    }
}

/// Build the ordered plan for `diff`
///
/// `resolution` must come from [`resolve`] over `diff.moves`. Ordering:
/// 1. swap pairs, keyed and sorted by their sorted slot pair
/// 2. moves with no dependency, by source slot
/// 3. dependent moves, each after the move that vacates its destination;
///    moves on cycles of three or more follow, by source slot
///
/// Identical inputs always give identical plans.
#[must_use]
pub fn build_plan(diff: &LayoutDiff, resolution: &Resolution) -> Plan {
    let moves = &diff.moves;

    let mut swap_keys: Vec<((&SlotCode, &SlotCode), usize, usize)> = resolution
        .pairs
        .iter()
        .filter(|(i, j)| i < j)
        .map(|(&i, &j)| {
            let (lo, hi) = if moves[i].from <= moves[j].from { (i, j) } else { (j, i) };
            ((&moves[lo].from, &moves[hi].from), lo, hi)
        })
        .collect();
    swap_keys.sort();

    let paired: BTreeSet<usize> = resolution.pairs.keys().copied().collect();
    let mut free: Vec<usize> = (0..moves.len())
        .filter(|i| !paired.contains(i) && !resolution.is_dependent(*i))
        .collect();
    free.sort_by(|a, b| moves[*a].from.cmp(&moves[*b].from));

    let chained = chain_order(moves, resolution);

    let mut ordered: Vec<Move> = Vec::with_capacity(moves.len());
    let mut groups: Vec<(usize, usize)> = Vec::new();
    for (_, lo, hi) in &swap_keys {
        groups.push((ordered.len(), 2));
        ordered.push(moves[*lo].clone());
        ordered.push(moves[*hi].clone());
    }
    for i in free.into_iter().chain(chained) {
        groups.push((ordered.len(), 1));
        ordered.push(moves[i].clone());
    }

    let own = resolve(&ordered);
    let steps = groups
        .into_iter()
        .enumerate()
        .map(|(n, (start, len))| {
            let kind = if len == 2 {
                StepKind::Swap {
                    first: ordered[start].clone(),
                    second: ordered[start + 1].clone(),
                }
            } else {
                StepKind::Move {
                    mv: ordered[start].clone(),
                    dependent: own.is_dependent(start),
                }
            };
            PlanStep {
                number: n + 1,
                kind,
                move_indices: (start..start + len).collect(),
            }
        })
        .collect();

    Plan {
        steps,
        moves: ordered,
        stats: diff.stats,
        unplaceable: diff.unplaceable().cloned().collect(),
        resolution: own,
    }
}

/// Dependent moves in execution order
///
/// Kahn's algorithm over "blocker runs first" edges with the source slot as
/// tie-break. Moves on long cycles, and anything queued behind them, never
/// become ready and are appended by source slot.
fn chain_order(moves: &[Move], resolution: &Resolution) -> Vec<usize> {
    let dependent = &resolution.dependent;
    let all: BTreeSet<usize> = (0..moves.len()).collect();

    let mut waiting_on: BTreeMap<usize, usize> = BTreeMap::new();
    let mut unblocks: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for &i in dependent {
        if let Some(j) = blocker_of(moves, &resolution.pairs, &all, i) {
            if dependent.contains(&j) {
                waiting_on.insert(i, j);
                unblocks.entry(j).or_default().push(i);
            }
        }
    }

    let mut ready: BTreeSet<(&SlotCode, usize)> = dependent
        .iter()
        .filter(|i| !waiting_on.contains_key(*i))
        .map(|&i| (&moves[i].from, i))
        .collect();
    let mut order = Vec::with_capacity(dependent.len());
    while let Some(next) = ready.pop_first() {
        let i = next.1;
        order.push(i);
        for &k in unblocks.get(&i).into_iter().flatten() {
            waiting_on.remove(&k);
            ready.insert((&moves[k].from, k));
        }
    }

    let emitted: BTreeSet<usize> = order.iter().copied().collect();
    let mut stuck: Vec<usize> = dependent
        .iter()
        .copied()
        .filter(|i| !emitted.contains(i))
        .collect();
    stuck.sort_by(|a, b| moves[*a].from.cmp(&moves[*b].from));
    order.extend(stuck);
    order
}

/// Diff two assignments and build the plan in one call
#[must_use]
pub fn plan_layouts(current: &Assignment, target: &Assignment) -> (LayoutDiff, Plan) {
    let layout_diff = diff(current, target);
    let resolution = resolve(&layout_diff.moves);
    let plan = build_plan(&layout_diff, &resolution);
    (layout_diff, plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cellar_layout::WineId;
    use pretty_assertions::assert_eq;

    fn layout(entries: &[(&str, Option<u64>)]) -> Assignment {
        entries
            .iter()
            .map(|(code, wine)| (SlotCode::new(*code), wine.map(WineId)))
            .collect()
    }

    fn froms(plan: &Plan) -> Vec<&str> {
        plan.moves.iter().map(|m| m.from.as_str()).collect()
    }

    #[test]
    fn swap_renders_once() {
        let current = layout(&[("R1C1", Some(10)), ("R1C2", Some(20))]);
        let target = layout(&[("R1C1", Some(20)), ("R1C2", Some(10))]);
        let (_, plan) = plan_layouts(&current, &target);

        assert_eq!(plan.steps.len(), 1);
        assert!(plan.steps[0].is_swap());
        assert_eq!(plan.moves.len(), 2);
        assert_eq!(
            plan.steps[0].to_string(),
            "Step 1: swap R1C1 ↔ R1C2 (10 ↔ 20)"
        );
    }

    #[test]
    fn single_direct_move() {
        let current = layout(&[("A", Some(1)), ("B", None)]);
        let target = layout(&[("A", None), ("B", Some(1))]);
        let (_, plan) = plan_layouts(&current, &target);

        assert_eq!(plan.steps.len(), 1);
        match &plan.steps[0].kind {
            StepKind::Move { mv, dependent } => {
                assert_eq!(mv.wine_id, WineId(1));
                assert_eq!(mv.from.as_str(), "A");
                assert_eq!(mv.to.as_str(), "B");
                assert!(!dependent);
            }
            other => panic!("expected move step, got {other:?}"),
        }
    }

    #[test]
    fn swaps_first_then_free_then_chain() {
        // swap F1↔F2, free move R3C1→R3C2, chain R1C1→R1C2→R1C3
        let current = layout(&[
            ("F1", Some(1)),
            ("F2", Some(2)),
            ("R1C1", Some(3)),
            ("R1C2", Some(4)),
            ("R1C3", None),
            ("R3C1", Some(5)),
            ("R3C2", None),
        ]);
        let target = layout(&[
            ("F1", Some(2)),
            ("F2", Some(1)),
            ("R1C1", None),
            ("R1C2", Some(3)),
            ("R1C3", Some(4)),
            ("R3C1", None),
            ("R3C2", Some(5)),
        ]);
        let (_, plan) = plan_layouts(&current, &target);

        assert_eq!(froms(&plan), ["F1", "F2", "R1C2", "R3C1", "R1C1"]);
        assert_eq!(plan.steps.len(), 4);
        assert!(plan.steps[0].is_swap());
        assert!(matches!(plan.steps[3].kind, StepKind::Move { dependent: true, .. }));
        assert_eq!(plan.summary(), "4 steps: 1 swaps, 3 moves (1 batch-only)");
    }

    #[test]
    fn chain_runs_blocker_first() {
        // A→B→C→D, D empty: D must fill first
        let current = layout(&[("A", Some(1)), ("B", Some(2)), ("C", Some(3)), ("D", None)]);
        let target = layout(&[("A", None), ("B", Some(1)), ("C", Some(2)), ("D", Some(3))]);
        let (_, plan) = plan_layouts(&current, &target);
        assert_eq!(froms(&plan), ["C", "B", "A"]);
    }

    #[test]
    fn readiness_tracks_completed_steps() {
        let current = layout(&[("A", Some(1)), ("B", Some(2)), ("C", None)]);
        let target = layout(&[("A", None), ("B", Some(1)), ("C", Some(2))]);
        let (_, plan) = plan_layouts(&current, &target);

        // Step 1: B→C, step 2: A→B
        assert!(plan.is_step_ready(1, &BTreeSet::new()));
        assert!(!plan.is_step_ready(2, &BTreeSet::new()));
        assert!(plan.is_step_ready(2, &BTreeSet::from([1])));
        assert!(!plan.is_step_ready(9, &BTreeSet::new()));
    }

    #[test]
    fn batch_for_step_follows_chain_and_cycles() {
        let current = layout(&[("A", Some(1)), ("B", Some(2)), ("C", Some(3))]);
        let target = layout(&[("A", Some(3)), ("B", Some(1)), ("C", Some(2))]);
        let (layout_diff, plan) = plan_layouts(&current, &target);

        assert_eq!(layout_diff.stats.swap_pairs, 0);
        assert_eq!(plan.resolution().long_cycles.len(), 1);
        let batch = plan.batch_for_step(1, &BTreeSet::new());
        assert_eq!(batch.len(), 3);
        assert_eq!(batch[0], 0);
    }

    #[test]
    fn rebuild_is_identical() {
        let current = layout(&[("A", Some(1)), ("B", Some(2)), ("C", Some(3)), ("D", None)]);
        let target = layout(&[("A", Some(2)), ("B", Some(1)), ("C", None), ("D", Some(3))]);
        let (_, first) = plan_layouts(&current, &target);
        let (_, second) = plan_layouts(&current, &target);
        assert_eq!(first, second);
    }

    #[test]
    fn unplaceable_slots_are_carried() {
        let current = layout(&[("A", None)]);
        let target = layout(&[("A", Some(9))]);
        let (_, plan) = plan_layouts(&current, &target);
        assert!(plan.is_empty());
        assert_eq!(plan.unplaceable.len(), 1);
        assert!(plan.summary().ends_with("1 unplaceable"));
    }
}
