//! Swap and occupancy-dependency detection
//!
//! Works on a raw move list. Two moves that exchange the same pair of slots
//! form a swap pair and run atomically. A move whose destination is still the
//! source of another pending, non-partner move is *dependent*: it can only
//! run as part of a full batch. Cycles of three or more moves are not
//! decomposed; every move on them is dependent.

use cellar_layout::{Move, SlotCode};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Pair up moves that exchange two slots
///
/// `i` and `j` pair iff `moves[i].from == moves[j].to` and
/// `moves[i].to == moves[j].from`. The map is symmetric. Moves are scanned
/// in index order and each takes the lowest-indexed unpaired mirror; a
/// pairing is never reassigned.
#[must_use]
pub fn detect_swap_pairs(moves: &[Move]) -> BTreeMap<usize, usize> {
    let mut by_edge: HashMap<(&SlotCode, &SlotCode), Vec<usize>> = HashMap::new();
    for (i, mv) in moves.iter().enumerate() {
        by_edge.entry((&mv.from, &mv.to)).or_default().push(i);
    }

    let mut pairs = BTreeMap::new();
    for (i, mv) in moves.iter().enumerate() {
        if mv.from == mv.to || pairs.contains_key(&i) {
            continue;
        }
        let Some(candidates) = by_edge.get(&(&mv.to, &mv.from)) else {
            continue;
        };
        if let Some(&j) = candidates.iter().find(|&&j| j != i && !pairs.contains_key(&j)) {
            pairs.insert(i, j);
            pairs.insert(j, i);
        }
    }
    pairs
}

/// Moves among `pending` whose destination is the source of another pending
/// move that is not their swap partner
#[must_use]
pub fn dependent_moves(
    moves: &[Move],
    pairs: &BTreeMap<usize, usize>,
    pending: &BTreeSet<usize>,
) -> BTreeSet<usize> {
    let sources = sources_by_slot(moves, pending);
    pending
        .iter()
        .copied()
        .filter(|&i| {
            sources.get(&moves[i].to).is_some_and(|blockers| {
                blockers
                    .iter()
                    .any(|&j| j != i && pairs.get(&i) != Some(&j))
            })
        })
        .collect()
}

/// Index of the pending move that must vacate `moves[i].to` first
#[must_use]
pub fn blocker_of(
    moves: &[Move],
    pairs: &BTreeMap<usize, usize>,
    pending: &BTreeSet<usize>,
    i: usize,
) -> Option<usize> {
    pending
        .iter()
        .copied()
        .find(|&j| j != i && pairs.get(&i) != Some(&j) && moves[j].from == moves[i].to)
}

fn sources_by_slot<'a>(moves: &'a [Move], pending: &BTreeSet<usize>) -> HashMap<&'a SlotCode, Vec<usize>> {
    let mut sources: HashMap<&SlotCode, Vec<usize>> = HashMap::new();
    for &i in pending {
        sources.entry(&moves[i].from).or_default().push(i);
    }
    sources
}

/// Occupancy cycles of three or more moves
///
/// Each cycle is returned as its sorted move indices; cycles are sorted by
/// their first index.
#[must_use]
pub fn long_cycles(moves: &[Move], pairs: &BTreeMap<usize, usize>) -> Vec<Vec<usize>> {
    let all: BTreeSet<usize> = (0..moves.len()).collect();
    let next: Vec<Option<usize>> = (0..moves.len())
        .map(|i| blocker_of(moves, pairs, &all, i))
        .collect();

    // 0 = unvisited, 1 = on current walk, 2 = done
    let mut state = vec![0u8; moves.len()];
    let mut cycles = Vec::new();

    for start in 0..moves.len() {
        if state[start] != 0 {
            continue;
        }
        let mut walk = Vec::new();
        let mut cursor = Some(start);
        while let Some(node) = cursor {
            match state[node] {
                0 => {
                    state[node] = 1;
                    walk.push(node);
                    cursor = next[node];
                }
                1 => {
                    if let Some(pos) = walk.iter().position(|&n| n == node) {
                        let mut cycle = walk[pos..].to_vec();
                        if cycle.len() >= 3 {
                            cycle.sort_unstable();
                            cycles.push(cycle);
                        }
                    }
                    break;
                }
                _ => break,
            }
        }
        for node in walk {
            state[node] = 2;
        }
    }

    cycles.sort();
    cycles
}

/// Swap pairs, dependency flags and long cycles of one move list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Symmetric swap partner map
    pub pairs: BTreeMap<usize, usize>,
    /// Moves that must run inside a full batch
    pub dependent: BTreeSet<usize>,
    /// Occupancy cycles of length ≥ 3
    pub long_cycles: Vec<Vec<usize>>,
}

impl Resolution {
    /// Swap partner of move `i`
    #[inline]
    #[must_use]
    pub fn partner(&self, i: usize) -> Option<usize> {
        self.pairs.get(&i).copied()
    }

    /// Whether move `i` is batch-only when every move is pending
    #[inline]
    #[must_use]
    pub fn is_dependent(&self, i: usize) -> bool {
        self.dependent.contains(&i)
    }

    /// Whether move `i` sits on a cycle of three or more moves
    #[must_use]
    pub fn in_long_cycle(&self, i: usize) -> bool {
        self.long_cycles.iter().any(|c| c.contains(&i))
    }

    /// Number of distinct swap pairs
    #[inline]
    #[must_use]
    pub fn swap_pair_count(&self) -> usize {
        self.pairs.len() / 2
    }

    /// Dependent set once only `pending` moves remain
    #[must_use]
    pub fn dependent_among(&self, moves: &[Move], pending: &BTreeSet<usize>) -> BTreeSet<usize> {
        dependent_moves(moves, &self.pairs, pending)
    }
}

/// Detect swap pairs, dependent moves and long cycles in one pass
#[must_use]
pub fn resolve(moves: &[Move]) -> Resolution {
    let pairs = detect_swap_pairs(moves);
    let all: BTreeSet<usize> = (0..moves.len()).collect();
    let dependent = dependent_moves(moves, &pairs, &all);
    let long_cycles = long_cycles(moves, &pairs);
    Resolution {
        pairs,
        dependent,
        long_cycles,
    }
}
