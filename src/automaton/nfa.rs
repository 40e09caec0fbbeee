//! Automaton traversal.
//!
//! - `traverse_dfa`: single live state, used while no state has epsilons
//! - `traverse_nfa`: live state set with epsilon closures, deduplicated by
//!   state id at every byte step
//!
//! Both walk the value's bytes followed by `VALUE_TERMINATOR` and collect the
//! field transitions of every state they reach, including the start state.

use std::iter;

use super::arena::{StateArena, StateId, TargetId};
use super::sparse_set::SparseSet;
use super::small_table::VALUE_TERMINATOR;

/// Reusable scratch space for traversal. Results land in `targets`.
#[derive(Debug, Default)]
pub struct NfaBuffers {
    current: SparseSet,
    next: SparseSet,
    stack: Vec<StateId>,
    seen_targets: SparseSet,
    pub targets: Vec<TargetId>,
}

impl NfaBuffers {
    pub fn new() -> Self {
        Self::default()
    }

    /// States the live-state sets can hold without growing.
    pub fn state_capacity(&self) -> usize {
        self.current.capacity()
    }

    fn prepare(&mut self, state_count: usize, target_count: usize) {
        self.current.ensure_capacity(state_count);
        self.next.ensure_capacity(state_count);
        self.seen_targets.ensure_capacity(target_count);
        self.stack.clear();
        self.targets.clear();
    }
}

#[inline]
fn bytes_with_terminator(val: &[u8]) -> impl Iterator<Item = u8> + '_ {
    val.iter().copied().chain(iter::once(VALUE_TERMINATOR))
}

/// Walk an epsilon-free automaton. Replaces `bufs.targets`.
pub fn traverse_dfa(arena: &StateArena, start: StateId, val: &[u8], bufs: &mut NfaBuffers) {
    bufs.targets.clear();
    let mut state = start;
    push_unique(&mut bufs.targets, &arena[state].field_transitions);
    for byte in bytes_with_terminator(val) {
        match arena[state].table.step(byte) {
            Some(next) => {
                state = next;
                push_unique(&mut bufs.targets, &arena[state].field_transitions);
            }
            None => break,
        }
    }
}

fn push_unique(out: &mut Vec<TargetId>, found: &[TargetId]) {
    for &t in found {
        if !out.contains(&t) {
            out.push(t);
        }
    }
}

/// Walk an automaton that may contain epsilons and cycles. Replaces
/// `bufs.targets`.
///
/// `target_count` bounds the `TargetId`s the automaton can yield.
pub fn traverse_nfa(
    arena: &StateArena,
    start: StateId,
    val: &[u8],
    target_count: usize,
    bufs: &mut NfaBuffers,
) {
    bufs.prepare(arena.len(), target_count);

    add_closure(arena, start, &mut bufs.current, &mut bufs.stack);
    collect_targets(arena, &bufs.current, &mut bufs.seen_targets, &mut bufs.targets);

    for byte in bytes_with_terminator(val) {
        bufs.next.clear();
        for i in 0..bufs.current.len() {
            let state = StateId::new(bufs.current.get(i) as u32);
            if let Some(next) = arena[state].table.step(byte) {
                add_closure(arena, next, &mut bufs.next, &mut bufs.stack);
            }
        }
        std::mem::swap(&mut bufs.current, &mut bufs.next);
        if bufs.current.is_empty() {
            break;
        }
        collect_targets(arena, &bufs.current, &mut bufs.seen_targets, &mut bufs.targets);
    }
}

/// Insert `state` and everything reachable from it by epsilons.
fn add_closure(arena: &StateArena, state: StateId, set: &mut SparseSet, stack: &mut Vec<StateId>) {
    if !set.insert(state.index()) {
        return;
    }
    stack.push(state);
    while let Some(s) = stack.pop() {
        for &eps in &arena[s].epsilons {
            if set.insert(eps.index()) {
                stack.push(eps);
            }
        }
    }
}

fn collect_targets(
    arena: &StateArena,
    states: &SparseSet,
    seen: &mut SparseSet,
    out: &mut Vec<TargetId>,
) {
    for s in states.iter() {
        for &t in &arena[StateId::new(s as u32)].field_transitions {
            if seen.insert(t.index()) {
                out.push(t);
            }
        }
    }
}
