//! Index-addressed state storage for cyclic automata.
//!
//! `StateId` is a plain index, so states can refer to each other in cycles
//! (`*`, `+`, glob spinners) without ownership problems. The arena is a
//! persistent vector: cloning it is O(1) and appending to a clone never
//! disturbs states visible through the original, which is what lets a
//! published snapshot keep matching while a writer extends a copy.
//!
//! ```text
//! loop_state <-> body -> exit
//!      |
//!   epsilon
//! ```

use std::ops::Index;
use std::sync::Arc;

use super::small_table::FaState;

/// Handle to a state inside one `StateArena`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct StateId(u32);

impl StateId {
    /// "No state": the implicit failure step.
    pub const NONE: StateId = StateId(u32::MAX);

    #[inline]
    pub fn new(index: u32) -> Self {
        StateId(index)
    }

    #[inline]
    pub fn is_none(self) -> bool {
        self.0 == u32::MAX
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Handle to a downstream field matcher owned by a value matcher.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct TargetId(pub(crate) u32);

impl TargetId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Append-only, structurally shared storage for automaton states.
#[derive(Clone, Default)]
pub struct StateArena {
    states: im::Vector<Arc<FaState>>,
}

impl std::fmt::Debug for StateArena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateArena")
            .field("len", &self.states.len())
            .finish()
    }
}

impl StateArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a finished state.
    pub fn alloc(&mut self, state: FaState) -> StateId {
        let id = self.next_id();
        self.states.push_back(Arc::new(state));
        id
    }

    /// Add an empty placeholder, to be filled with `set` once the states it
    /// must point at exist. Used for cycles and for memoized merges.
    pub fn reserve(&mut self) -> StateId {
        self.alloc(FaState::default())
    }

    /// Replace a state. Only valid for states created while building the
    /// current, not yet published, version.
    pub fn set(&mut self, id: StateId, state: FaState) {
        debug_assert!(id.index() < self.states.len(), "set on unallocated {id:?}");
        self.states.set(id.index(), Arc::new(state));
    }

    /// Shared handle to a state, detached from the arena borrow.
    pub fn state(&self, id: StateId) -> Arc<FaState> {
        Arc::clone(&self.states[id.index()])
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    fn next_id(&self) -> StateId {
        debug_assert!(self.states.len() < u32::MAX as usize);
        StateId(self.states.len() as u32)
    }
}

impl Index<StateId> for StateArena {
    type Output = FaState;

    #[inline]
    fn index(&self, id: StateId) -> &FaState {
        &self.states[id.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automaton::small_table::{SmallTable, VALUE_TERMINATOR};

    #[test]
    fn test_alloc_sequential_ids() {
        let mut arena = StateArena::new();
        let a = arena.alloc(FaState::default());
        let b = arena.alloc(FaState::default());
        assert_eq!(a.index(), 0);
        assert_eq!(b.index(), 1);
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn test_reserve_then_set_builds_cycle() {
        let mut arena = StateArena::new();
        let accept = arena.alloc(FaState::accepting(TargetId(0)));
        let spin = arena.reserve();
        let mut unpacked = [spin; 256];
        unpacked[VALUE_TERMINATOR as usize] = accept;
        arena.set(spin, FaState::with_table(SmallTable::pack(&unpacked)));

        assert_eq!(arena[spin].table.step(b'x'), Some(spin));
        assert_eq!(arena[spin].table.step(VALUE_TERMINATOR), Some(accept));
    }

    #[test]
    fn test_clone_is_isolated() {
        let mut arena = StateArena::new();
        arena.alloc(FaState::default());
        let snapshot = arena.clone();
        arena.alloc(FaState::accepting(TargetId(3)));
        assert_eq!(snapshot.len(), 1);
        assert_eq!(arena.len(), 2);
        assert_eq!(arena[StateId::new(1)].field_transitions, vec![TargetId(3)]);
    }
}
