//! Byte transition tables and automaton states.
//!
//! A `SmallTable` maps every byte value to an optional next state using a
//! run-length "ceiling" encoding: entry `i` covers bytes from `ceilings[i-1]`
//! (or 0) up to but excluding `ceilings[i]`.
//!
//! ```text
//! bytes 3..=4 -> S1, byte 0x34 -> S2
//! ceilings: [3,    5,  0x34, 0x35, 256 ]
//! steps:    [NONE, S1, NONE, S2,   NONE]
//! ```
//!
//! Tables are immutable once their state is published; builders and merges
//! synthesize new tables instead of editing old ones.

use super::arena::{StateId, TargetId};

/// One past the largest byte value. Every table's last ceiling.
pub const BYTE_CEILING: u16 = 256;

/// Pseudo-byte appended to every value during traversal. 0xF5 never occurs
/// in well-formed UTF-8.
pub const VALUE_TERMINATOR: u8 = 0xF5;

/// Tables with at most this many runs are scanned linearly.
const LINEAR_SCAN_MAX: usize = 8;

/// A compact byte-indexed transition table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SmallTable {
    ceilings: Vec<u16>,
    steps: Vec<StateId>,
}

impl Default for SmallTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SmallTable {
    /// A table with no transitions.
    pub fn new() -> Self {
        Self::with_default(StateId::NONE)
    }

    /// A table sending every byte to `default`.
    pub fn with_default(default: StateId) -> Self {
        Self {
            ceilings: vec![BYTE_CEILING],
            steps: vec![default],
        }
    }

    /// Build a table from a default step plus per-byte overrides.
    ///
    /// `indices` must be strictly increasing and the same length as `steps`.
    /// The result is the minimal run encoding.
    pub fn with_mappings(default: StateId, indices: &[u8], steps: &[StateId]) -> Self {
        debug_assert_eq!(indices.len(), steps.len());
        debug_assert!(indices.windows(2).all(|w| w[0] < w[1]));

        let mut table = Self {
            ceilings: Vec::with_capacity(indices.len() * 2 + 1),
            steps: Vec::with_capacity(indices.len() * 2 + 1),
        };
        let mut floor: u16 = 0;
        for (&index, &step) in indices.iter().zip(steps) {
            let index = u16::from(index);
            if index > floor {
                table.push_run(index, default);
            }
            table.push_run(index + 1, step);
            floor = index + 1;
        }
        if floor < BYTE_CEILING {
            table.push_run(BYTE_CEILING, default);
        }
        table
    }

    /// Compress a full 256-entry table.
    pub fn pack(unpacked: &[StateId; 256]) -> Self {
        let mut table = Self {
            ceilings: Vec::new(),
            steps: Vec::new(),
        };
        for (byte, &step) in unpacked.iter().enumerate() {
            table.push_run(byte as u16 + 1, step);
        }
        table
    }

    /// Expand into a full 256-entry table.
    pub fn unpack(&self) -> [StateId; 256] {
        let mut unpacked = [StateId::NONE; 256];
        for (lo, hi, step) in self.ranges() {
            for slot in &mut unpacked[usize::from(lo)..usize::from(hi)] {
                *slot = step;
            }
        }
        unpacked
    }

    /// Extend the table with a run ending at `ceiling`, coalescing with the
    /// previous run when it has the same step.
    fn push_run(&mut self, ceiling: u16, step: StateId) {
        match (self.ceilings.last_mut(), self.steps.last()) {
            (Some(last), Some(&prev)) if prev == step => *last = ceiling,
            _ => {
                self.ceilings.push(ceiling);
                self.steps.push(step);
            }
        }
    }

    /// The state reached on `byte`, if any.
    #[inline]
    pub fn step(&self, byte: u8) -> Option<StateId> {
        let b = u16::from(byte);
        let idx = if self.ceilings.len() <= LINEAR_SCAN_MAX {
            self.ceilings
                .iter()
                .position(|&c| b < c)
                .unwrap_or(self.ceilings.len() - 1)
        } else {
            self.ceilings.partition_point(|&c| c <= b)
        };
        let step = self.steps[idx];
        (!step.is_none()).then_some(step)
    }

    /// Iterate over `(lo, hi_exclusive, step)` runs.
    pub fn ranges(&self) -> impl Iterator<Item = (u16, u16, StateId)> + '_ {
        let floors = std::iter::once(0).chain(self.ceilings.iter().copied());
        floors
            .zip(self.ceilings.iter().copied())
            .zip(self.steps.iter().copied())
            .map(|((lo, hi), step)| (lo, hi, step))
    }

    /// Number of runs in the encoding.
    pub fn run_count(&self) -> usize {
        self.ceilings.len()
    }

    /// True if no byte has a transition.
    pub fn is_empty(&self) -> bool {
        self.steps.iter().all(|s| s.is_none())
    }

    /// Sweep two tables range by range, combining the steps each range maps to.
    ///
    /// `combine` sees every distinct pair of overlapping runs exactly once, in
    /// byte order.
    pub fn merge_with<F>(&self, other: &SmallTable, mut combine: F) -> SmallTable
    where
        F: FnMut(StateId, StateId) -> StateId,
    {
        let mut merged = SmallTable {
            ceilings: Vec::with_capacity(self.ceilings.len() + other.ceilings.len()),
            steps: Vec::with_capacity(self.ceilings.len() + other.ceilings.len()),
        };
        let (mut i, mut j) = (0, 0);
        while i < self.ceilings.len() && j < other.ceilings.len() {
            let (ci, cj) = (self.ceilings[i], other.ceilings[j]);
            let ceiling = ci.min(cj);
            let step = combine(self.steps[i], other.steps[j]);
            merged.push_run(ceiling, step);
            if ci == ceiling {
                i += 1;
            }
            if cj == ceiling {
                j += 1;
            }
        }
        merged
    }
}

/// A state in a byte automaton.
///
/// `field_transitions` lists the targets collected whenever traversal reaches
/// this state; literal builders only place them after a value-terminator step.
#[derive(Clone, Debug, Default)]
pub struct FaState {
    pub table: SmallTable,
    pub epsilons: Vec<StateId>,
    pub field_transitions: Vec<TargetId>,
}

impl FaState {
    pub fn with_table(table: SmallTable) -> Self {
        Self {
            table,
            ..Default::default()
        }
    }

    /// A pure accept state.
    pub fn accepting(target: TargetId) -> Self {
        Self {
            field_transitions: vec![target],
            ..Default::default()
        }
    }
}
