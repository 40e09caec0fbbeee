//! Automaton-based matching engine.
//!
//! - `small_table`: byte transition tables and automaton states
//! - `arena`: persistent, index-addressed state storage
//! - `fa_builders`: one automaton fragment per value shape, plus `merge_fas`
//! - `nfa`: DFA and NFA traversal
//! - `value_matcher`: singleton/automaton matching of one path's values
//! - `field_matcher`: the tree patterns are threaded through
//! - `core_matcher`: pattern insertion and event traversal
//! - `thread_safe`: atomic publication for concurrent readers

pub mod arena;
pub mod core_matcher;
pub mod fa_builders;
pub mod field_matcher;
pub mod nfa;
pub mod small_table;
pub mod sparse_set;
pub mod thread_safe;
pub mod value_matcher;

pub use arena::{StateArena, StateId, TargetId};
pub use core_matcher::{CoreMatcher, MatchBuffers};
pub use fa_builders::{
    make_anything_but_fa, make_monocase_fa, make_prefix_fa, make_shellstyle_fa, make_string_fa,
    make_suffix_fa, make_wildcard_fa, merge_fas,
};
pub use field_matcher::FieldMatcher;
pub use nfa::{traverse_dfa, traverse_nfa, NfaBuffers};
pub use small_table::{FaState, SmallTable, BYTE_CEILING, VALUE_TERMINATOR};
pub use thread_safe::ThreadSafeCoreMatcher;
pub use value_matcher::{TargetSlot, ValueMatcher};
