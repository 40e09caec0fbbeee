//! Per-path value matching.
//!
//! A value matcher starts `Empty`, becomes a `Singleton` for the first exact
//! value, and is promoted to an `Automaton` the moment a second distinct
//! shape arrives. It never goes back.

use std::hash::Hash;
use std::sync::Arc;

use tracing::debug;

use super::arena::{StateArena, StateId, TargetId};
use super::fa_builders::{
    make_anything_but_fa, make_monocase_fa, make_prefix_fa, make_shellstyle_fa, make_string_fa,
    make_suffix_fa, make_wildcard_fa, merge_fas,
};
use super::field_matcher::FieldMatcher;
use super::nfa::{traverse_dfa, traverse_nfa, NfaBuffers};
use crate::regexp::{make_regexp_fa, parse_regexp};
use crate::{QuaminaError, ValueShape};

/// Where `add_transition` put the field matcher for a shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetSlot {
    Singleton,
    Automaton(TargetId),
}

#[derive(Clone)]
pub enum ValueMatcher<X> {
    Empty,
    Singleton {
        value: Vec<u8>,
        target: Arc<FieldMatcher<X>>,
    },
    Automaton(AutomatonMatcher<X>),
}

impl<X> Default for ValueMatcher<X> {
    fn default() -> Self {
        ValueMatcher::Empty
    }
}

/// A merged automaton plus the field matchers its accept states lead to.
///
/// `exact` remembers the target of every exact value already merged in, so
/// registering one again reuses it instead of growing the automaton.
#[derive(Clone)]
pub struct AutomatonMatcher<X> {
    arena: StateArena,
    start: StateId,
    targets: im::Vector<Arc<FieldMatcher<X>>>,
    exact: im::HashMap<Vec<u8>, TargetId>,
    is_nondeterministic: bool,
}

impl<X: Clone + Eq + Hash> AutomatonMatcher<X> {
    fn new() -> Self {
        Self {
            arena: StateArena::new(),
            start: StateId::NONE,
            targets: im::Vector::new(),
            exact: im::HashMap::new(),
            is_nondeterministic: false,
        }
    }

    fn from_singleton(value: &[u8], target: Arc<FieldMatcher<X>>) -> Self {
        let mut automaton = Self::new();
        let t = automaton.push_target(target);
        automaton.start = make_string_fa(&mut automaton.arena, value, t);
        automaton.exact.insert(value.to_vec(), t);
        automaton
    }

    fn push_target(&mut self, target: Arc<FieldMatcher<X>>) -> TargetId {
        let id = TargetId(self.targets.len() as u32);
        self.targets.push_back(target);
        id
    }

    fn add_shape(&mut self, shape: &ValueShape) -> Result<TargetId, QuaminaError> {
        let exact = shape.exact_bytes();
        if let Some(&known) = exact.as_ref().and_then(|bytes| self.exact.get(&**bytes)) {
            return Ok(known);
        }
        let target = self.push_target(Arc::new(FieldMatcher::new()));
        let fragment = build_fragment(&mut self.arena, shape, target)?;
        if let Some(bytes) = exact {
            self.exact.insert(bytes.into_owned(), target);
        }
        self.start = if self.start.is_none() {
            fragment
        } else {
            merge_fas(&mut self.arena, self.start, fragment)
        };
        self.is_nondeterministic |= shape.is_nondeterministic();
        Ok(target)
    }

    pub fn state_count(&self) -> usize {
        self.arena.len()
    }

    pub fn is_nondeterministic(&self) -> bool {
        self.is_nondeterministic
    }
}

/// Build the automaton fragment for one shape, ending at `target`.
fn build_fragment(
    arena: &mut StateArena,
    shape: &ValueShape,
    target: TargetId,
) -> Result<StateId, QuaminaError> {
    let start = match shape {
        ValueShape::Literal(bytes) | ValueShape::Number(bytes) => {
            make_string_fa(arena, bytes, target)
        }
        ValueShape::Boolean(b) => {
            let text: &[u8] = if *b { b"true" } else { b"false" };
            make_string_fa(arena, text, target)
        }
        ValueShape::Prefix(prefix) => make_prefix_fa(arena, prefix, target),
        ValueShape::Suffix(suffix) => make_suffix_fa(arena, suffix, target),
        ValueShape::Shellstyle(glob) => make_shellstyle_fa(arena, glob, target)?,
        ValueShape::Wildcard(glob) => make_wildcard_fa(arena, glob, target)?,
        ValueShape::AnythingBut(excluded) => make_anything_but_fa(arena, excluded, target)?,
        ValueShape::EqualsIgnoreCase(value) => make_monocase_fa(arena, value, target),
        ValueShape::Regexp(re) => {
            let root = parse_regexp(re)?;
            make_regexp_fa(arena, &root, target)
        }
        ValueShape::Exists(_) => {
            return Err(QuaminaError::InvalidPattern(
                "exists is handled by the field matcher, not a value matcher".into(),
            ))
        }
    };
    Ok(start)
}

impl<X: Clone + Eq + Hash> ValueMatcher<X> {
    /// Register a shape and report where its downstream field matcher lives.
    pub fn add_transition(&mut self, shape: &ValueShape) -> Result<TargetSlot, QuaminaError> {
        if let Some(bytes) = shape.exact_bytes() {
            match self {
                ValueMatcher::Empty => {
                    *self = ValueMatcher::Singleton {
                        value: bytes.into_owned(),
                        target: Arc::new(FieldMatcher::new()),
                    };
                    return Ok(TargetSlot::Singleton);
                }
                ValueMatcher::Singleton { value, .. } if value.as_slice() == bytes.as_ref() => {
                    return Ok(TargetSlot::Singleton);
                }
                _ => {}
            }
        }

        let mut automaton = match std::mem::take(self) {
            ValueMatcher::Empty => AutomatonMatcher::new(),
            ValueMatcher::Singleton { value, target } => {
                debug!(
                    value_len = value.len(),
                    shape = shape.kind_name(),
                    "promoting singleton value matcher to automaton"
                );
                AutomatonMatcher::from_singleton(&value, target)
            }
            ValueMatcher::Automaton(automaton) => automaton,
        };
        let result = automaton.add_shape(shape);
        *self = ValueMatcher::Automaton(automaton);
        result.map(TargetSlot::Automaton)
    }

    /// The same slot expressed for the matcher's current state. A singleton
    /// slot becomes target 0 once the matcher has been promoted.
    pub fn canonical_slot(&self, slot: TargetSlot) -> TargetSlot {
        match (self, slot) {
            (ValueMatcher::Automaton(_), TargetSlot::Singleton) => {
                TargetSlot::Automaton(TargetId(0))
            }
            _ => slot,
        }
    }

    pub fn target(&self, slot: TargetSlot) -> Option<&Arc<FieldMatcher<X>>> {
        match (self, self.canonical_slot(slot)) {
            (ValueMatcher::Singleton { target, .. }, TargetSlot::Singleton) => Some(target),
            (ValueMatcher::Automaton(automaton), TargetSlot::Automaton(t)) => {
                automaton.targets.get(t.index())
            }
            _ => None,
        }
    }

    pub fn set_target(&mut self, slot: TargetSlot, field_matcher: Arc<FieldMatcher<X>>) {
        let slot = self.canonical_slot(slot);
        match (self, slot) {
            (ValueMatcher::Singleton { target, .. }, TargetSlot::Singleton) => {
                *target = field_matcher;
            }
            (ValueMatcher::Automaton(automaton), TargetSlot::Automaton(t)) => {
                debug_assert!(t.index() < automaton.targets.len());
                automaton.targets.set(t.index(), field_matcher);
            }
            (_, slot) => debug_assert!(false, "slot {slot:?} not present"),
        }
    }

    /// Field matchers reached by `value`.
    pub fn transition_on(&self, value: &[u8], bufs: &mut NfaBuffers) -> Vec<Arc<FieldMatcher<X>>> {
        match self {
            ValueMatcher::Empty => Vec::new(),
            ValueMatcher::Singleton { value: v, target } => {
                if v.as_slice() == value {
                    vec![Arc::clone(target)]
                } else {
                    Vec::new()
                }
            }
            ValueMatcher::Automaton(automaton) => {
                if automaton.start.is_none() {
                    return Vec::new();
                }
                if automaton.is_nondeterministic {
                    traverse_nfa(
                        &automaton.arena,
                        automaton.start,
                        value,
                        automaton.targets.len(),
                        bufs,
                    );
                } else {
                    traverse_dfa(&automaton.arena, automaton.start, value, bufs);
                }
                bufs.targets
                    .iter()
                    .filter_map(|t| automaton.targets.get(t.index()).cloned())
                    .collect()
            }
        }
    }

    pub fn as_automaton(&self) -> Option<&AutomatonMatcher<X>> {
        match self {
            ValueMatcher::Automaton(automaton) => Some(automaton),
            _ => None,
        }
    }

    pub fn is_singleton(&self) -> bool {
        matches!(self, ValueMatcher::Singleton { .. })
    }
}
