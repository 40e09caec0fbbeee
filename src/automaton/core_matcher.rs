//! The matcher proper: pattern insertion and event traversal over one
//! immutable version of the field-matcher tree.
//!
//! `CoreMatcher` is cheap to clone (a root pointer plus persistent
//! indexes). `add_pattern` builds a new root by path copying and only swaps
//! it in once the whole pattern compiled, so a failed add leaves the matcher
//! exactly as it was.

use std::cell::RefCell;
use std::hash::Hash;
use std::sync::Arc;

use rustc_hash::FxHashSet;
use tracing::debug;

use super::field_matcher::FieldMatcher;
use super::nfa::NfaBuffers;
use crate::event::trails_compatible;
use crate::pattern::validate_pattern;
use crate::{ArrayPos, EventField, PatternField, QuaminaError};

/// Scratch space for `matches_for_fields_with`.
#[derive(Debug, Default)]
pub struct MatchBuffers {
    nfa: NfaBuffers,
    trail: Vec<ArrayPos>,
}

impl MatchBuffers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Largest automaton, in states, these buffers are sized for.
    pub fn state_capacity(&self) -> usize {
        self.nfa.state_capacity()
    }
}

thread_local! {
    // Grown once to the largest automaton this thread has walked, then reused
    static MATCH_BUFFERS: RefCell<MatchBuffers> = RefCell::new(MatchBuffers::new());
}

/// Deduplicating match accumulator; keeps first-seen order.
struct MatchSet<X> {
    seen: FxHashSet<X>,
    ordered: Vec<X>,
}

impl<X: Clone + Eq + Hash> MatchSet<X> {
    fn new() -> Self {
        Self {
            seen: FxHashSet::default(),
            ordered: Vec::new(),
        }
    }

    fn extend(&mut self, ids: &[X]) {
        for id in ids {
            if self.seen.insert(id.clone()) {
                self.ordered.push(id.clone());
            }
        }
    }

    fn into_vec(self) -> Vec<X> {
        self.ordered
    }
}

#[derive(Clone)]
pub struct CoreMatcher<X> {
    root: Arc<FieldMatcher<X>>,
    paths: im::OrdSet<String>,
    pattern_count: usize,
}

impl<X: Clone + Eq + Hash> Default for CoreMatcher<X> {
    fn default() -> Self {
        Self::new()
    }
}

impl<X: Clone + Eq + Hash> CoreMatcher<X> {
    pub fn new() -> Self {
        Self {
            root: Arc::new(FieldMatcher::new()),
            paths: im::OrdSet::new(),
            pattern_count: 0,
        }
    }

    /// Add a pattern under `id`. On error nothing changes.
    pub fn add_pattern(&mut self, id: X, fields: &[PatternField]) -> Result<(), QuaminaError> {
        let sorted = validate_pattern(fields).map_err(|e| {
            debug!(error = %e, "rejected pattern");
            e
        })?;
        let root = self.root.add_pattern_fields(&sorted, &id).map_err(|e| {
            debug!(error = %e, "pattern failed to compile");
            e
        })?;

        let mut paths = self.paths.clone();
        for field in &sorted {
            paths.insert(field.path.clone());
        }
        self.root = Arc::new(root);
        self.paths = paths;
        self.pattern_count += 1;
        debug!(
            fields = sorted.len(),
            patterns = self.pattern_count,
            "added pattern"
        );
        Ok(())
    }

    /// Ids of every pattern `fields` satisfies, each reported once.
    ///
    /// `fields` must be sorted by path. Traversal scratch space is kept per
    /// thread, so repeated calls do not reallocate it.
    pub fn matches_for_fields(&self, fields: &[EventField]) -> Vec<X> {
        MATCH_BUFFERS.with(|cell| match cell.try_borrow_mut() {
            Ok(mut bufs) => self.matches_for_fields_with(fields, &mut bufs),
            // re-entered from inside a match on this thread
            Err(_) => self.matches_for_fields_with(fields, &mut MatchBuffers::new()),
        })
    }

    /// As `matches_for_fields`, reusing caller-owned buffers.
    pub fn matches_for_fields_with(
        &self,
        fields: &[EventField],
        bufs: &mut MatchBuffers,
    ) -> Vec<X> {
        debug_assert!(
            fields.windows(2).all(|w| w[0].path <= w[1].path),
            "event fields must be sorted by path"
        );
        bufs.trail.clear();
        let mut traversal = Traversal {
            fields,
            bufs,
            matches: MatchSet::new(),
        };
        if fields.is_empty() {
            traversal.exists_false_tail(&self.root);
        } else {
            for index in 0..fields.len() {
                traversal.try_to_match(index, &self.root);
            }
        }
        traversal.matches.into_vec()
    }

    /// Number of patterns added successfully.
    pub fn pattern_count(&self) -> usize {
        self.pattern_count
    }

    pub fn is_empty(&self) -> bool {
        self.pattern_count == 0
    }

    /// True if some pattern constrains `path`.
    pub fn uses_path(&self, path: &str) -> bool {
        self.paths.contains(path)
    }

    /// Every path used by any pattern, in order.
    pub fn paths(&self) -> impl Iterator<Item = &String> {
        self.paths.iter()
    }

    pub fn root(&self) -> &Arc<FieldMatcher<X>> {
        &self.root
    }
}

/// One event's walk through the field-matcher tree.
///
/// `bufs.trail` holds the array positions of every field consumed on the
/// current recursion path; a field may only be consumed next if its own
/// trail agrees with all of them.
struct Traversal<'a, X> {
    fields: &'a [EventField],
    bufs: &'a mut MatchBuffers,
    matches: MatchSet<X>,
}

impl<X: Clone + Eq + Hash> Traversal<'_, X> {
    fn is_present(&self, path: &str) -> bool {
        self.fields
            .binary_search_by(|f| f.path.as_str().cmp(path))
            .is_ok()
    }

    /// Try to consume `fields[index]` at `state`.
    fn try_to_match(&mut self, index: usize, state: &FieldMatcher<X>) {
        let fields = self.fields;
        let field = &fields[index];

        if let Some(next) = state.exists_true(&field.path) {
            self.consume(index, next);
        }

        // absent fields consume nothing, so fields[index] is still up next
        for (path, next) in state.exists_false_entries() {
            if !self.is_present(path) {
                self.matches.extend(next.matches());
                self.try_to_match(index, next);
            }
        }

        if let Some(vm) = state.value_matcher(&field.path) {
            let targets = vm.transition_on(&field.value, &mut self.bufs.nfa);
            for next in &targets {
                self.consume(index, next);
            }
        }
    }

    /// `fields[index]` led to `next`: record and continue with later fields.
    fn consume(&mut self, index: usize, next: &FieldMatcher<X>) {
        self.matches.extend(next.matches());

        let fields = self.fields;
        let mark = self.bufs.trail.len();
        self.bufs.trail.extend_from_slice(&fields[index].array_trail);
        for later in index + 1..fields.len() {
            if trails_compatible(&self.bufs.trail, &fields[later].array_trail) {
                self.try_to_match(later, next);
            }
        }
        self.exists_false_tail(next);
        self.bufs.trail.truncate(mark);
    }

    /// `exists:false` chains that need no further fields.
    fn exists_false_tail(&mut self, state: &FieldMatcher<X>) {
        for (path, next) in state.exists_false_entries() {
            if !self.is_present(path) {
                self.matches.extend(next.matches());
                self.exists_false_tail(next);
            }
        }
    }
}
