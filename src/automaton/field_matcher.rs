//! Field matchers: the path-keyed tree patterns are threaded through.
//!
//! Each node maps a path to the value matcher for that path, and to the
//! continuations for `exists:true` / `exists:false` on that path. Pattern
//! ids sit on the nodes where a pattern completes.
//!
//! Every node is owned by exactly one parent slot, so adding a pattern
//! copies only the nodes on the paths it touches; all maps are persistent,
//! so those copies share everything else with the previous version.

use std::hash::Hash;
use std::sync::Arc;

use super::value_matcher::{TargetSlot, ValueMatcher};
use crate::{PatternField, QuaminaError, ValueShape};

#[derive(Clone)]
pub struct FieldMatcher<X> {
    transitions: im::HashMap<String, Arc<ValueMatcher<X>>>,
    exists_true: im::HashMap<String, Arc<FieldMatcher<X>>>,
    exists_false: im::HashMap<String, Arc<FieldMatcher<X>>>,
    matches: Vec<X>,
}

impl<X> Default for FieldMatcher<X> {
    fn default() -> Self {
        Self {
            transitions: im::HashMap::default(),
            exists_true: im::HashMap::default(),
            exists_false: im::HashMap::default(),
            matches: Vec::new(),
        }
    }
}

impl<X: Clone + Eq + Hash> FieldMatcher<X> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pattern ids completed at this node.
    pub fn matches(&self) -> &[X] {
        &self.matches
    }

    pub fn add_match(&mut self, id: &X) {
        if !self.matches.contains(id) {
            self.matches.push(id.clone());
        }
    }

    pub fn value_matcher(&self, path: &str) -> Option<&Arc<ValueMatcher<X>>> {
        self.transitions.get(path)
    }

    pub fn exists_true(&self, path: &str) -> Option<&Arc<FieldMatcher<X>>> {
        self.exists_true.get(path)
    }

    pub fn exists_false_entries(&self) -> impl Iterator<Item = (&String, &Arc<FieldMatcher<X>>)> {
        self.exists_false.iter()
    }

    pub fn has_exists_false(&self) -> bool {
        !self.exists_false.is_empty()
    }

    /// A copy of this node with `fields` (sorted by path) threaded below it
    /// and `id` attached wherever the pattern completes.
    ///
    /// `self` is left untouched, as is every node the pattern does not pass
    /// through.
    pub fn add_pattern_fields(
        &self,
        fields: &[&PatternField],
        id: &X,
    ) -> Result<FieldMatcher<X>, QuaminaError> {
        let mut next = self.clone();
        let Some((field, rest)) = fields.split_first() else {
            next.add_match(id);
            return Ok(next);
        };

        match field.shapes.as_slice() {
            [ValueShape::Exists(exists)] => {
                let map = if *exists {
                    &mut next.exists_true
                } else {
                    &mut next.exists_false
                };
                let child = map.get(&field.path).cloned().unwrap_or_default();
                let child = child.add_pattern_fields(rest, id)?;
                map.insert(field.path.clone(), Arc::new(child));
            }
            shapes => {
                let mut vm = next
                    .transitions
                    .get(&field.path)
                    .map(|vm| ValueMatcher::clone(vm))
                    .unwrap_or_default();

                let mut slots = Vec::with_capacity(shapes.len());
                for shape in shapes {
                    slots.push(vm.add_transition(shape)?);
                }
                // a promotion can rename slots handed out earlier
                let mut canonical: Vec<TargetSlot> = Vec::with_capacity(slots.len());
                for slot in slots {
                    let slot = vm.canonical_slot(slot);
                    if !canonical.contains(&slot) {
                        canonical.push(slot);
                    }
                }

                for slot in canonical {
                    let child = vm.target(slot).cloned().unwrap_or_default();
                    let child = child.add_pattern_fields(rest, id)?;
                    vm.set_target(slot, Arc::new(child));
                }
                next.transitions.insert(field.path.clone(), Arc::new(vm));
            }
        }
        Ok(next)
    }
}
