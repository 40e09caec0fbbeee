//! Shared matcher: lock-free reads, serialized writes.
//!
//! Readers load the current `CoreMatcher` once per call and match against
//! that version to the end, whatever a writer publishes meanwhile. A writer
//! takes the mutex, clones the current version (a root pointer and a few
//! persistent indexes), extends the clone by path copying and publishes it
//! with one atomic store. A failed add never reaches the store.

use std::hash::Hash;
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;

use super::core_matcher::{CoreMatcher, MatchBuffers};
use crate::{EventField, PatternField, QuaminaError};

pub struct ThreadSafeCoreMatcher<X> {
    current: ArcSwap<CoreMatcher<X>>,
    write_lock: Mutex<()>,
}

impl<X: Clone + Eq + Hash + Send + Sync> Default for ThreadSafeCoreMatcher<X> {
    fn default() -> Self {
        Self::new()
    }
}

impl<X: Clone + Eq + Hash + Send + Sync> ThreadSafeCoreMatcher<X> {
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(CoreMatcher::new()),
            write_lock: Mutex::new(()),
        }
    }

    /// Add a pattern and publish the result. Concurrent writers queue up.
    pub fn add_pattern(&self, id: X, fields: &[PatternField]) -> Result<(), QuaminaError> {
        let _guard = self.write_lock.lock();
        let mut next = (**self.current.load()).clone();
        next.add_pattern(id, fields)?;
        self.current.store(Arc::new(next));
        Ok(())
    }

    pub fn matches_for_fields(&self, fields: &[EventField]) -> Vec<X> {
        self.current.load().matches_for_fields(fields)
    }

    pub fn matches_for_fields_with(
        &self,
        fields: &[EventField],
        bufs: &mut MatchBuffers,
    ) -> Vec<X> {
        self.current.load().matches_for_fields_with(fields, bufs)
    }

    /// The current version, for several matches against one frozen view.
    pub fn snapshot(&self) -> Arc<CoreMatcher<X>> {
        self.current.load_full()
    }

    pub fn pattern_count(&self) -> usize {
        self.current.load().pattern_count()
    }
}
