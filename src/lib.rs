//! quamina-automaton: the byte-automaton core of a quamina-style event matcher.
//!
//! Patterns are lists of `(path, [value shape])` constraints; events are
//! flattened, path-sorted `(path, value, array trail)` fields. The matcher
//! compiles every pattern into a tree of field matchers whose per-path value
//! automata are merged together, so matching an event costs roughly one
//! automaton walk per event field regardless of how many patterns exist.
//!
//! ```
//! use quamina_automaton::{CoreMatcher, EventField, PatternField, ValueShape};
//!
//! let mut matcher = CoreMatcher::new();
//! let shipped = PatternField::new("status", vec![ValueShape::literal("shipped")]);
//! matcher.add_pattern("shipped", &[shipped]).unwrap();
//! let big = PatternField::new("order.id", vec![ValueShape::Prefix(b"BIG-".to_vec())]);
//! matcher.add_pattern("big-order", &[big]).unwrap();
//!
//! let event = [
//!     EventField::new("order.id", "BIG-1234"),
//!     EventField::new("status", "shipped"),
//! ];
//! let mut found = matcher.matches_for_fields(&event);
//! found.sort();
//! assert_eq!(found, vec!["big-order", "shipped"]);
//! ```
//!
//! For shared use across threads, `ThreadSafeCoreMatcher` publishes each new
//! version atomically while readers keep matching lock-free.

pub mod automaton;
mod event;
mod pattern;
pub mod regexp;

use thiserror::Error;

pub use automaton::{CoreMatcher, MatchBuffers, ThreadSafeCoreMatcher};
pub use event::{ArrayPos, EventField};
pub use pattern::{PatternField, ValueShape};
pub use regexp::RegexpError;

/// Errors reported while adding a pattern. Matching never fails.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuaminaError {
    #[error("invalid pattern: {0}")]
    InvalidPattern(String),
    #[error("unknown value shape '{0}'")]
    UnknownShape(String),
    #[error("invalid regexp: {0}")]
    InvalidRegexp(#[from] RegexpError),
}
