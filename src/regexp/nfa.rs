//! Thompson construction of parsed regexps into a state arena.
//!
//! Fragments are built right to left: each builder receives the state to
//! continue with and returns its own entry state. Unbounded repetition uses
//! a hub state whose epsilons lead into the body (which loops back to the
//! hub) and on to the continuation, so `[a-z]*` costs a handful of states
//! rather than one copy per iteration.

use regex_syntax::hir::ClassUnicode;
use regex_syntax::utf8::Utf8Sequences;

use super::parser::{Atom, QuantifiedAtom, RegexpBranch, RegexpRoot};
use crate::automaton::arena::{StateArena, StateId, TargetId};
use crate::automaton::fa_builders::{merge_fas, terminator_state};
use crate::automaton::small_table::{FaState, SmallTable};

/// Automaton accepting exactly the values `root` matches in full.
pub fn make_regexp_fa(arena: &mut StateArena, root: &RegexpRoot, target: TargetId) -> StateId {
    let accept = arena.alloc(FaState::accepting(target));
    let end = terminator_state(arena, accept);
    build_root(arena, root, end)
}

fn build_root(arena: &mut StateArena, root: &RegexpRoot, next: StateId) -> StateId {
    match root.as_slice() {
        [] => next,
        [branch] => build_branch(arena, branch, next),
        branches => {
            let starts = branches
                .iter()
                .map(|branch| build_branch(arena, branch, next))
                .collect();
            arena.alloc(FaState {
                epsilons: starts,
                ..Default::default()
            })
        }
    }
}

fn build_branch(arena: &mut StateArena, branch: &RegexpBranch, next: StateId) -> StateId {
    branch
        .iter()
        .rev()
        .fold(next, |next, piece| build_quantified(arena, piece, next))
}

/// `min` required copies followed by either `max - min` optional copies or
/// a loop.
fn build_quantified(arena: &mut StateArena, piece: &QuantifiedAtom, next: StateId) -> StateId {
    let mut next = next;
    match piece.max {
        None => next = build_loop(arena, &piece.atom, next),
        Some(max) => {
            for _ in piece.min..max {
                next = build_optional(arena, &piece.atom, next);
            }
        }
    }
    for _ in 0..piece.min {
        next = build_atom(arena, &piece.atom, next);
    }
    next
}

fn build_optional(arena: &mut StateArena, atom: &Atom, next: StateId) -> StateId {
    let body = build_atom(arena, atom, next);
    arena.alloc(FaState {
        epsilons: vec![body, next],
        ..Default::default()
    })
}

fn build_loop(arena: &mut StateArena, atom: &Atom, next: StateId) -> StateId {
    let hub = arena.reserve();
    let body = build_atom(arena, atom, hub);
    arena.set(
        hub,
        FaState {
            epsilons: vec![body, next],
            ..Default::default()
        },
    );
    hub
}

fn build_atom(arena: &mut StateArena, atom: &Atom, next: StateId) -> StateId {
    match atom {
        Atom::Class(class) => build_class(arena, class, next),
        Atom::Group(root) => build_root(arena, root, next),
    }
}

/// One character from `class`, compiled to UTF-8 byte ranges.
///
/// Single-byte characters share one table; each multi-byte sequence becomes
/// a chain that is merged in. Every chain ends at `next`, which the merge
/// never needs to look inside, so `next` may still be a loop placeholder.
fn build_class(arena: &mut StateArena, class: &ClassUnicode, next: StateId) -> StateId {
    let mut ascii = [StateId::NONE; 256];
    let mut chains = Vec::new();
    for range in class.ranges() {
        for seq in Utf8Sequences::new(range.start(), range.end()) {
            match seq.as_slice() {
                [byte_range] => {
                    for b in byte_range.start..=byte_range.end {
                        ascii[b as usize] = next;
                    }
                }
                ranges => {
                    let chain = ranges.iter().rev().fold(next, |next, byte_range| {
                        let mut unpacked = [StateId::NONE; 256];
                        for b in byte_range.start..=byte_range.end {
                            unpacked[b as usize] = next;
                        }
                        arena.alloc(FaState::with_table(SmallTable::pack(&unpacked)))
                    });
                    chains.push(chain);
                }
            }
        }
    }
    let start = arena.alloc(FaState::with_table(SmallTable::pack(&ascii)));
    chains
        .into_iter()
        .fold(start, |merged, chain| merge_fas(arena, merged, chain))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automaton::nfa::{traverse_nfa, NfaBuffers};
    use crate::regexp::parse_regexp;

    fn matches(re: &str, value: &str) -> bool {
        let root = parse_regexp(re).unwrap();
        let mut arena = StateArena::new();
        let start = make_regexp_fa(&mut arena, &root, TargetId(0));
        let mut bufs = NfaBuffers::new();
        traverse_nfa(&arena, start, value.as_bytes(), 1, &mut bufs);
        !bufs.targets.is_empty()
    }

    #[test]
    fn test_regexp_literal_is_anchored() {
        assert!(matches("abc", "abc"));
        assert!(!matches("abc", "abcd"));
        assert!(!matches("abc", "xabc"));
        assert!(!matches("abc", "ab"));
    }

    #[test]
    fn test_regexp_alternation() {
        assert!(matches("cat|dog", "cat"));
        assert!(matches("cat|dog", "dog"));
        assert!(!matches("cat|dog", "cow"));
        assert!(matches("a(b|c)d", "acd"));
    }

    #[test]
    fn test_regexp_star_and_plus() {
        assert!(matches("a*", ""));
        assert!(matches("a*", "aaaa"));
        assert!(!matches("a+", ""));
        assert!(matches("a+b", "aaab"));
        assert!(matches("[a-z]*x", "helloworldx"));
        assert!(!matches("[a-z]*x", "hello"));
    }

    #[test]
    fn test_regexp_counted() {
        assert!(matches("a{2,3}", "aa"));
        assert!(matches("a{2,3}", "aaa"));
        assert!(!matches("a{2,3}", "a"));
        assert!(!matches("a{2,3}", "aaaa"));
        assert!(matches("(ab){2,}", "ababab"));
        assert!(!matches("(ab){2,}", "ab"));
        assert!(matches("x?y", "y"));
    }

    #[test]
    fn test_regexp_dot_multibyte() {
        assert!(matches(".", "é"));
        assert!(matches(".", "😀"));
        assert!(matches("a.c", "a中c"));
        assert!(!matches(".", "\n"));
        assert!(!matches(".", "ab"));
    }

    #[test]
    fn test_regexp_negated_class() {
        assert!(matches("[^abc]+", "xyz"));
        assert!(!matches("[^abc]+", "xaz"));
        assert!(matches("[^a]", "ü"));
    }

    #[test]
    fn test_regexp_nested_loops() {
        assert!(matches("(a*)*", ""));
        assert!(matches("(a*)*b", "aaab"));
        assert!(matches("(a|b)*c(a|b)*", "abacbb"));
        assert!(!matches("(a|b)*c(a|b)*", "abab"));
    }
}
