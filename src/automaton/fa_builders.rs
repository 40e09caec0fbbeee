//! Automaton fragment builders and the memoized merge.
//!
//! Every builder writes its states into the caller's arena and returns the
//! fragment's start state. The fragment reports `target` from its accept
//! state. Builders work right to left so stack depth never depends on value
//! length.
//!
//! - `make_string_fa`: exact bytes, then the value terminator
//! - `make_prefix_fa`: accepts once the prefix is consumed
//! - `make_shellstyle_fa` / `make_wildcard_fa` / `make_suffix_fa`: glob spinners
//! - `make_anything_but_fa`: one combined trie over every excluded value
//! - `make_monocase_fa`: case-insensitive exact match
//! - `merge_fas`: union of two automata sharing an arena

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use tracing::trace;

use super::arena::{StateArena, StateId, TargetId};
use super::small_table::{FaState, SmallTable, VALUE_TERMINATOR};
use crate::QuaminaError;

/// A state whose only transition is the value terminator into `next`.
pub(crate) fn terminator_state(arena: &mut StateArena, next: StateId) -> StateId {
    arena.alloc(FaState::with_table(SmallTable::with_mappings(
        StateId::NONE,
        &[VALUE_TERMINATOR],
        &[next],
    )))
}

/// Prepend a chain of single-byte steps for `bytes` in front of `next`.
fn byte_chain(arena: &mut StateArena, bytes: &[u8], next: StateId) -> StateId {
    bytes.iter().rev().fold(next, |next, &b| {
        arena.alloc(FaState::with_table(SmallTable::with_mappings(
            StateId::NONE,
            &[b],
            &[next],
        )))
    })
}

/// Exact match of `val`.
pub fn make_string_fa(arena: &mut StateArena, val: &[u8], target: TargetId) -> StateId {
    let accept = arena.alloc(FaState::accepting(target));
    let end = terminator_state(arena, accept);
    byte_chain(arena, val, end)
}

/// Any value starting with `prefix`.
pub fn make_prefix_fa(arena: &mut StateArena, prefix: &[u8], target: TargetId) -> StateId {
    let accept = arena.alloc(FaState::accepting(target));
    byte_chain(arena, prefix, accept)
}

/// A parsed glob: literal runs separated by `*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GlobPiece {
    Literal(Vec<u8>),
    Star,
}

/// Split a shell-style glob. Every `*` is a wildcard; there are no escapes.
pub fn parse_shellstyle(pattern: &[u8]) -> Result<Vec<GlobPiece>, QuaminaError> {
    let mut pieces = Vec::new();
    let mut literal = Vec::new();
    for &b in pattern {
        if b == b'*' {
            push_star(&mut pieces, &mut literal)?;
        } else {
            literal.push(b);
        }
    }
    if !literal.is_empty() {
        pieces.push(GlobPiece::Literal(literal));
    }
    Ok(pieces)
}

/// Split a wildcard pattern. `\*` is a literal star and `\\` a literal
/// backslash; any other escape is rejected.
pub fn parse_wildcard(pattern: &[u8]) -> Result<Vec<GlobPiece>, QuaminaError> {
    let mut pieces = Vec::new();
    let mut literal = Vec::new();
    let mut bytes = pattern.iter().copied();
    while let Some(b) = bytes.next() {
        match b {
            b'\\' => match bytes.next() {
                Some(escaped @ (b'*' | b'\\')) => literal.push(escaped),
                Some(other) => {
                    return Err(QuaminaError::InvalidPattern(format!(
                        "invalid escape '\\{}' in wildcard",
                        char::from(other)
                    )))
                }
                None => {
                    return Err(QuaminaError::InvalidPattern(
                        "wildcard ends with an unfinished escape".into(),
                    ))
                }
            },
            b'*' => push_star(&mut pieces, &mut literal)?,
            _ => literal.push(b),
        }
    }
    if !literal.is_empty() {
        pieces.push(GlobPiece::Literal(literal));
    }
    Ok(pieces)
}

fn push_star(pieces: &mut Vec<GlobPiece>, literal: &mut Vec<u8>) -> Result<(), QuaminaError> {
    if literal.is_empty() && pieces.last() == Some(&GlobPiece::Star) {
        return Err(QuaminaError::InvalidPattern(
            "adjacent '*' characters are not allowed".into(),
        ));
    }
    if !literal.is_empty() {
        pieces.push(GlobPiece::Literal(std::mem::take(literal)));
    }
    pieces.push(GlobPiece::Star);
    Ok(())
}

/// A state that consumes any byte except the terminator and stays put, with
/// an epsilon into `next`.
fn spinner(arena: &mut StateArena, next: StateId) -> StateId {
    let spin = arena.reserve();
    let mut unpacked = [spin; 256];
    unpacked[VALUE_TERMINATOR as usize] = StateId::NONE;
    arena.set(
        spin,
        FaState {
            table: SmallTable::pack(&unpacked),
            epsilons: vec![next],
            field_transitions: Vec::new(),
        },
    );
    spin
}

fn build_glob(arena: &mut StateArena, pieces: &[GlobPiece], target: TargetId) -> StateId {
    let accept = arena.alloc(FaState::accepting(target));
    let end = terminator_state(arena, accept);
    pieces.iter().rev().fold(end, |next, piece| match piece {
        GlobPiece::Literal(bytes) => byte_chain(arena, bytes, next),
        GlobPiece::Star => spinner(arena, next),
    })
}

/// Shell-style glob: `*` matches any run of bytes, including none.
pub fn make_shellstyle_fa(
    arena: &mut StateArena,
    pattern: &[u8],
    target: TargetId,
) -> Result<StateId, QuaminaError> {
    let pieces = parse_shellstyle(pattern)?;
    Ok(build_glob(arena, &pieces, target))
}

/// Glob with `\*` and `\\` escapes.
pub fn make_wildcard_fa(
    arena: &mut StateArena,
    pattern: &[u8],
    target: TargetId,
) -> Result<StateId, QuaminaError> {
    let pieces = parse_wildcard(pattern)?;
    Ok(build_glob(arena, &pieces, target))
}

/// Any value ending with `suffix`.
pub fn make_suffix_fa(arena: &mut StateArena, suffix: &[u8], target: TargetId) -> StateId {
    let mut pieces = vec![GlobPiece::Star];
    if !suffix.is_empty() {
        pieces.push(GlobPiece::Literal(suffix.to_vec()));
    }
    build_glob(arena, &pieces, target)
}

/// Byte trie used by the anything-but and monocase builders. Node 0 is the
/// root and every child has a larger index than its parent.
#[derive(Default)]
struct ByteTrie {
    nodes: Vec<TrieNode>,
}

#[derive(Default)]
struct TrieNode {
    children: BTreeMap<u8, usize>,
    terminal: bool,
}

impl ByteTrie {
    fn new() -> Self {
        Self {
            nodes: vec![TrieNode::default()],
        }
    }

    fn insert(&mut self, bytes: &[u8]) {
        let mut node = 0;
        for &b in bytes {
            node = match self.nodes[node].children.get(&b) {
                Some(&child) => child,
                None => {
                    let child = self.nodes.len();
                    self.nodes.push(TrieNode::default());
                    self.nodes[node].children.insert(b, child);
                    child
                }
            };
        }
        self.nodes[node].terminal = true;
    }
}

/// Any value not exactly equal to one of `excluded`.
///
/// All excluded values share one trie: walking along an excluded value
/// stays inside the trie, stepping off it reaches the accept state, and the
/// terminator fails only at nodes where an excluded value ends.
pub fn make_anything_but_fa(
    arena: &mut StateArena,
    excluded: &[Vec<u8>],
    target: TargetId,
) -> Result<StateId, QuaminaError> {
    if excluded.is_empty() {
        return Err(QuaminaError::InvalidPattern(
            "anything-but requires at least one value".into(),
        ));
    }
    let mut trie = ByteTrie::new();
    for value in excluded {
        trie.insert(value);
    }

    let success = arena.alloc(FaState::accepting(target));
    let mut states = vec![StateId::NONE; trie.nodes.len()];
    for (idx, node) in trie.nodes.iter().enumerate().rev() {
        let mut unpacked = [success; 256];
        for (&b, &child) in &node.children {
            unpacked[b as usize] = states[child];
        }
        if node.terminal {
            unpacked[VALUE_TERMINATOR as usize] = StateId::NONE;
        }
        states[idx] = arena.alloc(FaState::with_table(SmallTable::pack(&unpacked)));
    }
    Ok(states[0])
}

fn single_char(mut chars: impl Iterator<Item = char>) -> Option<char> {
    let first = chars.next()?;
    chars.next().is_none().then_some(first)
}

/// `c` plus its single-character lower and upper case forms.
fn case_variants(c: char) -> Vec<char> {
    let mut variants = vec![c];
    let alternates = [
        single_char(c.to_lowercase()),
        single_char(c.to_uppercase()),
    ];
    for alt in alternates.into_iter().flatten() {
        if !variants.contains(&alt) {
            variants.push(alt);
        }
    }
    variants
}

/// Case-insensitive exact match of `val`.
pub fn make_monocase_fa(arena: &mut StateArena, val: &str, target: TargetId) -> StateId {
    let accept = arena.alloc(FaState::accepting(target));
    let mut next = terminator_state(arena, accept);
    let mut buf = [0u8; 4];
    for c in val.chars().rev() {
        let mut trie = ByteTrie::new();
        for variant in case_variants(c) {
            trie.insert(variant.encode_utf8(&mut buf).as_bytes());
        }
        // UTF-8 is prefix free, so terminal nodes are exactly the leaves
        let mut states = vec![StateId::NONE; trie.nodes.len()];
        for (idx, node) in trie.nodes.iter().enumerate().rev() {
            states[idx] = if node.terminal {
                next
            } else {
                let (bytes, steps): (Vec<u8>, Vec<StateId>) = node
                    .children
                    .iter()
                    .map(|(&b, &child)| (b, states[child]))
                    .unzip();
                arena.alloc(FaState::with_table(SmallTable::with_mappings(
                    StateId::NONE,
                    &bytes,
                    &steps,
                )))
            };
        }
        next = states[0];
    }
    next
}

/// Union of the automata starting at `a` and `b`, both living in `arena`.
///
/// New states are synthesized for every reachable pair of states; existing
/// states are never modified, so anything still holding `a` or `b` keeps
/// its language. Pairs are memoized, which keeps cyclic automata finite and
/// stops repeated sub-merges from multiplying states.
pub fn merge_fas(arena: &mut StateArena, a: StateId, b: StateId) -> StateId {
    if a == b {
        return a;
    }
    let before = arena.len();
    let mut memo: FxHashMap<(StateId, StateId), StateId> = FxHashMap::default();
    let mut pending: Vec<(StateId, StateId, StateId)> = Vec::new();

    let root = arena.reserve();
    memo.insert(pair_key(a, b), root);
    pending.push((a, b, root));

    while let Some((x, y, combined)) = pending.pop() {
        let (sx, sy) = (arena.state(x), arena.state(y));
        let table = sx.table.merge_with(&sy.table, |nx, ny| {
            if nx.is_none() {
                return ny;
            }
            if ny.is_none() || nx == ny {
                return nx;
            }
            *memo.entry(pair_key(nx, ny)).or_insert_with(|| {
                let id = arena.reserve();
                pending.push((nx, ny, id));
                id
            })
        });
        arena.set(
            combined,
            FaState {
                table,
                epsilons: union(&sx.epsilons, &sy.epsilons),
                field_transitions: union(&sx.field_transitions, &sy.field_transitions),
            },
        );
    }

    trace!(states_before = before, states_after = arena.len(), "merged automata");
    root
}

#[inline]
fn pair_key(a: StateId, b: StateId) -> (StateId, StateId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

fn union<T: Copy + PartialEq>(left: &[T], right: &[T]) -> Vec<T> {
    let mut out = left.to_vec();
    for item in right {
        if !out.contains(item) {
            out.push(*item);
        }
    }
    out
}
