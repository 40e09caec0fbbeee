//! Regular expression shapes.
//!
//! `parse_regexp` turns I-Regexp text into a small tree and `make_regexp_fa`
//! compiles that tree into the same arena automaton every other value shape
//! uses, so regexps merge with literals, prefixes and globs like any other
//! fragment.

mod nfa;
mod parser;

pub use nfa::make_regexp_fa;
pub use parser::{
    parse_regexp, Atom, QuantifiedAtom, RegexpBranch, RegexpError, RegexpRoot,
    REGEXP_EXPANSION_MAX, REGEXP_QUANTIFIER_MAX,
};
