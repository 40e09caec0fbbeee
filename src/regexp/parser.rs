//! I-Regexp (RFC 9485 subset) parser.
//!
//! Supported:
//! - `.` any character except `\n` and `\r`
//! - `[...]`, `[^...]` with `a-z` ranges
//! - `|` alternation and `(...)` grouping
//! - `?`, `*`, `+`, `{n}`, `{n,}`, `{n,m}`
//! - `~d ~D ~w ~W ~s ~S`, `~p{Name}` / `~P{Name}` Unicode properties
//!
//! The escape character is `~` rather than `\` so patterns embed in JSON
//! without double escaping. The whole value must match; there are no
//! anchors, backreferences or lookaround.

use regex_syntax::hir::{Class, ClassUnicode, ClassUnicodeRange, HirKind};
use thiserror::Error;

/// Largest accepted `{n,m}` bound.
pub const REGEXP_QUANTIFIER_MAX: u32 = 100;

/// Most atom copies a regexp may expand to once counted repetitions are
/// unrolled. Nested counts multiply.
pub const REGEXP_EXPANSION_MAX: u64 = 10_000;

const ESCAPE: char = '~';

/// Characters that may follow `~` to stand for themselves.
const ESCAPABLE: &str = "()*+-.?[\\]^{|}~";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at offset {offset}")]
pub struct RegexpError {
    pub message: String,
    pub offset: usize,
}

/// One matchable unit: a set of characters or a parenthesized group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Atom {
    Class(ClassUnicode),
    Group(RegexpRoot),
}

/// An atom with its repetition bounds. `max == None` is unbounded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuantifiedAtom {
    pub atom: Atom,
    pub min: u32,
    pub max: Option<u32>,
}

impl QuantifiedAtom {
    pub fn is_singleton(&self) -> bool {
        self.min == 1 && self.max == Some(1)
    }
}

/// A sequence of pieces.
pub type RegexpBranch = Vec<QuantifiedAtom>;

/// Alternatives separated by `|`.
pub type RegexpRoot = Vec<RegexpBranch>;

struct RegexpParse<'a> {
    src: &'a str,
    chars: Vec<(usize, char)>,
    pos: usize,
}

impl<'a> RegexpParse<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            chars: src.char_indices().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|&(_, c)| c)
    }

    fn peek_second(&self) -> Option<char> {
        self.chars.get(self.pos + 1).map(|&(_, c)| c)
    }

    fn next(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    /// Byte offset of the next unread character.
    fn offset(&self) -> usize {
        self.chars
            .get(self.pos)
            .map_or(self.src.len(), |&(offset, _)| offset)
    }
}

fn error_at(offset: usize, message: impl Into<String>) -> RegexpError {
    RegexpError {
        message: message.into(),
        offset,
    }
}

/// Parse a regexp into alternatives of quantified atoms.
pub fn parse_regexp(re: &str) -> Result<RegexpRoot, RegexpError> {
    let mut parse = RegexpParse::new(re);
    let root = read_branches(&mut parse)?;
    if let Some(c) = parse.peek() {
        return Err(error_at(parse.offset(), format!("unbalanced '{c}'")));
    }
    if expanded_size(&root) > REGEXP_EXPANSION_MAX {
        return Err(error_at(
            0,
            format!("repetitions expand to more than {REGEXP_EXPANSION_MAX} atoms"),
        ));
    }
    Ok(root)
}

/// Atom copies the automaton builder will emit for `root`.
fn expanded_size(root: &RegexpRoot) -> u64 {
    root.iter()
        .flatten()
        .map(|piece| {
            let atom = match &piece.atom {
                Atom::Class(_) => 1,
                Atom::Group(inner) => expanded_size(inner),
            };
            // unbounded repetition is `min` copies plus one looped copy
            let copies = piece.max.unwrap_or(piece.min + 1);
            atom.saturating_mul(u64::from(copies))
        })
        .fold(0u64, u64::saturating_add)
}

fn read_branches(parse: &mut RegexpParse<'_>) -> Result<RegexpRoot, RegexpError> {
    let mut root = vec![read_branch(parse)?];
    while parse.peek() == Some('|') {
        parse.next();
        root.push(read_branch(parse)?);
    }
    Ok(root)
}

fn read_branch(parse: &mut RegexpParse<'_>) -> Result<RegexpBranch, RegexpError> {
    let mut branch = Vec::new();
    while let Some(c) = parse.peek() {
        if c == '|' || c == ')' {
            break;
        }
        let atom = read_atom(parse)?;
        branch.push(read_quantifier(parse, atom)?);
    }
    Ok(branch)
}

fn read_atom(parse: &mut RegexpParse<'_>) -> Result<Atom, RegexpError> {
    let offset = parse.offset();
    let c = parse
        .next()
        .ok_or_else(|| error_at(offset, "unexpected end of regular expression"))?;
    match c {
        '.' => Ok(Atom::Class(dot_class())),
        '(' => {
            if parse.peek() == Some('?') {
                return Err(error_at(
                    offset,
                    "lookaround and group flags are not supported",
                ));
            }
            let root = read_branches(parse)?;
            match parse.next() {
                Some(')') => Ok(Atom::Group(root)),
                _ => Err(error_at(offset, "unclosed '('")),
            }
        }
        '[' => read_class(parse, offset).map(Atom::Class),
        ESCAPE => read_escape(parse, offset).map(Atom::Class),
        '*' | '+' | '?' | '{' => Err(error_at(
            offset,
            format!("quantifier '{c}' has nothing to repeat"),
        )),
        ']' | '}' => Err(error_at(offset, format!("unescaped '{c}'"))),
        c => Ok(Atom::Class(single(c))),
    }
}

fn read_quantifier(parse: &mut RegexpParse<'_>, atom: Atom) -> Result<QuantifiedAtom, RegexpError> {
    let (min, max) = match parse.peek() {
        Some('?') => {
            parse.next();
            (0, Some(1))
        }
        Some('*') => {
            parse.next();
            (0, None)
        }
        Some('+') => {
            parse.next();
            (1, None)
        }
        Some('{') => read_range_quantifier(parse)?,
        _ => (1, Some(1)),
    };
    Ok(QuantifiedAtom { atom, min, max })
}

/// `{n}`, `{n,}` or `{n,m}`.
fn read_range_quantifier(parse: &mut RegexpParse<'_>) -> Result<(u32, Option<u32>), RegexpError> {
    let open = parse.offset();
    parse.next();
    let min = read_bound(parse, open)?;
    let max = match parse.next() {
        Some('}') => Some(min),
        Some(',') => {
            if parse.peek() == Some('}') {
                parse.next();
                None
            } else {
                let max = read_bound(parse, open)?;
                if parse.next() != Some('}') {
                    return Err(error_at(open, "unclosed '{'"));
                }
                if max < min {
                    return Err(error_at(open, format!("invalid range {{{min},{max}}}")));
                }
                Some(max)
            }
        }
        _ => return Err(error_at(open, "malformed '{' quantifier")),
    };
    Ok((min, max))
}

fn read_bound(parse: &mut RegexpParse<'_>, open: usize) -> Result<u32, RegexpError> {
    let mut value: Option<u32> = None;
    while let Some(d) = parse.peek().and_then(|c| c.to_digit(10)) {
        parse.next();
        let next = value.unwrap_or(0) * 10 + d;
        if next > REGEXP_QUANTIFIER_MAX {
            return Err(error_at(
                open,
                format!("quantifier bound exceeds {REGEXP_QUANTIFIER_MAX}"),
            ));
        }
        value = Some(next);
    }
    value.ok_or_else(|| error_at(open, "expected a number in '{' quantifier"))
}

/// Body of `[...]`; the `[` at `open` is already consumed.
fn read_class(parse: &mut RegexpParse<'_>, open: usize) -> Result<ClassUnicode, RegexpError> {
    let negated = parse.peek() == Some('^');
    if negated {
        parse.next();
    }
    let mut class = ClassUnicode::empty();
    let mut items = 0;
    loop {
        let offset = parse.offset();
        let c = parse
            .next()
            .ok_or_else(|| error_at(open, "unclosed '['"))?;
        let item = match c {
            ']' if items > 0 => break,
            ']' => return Err(error_at(open, "empty character class")),
            '[' => return Err(error_at(offset, "unescaped '[' in character class")),
            ESCAPE => read_escape(parse, offset)?,
            c => single(c),
        };
        items += 1;

        let range_start = as_single(&item);
        if let (Some(lo), Some('-')) = (range_start, parse.peek()) {
            if parse.peek_second() != Some(']') {
                parse.next();
                let hi = read_class_char(parse)?;
                if hi < lo {
                    return Err(error_at(offset, format!("invalid range '{lo}-{hi}'")));
                }
                class.push(ClassUnicodeRange::new(lo, hi));
                continue;
            }
        }
        class.union(&item);
    }
    if negated {
        class.negate();
    }
    Ok(class)
}

/// The upper end of a class range: a plain or escaped single character.
fn read_class_char(parse: &mut RegexpParse<'_>) -> Result<char, RegexpError> {
    let offset = parse.offset();
    match parse.next() {
        Some(ESCAPE) => {
            let class = read_escape(parse, offset)?;
            as_single(&class).ok_or_else(|| error_at(offset, "class escape cannot end a range"))
        }
        Some('[') | Some(']') | None => {
            Err(error_at(offset, "unfinished range in character class"))
        }
        Some(c) => Ok(c),
    }
}

/// Body of an escape; the `~` at `offset` is already consumed.
fn read_escape(parse: &mut RegexpParse<'_>, offset: usize) -> Result<ClassUnicode, RegexpError> {
    let c = parse
        .next()
        .ok_or_else(|| error_at(offset, "'~' at end of regular expression"))?;
    let class = match c {
        'n' => single('\n'),
        'r' => single('\r'),
        't' => single('\t'),
        'd' => digit_class(),
        'w' => word_class(),
        's' => space_class(),
        'D' | 'W' | 'S' => {
            let mut class = match c {
                'D' => digit_class(),
                'W' => word_class(),
                _ => space_class(),
            };
            class.negate();
            class
        }
        'p' | 'P' => {
            let mut class = read_property(parse, offset)?;
            if c == 'P' {
                class.negate();
            }
            class
        }
        c if ESCAPABLE.contains(c) => single(c),
        c => return Err(error_at(offset, format!("invalid escape '~{c}'"))),
    };
    Ok(class)
}

/// `{Name}` after `~p`, resolved against the Unicode general category and
/// script tables.
fn read_property(parse: &mut RegexpParse<'_>, offset: usize) -> Result<ClassUnicode, RegexpError> {
    if parse.next() != Some('{') {
        return Err(error_at(offset, "expected '{' after '~p'"));
    }
    let mut name = String::new();
    loop {
        match parse.next() {
            Some('}') => break,
            Some(c) if c.is_ascii_alphanumeric() || c == '_' => name.push(c),
            _ => return Err(error_at(offset, "malformed Unicode property name")),
        }
    }
    if name.is_empty() {
        return Err(error_at(offset, "empty Unicode property name"));
    }
    let hir = regex_syntax::Parser::new()
        .parse(&format!("\\p{{{name}}}"))
        .map_err(|_| error_at(offset, format!("unknown Unicode property '{name}'")))?;
    match hir.kind() {
        HirKind::Class(Class::Unicode(class)) => Ok(class.clone()),
        _ => Err(error_at(offset, format!("unknown Unicode property '{name}'"))),
    }
}

fn single(c: char) -> ClassUnicode {
    ClassUnicode::new([ClassUnicodeRange::new(c, c)])
}

fn as_single(class: &ClassUnicode) -> Option<char> {
    match class.ranges() {
        [range] if range.start() == range.end() => Some(range.start()),
        _ => None,
    }
}

fn dot_class() -> ClassUnicode {
    let mut class = ClassUnicode::new([
        ClassUnicodeRange::new('\n', '\n'),
        ClassUnicodeRange::new('\r', '\r'),
    ]);
    class.negate();
    class
}

fn digit_class() -> ClassUnicode {
    ClassUnicode::new([ClassUnicodeRange::new('0', '9')])
}

fn word_class() -> ClassUnicode {
    ClassUnicode::new([
        ClassUnicodeRange::new('0', '9'),
        ClassUnicodeRange::new('A', 'Z'),
        ClassUnicodeRange::new('_', '_'),
        ClassUnicodeRange::new('a', 'z'),
    ])
}

fn space_class() -> ClassUnicode {
    ClassUnicode::new([
        ClassUnicodeRange::new('\t', '\n'),
        ClassUnicodeRange::new('\r', '\r'),
        ClassUnicodeRange::new(' ', ' '),
    ])
}
