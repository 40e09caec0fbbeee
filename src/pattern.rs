//! Pattern fields and value shapes, as handed over by a pattern parser.

use std::borrow::Cow;
use std::collections::HashSet;

use crate::automaton::fa_builders::{parse_shellstyle, parse_wildcard};
use crate::regexp::parse_regexp;
use crate::QuaminaError;

/// One constraint on a single field's value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueShape {
    /// Exact string bytes.
    Literal(Vec<u8>),
    /// Exact bytes of a canonically encoded number.
    Number(Vec<u8>),
    Boolean(bool),
    /// Field present (`true`) or absent (`false`), whatever its value.
    Exists(bool),
    Prefix(Vec<u8>),
    Suffix(Vec<u8>),
    /// Glob where every `*` is a wildcard.
    Shellstyle(Vec<u8>),
    /// Glob with `\*` and `\\` escapes.
    Wildcard(Vec<u8>),
    /// I-Regexp with `~` escapes, matched against the whole value.
    Regexp(String),
    /// Any value except these.
    AnythingBut(Vec<Vec<u8>>),
    EqualsIgnoreCase(String),
}

impl ValueShape {
    pub fn literal(value: impl AsRef<[u8]>) -> Self {
        ValueShape::Literal(value.as_ref().to_vec())
    }

    /// Build a shape from a parser's tag and operands.
    ///
    /// Tags: `literal`, `number`, `boolean`, `exists`, `prefix`, `suffix`,
    /// `shellstyle`, `wildcard`, `regexp`, `anything-but`,
    /// `equals-ignore-case`.
    pub fn from_tag(tag: &str, operands: &[&str]) -> Result<Self, QuaminaError> {
        let one = || match operands {
            [operand] => Ok(*operand),
            _ => Err(QuaminaError::InvalidPattern(format!(
                "'{tag}' takes exactly one operand, got {}",
                operands.len()
            ))),
        };
        let flag = || match one()? {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(QuaminaError::InvalidPattern(format!(
                "'{tag}' expects true or false, got '{other}'"
            ))),
        };
        let shape = match tag {
            "literal" => ValueShape::literal(one()?),
            "number" => ValueShape::Number(one()?.as_bytes().to_vec()),
            "boolean" => ValueShape::Boolean(flag()?),
            "exists" => ValueShape::Exists(flag()?),
            "prefix" => ValueShape::Prefix(one()?.as_bytes().to_vec()),
            "suffix" => ValueShape::Suffix(one()?.as_bytes().to_vec()),
            "shellstyle" => ValueShape::Shellstyle(one()?.as_bytes().to_vec()),
            "wildcard" => ValueShape::Wildcard(one()?.as_bytes().to_vec()),
            "regexp" => ValueShape::Regexp(one()?.to_string()),
            "equals-ignore-case" => ValueShape::EqualsIgnoreCase(one()?.to_string()),
            "anything-but" => {
                ValueShape::AnythingBut(operands.iter().map(|o| o.as_bytes().to_vec()).collect())
            }
            unknown => return Err(QuaminaError::UnknownShape(unknown.to_string())),
        };
        Ok(shape)
    }

    /// The bytes an exact-match shape compares against.
    pub(crate) fn exact_bytes(&self) -> Option<Cow<'_, [u8]>> {
        match self {
            ValueShape::Literal(bytes) | ValueShape::Number(bytes) => Some(Cow::Borrowed(bytes)),
            ValueShape::Boolean(true) => Some(Cow::Borrowed(b"true")),
            ValueShape::Boolean(false) => Some(Cow::Borrowed(b"false")),
            _ => None,
        }
    }

    /// Shapes that must be the only shape on their path.
    fn is_exclusive(&self) -> bool {
        matches!(
            self,
            ValueShape::Exists(_) | ValueShape::AnythingBut(_) | ValueShape::Regexp(_)
        )
    }

    /// Shapes whose automata contain epsilon transitions.
    pub(crate) fn is_nondeterministic(&self) -> bool {
        matches!(
            self,
            ValueShape::Suffix(_)
                | ValueShape::Shellstyle(_)
                | ValueShape::Wildcard(_)
                | ValueShape::Regexp(_)
        )
    }

    pub(crate) fn kind_name(&self) -> &'static str {
        match self {
            ValueShape::Literal(_) => "literal",
            ValueShape::Number(_) => "number",
            ValueShape::Boolean(_) => "boolean",
            ValueShape::Exists(_) => "exists",
            ValueShape::Prefix(_) => "prefix",
            ValueShape::Suffix(_) => "suffix",
            ValueShape::Shellstyle(_) => "shellstyle",
            ValueShape::Wildcard(_) => "wildcard",
            ValueShape::Regexp(_) => "regexp",
            ValueShape::AnythingBut(_) => "anything-but",
            ValueShape::EqualsIgnoreCase(_) => "equals-ignore-case",
        }
    }

    fn validate(&self) -> Result<(), QuaminaError> {
        match self {
            ValueShape::AnythingBut(excluded) if excluded.is_empty() => Err(
                QuaminaError::InvalidPattern("anything-but requires at least one value".into()),
            ),
            ValueShape::Shellstyle(glob) => parse_shellstyle(glob).map(drop),
            ValueShape::Wildcard(glob) => parse_wildcard(glob).map(drop),
            ValueShape::Regexp(re) => parse_regexp(re).map(drop).map_err(QuaminaError::from),
            _ => Ok(()),
        }
    }
}

/// All constraints a pattern places on one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternField {
    pub path: String,
    pub shapes: Vec<ValueShape>,
}

impl PatternField {
    pub fn new(path: impl Into<String>, shapes: Vec<ValueShape>) -> Self {
        Self {
            path: path.into(),
            shapes,
        }
    }
}

/// Check a pattern and return its fields sorted by path.
pub(crate) fn validate_pattern(
    fields: &[PatternField],
) -> Result<Vec<&PatternField>, QuaminaError> {
    if fields.is_empty() {
        return Err(QuaminaError::InvalidPattern("pattern has no fields".into()));
    }
    let mut seen = HashSet::with_capacity(fields.len());
    for field in fields {
        if !seen.insert(field.path.as_str()) {
            return Err(QuaminaError::InvalidPattern(format!(
                "duplicate path '{}'",
                field.path
            )));
        }
        if field.shapes.is_empty() {
            return Err(QuaminaError::InvalidPattern(format!(
                "no values for path '{}'",
                field.path
            )));
        }
        if field.shapes.len() > 1 {
            if let Some(exclusive) = field.shapes.iter().find(|s| s.is_exclusive()) {
                return Err(QuaminaError::InvalidPattern(format!(
                    "{} cannot be combined with other values on path '{}'",
                    exclusive.kind_name(),
                    field.path
                )));
            }
        }
        for shape in &field.shapes {
            shape.validate()?;
        }
    }
    let mut sorted: Vec<&PatternField> = fields.iter().collect();
    sorted.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(sorted)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(path: &str, shapes: Vec<ValueShape>) -> PatternField {
        PatternField::new(path, shapes)
    }

    #[test]
    fn test_from_tag() {
        assert_eq!(
            ValueShape::from_tag("prefix", &["AC"]).unwrap(),
            ValueShape::Prefix(b"AC".to_vec())
        );
        assert_eq!(
            ValueShape::from_tag("exists", &["false"]).unwrap(),
            ValueShape::Exists(false)
        );
        assert_eq!(
            ValueShape::from_tag("anything-but", &["a", "b"]).unwrap(),
            ValueShape::AnythingBut(vec![b"a".to_vec(), b"b".to_vec()])
        );
        assert_eq!(
            ValueShape::from_tag("numeric", &["<", "3"]),
            Err(QuaminaError::UnknownShape("numeric".into()))
        );
        assert!(ValueShape::from_tag("prefix", &[]).is_err());
        assert!(ValueShape::from_tag("exists", &["maybe"]).is_err());
    }

    #[test]
    fn test_validate_sorts_fields() {
        let fields = vec![
            field("z", vec![ValueShape::literal("1")]),
            field("a", vec![ValueShape::literal("2")]),
            field("m.n", vec![ValueShape::Exists(true)]),
        ];
        let sorted = validate_pattern(&fields).unwrap();
        let paths: Vec<_> = sorted.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["a", "m.n", "z"]);
    }

    #[test]
    fn test_validate_rejections() {
        let cases = vec![
            vec![],
            vec![field("a", vec![])],
            vec![
                field("a", vec![ValueShape::literal("1")]),
                field("a", vec![ValueShape::literal("2")]),
            ],
            vec![field("a", vec![ValueShape::literal("x"), ValueShape::Exists(true)])],
            vec![field("a", vec![ValueShape::Exists(false), ValueShape::literal("x")])],
            vec![field(
                "a",
                vec![ValueShape::AnythingBut(vec![b"x".to_vec()]), ValueShape::literal("y")],
            )],
            vec![field("a", vec![ValueShape::Regexp("a+".into()), ValueShape::literal("y")])],
            vec![field("a", vec![ValueShape::AnythingBut(vec![])])],
            vec![field("a", vec![ValueShape::Regexp("(".into())])],
            vec![field("a", vec![ValueShape::Shellstyle(b"a**b".to_vec())])],
            vec![field("a", vec![ValueShape::Wildcard(b"a\\b".to_vec())])],
        ];
        for fields in cases {
            assert!(validate_pattern(&fields).is_err(), "{fields:?} should be rejected");
        }
    }

    #[test]
    fn test_regexp_error_is_wrapped() {
        let fields = vec![field("a", vec![ValueShape::Regexp("a{3,1}".into())])];
        assert!(matches!(
            validate_pattern(&fields),
            Err(QuaminaError::InvalidRegexp(_))
        ));
    }

    #[test]
    fn test_multiple_plain_shapes_allowed() {
        let fields = vec![field(
            "a",
            vec![
                ValueShape::literal("x"),
                ValueShape::Prefix(b"y".to_vec()),
                ValueShape::Shellstyle(b"*z".to_vec()),
            ],
        )];
        assert!(validate_pattern(&fields).is_ok());
    }
}
