//! Selector AST
//!
//! Immutable once built. The engine walks the AST right to left: the last
//! segment is the target and each connective names how the segment on its
//! left relates to the segment on its right.

use std::fmt;
use std::str::FromStr;

use regex::Regex;
use uiq_cache::{FastQuery, OffsetRange};
use uiq_node::{AttrKind, AttrValue};

use crate::SelectorError;

/// Literal on the right-hand side of a predicate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    Str(String),
    Int(i64),
    Bool(bool),
    Null,
}

impl Literal {
    fn equals(&self, value: AttrValue<'_>) -> bool {
        match (self, value) {
            (Literal::Str(a), AttrValue::Str(b)) => a == b,
            (Literal::Int(a), AttrValue::Int(b)) => *a == b,
            (Literal::Bool(a), AttrValue::Bool(b)) => *a == b,
            (Literal::Null, AttrValue::Null) => true,
            _ => false,
        }
    }

    fn as_str(&self) -> Option<&str> {
        match self {
            Literal::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for Literal {
    fn from(s: &str) -> Self {
        Literal::Str(s.to_string())
    }
}

impl From<String> for Literal {
    fn from(s: String) -> Self {
        Literal::Str(s)
    }
}

impl From<i64> for Literal {
    fn from(n: i64) -> Self {
        Literal::Int(n)
    }
}

impl From<bool> for Literal {
    fn from(b: bool) -> Self {
        Literal::Bool(b)
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Str(s) => {
                f.write_str("'")?;
                for ch in s.chars() {
                    if ch == '\'' || ch == '\\' {
                        f.write_str("\\")?;
                    }
                    write!(f, "{}", ch)?;
                }
                f.write_str("'")
            }
            Literal::Int(n) => write!(f, "{}", n),
            Literal::Bool(b) => write!(f, "{}", b),
            Literal::Null => f.write_str("null"),
        }
    }
}

/// Comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `=`
    Eq,
    /// `!=`
    Ne,
    /// `^=`
    StartsWith,
    /// `$=`
    EndsWith,
    /// `*=`
    Contains,
    /// `~=` full-string regex match
    Matches,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

impl Operator {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::StartsWith => "^=",
            Self::EndsWith => "$=",
            Self::Contains => "*=",
            Self::Matches => "~=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }

    fn is_string_op(self) -> bool {
        matches!(self, Self::StartsWith | Self::EndsWith | Self::Contains | Self::Matches)
    }

    fn is_ordering(self) -> bool {
        matches!(self, Self::Lt | Self::Le | Self::Gt | Self::Ge)
    }
}

/// `[attr op literal]`
#[derive(Debug, Clone)]
pub struct Predicate {
    pub attr: AttrKind,
    pub op: Operator,
    pub literal: Literal,
    pattern: Option<Regex>,
}

impl PartialEq for Predicate {
    fn eq(&self, other: &Self) -> bool {
        self.attr == other.attr && self.op == other.op && self.literal == other.literal
    }
}

impl Eq for Predicate {}

impl Predicate {
    /// Build a predicate, checking that the literal suits the operator
    pub fn new(attr: AttrKind, op: Operator, literal: Literal) -> Result<Self, SelectorError> {
        Self::at(attr, op, literal, 0)
    }

    /// Equality predicate, never fails
    pub fn equals(attr: AttrKind, literal: impl Into<Literal>) -> Self {
        Self { attr, op: Operator::Eq, literal: literal.into(), pattern: None }
    }

    pub(crate) fn at(attr: AttrKind, op: Operator, literal: Literal, offset: usize) -> Result<Self, SelectorError> {
        if op.is_string_op() && literal.as_str().is_none() {
            return Err(SelectorError::InvalidLiteral { offset });
        }
        if op.is_ordering() && !matches!(literal, Literal::Int(_)) {
            return Err(SelectorError::InvalidLiteral { offset });
        }
        let pattern = match (op, &literal) {
            (Operator::Matches, Literal::Str(source)) => {
                let anchored = format!("^(?:{})$", source);
                let regex = Regex::new(&anchored).map_err(|e| SelectorError::InvalidRegex {
                    offset,
                    message: e.to_string(),
                })?;
                Some(regex)
            }
            _ => None,
        };
        Ok(Self { attr, op, literal, pattern })
    }

    /// Evaluate against an attribute value. Type mismatches never match,
    /// except that `!=` holds for them.
    pub fn test(&self, value: AttrValue<'_>) -> bool {
        match (self.op, value) {
            (Operator::Eq, v) => self.literal.equals(v),
            (Operator::Ne, v) => !self.literal.equals(v),
            (Operator::StartsWith, AttrValue::Str(s)) => self.literal.as_str().is_some_and(|l| s.starts_with(l)),
            (Operator::EndsWith, AttrValue::Str(s)) => self.literal.as_str().is_some_and(|l| s.ends_with(l)),
            (Operator::Contains, AttrValue::Str(s)) => self.literal.as_str().is_some_and(|l| s.contains(l)),
            (Operator::Matches, AttrValue::Str(s)) => self.pattern.as_ref().is_some_and(|p| p.is_match(s)),
            (op, AttrValue::Int(v)) if op.is_ordering() => match self.literal {
                Literal::Int(l) => match op {
                    Operator::Lt => v < l,
                    Operator::Le => v <= l,
                    Operator::Gt => v > l,
                    _ => v >= l,
                },
                _ => false,
            },
            _ => false,
        }
    }

    /// Host lookup able to produce every node this predicate accepts
    pub fn fast_query(&self) -> Option<FastQuery> {
        let value = self.literal.as_str().filter(|s| !s.is_empty())?;
        match (self.attr, self.op) {
            (AttrKind::Id, Operator::Eq) => Some(FastQuery::Id(value.to_string())),
            (AttrKind::Vid, Operator::Eq) => Some(FastQuery::Vid(value.to_string())),
            (AttrKind::Text, Operator::Eq | Operator::StartsWith | Operator::EndsWith | Operator::Contains) => {
                Some(FastQuery::Text(value.to_string()))
            }
            _ => None,
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}{}{}]", self.attr.name(), self.op.symbol(), self.literal)
    }
}

/// One node test: optional class name plus predicates, all of which must hold
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Segment {
    /// `None` matches any class (`*`)
    pub name: Option<String>,
    pub predicates: Vec<Predicate>,
}

impl Segment {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self { name: Some(name.into()), predicates: Vec::new() }
    }

    pub fn with(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Exact class name, or the part after the last `.`
    pub fn matches_name(&self, class_name: Option<&str>) -> bool {
        let Some(name) = &self.name else {
            return true;
        };
        let Some(class_name) = class_name else {
            return false;
        };
        class_name == name
            || class_name
                .strip_suffix(name.as_str())
                .is_some_and(|head| head.ends_with('.'))
    }

    /// First predicate usable as a host lookup
    pub fn fast_query(&self) -> Option<FastQuery> {
        self.predicates.iter().find_map(Predicate::fast_query)
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name.as_deref().unwrap_or("*"))?;
        for predicate in &self.predicates {
            write!(f, "{}", predicate)?;
        }
        Ok(())
    }
}

/// How the left segment's node relates to the right segment's node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    /// `A > B`: A is an ancestor of B, offset 0 = parent
    Ancestor,
    /// `A < B`: A is a child of B, offset = child index
    Child,
    /// `A << B`: A is a descendant of B, offset = pre-order discovery count
    Descendant,
    /// `A + B`: A is a sibling before B, offset 0 = adjacent
    SiblingBefore,
    /// `A - B`: A is a sibling after B, offset 0 = adjacent
    SiblingAfter,
}

impl Relation {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Ancestor => ">",
            Self::Child => "<",
            Self::Descendant => "<<",
            Self::SiblingBefore => "+",
            Self::SiblingAfter => "-",
        }
    }

    /// Window implied when the operator carries none
    pub fn default_window(self) -> OffsetRange {
        match self {
            Self::Ancestor | Self::SiblingBefore | Self::SiblingAfter => OffsetRange::NEAREST,
            Self::Child | Self::Descendant => OffsetRange::ANY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Connective {
    pub relation: Relation,
    pub window: OffsetRange,
}

impl Connective {
    /// Connective with the relation's default window
    pub fn new(relation: Relation) -> Self {
        Self { relation, window: relation.default_window() }
    }

    pub fn with_window(relation: Relation, window: OffsetRange) -> Self {
        Self { relation, window }
    }
}

impl fmt::Display for Connective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.relation == Relation::Ancestor && self.window == OffsetRange::ANY {
            return f.write_str(" ");
        }
        write!(f, " {}", self.relation.symbol())?;
        if self.window != self.relation.default_window() {
            match (self.window.min, self.window.max) {
                (None, None) => f.write_str("*")?,
                (Some(a), Some(b)) if a == b => write!(f, "{}", a + 1)?,
                (min, Some(max)) => write!(f, "{}..{}", min.unwrap_or(0) + 1, max + 1)?,
                (Some(min), None) => write!(f, "{}..", min + 1)?,
            }
        }
        f.write_str(" ")
    }
}

/// Parsed selector: one or more segments joined by connectives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    root_anchored: bool,
    segments: Vec<Segment>,
    /// `connectives[i]` joins `segments[i]` and `segments[i + 1]`
    connectives: Vec<Connective>,
}

impl Selector {
    /// Selector made of a single segment
    pub fn single(segment: Segment) -> Self {
        Self { root_anchored: false, segments: vec![segment], connectives: Vec::new() }
    }

    /// Append a segment on the right; it becomes the new target
    pub fn then(mut self, connective: Connective, segment: Segment) -> Self {
        self.connectives.push(connective);
        self.segments.push(segment);
        self
    }

    /// Require the target to be the tree root
    pub fn anchored(mut self) -> Self {
        self.root_anchored = true;
        self
    }

    pub fn is_root_anchored(&self) -> bool {
        self.root_anchored
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn connectives(&self) -> &[Connective] {
        &self.connectives
    }

    /// The rightmost segment
    pub fn target(&self) -> &Segment {
        // segments is never empty: every constructor starts from one segment
        &self.segments[self.segments.len() - 1]
    }

    /// Host lookup for the target, when one exists
    pub fn fast_query(&self) -> Option<FastQuery> {
        self.target().fast_query()
    }
}

impl FromStr for Selector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        crate::parser::parse(s)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.root_anchored {
            f.write_str("^")?;
        }
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                write!(f, "{}", self.connectives[i - 1])?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_predicates() {
        let starts = Predicate::new(AttrKind::Text, Operator::StartsWith, "Sub".into()).unwrap();
        assert!(starts.test(AttrValue::Str("Submit")));
        assert!(!starts.test(AttrValue::Str("submit")));
        assert!(!starts.test(AttrValue::Null));

        let contains = Predicate::new(AttrKind::Text, Operator::Contains, "bmi".into()).unwrap();
        assert!(contains.test(AttrValue::Str("Submit")));
    }

    #[test]
    fn test_equality_and_null() {
        let null = Predicate::equals(AttrKind::Checked, Literal::Null);
        assert!(null.test(AttrValue::Null));
        assert!(!null.test(AttrValue::Bool(false)));

        let ne = Predicate::new(AttrKind::Text, Operator::Ne, "a".into()).unwrap();
        assert!(ne.test(AttrValue::Null));
        assert!(!ne.test(AttrValue::Str("a")));
    }

    #[test]
    fn test_ordering() {
        let lt = Predicate::new(AttrKind::Width, Operator::Lt, Literal::Int(100)).unwrap();
        assert!(lt.test(AttrValue::Int(99)));
        assert!(!lt.test(AttrValue::Int(100)));
        assert!(!lt.test(AttrValue::Str("1")));
        assert!(Predicate::new(AttrKind::Width, Operator::Lt, "100".into()).is_err());
    }

    #[test]
    fn test_regex_is_full_match() {
        let re = Predicate::new(AttrKind::Text, Operator::Matches, "[0-9]+".into()).unwrap();
        assert!(re.test(AttrValue::Str("42")));
        assert!(!re.test(AttrValue::Str("a42")));
        assert!(matches!(
            Predicate::new(AttrKind::Text, Operator::Matches, "(".into()),
            Err(SelectorError::InvalidRegex { .. })
        ));
    }

    #[test]
    fn test_segment_name_suffix() {
        let seg = Segment::named("Button");
        assert!(seg.matches_name(Some("android.widget.Button")));
        assert!(seg.matches_name(Some("Button")));
        assert!(!seg.matches_name(Some("android.widget.ImageButton")));
        assert!(!seg.matches_name(None));
        assert!(Segment::any().matches_name(None));
    }

    #[test]
    fn test_fast_query_selection() {
        let seg = Segment::any()
            .with(Predicate::equals(AttrKind::Clickable, true))
            .with(Predicate::equals(AttrKind::Vid, "ok"));
        assert_eq!(seg.fast_query(), Some(FastQuery::Vid("ok".into())));

        let empty = Segment::any().with(Predicate::equals(AttrKind::Text, ""));
        assert_eq!(empty.fast_query(), None);

        let regex = Segment::any().with(Predicate::new(AttrKind::Text, Operator::Matches, "x".into()).unwrap());
        assert_eq!(regex.fast_query(), None);
    }

    #[test]
    fn test_display() {
        let sel = Selector::single(Segment::named("FrameLayout"))
            .then(
                Connective::new(Relation::Ancestor),
                Segment::named("Button").with(Predicate::equals(AttrKind::Text, "it's")),
            )
            .then(Connective::with_window(Relation::SiblingBefore, OffsetRange::between(0, 2)), Segment::any());
        assert_eq!(sel.to_string(), r"FrameLayout > Button[text='it\'s'] +1..3 *");
        assert_eq!(sel.target(), &Segment::any());
    }
}
