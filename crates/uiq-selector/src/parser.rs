//! Minimal selector parser
//!
//! Hand-written recursive descent over the selector string. Offsets in errors
//! are byte offsets.

use uiq_cache::OffsetRange;
use uiq_node::AttrKind;

use crate::ast::{Connective, Literal, Operator, Predicate, Relation, Segment, Selector};
use crate::SelectorError;

type Result<T> = std::result::Result<T, SelectorError>;

/// Parse a selector string
pub fn parse(source: &str) -> Result<Selector> {
    Parser { src: source, pos: 0 }.selector()
}

const OPERATORS: [(&str, Operator); 10] = [
    ("!=", Operator::Ne),
    ("^=", Operator::StartsWith),
    ("$=", Operator::EndsWith),
    ("*=", Operator::Contains),
    ("~=", Operator::Matches),
    ("<=", Operator::Le),
    (">=", Operator::Ge),
    ("=", Operator::Eq),
    ("<", Operator::Lt),
    (">", Operator::Gt),
];

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '.' | '$')
}

/// Whether `name` can be written as a segment's class name
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(is_name_char)
}

fn is_attr_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    /// Skip whitespace, reporting whether there was any
    fn skip_ws(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
        self.pos > start
    }

    fn take_while(&mut self, accept: fn(char) -> bool) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(accept) {
            self.bump();
        }
        &self.src[start..self.pos]
    }

    fn unexpected(&self) -> SelectorError {
        match self.peek() {
            Some(ch) => SelectorError::UnexpectedChar { ch, offset: self.pos },
            None => SelectorError::UnexpectedEnd { offset: self.pos },
        }
    }

    fn expect(&mut self, c: char) -> Result<()> {
        if self.eat(c) { Ok(()) } else { Err(self.unexpected()) }
    }

    fn selector(&mut self) -> Result<Selector> {
        self.skip_ws();
        let anchored = self.eat('^');
        self.skip_ws();
        let mut selector = Selector::single(self.segment()?);

        loop {
            let spaced = self.skip_ws();
            match self.peek() {
                None => break,
                Some('>' | '<' | '+' | '-') => {
                    let connective = self.connective()?;
                    self.skip_ws();
                    selector = selector.then(connective, self.segment()?);
                }
                Some(_) if spaced => {
                    let connective = Connective::with_window(Relation::Ancestor, OffsetRange::ANY);
                    selector = selector.then(connective, self.segment()?);
                }
                Some(_) => return Err(self.unexpected()),
            }
        }

        Ok(if anchored { selector.anchored() } else { selector })
    }

    fn connective(&mut self) -> Result<Connective> {
        let relation = match self.peek() {
            Some('>') => Relation::Ancestor,
            Some('<') if self.src[self.pos..].starts_with("<<") => Relation::Descendant,
            Some('<') => Relation::Child,
            Some('+') => Relation::SiblingBefore,
            Some('-') => Relation::SiblingAfter,
            _ => return Err(self.unexpected()),
        };
        self.pos += relation.symbol().len();
        let window = self.window()?.unwrap_or(relation.default_window());
        Ok(Connective::with_window(relation, window))
    }

    /// `N`, `N..M`, `N..` or `*`; numbers are 1-based in the text
    fn window(&mut self) -> Result<Option<OffsetRange>> {
        let start = self.pos;
        if self.eat('*') {
            return Ok(Some(OffsetRange::ANY));
        }
        let Some(first) = self.number()? else {
            return Ok(None);
        };
        let invalid = SelectorError::InvalidWindow { offset: start };
        let min = first.checked_sub(1).ok_or_else(|| invalid.clone())?;
        if !self.src[self.pos..].starts_with("..") {
            return Ok(Some(OffsetRange::exact(min)));
        }
        self.pos += 2;
        match self.number()? {
            None => Ok(Some(OffsetRange::at_least(min))),
            Some(last) => {
                let max = last
                    .checked_sub(1)
                    .filter(|&max| max >= min)
                    .ok_or(invalid)?;
                Ok(Some(OffsetRange::between(min, max)))
            }
        }
    }

    fn number(&mut self) -> Result<Option<usize>> {
        let start = self.pos;
        let digits = self.take_while(|c| c.is_ascii_digit());
        if digits.is_empty() {
            return Ok(None);
        }
        digits
            .parse()
            .map(Some)
            .map_err(|_| SelectorError::InvalidWindow { offset: start })
    }

    fn segment(&mut self) -> Result<Segment> {
        let mut segment = if self.eat('*') {
            Segment::any()
        } else {
            let name = self.take_while(is_name_char);
            if !name.is_empty() {
                Segment::named(name)
            } else if self.peek() == Some('[') {
                Segment::any()
            } else {
                return Err(self.unexpected());
            }
        };
        while self.eat('[') {
            let predicate = self.predicate()?;
            segment.predicates.push(predicate);
        }
        Ok(segment)
    }

    fn predicate(&mut self) -> Result<Predicate> {
        self.skip_ws();
        let start = self.pos;
        let name = self.take_while(is_attr_char);
        if name.is_empty() {
            return Err(self.unexpected());
        }
        let attr = AttrKind::parse(name).ok_or_else(|| SelectorError::UnknownAttribute {
            name: name.to_string(),
            offset: start,
        })?;

        self.skip_ws();
        let op = self.operator()?;
        self.skip_ws();
        let literal_start = self.pos;
        let literal = self.literal()?;
        self.skip_ws();
        self.expect(']')?;
        Predicate::at(attr, op, literal, literal_start)
    }

    fn operator(&mut self) -> Result<Operator> {
        let rest = &self.src[self.pos..];
        for (symbol, op) in OPERATORS {
            if rest.starts_with(symbol) {
                self.pos += symbol.len();
                return Ok(op);
            }
        }
        Err(self.unexpected())
    }

    fn literal(&mut self) -> Result<Literal> {
        let start = self.pos;
        match self.peek() {
            Some(quote @ ('\'' | '"')) => {
                self.bump();
                let mut out = String::new();
                loop {
                    match self.bump() {
                        Some('\\') => match self.bump() {
                            Some(c) => out.push(c),
                            None => return Err(SelectorError::UnexpectedEnd { offset: self.pos }),
                        },
                        Some(c) if c == quote => break,
                        Some(c) => out.push(c),
                        None => return Err(SelectorError::UnexpectedEnd { offset: self.pos }),
                    }
                }
                Ok(Literal::Str(out))
            }
            Some(c) if c == '-' || c.is_ascii_digit() => {
                self.bump();
                self.take_while(|c| c.is_ascii_digit());
                self.src[start..self.pos]
                    .parse()
                    .map(Literal::Int)
                    .map_err(|_| SelectorError::InvalidLiteral { offset: start })
            }
            Some(c) if c.is_ascii_alphabetic() => match self.take_while(is_attr_char) {
                "true" => Ok(Literal::Bool(true)),
                "false" => Ok(Literal::Bool(false)),
                "null" => Ok(Literal::Null),
                _ => Err(SelectorError::InvalidLiteral { offset: start }),
            },
            Some(_) => Err(SelectorError::InvalidLiteral { offset: start }),
            None => Err(SelectorError::UnexpectedEnd { offset: start }),
        }
    }
}
