//! Block-state predicates such as `LIT && CANDLES=1`
//!
//! A condition is a short-circuit boolean expression over a [`PropertyBag`].
//! Property names match case-insensitively. A bare name holds when the
//! property is boolean `true`; `NAME=value` (or `==`) and `NAME!=value`
//! compare against a literal. A property missing from the bag never equals
//! anything, so `=` is false and `!=` is true.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::ConditionError;
use crate::parser::{MAX_NESTING, MAX_TOKENS};

/// Value of a single block-state property
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    /// Enum-like values (`north`, `lower`, ...), compared case-insensitively
    Text(String),
}

impl PropertyValue {
    /// Interpret a literal: `true`/`false`, an integer, or text
    pub fn parse_literal(text: &str) -> Self {
        let text = text.trim();
        if text.eq_ignore_ascii_case("true") {
            Self::Bool(true)
        } else if text.eq_ignore_ascii_case("false") {
            Self::Bool(false)
        } else if let Ok(v) = text.parse::<i64>() {
            Self::Int(v)
        } else {
            Self::Text(text.to_ascii_lowercase())
        }
    }

    fn matches(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Text(a), Self::Text(b)) => a.eq_ignore_ascii_case(b),
            _ => self == other,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for PropertyValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_ascii_lowercase())
    }
}

/// Discrete properties of a block state, keyed by lowercase name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyBag {
    values: BTreeMap<String, PropertyValue>,
}

impl PropertyBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a property, replacing any previous value
    pub fn insert(&mut self, name: &str, value: impl Into<PropertyValue>) {
        self.values.insert(name.to_ascii_lowercase(), value.into());
    }

    /// Builder form of [`PropertyBag::insert`]
    pub fn with(mut self, name: &str, value: impl Into<PropertyValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.values.get(&name.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Parses `LIT=true,CANDLES=1`; an entry without `=` is a true flag
impl FromStr for PropertyBag {
    type Err = ConditionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bag = Self::new();
        let mut offset = 0;
        for entry in s.split(',') {
            let trimmed = entry.trim();
            if !trimmed.is_empty() {
                let (name, value) = match trimmed.split_once('=') {
                    Some((name, value)) => (name.trim(), PropertyValue::parse_literal(value)),
                    None => (trimmed, PropertyValue::Bool(true)),
                };
                if name.is_empty() || !name.chars().all(is_name_char) {
                    return Err(ConditionError::UnexpectedToken {
                        token: trimmed.to_string(),
                        offset,
                        expected: "`NAME=value`",
                    });
                }
                bag.insert(name, value);
            }
            offset += entry.len() + 1;
        }
        Ok(bag)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Predicate {
    Flag(String),
    Equals(String, PropertyValue),
    NotEquals(String, PropertyValue),
    Not(Box<Predicate>),
    And(Box<Predicate>, Box<Predicate>),
    Or(Box<Predicate>, Box<Predicate>),
}

impl Predicate {
    fn evaluate(&self, bag: &PropertyBag) -> bool {
        match self {
            Self::Flag(name) => matches!(bag.get(name), Some(PropertyValue::Bool(true))),
            Self::Equals(name, expected) => bag.get(name).is_some_and(|v| v.matches(expected)),
            Self::NotEquals(name, expected) => !bag.get(name).is_some_and(|v| v.matches(expected)),
            Self::Not(inner) => !inner.evaluate(bag),
            Self::And(l, r) => l.evaluate(bag) && r.evaluate(bag),
            Self::Or(l, r) => l.evaluate(bag) || r.evaluate(bag),
        }
    }

    fn collect_names<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Flag(name) | Self::Equals(name, _) | Self::NotEquals(name, _) => {
                if !out.contains(&name.as_str()) {
                    out.push(name);
                }
            }
            Self::Not(inner) => inner.collect_names(out),
            Self::And(l, r) | Self::Or(l, r) => {
                l.collect_names(out);
                r.collect_names(out);
            }
        }
    }
}

/// A parsed block-state predicate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    source: String,
    root: Predicate,
}

impl Condition {
    /// Parse a predicate; malformed input is an error with the offending offset
    pub fn parse(source: &str) -> Result<Self, ConditionError> {
        let tokens = lex(source)?;
        if let Some(token) = tokens.get(MAX_TOKENS) {
            return Err(ConditionError::TooLong {
                token: source[token.offset..token.offset + token.len].to_string(),
                offset: token.offset,
                limit: MAX_TOKENS,
            });
        }
        let mut parser = CondParser {
            source,
            tokens,
            pos: 0,
            depth: 0,
        };
        let root = parser.parse_or()?;
        if parser.peek().kind != Tok::End {
            return Err(parser.unexpected("`&&`, `||` or end of input"));
        }
        Ok(Self {
            source: source.to_string(),
            root,
        })
    }

    /// Evaluate against `bag`, short-circuiting left to right
    pub fn evaluate(&self, bag: &PropertyBag) -> bool {
        self.root.evaluate(bag)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Lowercase property names referenced, in first-use order
    pub fn property_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.root.collect_names(&mut names);
        names
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl FromStr for Condition {
    type Err = ConditionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Tok {
    Word(String),
    Eq,
    Ne,
    Bang,
    And,
    Or,
    LParen,
    RParen,
    End,
}

#[derive(Debug, Clone)]
struct CondToken {
    kind: Tok,
    offset: usize,
    len: usize,
}

fn lex(source: &str) -> Result<Vec<CondToken>, ConditionError> {
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();

    while let Some((offset, c)) = chars.next() {
        if c.is_whitespace() {
            continue;
        }
        let next = chars.peek().map(|(_, n)| *n);
        let (kind, len) = match (c, next) {
            ('&', Some('&')) => (Tok::And, 2),
            ('|', Some('|')) => (Tok::Or, 2),
            ('=', Some('=')) | ('!', Some('=')) => {
                (if c == '=' { Tok::Eq } else { Tok::Ne }, 2)
            }
            ('=', _) => (Tok::Eq, 1),
            ('!', _) => (Tok::Bang, 1),
            ('(', _) => (Tok::LParen, 1),
            (')', _) => (Tok::RParen, 1),
            _ if is_name_char(c) => {
                let mut end = offset + c.len_utf8();
                while let Some((i, n)) = chars.peek().copied() {
                    if !is_name_char(n) {
                        break;
                    }
                    end = i + n.len_utf8();
                    chars.next();
                }
                tokens.push(CondToken {
                    kind: Tok::Word(source[offset..end].to_string()),
                    offset,
                    len: end - offset,
                });
                continue;
            }
            _ => {
                return Err(ConditionError::UnexpectedChar {
                    token: c.to_string(),
                    offset,
                });
            }
        };
        if len == 2 {
            chars.next();
        }
        tokens.push(CondToken { kind, offset, len });
    }

    tokens.push(CondToken {
        kind: Tok::End,
        offset: source.len(),
        len: 0,
    });
    Ok(tokens)
}

struct CondParser<'s> {
    source: &'s str,
    tokens: Vec<CondToken>,
    pos: usize,
    depth: usize,
}

impl CondParser<'_> {
    fn peek(&self) -> &CondToken {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> CondToken {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn unexpected(&self, expected: &'static str) -> ConditionError {
        let token = self.peek();
        let text = if token.kind == Tok::End {
            "<end of input>".to_string()
        } else {
            self.source[token.offset..token.offset + token.len].to_string()
        };
        ConditionError::UnexpectedToken {
            token: text,
            offset: token.offset,
            expected,
        }
    }

    fn parse_or(&mut self) -> Result<Predicate, ConditionError> {
        let mut left = self.parse_and()?;
        while self.peek().kind == Tok::Or {
            self.advance();
            let right = self.parse_and()?;
            left = Predicate::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Predicate, ConditionError> {
        let mut left = self.parse_unary()?;
        while self.peek().kind == Tok::And {
            self.advance();
            let right = self.parse_unary()?;
            left = Predicate::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Predicate, ConditionError> {
        if self.depth >= MAX_NESTING {
            let token = self.peek();
            return Err(ConditionError::TooDeep {
                token: self.source[token.offset..token.offset + token.len].to_string(),
                offset: token.offset,
                limit: MAX_NESTING,
            });
        }
        self.depth += 1;
        let result = self.unary();
        self.depth -= 1;
        result
    }

    fn unary(&mut self) -> Result<Predicate, ConditionError> {
        match self.peek().kind {
            Tok::Bang => {
                self.advance();
                Ok(Predicate::Not(Box::new(self.parse_unary()?)))
            }
            Tok::LParen => {
                self.advance();
                let inner = self.parse_or()?;
                if self.peek().kind != Tok::RParen {
                    return Err(self.unexpected("`)`"));
                }
                self.advance();
                Ok(inner)
            }
            _ => self.parse_comparison(),
        }
    }

    fn parse_comparison(&mut self) -> Result<Predicate, ConditionError> {
        let Tok::Word(name) = self.peek().kind.clone() else {
            return Err(self.unexpected("property name"));
        };
        self.advance();
        let negate = match self.peek().kind {
            Tok::Eq => false,
            Tok::Ne => true,
            _ => return Ok(Predicate::Flag(name.to_ascii_lowercase())),
        };
        self.advance();
        let Tok::Word(literal) = self.peek().kind.clone() else {
            return Err(self.unexpected("property value"));
        };
        self.advance();
        let name = name.to_ascii_lowercase();
        let value = PropertyValue::parse_literal(&literal);
        Ok(if negate {
            Predicate::NotEquals(name, value)
        } else {
            Predicate::Equals(name, value)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candles(lit: bool, count: i64) -> PropertyBag {
        PropertyBag::new().with("lit", lit).with("candles", count)
    }

    #[test]
    fn test_candle_condition() {
        let condition = Condition::parse("LIT && CANDLES=1").unwrap();
        assert!(condition.evaluate(&candles(true, 1)));
        assert!(!condition.evaluate(&candles(false, 1)));
        assert!(!condition.evaluate(&candles(true, 2)));
        assert_eq!(condition.property_names(), vec!["lit", "candles"]);
    }

    #[test]
    fn test_operators() {
        let bag = candles(false, 3).with("facing", "NORTH");
        assert!(Condition::parse("!LIT").unwrap().evaluate(&bag));
        assert!(Condition::parse("LIT || candles == 3").unwrap().evaluate(&bag));
        assert!(Condition::parse("facing=north").unwrap().evaluate(&bag));
        assert!(Condition::parse("CANDLES != 1 && (facing = south || !lit)").unwrap().evaluate(&bag));
    }

    #[test]
    fn test_missing_property() {
        let bag = PropertyBag::new();
        assert!(!Condition::parse("waterlogged").unwrap().evaluate(&bag));
        assert!(!Condition::parse("age=3").unwrap().evaluate(&bag));
        assert!(Condition::parse("age!=3").unwrap().evaluate(&bag));
    }

    #[test]
    fn test_nesting_and_length_limits() {
        let bag = candles(true, 1);
        let nested = format!("{}LIT{}", "(".repeat(50), ")".repeat(50));
        assert!(Condition::parse(&nested).unwrap().evaluate(&bag));
        assert!(Condition::parse(&format!("{}LIT", "!".repeat(100))).unwrap().evaluate(&bag));

        let err = Condition::parse(&format!("{}LIT", "!".repeat(300))).unwrap_err();
        assert_eq!(
            err,
            ConditionError::TooDeep {
                token: "!".to_string(),
                offset: 128,
                limit: 128,
            }
        );

        let err = Condition::parse(&format!("{}LIT{}", "(".repeat(200), ")".repeat(200))).unwrap_err();
        assert!(matches!(err, ConditionError::TooDeep { offset: 128, .. }), "{err}");

        let err = Condition::parse(&format!("{}LIT", "!".repeat(200_000))).unwrap_err();
        assert!(matches!(err, ConditionError::TooLong { limit: 1024, .. }), "{err}");
    }

    #[test]
    fn test_malformed_conditions() {
        let err = Condition::parse("LIT && ").unwrap_err();
        assert!(matches!(err, ConditionError::UnexpectedToken { offset: 7, .. }));

        let err = Condition::parse("LIT & CANDLES").unwrap_err();
        assert!(matches!(err, ConditionError::UnexpectedChar { offset: 4, .. }));

        assert!(Condition::parse("(LIT").is_err());
        assert!(Condition::parse("LIT CANDLES").is_err());
        assert!(Condition::parse("CANDLES=").is_err());
    }

    #[test]
    fn test_property_bag_from_str() {
        let bag: PropertyBag = "LIT=true, CANDLES=2,facing=east,powered".parse().unwrap();
        assert_eq!(bag.get("lit"), Some(&PropertyValue::Bool(true)));
        assert_eq!(bag.get("Candles"), Some(&PropertyValue::Int(2)));
        assert_eq!(bag.get("FACING"), Some(&PropertyValue::Text("east".to_string())));
        assert_eq!(bag.get("powered"), Some(&PropertyValue::Bool(true)));
        assert!("a b=1".parse::<PropertyBag>().is_err());
    }
}
