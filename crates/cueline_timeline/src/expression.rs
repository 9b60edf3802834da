// SPDX-License-Identifier: MIT OR Apache-2.0
//! Enable expressions.
//!
//! Grammar:
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/') unary)*
//! unary   := '-' unary | primary
//! primary := number | 'now' | '#' id '.' ('start' | 'end' | 'duration') | '(' expr ')'
//! ```

use crate::element::{ElementId, Time};
use std::collections::BTreeSet;
use std::fmt;

/// Property of a referenced element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceProperty {
    /// Start of the first instance
    Start,
    /// End of the first instance
    End,
    /// Duration of the first instance
    Duration,
}

impl ReferenceProperty {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "start" => Some(Self::Start),
            "end" => Some(Self::End),
            "duration" => Some(Self::Duration),
            _ => None,
        }
    }

    /// Name as written in expressions
    pub fn name(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::End => "end",
            Self::Duration => "duration",
        }
    }
}

/// Binary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
}

/// Parsed enable expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Numeric literal in milliseconds
    Number(f64),
    /// The resolver's anchor time
    Now,
    /// Property of another element
    Reference {
        /// Referenced element
        element: ElementId,
        /// Referenced property
        property: ReferenceProperty,
    },
    /// Unary minus
    Negate(Box<Expression>),
    /// Binary operation
    Binary {
        /// Operator
        op: BinaryOp,
        /// Left operand
        left: Box<Expression>,
        /// Right operand
        right: Box<Expression>,
    },
}

/// Why a reference could not produce a value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unresolvable {
    /// The referenced element does not exist
    MissingElement(ElementId),
    /// The referenced element never ends
    OpenEnded(ElementId),
    /// The expression evaluated to infinity or NaN
    NotFinite,
}

impl fmt::Display for Unresolvable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingElement(id) => write!(f, "element #{id} does not exist"),
            Self::OpenEnded(id) => write!(f, "element #{id} is open-ended"),
            Self::NotFinite => f.write_str("result is not a finite number"),
        }
    }
}

/// Expression text that could not be parsed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} at offset {offset}")]
pub struct SyntaxError {
    /// Byte offset of the problem
    pub offset: usize,
    /// What went wrong
    pub message: String,
}

impl Expression {
    /// Parse expression text
    pub fn parse(text: &str) -> Result<Self, SyntaxError> {
        let mut parser = Parser { text, pos: 0 };
        let expression = parser.expr()?;
        parser.skip_whitespace();
        if parser.pos < text.len() {
            return Err(parser.error("unexpected trailing input"));
        }
        Ok(expression)
    }

    /// Elements referenced anywhere in the expression
    pub fn references(&self) -> BTreeSet<ElementId> {
        let mut out = BTreeSet::new();
        self.collect_references(&mut out);
        out
    }

    fn collect_references(&self, out: &mut BTreeSet<ElementId>) {
        match self {
            Self::Number(_) | Self::Now => {}
            Self::Reference { element, .. } => {
                out.insert(element.clone());
            }
            Self::Negate(inner) => inner.collect_references(out),
            Self::Binary { left, right, .. } => {
                left.collect_references(out);
                right.collect_references(out);
            }
        }
    }

    /// Evaluate to whole milliseconds.
    ///
    /// `lookup` supplies the value of a referenced property.
    pub fn evaluate<F>(&self, now: Time, lookup: &F) -> Result<Time, Unresolvable>
    where
        F: Fn(&ElementId, ReferenceProperty) -> Result<Time, Unresolvable>,
    {
        let value = self.evaluate_f64(now, lookup)?;
        if !value.is_finite() {
            return Err(Unresolvable::NotFinite);
        }
        Ok(value.round() as Time)
    }

    fn evaluate_f64<F>(&self, now: Time, lookup: &F) -> Result<f64, Unresolvable>
    where
        F: Fn(&ElementId, ReferenceProperty) -> Result<Time, Unresolvable>,
    {
        Ok(match self {
            Self::Number(value) => *value,
            Self::Now => now as f64,
            Self::Reference { element, property } => lookup(element, *property)? as f64,
            Self::Negate(inner) => -inner.evaluate_f64(now, lookup)?,
            Self::Binary { op, left, right } => {
                let l = left.evaluate_f64(now, lookup)?;
                let r = right.evaluate_f64(now, lookup)?;
                match op {
                    BinaryOp::Add => l + r,
                    BinaryOp::Sub => l - r,
                    BinaryOp::Mul => l * r,
                    BinaryOp::Div => l / r,
                }
            }
        })
    }
}

struct Parser<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn error(&self, message: &str) -> SyntaxError {
        SyntaxError {
            offset: self.pos,
            message: message.to_string(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(&pred) {
            self.bump();
        }
        &self.text[start..self.pos]
    }

    fn expr(&mut self) -> Result<Expression, SyntaxError> {
        let mut left = self.term()?;
        loop {
            self.skip_whitespace();
            let op = match self.peek() {
                Some('+') => BinaryOp::Add,
                Some('-') => BinaryOp::Sub,
                _ => return Ok(left),
            };
            self.bump();
            let right = self.term()?;
            left = Expression::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
    }

    fn term(&mut self) -> Result<Expression, SyntaxError> {
        let mut left = self.unary()?;
        loop {
            self.skip_whitespace();
            let op = match self.peek() {
                Some('*') => BinaryOp::Mul,
                Some('/') => BinaryOp::Div,
                _ => return Ok(left),
            };
            self.bump();
            let right = self.unary()?;
            left = Expression::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
    }

    fn unary(&mut self) -> Result<Expression, SyntaxError> {
        self.skip_whitespace();
        if self.peek() == Some('-') {
            self.bump();
            return Ok(Expression::Negate(Box::new(self.unary()?)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expression, SyntaxError> {
        self.skip_whitespace();
        match self.peek() {
            Some('(') => {
                self.bump();
                let inner = self.expr()?;
                self.skip_whitespace();
                if self.bump() != Some(')') {
                    return Err(self.error("expected ')'"));
                }
                Ok(inner)
            }
            Some('#') => {
                self.bump();
                let id = self.take_while(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
                if id.is_empty() {
                    return Err(self.error("expected element id after '#'"));
                }
                if self.bump() != Some('.') {
                    return Err(self.error("expected '.' after element id"));
                }
                let name_offset = self.pos;
                let name = self.take_while(|c| c.is_ascii_alphabetic());
                let property = ReferenceProperty::parse(name).ok_or_else(|| SyntaxError {
                    offset: name_offset,
                    message: format!("unknown property '{name}'"),
                })?;
                Ok(Expression::Reference {
                    element: ElementId::new(id),
                    property,
                })
            }
            Some(c) if c.is_ascii_digit() || c == '.' => {
                let start = self.pos;
                let digits = self.take_while(|c| c.is_ascii_digit() || c == '.');
                digits.parse::<f64>().map(Expression::Number).map_err(|_| SyntaxError {
                    offset: start,
                    message: format!("invalid number '{digits}'"),
                })
            }
            Some(c) if c.is_ascii_alphabetic() => {
                let start = self.pos;
                let word = self.take_while(|c| c.is_ascii_alphabetic());
                if word == "now" {
                    Ok(Expression::Now)
                } else {
                    Err(SyntaxError {
                        offset: start,
                        message: format!("unknown identifier '{word}'"),
                    })
                }
            }
            Some(_) => Err(self.error("unexpected character")),
            None => Err(self.error("unexpected end of expression")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_refs(id: &ElementId, _: ReferenceProperty) -> Result<Time, Unresolvable> {
        Err(Unresolvable::MissingElement(id.clone()))
    }

    #[test]
    fn test_parse_reference() {
        let expression = Expression::parse("#intro.end").unwrap();
        assert_eq!(
            expression,
            Expression::Reference {
                element: ElementId::new("intro"),
                property: ReferenceProperty::End,
            }
        );
    }

    #[test]
    fn test_precedence() {
        let expression = Expression::parse("1 + 2 * 3 - (4 - 1)").unwrap();
        assert_eq!(expression.evaluate(0, &no_refs), Ok(4));
    }

    #[test]
    fn test_now_and_negate() {
        let expression = Expression::parse("now - -250").unwrap();
        assert_eq!(expression.evaluate(1000, &no_refs), Ok(1250));
    }

    #[test]
    fn test_references_collected() {
        let expression = Expression::parse("#a.end + #b.duration / 2 - #a.start").unwrap();
        let refs: Vec<String> = expression.references().into_iter().map(|id| id.0).collect();
        assert_eq!(refs, vec!["a", "b"]);
    }

    #[test]
    fn test_evaluate_with_lookup() {
        let expression = Expression::parse("#x.end + 500").unwrap();
        let lookup = |id: &ElementId, property: ReferenceProperty| {
            assert_eq!(id.as_str(), "x");
            assert_eq!(property, ReferenceProperty::End);
            Ok(5000)
        };
        assert_eq!(expression.evaluate(0, &lookup), Ok(5500));
    }

    #[test]
    fn test_division_by_zero_not_finite() {
        let expression = Expression::parse("10 / 0").unwrap();
        assert_eq!(expression.evaluate(0, &no_refs), Err(Unresolvable::NotFinite));
    }

    #[test]
    fn test_syntax_errors() {
        assert_eq!(Expression::parse("#x.middle").unwrap_err().offset, 3);
        assert!(Expression::parse("#.end").is_err());
        assert!(Expression::parse("(1 + 2").is_err());
        assert!(Expression::parse("1 2").is_err());
        assert!(Expression::parse("later").is_err());
        assert!(Expression::parse("").is_err());
    }

    #[test]
    fn test_rounding() {
        let expression = Expression::parse("10 / 4").unwrap();
        assert_eq!(expression.evaluate(0, &no_refs), Ok(3));
    }
}
