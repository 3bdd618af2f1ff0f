//! Restricted arithmetic for `calculation` transformations.
//!
//! Grammar:
//!
//! ```text
//! expr   := term (('+' | '-') term)*
//! term   := factor (('*' | '/') factor)*
//! factor := ('-' | '+') factor | number | '{' field '}' | '(' expr ')'
//! ```
//!
//! Placeholders resolve against numeric fields of the mapped document.
//! Nothing else is evaluated.

use thiserror::Error;

use crate::models::MappedDocument;

/// Deepest allowed nesting of parentheses and unary signs.
pub const MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormulaError {
    #[error("unexpected character '{0}' at position {1}")]
    UnexpectedChar(char, usize),

    #[error("unexpected end of formula")]
    UnexpectedEnd,

    #[error("unknown field '{0}'")]
    UnknownField(String),

    #[error("field '{0}' is not numeric")]
    NotNumeric(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("result is not a finite number")]
    NotFinite,

    #[error("formula nests deeper than {0} levels")]
    TooDeep(usize),
}

/// Evaluate `formula` against `fields`.
pub fn evaluate(formula: &str, fields: &MappedDocument) -> Result<f64, FormulaError> {
    let mut parser = Parser {
        chars: formula.chars().collect(),
        pos: 0,
        depth: 0,
        fields,
    };
    let value = parser.expr()?;
    parser.skip_whitespace();
    if let Some(c) = parser.peek() {
        return Err(FormulaError::UnexpectedChar(c, parser.pos));
    }
    if value.is_finite() {
        Ok(value)
    } else {
        Err(FormulaError::NotFinite)
    }
}

struct Parser<'f> {
    chars: Vec<char>,
    pos: usize,
    depth: usize,
    fields: &'f MappedDocument,
}

impl Parser<'_> {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn expr(&mut self) -> Result<f64, FormulaError> {
        let mut value = self.term()?;
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some('+') => {
                    self.pos += 1;
                    value += self.term()?;
                }
                Some('-') => {
                    self.pos += 1;
                    value -= self.term()?;
                }
                _ => return Ok(value),
            }
        }
    }

    fn term(&mut self) -> Result<f64, FormulaError> {
        let mut value = self.factor()?;
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some('*') => {
                    self.pos += 1;
                    value *= self.factor()?;
                }
                Some('/') => {
                    self.pos += 1;
                    let divisor = self.factor()?;
                    if divisor == 0.0 {
                        return Err(FormulaError::DivisionByZero);
                    }
                    value /= divisor;
                }
                _ => return Ok(value),
            }
        }
    }

    fn factor(&mut self) -> Result<f64, FormulaError> {
        if self.depth >= MAX_DEPTH {
            return Err(FormulaError::TooDeep(MAX_DEPTH));
        }
        self.depth += 1;
        let value = self.nested_factor();
        self.depth -= 1;
        value
    }

    fn nested_factor(&mut self) -> Result<f64, FormulaError> {
        self.skip_whitespace();
        match self.peek() {
            None => Err(FormulaError::UnexpectedEnd),
            Some('-') => {
                self.pos += 1;
                Ok(-self.factor()?)
            }
            Some('+') => {
                self.pos += 1;
                self.factor()
            }
            Some('(') => {
                self.pos += 1;
                let value = self.expr()?;
                self.skip_whitespace();
                match self.peek() {
                    Some(')') => {
                        self.pos += 1;
                        Ok(value)
                    }
                    Some(c) => Err(FormulaError::UnexpectedChar(c, self.pos)),
                    None => Err(FormulaError::UnexpectedEnd),
                }
            }
            Some('{') => self.placeholder(),
            Some(c) if c.is_ascii_digit() || c == '.' => self.number(),
            Some(c) => Err(FormulaError::UnexpectedChar(c, self.pos)),
        }
    }

    fn number(&mut self) -> Result<f64, FormulaError> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit() || c == '.') {
            self.pos += 1;
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        text.parse::<f64>()
            .map_err(|_| FormulaError::UnexpectedChar(self.chars[start], start))
    }

    fn placeholder(&mut self) -> Result<f64, FormulaError> {
        // skip '{'
        self.pos += 1;
        let start = self.pos;
        while self.peek().is_some_and(|c| c != '}') {
            self.pos += 1;
        }
        if self.peek().is_none() {
            return Err(FormulaError::UnexpectedEnd);
        }
        let name: String = self.chars[start..self.pos].iter().collect::<String>().trim().to_string();
        self.pos += 1;

        let value = self
            .fields
            .get(&name)
            .ok_or_else(|| FormulaError::UnknownField(name.clone()))?;
        value.as_f64().ok_or(FormulaError::NotNumeric(name))
    }
}
