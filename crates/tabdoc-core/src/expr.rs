//! Arithmetic expression evaluation
//!
//! Number and Byte conversion, arity suffixes and the `{1 + 2}` interpolation
//! shortcut all go through the [`Evaluator`] trait. The default
//! implementation, [`Arithmetic`], is a recursive-descent evaluator over:
//!
//! ```text
//! expr   := term (('+' | '-') term)*
//! term   := unary (('*' | '/' | '%') unary)*
//! unary  := ('-' | '+') unary | power
//! power  := atom ('**' unary)?
//! atom   := number | '(' expr ')' | ident '(' expr (',' expr)* ')'
//! ```
//!
//! Functions: `abs ceil floor round sqrt min max pow`.
//! There are no variables or constants, so a bare name is never an expression.

use crate::{Error, Result};

/// External arithmetic collaborator
pub trait Evaluator {
    fn evaluate(&self, expression: &str) -> Result<f64>;

    /// Whether `expression` evaluates without error
    fn accepts(&self, expression: &str) -> bool {
        self.evaluate(expression).is_ok()
    }
}

/// Default arithmetic evaluator
#[derive(Debug, Clone, Copy, Default)]
pub struct Arithmetic;

impl Evaluator for Arithmetic {
    fn evaluate(&self, expression: &str) -> Result<f64> {
        let tokens = Lexer::new(expression).tokenize()?;
        let mut parser = Parser { tokens, position: 0 };
        let value = parser.expr()?;
        if parser.peek() != &Token::Eof {
            return Err(Error::Expression(format!(
                "unexpected trailing input in '{}'",
                expression
            )));
        }
        if !value.is_finite() {
            return Err(Error::Expression(format!(
                "'{}' does not evaluate to a finite number",
                expression
            )));
        }
        Ok(value)
    }
}

// ── Lexer ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    StarStar,
    Slash,
    Percent,
    LParen,
    RParen,
    Comma,
    Eof,
}

struct Lexer {
    input: Vec<char>,
    position: usize,
}

impl Lexer {
    fn new(text: &str) -> Self {
        Lexer {
            input: text.chars().collect(),
            position: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_ahead(&self, n: usize) -> Option<char> {
        self.input.get(self.position + n).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.position += 1;
        Some(ch)
    }

    fn tokenize(&mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            while self.peek().is_some_and(char::is_whitespace) {
                self.advance();
            }
            let Some(ch) = self.peek() else {
                tokens.push(Token::Eof);
                break;
            };
            let token = match ch {
                '0'..='9' | '.' => self.read_number()?,
                'a'..='z' | 'A'..='Z' | '_' => self.read_ident(),
                '*' if self.peek_ahead(1) == Some('*') => {
                    self.position += 2;
                    Token::StarStar
                }
                _ => {
                    self.advance();
                    match ch {
                        '+' => Token::Plus,
                        '-' => Token::Minus,
                        '*' => Token::Star,
                        '/' => Token::Slash,
                        '%' => Token::Percent,
                        '(' => Token::LParen,
                        ')' => Token::RParen,
                        ',' => Token::Comma,
                        other => {
                            return Err(Error::Expression(format!(
                                "unexpected character '{}'",
                                other
                            )))
                        }
                    }
                }
            };
            tokens.push(token);
        }
        Ok(tokens)
    }

    fn read_number(&mut self) -> Result<Token> {
        let start = self.position;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
        if self.peek() == Some('.') {
            self.advance();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }
        // exponent only when digits follow, so "2e" stays an error
        if matches!(self.peek(), Some('e' | 'E')) {
            let signed = matches!(self.peek_ahead(1), Some('+' | '-'));
            let digit_at = if signed { 2 } else { 1 };
            if self.peek_ahead(digit_at).is_some_and(|c| c.is_ascii_digit()) {
                self.position += digit_at;
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.advance();
                }
            }
        }
        let text: String = self.input[start..self.position].iter().collect();
        text.parse::<f64>()
            .map(Token::Number)
            .map_err(|_| Error::Expression(format!("invalid number '{}'", text)))
    }

    fn read_ident(&mut self) -> Token {
        let start = self.position;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            self.advance();
        }
        Token::Ident(self.input[start..self.position].iter().collect())
    }
}

// ── Parser ────────────────────────────────────────────────

struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        self.tokens.get(self.position).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        self.position += 1;
        token
    }

    fn expect(&mut self, expected: Token) -> Result<()> {
        let found = self.advance();
        if found == expected {
            Ok(())
        } else {
            Err(Error::Expression(format!(
                "expected {:?}, found {:?}",
                expected, found
            )))
        }
    }

    fn expr(&mut self) -> Result<f64> {
        let mut value = self.term()?;
        loop {
            match self.peek() {
                Token::Plus => {
                    self.advance();
                    value += self.term()?;
                }
                Token::Minus => {
                    self.advance();
                    value -= self.term()?;
                }
                _ => return Ok(value),
            }
        }
    }

    fn term(&mut self) -> Result<f64> {
        let mut value = self.unary()?;
        loop {
            match self.peek() {
                Token::Star => {
                    self.advance();
                    value *= self.unary()?;
                }
                Token::Slash => {
                    self.advance();
                    let divisor = self.unary()?;
                    if divisor == 0.0 {
                        return Err(Error::Expression("division by zero".into()));
                    }
                    value /= divisor;
                }
                Token::Percent => {
                    self.advance();
                    let divisor = self.unary()?;
                    if divisor == 0.0 {
                        return Err(Error::Expression("modulo by zero".into()));
                    }
                    value %= divisor;
                }
                _ => return Ok(value),
            }
        }
    }

    fn unary(&mut self) -> Result<f64> {
        match self.peek() {
            Token::Minus => {
                self.advance();
                Ok(-self.unary()?)
            }
            Token::Plus => {
                self.advance();
                self.unary()
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> Result<f64> {
        let base = self.atom()?;
        if self.peek() == &Token::StarStar {
            self.advance();
            let exponent = self.unary()?;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    fn atom(&mut self) -> Result<f64> {
        match self.advance() {
            Token::Number(n) => Ok(n),
            Token::LParen => {
                let value = self.expr()?;
                self.expect(Token::RParen)?;
                Ok(value)
            }
            Token::Ident(name) => {
                self.expect(Token::LParen)?;
                let mut args = vec![self.expr()?];
                while self.peek() == &Token::Comma {
                    self.advance();
                    args.push(self.expr()?);
                }
                self.expect(Token::RParen)?;
                call(&name, &args)
            }
            other => Err(Error::Expression(format!("unexpected token {:?}", other))),
        }
    }
}

fn call(name: &str, args: &[f64]) -> Result<f64> {
    let arity = |n: usize| -> Result<()> {
        if args.len() == n {
            Ok(())
        } else {
            Err(Error::Expression(format!(
                "{}() takes {} argument(s), got {}",
                name,
                n,
                args.len()
            )))
        }
    };
    match name {
        "abs" => arity(1).map(|_| args[0].abs()),
        "ceil" => arity(1).map(|_| args[0].ceil()),
        "floor" => arity(1).map(|_| args[0].floor()),
        "round" => arity(1).map(|_| args[0].round()),
        "sqrt" => arity(1).map(|_| args[0].sqrt()),
        "pow" => arity(2).map(|_| args[0].powf(args[1])),
        "min" => Ok(args.iter().copied().fold(f64::INFINITY, f64::min)),
        "max" => Ok(args.iter().copied().fold(f64::NEG_INFINITY, f64::max)),
        other => Err(Error::Expression(format!("unknown function '{}'", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(text: &str) -> f64 {
        Arithmetic.evaluate(text).unwrap()
    }

    #[test]
    fn test_precedence() {
        assert_eq!(eval("1 + 2 * 3"), 7.0);
        assert_eq!(eval("(1 + 2) * 3"), 9.0);
        assert_eq!(eval("2 ** 3 ** 2"), 512.0);
        assert_eq!(eval("-2 ** 2"), -4.0);
        assert_eq!(eval("10 % 4"), 2.0);
        assert_eq!(eval("7 / 2"), 3.5);
    }

    #[test]
    fn test_literals() {
        assert_eq!(eval("42"), 42.0);
        assert_eq!(eval(".5"), 0.5);
        assert_eq!(eval("1e3"), 1000.0);
        assert_eq!(eval("2.5E-1"), 0.25);
    }

    #[test]
    fn test_functions() {
        assert_eq!(eval("max(1, 5, 3)"), 5.0);
        assert_eq!(eval("min(4, -1)"), -1.0);
        assert_eq!(eval("sqrt(16) + abs(-2)"), 6.0);
        assert_eq!(eval("pow(2, 10)"), 1024.0);
        assert_eq!(eval("round(2.6)"), 3.0);
    }

    #[test]
    fn test_rejects_non_expressions() {
        for text in ["", "a", "a.b", "\"5\"", "1 +", "5 KB", "0x1f", "unknown(1)", "1 / 0", "(1"] {
            assert!(!Arithmetic.accepts(text), "accepted {:?}", text);
        }
    }
}
