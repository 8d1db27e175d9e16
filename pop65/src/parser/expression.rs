//! Expression parsing for assembly operands

use std::fmt;

use super::lexer::Token;
use crate::error::{AsmError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    /// `<e`, low byte
    Lo,
    /// `>e`, high byte
    Hi,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Mul,
    Div,
    Mod,
    Add,
    Sub,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(u16),
    Symbol(String),
    CurrentPc, // * symbol
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
}

impl Expr {
    pub fn unary(op: UnaryOp, child: Expr) -> Self {
        Expr::Unary(op, Box::new(child))
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::Binary(op, Box::new(left), Box::new(right))
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(n) => write!(f, "${:X}", n),
            Expr::Symbol(name) => f.write_str(name),
            Expr::CurrentPc => f.write_str("*"),
            Expr::Unary(op, child) => {
                let sym = match op {
                    UnaryOp::Neg => "-",
                    UnaryOp::Lo => "<",
                    UnaryOp::Hi => ">",
                };
                write!(f, "{}{}", sym, child)
            }
            Expr::Binary(op, left, right) => {
                let sym = match op {
                    BinaryOp::Mul => "*",
                    BinaryOp::Div => "/",
                    BinaryOp::Mod => "%",
                    BinaryOp::Add => "+",
                    BinaryOp::Sub => "-",
                    BinaryOp::Lt => "<",
                    BinaryOp::Gt => ">",
                    BinaryOp::Le => "<=",
                    BinaryOp::Ge => ">=",
                    BinaryOp::Eq => "=",
                    BinaryOp::Ne => "<>",
                };
                write!(f, "({}{}{})", left, sym, right)
            }
        }
    }
}

/// Recursive-descent parser over a token slice.
///
/// Precedence, loosest first: leading negate, `* / %`, `+ -`, relational,
/// unary `<`/`>`, primary. A negate may only open a top-level or
/// parenthesized expression.
pub struct ExpressionParser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> ExpressionParser<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    /// Parse a whole token slice as a single expression.
    pub fn parse(tokens: &[Token]) -> Result<Expr> {
        let mut parser = ExpressionParser::new(tokens);
        let expr = parser.expression()?;
        parser.finish()?;
        Ok(expr)
    }

    pub fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    pub fn next_token(&mut self) -> Option<&'a Token> {
        let tok = self.tokens.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    /// Consume `tok` if it is next.
    pub fn eat(&mut self, tok: &Token) -> bool {
        if self.peek() == Some(tok) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    pub fn expect(&mut self, tok: &Token) -> Result<()> {
        match self.next_token() {
            Some(t) if t == tok => Ok(()),
            Some(t) => Err(AsmError::syntax(format!("expected '{}', found '{}'", tok, t))),
            None => Err(AsmError::syntax(format!("expected '{}'", tok))),
        }
    }

    /// Fail unless every token was consumed.
    pub fn finish(&self) -> Result<()> {
        match self.peek() {
            None => Ok(()),
            Some(t) => Err(AsmError::syntax(format!("unexpected '{}'", t))),
        }
    }

    pub fn expression(&mut self) -> Result<Expr> {
        if self.eat(&Token::Minus) {
            let child = self.expression()?;
            return Ok(Expr::unary(UnaryOp::Neg, child));
        }
        self.multiplicative()
    }

    fn multiplicative(&mut self) -> Result<Expr> {
        let mut left = self.additive()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                Some(Token::Percent) => BinaryOp::Mod,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.additive()?;
            left = Expr::binary(op, left, right);
        }
    }

    fn additive(&mut self) -> Result<Expr> {
        let mut left = self.relational()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.relational()?;
            left = Expr::binary(op, left, right);
        }
    }

    fn relational(&mut self) -> Result<Expr> {
        let mut left = self.byte_select()?;
        loop {
            let op = match self.peek() {
                Some(Token::Less) => BinaryOp::Lt,
                Some(Token::Greater) => BinaryOp::Gt,
                Some(Token::LessEq) => BinaryOp::Le,
                Some(Token::GreaterEq) => BinaryOp::Ge,
                Some(Token::Equal) => BinaryOp::Eq,
                Some(Token::NotEqual) => BinaryOp::Ne,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.byte_select()?;
            left = Expr::binary(op, left, right);
        }
    }

    fn byte_select(&mut self) -> Result<Expr> {
        if self.eat(&Token::Less) {
            return Ok(Expr::unary(UnaryOp::Lo, self.byte_select()?));
        }
        if self.eat(&Token::Greater) {
            return Ok(Expr::unary(UnaryOp::Hi, self.byte_select()?));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr> {
        match self.next_token() {
            Some(Token::Number(n)) => Ok(Expr::Number(*n)),
            Some(Token::Str(s)) => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(Expr::Number(c as u32 as u16)),
                    _ => Err(AsmError::syntax(format!(
                        "string \"{}\" is not a single character",
                        s
                    ))),
                }
            }
            Some(Token::Ident(name)) => Ok(Expr::Symbol(name.clone())),
            Some(Token::Star) => Ok(Expr::CurrentPc),
            Some(Token::LParen) => {
                let inner = self.expression()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Some(t) => Err(AsmError::syntax(format!("unexpected '{}' in expression", t))),
            None => Err(AsmError::syntax("missing expression")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::parser::lexer::tokenize;

    fn parse(s: &str) -> Result<Expr> {
        ExpressionParser::parse(&tokenize(s).unwrap())
    }

    fn num(n: u16) -> Expr {
        Expr::Number(n)
    }

    #[test]
    fn test_primaries() {
        assert_eq!(parse("$FF").unwrap(), num(255));
        assert_eq!(parse("'3'").unwrap(), num(0x33));
        assert_eq!(parse("\"9\"").unwrap(), num(0x39));
        assert_eq!(parse("LABEL").unwrap(), Expr::Symbol("LABEL".to_string()));
        assert_eq!(parse("*").unwrap(), Expr::CurrentPc);
    }

    #[test]
    fn test_multiplicative_is_looser_than_additive() {
        // 1+2*3 groups as (1+2)*3
        assert_eq!(
            parse("1+2*3").unwrap(),
            Expr::binary(BinaryOp::Mul, Expr::binary(BinaryOp::Add, num(1), num(2)), num(3))
        );
    }

    #[test]
    fn test_left_associative() {
        assert_eq!(
            parse("10-2-3").unwrap(),
            Expr::binary(BinaryOp::Sub, Expr::binary(BinaryOp::Sub, num(10), num(2)), num(3))
        );
    }

    #[test]
    fn test_relational_is_tighter_than_additive() {
        // 1+2=2 groups as 1+(2=2)
        assert_eq!(
            parse("1+2=2").unwrap(),
            Expr::binary(BinaryOp::Add, num(1), Expr::binary(BinaryOp::Eq, num(2), num(2)))
        );
    }

    #[test]
    fn test_hi_lo_bind_tightest() {
        assert_eq!(
            parse(">$1234+1").unwrap(),
            Expr::binary(BinaryOp::Add, Expr::unary(UnaryOp::Hi, num(0x1234)), num(1))
        );
        assert_eq!(
            parse("<<$1234").unwrap(),
            Expr::unary(UnaryOp::Lo, Expr::unary(UnaryOp::Lo, num(0x1234)))
        );
    }

    #[test]
    fn test_negate_binds_whole_expression() {
        assert_eq!(
            parse("-1+2").unwrap(),
            Expr::unary(UnaryOp::Neg, Expr::binary(BinaryOp::Add, num(1), num(2)))
        );
        assert_eq!(
            parse("2*(-1)").unwrap(),
            Expr::binary(BinaryOp::Mul, num(2), Expr::unary(UnaryOp::Neg, num(1)))
        );
    }

    #[test]
    fn test_negate_not_allowed_inside() {
        assert_eq!(parse("1+-1").unwrap_err().kind(), ErrorKind::Syntax);
    }

    #[test]
    fn test_pc_relative() {
        assert_eq!(
            parse("*-2").unwrap(),
            Expr::binary(BinaryOp::Sub, Expr::CurrentPc, num(2))
        );
        assert_eq!(
            parse("**2").unwrap(),
            Expr::binary(BinaryOp::Mul, Expr::CurrentPc, num(2))
        );
    }

    #[test]
    fn test_errors() {
        assert_eq!(parse("").unwrap_err().kind(), ErrorKind::Syntax);
        assert_eq!(parse("(1+2").unwrap_err().kind(), ErrorKind::Syntax);
        assert_eq!(parse("1 2").unwrap_err().kind(), ErrorKind::Syntax);
        assert_eq!(parse("\"ab\"").unwrap_err().kind(), ErrorKind::Syntax);
    }

    #[test]
    fn test_stops_at_comma() {
        let toks = tokenize("1+2, 3").unwrap();
        let mut parser = ExpressionParser::new(&toks);
        assert_eq!(
            parser.expression().unwrap(),
            Expr::binary(BinaryOp::Add, num(1), num(2))
        );
        assert!(parser.eat(&Token::Comma));
        assert_eq!(parser.expression().unwrap(), num(3));
        assert!(parser.finish().is_ok());
    }
}
