//! Addressing mode detection and handling

use std::fmt;

use crate::error::{AsmError, Result};
use crate::parser::expression::{Expr, ExpressionParser};
use crate::parser::lexer::Token;

/// A 6502 addressing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AddrMode {
    Imp,
    Imm,
    Zp,
    ZpX,
    ZpY,
    Abs,
    AbsX,
    AbsY,
    Ind,
    IndX,
    IndY,
    Rel,
}

impl AddrMode {
    /// Instruction length in bytes, opcode included.
    pub fn size(self) -> u16 {
        match self {
            AddrMode::Imp => 1,
            AddrMode::Abs | AddrMode::AbsX | AddrMode::AbsY | AddrMode::Ind => 3,
            _ => 2,
        }
    }
}

impl fmt::Display for AddrMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AddrMode::Imp => "implied",
            AddrMode::Imm => "immediate",
            AddrMode::Zp => "zeropage",
            AddrMode::ZpX => "zeropage,X",
            AddrMode::ZpY => "zeropage,Y",
            AddrMode::Abs => "absolute",
            AddrMode::AbsX => "absolute,X",
            AddrMode::AbsY => "absolute,Y",
            AddrMode::Ind => "indirect",
            AddrMode::IndX => "indirect,X",
            AddrMode::IndY => "indirect,Y",
            AddrMode::Rel => "relative",
        };
        f.write_str(name)
    }
}

/// The syntactic shape of an instruction operand.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Implied,
    Immediate(Expr),
    Direct(Expr),
    IndexedX(Expr),
    IndexedY(Expr),
    Indirect(Expr),
    IndirectX(Expr),
    IndirectY(Expr),
}

impl Operand {
    /// Classify operand tokens by shape and parse the expression inside.
    pub fn classify(tokens: &[Token]) -> Result<Self> {
        match tokens {
            [] => return Ok(Operand::Implied),
            [Token::Hash, rest @ ..] => {
                return Ok(Operand::Immediate(ExpressionParser::parse(rest)?));
            }
            [Token::LParen, ..] => {
                if let Some(close) = matching_paren(tokens) {
                    let inner = &tokens[1..close];
                    let after = &tokens[close + 1..];
                    if after.is_empty() {
                        return Ok(match split_index(inner) {
                            Some((base, 'x')) => Operand::IndirectX(ExpressionParser::parse(base)?),
                            Some((_, reg)) => {
                                return Err(AsmError::syntax(format!(
                                    "indexed indirect only takes x, not {}",
                                    reg
                                )));
                            }
                            None => Operand::Indirect(ExpressionParser::parse(inner)?),
                        });
                    }
                    if let Some((&[], 'y')) = split_index(after) {
                        return Ok(Operand::IndirectY(ExpressionParser::parse(inner)?));
                    }
                }
            }
            _ => {}
        }
        Ok(match split_index(tokens) {
            Some((base, 'x')) => Operand::IndexedX(ExpressionParser::parse(base)?),
            Some((base, _)) => Operand::IndexedY(ExpressionParser::parse(base)?),
            None => Operand::Direct(ExpressionParser::parse(tokens)?),
        })
    }

    pub fn expr(&self) -> Option<&Expr> {
        match self {
            Operand::Implied => None,
            Operand::Immediate(e)
            | Operand::Direct(e)
            | Operand::IndexedX(e)
            | Operand::IndexedY(e)
            | Operand::Indirect(e)
            | Operand::IndirectX(e)
            | Operand::IndirectY(e) => Some(e),
        }
    }
}

/// Index of the `)` closing the `(` at position 0.
fn matching_paren(tokens: &[Token]) -> Option<usize> {
    let mut depth = 0usize;
    for (i, tok) in tokens.iter().enumerate() {
        match tok {
            Token::LParen => depth += 1,
            Token::RParen => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split a trailing `,x` or `,y` off the tokens.
fn split_index(tokens: &[Token]) -> Option<(&[Token], char)> {
    match tokens {
        [base @ .., Token::Comma, Token::Ident(reg)] => match reg.to_ascii_lowercase().as_str() {
            "x" => Some((base, 'x')),
            "y" => Some((base, 'y')),
            _ => None,
        },
        _ => None,
    }
}
