//! Expression evaluation with symbol resolution

use crate::error::{AsmError, ErrorKind, Result};
use crate::parser::expression::{BinaryOp, Expr, UnaryOp};
use crate::symbol::{Pass, SymbolTable};

/// Whether an expression may name symbols not yet defined in this pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardRefs {
    Allow,
    /// Used where the value decides sizes or addresses (`.if`, `.org`,
    /// `.ds` count, assignments, zero-page selection).
    Forbid,
}

pub struct ExpressionEvaluator<'a> {
    symbols: &'a SymbolTable,
    pc: Option<u16>,
    pass: Pass,
    forward: ForwardRefs,
}

impl<'a> ExpressionEvaluator<'a> {
    pub fn new(symbols: &'a SymbolTable, pc: Option<u16>, pass: Pass) -> Self {
        Self {
            symbols,
            pc,
            pass,
            forward: ForwardRefs::Allow,
        }
    }

    pub fn with_forward_refs(mut self, forward: ForwardRefs) -> Self {
        self.forward = forward;
        self
    }

    /// Evaluate an expression to a u16 value. Arithmetic wraps.
    pub fn evaluate(&self, expr: &Expr) -> Result<u16> {
        match expr {
            Expr::Number(n) => Ok(*n),

            Expr::Symbol(name) => {
                if self.forward == ForwardRefs::Forbid
                    && self.symbols.get(name).is_some()
                    && !self.symbols.is_defined_in(name, self.pass)
                {
                    return Err(AsmError::new(
                        ErrorKind::UndefinedSymbol,
                        format!("'{}' is a forward reference, not allowed here", name),
                    ));
                }
                self.symbols.lookup(name)
            }

            Expr::CurrentPc => self
                .pc
                .ok_or_else(|| AsmError::new(ErrorKind::NoOrigin, "'*' used before .org")),

            Expr::Unary(op, child) => {
                let v = self.evaluate(child)?;
                Ok(match op {
                    UnaryOp::Neg => v.wrapping_neg(),
                    UnaryOp::Lo => v & 0xFF,
                    UnaryOp::Hi => v >> 8,
                })
            }

            Expr::Binary(op, left, right) => {
                let l = self.evaluate(left)?;
                let r = self.evaluate(right)?;
                let flag = |b: bool| b as u16;
                Ok(match op {
                    BinaryOp::Add => l.wrapping_add(r),
                    BinaryOp::Sub => l.wrapping_sub(r),
                    BinaryOp::Mul => l.wrapping_mul(r),
                    BinaryOp::Div | BinaryOp::Mod if r == 0 => {
                        return Err(AsmError::new(
                            ErrorKind::DivideByZero,
                            format!("{}", expr),
                        ));
                    }
                    BinaryOp::Div => l / r,
                    BinaryOp::Mod => l % r,
                    BinaryOp::Lt => flag(l < r),
                    BinaryOp::Gt => flag(l > r),
                    BinaryOp::Le => flag(l <= r),
                    BinaryOp::Ge => flag(l >= r),
                    BinaryOp::Eq => flag(l == r),
                    BinaryOp::Ne => flag(l != r),
                })
            }
        }
    }

    /// Evaluate, returning None on any failure such as a forward reference.
    pub fn try_evaluate(&self, expr: &Expr) -> Option<u16> {
        self.evaluate(expr).ok()
    }
}
