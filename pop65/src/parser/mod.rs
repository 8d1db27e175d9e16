//! Parser module for assembly source

pub mod expression;
pub mod lexer;
pub mod number;

pub use expression::{BinaryOp, Expr, ExpressionParser, UnaryOp};
pub use lexer::{conditional_keyword, parse_line, Conditional, Operation, SourceLine, Token};
