//! Expression evaluation

pub mod expression;

pub use expression::{ExpressionEvaluator, ForwardRefs};
