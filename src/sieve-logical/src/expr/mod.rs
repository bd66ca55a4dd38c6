//! Logical expression model.
//!
//! Expressions are stored in an [`ExprArena`] and addressed by [`ExprId`].
//! [`ExprRef`] is the borrowed read view used by every pass; [`Expr`] is an
//! owned tree that can be stored in a query or a constraint declaration.

mod arena;
mod ops;

pub use arena::{Expr, ExprArena, ExprId, ExprKind, ExprNode, ExprRef, Fingerprint};
pub use ops::{BinaryOp, UnaryOp, is_negative_function, negate_function};
