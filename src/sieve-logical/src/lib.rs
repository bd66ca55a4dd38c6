//! Logical layer for Sieve.
//!
//! `sieve-logical` provides the expression model that predicates and CHECK
//! constraints are written in, the conjunctive normal form those predicates
//! are rewritten through, and a row evaluator used to check rewrites.
//!
//! # Example
//!
//! ```rust
//! use sieve_logical::{CnfConverter, Expr};
//!
//! // (a AND b) OR c
//! let expr = Expr::build(|e| {
//!     let a = e.column("a");
//!     let b = e.column("b");
//!     let c = e.column("c");
//!     let ab = e.and(a, b);
//!     e.or(ab, c)
//! });
//!
//! let cnf = CnfConverter::default().to_cnf(expr.root());
//! assert_eq!(cnf.to_string(), "(a OR c) AND (b OR c)");
//! ```
//!
//! # Modules
//!
//! - [`expr`]: arena-backed expressions and operators
//! - [`cnf`]: CNF model, combinators and the converter
//! - [`eval`]: three-valued row evaluation

pub mod cnf;
pub mod eval;
pub mod expr;
mod query;

// Re-export commonly used types
pub use cnf::{AtomicFormula, CnfConverter, CnfQuery, OrGroup};
pub use eval::ExprEvaluator;
pub use expr::{BinaryOp, Expr, ExprArena, ExprId, ExprKind, ExprRef, Fingerprint, UnaryOp};
pub use query::SelectQuery;
