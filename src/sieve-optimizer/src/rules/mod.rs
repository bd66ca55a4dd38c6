//! Optimization rules for WHERE clauses.
//!
//! # Rewrite Safety
//!
//! A rewrite is legal if, for every row satisfying the table's constraints,
//! the rewritten WHERE clause filters the row exactly as the original does.
//! Three-valued logic is taken into account: a row is kept only when the
//! predicate is TRUE, so FALSE and NULL outcomes are interchangeable.

mod index_constraints;
mod optimizer;
mod rule;
mod where_constraints;

pub use index_constraints::{EquivalentKeyAppender, IndexConstraintAppender};
pub use optimizer::Optimizer;
pub use rule::{OptimizationRule, Transformed};
pub use where_constraints::{ConstraintRewrite, WhereConstraintsOptimizer, WhereConstraintsRule};
