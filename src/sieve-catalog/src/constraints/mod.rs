//! Constraint knowledge used to simplify predicates.
//!
//! - [`ConstraintsDescription`]: the constraints as indexed CNF groups
//! - [`ComparisonGraph`]: equality and ordering facts from unit comparisons
//! - [`CompareResult`]: the relation known between two expressions

mod compare;
mod description;
mod graph;

pub use compare::CompareResult;
pub use description::{AtomId, ConstraintsDescription};
pub use graph::ComparisonGraph;
