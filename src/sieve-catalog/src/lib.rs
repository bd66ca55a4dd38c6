//! Table metadata and constraint knowledge for Sieve.
//!
//! A table's CHECK constraints are converted once, when its
//! [`TableMetadata`] is built, into a [`ConstraintsDescription`]: the
//! constraints as CNF groups plus a [`ComparisonGraph`] of the equalities and
//! orderings they imply. Both are immutable and shared through `Arc` by every
//! query on the table.
//!
//! # Example
//!
//! ```rust
//! use sieve_catalog::{Catalog, CompareResult, TableMetadata};
//! use sieve_logical::Expr;
//!
//! let x_positive = Expr::build(|a| {
//!     let x = a.column("x");
//!     let zero = a.literal(0i64);
//!     a.gt(x, zero)
//! });
//! let metadata = TableMetadata::builder("t")
//!     .with_constraint("x_positive", x_positive)
//!     .build()
//!     .unwrap();
//!
//! let x = Expr::build(|a| a.column("x"));
//! let minus_one = Expr::literal(-1i64);
//! let graph = metadata.description().graph();
//! assert_eq!(graph.compare(x.root(), minus_one.root()), CompareResult::Greater);
//!
//! let mut catalog = Catalog::new();
//! catalog.register(metadata);
//! assert!(catalog.exists("t"));
//! ```

mod catalog;
pub mod constraints;
mod metadata;

// Re-export commonly used types
pub use catalog::Catalog;
pub use constraints::{AtomId, CompareResult, ComparisonGraph, ConstraintsDescription};
pub use metadata::{ConstraintDecl, SnapshotId, TableMetadata, TableMetadataBuilder};
