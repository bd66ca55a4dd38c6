//! Core data model for Sieve.
//!
//! This crate provides the literal [`Value`] carried by expression leaves and
//! the [`Row`] valuation predicates are evaluated against.

pub mod row;
pub mod types;

// Re-export commonly used types
pub use row::Row;
pub use types::Value;
