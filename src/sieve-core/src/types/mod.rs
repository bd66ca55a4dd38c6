//! Type system for Sieve literal values.

mod value;

pub use value::Value;
