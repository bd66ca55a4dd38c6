//! Error types and result aliases for Sieve.
//!
//! Every crate in the workspace reports failures through [`SieveError`].

mod error;

pub use error::{GenericError, SieveError, SieveResult};
