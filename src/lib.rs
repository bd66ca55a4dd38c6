//! Sieve - WHERE clause simplification driven by CHECK constraints.
//!
//! Sieve rewrites the WHERE clause of a query so that it keeps exactly the
//! same rows among those satisfying the table's constraints, while dropping
//! conditions the constraints already guarantee or rule out.

#![forbid(unsafe_code)]
#![allow(clippy::module_name_repetitions)]

// Re-export core crates
pub use common_config as config;
pub use common_error as error;
pub use sieve_catalog as catalog;
pub use sieve_core as core;
pub use sieve_logical as logical;
pub use sieve_optimizer as optimizer;

pub use sieve_optimizer::optimize;

/// Sieve version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
