//! WHERE clause optimizer for sieve queries.
//!
//! Simplifies predicates using the CHECK constraints recorded in the
//! [`Catalog`].
//!
//! ```
//! use std::sync::Arc;
//!
//! use sieve_catalog::{Catalog, TableMetadata};
//! use sieve_logical::{Expr, SelectQuery};
//!
//! let positive = Expr::build(|a| {
//!     let x = a.column("x");
//!     let zero = a.literal(0i64);
//!     a.gt(x, zero)
//! });
//! let mut catalog = Catalog::new();
//! catalog.register(
//!     TableMetadata::builder("t")
//!         .with_constraint("positive", positive.clone())
//!         .build()
//!         .unwrap(),
//! );
//!
//! let query = SelectQuery::new("t").with_selection(positive);
//! let optimized = sieve_optimizer::optimize(query, Arc::new(catalog)).unwrap();
//! assert_eq!(optimized.to_string(), "SELECT * FROM t");
//! ```

mod diagnostics;
mod rules;

pub use diagnostics::{DiagnosticSink, LogSink, NoopSink};
pub use rules::{
    ConstraintRewrite, EquivalentKeyAppender, IndexConstraintAppender, OptimizationRule,
    Optimizer, Transformed, WhereConstraintsOptimizer, WhereConstraintsRule,
};

use std::sync::Arc;

use common_config::SieveConfig;
use common_error::SieveResult;
use sieve_catalog::Catalog;
use sieve_logical::SelectQuery;

/// Optimize a query in a single pass using the default configuration.
pub fn optimize(query: SelectQuery, catalog: Arc<Catalog>) -> SieveResult<SelectQuery> {
    let optimizer = Optimizer::for_catalog(catalog, &SieveConfig::default());
    Ok(optimizer.optimize(query)?.query)
}
