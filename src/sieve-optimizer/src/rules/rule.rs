//! The rule seam the [`Optimizer`](super::Optimizer) drives.

use common_error::SieveResult;
use sieve_logical::SelectQuery;

/// A rewrite of a query's WHERE clause.
///
/// A rewrite is legal only if, for every row satisfying the table's
/// constraints, the rewritten query selects exactly the rows the original
/// one does.
pub trait OptimizationRule: Send + Sync {
    fn name(&self) -> &'static str;

    fn apply(&self, query: SelectQuery) -> SieveResult<Transformed>;
}

/// A query after one rule, and whether the rule changed its WHERE clause.
#[derive(Debug, Clone)]
pub struct Transformed {
    pub query: SelectQuery,
    pub changed: bool,
}

impl Transformed {
    pub fn rewritten(query: SelectQuery) -> Self {
        Self {
            query,
            changed: true,
        }
    }

    pub fn unchanged(query: SelectQuery) -> Self {
        Self {
            query,
            changed: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sieve_logical::Expr;

    /// Drops the WHERE clause of queries on `scratch`.
    struct DropScratchFilter;

    impl OptimizationRule for DropScratchFilter {
        fn name(&self) -> &'static str {
            "DropScratchFilter"
        }

        fn apply(&self, mut query: SelectQuery) -> SieveResult<Transformed> {
            if query.table != "scratch" || query.selection.is_none() {
                return Ok(Transformed::unchanged(query));
            }
            query.selection = None;
            Ok(Transformed::rewritten(query))
        }
    }

    #[test]
    fn test_rule_reports_change() {
        let filtered = SelectQuery::new("scratch").with_selection(Expr::literal(false));

        let result = DropScratchFilter.apply(filtered).unwrap();
        assert!(result.changed);
        assert_eq!(result.query.selection, None);

        let other = SelectQuery::new("t").with_selection(Expr::literal(false));
        let result = DropScratchFilter.apply(other).unwrap();
        assert!(!result.changed);
        assert_eq!(result.query.selection, Some(Expr::literal(false)));
    }
}
