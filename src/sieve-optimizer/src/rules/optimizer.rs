//! Runs a list of rules over a query, once each, in order.

use std::sync::Arc;

use common_config::SieveConfig;
use common_error::SieveResult;
use log::debug;
use sieve_catalog::Catalog;
use sieve_logical::SelectQuery;

use super::rule::{OptimizationRule, Transformed};
use super::where_constraints::WhereConstraintsRule;
use crate::diagnostics::LogSink;

/// Applies its rules to a query in a single pass.
///
/// There is no fixpoint loop: a rule that could simplify the output of a
/// later rule only sees the query once.
pub struct Optimizer {
    rules: Vec<Box<dyn OptimizationRule>>,
}

impl Optimizer {
    pub fn new(rules: Vec<Box<dyn OptimizationRule>>) -> Self {
        Self { rules }
    }

    /// The constraint rewrite for tables in `catalog`, logging through
    /// [`LogSink`].
    pub fn for_catalog(catalog: Arc<Catalog>, config: &SieveConfig) -> Self {
        let rule = WhereConstraintsRule::new(catalog)
            .with_config(config.clone())
            .with_sink(Arc::new(LogSink));
        Self::new(vec![Box::new(rule)])
    }

    pub fn add_rule<R: OptimizationRule + 'static>(&mut self, rule: R) {
        self.rules.push(Box::new(rule));
    }

    /// Apply every rule once; `changed` is set when any of them rewrote the
    /// query.
    pub fn optimize(&self, query: SelectQuery) -> SieveResult<Transformed> {
        let mut current = Transformed::unchanged(query);
        for rule in &self.rules {
            let result = rule.apply(current.query)?;
            if result.changed {
                debug!("Rule '{}' rewrote the query on '{}'", rule.name(), result.query.table);
            }
            current = Transformed {
                query: result.query,
                changed: current.changed || result.changed,
            };
        }
        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sieve_catalog::TableMetadata;
    use sieve_logical::Expr;

    /// Adds `WHERE true` to queries without a WHERE clause.
    struct AddSelectionRule;

    impl OptimizationRule for AddSelectionRule {
        fn name(&self) -> &'static str {
            "AddSelection"
        }

        fn apply(&self, query: SelectQuery) -> SieveResult<Transformed> {
            if query.selection.is_some() {
                return Ok(Transformed::unchanged(query));
            }
            Ok(Transformed::rewritten(query.with_selection(Expr::literal(true))))
        }
    }

    fn positive() -> Expr {
        Expr::build(|a| {
            let x = a.column("x");
            let zero = a.literal(0i64);
            a.gt(x, zero)
        })
    }

    fn catalog() -> Arc<Catalog> {
        let mut catalog = Catalog::new();
        catalog.register(
            TableMetadata::builder("t")
                .with_constraint("positive", positive())
                .build()
                .unwrap(),
        );
        Arc::new(catalog)
    }

    #[test]
    fn test_rules_run_in_order() {
        let optimizer = Optimizer::new(vec![Box::new(AddSelectionRule)]);

        let result = optimizer.optimize(SelectQuery::new("t")).unwrap();
        assert!(result.changed);
        assert_eq!(result.query.selection, Some(Expr::literal(true)));

        let again = optimizer.optimize(result.query).unwrap();
        assert!(!again.changed);
    }

    #[test]
    fn test_single_pass() {
        // the constraint rule runs before the selection is added, and is not
        // revisited afterwards
        let mut optimizer = Optimizer::for_catalog(catalog(), &SieveConfig::default());
        optimizer.add_rule(AddSelectionRule);

        let result = optimizer
            .optimize(SelectQuery::new("t").with_selection(positive()))
            .unwrap();

        assert!(result.changed);
        assert_eq!(result.query.selection, Some(Expr::literal(true)));
    }

    #[test]
    fn test_for_catalog() {
        let optimizer = Optimizer::for_catalog(catalog(), &SieveConfig::default());

        let result = optimizer
            .optimize(SelectQuery::new("t").with_selection(positive()))
            .unwrap();
        assert!(result.changed);
        assert_eq!(result.query.selection, None);

        let untouched = optimizer
            .optimize(SelectQuery::new("u").with_selection(positive()))
            .unwrap();
        assert!(!untouched.changed);
    }
}
