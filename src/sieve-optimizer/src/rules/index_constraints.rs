//! Appending predicates over index keys.
//!
//! A predicate on `x` does not help an index on `k`, even when the constraints
//! say `x = k`. The appender restates such predicates in terms of the key and
//! adds them next to the originals.

use std::sync::Arc;

use log::debug;
use sieve_catalog::{ConstraintsDescription, TableMetadata};
use sieve_logical::{AtomicFormula, CnfQuery, Expr, ExprArena, ExprId, OrGroup};

/// Adds groups to a rewritten predicate.
///
/// Implementations may only append groups that are implied by the predicate
/// and the table's constraints; existing groups must be left as they are.
pub trait IndexConstraintAppender: Send + Sync {
    fn perform(&self, cnf: &mut CnfQuery);
}

/// Restates comparisons in terms of index keys known to be equal to their
/// operands.
#[derive(Debug, Clone)]
pub struct EquivalentKeyAppender {
    description: Arc<ConstraintsDescription>,
    keys: Vec<Expr>,
}

impl EquivalentKeyAppender {
    pub fn new(metadata: &TableMetadata) -> Self {
        Self {
            description: Arc::clone(metadata.description()),
            keys: metadata.index_keys().to_vec(),
        }
    }

    fn is_key(&self, arena: &ExprArena, id: ExprId) -> bool {
        let expr = arena.get(id);
        self.keys.iter().any(|key| key.root().deep_eq(expr))
    }

    /// An index key in the same equality class as `id`, other than `id`.
    fn equivalent_key(&self, arena: &ExprArena, id: ExprId) -> Option<&Expr> {
        let expr = arena.get(id);
        if expr.as_literal().is_some() || self.is_key(arena, id) {
            return None;
        }
        let members = self.description.graph().get_equal(expr);
        self.keys
            .iter()
            .find(|key| members.iter().any(|member| member.deep_eq(key.root())))
    }

    fn restate(&self, arena: &mut ExprArena, atom: AtomicFormula) -> Option<AtomicFormula> {
        let (op, lhs, rhs) = {
            let (op, lhs, rhs) = arena.get(atom.expr).as_comparison()?;
            (op, lhs.id(), rhs.id())
        };
        let lhs_key = self.equivalent_key(arena, lhs);
        let rhs_key = self.equivalent_key(arena, rhs);
        if lhs_key.is_none() && rhs_key.is_none() {
            return None;
        }

        let lhs = lhs_key.map_or(lhs, |key| arena.import(key.root()));
        let rhs = rhs_key.map_or(rhs, |key| arena.import(key.root()));
        Some(AtomicFormula::new(arena.binary(lhs, op, rhs), atom.negated))
    }
}

impl IndexConstraintAppender for EquivalentKeyAppender {
    fn perform(&self, cnf: &mut CnfQuery) {
        if self.keys.is_empty() || self.description.graph().is_empty() {
            return;
        }

        let groups = cnf.groups().to_vec();
        let mut appended = 0;
        for group in groups {
            let mut changed = false;
            let restated: OrGroup = group
                .iter()
                .map(|atom| match self.restate(cnf.arena_mut(), *atom) {
                    Some(new) => {
                        changed = true;
                        new
                    }
                    None => *atom,
                })
                .collect();
            if changed && !cnf.contains_group(&restated) {
                cnf.push_group(restated);
                appended += 1;
            }
        }

        if appended > 0 {
            debug!("Appended {appended} index key groups");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sieve_logical::{CnfConverter, ExprRef};

    fn metadata(keys: &[&str]) -> TableMetadata {
        // x = k AND y = k
        let x_eq_k = Expr::build(|a| {
            let x = a.column("x");
            let k = a.column("k");
            a.eq(x, k)
        });
        let y_eq_k = Expr::build(|a| {
            let y = a.column("y");
            let k = a.column("k");
            a.eq(y, k)
        });
        let mut builder = TableMetadata::builder("t")
            .with_constraint("x_eq_k", x_eq_k)
            .with_constraint("y_eq_k", y_eq_k);
        for key in keys {
            builder = builder.with_index_key(Expr::build(|a| a.column(*key)));
        }
        builder.build().unwrap()
    }

    fn cnf(expr: ExprRef<'_>) -> CnfQuery {
        CnfConverter::default().to_cnf(expr)
    }

    #[test]
    fn test_appends_group_over_key() {
        let appender = EquivalentKeyAppender::new(&metadata(&["k"]));
        let selection = Expr::build(|a| {
            let x = a.column("x");
            let five = a.literal(5i64);
            a.lt(x, five)
        });
        let mut query = cnf(selection.root());

        appender.perform(&mut query);

        assert_eq!(query.groups().len(), 2);
        assert_eq!(query.to_string(), "((x < 5)) AND ((k < 5))");
    }

    #[test]
    fn test_key_operands_and_duplicates_are_skipped() {
        let appender = EquivalentKeyAppender::new(&metadata(&["k"]));
        // k < 5 AND y < 5: the first already uses the key, the second maps
        // onto a group that is already present
        let selection = Expr::build(|a| {
            let k = a.column("k");
            let five = a.literal(5i64);
            let k_lt = a.lt(k, five);
            let y = a.column("y");
            let y_lt = a.lt(y, five);
            a.and(k_lt, y_lt)
        });
        let mut query = cnf(selection.root());

        appender.perform(&mut query);

        assert_eq!(query.groups().len(), 2);
    }

    #[test]
    fn test_no_keys_is_noop() {
        let appender = EquivalentKeyAppender::new(&metadata(&[]));
        let selection = Expr::build(|a| {
            let x = a.column("x");
            let five = a.literal(5i64);
            a.lt(x, five)
        });
        let mut query = cnf(selection.root());

        appender.perform(&mut query);

        assert_eq!(query.groups().len(), 1);
    }
}
