//! Conversion between expression trees and [`CnfQuery`].

use std::collections::HashMap;

use common_config::{CnfConfig, DEFAULT_MAX_CNF_CLAUSES, DEFAULT_MAX_EXPR_DEPTH};
use log::debug;
use sieve_core::Value;

use super::model::{AtomicFormula, CnfQuery, OrGroup};
use crate::expr::{BinaryOp, Expr, ExprArena, ExprId, ExprKind, ExprRef, UnaryOp};

type Groups = Vec<Vec<AtomicFormula>>;

/// Converts predicates to CNF and back.
///
/// The number of groups any intermediate result may reach, and the number of
/// atoms in any one group, are bounded by `max_clauses`; distribution of OR
/// over AND is checked against the bound before the product is built.
/// Expressions deeper than `max_depth` are not converted at all.
#[derive(Debug, Clone, Copy)]
pub struct CnfConverter {
    max_clauses: usize,
    max_depth: usize,
}

impl Default for CnfConverter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CNF_CLAUSES)
    }
}

impl CnfConverter {
    pub const fn new(max_clauses: usize) -> Self {
        Self {
            max_clauses,
            max_depth: DEFAULT_MAX_EXPR_DEPTH,
        }
    }

    #[must_use]
    pub const fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn from_config(config: &CnfConfig) -> Self {
        Self::new(config.max_clauses).with_max_depth(config.max_depth)
    }

    pub const fn max_clauses(&self) -> usize {
        self.max_clauses
    }

    pub const fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Convert `expr` to CNF, or `None` if the result would exceed the
    /// clause bound or `expr` is deeper than `max_depth`.
    ///
    /// `NOT` is pushed through `AND`/`OR` and double negations cancel.
    /// Boolean literals fold away: `true` contributes no group and `false`
    /// contributes an empty one.
    pub fn try_to_cnf(&self, expr: ExprRef<'_>) -> Option<CnfQuery> {
        if expr.depth() > self.max_depth {
            debug!(
                "Expression depth {} exceeds {}, skipping CNF conversion",
                expr.depth(),
                self.max_depth
            );
            return None;
        }
        let mut arena = ExprArena::new();
        let root = arena.import(expr);
        match self.convert(&arena, root, false, &mut HashMap::new()) {
            Some(groups) => {
                let groups = groups.into_iter().map(OrGroup::from).collect();
                Some(CnfQuery::from_parts(arena, groups))
            }
            None => {
                debug!(
                    "CNF conversion exceeded {} clauses, giving up",
                    self.max_clauses
                );
                None
            }
        }
    }

    /// Convert `expr` to CNF.
    ///
    /// When a bound is exceeded the result is a single group holding the
    /// whole expression as one positive atom.
    pub fn to_cnf(&self, expr: ExprRef<'_>) -> CnfQuery {
        self.try_to_cnf(expr).unwrap_or_else(|| {
            let mut arena = ExprArena::new();
            let root = arena.import(expr);
            let group = OrGroup::from(vec![AtomicFormula::positive(root)]);
            CnfQuery::from_parts(arena, vec![group])
        })
    }

    /// Build an AND of ORs from `cnf`.
    ///
    /// No groups yields literal `true`; any empty group yields literal `false`.
    pub fn from_cnf(cnf: &CnfQuery) -> Expr {
        if cnf.is_always_false() {
            return Expr::literal(false);
        }
        if cnf.is_always_true() {
            return Expr::literal(true);
        }

        let mut arena = ExprArena::new();
        let mut memo = HashMap::new();
        let mut disjunctions = Vec::with_capacity(cnf.groups().len());
        for group in cnf.groups() {
            let mut atoms = Vec::with_capacity(group.len());
            for atom in group {
                let expr = arena.import_with(cnf.atom_expr(atom), &mut memo);
                atoms.push(if atom.negated {
                    arena.not(expr)
                } else {
                    expr
                });
            }
            if let Some(disjunction) = arena.disjunction(atoms) {
                disjunctions.push(disjunction);
            }
        }
        match arena.conjunction(disjunctions) {
            Some(root) => arena.finish(root),
            None => Expr::literal(true),
        }
    }

    /// Shared subexpressions are converted once per polarity.
    fn convert(
        &self,
        arena: &ExprArena,
        id: ExprId,
        negated: bool,
        memo: &mut HashMap<(ExprId, bool), Groups>,
    ) -> Option<Groups> {
        if let Some(groups) = memo.get(&(id, negated)) {
            return Some(groups.clone());
        }
        let node = arena.get(id);
        let groups = match node.kind() {
            ExprKind::Binary(op @ (BinaryOp::And | BinaryOp::Or)) => {
                let (left, right) = (node.child(0)?, node.child(1)?);
                let left = self.convert(arena, left.id(), negated, memo)?;
                let right = self.convert(arena, right.id(), negated, memo)?;
                // NOT (a OR b) is NOT a AND NOT b
                if (*op == BinaryOp::And) != negated {
                    self.conjoin(left, right)?
                } else {
                    self.distribute(left, right)?
                }
            }
            ExprKind::Unary(UnaryOp::Not) => {
                self.convert(arena, node.child(0)?.id(), !negated, memo)?
            }
            ExprKind::Literal(Value::Bool(value)) => {
                if *value != negated {
                    Vec::new()
                } else {
                    vec![Vec::new()]
                }
            }
            _ => vec![vec![AtomicFormula::new(id, negated)]],
        };
        memo.insert((id, negated), groups.clone());
        Some(groups)
    }

    fn conjoin(&self, mut left: Groups, right: Groups) -> Option<Groups> {
        if left.len() + right.len() > self.max_clauses {
            return None;
        }
        left.extend(right);
        Some(left)
    }

    /// `(l1 AND l2) OR (r1 AND r2)` is the AND of every `li OR rj`.
    fn distribute(&self, left: Groups, right: Groups) -> Option<Groups> {
        let size = left.len().checked_mul(right.len())?;
        if size > self.max_clauses {
            return None;
        }
        let mut groups = Vec::with_capacity(size);
        for l in &left {
            for r in &right {
                if l.len() + r.len() > self.max_clauses {
                    return None;
                }
                let mut group = Vec::with_capacity(l.len() + r.len());
                group.extend_from_slice(l);
                group.extend_from_slice(r);
                groups.push(group);
            }
        }
        Some(groups)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cnf_of(expr: &Expr) -> CnfQuery {
        CnfConverter::default().try_to_cnf(expr.root()).unwrap()
    }

    #[test]
    fn test_atom_is_single_group() {
        let expr = Expr::build(|a| {
            let x = a.column("x");
            let zero = a.literal(0i64);
            a.gt(x, zero)
        });
        assert_eq!(cnf_of(&expr).to_string(), "((x > 0))");
    }

    #[test]
    fn test_distribution() {
        // (a AND b) OR c => (a OR c) AND (b OR c)
        let expr = Expr::build(|e| {
            let a = e.column("a");
            let b = e.column("b");
            let c = e.column("c");
            let ab = e.and(a, b);
            e.or(ab, c)
        });
        assert_eq!(cnf_of(&expr).to_string(), "(a OR c) AND (b OR c)");
    }

    #[test]
    fn test_de_morgan() {
        // NOT (a OR NOT b) => (NOT a) AND (b)
        let expr = Expr::build(|e| {
            let a = e.column("a");
            let b = e.column("b");
            let not_b = e.not(b);
            let or = e.or(a, not_b);
            e.not(or)
        });
        assert_eq!(cnf_of(&expr).to_string(), "(NOT a) AND (b)");
    }

    #[test]
    fn test_boolean_literals_fold() {
        let truth = Expr::build(|e| {
            let a = e.column("a");
            let t = e.literal(true);
            e.or(a, t)
        });
        let falsity = Expr::build(|e| {
            let a = e.column("a");
            let f = e.literal(false);
            let nf = e.not(f);
            let f2 = e.not(nf);
            e.and(a, f2)
        });

        assert!(cnf_of(&truth).is_always_true());
        assert!(cnf_of(&falsity).is_always_false());
    }

    #[test]
    fn test_explosion_guard() {
        // (a1 AND b1) OR (a2 AND b2) OR ... produces 2^n groups
        let expr = Expr::build(|e| {
            let terms: Vec<_> = (0..10)
                .map(|i| {
                    let a = e.column(format!("a{i}"));
                    let b = e.column(format!("b{i}"));
                    e.and(a, b)
                })
                .collect();
            e.disjunction(terms).unwrap()
        });
        let converter = CnfConverter::new(256);

        assert!(converter.try_to_cnf(expr.root()).is_none());

        let fallback = converter.to_cnf(expr.root());
        assert_eq!(fallback.groups().len(), 1);
        assert_eq!(fallback.atom_count(), 1);
        assert!(fallback.atom_expr(&fallback.groups()[0].atoms()[0]).deep_eq(expr.root()));

        assert!(CnfConverter::new(1024).try_to_cnf(expr.root()).is_some());
    }

    #[test]
    fn test_from_cnf() {
        let expr = Expr::build(|e| {
            let a = e.column("a");
            let b = e.column("b");
            let c = e.column("c");
            let not_a = e.not(a);
            let ab = e.and(not_a, b);
            e.or(ab, c)
        });
        let back = CnfConverter::from_cnf(&cnf_of(&expr));

        assert_eq!(back.to_string(), "((NOT a OR c) AND (b OR c))");
    }

    #[test]
    fn test_from_cnf_edge_cases() {
        let truth = CnfQuery::new(ExprArena::new());
        let falsity = CnfQuery::from_parts(ExprArena::new(), vec![OrGroup::new()]);

        assert_eq!(CnfConverter::from_cnf(&truth), Expr::literal(true));
        assert_eq!(CnfConverter::from_cnf(&falsity), Expr::literal(false));
    }

    #[test]
    fn test_from_config() {
        let config = CnfConfig {
            max_clauses: 8,
            max_depth: 16,
        };
        let converter = CnfConverter::from_config(&config);
        assert_eq!(converter.max_clauses(), 8);
        assert_eq!(converter.max_depth(), 16);
        assert_eq!(CnfConverter::default().max_clauses(), DEFAULT_MAX_CNF_CLAUSES);
        assert_eq!(CnfConverter::default().max_depth(), DEFAULT_MAX_EXPR_DEPTH);
    }

    #[test]
    fn test_depth_guard() {
        let mut arena = ExprArena::new();
        let mut expr = arena.column("x0");
        for i in 1..5000 {
            let next = arena.column(format!("x{i}"));
            expr = arena.or(expr, next);
        }
        let deep = arena.finish(expr);
        let converter = CnfConverter::new(usize::MAX);

        assert!(converter.try_to_cnf(deep.root()).is_none());

        let fallback = converter.to_cnf(deep.root());
        assert_eq!(fallback.atom_count(), 1);

        let shallow = Expr::build(|e| {
            let a = e.column("a");
            let b = e.column("b");
            let c = e.column("c");
            let ab = e.or(a, b);
            e.or(ab, c)
        });
        assert!(converter.with_max_depth(3).try_to_cnf(shallow.root()).is_some());
        assert!(converter.with_max_depth(2).try_to_cnf(shallow.root()).is_none());
    }

    #[test]
    fn test_wide_groups_are_bounded() {
        // e(i+1) = e(i) OR e(i) doubles the group width at every level
        let mut arena = ExprArena::new();
        let mut expr = arena.column("a");
        for _ in 0..40 {
            expr = arena.or(expr, expr);
        }
        let doubled = arena.finish(expr);

        assert!(CnfConverter::new(256).try_to_cnf(doubled.root()).is_none());
    }

    #[test]
    fn test_shared_conjunctions_convert_once() {
        let mut arena = ExprArena::new();
        let mut expr = arena.literal(true);
        for _ in 0..64 {
            expr = arena.and(expr, expr);
        }
        let shared = arena.finish(expr);

        assert!(cnf_of(&shared).is_always_true());
    }
}
