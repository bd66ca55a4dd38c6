//! Simplify WHERE clauses using the table's CHECK constraints.
//!
//! The predicate is brought to CNF and then:
//!
//! - groups the constraints already guarantee are dropped;
//! - atoms the constraints rule out are dropped;
//! - subexpressions pinned to a constant are replaced by it;
//! - the result is structurally reduced and converted back.
//!
//! Every step keeps the filtering outcome for each row that satisfies the
//! constraints.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use common_config::{ConstraintsConfig, SieveConfig};
use common_error::SieveResult;
use log::debug;
use sieve_catalog::{Catalog, CompareResult, ConstraintsDescription, TableMetadata};
use sieve_core::Value;
use sieve_logical::{
    AtomicFormula, CnfConverter, CnfQuery, Expr, ExprArena, ExprKind, ExprRef, OrGroup,
    SelectQuery, UnaryOp,
};

use super::index_constraints::{EquivalentKeyAppender, IndexConstraintAppender};
use super::rule::{OptimizationRule, Transformed};
use crate::diagnostics::{DiagnosticSink, NoopSink};

/// The outcome of one rewrite.
#[derive(Debug, Clone)]
pub struct ConstraintRewrite {
    /// The simplified predicate.
    pub cnf: CnfQuery,
}

impl ConstraintRewrite {
    /// The new WHERE expression rendered as text.
    pub fn after(&self) -> String {
        CnfConverter::from_cnf(&self.cnf).to_string()
    }

    /// The new WHERE expression; `None` when it is always true.
    pub fn selection(&self) -> Option<Expr> {
        if self.cnf.is_always_true() {
            None
        } else {
            Some(CnfConverter::from_cnf(&self.cnf))
        }
    }
}

/// Rewrites the WHERE clause of a query against one table's constraints.
pub struct WhereConstraintsOptimizer {
    metadata: Option<Arc<TableMetadata>>,
    settings: ConstraintsConfig,
    converter: CnfConverter,
    appender: Option<Arc<dyn IndexConstraintAppender>>,
    sink: Arc<dyn DiagnosticSink>,
}

impl WhereConstraintsOptimizer {
    /// Create an optimizer for a table; `None` makes every call a no-op.
    pub fn new(metadata: Option<Arc<TableMetadata>>) -> Self {
        Self {
            metadata,
            settings: ConstraintsConfig::default(),
            converter: CnfConverter::default(),
            appender: None,
            sink: Arc::new(NoopSink),
        }
    }

    /// Apply the CNF and constraint settings from `config`.
    #[must_use]
    pub fn with_config(mut self, config: &SieveConfig) -> Self {
        self.settings = config.constraints.clone();
        self.converter = CnfConverter::from_config(&config.cnf);
        self
    }

    /// Append index predicates with `appender` when enabled in the settings.
    #[must_use]
    pub fn with_appender(mut self, appender: Arc<dyn IndexConstraintAppender>) -> Self {
        self.appender = Some(appender);
        self
    }

    /// Send before/after lines to `sink`.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Rewrite `selection` without touching any query.
    ///
    /// Returns `None` when there is nothing to do: no metadata, the rewrite
    /// disabled, or a predicate too deep or too large to bring to CNF.
    pub fn rewrite(&self, selection: ExprRef<'_>) -> Option<ConstraintRewrite> {
        if !self.settings.optimize_using_constraints {
            return None;
        }
        let metadata = self.metadata.as_ref()?;
        let description = metadata.description().as_ref();
        let graph = description.graph();

        let Some(cnf) = self.converter.try_to_cnf(selection) else {
            debug!(
                "Skipping constraint rewrite on '{}': no CNF within {} clauses and depth {}",
                metadata.name(),
                self.converter.max_clauses(),
                self.converter.max_depth()
            );
            return None;
        };
        let before_groups = cnf.groups().len();

        let cnf = cnf
            .pull_not_out_functions()
            .filter_always_true_groups(|arena, group| !group_always_true(arena, group, description))
            .filter_always_false_atoms(|arena, atom| !atom_always_false(arena, atom, description))
            .transform_atoms(|arena, atom| {
                AtomicFormula::new(graph.substitute_constants(arena, atom.expr), atom.negated)
            })
            // substituted atoms may now match the constraints directly
            .filter_always_true_groups(|arena, group| !group_always_true(arena, group, description))
            .filter_always_false_atoms(|arena, atom| !atom_always_false(arena, atom, description))
            .reduce();
        let mut cnf = cnf.push_not_in_functions();

        if self.settings.optimize_append_index
            && let Some(appender) = &self.appender
        {
            appender.perform(&mut cnf);
        }

        debug!(
            "Constraint rewrite on '{}': {} groups -> {} groups",
            metadata.name(),
            before_groups,
            cnf.groups().len()
        );

        Some(ConstraintRewrite { cnf })
    }

    /// Rewrite the query's WHERE clause in place.
    ///
    /// Returns whether the WHERE clause changed.
    pub fn perform(&self, query: &mut SelectQuery) -> bool {
        let Some(selection) = query.selection.as_ref() else {
            return false;
        };
        let Some(rewrite) = self.rewrite(selection.root()) else {
            return false;
        };

        let selection = rewrite.selection();
        if self.sink.enabled() {
            self.sink
                .report(&format!("Before optimization: {}", selection_text(query)));
            let after = selection.as_ref().map_or_else(|| "true".to_string(), Expr::to_string);
            self.sink.report(&format!("After optimization: {after}"));
        }

        let changed = match (&selection, &query.selection) {
            (Some(new), Some(old)) => !new.deep_eq(old),
            (None, None) => false,
            _ => true,
        };
        query.selection = selection;
        changed
    }
}

fn selection_text(query: &SelectQuery) -> String {
    query
        .selection
        .as_ref()
        .map_or_else(|| "true".to_string(), Expr::to_string)
}

/// A group is always true when some constraint group is contained in it,
/// when one of its atoms is always true, or when it holds an atom and its
/// complement and that atom can never be NULL.
fn group_always_true(arena: &ExprArena, group: &OrGroup, description: &ConstraintsDescription) -> bool {
    let mut matched = HashSet::new();
    for atom in group {
        let expr = arena.get(atom.expr);
        for id in description.get_atom_ids(expr) {
            if description
                .atom(id)
                .is_some_and(|constraint| constraint.negated == atom.negated)
            {
                matched.insert(id);
            }
        }
    }
    let mut per_group: HashMap<usize, usize> = HashMap::new();
    for id in &matched {
        *per_group.entry(id.group).or_default() += 1;
    }
    let subsumed = per_group
        .iter()
        .any(|(group, count)| description.groups()[*group].len() == *count);
    if subsumed {
        return true;
    }

    group
        .iter()
        .any(|atom| atom_known(arena, atom, description) == Some(true))
        || has_excluded_middle(arena, group, description)
}

/// `a OR NOT a` is TRUE only when `a` is never NULL.
fn has_excluded_middle(arena: &ExprArena, group: &OrGroup, description: &ConstraintsDescription) -> bool {
    group.iter().any(|atom| {
        let expr = arena.get(atom.expr);
        group.iter().any(|other| {
            other.negated != atom.negated && arena.get(other.expr).deep_eq(expr)
        }) && never_null(expr, description)
    })
}

fn never_null(expr: ExprRef<'_>, description: &ConstraintsDescription) -> bool {
    match expr.kind() {
        ExprKind::Unary(UnaryOp::IsNull | UnaryOp::IsNotNull) => true,
        ExprKind::Literal(value) => !value.is_null(),
        _ => {
            let graph = description.graph();
            expr.as_comparison().is_some_and(|(_, lhs, rhs)| {
                graph.is_known_non_null(lhs) && graph.is_known_non_null(rhs)
            })
        }
    }
}

/// An atom is always false when a single-atom constraint asserts its
/// complement, or when the known facts rule it out.
fn atom_always_false(arena: &ExprArena, atom: &AtomicFormula, description: &ConstraintsDescription) -> bool {
    let expr = arena.get(atom.expr);
    let contradicted = description
        .get_atom_ids(expr)
        .into_iter()
        .any(|id| {
            description.groups()[id.group].len() == 1
                && description
                    .atom(id)
                    .is_some_and(|constraint| constraint.negated != atom.negated)
        });
    contradicted || atom_known(arena, atom, description) == Some(false)
}

/// The truth value of an atom fixed by the comparison graph or by a boolean
/// literal, if any.
fn atom_known(arena: &ExprArena, atom: &AtomicFormula, description: &ConstraintsDescription) -> Option<bool> {
    let expr = arena.get(atom.expr);
    if let Some(Value::Bool(value)) = expr.as_literal() {
        return Some(*value != atom.negated);
    }

    let (op, lhs, rhs) = expr.as_comparison()?;
    let mut expected = CompareResult::from_op(op)?;
    if atom.negated {
        expected = expected.inverse();
    }
    let graph = description.graph();
    if graph.is_always_compare(expected, lhs, rhs) {
        Some(true)
    } else if !graph.is_possible_compare(expected, lhs, rhs) {
        Some(false)
    } else {
        None
    }
}

/// Optimization rule wrapping [`WhereConstraintsOptimizer`].
///
/// Looks the query's table up in the catalog; queries on unknown tables pass
/// through unchanged.
pub struct WhereConstraintsRule {
    catalog: Arc<Catalog>,
    config: SieveConfig,
    sink: Arc<dyn DiagnosticSink>,
}

impl WhereConstraintsRule {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            config: SieveConfig::default(),
            sink: Arc::new(NoopSink),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: SieveConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }
}

impl OptimizationRule for WhereConstraintsRule {
    fn name(&self) -> &'static str {
        "WhereConstraints"
    }

    fn apply(&self, mut query: SelectQuery) -> SieveResult<Transformed> {
        let metadata = self.catalog.get(&query.table).cloned();
        let appender = metadata.as_ref().map(|metadata| {
            Arc::new(EquivalentKeyAppender::new(metadata)) as Arc<dyn IndexConstraintAppender>
        });

        let mut optimizer = WhereConstraintsOptimizer::new(metadata)
            .with_config(&self.config)
            .with_sink(Arc::clone(&self.sink));
        if let Some(appender) = appender {
            optimizer = optimizer.with_appender(appender);
        }

        if optimizer.perform(&mut query) {
            Ok(Transformed::rewritten(query))
        } else {
            Ok(Transformed::unchanged(query))
        }
    }
}
