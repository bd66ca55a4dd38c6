//! A table's CHECK constraints in CNF, indexed for lookup.

use std::collections::HashMap;

use log::debug;
use sieve_logical::{AtomicFormula, CnfConverter, ExprArena, ExprRef, Fingerprint, OrGroup};

use super::graph::ComparisonGraph;

/// Position of an atom inside a [`ConstraintsDescription`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AtomId {
    pub group: usize,
    pub atom: usize,
}

/// The OR-groups every row of a table satisfies.
///
/// Each constraint goes through the same CNF conversion as query predicates
/// (with `NOT` pulled out of functions), so constraint atoms and query atoms
/// can be matched structurally.
#[derive(Debug, Clone, Default)]
pub struct ConstraintsDescription {
    arena: ExprArena,
    groups: Vec<OrGroup>,
    index: HashMap<Fingerprint, Vec<AtomId>>,
    graph: ComparisonGraph,
}

impl ConstraintsDescription {
    /// Convert and index `constraints`, then build the comparison graph from
    /// the single-atom groups.
    pub fn new<'a, I>(constraints: I, converter: &CnfConverter) -> Self
    where
        I: IntoIterator<Item = ExprRef<'a>>,
    {
        let mut arena = ExprArena::new();
        let mut groups = Vec::new();

        for constraint in constraints {
            let cnf = converter
                .to_cnf(constraint)
                .pull_not_out_functions()
                .reduce();
            let mut memo = HashMap::new();
            for group in cnf.groups() {
                if group.is_empty() {
                    continue;
                }
                let imported: OrGroup = group
                    .iter()
                    .map(|atom| {
                        let expr = arena.import_with(cnf.atom_expr(atom), &mut memo);
                        AtomicFormula::new(expr, atom.negated)
                    })
                    .collect();
                groups.push(imported);
            }
        }

        let graph = ComparisonGraph::build(groups.iter().filter_map(|group| {
            let atom = group.as_unit()?;
            let (op, lhs, rhs) = arena.get(atom.expr).as_comparison()?;
            let op = if atom.negated { op.negate()? } else { op };
            Some((op, lhs, rhs))
        }));

        // Disjunctions are stored with known constants substituted, the same
        // form query atoms take after constant folding.
        for group in groups.iter_mut().filter(|group| group.len() > 1) {
            *group = group
                .iter()
                .map(|atom| {
                    let expr = graph.substitute_constants(&mut arena, atom.expr);
                    AtomicFormula::new(expr, atom.negated)
                })
                .collect();
        }

        let mut index: HashMap<Fingerprint, Vec<AtomId>> = HashMap::new();
        for (g, group) in groups.iter().enumerate() {
            for (a, atom) in group.iter().enumerate() {
                index
                    .entry(arena.get(atom.expr).fingerprint())
                    .or_default()
                    .push(AtomId { group: g, atom: a });
            }
        }

        debug!(
            "Described constraints as {} groups ({} atoms)",
            groups.len(),
            groups.iter().map(OrGroup::len).sum::<usize>()
        );

        Self {
            arena,
            groups,
            index,
            graph,
        }
    }

    /// Every constraint atom whose expression equals `expr`.
    pub fn get_atom_ids(&self, expr: ExprRef<'_>) -> Vec<AtomId> {
        self.index
            .get(&expr.fingerprint())
            .map(|ids| {
                ids.iter()
                    .copied()
                    .filter(|id| {
                        self.atom(*id)
                            .is_some_and(|atom| self.arena.get(atom.expr).deep_eq(expr))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Resolve ids to `(group index, atom)` pairs.
    pub fn get_atoms_by_id(&self, ids: &[AtomId]) -> Vec<(usize, &AtomicFormula)> {
        ids.iter()
            .filter_map(|id| self.atom(*id).map(|atom| (id.group, atom)))
            .collect()
    }

    pub fn atom(&self, id: AtomId) -> Option<&AtomicFormula> {
        self.groups.get(id.group)?.atoms().get(id.atom)
    }

    pub fn atom_expr(&self, atom: &AtomicFormula) -> ExprRef<'_> {
        self.arena.get(atom.expr)
    }

    pub fn groups(&self) -> &[OrGroup] {
        &self.groups
    }

    pub fn arena(&self) -> &ExprArena {
        &self.arena
    }

    /// Atoms of the groups that hold a single atom; each is true on every row.
    pub fn unit_atoms(&self) -> impl Iterator<Item = AtomicFormula> + '_ {
        self.groups.iter().filter_map(OrGroup::as_unit)
    }

    pub fn graph(&self) -> &ComparisonGraph {
        &self.graph
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
