//! Conjunctive normal form: a conjunction of OR-groups of possibly negated
//! atoms, all stored in one expression arena.

use std::fmt;

use common_error::SieveResult;
use sieve_core::Row;

use crate::eval::ExprEvaluator;
use crate::expr::{ExprArena, ExprId, ExprKind, ExprRef, UnaryOp};

/// A single possibly negated predicate.
///
/// Holds when `expr` is true (`negated == false`) or when it is false
/// (`negated == true`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AtomicFormula {
    pub expr: ExprId,
    pub negated: bool,
}

impl AtomicFormula {
    pub const fn new(expr: ExprId, negated: bool) -> Self {
        Self { expr, negated }
    }

    pub const fn positive(expr: ExprId) -> Self {
        Self::new(expr, false)
    }

    pub const fn negative(expr: ExprId) -> Self {
        Self::new(expr, true)
    }

    /// The complementary atom.
    #[must_use]
    pub const fn negate(self) -> Self {
        Self::new(self.expr, !self.negated)
    }
}

/// A disjunction of atoms. An empty group is FALSE.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrGroup {
    atoms: Vec<AtomicFormula>,
}

impl OrGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn atoms(&self) -> &[AtomicFormula] {
        &self.atoms
    }

    pub fn push(&mut self, atom: AtomicFormula) {
        self.atoms.push(atom);
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AtomicFormula> {
        self.atoms.iter()
    }

    /// The single atom of a unit group.
    pub fn as_unit(&self) -> Option<AtomicFormula> {
        match self.atoms.as_slice() {
            [atom] => Some(*atom),
            _ => None,
        }
    }
}

impl From<Vec<AtomicFormula>> for OrGroup {
    fn from(atoms: Vec<AtomicFormula>) -> Self {
        Self { atoms }
    }
}

impl FromIterator<AtomicFormula> for OrGroup {
    fn from_iter<I: IntoIterator<Item = AtomicFormula>>(iter: I) -> Self {
        Self {
            atoms: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a OrGroup {
    type Item = &'a AtomicFormula;
    type IntoIter = std::slice::Iter<'a, AtomicFormula>;

    fn into_iter(self) -> Self::IntoIter {
        self.atoms.iter()
    }
}

/// A predicate in conjunctive normal form.
///
/// No groups means TRUE; any empty group makes the whole query FALSE.
#[derive(Debug, Clone, Default)]
pub struct CnfQuery {
    arena: ExprArena,
    groups: Vec<OrGroup>,
}

impl CnfQuery {
    /// An always-true query over `arena`.
    pub fn new(arena: ExprArena) -> Self {
        Self {
            arena,
            groups: Vec::new(),
        }
    }

    pub fn from_parts(arena: ExprArena, groups: Vec<OrGroup>) -> Self {
        Self { arena, groups }
    }

    pub fn into_parts(self) -> (ExprArena, Vec<OrGroup>) {
        (self.arena, self.groups)
    }

    pub fn arena(&self) -> &ExprArena {
        &self.arena
    }

    pub fn arena_mut(&mut self) -> &mut ExprArena {
        &mut self.arena
    }

    pub fn groups(&self) -> &[OrGroup] {
        &self.groups
    }

    pub fn push_group(&mut self, group: OrGroup) {
        self.groups.push(group);
    }

    /// Total number of atoms across all groups.
    pub fn atom_count(&self) -> usize {
        self.groups.iter().map(OrGroup::len).sum()
    }

    /// True when there are no groups left.
    pub fn is_always_true(&self) -> bool {
        self.groups.is_empty()
    }

    /// True when some group has no atoms.
    pub fn is_always_false(&self) -> bool {
        self.groups.iter().any(OrGroup::is_empty)
    }

    /// Expression behind an atom.
    pub fn atom_expr(&self, atom: &AtomicFormula) -> ExprRef<'_> {
        self.arena.get(atom.expr)
    }

    /// Whether `group` already occurs in this query, atoms compared as sets.
    pub fn contains_group(&self, group: &OrGroup) -> bool {
        let mut candidate = group.clone();
        dedup_atoms(&self.arena, &mut candidate);
        self.groups.iter().any(|existing| {
            let mut existing = existing.clone();
            dedup_atoms(&self.arena, &mut existing);
            existing.len() == candidate.len() && is_subset(&self.arena, &candidate, &existing)
        })
    }

    // ========== Combinators ==========

    /// Keep only the groups for which `keep` returns true.
    #[must_use]
    pub fn filter_always_true_groups<F>(mut self, mut keep: F) -> Self
    where
        F: FnMut(&ExprArena, &OrGroup) -> bool,
    {
        let arena = &self.arena;
        self.groups.retain(|group| keep(arena, group));
        self
    }

    /// Keep only the atoms for which `keep` returns true.
    ///
    /// A group that loses all of its atoms stays behind as an empty group.
    #[must_use]
    pub fn filter_always_false_atoms<F>(mut self, mut keep: F) -> Self
    where
        F: FnMut(&ExprArena, &AtomicFormula) -> bool,
    {
        let arena = &self.arena;
        for group in &mut self.groups {
            group.atoms.retain(|atom| keep(arena, atom));
        }
        self
    }

    /// Replace every atom with the result of `f`.
    #[must_use]
    pub fn transform_atoms<F>(mut self, mut f: F) -> Self
    where
        F: FnMut(&mut ExprArena, AtomicFormula) -> AtomicFormula,
    {
        for group in &mut self.groups {
            for atom in &mut group.atoms {
                *atom = f(&mut self.arena, *atom);
            }
        }
        self
    }

    /// Strip `NOT` wrappers into the atom flag and store negative operators
    /// as a negated positive one (`a >= b` becomes `NOT (a < b)`).
    #[must_use]
    pub fn pull_not_out_functions(self) -> Self {
        self.transform_atoms(pull_not_out)
    }

    /// Rewrite negated atoms over invertible operators into the inverse
    /// operator (`NOT (a < b)` becomes `a >= b`).
    #[must_use]
    pub fn push_not_in_functions(self) -> Self {
        self.transform_atoms(push_not_in)
    }

    /// Structural simplification.
    ///
    /// Runs, in order: atom dedup inside each group, self-subsuming
    /// resolution to a fixpoint, and removal of groups that are supersets of
    /// another group. Every step keeps the set of rows on which the query is
    /// TRUE. A group such as `a OR NOT a` is left alone since it is NULL when
    /// `a` is.
    #[must_use]
    pub fn reduce(mut self) -> Self {
        let arena = &self.arena;

        for group in &mut self.groups {
            dedup_atoms(arena, group);
        }

        while let Some((group, atom)) = find_resolvable_atom(arena, &self.groups) {
            self.groups[group].atoms.remove(atom);
        }

        let groups = &self.groups;
        let keep: Vec<bool> = (0..groups.len())
            .map(|i| {
                !(0..groups.len()).any(|j| {
                    j != i
                        && is_subset(arena, &groups[j], &groups[i])
                        && (groups[j].len() < groups[i].len() || j < i)
                })
            })
            .collect();
        let mut keep = keep.into_iter();
        self.groups.retain(|_| keep.next().unwrap_or(true));

        self
    }

    /// Three-valued evaluation against a row.
    pub fn evaluate(&self, row: &Row) -> SieveResult<Option<bool>> {
        let evaluator = ExprEvaluator::new();
        let mut result = Some(true);
        for group in &self.groups {
            let mut group_value = Some(false);
            for atom in group {
                let value = evaluator
                    .evaluate_predicate(self.arena.get(atom.expr), row)?
                    .map(|b| b != atom.negated);
                group_value = match (group_value, value) {
                    (Some(true), _) | (_, Some(true)) => Some(true),
                    (Some(false), Some(false)) => Some(false),
                    _ => None,
                };
            }
            result = match (result, group_value) {
                (Some(false), _) | (_, Some(false)) => Some(false),
                (Some(true), Some(true)) => Some(true),
                _ => None,
            };
        }
        Ok(result)
    }

    /// Render as `(a OR NOT b) AND (c)`.
    pub fn dump(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CnfQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_always_false() {
            return write!(f, "FALSE");
        }
        if self.is_always_true() {
            return write!(f, "TRUE");
        }
        for (i, group) in self.groups.iter().enumerate() {
            if i > 0 {
                write!(f, " AND ")?;
            }
            write!(f, "(")?;
            for (j, atom) in group.iter().enumerate() {
                if j > 0 {
                    write!(f, " OR ")?;
                }
                if atom.negated {
                    write!(f, "NOT ")?;
                }
                write!(f, "{}", self.arena.get(atom.expr))?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

fn pull_not_out(arena: &mut ExprArena, atom: AtomicFormula) -> AtomicFormula {
    let mut expr = atom.expr;
    let mut negated = atom.negated;
    loop {
        let node = arena.get(expr);
        match node.kind() {
            ExprKind::Unary(UnaryOp::Not) => match node.child(0) {
                Some(child) => {
                    expr = child.id();
                    negated = !negated;
                }
                None => break,
            },
            kind if kind.is_negative_form() => {
                if let Some(positive) = kind.negated() {
                    let children = arena.node(expr).children().to_vec();
                    expr = arena.push(positive, children);
                    negated = !negated;
                }
                break;
            }
            _ => break,
        }
    }
    AtomicFormula::new(expr, negated)
}

fn push_not_in(arena: &mut ExprArena, atom: AtomicFormula) -> AtomicFormula {
    if !atom.negated {
        return atom;
    }
    match arena.get(atom.expr).kind().negated() {
        Some(inverse) => {
            let children = arena.node(atom.expr).children().to_vec();
            AtomicFormula::positive(arena.push(inverse, children))
        }
        None => atom,
    }
}

/// Atom identity: same polarity and structurally equal expressions.
pub(crate) fn same_atom(arena: &ExprArena, a: &AtomicFormula, b: &AtomicFormula) -> bool {
    a.negated == b.negated && arena.get(a.expr).deep_eq(arena.get(b.expr))
}

fn contains_atom(arena: &ExprArena, group: &OrGroup, atom: &AtomicFormula) -> bool {
    group.iter().any(|other| same_atom(arena, other, atom))
}

fn is_subset(arena: &ExprArena, small: &OrGroup, large: &OrGroup) -> bool {
    small.iter().all(|atom| contains_atom(arena, large, atom))
}

fn dedup_atoms(arena: &ExprArena, group: &mut OrGroup) {
    let mut unique: Vec<AtomicFormula> = Vec::with_capacity(group.len());
    for atom in &group.atoms {
        if !unique.iter().any(|seen| same_atom(arena, seen, atom)) {
            unique.push(*atom);
        }
    }
    group.atoms = unique;
}

/// Finds an atom `a` in some group `G` such that another group holds `NOT a`
/// and its remaining atoms all occur in `G` besides `a`.
fn find_resolvable_atom(arena: &ExprArena, groups: &[OrGroup]) -> Option<(usize, usize)> {
    for (i, group) in groups.iter().enumerate() {
        for (k, atom) in group.iter().enumerate() {
            let complement = atom.negate();
            let resolvable = groups.iter().enumerate().any(|(j, other)| {
                j != i
                    && contains_atom(arena, other, &complement)
                    && other.iter().all(|b| {
                        same_atom(arena, b, &complement)
                            || group
                                .iter()
                                .enumerate()
                                .any(|(m, g)| m != k && same_atom(arena, g, b))
                    })
            });
            if resolvable {
                return Some((i, k));
            }
        }
    }
    None
}
