//! Equality and ordering facts derived from comparison constraints.
//!
//! Vertices are expressions. Expressions proven equal are grouped into
//! classes, and classes are related by strict (`<`) or non-strict (`<=`)
//! paths computed as a transitive closure over the declared comparisons and
//! the natural order of the literals that appear in them.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use log::debug;
use sieve_core::Value;
use sieve_logical::{BinaryOp, ExprArena, ExprId, ExprRef, Fingerprint};

use super::compare::CompareResult;

/// Strength of a path between two classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Path {
    None,
    NonStrict,
    Strict,
}

impl Path {
    fn join(self, other: Self) -> Self {
        match (self, other) {
            (Self::None, _) | (_, Self::None) => Self::None,
            (Self::Strict, _) | (_, Self::Strict) => Self::Strict,
            _ => Self::NonStrict,
        }
    }
}

/// A constant bound: the value and whether the bound is strict.
type Bound = Option<(Value, bool)>;

#[derive(Debug, Clone)]
struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (a, b) = (self.find(a), self.find(b));
        if a != b {
            self.parent[b.max(a)] = a.min(b);
        }
    }

    /// Dense class ids in first-seen order, and the number of classes.
    fn compact(&mut self) -> (Vec<usize>, usize) {
        let mut ids = HashMap::new();
        let mut class_of = Vec::with_capacity(self.parent.len());
        for x in 0..self.parent.len() {
            let root = self.find(x);
            let next = ids.len();
            class_of.push(*ids.entry(root).or_insert(next));
        }
        (class_of, ids.len())
    }
}

/// Comparison facts over equivalence classes of expressions.
#[derive(Debug, Clone, Default)]
pub struct ComparisonGraph {
    arena: ExprArena,
    vertices: Vec<ExprId>,
    index: HashMap<Fingerprint, Vec<usize>>,
    vertex_class: Vec<usize>,
    classes: Vec<Vec<usize>>,
    paths: Vec<Vec<Path>>,
    not_equal: HashSet<(usize, usize)>,
    constants: Vec<Option<Value>>,
    lower: Vec<Bound>,
    upper: Vec<Bound>,
}

impl ComparisonGraph {
    /// Build from comparisons known to hold on every row.
    ///
    /// Non-comparison operators are ignored.
    pub fn build<'a, I>(comparisons: I) -> Self
    where
        I: IntoIterator<Item = (BinaryOp, ExprRef<'a>, ExprRef<'a>)>,
    {
        let mut graph = Self::default();
        let mut equal = Vec::new();
        let mut less = Vec::new();
        let mut not_equal = Vec::new();

        for (op, lhs, rhs) in comparisons {
            let (op, lhs, rhs) = match op {
                BinaryOp::Gt | BinaryOp::GtEq => match op.swap() {
                    Some(swapped) => (swapped, rhs, lhs),
                    None => continue,
                },
                BinaryOp::Eq | BinaryOp::NotEq | BinaryOp::Lt | BinaryOp::LtEq => (op, lhs, rhs),
                _ => continue,
            };
            let l = graph.add_vertex(lhs);
            let r = graph.add_vertex(rhs);
            match op {
                BinaryOp::Eq => equal.push((l, r)),
                BinaryOp::NotEq => not_equal.push((l, r)),
                BinaryOp::Lt => less.push((l, r, Path::Strict)),
                _ => less.push((l, r, Path::NonStrict)),
            }
        }

        // Literals relate to each other by value.
        let literals: Vec<(usize, &Value)> = graph
            .vertices
            .iter()
            .enumerate()
            .filter_map(|(v, id)| graph.arena.get(*id).as_literal().map(|value| (v, value)))
            .filter(|(_, value)| !value.is_null())
            .collect();
        for (i, (u, lu)) in literals.iter().enumerate() {
            for (v, lv) in &literals[i + 1..] {
                match lu.compare(lv) {
                    Some(Ordering::Equal) => equal.push((*u, *v)),
                    Some(Ordering::Less) => less.push((*u, *v, Path::Strict)),
                    Some(Ordering::Greater) => less.push((*v, *u, Path::Strict)),
                    None => {}
                }
            }
        }

        let mut vertex_sets = DisjointSet::new(graph.vertices.len());
        for (u, v) in equal {
            vertex_sets.union(u, v);
        }
        let (vertex_class, class_count) = vertex_sets.compact();

        let mut paths = vec![vec![Path::None; class_count]; class_count];
        for (u, v, strength) in less {
            let (a, b) = (vertex_class[u], vertex_class[v]);
            paths[a][b] = paths[a][b].max(strength);
        }
        close(&mut paths);

        // Classes bounded by each other through non-strict paths are equal.
        let mut class_sets = DisjointSet::new(class_count);
        for a in 0..class_count {
            for b in a + 1..class_count {
                if paths[a][b] == Path::NonStrict && paths[b][a] == Path::NonStrict {
                    class_sets.union(a, b);
                }
            }
        }
        let (merged, merged_count) = class_sets.compact();
        let mut merged_paths = vec![vec![Path::None; merged_count]; merged_count];
        for a in 0..class_count {
            for b in 0..class_count {
                let (ma, mb) = (merged[a], merged[b]);
                merged_paths[ma][mb] = merged_paths[ma][mb].max(paths[a][b]);
            }
        }

        graph.vertex_class = vertex_class.iter().map(|c| merged[*c]).collect();
        graph.classes = vec![Vec::new(); merged_count];
        for (v, class) in graph.vertex_class.iter().enumerate() {
            graph.classes[*class].push(v);
        }
        graph.paths = merged_paths;
        graph.not_equal = not_equal
            .into_iter()
            .map(|(u, v)| {
                let (a, b) = (graph.vertex_class[u], graph.vertex_class[v]);
                (a.min(b), a.max(b))
            })
            .collect();
        graph.constants = (0..merged_count).map(|c| graph.class_constant(c)).collect();
        graph.lower = (0..merged_count).map(|c| graph.class_bound(c, true)).collect();
        graph.upper = (0..merged_count).map(|c| graph.class_bound(c, false)).collect();

        debug!(
            "Built comparison graph with {} vertices in {} classes",
            graph.vertices.len(),
            graph.classes.len()
        );
        graph
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// The relation known between `lhs` and `rhs`.
    ///
    /// All known facts are intersected: direct literal comparison, paths
    /// between classes, declared inequalities, and constant bounds. A
    /// contradictory intersection is reported as `Unknown`.
    pub fn compare(&self, lhs: ExprRef<'_>, rhs: ExprRef<'_>) -> CompareResult {
        let mut mask = CompareResult::Unknown.mask();

        if let (Some(l), Some(r)) = (lhs.as_literal(), rhs.as_literal())
            && let Some(ordering) = l.compare(r)
        {
            mask &= CompareResult::from_ordering(ordering).mask();
        }

        let (lc, rc) = (self.class_of(lhs), self.class_of(rhs));
        if let (Some(a), Some(b)) = (lc, rc) {
            if a == b {
                mask &= CompareResult::Equal.mask();
            } else {
                match self.paths[a][b] {
                    Path::Strict => mask &= CompareResult::Less.mask(),
                    Path::NonStrict => mask &= CompareResult::LessOrEqual.mask(),
                    Path::None => {}
                }
                match self.paths[b][a] {
                    Path::Strict => mask &= CompareResult::Greater.mask(),
                    Path::NonStrict => mask &= CompareResult::GreaterOrEqual.mask(),
                    Path::None => {}
                }
                if self.not_equal.contains(&(a.min(b), a.max(b))) {
                    mask &= CompareResult::NotEqual.mask();
                }
            }
        }

        let (l_lower, l_upper) = self.bounds(lhs, lc);
        let (r_lower, r_upper) = self.bounds(rhs, rc);
        if let Some(known) = bound_relation(l_upper, r_lower) {
            mask &= known.mask();
        }
        if let Some(known) = bound_relation(r_upper, l_lower) {
            mask &= known.swap().mask();
        }

        CompareResult::from_mask(mask).unwrap_or(CompareResult::Unknown)
    }

    /// Whether the known relation between `lhs` and `rhs` implies `expected`.
    pub fn is_always_compare(
        &self,
        expected: CompareResult,
        lhs: ExprRef<'_>,
        rhs: ExprRef<'_>,
    ) -> bool {
        let known = self.compare(lhs, rhs);
        !expected.is_unknown() && !known.is_unknown() && known.implies(expected)
    }

    /// False only when the known relation excludes `expected`.
    pub fn is_possible_compare(
        &self,
        expected: CompareResult,
        lhs: ExprRef<'_>,
        rhs: ExprRef<'_>,
    ) -> bool {
        expected.is_unknown() || self.compare(lhs, rhs).intersects(expected)
    }

    /// The single literal value `expr` is known to equal.
    pub fn get_equal_const(&self, expr: ExprRef<'_>) -> Option<&Value> {
        self.class_of(expr)
            .and_then(|class| self.constants[class].as_ref())
    }

    /// Every expression known to equal `expr`, including itself when it is
    /// part of the graph.
    pub fn get_equal(&self, expr: ExprRef<'_>) -> Vec<ExprRef<'_>> {
        match self.class_of(expr) {
            Some(class) => self.classes[class]
                .iter()
                .map(|v| self.arena.get(self.vertices[*v]))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Whether `expr` can never be NULL on a row that satisfies the
    /// constraints: it is a vertex of a comparison that holds on every row,
    /// or a non-null literal.
    pub fn is_known_non_null(&self, expr: ExprRef<'_>) -> bool {
        match expr.as_literal() {
            Some(value) => !value.is_null(),
            None => self.find_vertex(expr).is_some(),
        }
    }

    /// Replace every maximal subexpression of `id` that is known to equal a
    /// constant with that constant.
    ///
    /// Literals are left alone and a replaced subexpression is not descended
    /// into. No arithmetic is evaluated. Applying it twice gives the same
    /// result as applying it once. Each distinct node is visited once, so
    /// shared subexpressions are substituted once and stay shared.
    pub fn substitute_constants(&self, arena: &mut ExprArena, id: ExprId) -> ExprId {
        let mut done: HashMap<ExprId, ExprId> = HashMap::new();
        let mut stack = vec![(id, false)];
        while let Some((current, expanded)) = stack.pop() {
            if done.contains_key(&current) {
                continue;
            }
            if !expanded {
                if let Some(replaced) = self.substitute_node(arena, current) {
                    done.insert(current, replaced);
                    continue;
                }
                let children = arena.node(current).children();
                if children.is_empty() {
                    done.insert(current, current);
                    continue;
                }
                stack.push((current, true));
                stack.extend(
                    children
                        .iter()
                        .filter(|child| !done.contains_key(child))
                        .map(|child| (*child, false)),
                );
                continue;
            }

            let node = arena.node(current);
            let kind = node.kind().clone();
            let children = node.children().to_vec();
            let replaced: Vec<ExprId> = children
                .iter()
                .map(|child| done.get(child).copied().unwrap_or(*child))
                .collect();
            let result = if replaced == children {
                current
            } else {
                // the rebuilt node may itself be a known constant
                let rebuilt = arena.push(kind, replaced);
                self.substitute_node(arena, rebuilt).unwrap_or(rebuilt)
            };
            done.insert(current, result);
        }
        done.get(&id).copied().unwrap_or(id)
    }

    /// The final form of `id` when it needs no descent: itself for a
    /// literal, or its known constant.
    fn substitute_node(&self, arena: &mut ExprArena, id: ExprId) -> Option<ExprId> {
        let node = arena.get(id);
        if node.as_literal().is_some() {
            return Some(id);
        }
        let value = self.get_equal_const(node)?.clone();
        Some(arena.literal(value))
    }

    /// Greatest constant `expr` is known to be above.
    pub fn const_lower_bound(&self, expr: ExprRef<'_>) -> Option<(&Value, bool)> {
        let class = self.class_of(expr)?;
        self.lower[class].as_ref().map(|(v, strict)| (v, *strict))
    }

    /// Least constant `expr` is known to be below.
    pub fn const_upper_bound(&self, expr: ExprRef<'_>) -> Option<(&Value, bool)> {
        let class = self.class_of(expr)?;
        self.upper[class].as_ref().map(|(v, strict)| (v, *strict))
    }

    fn add_vertex(&mut self, expr: ExprRef<'_>) -> usize {
        if let Some(v) = self.find_vertex(expr) {
            return v;
        }
        let id = self.arena.import(expr);
        let v = self.vertices.len();
        self.vertices.push(id);
        self.index.entry(expr.fingerprint()).or_default().push(v);
        v
    }

    fn find_vertex(&self, expr: ExprRef<'_>) -> Option<usize> {
        self.index
            .get(&expr.fingerprint())?
            .iter()
            .copied()
            .find(|v| self.arena.get(self.vertices[*v]).deep_eq(expr))
    }

    fn class_of(&self, expr: ExprRef<'_>) -> Option<usize> {
        self.find_vertex(expr).map(|v| self.vertex_class[v])
    }

    /// Bounds of an expression: its class bounds, or itself for a literal
    /// outside the graph.
    fn bounds<'s>(
        &'s self,
        expr: ExprRef<'s>,
        class: Option<usize>,
    ) -> (Option<(&'s Value, bool)>, Option<(&'s Value, bool)>) {
        match class {
            Some(class) => (
                self.lower[class].as_ref().map(|(v, s)| (v, *s)),
                self.upper[class].as_ref().map(|(v, s)| (v, *s)),
            ),
            None => match expr.as_literal() {
                Some(value) if !value.is_null() => (Some((value, false)), Some((value, false))),
                _ => (None, None),
            },
        }
    }

    /// The literal of a class when all of its literals agree.
    fn class_constant(&self, class: usize) -> Option<Value> {
        let mut constant: Option<&Value> = None;
        for v in &self.classes[class] {
            let Some(value) = self.arena.get(self.vertices[*v]).as_literal() else {
                continue;
            };
            if value.is_null() {
                return None;
            }
            match constant {
                None => constant = Some(value),
                Some(seen) if seen.compare(value) == Some(Ordering::Equal) => {}
                Some(_) => return None,
            }
        }
        constant.cloned()
    }

    /// Tightest constant bound of `class` from below (`lower`) or above.
    fn class_bound(&self, class: usize, lower: bool) -> Bound {
        let mut best: Option<(&Value, bool)> = None;
        for (other, constant) in self.constants.iter().enumerate() {
            let Some(value) = constant else {
                continue;
            };
            let path = if other == class {
                Path::NonStrict
            } else if lower {
                self.paths[other][class]
            } else {
                self.paths[class][other]
            };
            if path == Path::None {
                continue;
            }
            let strict = path == Path::Strict;
            best = match best {
                None => Some((value, strict)),
                Some((current, current_strict)) => match value.compare(current) {
                    Some(Ordering::Greater) if lower => Some((value, strict)),
                    Some(Ordering::Less) if !lower => Some((value, strict)),
                    Some(Ordering::Equal) => Some((current, current_strict || strict)),
                    _ => Some((current, current_strict)),
                },
            };
        }
        best.map(|(value, strict)| (value.clone(), strict))
    }
}

/// Relation implied by `lhs <= upper` and `rhs >= lower`.
fn bound_relation(upper: Option<(&Value, bool)>, lower: Option<(&Value, bool)>) -> Option<CompareResult> {
    let ((upper, upper_strict), (lower, lower_strict)) = (upper?, lower?);
    match upper.compare(lower)? {
        Ordering::Less => Some(CompareResult::Less),
        Ordering::Equal if upper_strict || lower_strict => Some(CompareResult::Less),
        Ordering::Equal => Some(CompareResult::LessOrEqual),
        Ordering::Greater => None,
    }
}

/// Floyd-Warshall closure keeping the strongest path.
fn close(paths: &mut [Vec<Path>]) {
    let n = paths.len();
    for k in 0..n {
        for i in 0..n {
            if paths[i][k] == Path::None {
                continue;
            }
            for j in 0..n {
                let through = paths[i][k].join(paths[k][j]);
                if through > paths[i][j] {
                    paths[i][j] = through;
                }
            }
        }
    }
}
