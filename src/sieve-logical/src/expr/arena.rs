//! Arena-backed expression trees.
//!
//! Every node lives in an [`ExprArena`] and is addressed by an [`ExprId`].
//! Nodes are immutable once pushed, so a subexpression can be referenced from
//! several parents by id. Each node caches its structural [`Fingerprint`],
//! computed from its kind and its children's fingerprints at construction,
//! and its depth.

use std::collections::{HashMap, HashSet};
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::Hasher;

use sieve_core::Value;

use super::ops::{BinaryOp, UnaryOp, is_negative_function, negate_function};

/// Index of a node inside its [`ExprArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(usize);

impl ExprId {
    /// Position of the node in its arena.
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Order-sensitive structural hash of an expression tree.
///
/// Equal trees always have equal fingerprints. Different trees may collide,
/// so a fingerprint match is only a candidate until [`ExprRef::deep_eq`]
/// confirms it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(u64);

impl Fingerprint {
    /// Raw hash value.
    pub const fn value(self) -> u64 {
        self.0
    }
}

/// The kind of an expression node.
///
/// `Binary`, `Unary` and `Function` nodes share the function-call shape: an
/// operator or name applied to the node's ordered children.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// Literal constant value.
    Literal(Value),
    /// Column reference.
    Column(String),
    /// Binary operation over two children.
    Binary(BinaryOp),
    /// Unary operation over one child.
    Unary(UnaryOp),
    /// Named function applied to its children.
    Function(String),
}

impl ExprKind {
    /// The kind that holds exactly when this one is false, if there is one.
    pub fn negated(&self) -> Option<Self> {
        match self {
            Self::Binary(op) => op.negate().map(Self::Binary),
            Self::Unary(op) => op.negate().map(Self::Unary),
            Self::Function(name) => negate_function(name).map(|n| Self::Function(n.to_string())),
            Self::Literal(_) | Self::Column(_) => None,
        }
    }

    /// Whether this kind is the negative member of a negation pair.
    pub fn is_negative_form(&self) -> bool {
        match self {
            Self::Binary(op) => op.is_negative_form(),
            Self::Unary(op) => op.is_negative_form(),
            Self::Function(name) => is_negative_function(name),
            Self::Literal(_) | Self::Column(_) => false,
        }
    }

    /// Whether this kind has the function-call shape.
    pub const fn is_call(&self) -> bool {
        matches!(self, Self::Binary(_) | Self::Unary(_) | Self::Function(_))
    }

    fn hash_into(&self, state: &mut DefaultHasher) {
        match self {
            Self::Literal(value) => {
                state.write_u8(0);
                value.hash_into(state);
            }
            Self::Column(name) => {
                state.write_u8(1);
                state.write(name.as_bytes());
                state.write_u8(0xff);
            }
            Self::Binary(op) => {
                state.write_u8(2);
                state.write_u8(*op as u8);
            }
            Self::Unary(op) => {
                state.write_u8(3);
                state.write_u8(*op as u8);
            }
            Self::Function(name) => {
                state.write_u8(4);
                state.write(name.as_bytes());
                state.write_u8(0xff);
            }
        }
    }
}

/// A node stored in an [`ExprArena`].
#[derive(Debug, Clone)]
pub struct ExprNode {
    kind: ExprKind,
    children: Vec<ExprId>,
    fingerprint: Fingerprint,
    depth: usize,
}

impl ExprNode {
    /// Node kind.
    pub fn kind(&self) -> &ExprKind {
        &self.kind
    }

    /// Ordered children.
    pub fn children(&self) -> &[ExprId] {
        &self.children
    }

    /// Cached structural fingerprint.
    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    /// Length of the longest path to a leaf, counting this node.
    pub fn depth(&self) -> usize {
        self.depth
    }
}

/// Append-only storage for expression nodes.
#[derive(Debug, Clone, Default)]
pub struct ExprArena {
    nodes: Vec<ExprNode>,
}

impl ExprArena {
    /// Create an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes in the arena.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the arena holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Push a node, computing its fingerprint from its children.
    ///
    /// Children must already live in this arena.
    pub fn push(&mut self, kind: ExprKind, children: Vec<ExprId>) -> ExprId {
        let mut state = DefaultHasher::new();
        kind.hash_into(&mut state);
        state.write_usize(children.len());
        let mut depth = 0;
        for child in &children {
            debug_assert!(child.index() < self.nodes.len(), "child id from another arena");
            let child = &self.nodes[child.index()];
            state.write_u64(child.fingerprint.0);
            depth = depth.max(child.depth);
        }
        let fingerprint = Fingerprint(state.finish());

        let id = ExprId(self.nodes.len());
        self.nodes.push(ExprNode {
            kind,
            children,
            fingerprint,
            depth: depth + 1,
        });
        id
    }

    /// Borrow a node as a handle.
    pub fn get(&self, id: ExprId) -> ExprRef<'_> {
        ExprRef { arena: self, id }
    }

    /// Borrow the raw node.
    pub fn node(&self, id: ExprId) -> &ExprNode {
        &self.nodes[id.index()]
    }

    /// Deep-clone `expr` (possibly from another arena) into this arena.
    pub fn import(&mut self, expr: ExprRef<'_>) -> ExprId {
        let mut memo = HashMap::new();
        self.import_with(expr, &mut memo)
    }

    /// Deep-clone with a caller-held memo so that nodes shared inside the
    /// source arena stay shared after import. The memo must only ever be used
    /// with one source arena.
    pub fn import_with(&mut self, expr: ExprRef<'_>, memo: &mut HashMap<ExprId, ExprId>) -> ExprId {
        // Post-order walk: a node is pushed once all of its children are.
        let mut stack = vec![(expr, false)];
        while let Some((node, expanded)) = stack.pop() {
            if memo.contains_key(&node.id) {
                continue;
            }
            if expanded {
                let children = node.children().map(|child| memo[&child.id]).collect();
                let id = self.push(node.kind().clone(), children);
                memo.insert(node.id, id);
            } else {
                stack.push((node, true));
                stack.extend(
                    node.children()
                        .filter(|child| !memo.contains_key(&child.id))
                        .map(|child| (child, false)),
                );
            }
        }
        memo[&expr.id]
    }

    /// Wrap `root` and this arena into an owned expression.
    pub fn finish(self, root: ExprId) -> Expr {
        Expr::new(self, root)
    }

    // ========== Constructors ==========

    /// Create a literal expression.
    pub fn literal(&mut self, value: impl Into<Value>) -> ExprId {
        self.push(ExprKind::Literal(value.into()), Vec::new())
    }

    /// Create a column reference.
    pub fn column(&mut self, name: impl Into<String>) -> ExprId {
        self.push(ExprKind::Column(name.into()), Vec::new())
    }

    /// Create a binary expression.
    pub fn binary(&mut self, left: ExprId, op: BinaryOp, right: ExprId) -> ExprId {
        self.push(ExprKind::Binary(op), vec![left, right])
    }

    /// Create a unary expression.
    pub fn unary(&mut self, op: UnaryOp, expr: ExprId) -> ExprId {
        self.push(ExprKind::Unary(op), vec![expr])
    }

    /// Create a named function call.
    pub fn function(&mut self, name: impl Into<String>, args: Vec<ExprId>) -> ExprId {
        self.push(ExprKind::Function(name.into()), args)
    }

    // ========== Convenience builders ==========

    /// Logical AND.
    pub fn and(&mut self, left: ExprId, right: ExprId) -> ExprId {
        self.binary(left, BinaryOp::And, right)
    }

    /// Logical OR.
    pub fn or(&mut self, left: ExprId, right: ExprId) -> ExprId {
        self.binary(left, BinaryOp::Or, right)
    }

    /// Logical NOT.
    pub fn not(&mut self, expr: ExprId) -> ExprId {
        self.unary(UnaryOp::Not, expr)
    }

    /// Equality comparison.
    pub fn eq(&mut self, left: ExprId, right: ExprId) -> ExprId {
        self.binary(left, BinaryOp::Eq, right)
    }

    /// Inequality comparison.
    pub fn not_eq(&mut self, left: ExprId, right: ExprId) -> ExprId {
        self.binary(left, BinaryOp::NotEq, right)
    }

    /// Less than comparison.
    pub fn lt(&mut self, left: ExprId, right: ExprId) -> ExprId {
        self.binary(left, BinaryOp::Lt, right)
    }

    /// Less than or equal comparison.
    pub fn lt_eq(&mut self, left: ExprId, right: ExprId) -> ExprId {
        self.binary(left, BinaryOp::LtEq, right)
    }

    /// Greater than comparison.
    pub fn gt(&mut self, left: ExprId, right: ExprId) -> ExprId {
        self.binary(left, BinaryOp::Gt, right)
    }

    /// Greater than or equal comparison.
    pub fn gt_eq(&mut self, left: ExprId, right: ExprId) -> ExprId {
        self.binary(left, BinaryOp::GtEq, right)
    }

    /// Addition.
    pub fn add(&mut self, left: ExprId, right: ExprId) -> ExprId {
        self.binary(left, BinaryOp::Add, right)
    }

    /// Subtraction.
    pub fn sub(&mut self, left: ExprId, right: ExprId) -> ExprId {
        self.binary(left, BinaryOp::Sub, right)
    }

    /// Multiplication.
    pub fn mul(&mut self, left: ExprId, right: ExprId) -> ExprId {
        self.binary(left, BinaryOp::Mul, right)
    }

    /// Division.
    pub fn div(&mut self, left: ExprId, right: ExprId) -> ExprId {
        self.binary(left, BinaryOp::Div, right)
    }

    /// Is null check.
    pub fn is_null(&mut self, expr: ExprId) -> ExprId {
        self.unary(UnaryOp::IsNull, expr)
    }

    /// Is not null check.
    pub fn is_not_null(&mut self, expr: ExprId) -> ExprId {
        self.unary(UnaryOp::IsNotNull, expr)
    }

    /// Left-deep AND of `items`; `None` when empty.
    pub fn conjunction(&mut self, items: impl IntoIterator<Item = ExprId>) -> Option<ExprId> {
        items.into_iter().reduce(|acc, item| self.and(acc, item))
    }

    /// Left-deep OR of `items`; `None` when empty.
    pub fn disjunction(&mut self, items: impl IntoIterator<Item = ExprId>) -> Option<ExprId> {
        items.into_iter().reduce(|acc, item| self.or(acc, item))
    }
}

/// Borrowed handle to one expression node and, through it, its subtree.
#[derive(Clone, Copy)]
pub struct ExprRef<'a> {
    arena: &'a ExprArena,
    id: ExprId,
}

impl<'a> ExprRef<'a> {
    /// Node id inside [`Self::arena`].
    pub fn id(&self) -> ExprId {
        self.id
    }

    /// The arena that owns the node.
    pub fn arena(&self) -> &'a ExprArena {
        self.arena
    }

    /// Node kind.
    pub fn kind(&self) -> &'a ExprKind {
        &self.arena.nodes[self.id.index()].kind
    }

    /// Cached structural fingerprint.
    pub fn fingerprint(&self) -> Fingerprint {
        self.arena.nodes[self.id.index()].fingerprint
    }

    /// Length of the longest path to a leaf, counting this node.
    pub fn depth(&self) -> usize {
        self.arena.nodes[self.id.index()].depth
    }

    /// Number of children.
    pub fn arity(&self) -> usize {
        self.arena.nodes[self.id.index()].children.len()
    }

    /// Ordered children.
    pub fn children(self) -> impl ExactSizeIterator<Item = ExprRef<'a>> + 'a {
        let arena = self.arena;
        arena.nodes[self.id.index()]
            .children
            .iter()
            .map(move |&id| ExprRef { arena, id })
    }

    /// The `index`-th child.
    pub fn child(&self, index: usize) -> Option<ExprRef<'a>> {
        self.arena.nodes[self.id.index()]
            .children
            .get(index)
            .map(|&id| ExprRef {
                arena: self.arena,
                id,
            })
    }

    /// Literal payload, if this is a literal.
    pub fn as_literal(&self) -> Option<&'a Value> {
        match self.kind() {
            ExprKind::Literal(value) => Some(value),
            _ => None,
        }
    }

    /// Column name, if this is a column reference.
    pub fn as_column(&self) -> Option<&'a str> {
        match self.kind() {
            ExprKind::Column(name) => Some(name),
            _ => None,
        }
    }

    /// Name of the applied operator or function, for call-shaped nodes.
    pub fn call_name(&self) -> Option<&'a str> {
        match self.kind() {
            ExprKind::Binary(op) => Some(op.symbol()),
            ExprKind::Unary(op) => Some(match op {
                UnaryOp::Not => "NOT",
                UnaryOp::Neg => "-",
                UnaryOp::IsNull => "IS NULL",
                UnaryOp::IsNotNull => "IS NOT NULL",
            }),
            ExprKind::Function(name) => Some(name),
            ExprKind::Literal(_) | ExprKind::Column(_) => None,
        }
    }

    /// Operator and operands, if this is a binary operation.
    pub fn as_binary(&self) -> Option<(BinaryOp, ExprRef<'a>, ExprRef<'a>)> {
        match self.kind() {
            ExprKind::Binary(op) => Some((*op, self.child(0)?, self.child(1)?)),
            _ => None,
        }
    }

    /// Operator and operands, if this is a binary comparison.
    pub fn as_comparison(&self) -> Option<(BinaryOp, ExprRef<'a>, ExprRef<'a>)> {
        self.as_binary().filter(|(op, _, _)| op.is_comparison())
    }

    /// Structural equality, valid across arenas.
    ///
    /// Fingerprints are compared first to reject quickly; a match is then
    /// verified node by node so that hash collisions never make two different
    /// trees look equal. Each pair of nodes is verified once, so shared
    /// subexpressions cost no more than their distinct nodes.
    pub fn deep_eq(&self, other: ExprRef<'_>) -> bool {
        let same_arena = std::ptr::eq(self.arena, other.arena);
        let mut verified = HashSet::new();
        let mut pending = vec![(*self, other)];
        while let Some((left, right)) = pending.pop() {
            if same_arena && left.id == right.id {
                continue;
            }
            if left.fingerprint() != right.fingerprint()
                || left.kind() != right.kind()
                || left.arity() != right.arity()
            {
                return false;
            }
            if verified.insert((left.id, right.id)) {
                pending.extend(left.children().zip(right.children()));
            }
        }
        true
    }
}

impl fmt::Display for ExprRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            ExprKind::Literal(value) => write!(f, "{value}"),
            ExprKind::Column(name) => write!(f, "{name}"),
            ExprKind::Binary(op) => match (self.child(0), self.child(1)) {
                (Some(left), Some(right)) => write!(f, "({left} {op} {right})"),
                _ => write!(f, "<malformed {op}>"),
            },
            ExprKind::Unary(op) => match self.child(0) {
                Some(expr) if op.is_postfix() => write!(f, "{expr} {op}"),
                Some(expr) if *op == UnaryOp::Neg => write!(f, "-{expr}"),
                Some(expr) => write!(f, "{op} {expr}"),
                None => write!(f, "<malformed {op}>"),
            },
            ExprKind::Function(name) => {
                let args = self
                    .children()
                    .map(|c| c.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "{name}({args})")
            }
        }
    }
}

impl fmt::Debug for ExprRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ExprRef({:?}: {self})", self.id)
    }
}

/// An owned expression tree: an arena plus its root.
#[derive(Debug, Clone)]
pub struct Expr {
    arena: ExprArena,
    root: ExprId,
}

impl Expr {
    /// Create from an arena and a root inside it.
    pub fn new(arena: ExprArena, root: ExprId) -> Self {
        Self { arena, root }
    }

    /// Build an expression with a closure over a fresh arena.
    ///
    /// ```rust
    /// use sieve_logical::Expr;
    ///
    /// let expr = Expr::build(|a| {
    ///     let x = a.column("x");
    ///     let zero = a.literal(0i64);
    ///     a.gt(x, zero)
    /// });
    /// assert_eq!(expr.to_string(), "(x > 0)");
    /// ```
    pub fn build(f: impl FnOnce(&mut ExprArena) -> ExprId) -> Self {
        let mut arena = ExprArena::new();
        let root = f(&mut arena);
        Self { arena, root }
    }

    /// A single literal.
    pub fn literal(value: impl Into<Value>) -> Self {
        Self::build(|a| a.literal(value))
    }

    /// Handle to the root node.
    pub fn root(&self) -> ExprRef<'_> {
        self.arena.get(self.root)
    }

    /// Root id inside [`Self::arena`].
    pub fn root_id(&self) -> ExprId {
        self.root
    }

    /// The backing arena.
    pub fn arena(&self) -> &ExprArena {
        &self.arena
    }

    /// Split into arena and root.
    pub fn into_parts(self) -> (ExprArena, ExprId) {
        (self.arena, self.root)
    }

    /// Copy only the nodes reachable from the root into a fresh arena.
    #[must_use]
    pub fn compact(&self) -> Self {
        let mut arena = ExprArena::new();
        let root = arena.import(self.root());
        Self { arena, root }
    }

    /// Structural equality with another owned expression.
    pub fn deep_eq(&self, other: &Self) -> bool {
        self.root().deep_eq(other.root())
    }
}

impl PartialEq for Expr {
    fn eq(&self, other: &Self) -> bool {
        self.deep_eq(other)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.root())
    }
}
