//! Table metadata: declared constraints and their derived description.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use common_config::CnfConfig;
use common_error::{SieveError, SieveResult, ensure};
use log::debug;
use sieve_logical::{CnfConverter, Expr};

use crate::constraints::ConstraintsDescription;

/// Metadata snapshot identifier.
pub type SnapshotId = u64;

fn next_snapshot_id() -> SnapshotId {
    static COUNTER: AtomicU64 = AtomicU64::new(1);
    COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// A named CHECK constraint.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintDecl {
    pub name: String,
    pub expr: Expr,
}

impl ConstraintDecl {
    pub fn new(name: impl Into<String>, expr: Expr) -> Self {
        Self {
            name: name.into(),
            expr,
        }
    }
}

/// Immutable metadata for one table.
///
/// The constraint description (and its comparison graph) is built once by
/// [`TableMetadataBuilder::build`] and shared by every query on the table.
#[derive(Debug)]
pub struct TableMetadata {
    name: String,
    snapshot_id: SnapshotId,
    constraints: Vec<ConstraintDecl>,
    index_keys: Vec<Expr>,
    description: Arc<ConstraintsDescription>,
}

impl TableMetadata {
    /// Start building metadata for table `name`.
    pub fn builder(name: impl Into<String>) -> TableMetadataBuilder {
        TableMetadataBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Process-unique id of this metadata snapshot.
    pub fn snapshot_id(&self) -> SnapshotId {
        self.snapshot_id
    }

    pub fn constraints(&self) -> &[ConstraintDecl] {
        &self.constraints
    }

    /// Expressions the table is indexed by.
    pub fn index_keys(&self) -> &[Expr] {
        &self.index_keys
    }

    pub fn description(&self) -> &Arc<ConstraintsDescription> {
        &self.description
    }
}

/// Builder for [`TableMetadata`].
#[derive(Debug)]
pub struct TableMetadataBuilder {
    name: String,
    constraints: Vec<ConstraintDecl>,
    index_keys: Vec<Expr>,
    converter: CnfConverter,
}

impl TableMetadataBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            constraints: Vec::new(),
            index_keys: Vec::new(),
            converter: CnfConverter::default(),
        }
    }

    /// Add a CHECK constraint.
    #[must_use]
    pub fn with_constraint(mut self, name: impl Into<String>, expr: Expr) -> Self {
        self.constraints.push(ConstraintDecl::new(name, expr));
        self
    }

    /// Add an index key expression.
    #[must_use]
    pub fn with_index_key(mut self, key: Expr) -> Self {
        self.index_keys.push(key);
        self
    }

    /// Use the clause and depth bounds from `config` when converting
    /// constraints.
    #[must_use]
    pub fn with_cnf_config(mut self, config: &CnfConfig) -> Self {
        self.converter = CnfConverter::from_config(config);
        self
    }

    /// Validate the declarations and build the constraint description.
    ///
    /// Fails on an empty table name, an empty or duplicate constraint name, a
    /// constraint deeper than the configured depth bound, or a constraint that
    /// can never hold.
    pub fn build(self) -> SieveResult<TableMetadata> {
        ensure!(!self.name.is_empty(), "Table name must not be empty");

        let mut names = HashSet::new();
        for constraint in &self.constraints {
            if constraint.name.is_empty() {
                return Err(SieveError::invalid_constraint(format!(
                    "Constraint on table '{}' has an empty name",
                    self.name
                )));
            }
            if !names.insert(constraint.name.as_str()) {
                return Err(SieveError::invalid_constraint(format!(
                    "Duplicate constraint '{}' on table '{}'",
                    constraint.name, self.name
                )));
            }
            let depth = constraint.expr.root().depth();
            if depth > self.converter.max_depth() {
                return Err(SieveError::invalid_constraint(format!(
                    "Constraint '{}' on table '{}' has depth {depth}, over the limit of {}",
                    constraint.name,
                    self.name,
                    self.converter.max_depth()
                )));
            }
            let cnf = self
                .converter
                .to_cnf(constraint.expr.root())
                .pull_not_out_functions()
                .reduce();
            if cnf.is_always_false() {
                return Err(SieveError::invalid_constraint(format!(
                    "Constraint '{}' on table '{}' is always false: {}",
                    constraint.name, self.name, constraint.expr
                )));
            }
        }

        let description = ConstraintsDescription::new(
            self.constraints.iter().map(|c| c.expr.root()),
            &self.converter,
        );
        let snapshot_id = next_snapshot_id();
        debug!(
            "Loaded metadata for table '{}' (snapshot {}): {} constraints, {} index keys",
            self.name,
            snapshot_id,
            self.constraints.len(),
            self.index_keys.len()
        );

        Ok(TableMetadata {
            name: self.name,
            snapshot_id,
            constraints: self.constraints,
            index_keys: self.index_keys,
            description: Arc::new(description),
        })
    }
}
