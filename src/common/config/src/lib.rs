//! Configuration management for Sieve.
//!
//! Provides the settings that control CNF conversion and constraint-driven
//! predicate optimization.

use serde::{Deserialize, Serialize};

/// Default bound on the number of clauses a CNF conversion may produce.
pub const DEFAULT_MAX_CNF_CLAUSES: usize = 256;

/// Default bound on the depth of an expression tree the optimizer will walk.
pub const DEFAULT_MAX_EXPR_DEPTH: usize = 512;

/// Global Sieve configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SieveConfig {
    /// CNF conversion configuration.
    pub cnf: CnfConfig,
    /// Constraint-driven optimization configuration.
    pub constraints: ConstraintsConfig,
}

impl SieveConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Check that the configuration is usable.
    pub fn validate(&self) -> Result<(), String> {
        if self.cnf.max_clauses == 0 {
            return Err("cnf.max_clauses must be greater than zero".to_string());
        }
        if self.cnf.max_depth == 0 {
            return Err("cnf.max_depth must be greater than zero".to_string());
        }
        Ok(())
    }
}

/// CNF conversion configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CnfConfig {
    /// Maximum number of OR-groups a conversion may produce before it gives up.
    pub max_clauses: usize,
    /// Expressions deeper than this are left as they are.
    pub max_depth: usize,
}

impl Default for CnfConfig {
    fn default() -> Self {
        Self {
            max_clauses: DEFAULT_MAX_CNF_CLAUSES,
            max_depth: DEFAULT_MAX_EXPR_DEPTH,
        }
    }
}

/// Constraint-driven optimization configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstraintsConfig {
    /// Rewrite WHERE clauses using the table's CHECK constraints.
    pub optimize_using_constraints: bool,
    /// Append index-friendly predicates implied by the constraints.
    pub optimize_append_index: bool,
}

impl Default for ConstraintsConfig {
    fn default() -> Self {
        Self {
            optimize_using_constraints: true,
            optimize_append_index: false,
        }
    }
}

impl ConstraintsConfig {
    /// Enable or disable constraint-driven rewriting.
    #[must_use]
    pub fn with_optimize_using_constraints(mut self, enable: bool) -> Self {
        self.optimize_using_constraints = enable;
        self
    }

    /// Enable or disable index predicate appending.
    #[must_use]
    pub fn with_append_index(mut self, enable: bool) -> Self {
        self.optimize_append_index = enable;
        self
    }
}
