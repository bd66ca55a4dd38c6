//! Unit tests for common-config crate

use common_config::{
    CnfConfig, ConstraintsConfig, DEFAULT_MAX_CNF_CLAUSES, DEFAULT_MAX_EXPR_DEPTH, SieveConfig,
};
use serde_json;

#[test]
fn test_sieve_config_default() {
    let config = SieveConfig::default();

    assert_eq!(config.cnf.max_clauses, DEFAULT_MAX_CNF_CLAUSES);
    assert_eq!(config.cnf.max_depth, DEFAULT_MAX_EXPR_DEPTH);
    assert!(config.constraints.optimize_using_constraints);
    assert!(!config.constraints.optimize_append_index);
    assert!(config.validate().is_ok());
}

#[test]
fn test_constraints_config_builders() {
    let config = ConstraintsConfig::default()
        .with_optimize_using_constraints(false)
        .with_append_index(true);

    assert!(!config.optimize_using_constraints);
    assert!(config.optimize_append_index);
}

#[test]
fn test_sieve_config_serialization() {
    let mut config = SieveConfig::default();
    config.cnf.max_clauses = 64;
    config.constraints.optimize_append_index = true;

    let json = serde_json::to_string(&config).unwrap();
    let deserialized: SieveConfig = serde_json::from_str(&json).unwrap();

    assert_eq!(deserialized, config);
    assert_eq!(deserialized.cnf.max_clauses, 64);
    assert!(deserialized.constraints.optimize_append_index);
}

#[test]
fn test_cnf_config_serialization() {
    let config = CnfConfig {
        max_clauses: 1000,
        ..CnfConfig::default()
    };

    let json = serde_json::to_string(&config).unwrap();
    assert!(json.contains("max_clauses"));
    assert!(json.contains("1000"));

    let deserialized: CnfConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(deserialized.max_clauses, 1000);
}

#[test]
fn test_partial_json_uses_defaults() {
    let config = SieveConfig::from_json_str(r#"{"constraints": {"optimize_append_index": true}}"#)
        .unwrap();

    assert_eq!(config.cnf.max_clauses, DEFAULT_MAX_CNF_CLAUSES);
    assert!(config.constraints.optimize_using_constraints);
    assert!(config.constraints.optimize_append_index);

    let empty = SieveConfig::from_json_str("{}").unwrap();
    assert_eq!(empty, SieveConfig::default());
}

#[test]
fn test_invalid_json_is_rejected() {
    assert!(SieveConfig::from_json_str(r#"{"cnf": {"max_clauses": "many"}}"#).is_err());
    assert!(SieveConfig::from_json_str("not json").is_err());
}

#[test]
fn test_validate_rejects_zero_clause_bound() {
    let mut config = SieveConfig::default();
    config.cnf.max_clauses = 0;

    let err = config.validate().unwrap_err();
    assert!(err.contains("max_clauses"));
}

#[test]
fn test_validate_rejects_zero_depth_bound() {
    let config = SieveConfig::from_json_str(r#"{"cnf": {"max_depth": 0}}"#).unwrap();

    assert_eq!(config.cnf.max_clauses, DEFAULT_MAX_CNF_CLAUSES);
    let err = config.validate().unwrap_err();
    assert!(err.contains("max_depth"));
}
