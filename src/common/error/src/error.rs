//! Core error types for Sieve.

use thiserror::Error;

/// Result type alias using `SieveError`.
pub type SieveResult<T> = std::result::Result<T, SieveError>;

/// Generic boxed error for external error sources.
pub type GenericError = Box<dyn std::error::Error + Send + Sync>;

/// Core error type for Sieve operations.
///
/// The rewrite pipeline itself never fails: shapes it does not understand are
/// left untouched. Errors come from evaluation, configuration and metadata
/// building.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SieveError {
    /// Type mismatch or invalid type operation.
    #[error("TypeError: {0}")]
    TypeError(String),

    /// Invalid value provided.
    #[error("ValueError: {0}")]
    ValueError(String),

    /// A declared table constraint cannot be used.
    #[error("InvalidConstraint: {0}")]
    InvalidConstraint(String),

    /// Invalid parameter provided.
    #[error("InvalidParameter: {0}")]
    InvalidParameter(String),

    /// Expression evaluation error.
    #[error("EvaluationError: {0}")]
    EvaluationError(String),

    /// Feature not yet implemented.
    #[error("NotImplemented: {0}")]
    NotImplemented(String),

    /// Internal error (bug in Sieve).
    #[error("InternalError: {0}")]
    InternalError(String),

    /// IO error.
    #[error("IoError: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("SerdeJsonError: {0}")]
    SerdeJsonError(#[from] serde_json::Error),

    /// External error from third-party libraries.
    #[error("ExternalError: {0}")]
    ExternalError(GenericError),
}

impl SieveError {
    /// Create a new `TypeError`.
    pub fn type_error<S: Into<String>>(msg: S) -> Self {
        Self::TypeError(msg.into())
    }

    /// Create a new `ValueError`.
    pub fn value_error<S: Into<String>>(msg: S) -> Self {
        Self::ValueError(msg.into())
    }

    /// Create a new `InvalidConstraint` error.
    pub fn invalid_constraint<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConstraint(msg.into())
    }

    /// Create a new `InvalidParameter` error.
    pub fn invalid_parameter<S: Into<String>>(msg: S) -> Self {
        Self::InvalidParameter(msg.into())
    }

    /// Create a new `EvaluationError`.
    pub fn evaluation<S: Into<String>>(msg: S) -> Self {
        Self::EvaluationError(msg.into())
    }

    /// Create a new `NotImplemented` error.
    pub fn not_implemented<S: Into<String>>(msg: S) -> Self {
        Self::NotImplemented(msg.into())
    }

    /// Create a new `InternalError`.
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::InternalError(msg.into())
    }

    /// Wrap an arbitrary external error.
    pub fn external<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::ExternalError(Box::new(err))
    }
}

/// Ensure a condition holds, returning an `InvalidParameter` error if not.
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $msg:expr) => {
        if !$cond {
            return Err($crate::SieveError::InvalidParameter($msg.to_string()));
        }
    };
    ($cond:expr, $variant:ident: $($msg:tt)*) => {
        if !$cond {
            return Err($crate::SieveError::$variant(format!($($msg)*)));
        }
    };
}

/// Return early with a `ValueError`.
#[macro_export]
macro_rules! value_err {
    ($($arg:tt)*) => {
        return Err($crate::SieveError::ValueError(format!($($arg)*)))
    };
}

/// Return early with a `TypeError`.
#[macro_export]
macro_rules! type_err {
    ($($arg:tt)*) => {
        return Err($crate::SieveError::TypeError(format!($($arg)*)))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SieveError::type_error("expected Int64, got String");
        assert_eq!(err.to_string(), "TypeError: expected Int64, got String");
    }

    #[test]
    fn test_error_constructors() {
        let _ = SieveError::value_error("invalid value");
        let _ = SieveError::invalid_constraint("constraint is always false");
        let _ = SieveError::not_implemented("feature X");
        let _ = SieveError::internal("unexpected state");
        let _ = SieveError::evaluation("division by zero");
    }

    fn check_positive(n: i64) -> SieveResult<i64> {
        crate::ensure!(n > 0, InvalidParameter: "expected positive value, got {n}");
        Ok(n)
    }

    fn parse_flag(s: &str) -> SieveResult<bool> {
        match s {
            "on" => Ok(true),
            "off" => Ok(false),
            other => crate::value_err!("unknown flag '{other}'"),
        }
    }

    #[test]
    fn test_macros() {
        assert_eq!(check_positive(3).unwrap(), 3);
        let err = check_positive(-1).unwrap_err();
        assert_eq!(
            err.to_string(),
            "InvalidParameter: expected positive value, got -1"
        );

        assert!(parse_flag("on").unwrap());
        assert!(matches!(parse_flag("maybe"), Err(SieveError::ValueError(_))));
    }

    #[test]
    fn test_external_error() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
        let err = SieveError::external(io);
        assert!(err.to_string().starts_with("ExternalError"));
    }
}
