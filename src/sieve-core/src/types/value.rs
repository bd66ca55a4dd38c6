//! Literal value representation.

use std::cmp::Ordering;
use std::hash::Hasher;

use serde::{Deserialize, Serialize};

/// Largest integer magnitude that converts to `f64` without rounding.
const MAX_EXACT_F64_INT: i64 = 1 << 53;

/// Literal value carried by expression leaves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit floating point.
    Float64(f64),
    /// UTF-8 string.
    String(String),
    /// Date (days since Unix epoch).
    Date(i32),
    /// Timestamp (nanoseconds since Unix epoch).
    Timestamp(i64),
}

impl Value {
    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Try to get as boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get as i64.
    pub fn as_int64(&self) -> Option<i64> {
        match self {
            Self::Int64(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to get as f64.
    pub fn as_float64(&self) -> Option<f64> {
        match self {
            Self::Float64(f) => Some(*f),
            Self::Int64(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Try to get as string reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Truthiness used by filters: `true` or a non-zero integer.
    pub fn is_true(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Int64(i) => *i != 0,
            _ => false,
        }
    }

    /// Get the type name for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "Null",
            Self::Bool(_) => "Bool",
            Self::Int64(_) => "Int64",
            Self::Float64(_) => "Float64",
            Self::String(_) => "String",
            Self::Date(_) => "Date",
            Self::Timestamp(_) => "Timestamp",
        }
    }

    /// Compare two values under SQL ordering.
    ///
    /// Returns `None` when the values are not comparable: a `Null` operand,
    /// a NaN, values of different type families, or an integer too large to
    /// be compared exactly with a float.
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Bool(l), Self::Bool(r)) => Some(l.cmp(r)),
            (Self::Int64(l), Self::Int64(r)) => Some(l.cmp(r)),
            (Self::Float64(l), Self::Float64(r)) => l.partial_cmp(r),
            (Self::Int64(l), Self::Float64(r)) => exact_f64(*l)?.partial_cmp(r),
            (Self::Float64(l), Self::Int64(r)) => l.partial_cmp(&exact_f64(*r)?),
            (Self::String(l), Self::String(r)) => Some(l.cmp(r)),
            (Self::Date(l), Self::Date(r)) => Some(l.cmp(r)),
            (Self::Timestamp(l), Self::Timestamp(r)) => Some(l.cmp(r)),
            _ => None,
        }
    }

    /// Feed a structural hash of this value into `state`.
    ///
    /// Floats hash by bit pattern, so `0.0` and `-0.0` hash differently just as
    /// they differ structurally.
    pub fn hash_into<H: Hasher>(&self, state: &mut H) {
        match self {
            Self::Null => state.write_u8(0),
            Self::Bool(b) => {
                state.write_u8(1);
                state.write_u8(u8::from(*b));
            }
            Self::Int64(i) => {
                state.write_u8(2);
                state.write_i64(*i);
            }
            Self::Float64(f) => {
                state.write_u8(3);
                state.write_u64(f.to_bits());
            }
            Self::String(s) => {
                state.write_u8(4);
                state.write(s.as_bytes());
                state.write_u8(0xff);
            }
            Self::Date(d) => {
                state.write_u8(5);
                state.write_i32(*d);
            }
            Self::Timestamp(t) => {
                state.write_u8(6);
                state.write_i64(*t);
            }
        }
    }
}

fn exact_f64(i: i64) -> Option<f64> {
    (-MAX_EXACT_F64_INT..=MAX_EXACT_F64_INT)
        .contains(&i)
        .then_some(i as f64)
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int64(i) => write!(f, "{i}"),
            Self::Float64(v) => write!(f, "{v:?}"),
            Self::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Self::Date(d) => write!(f, "DATE({d})"),
            Self::Timestamp(t) => write!(f, "TIMESTAMP({t})"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int64(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int64(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float64(f)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}
