//! Known relations between two expressions.

use std::cmp::Ordering;
use std::fmt;

use sieve_logical::BinaryOp;

const LT: u8 = 0b001;
const EQ: u8 = 0b010;
const GT: u8 = 0b100;
const ALL: u8 = LT | EQ | GT;

/// The relation known to hold between two expressions.
///
/// Each variant stands for the set of orderings it allows; `Unknown` allows
/// all three.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareResult {
    Equal,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    NotEqual,
    Unknown,
}

impl CompareResult {
    /// The relation expressed by a comparison operator.
    pub const fn from_op(op: BinaryOp) -> Option<Self> {
        match op {
            BinaryOp::Eq => Some(Self::Equal),
            BinaryOp::NotEq => Some(Self::NotEqual),
            BinaryOp::Lt => Some(Self::Less),
            BinaryOp::LtEq => Some(Self::LessOrEqual),
            BinaryOp::Gt => Some(Self::Greater),
            BinaryOp::GtEq => Some(Self::GreaterOrEqual),
            _ => None,
        }
    }

    /// The relation that holds exactly when this one does not.
    #[must_use]
    pub const fn inverse(self) -> Self {
        match self {
            Self::Equal => Self::NotEqual,
            Self::NotEqual => Self::Equal,
            Self::Less => Self::GreaterOrEqual,
            Self::GreaterOrEqual => Self::Less,
            Self::Greater => Self::LessOrEqual,
            Self::LessOrEqual => Self::Greater,
            Self::Unknown => Self::Unknown,
        }
    }

    /// The same relation with the operands exchanged.
    #[must_use]
    pub const fn swap(self) -> Self {
        match self {
            Self::Less => Self::Greater,
            Self::Greater => Self::Less,
            Self::LessOrEqual => Self::GreaterOrEqual,
            Self::GreaterOrEqual => Self::LessOrEqual,
            other => other,
        }
    }

    pub const fn is_unknown(self) -> bool {
        matches!(self, Self::Unknown)
    }

    /// Whether every ordering allowed by `self` is allowed by `other`.
    pub const fn implies(self, other: Self) -> bool {
        self.mask() & !other.mask() == 0
    }

    /// Whether `self` and `other` allow at least one common ordering.
    pub const fn intersects(self, other: Self) -> bool {
        self.mask() & other.mask() != 0
    }

    pub(crate) const fn mask(self) -> u8 {
        match self {
            Self::Equal => EQ,
            Self::Less => LT,
            Self::LessOrEqual => LT | EQ,
            Self::Greater => GT,
            Self::GreaterOrEqual => GT | EQ,
            Self::NotEqual => LT | GT,
            Self::Unknown => ALL,
        }
    }

    /// `None` for the empty set.
    pub(crate) const fn from_mask(mask: u8) -> Option<Self> {
        match mask & ALL {
            EQ => Some(Self::Equal),
            LT => Some(Self::Less),
            GT => Some(Self::Greater),
            0b011 => Some(Self::LessOrEqual),
            0b110 => Some(Self::GreaterOrEqual),
            0b101 => Some(Self::NotEqual),
            ALL => Some(Self::Unknown),
            _ => None,
        }
    }

    pub(crate) const fn from_ordering(ordering: Ordering) -> Self {
        match ordering {
            Ordering::Less => Self::Less,
            Ordering::Equal => Self::Equal,
            Ordering::Greater => Self::Greater,
        }
    }
}

impl fmt::Display for CompareResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Equal => "EQUAL",
            Self::Less => "LESS",
            Self::LessOrEqual => "LESS_OR_EQUAL",
            Self::Greater => "GREATER",
            Self::GreaterOrEqual => "GREATER_OR_EQUAL",
            Self::NotEqual => "NOT_EQUAL",
            Self::Unknown => "UNKNOWN",
        };
        write!(f, "{s}")
    }
}
