//! Binary and unary operators for logical expressions.

use serde::{Deserialize, Serialize};

/// Binary operators for logical expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    // Arithmetic operators
    /// Addition (+)
    Add,
    /// Subtraction (-)
    Sub,
    /// Multiplication (*)
    Mul,
    /// Division (/)
    Div,
    /// Modulo (%)
    Mod,

    // Comparison operators
    /// Equality (=)
    Eq,
    /// Inequality (<>)
    NotEq,
    /// Less than (<)
    Lt,
    /// Less than or equal (<=)
    LtEq,
    /// Greater than (>)
    Gt,
    /// Greater than or equal (>=)
    GtEq,

    // Logical operators (three-valued logic)
    /// Logical AND
    And,
    /// Logical OR
    Or,
}

impl BinaryOp {
    /// Check if this is an arithmetic operator.
    pub const fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            Self::Add | Self::Sub | Self::Mul | Self::Div | Self::Mod
        )
    }

    /// Check if this is a comparison operator.
    pub const fn is_comparison(&self) -> bool {
        matches!(
            self,
            Self::Eq | Self::NotEq | Self::Lt | Self::LtEq | Self::Gt | Self::GtEq
        )
    }

    /// Check if this is a logical operator.
    pub const fn is_logical(&self) -> bool {
        matches!(self, Self::And | Self::Or)
    }

    /// The comparison that holds exactly when this one is false.
    ///
    /// `NOT (a < b)` is `a >= b`; both sides are NULL together, so the
    /// rewrite also holds under three-valued logic.
    pub const fn negate(&self) -> Option<Self> {
        match self {
            Self::Eq => Some(Self::NotEq),
            Self::NotEq => Some(Self::Eq),
            Self::Lt => Some(Self::GtEq),
            Self::GtEq => Some(Self::Lt),
            Self::LtEq => Some(Self::Gt),
            Self::Gt => Some(Self::LtEq),
            _ => None,
        }
    }

    /// The comparison obtained by swapping the operands (`a < b` is `b > a`).
    pub const fn swap(&self) -> Option<Self> {
        match self {
            Self::Eq => Some(Self::Eq),
            Self::NotEq => Some(Self::NotEq),
            Self::Lt => Some(Self::Gt),
            Self::Gt => Some(Self::Lt),
            Self::LtEq => Some(Self::GtEq),
            Self::GtEq => Some(Self::LtEq),
            _ => None,
        }
    }

    /// Whether this is the negative member of a negation pair.
    ///
    /// Negative comparisons are stored as a negated positive one in canonical
    /// CNF (`a != b` becomes `NOT (a = b)`).
    pub const fn is_negative_form(&self) -> bool {
        matches!(self, Self::NotEq | Self::Gt | Self::GtEq)
    }

    /// Get the operator symbol for display.
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Eq => "=",
            Self::NotEq => "<>",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::And => "AND",
            Self::Or => "OR",
        }
    }
}

impl std::fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Unary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    /// Logical NOT.
    Not,
    /// Numeric negation.
    Neg,
    /// Is null check.
    IsNull,
    /// Is not null check.
    IsNotNull,
}

impl UnaryOp {
    /// The predicate that holds exactly when this one is false.
    pub const fn negate(&self) -> Option<Self> {
        match self {
            Self::IsNull => Some(Self::IsNotNull),
            Self::IsNotNull => Some(Self::IsNull),
            _ => None,
        }
    }

    /// Whether this is the negative member of a negation pair.
    pub const fn is_negative_form(&self) -> bool {
        matches!(self, Self::IsNotNull)
    }

    /// Whether the operator is written after its operand.
    pub const fn is_postfix(&self) -> bool {
        matches!(self, Self::IsNull | Self::IsNotNull)
    }
}

impl std::fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Not => write!(f, "NOT"),
            Self::Neg => write!(f, "-"),
            Self::IsNull => write!(f, "IS NULL"),
            Self::IsNotNull => write!(f, "IS NOT NULL"),
        }
    }
}

/// Named predicate functions that come in negation pairs, positive first.
pub(crate) const NEGATED_FUNCTIONS: &[(&str, &str)] =
    &[("like", "notLike"), ("in", "notIn"), ("empty", "notEmpty")];

/// The function name that holds exactly when `name` is false.
pub fn negate_function(name: &str) -> Option<&'static str> {
    NEGATED_FUNCTIONS.iter().find_map(|(pos, neg)| {
        if *pos == name {
            Some(*neg)
        } else if *neg == name {
            Some(*pos)
        } else {
            None
        }
    })
}

/// Whether `name` is the negative member of a function negation pair.
pub fn is_negative_function(name: &str) -> bool {
    NEGATED_FUNCTIONS.iter().any(|(_, neg)| *neg == name)
}
