//! Row-at-a-time expression evaluation under three-valued logic.

use std::cmp::Ordering;

use common_error::{SieveError, SieveResult};
use sieve_core::{Row, Value};

use crate::expr::{BinaryOp, ExprKind, ExprRef, UnaryOp};

/// Expression evaluator over a single [`Row`].
///
/// `NULL` propagates through arithmetic and comparisons; `AND`, `OR` and `NOT`
/// follow SQL three-valued logic.
#[derive(Debug, Default)]
pub struct ExprEvaluator;

impl ExprEvaluator {
    /// Create a new expression evaluator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Evaluate an expression against a row.
    pub fn evaluate(&self, expr: ExprRef<'_>, row: &Row) -> SieveResult<Value> {
        match expr.kind() {
            ExprKind::Literal(value) => Ok(value.clone()),

            ExprKind::Column(name) => row
                .get(name)
                .cloned()
                .ok_or_else(|| SieveError::evaluation(format!("Unknown column '{name}'"))),

            ExprKind::Binary(op) => {
                let (Some(left), Some(right)) = (expr.child(0), expr.child(1)) else {
                    return Err(SieveError::internal(format!("{op} expects two operands")));
                };
                self.eval_binary(left, *op, right, row)
            }

            ExprKind::Unary(op) => {
                let Some(operand) = expr.child(0) else {
                    return Err(SieveError::internal(format!("{op} expects one operand")));
                };
                self.eval_unary(*op, operand, row)
            }

            ExprKind::Function(name) => {
                let args = expr
                    .children()
                    .map(|arg| self.evaluate(arg, row))
                    .collect::<SieveResult<Vec<_>>>()?;
                eval_function(name, &args)
            }
        }
    }

    /// Evaluate a predicate: `Some(true)`, `Some(false)`, or `None` for NULL.
    pub fn evaluate_predicate(&self, expr: ExprRef<'_>, row: &Row) -> SieveResult<Option<bool>> {
        let value = self.evaluate(expr, row)?;
        to_bool(&value)
    }

    fn eval_binary(
        &self,
        left: ExprRef<'_>,
        op: BinaryOp,
        right: ExprRef<'_>,
        row: &Row,
    ) -> SieveResult<Value> {
        match op {
            BinaryOp::And => {
                let l = self.evaluate_predicate(left, row)?;
                if l == Some(false) {
                    return Ok(Value::Bool(false));
                }
                let r = self.evaluate_predicate(right, row)?;
                Ok(match (l, r) {
                    (_, Some(false)) => Value::Bool(false),
                    (Some(true), Some(true)) => Value::Bool(true),
                    _ => Value::Null,
                })
            }
            BinaryOp::Or => {
                let l = self.evaluate_predicate(left, row)?;
                if l == Some(true) {
                    return Ok(Value::Bool(true));
                }
                let r = self.evaluate_predicate(right, row)?;
                Ok(match (l, r) {
                    (_, Some(true)) => Value::Bool(true),
                    (Some(false), Some(false)) => Value::Bool(false),
                    _ => Value::Null,
                })
            }
            _ => {
                let l = self.evaluate(left, row)?;
                let r = self.evaluate(right, row)?;
                if op.is_comparison() {
                    eval_comparison(&l, op, &r)
                } else {
                    eval_arithmetic(&l, op, &r)
                }
            }
        }
    }

    fn eval_unary(&self, op: UnaryOp, operand: ExprRef<'_>, row: &Row) -> SieveResult<Value> {
        let value = self.evaluate(operand, row)?;
        match op {
            UnaryOp::Not => Ok(to_bool(&value)?.map_or(Value::Null, |b| Value::Bool(!b))),
            UnaryOp::IsNull => Ok(Value::Bool(value.is_null())),
            UnaryOp::IsNotNull => Ok(Value::Bool(!value.is_null())),
            UnaryOp::Neg => match value {
                Value::Null => Ok(Value::Null),
                Value::Int64(i) => Ok(i
                    .checked_neg()
                    .map_or(Value::Float64(-(i as f64)), Value::Int64)),
                Value::Float64(f) => Ok(Value::Float64(-f)),
                other => Err(SieveError::type_error(format!(
                    "Cannot negate {}",
                    other.type_name()
                ))),
            },
        }
    }
}

/// Interpret a value as a predicate outcome.
fn to_bool(value: &Value) -> SieveResult<Option<bool>> {
    match value {
        Value::Null => Ok(None),
        Value::Bool(b) => Ok(Some(*b)),
        Value::Int64(i) => Ok(Some(*i != 0)),
        Value::Float64(f) => Ok(Some(*f != 0.0)),
        other => Err(SieveError::type_error(format!(
            "Predicate must evaluate to boolean, got {}",
            other.type_name()
        ))),
    }
}

fn eval_comparison(left: &Value, op: BinaryOp, right: &Value) -> SieveResult<Value> {
    if left.is_null() || right.is_null() {
        return Ok(Value::Null);
    }
    let ordering = left.compare(right).ok_or_else(|| {
        SieveError::type_error(format!(
            "Cannot compare {} with {}",
            left.type_name(),
            right.type_name()
        ))
    })?;
    let result = match op {
        BinaryOp::Eq => ordering == Ordering::Equal,
        BinaryOp::NotEq => ordering != Ordering::Equal,
        BinaryOp::Lt => ordering == Ordering::Less,
        BinaryOp::LtEq => ordering != Ordering::Greater,
        BinaryOp::Gt => ordering == Ordering::Greater,
        BinaryOp::GtEq => ordering != Ordering::Less,
        _ => return Err(SieveError::internal(format!("{op} is not a comparison"))),
    };
    Ok(Value::Bool(result))
}

/// Integers beyond this magnitude are not exactly representable as `f64`.
const MAX_EXACT_INT: i64 = 1 << 53;

/// Numeric arithmetic whose result depends only on the operand values, not on
/// whether they arrived as `Int64` or `Float64`.
///
/// Division always yields `Float64`. Integer `+ - *` stay `Int64` while the
/// operands and the result are exactly representable as `f64`; otherwise the
/// operation is carried out in `f64`.
fn eval_arithmetic(left: &Value, op: BinaryOp, right: &Value) -> SieveResult<Value> {
    if left.is_null() || right.is_null() {
        return Ok(Value::Null);
    }
    if let (Value::Int64(l), Value::Int64(r)) = (left, right)
        && let Some(result) = exact_int_arithmetic(*l, op, *r)?
    {
        return Ok(result);
    }

    let (Some(l), Some(r)) = (left.as_float64(), right.as_float64()) else {
        return Err(SieveError::type_error(format!(
            "Cannot apply {op} to {} and {}",
            left.type_name(),
            right.type_name()
        )));
    };
    let result = match op {
        BinaryOp::Add => l + r,
        BinaryOp::Sub => l - r,
        BinaryOp::Mul => l * r,
        BinaryOp::Div | BinaryOp::Mod if r == 0.0 => return Ok(Value::Null),
        BinaryOp::Div => l / r,
        BinaryOp::Mod => l % r,
        _ => return Err(SieveError::internal(format!("{op} is not arithmetic"))),
    };
    Ok(Value::Float64(result))
}

/// `None` when the integer result would not match the `f64` one.
fn exact_int_arithmetic(l: i64, op: BinaryOp, r: i64) -> SieveResult<Option<Value>> {
    let exact = |v: i64| (-MAX_EXACT_INT..=MAX_EXACT_INT).contains(&v);
    if !exact(l) || !exact(r) {
        return Ok(None);
    }
    let result = match op {
        BinaryOp::Add => l.checked_add(r),
        BinaryOp::Sub => l.checked_sub(r),
        BinaryOp::Mul => l.checked_mul(r),
        BinaryOp::Mod if r == 0 => return Ok(Some(Value::Null)),
        BinaryOp::Mod => l.checked_rem(r),
        BinaryOp::Div => None,
        _ => return Err(SieveError::internal(format!("{op} is not arithmetic"))),
    };
    Ok(result.filter(|v| exact(*v)).map(Value::Int64))
}

fn eval_function(name: &str, args: &[Value]) -> SieveResult<Value> {
    match name {
        "like" | "notLike" => {
            let [value, pattern] = args else {
                return Err(SieveError::evaluation(format!("{name} expects two arguments")));
            };
            if value.is_null() || pattern.is_null() {
                return Ok(Value::Null);
            }
            let (Some(value), Some(pattern)) = (value.as_str(), pattern.as_str()) else {
                return Err(SieveError::type_error(format!("{name} expects strings")));
            };
            let matched = like_match(value, pattern);
            Ok(Value::Bool(matched == (name == "like")))
        }
        "in" | "notIn" => {
            let Some((needle, haystack)) = args.split_first() else {
                return Err(SieveError::evaluation(format!("{name} expects arguments")));
            };
            if needle.is_null() {
                return Ok(Value::Null);
            }
            let found = haystack
                .iter()
                .any(|item| needle.compare(item) == Some(Ordering::Equal));
            if !found && haystack.iter().any(Value::is_null) {
                return Ok(Value::Null);
            }
            Ok(Value::Bool(found == (name == "in")))
        }
        "empty" | "notEmpty" => {
            let [value] = args else {
                return Err(SieveError::evaluation(format!("{name} expects one argument")));
            };
            match value {
                Value::Null => Ok(Value::Null),
                Value::String(s) => Ok(Value::Bool(s.is_empty() == (name == "empty"))),
                other => Err(SieveError::type_error(format!(
                    "{name} expects a string, got {}",
                    other.type_name()
                ))),
            }
        }
        _ => Err(SieveError::not_implemented(format!(
            "Function '{name}' evaluation"
        ))),
    }
}

/// SQL `LIKE` with `%` and `_` wildcards.
fn like_match(value: &str, pattern: &str) -> bool {
    let value: Vec<char> = value.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();

    // matches[j]: pattern[..i] matches value[..j]
    let mut matches = vec![false; value.len() + 1];
    matches[0] = true;
    for p in &pattern {
        let mut next = vec![false; value.len() + 1];
        match p {
            '%' => {
                let mut any = false;
                for j in 0..=value.len() {
                    any |= matches[j];
                    next[j] = any;
                }
            }
            _ => {
                for j in 1..=value.len() {
                    next[j] = matches[j - 1] && (*p == '_' || *p == value[j - 1]);
                }
            }
        }
        matches = next;
    }
    matches[value.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Expr;

    fn eval(expr: &Expr, row: &Row) -> Value {
        ExprEvaluator::new().evaluate(expr.root(), row).unwrap()
    }

    #[test]
    fn test_comparison_and_arithmetic() {
        let expr = Expr::build(|a| {
            let x = a.column("x");
            let one = a.literal(1i64);
            let sum = a.add(x, one);
            let two = a.literal(2i64);
            a.gt(sum, two)
        });

        assert_eq!(eval(&expr, &Row::new().with("x", 2i64)), Value::Bool(true));
        assert_eq!(eval(&expr, &Row::new().with("x", 1i64)), Value::Bool(false));
        assert_eq!(eval(&expr, &Row::new().with("x", Value::Null)), Value::Null);
    }

    #[test]
    fn test_three_valued_logic() {
        let row = Row::new().with("t", true).with("f", false).with("n", Value::Null);
        let cases = [
            ("t", BinaryOp::And, "n", Value::Null),
            ("f", BinaryOp::And, "n", Value::Bool(false)),
            ("n", BinaryOp::And, "f", Value::Bool(false)),
            ("t", BinaryOp::Or, "n", Value::Bool(true)),
            ("n", BinaryOp::Or, "t", Value::Bool(true)),
            ("f", BinaryOp::Or, "n", Value::Null),
        ];
        for (l, op, r, expected) in cases {
            let expr = Expr::build(|a| {
                let l = a.column(l);
                let r = a.column(r);
                a.binary(l, op, r)
            });
            assert_eq!(eval(&expr, &row), expected, "{expr}");
        }

        let not_null = Expr::build(|a| {
            let n = a.column("n");
            a.not(n)
        });
        assert_eq!(eval(&not_null, &row), Value::Null);
    }

    #[test]
    fn test_null_checks() {
        let expr = Expr::build(|a| {
            let x = a.column("x");
            a.is_not_null(x)
        });
        assert_eq!(eval(&expr, &Row::new().with("x", Value::Null)), Value::Bool(false));
        assert_eq!(eval(&expr, &Row::new().with("x", 0i64)), Value::Bool(true));
    }

    #[test]
    fn test_functions() {
        let row = Row::new().with("s", "hello").with("x", 3i64);
        let like = Expr::build(|a| {
            let s = a.column("s");
            let p = a.literal("h%l_o");
            a.function("like", vec![s, p])
        });
        let not_in = Expr::build(|a| {
            let x = a.column("x");
            let one = a.literal(1i64);
            let two = a.literal(2i64);
            a.function("notIn", vec![x, one, two])
        });
        let empty = Expr::build(|a| {
            let s = a.column("s");
            a.function("empty", vec![s])
        });

        assert_eq!(eval(&like, &row), Value::Bool(true));
        assert_eq!(eval(&not_in, &row), Value::Bool(true));
        assert_eq!(eval(&empty, &row), Value::Bool(false));
    }

    #[test]
    fn test_like_match() {
        assert!(like_match("abc", "abc"));
        assert!(like_match("abc", "%"));
        assert!(like_match("", "%"));
        assert!(like_match("abc", "a%c"));
        assert!(like_match("abc", "_b_"));
        assert!(!like_match("abc", "a_"));
        assert!(!like_match("abc", "%d"));
    }

    #[test]
    fn test_errors() {
        let evaluator = ExprEvaluator::new();
        let missing = Expr::build(|a| a.column("nope"));
        let unknown = Expr::build(|a| a.function("lower", vec![]));
        let mixed = Expr::build(|a| {
            let s = a.literal("a");
            let one = a.literal(1i64);
            a.lt(s, one)
        });

        assert!(matches!(
            evaluator.evaluate(missing.root(), &Row::new()),
            Err(SieveError::EvaluationError(_))
        ));
        assert!(matches!(
            evaluator.evaluate(unknown.root(), &Row::new()),
            Err(SieveError::NotImplemented(_))
        ));
        assert!(matches!(
            evaluator.evaluate(mixed.root(), &Row::new()),
            Err(SieveError::TypeError(_))
        ));
    }

    #[test]
    fn test_division_by_zero_is_null() {
        let expr = Expr::build(|a| {
            let x = a.column("x");
            let zero = a.literal(0i64);
            a.div(x, zero)
        });
        assert_eq!(eval(&expr, &Row::new().with("x", 4i64)), Value::Null);
    }

    #[test]
    fn test_arithmetic_ignores_numeric_type() {
        let half = Expr::build(|a| {
            let x = a.column("x");
            let two = a.literal(2i64);
            a.div(x, two)
        });
        assert_eq!(eval(&half, &Row::new().with("x", 3i64)), Value::Float64(1.5));
        assert_eq!(eval(&half, &Row::new().with("x", 3.0)), Value::Float64(1.5));

        let sum = Expr::build(|a| {
            let x = a.column("x");
            let one = a.literal(1i64);
            a.add(x, one)
        });
        let from_int = eval(&sum, &Row::new().with("x", 3i64));
        let from_float = eval(&sum, &Row::new().with("x", 3.0));
        assert_eq!(from_int, Value::Int64(4));
        assert_eq!(from_int.compare(&from_float), Some(Ordering::Equal));
    }

    #[test]
    fn test_large_integers_fall_back_to_float() {
        let expr = Expr::build(|a| {
            let x = a.column("x");
            let y = a.column("y");
            a.mul(x, y)
        });
        let row = Row::new().with("x", i64::MAX).with("y", 2i64);
        assert!(matches!(eval(&expr, &row), Value::Float64(_)));

        let row = Row::new().with("x", 1i64 << 40).with("y", 1i64 << 20);
        assert!(matches!(eval(&expr, &row), Value::Float64(_)));
    }
}
