//! Equivalence tests for CNF conversion and its rewrites.

use proptest::prelude::*;
use sieve_core::{Row, Value};
use sieve_logical::{BinaryOp, CnfConverter, Expr, ExprArena, ExprEvaluator, ExprId};

const FLAGS: [&str; 3] = ["p", "q", "r"];
const NUMBERS: [&str; 2] = ["x", "y"];
const COMPARISONS: [BinaryOp; 6] = [
    BinaryOp::Eq,
    BinaryOp::NotEq,
    BinaryOp::Lt,
    BinaryOp::LtEq,
    BinaryOp::Gt,
    BinaryOp::GtEq,
];

#[derive(Debug, Clone)]
enum Pred {
    Flag(usize),
    FlagIsNull(usize),
    Compare(usize, usize, i64),
    Literal(bool),
    Not(Box<Pred>),
    And(Box<Pred>, Box<Pred>),
    Or(Box<Pred>, Box<Pred>),
}

impl Pred {
    fn build(&self, arena: &mut ExprArena) -> ExprId {
        match self {
            Self::Flag(i) => arena.column(FLAGS[*i]),
            Self::FlagIsNull(i) => {
                let flag = arena.column(FLAGS[*i]);
                arena.is_not_null(flag)
            }
            Self::Compare(col, op, value) => {
                let col = arena.column(NUMBERS[*col]);
                let lit = arena.literal(*value);
                arena.binary(col, COMPARISONS[*op], lit)
            }
            Self::Literal(b) => arena.literal(*b),
            Self::Not(inner) => {
                let inner = inner.build(arena);
                arena.not(inner)
            }
            Self::And(l, r) => {
                let l = l.build(arena);
                let r = r.build(arena);
                arena.and(l, r)
            }
            Self::Or(l, r) => {
                let l = l.build(arena);
                let r = r.build(arena);
                arena.or(l, r)
            }
        }
    }

    fn to_expr(&self) -> Expr {
        Expr::build(|arena| self.build(arena))
    }
}

fn pred_strategy() -> impl Strategy<Value = Pred> {
    let leaf = prop_oneof![
        4 => (0..FLAGS.len()).prop_map(Pred::Flag),
        1 => (0..FLAGS.len()).prop_map(Pred::FlagIsNull),
        4 => (0..NUMBERS.len(), 0..COMPARISONS.len(), -2i64..=2)
            .prop_map(|(c, op, v)| Pred::Compare(c, op, v)),
        1 => any::<bool>().prop_map(Pred::Literal),
    ];
    leaf.prop_recursive(4, 24, 2, |inner| {
        prop_oneof![
            inner.clone().prop_map(|p| Pred::Not(Box::new(p))),
            (inner.clone(), inner.clone()).prop_map(|(l, r)| Pred::And(Box::new(l), Box::new(r))),
            (inner.clone(), inner).prop_map(|(l, r)| Pred::Or(Box::new(l), Box::new(r))),
        ]
    })
}

fn nullable_bool() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
    ]
}

fn nullable_int() -> impl Strategy<Value = Value> {
    prop_oneof![
        1 => Just(Value::Null),
        4 => (-3i64..=3).prop_map(Value::Int64),
    ]
}

fn row_strategy(nullable: bool) -> impl Strategy<Value = Row> {
    let flags = if nullable {
        nullable_bool().boxed()
    } else {
        any::<bool>().prop_map(Value::Bool).boxed()
    };
    let ints = if nullable {
        nullable_int().boxed()
    } else {
        (-3i64..=3).prop_map(Value::Int64).boxed()
    };
    (
        prop::collection::vec(flags, FLAGS.len()),
        prop::collection::vec(ints, NUMBERS.len()),
    )
        .prop_map(|(flags, ints)| {
            FLAGS
                .iter()
                .zip(flags)
                .chain(NUMBERS.iter().zip(ints))
                .map(|(name, value)| (*name, value))
                .collect()
        })
}

fn eval(expr: &Expr, row: &Row) -> Option<bool> {
    ExprEvaluator::new()
        .evaluate_predicate(expr.root(), row)
        .unwrap()
}

proptest! {
    #[test]
    fn prop_cnf_preserves_three_valued_result(
        pred in pred_strategy(),
        rows in prop::collection::vec(row_strategy(true), 8),
    ) {
        let expr = pred.to_expr();
        let cnf = CnfConverter::new(64).to_cnf(expr.root());
        let back = CnfConverter::from_cnf(&cnf);

        for row in &rows {
            let expected = eval(&expr, row);
            prop_assert_eq!(cnf.evaluate(row).unwrap(), expected);
            prop_assert_eq!(eval(&back, row), expected);
        }
    }

    #[test]
    fn prop_negation_round_trip(
        pred in pred_strategy(),
        rows in prop::collection::vec(row_strategy(true), 8),
    ) {
        let expr = pred.to_expr();
        let cnf = CnfConverter::default().to_cnf(expr.root());
        let pulled = cnf.pull_not_out_functions();
        let pushed = pulled.clone().push_not_in_functions();
        let back = CnfConverter::from_cnf(&pushed);

        for row in &rows {
            let expected = eval(&expr, row);
            prop_assert_eq!(pulled.evaluate(row).unwrap(), expected);
            prop_assert_eq!(pushed.evaluate(row).unwrap(), expected);
            prop_assert_eq!(eval(&back, row), expected);
        }
    }

    #[test]
    fn prop_reduce_preserves_result_without_nulls(
        pred in pred_strategy(),
        rows in prop::collection::vec(row_strategy(false), 8),
    ) {
        let expr = pred.to_expr();
        let cnf = CnfConverter::default().to_cnf(expr.root()).pull_not_out_functions();
        let reduced = cnf.clone().reduce();

        prop_assert!(reduced.atom_count() <= cnf.atom_count());
        for row in &rows {
            prop_assert_eq!(reduced.evaluate(row).unwrap(), eval(&expr, row));
        }
    }

    #[test]
    fn prop_reduce_keeps_true_rows_with_nulls(
        pred in pred_strategy(),
        rows in prop::collection::vec(row_strategy(true), 8),
    ) {
        let expr = pred.to_expr();
        let reduced = CnfConverter::default()
            .to_cnf(expr.root())
            .pull_not_out_functions()
            .reduce();

        for row in &rows {
            prop_assert_eq!(
                reduced.evaluate(row).unwrap() == Some(true),
                eval(&expr, row) == Some(true)
            );
        }
    }
}

#[test]
fn test_excluded_middle_is_not_true_for_null() {
    // p OR NOT p
    let expr = Expr::build(|e| {
        let p = e.column("p");
        let not_p = e.not(p);
        e.or(p, not_p)
    });
    let reduced = CnfConverter::default().to_cnf(expr.root()).reduce();
    let row = Row::new().with("p", Value::Null);

    assert!(!reduced.is_always_true());
    assert_eq!(reduced.evaluate(&row).unwrap(), None);
    assert_eq!(eval(&CnfConverter::from_cnf(&reduced), &row), None);
}

#[test]
fn test_pulled_atoms_are_positive_forms() {
    let expr = Expr::build(|a| {
        let x = a.column("x");
        let y = a.column("y");
        let ne = a.not_eq(x, y);
        let gt = a.gt(x, y);
        let s = a.column("s");
        let pattern = a.literal("a%");
        let not_like = a.function("notLike", vec![s, pattern]);
        let or = a.or(ne, gt);
        a.and(or, not_like)
    });
    let cnf = CnfConverter::default()
        .to_cnf(expr.root())
        .pull_not_out_functions();

    assert_eq!(
        cnf.to_string(),
        "(NOT (x = y) OR NOT (x <= y)) AND (NOT like(s, 'a%'))"
    );

    let pushed = cnf.push_not_in_functions();
    assert_eq!(
        pushed.to_string(),
        "((x <> y) OR (x > y)) AND (notLike(s, 'a%'))"
    );
}

#[test]
fn test_reduce_is_idempotent() {
    let expr = Expr::build(|e| {
        let a = e.column("a");
        let b = e.column("b");
        let c = e.column("c");
        let not_a = e.not(a);
        let left = e.or(a, b);
        let right = e.or(not_a, b);
        let both = e.and(left, right);
        let extra = e.or(b, c);
        e.and(both, extra)
    });
    let once = CnfConverter::default().to_cnf(expr.root()).reduce();
    let twice = once.clone().reduce();

    assert_eq!(once.to_string(), "(b)");
    assert_eq!(once.to_string(), twice.to_string());
}
