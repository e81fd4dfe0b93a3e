// Integration tests for expression parsing and constant folding

use zsedit::parser::ast::{Expression, Leaf, Operator};
use zsedit::parser::evaluate::Value;
use zsedit::parser::parse_expression;
use zsedit::parser::system_types::SystemTypes;

fn eval(source: &str) -> Option<Value> {
    let system = SystemTypes::new();
    parse_expression(source, &system)
        .expect("Parsing failed")
        .evaluate(&system)
}

fn right(expr: &Expression) -> &Expression {
    match &expr.leaves[1] {
        Leaf::Expression(inner) => inner,
        other => panic!("expected a nested expression, got {:?}", other),
    }
}

fn left(expr: &Expression) -> &Expression {
    match &expr.leaves[0] {
        Leaf::Expression(inner) => inner,
        other => panic!("expected a nested expression, got {:?}", other),
    }
}

#[test]
fn test_precedence() {
    let system = SystemTypes::new();
    let expr = parse_expression("1 + 2 * 3", &system).expect("Parsing failed");
    assert_eq!(expr.op, Operator::Add);
    assert_eq!(right(&expr).op, Operator::Mul);

    assert_eq!(eval("1 + 2 * 3"), Some(Value::Integer(7)));
    assert_eq!(eval("(1 + 2) * 3"), Some(Value::Integer(9)));
    assert_eq!(eval("true && false || true"), Some(Value::Boolean(true)));
}

#[test]
fn test_comparison_family_reduces_left_to_right() {
    let system = SystemTypes::new();

    let expr = parse_expression("0 == 1 < 2", &system).expect("Parsing failed");
    assert_eq!(expr.op, Operator::CmpLT);
    assert_eq!(left(&expr).op, Operator::CmpEq);
    assert_eq!(eval("0 == 1 < 2"), Some(Value::Boolean(true)));

    let expr = parse_expression("3 & 1 == 1", &system).expect("Parsing failed");
    assert_eq!(expr.op, Operator::CmpEq);
    assert_eq!(left(&expr).op, Operator::BitAnd);
    assert_eq!(eval("3 & 1 == 1"), Some(Value::Boolean(true)));

    let expr = parse_expression("1 < 2 == true", &system).expect("Parsing failed");
    assert_eq!(expr.op, Operator::CmpEq);
    assert_eq!(left(&expr).op, Operator::CmpLT);
    assert_eq!(eval("1 < 2 == true"), Some(Value::Boolean(true)));
}

#[test]
fn test_integer_and_float_division() {
    assert_eq!(eval("5 / 2"), Some(Value::Integer(2)));
    assert_eq!(eval("5.0 / 2"), Some(Value::Float(2.5)));
}

#[test]
fn test_folding_is_idempotent() {
    let system = SystemTypes::new();
    let expr = parse_expression("(7 - 2) * 3 % 4 == 3 ? \"yes\" .. \"!\" : \"no\"", &system)
        .expect("Parsing failed");
    let before = expr.clone();
    let first = expr.evaluate(&system);
    assert_eq!(first, Some(Value::String("yes!".into())));
    assert_eq!(expr.evaluate(&system), first);
    assert_eq!(expr, before);
}

#[test]
fn test_non_constant_is_not_an_error() {
    assert_eq!(eval("a + 1"), None);
    assert_eq!(eval("Random(1, 2)"), None);
}
