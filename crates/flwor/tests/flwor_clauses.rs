//! FLWOR clause semantics: for/let/where/count, positional variables,
//! outer iteration, grouping and ordering.

use rstest::rstest;
use xquery_flwor::builder::*;
use xquery_flwor::engine::collation::SIMPLE_CASE_URI;
use xquery_flwor::{DynamicContext, ErrorCode, XdmAtomicValue, XdmItem, evaluate_expr};

type N = xquery_flwor::SimpleNode;

fn eval(e: Expr) -> Vec<XdmItem<N>> {
    evaluate_expr(&e, &DynamicContext::<N>::default()).unwrap()
}

fn ints(e: Expr) -> Vec<i64> {
    eval(e)
        .into_iter()
        .map(|i| match i {
            XdmItem::Atomic(XdmAtomicValue::Integer(v)) => v,
            other => panic!("expected integer, got {other:?}"),
        })
        .collect()
}

fn strings(e: Expr) -> Vec<String> {
    eval(e)
        .into_iter()
        .map(|i| match i {
            XdmItem::Atomic(a) => a.canonical_string(),
            other => panic!("expected atomic, got {other:?}"),
        })
        .collect()
}

fn count(e: Expr) -> Expr {
    call("count", vec![e])
}

#[rstest]
fn nested_for_iterates_in_order() {
    let q = flwor()
        .for_("x", range(int(1), int(2)))
        .for_("y", seq(vec![int(10), int(20)]))
        .return_(var("x").times(int(100)).plus(var("y")));
    assert_eq!(ints(q), vec![110, 120, 210, 220]);
}

#[rstest]
fn positional_variable_survives_where() {
    let q = flwor()
        .for_binding(ForBinding::new("x", seq(vec![int(10), int(20), int(30)])).at("p"))
        .where_(var("x").val_gt(int(10)))
        .return_(var("p"));
    assert_eq!(ints(q), vec![2, 3]);
}

#[rstest]
fn positional_variable_visible_to_let() {
    let q = flwor()
        .for_binding(ForBinding::new("x", seq(vec![string("a"), string("b")])).at("p"))
        .let_("y", var("p").times(int(10)))
        .return_(var("y"));
    assert_eq!(ints(q), vec![10, 20]);
}

#[rstest]
fn outer_for_binds_empty_and_position_zero() {
    let q = flwor()
        .for_binding(ForBinding::new("x", empty()).allowing_empty().at("p"))
        .return_(seq(vec![var("p"), count(var("x"))]));
    assert_eq!(ints(q), vec![0, 0]);
}

#[rstest]
fn plain_for_over_empty_yields_nothing() {
    let q = flwor().for_("x", empty()).return_(int(1));
    assert!(eval(q).is_empty());
}

#[rstest]
fn outer_for_with_items_behaves_like_for() {
    let q = flwor()
        .for_binding(ForBinding::new("x", seq(vec![int(4), int(5)])).allowing_empty().at("p"))
        .return_(var("p"));
    assert_eq!(ints(q), vec![1, 2]);
}

#[rstest]
fn let_binds_whole_sequence() {
    let q = flwor()
        .let_("s", range(int(1), int(4)))
        .return_(count(var("s")));
    assert_eq!(ints(q), vec![4]);
}

#[rstest]
fn count_clause_numbers_surviving_tuples() {
    let q = flwor()
        .for_("x", seq(vec![int(5), int(6), int(7), int(8)]))
        .where_(var("x").modulo(int(2)).val_eq(int(0)))
        .count("c")
        .return_(var("c"));
    assert_eq!(ints(q), vec![1, 2]);
}

#[rstest]
fn group_by_partitions_one_to_hundred() {
    let q = flwor()
        .for_("x", range(int(1), int(100)))
        .group_by(vec![GroupingSpec::var("k").value(var("x").modulo(int(10)))])
        .return_(count(var("x")));
    assert_eq!(ints(q), vec![10; 10]);
}

#[rstest]
fn group_by_emits_groups_in_first_key_order() {
    let q = flwor()
        .for_("x", seq(vec![int(3), int(1), int(3), int(2), int(1)]))
        .group_by(vec![GroupingSpec::var("k").value(var("x"))])
        .return_(var("k"));
    assert_eq!(ints(q), vec![3, 1, 2]);
}

#[rstest]
fn group_by_covers_every_tuple_once() {
    let q = flwor()
        .for_("x", range(int(1), int(37)))
        .group_by(vec![GroupingSpec::var("k").value(var("x").modulo(int(4)))])
        .return_(var("x"));
    let mut all = ints(q);
    all.sort_unstable();
    assert_eq!(all, (1..=37).collect::<Vec<_>>());
}

#[rstest]
fn group_by_puts_nans_together() {
    let q = flwor()
        .for_("x", seq(vec![dbl(f64::NAN), dbl(1.0), dbl(f64::NAN)]))
        .group_by(vec![GroupingSpec::var("k").value(var("x"))])
        .return_(count(var("x")));
    assert_eq!(ints(q), vec![2, 1]);
}

#[rstest]
fn group_by_empty_key_forms_its_own_group() {
    let q = flwor()
        .for_("x", seq(vec![int(1), int(2), int(3)]))
        .group_by(vec![GroupingSpec::var("k").value(if_then_else(
            var("x").val_eq(int(2)),
            empty(),
            int(0),
        ))])
        .return_(count(var("x")));
    assert_eq!(ints(q), vec![2, 1]);
}

#[rstest]
fn group_by_existing_variable() {
    let q = flwor()
        .for_("x", seq(vec![string("a"), string("b"), string("a")]))
        .let_("k", var("x"))
        .group_by(vec![GroupingSpec::var("k")])
        .return_(call("string-join", vec![var("x"), string(",")]));
    assert_eq!(strings(q), vec!["a,a", "b"]);
}

#[rstest]
fn group_by_name_rebound_in_same_clause_groups_once() {
    let q = flwor()
        .for_("x", range(int(1), int(10)))
        .for_("y", range(int(1), int(4)))
        .group_by(vec![
            GroupingSpec::var("y"),
            GroupingSpec::var("y").value(var("x").modulo(int(2))),
        ])
        .return_(count(var("x")));
    assert_eq!(ints(q), vec![20, 20]);
}

#[rstest]
fn group_by_chained_rebinding_uses_last_value() {
    let inner = flwor()
        .for_("y", range(int(1), int(10)))
        .group_by(vec![
            GroupingSpec::var("y").value(var("y")),
            GroupingSpec::var("y").value(var("y").modulo(int(2))),
        ])
        .return_(var("y"));
    assert_eq!(ints(count(inner)), vec![2]);
}

#[rstest]
#[case(None, 3)]
#[case(Some(SIMPLE_CASE_URI), 2)]
fn group_by_honours_collation(#[case] collation: Option<&str>, #[case] groups: usize) {
    let mut spec = GroupingSpec::var("k").value(var("x"));
    if let Some(uri) = collation {
        spec = spec.collation(uri);
    }
    let q = flwor()
        .for_("x", seq(vec![string("a"), string("A"), string("b")]))
        .group_by(vec![spec])
        .return_(var("k"));
    assert_eq!(eval(q).len(), groups);
}

#[rstest]
fn grouping_key_roundtrips_under_codepoint_collation() {
    let input = ["b", "a", "b", "c", "a"];
    let q = flwor()
        .for_("x", seq(input.iter().map(|s| string(s)).collect()))
        .group_by(vec![GroupingSpec::var("k").value(var("x"))])
        .return_(var("k"));
    assert_eq!(strings(q), vec!["b", "a", "c"]);
}

#[rstest]
fn group_by_multi_item_key_is_type_error() {
    let q = flwor()
        .for_("x", int(1))
        .group_by(vec![GroupingSpec::var("k").value(seq(vec![int(1), int(2)]))])
        .return_(var("k"));
    let err = evaluate_expr(&q, &DynamicContext::<N>::default()).unwrap_err();
    assert_eq!(err.code_enum(), ErrorCode::XPTY0004);
}

#[rstest]
fn order_by_sorts_ascending_and_descending() {
    let data = || seq(vec![int(3), int(1), int(2)]);
    let asc = flwor()
        .for_("x", data())
        .order_by(vec![OrderSpec::new(var("x"))])
        .return_(var("x"));
    let desc = flwor()
        .for_("x", data())
        .order_by(vec![OrderSpec::new(var("x")).descending()])
        .return_(var("x"));
    assert_eq!(ints(asc), vec![1, 2, 3]);
    assert_eq!(ints(desc), vec![3, 2, 1]);
}

#[rstest]
fn order_by_after_group_by_is_stable() {
    let q = flwor()
        .for_("x", seq(vec![int(3), int(1), int(2), int(1), int(3)]))
        .group_by(vec![GroupingSpec::var("k").value(var("x"))])
        .order_by(vec![OrderSpec::new(count(var("x")))])
        .return_(var("k"));
    assert_eq!(ints(q), vec![2, 3, 1]);
}

#[rstest]
fn order_by_secondary_key_breaks_ties() {
    let q = flwor()
        .for_("x", seq(vec![int(21), int(12), int(11), int(22)]))
        .order_by(vec![
            OrderSpec::new(var("x").modulo(int(10))),
            OrderSpec::new(var("x")).descending(),
        ])
        .return_(var("x"));
    assert_eq!(ints(q), vec![21, 11, 22, 12]);
}

#[rstest]
#[case(false, vec!["", "1", "2"])]
#[case(true, vec!["1", "2", ""])]
fn order_by_places_empty_keys(#[case] greatest: bool, #[case] expected: Vec<&str>) {
    let mut spec = OrderSpec::new(if_then_else(var("x").val_eq(int(0)), empty(), var("x")));
    if greatest {
        spec = spec.empty_greatest();
    }
    let q = flwor()
        .for_("x", seq(vec![int(2), int(0), int(1)]))
        .order_by(vec![spec])
        .return_(if_then_else(
            var("x").val_eq(int(0)),
            string(""),
            call("string", vec![var("x")]),
        ));
    assert_eq!(strings(q), expected);
}

#[rstest]
fn order_by_mixed_types_is_type_error() {
    let q = flwor()
        .for_("x", seq(vec![int(1), string("a")]))
        .order_by(vec![OrderSpec::new(var("x"))])
        .return_(var("x"));
    let err = evaluate_expr(&q, &DynamicContext::<N>::default()).unwrap_err();
    assert_eq!(err.code_enum(), ErrorCode::XPTY0004);
}

#[rstest]
fn typed_for_binding_checks_each_item() {
    let q = flwor()
        .for_binding(ForBinding::new("x", seq(vec![int(1), string("a")])).typed(atomic_type("xs:integer")))
        .return_(var("x"));
    let err = evaluate_expr(&q, &DynamicContext::<N>::default()).unwrap_err();
    assert_eq!(err.code_enum(), ErrorCode::XPTY0004);
}

#[rstest]
fn nested_flwor_sees_outer_variables() {
    let inner = flwor()
        .for_("y", range(int(1), var("x")))
        .return_(var("y"));
    let q = flwor()
        .for_("x", range(int(1), int(3)))
        .return_(call("sum", vec![inner]));
    assert_eq!(ints(q), vec![1, 3, 6]);
}

#[rstest]
fn stable_keyword_does_not_change_order() {
    let keys = || vec![OrderSpec::new(var("x").idiv(int(10)))];
    let data = || seq(vec![int(21), int(12), int(25), int(11), int(20)]);
    let plain = flwor().for_("x", data()).order_by(keys()).return_(var("x"));
    let stable = flwor().for_("x", data()).stable_order_by(keys()).return_(var("x"));
    assert_eq!(ints(plain), vec![12, 11, 21, 25, 20]);
    assert_eq!(ints(stable), vec![12, 11, 21, 25, 20]);
}

#[rstest]
fn group_keys_of_different_families_form_separate_groups() {
    let q = flwor()
        .for_("x", seq(vec![int(1), string("1"), int(1), boolean(true)]))
        .group_by(vec![GroupingSpec::var("k").value(var("x"))])
        .return_(count(var("x")));
    assert_eq!(ints(q), vec![2, 1, 1]);
}
