//! `switch` and `typeswitch` selection.

use rstest::rstest;
use xquery_flwor::builder::*;
use xquery_flwor::{DynamicContext, ErrorCode, XdmAtomicValue, XdmItem, elem, evaluate_expr};

type N = xquery_flwor::SimpleNode;

fn one(e: Expr) -> XdmAtomicValue {
    let out = evaluate_expr(&e, &DynamicContext::<N>::default()).unwrap();
    match out.as_slice() {
        [XdmItem::Atomic(v)] => v.clone(),
        other => panic!("expected one atomic value, got {other:?}"),
    }
}

fn text(e: Expr) -> String {
    one(e).canonical_string()
}

#[rstest]
fn switch_skips_unselected_returns() {
    let q = switch(int(25))
        .case(vec![int(42)], int(1).divide(int(0)))
        .case(vec![int(25)], string("Baa"))
        .default(string("x"));
    assert_eq!(text(q), "Baa");
}

#[rstest]
fn switch_stops_evaluating_case_values_after_match() {
    let q = switch(int(1))
        .case(vec![int(1)], string("a"))
        .case(vec![int(1).divide(int(0))], string("b"))
        .default(string("c"));
    assert_eq!(text(q), "a");
}

#[rstest]
fn switch_matches_any_value_of_a_case() {
    let q = switch(string("b"))
        .case(vec![string("a"), string("b")], string("ab"))
        .default(string("other"));
    assert_eq!(text(q), "ab");
}

#[rstest]
fn switch_falls_back_to_default() {
    let q = switch(int(3))
        .case(vec![int(1)], string("one"))
        .default(string("none"));
    assert_eq!(text(q), "none");
}

#[rstest]
fn switch_empty_operand_matches_empty_case() {
    let q = switch(empty())
        .case(vec![int(0)], string("zero"))
        .case(vec![empty()], string("empty"))
        .default(string("none"));
    assert_eq!(text(q), "empty");
}

#[rstest]
fn switch_compares_across_types_without_error() {
    let q = switch(string("1"))
        .case(vec![int(1)], string("int"))
        .case(vec![untyped("1")], string("untyped"))
        .default(string("none"));
    assert_eq!(text(q), "untyped");
}

#[rstest]
fn switch_nan_matches_nan() {
    let q = switch(dbl(f64::NAN))
        .case(vec![dbl(f64::NAN)], string("nan"))
        .default(string("none"));
    assert_eq!(text(q), "nan");
}

#[rstest]
fn switch_operand_with_two_items_is_type_error() {
    let q = switch(seq(vec![int(1), int(2)]))
        .case(vec![int(1)], string("one"))
        .default(string("none"));
    let err = evaluate_expr(&q, &DynamicContext::<N>::default()).unwrap_err();
    assert_eq!(err.code_enum(), ErrorCode::XPTY0004);
}

#[rstest]
#[case(int(5), "integer")]
#[case(dec("2.5".parse().unwrap()), "decimal")]
#[case(string("s"), "string")]
#[case(seq(vec![int(1), int(2)]), "many")]
#[case(empty(), "empty")]
fn typeswitch_selects_first_matching_case(#[case] operand: Expr, #[case] expected: &str) {
    let q = typeswitch(operand)
        .case(None, vec![atomic_type("xs:integer")], string("integer"))
        .case(None, vec![atomic_type("xs:decimal")], string("decimal"))
        .case(None, vec![atomic_type("xs:string")], string("string"))
        .case(None, vec![empty_type()], string("empty"))
        .default(None, string("many"));
    assert_eq!(text(q), expected);
}

#[rstest]
fn typeswitch_union_case() {
    let q = typeswitch(boolean(true))
        .case(
            None,
            vec![atomic_type("xs:string"), atomic_type("xs:boolean")],
            string("string-or-boolean"),
        )
        .default(None, string("other"));
    assert_eq!(text(q), "string-or-boolean");
}

#[rstest]
fn typeswitch_binds_case_variable() {
    let q = typeswitch(int(20))
        .case(Some("i"), vec![atomic_type("xs:integer")], var("i").plus(int(1)))
        .default(Some("d"), var("d"));
    assert_eq!(one(q), XdmAtomicValue::Integer(21));
}

#[rstest]
fn typeswitch_binds_default_variable() {
    let q = typeswitch(string("x"))
        .case(Some("i"), vec![atomic_type("xs:integer")], var("i"))
        .default(Some("d"), call("concat", vec![var("d"), string("!")]));
    assert_eq!(text(q), "x!");
}

#[rstest]
fn typeswitch_on_element_kind() {
    let node = elem("item").build();
    let dyn_ctx = xquery_flwor::DynamicContextBuilder::<N>::new()
        .with_context_item(XdmItem::Node(node))
        .build();
    let q = typeswitch(dot())
        .case(None, vec![kind_type(KindTest::Attribute(None))], string("attribute"))
        .case(None, vec![kind_type(KindTest::Element(Some("item".into())))], string("item"))
        .default(None, string("other"));
    let out = evaluate_expr(&q, &dyn_ctx).unwrap();
    assert_eq!(out, vec![XdmItem::Atomic(XdmAtomicValue::String("item".into()))]);
}

#[rstest]
fn typeswitch_case_variable_is_not_visible_in_other_branches() {
    let q = typeswitch(int(1))
        .case(Some("i"), vec![atomic_type("xs:string")], var("i"))
        .default(None, var("i"));
    let err = evaluate_expr(&q, &DynamicContext::<N>::default()).unwrap_err();
    assert_eq!(err.code_enum(), ErrorCode::XPST0008);
}

#[rstest]
fn switch_inside_flwor_is_evaluated_per_tuple() {
    let q = flwor()
        .for_("x", range(int(1), int(3)))
        .return_(
            switch(var("x"))
                .case(vec![int(1)], string("one"))
                .case(vec![int(2)], string("two"))
                .default(string("many")),
        );
    let out: Vec<String> = evaluate_expr(&q, &DynamicContext::<N>::default())
        .unwrap()
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(out, vec!["one", "two", "many"]);
}
