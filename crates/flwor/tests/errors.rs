//! Error codes surfaced through the public API.

use rstest::rstest;
use std::error::Error as _;
use std::sync::Arc;
use xquery_flwor::builder::*;
use xquery_flwor::{DynamicContext, Error, ErrorCode, evaluate_expr};

type N = xquery_flwor::SimpleNode;

fn err_of(e: Expr) -> Error {
    evaluate_expr(&e, &DynamicContext::<N>::default()).unwrap_err()
}

#[rstest]
#[case::integer_division_by_zero(int(1).idiv(int(0)), ErrorCode::FOAR0001)]
#[case::overflow(int(i64::MAX).times(int(2)), ErrorCode::FOAR0002)]
#[case::bad_cast(cast_as(string("abc"), "xs:integer", false), ErrorCode::FORG0001)]
#[case::ebv_of_two_atomics(if_then_else(seq(vec![int(1), int(2)]), int(1), int(0)), ErrorCode::FORG0006)]
#[case::atomize_function(call("data", vec![inline_fn(&[], int(1))]), ErrorCode::FOTY0013)]
#[case::zero_or_one(call("zero-or-one", vec![seq(vec![int(1), int(2)])]), ErrorCode::FORG0004)]
#[case::exactly_one(call("exactly-one", vec![empty()]), ErrorCode::FORG0005)]
#[case::mixed_arithmetic(int(1).plus(string("a")), ErrorCode::XPTY0004)]
#[case::wrong_arity(call("count", vec![]), ErrorCode::XPST0017)]
#[case::default_error(call("error", vec![]), ErrorCode::FOER0000)]
#[case::multibyte_date_cast(cast_as(string("a€€x"), "xs:date", false), ErrorCode::FORG0001)]
#[case::multibyte_untyped_vs_date(
    cast_as(string("2004-03-05"), "xs:date", false).general_cmp(ComparisonOp::Eq, untyped("a€€x")),
    ErrorCode::FORG0001
)]
#[case::insert_before_nan(
    call("insert-before", vec![seq(vec![int(1), int(2)]), dbl(f64::NAN), int(9)]),
    ErrorCode::XPTY0004
)]
fn dynamic_errors_carry_their_code(#[case] expr: Expr, #[case] code: ErrorCode) {
    assert_eq!(err_of(expr).code_enum(), code);
}

#[rstest]
#[case::unbound_variable(var("nope"), ErrorCode::XPST0008)]
#[case::unknown_type(cast_as(int(1), "xs:nope", false), ErrorCode::XPST0051)]
#[case::unknown_prefix(var("p:x"), ErrorCode::XPST0081)]
#[case::positional_clash(
    flwor().for_binding(ForBinding::new("x", int(1)).at("x")).return_(var("x")),
    ErrorCode::XQST0089
)]
#[case::empty_order_by(flwor().for_("x", int(1)).order_by(vec![]).return_(int(1)), ErrorCode::XPST0003)]
fn static_errors_are_reported_before_evaluation(#[case] expr: Expr, #[case] code: ErrorCode) {
    let err = err_of(expr);
    assert_eq!(err.code_enum(), code);
    assert!(err.is_static());
}

#[rstest]
fn unknown_order_collation_is_foch0002() {
    let q = flwor()
        .for_("x", seq(vec![string("b"), string("a")]))
        .order_by(vec![OrderSpec::new(var("x")).collation("urn:no-such-collation")])
        .return_(var("x"));
    assert_eq!(err_of(q).code_enum(), ErrorCode::FOCH0002);
}

#[rstest]
fn unknown_group_collation_is_foch0002() {
    let q = flwor()
        .for_("x", string("a"))
        .group_by(vec![GroupingSpec::var("k").value(var("x")).collation("urn:no-such-collation")])
        .return_(var("k"));
    assert_eq!(err_of(q).code_enum(), ErrorCode::FOCH0002);
}

#[rstest]
fn user_error_code_keeps_its_namespace() {
    let code = call("QName", vec![string("urn:app"), string("app:broken")]);
    let err = err_of(call("error", vec![code, string("it broke")]));
    assert_eq!(err.code_enum(), ErrorCode::Unknown);
    assert_eq!(err.code.ns_uri.as_deref(), Some("urn:app"));
    assert_eq!(err.code.local, "broken");
    assert_eq!(err.message, "it broke");
    assert_eq!(err.format_code(), "Q{urn:app}broken");
}

#[rstest]
fn display_includes_message_and_code() {
    let err = err_of(int(1).idiv(int(0)));
    let shown = err.to_string();
    assert!(shown.contains("division by zero"), "{shown}");
    assert!(shown.ends_with("(err:FOAR0001)"), "{shown}");
}

#[rstest]
fn error_code_parses_prefixed_names() {
    assert_eq!(ErrorCode::from_code("err:XPTY0004"), ErrorCode::XPTY0004);
    assert_eq!(ErrorCode::from_code("XPTY0004"), ErrorCode::Unknown);
    assert_eq!(ErrorCode::from_code("err:NOPE0000"), ErrorCode::Unknown);
}

#[rstest]
fn source_error_is_exposed() {
    let cause: Arc<dyn std::error::Error + Send + Sync> =
        Arc::new(std::io::Error::other("disk on fire"));
    let err = Error::from_code(ErrorCode::FOER0000, "wrapped").with_source(Some(cause));
    let source = err.source().map(ToString::to_string);
    assert_eq!(source.as_deref(), Some("disk on fire"));
}
