//! Prolog declarations, external variables, the context item and static
//! context configuration.

use rstest::rstest;
use xquery_flwor::builder::*;
use xquery_flwor::engine::collation::SIMPLE_CASE_URI;
use xquery_flwor::{
    DynamicContext, DynamicContextBuilder, Error, ErrorCode, ExpandedName, StaticContextBuilder,
    XdmAtomicValue, XdmItem, XdmSequence, compile, compile_expr, compile_with_context, evaluate,
};

type N = xquery_flwor::SimpleNode;

fn run(module: &Module, dyn_ctx: &DynamicContext<N>) -> Result<XdmSequence<N>, Error> {
    evaluate(&compile(module)?, dyn_ctx)
}

fn int_item(i: i64) -> XdmItem<N> {
    XdmItem::Atomic(XdmAtomicValue::Integer(i))
}

#[rstest]
fn globals_initialize_lazily_in_dependency_order() {
    let m = Module::main(var("a"))
        .declare_variable("a", None, var("b").plus(int(1)))
        .declare_variable("b", None, int(41));
    assert_eq!(run(&m, &DynamicContext::default()).unwrap(), vec![int_item(42)]);
}

#[rstest]
fn unused_failing_global_is_never_evaluated() {
    let m = Module::main(int(1)).declare_variable("boom", None, int(1).divide(int(0)));
    assert_eq!(run(&m, &DynamicContext::default()).unwrap(), vec![int_item(1)]);
}

#[rstest]
fn circular_globals_are_detected() {
    let m = Module::main(var("a"))
        .declare_variable("a", None, var("b"))
        .declare_variable("b", None, var("a"));
    let err = run(&m, &DynamicContext::default()).unwrap_err();
    assert_eq!(err.code_enum(), ErrorCode::XQDY0054);
}

#[rstest]
fn global_type_is_checked() {
    let m = Module::main(var("a")).declare_variable("a", Some(atomic_type("xs:string")), int(1));
    let err = run(&m, &DynamicContext::default()).unwrap_err();
    assert_eq!(err.code_enum(), ErrorCode::XPTY0004);
}

#[rstest]
fn external_variable_takes_supplied_value() {
    let m = Module::main(var("x").times(int(2))).declare_external("x", None, Some(int(1)));
    let dyn_ctx = DynamicContextBuilder::<N>::new()
        .with_variable(ExpandedName::local("x"), vec![int_item(21)])
        .build();
    assert_eq!(run(&m, &dyn_ctx).unwrap(), vec![int_item(42)]);
}

#[rstest]
fn external_variable_falls_back_to_default() {
    let m = Module::main(var("x")).declare_external("x", None, Some(int(7)));
    assert_eq!(run(&m, &DynamicContext::default()).unwrap(), vec![int_item(7)]);
}

#[rstest]
fn missing_external_variable_is_dynamic_error() {
    let m = Module::main(var("x")).declare_external("x", None, None);
    let err = run(&m, &DynamicContext::default()).unwrap_err();
    assert_eq!(err.code_enum(), ErrorCode::XPDY0002);
    assert!(!err.is_static());
}

#[rstest]
fn static_context_variables_need_no_declaration() {
    let static_ctx = StaticContextBuilder::new()
        .with_variable(ExpandedName::local("n"))
        .build();
    let q = compile_expr(&var("n").plus(int(1)), &static_ctx).unwrap();
    let dyn_ctx = DynamicContextBuilder::<N>::new()
        .with_variable(ExpandedName::local("n"), vec![int_item(1)])
        .build();
    assert_eq!(evaluate(&q, &dyn_ctx).unwrap(), vec![int_item(2)]);
}

#[rstest]
fn context_item_from_dynamic_context() {
    let dyn_ctx = DynamicContextBuilder::<N>::new()
        .with_context_item(XdmAtomicValue::Integer(5))
        .build();
    let q = compile(&Module::main(dot().plus(int(1)))).unwrap();
    assert_eq!(evaluate(&q, &dyn_ctx).unwrap(), vec![int_item(6)]);
}

#[rstest]
fn absent_context_item_is_dynamic_error() {
    let q = compile(&Module::main(dot())).unwrap();
    let err = evaluate(&q, &DynamicContext::<N>::default()).unwrap_err();
    assert_eq!(err.code_enum(), ErrorCode::XPDY0002);
}

#[rstest]
fn declared_context_item_is_computed_once() {
    let m = Module::main(dot().times(int(2)))
        .declare_context_item(None, VarValue::Expr(int(10).plus(int(1))));
    assert_eq!(run(&m, &DynamicContext::default()).unwrap(), vec![int_item(22)]);
}

#[rstest]
fn context_item_declaration_referring_to_itself_is_circular() {
    let m = Module::main(dot())
        .declare_context_item(None, VarValue::Expr(var("g")))
        .declare_variable("g", None, dot());
    let err = run(&m, &DynamicContext::default()).unwrap_err();
    assert_eq!(err.code_enum(), ErrorCode::XQDY0054);
}

#[rstest]
fn external_context_item_prefers_supplied_item() {
    let m = Module::main(dot()).declare_context_item(None, VarValue::External(Some(int(1))));
    let dyn_ctx = DynamicContextBuilder::<N>::new()
        .with_context_item(XdmAtomicValue::Integer(9))
        .build();
    assert_eq!(run(&m, &dyn_ctx).unwrap(), vec![int_item(9)]);
}

#[rstest]
fn context_item_type_is_checked() {
    let m = Module::main(dot()).declare_context_item(
        Some(ItemType::Atomic("xs:string".into())),
        VarValue::Expr(int(1)),
    );
    let err = run(&m, &DynamicContext::default()).unwrap_err();
    assert_eq!(err.code_enum(), ErrorCode::XPTY0004);
}

#[rstest]
fn prolog_namespace_binds_function_prefix() {
    let m = Module::main(call("f:count", vec![range(int(1), int(3))]))
        .declare_namespace("f", "http://www.w3.org/2005/xpath-functions");
    assert_eq!(run(&m, &DynamicContext::default()).unwrap(), vec![int_item(3)]);
}

#[rstest]
fn unknown_prefix_is_static_error() {
    let err = compile(&Module::main(call("nope:f", vec![]))).unwrap_err();
    assert_eq!(err.code_enum(), ErrorCode::XPST0081);
}

#[rstest]
fn unknown_function_reports_xpst0017() {
    let err = run(&Module::main(call("no-such-function", vec![])), &DynamicContext::default())
        .unwrap_err();
    assert_eq!(err.code_enum(), ErrorCode::XPST0017);
}

#[rstest]
fn static_default_collation_drives_grouping() {
    let static_ctx = StaticContextBuilder::new()
        .with_default_collation(SIMPLE_CASE_URI)
        .build();
    let q = flwor()
        .for_("x", seq(vec![string("a"), string("A")]))
        .group_by(vec![GroupingSpec::var("k").value(var("x"))])
        .return_(call("count", vec![var("x")]));
    let compiled = compile_with_context(&Module::main(q), &static_ctx).unwrap();
    let out = evaluate(&compiled, &DynamicContext::<N>::default()).unwrap();
    assert_eq!(out, vec![int_item(2)]);
}

#[rstest]
fn unknown_default_collation_is_reported() {
    let dyn_ctx = DynamicContextBuilder::<N>::new()
        .with_default_collation("urn:missing")
        .build();
    let q = compile(&Module::main(int(1))).unwrap();
    let err = evaluate(&q, &dyn_ctx).unwrap_err();
    assert_eq!(err.code_enum(), ErrorCode::FOCH0002);
}

#[rstest]
fn empty_greatest_default_from_static_context() {
    let static_ctx = StaticContextBuilder::new()
        .with_default_empty_order(EmptyOrder::Greatest)
        .build();
    let q = flwor()
        .for_("x", seq(vec![int(0), int(1)]))
        .order_by(vec![OrderSpec::new(if_then_else(
            var("x").val_eq(int(0)),
            empty(),
            var("x"),
        ))])
        .return_(var("x"));
    let compiled = compile_with_context(&Module::main(q), &static_ctx).unwrap();
    let out = evaluate(&compiled, &DynamicContext::<N>::default()).unwrap();
    assert_eq!(out, vec![int_item(1), int_item(0)]);
}

#[rstest]
fn compiled_query_is_reusable() {
    let q = compile(&Module::main(
        flwor().for_("x", range(int(1), int(3))).return_(var("x")),
    ))
    .unwrap();
    let dyn_ctx = DynamicContext::<N>::default();
    assert_eq!(evaluate(&q, &dyn_ctx).unwrap(), evaluate(&q, &dyn_ctx).unwrap());
}
