use proptest::prelude::*;
use rstest::rstest;
use xquery_flwor::builder::*;
use xquery_flwor::{
    DynamicContextBuilder, ExpandedName, StaticContextBuilder, XdmAtomicValue, XdmItem,
    compile_expr, evaluate,
};

type N = xquery_flwor::SimpleNode;

/// Evaluates `expr` with `$s` bound to `input`, expecting integers back.
fn eval_over(expr: Expr, input: &[i64]) -> Vec<i64> {
    let name = ExpandedName::local("s");
    let static_ctx = StaticContextBuilder::new().with_variable(name.clone()).build();
    let q = compile_expr(&expr, &static_ctx).expect("compile");
    let seq: Vec<XdmItem<N>> = input
        .iter()
        .map(|&i| XdmItem::Atomic(XdmAtomicValue::Integer(i)))
        .collect();
    let dyn_ctx = DynamicContextBuilder::<N>::new().with_variable(name, seq).build();
    evaluate(&q, &dyn_ctx)
        .expect("evaluate")
        .into_iter()
        .map(|item| match item {
            XdmItem::Atomic(XdmAtomicValue::Integer(i)) => i,
            other => panic!("expected integer, got {other:?}"),
        })
        .collect()
}

prop_compose! {
    fn arb_input()(v in prop::collection::vec(-500i64..500, 0..60)) -> Vec<i64> {
        v
    }
}

proptest! {
    #[rstest]
    fn group_by_partitions_input(input in arb_input(), m in 1i64..12) {
        let q = flwor()
            .for_("x", var("s"))
            .group_by(vec![GroupingSpec::var("k").value(var("x").modulo(int(m)))])
            .return_(call("count", vec![var("x")]));
        let sizes = eval_over(q, &input);
        let mut keys: Vec<i64> = input.iter().map(|x| x % m).collect();
        keys.sort_unstable();
        keys.dedup();
        prop_assert_eq!(sizes.len(), keys.len());
        prop_assert_eq!(sizes.iter().sum::<i64>(), input.len() as i64);
        prop_assert!(sizes.iter().all(|&n| n > 0));
    }

    #[rstest]
    fn group_members_share_their_key(input in arb_input(), m in 1i64..12) {
        // Each group returns its key followed by its members.
        let q = flwor()
            .for_("x", var("s"))
            .group_by(vec![GroupingSpec::var("k").value(var("x").modulo(int(m)))])
            .return_(seq(vec![int(i64::MIN), var("k"), var("x")]));
        let out = eval_over(q, &input);
        for group in out.split(|&v| v == i64::MIN).skip(1) {
            let (key, members) = group.split_first().expect("key");
            prop_assert!(members.iter().all(|x| x % m == *key));
        }
    }

    #[rstest]
    fn order_by_sorts(input in arb_input()) {
        let q = flwor()
            .for_("x", var("s"))
            .order_by(vec![OrderSpec::new(var("x"))])
            .return_(var("x"));
        let mut expected = input.clone();
        expected.sort_unstable();
        prop_assert_eq!(eval_over(q, &input), expected);
    }

    #[rstest]
    fn order_by_keeps_ties_in_input_order(input in arb_input()) {
        let q = flwor()
            .for_binding(ForBinding::new("x", var("s")).at("p"))
            .order_by(vec![OrderSpec::new(var("x").idiv(int(100))).descending()])
            .return_(var("p"));
        let mut expected: Vec<(usize, i64)> = input.iter().copied().enumerate().collect();
        expected.sort_by_key(|&(_, x)| std::cmp::Reverse(x / 100));
        let expected: Vec<i64> = expected.into_iter().map(|(i, _)| i as i64 + 1).collect();
        prop_assert_eq!(eval_over(q, &input), expected);
    }

    #[rstest]
    fn count_clause_numbers_every_tuple(input in arb_input()) {
        let q = flwor().for_("x", var("s")).count("c").return_(var("c"));
        let expected: Vec<i64> = (1..=input.len() as i64).collect();
        prop_assert_eq!(eval_over(q, &input), expected);
    }

    #[rstest]
    fn tumbling_windows_cover_input(input in arb_input(), k in 1i64..8) {
        let start = WindowCondition::when(var("p").minus(int(1)).modulo(int(k)).val_eq(int(0))).at("p");
        let q = flwor()
            .window(WindowClause::tumbling("w", var("s"), start))
            .return_(call("count", vec![var("w")]));
        let sizes = eval_over(q, &input);
        prop_assert_eq!(sizes.iter().sum::<i64>(), input.len() as i64);
        prop_assert!(sizes.iter().all(|&n| n <= k));
    }

    #[rstest]
    fn where_matches_filter(input in arb_input(), t in -500i64..500) {
        let q = flwor()
            .for_("x", var("s"))
            .where_(var("x").val_gt(int(t)))
            .return_(var("x"));
        let expected: Vec<i64> = input.iter().copied().filter(|&x| x > t).collect();
        prop_assert_eq!(eval_over(q, &input), expected);
    }
}
