use crate::engine::casting::parse_double;
use crate::engine::collation::Collation;
use crate::engine::comparison::Comparator;
use crate::engine::evaluator::atomize;
use crate::engine::numeric::classify;
use crate::engine::runtime::{CallCtx, Error, ErrorCode};
use crate::model::XdmNode;
use crate::xdm::{XdmAtomicValue, XdmItem, XdmSequence};
use std::sync::Arc;

pub(super) fn bool_seq<N>(b: bool) -> XdmSequence<N> {
    vec![XdmItem::Atomic(XdmAtomicValue::Boolean(b))]
}

pub(super) fn int_seq<N>(i: i64) -> XdmSequence<N> {
    vec![XdmItem::Atomic(XdmAtomicValue::Integer(i))]
}

pub(super) fn string_seq<N>(s: impl Into<String>) -> XdmSequence<N> {
    vec![XdmItem::Atomic(XdmAtomicValue::String(s.into()))]
}

pub(super) fn atomic_seq<N>(v: Option<XdmAtomicValue>) -> XdmSequence<N> {
    v.into_iter().map(XdmItem::Atomic).collect()
}

/// `usize` count as `xs:integer`.
pub(super) fn count_value(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

/// Atomized `xs:anyAtomicType?` argument.
pub(super) fn opt_atomic<N: XdmNode>(
    seq: &XdmSequence<N>,
    what: &str,
) -> Result<Option<XdmAtomicValue>, Error> {
    let mut values = atomize(seq)?;
    if values.len() > 1 {
        return Err(Error::from_code(
            ErrorCode::XPTY0004,
            format!("{what} expects at most one item, got {}", values.len()),
        ));
    }
    Ok(values.pop())
}

/// `xs:string?` argument; the empty sequence reads as `""`.
pub(super) fn string_arg<N: XdmNode>(seq: &XdmSequence<N>, what: &str) -> Result<String, Error> {
    Ok(opt_atomic(seq, what)?
        .map(|v| v.canonical_string())
        .unwrap_or_default())
}

/// String value of a single item, as `fn:string` defines it.
pub(super) fn item_string<N: XdmNode>(item: &XdmItem<N>) -> Result<String, Error> {
    match item {
        XdmItem::Atomic(a) => Ok(a.canonical_string()),
        XdmItem::Node(n) => Ok(n.string_value()),
        XdmItem::Function(f) => Err(Error::from_code(
            ErrorCode::FOTY0013,
            format!("function item {f:?} has no string value"),
        )),
    }
}

/// Numeric operand of an aggregate or rounding function. Untyped values
/// are cast to `xs:double`.
pub(super) fn numeric_operand(v: XdmAtomicValue, what: &str) -> Result<XdmAtomicValue, Error> {
    match v {
        XdmAtomicValue::UntypedAtomic(s) => parse_double(&s).map(XdmAtomicValue::Double),
        v if classify(&v).is_some() => Ok(v),
        v => Err(Error::from_code(
            ErrorCode::XPTY0004,
            format!("{what} expects numeric values, got {}", v.type_of().name()),
        )),
    }
}

/// Collation named by the optional argument at `idx`, else the default one.
pub(super) fn collation_arg<N: XdmNode>(
    ctx: &CallCtx<N>,
    args: &[XdmSequence<N>],
    idx: usize,
) -> Result<Arc<dyn Collation>, Error> {
    let uri = match args.get(idx) {
        Some(seq) => Some(string_arg(seq, "collation")?),
        None => None,
    };
    ctx.dyn_ctx
        .collations
        .resolve(uri.as_deref(), &ctx.default_collation)
}

pub(super) fn comparator<N: XdmNode>(
    ctx: &CallCtx<N>,
    args: &[XdmSequence<N>],
    idx: usize,
) -> Result<Comparator, Error> {
    Ok(Comparator::new(collation_arg(ctx, args, idx)?, ctx.implicit_timezone))
}

/// Rounded `xs:double` argument used for positions and lengths.
pub(super) fn position_arg<N: XdmNode>(seq: &XdmSequence<N>, what: &str) -> Result<f64, Error> {
    let Some(v) = opt_atomic(seq, what)? else {
        return Err(Error::from_code(
            ErrorCode::XPTY0004,
            format!("{what} must not be empty"),
        ));
    };
    match classify(&numeric_operand(v, what)?) {
        Some(n) => Ok(round_half_up(n.to_f64())),
        None => Err(Error::from_code(ErrorCode::XPTY0004, format!("{what} must be numeric"))),
    }
}

/// Position that addresses an item (`insert-before`, `remove`); NaN is rejected.
pub(super) fn index_arg<N: XdmNode>(seq: &XdmSequence<N>, what: &str) -> Result<f64, Error> {
    let pos = position_arg(seq, what)?;
    if pos.is_nan() {
        return Err(Error::from_code(
            ErrorCode::XPTY0004,
            format!("{what} must be an integer, got NaN"),
        ));
    }
    Ok(pos)
}

/// `fn:round` on doubles: halves round towards positive infinity.
pub(super) fn round_half_up(d: f64) -> f64 {
    if d.is_nan() || d.is_infinite() {
        return d;
    }
    (d + 0.5).floor()
}

/// Runs `f` with a call context over default registries and UTC.
#[cfg(test)]
pub(super) fn with_test_ctx<R>(
    f: impl FnOnce(&CallCtx<crate::model::simple::SimpleNode>) -> R,
) -> R {
    use crate::engine::collation::CodepointCollation;
    use crate::engine::runtime::{DynamicContext, StaticContext};
    let dyn_ctx = DynamicContext::default();
    let static_ctx = StaticContext::default();
    f(&CallCtx {
        dyn_ctx: &dyn_ctx,
        static_ctx: &static_ctx,
        default_collation: Arc::new(CodepointCollation),
        implicit_timezone: chrono::FixedOffset::east_opt(0).unwrap(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::simple::SimpleNode;
    use rstest::rstest;

    #[rstest]
    #[case(2.5, 3.0)]
    #[case(-2.5, -2.0)]
    #[case(1.4, 1.0)]
    fn rounds_half_up(#[case] input: f64, #[case] expected: f64) {
        assert_eq!(round_half_up(input), expected);
    }

    #[rstest]
    fn string_arg_of_empty_is_empty_string() {
        let empty: XdmSequence<SimpleNode> = Vec::new();
        assert_eq!(string_arg(&empty, "arg").unwrap(), "");
    }

    #[rstest]
    fn index_arg_rejects_nan_but_position_arg_keeps_it() {
        let nan: XdmSequence<SimpleNode> = vec![XdmAtomicValue::Double(f64::NAN).into()];
        assert!(position_arg(&nan, "start").unwrap().is_nan());
        let err = index_arg(&nan, "position").unwrap_err();
        assert_eq!(err.code_enum(), ErrorCode::XPTY0004);
    }

    #[rstest]
    fn opt_atomic_rejects_sequences() {
        let seq: XdmSequence<SimpleNode> = vec![
            XdmAtomicValue::Integer(1).into(),
            XdmAtomicValue::Integer(2).into(),
        ];
        let err = opt_atomic(&seq, "arg").unwrap_err();
        assert_eq!(err.code_enum(), ErrorCode::XPTY0004);
    }
}
