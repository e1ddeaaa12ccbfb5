use super::common::{
    bool_seq, comparator, count_value, index_arg, int_seq, opt_atomic, position_arg,
};
use crate::engine::comparison::KeyHash;
use crate::engine::evaluator::atomize;
use crate::engine::runtime::{CallCtx, Error, ErrorCode};
use crate::model::XdmNode;
use crate::xdm::{XdmAtomicValue, XdmItem, XdmSequence};
use std::collections::HashMap;

pub(super) fn empty_fn<N: XdmNode>(
    _ctx: &CallCtx<N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    Ok(bool_seq(args[0].is_empty()))
}

pub(super) fn exists_fn<N: XdmNode>(
    _ctx: &CallCtx<N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    Ok(bool_seq(!args[0].is_empty()))
}

pub(super) fn head_fn<N: XdmNode>(
    _ctx: &CallCtx<N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    Ok(args[0].first().cloned().into_iter().collect())
}

pub(super) fn tail_fn<N: XdmNode>(
    _ctx: &CallCtx<N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    Ok(args[0].iter().skip(1).cloned().collect())
}

pub(super) fn count_fn<N: XdmNode>(
    _ctx: &CallCtx<N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    Ok(int_seq(count_value(args[0].len())))
}

pub(super) fn reverse_fn<N: XdmNode>(
    _ctx: &CallCtx<N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    Ok(args[0].iter().rev().cloned().collect())
}

pub(super) fn data_fn<N: XdmNode>(
    _ctx: &CallCtx<N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    Ok(atomize(&args[0])?.into_iter().map(XdmItem::Atomic).collect())
}

/// Items at positions `p` with `round(start) <= p < round(start) + round(length)`.
pub(super) fn subsequence_fn<N: XdmNode>(
    _ctx: &CallCtx<N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let start = position_arg(&args[1], "subsequence start")?;
    let end = match args.get(2) {
        Some(len) => start + position_arg(len, "subsequence length")?,
        None => f64::INFINITY,
    };
    Ok(args[0]
        .iter()
        .enumerate()
        .filter(|(i, _)| {
            let p = (i + 1) as f64;
            p >= start && p < end
        })
        .map(|(_, item)| item.clone())
        .collect())
}

/// Distinct atomized values in order of first occurrence; NaN equals NaN.
pub(super) fn distinct_values_fn<N: XdmNode>(
    ctx: &CallCtx<N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let cmp = comparator(ctx, args, 1)?;
    let mut seen: HashMap<KeyHash, Vec<XdmAtomicValue>> = HashMap::new();
    let mut out = Vec::new();
    for v in atomize(&args[0])? {
        let bucket = seen.entry(cmp.grouping_hash(&v)).or_default();
        if bucket.iter().any(|w| cmp.equals_for_switch(w, &v)) {
            continue;
        }
        bucket.push(v.clone());
        out.push(XdmItem::Atomic(v));
    }
    Ok(out)
}

pub(super) fn index_of_fn<N: XdmNode>(
    ctx: &CallCtx<N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let cmp = comparator(ctx, args, 2)?;
    let Some(search) = opt_atomic(&args[1], "index-of search value")? else {
        return Err(Error::from_code(
            ErrorCode::XPTY0004,
            "index-of search value must not be empty",
        ));
    };
    Ok(atomize(&args[0])?
        .iter()
        .enumerate()
        .filter(|(_, v)| !v.is_nan() && cmp.equals_for_switch(v, &search))
        .map(|(i, _)| XdmItem::Atomic(XdmAtomicValue::Integer(count_value(i + 1))))
        .collect())
}

pub(super) fn insert_before_fn<N: XdmNode>(
    _ctx: &CallCtx<N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let pos = index_arg(&args[1], "insert-before position")?;
    let at = if pos < 1.0 {
        0
    } else {
        (pos as usize - 1).min(args[0].len())
    };
    let mut out = args[0].clone();
    out.splice(at..at, args[2].iter().cloned());
    Ok(out)
}

pub(super) fn remove_fn<N: XdmNode>(
    _ctx: &CallCtx<N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let pos = index_arg(&args[1], "remove position")?;
    Ok(args[0]
        .iter()
        .enumerate()
        .filter(|(i, _)| (i + 1) as f64 != pos)
        .map(|(_, item)| item.clone())
        .collect())
}

pub(super) fn zero_or_one_fn<N: XdmNode>(
    _ctx: &CallCtx<N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    if args[0].len() > 1 {
        return Err(Error::from_code(
            ErrorCode::FORG0004,
            "zero-or-one requires at most one item",
        ));
    }
    Ok(args[0].clone())
}

pub(super) fn one_or_more_fn<N: XdmNode>(
    _ctx: &CallCtx<N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    if args[0].is_empty() {
        return Err(Error::from_code(
            ErrorCode::FORG0004,
            "one-or-more requires at least one item",
        ));
    }
    Ok(args[0].clone())
}

pub(super) fn exactly_one_fn<N: XdmNode>(
    _ctx: &CallCtx<N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    if args[0].len() != 1 {
        return Err(Error::from_code(
            ErrorCode::FORG0005,
            "exactly-one requires a sequence of length 1",
        ));
    }
    Ok(args[0].clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::common::with_test_ctx;
    use crate::model::simple::SimpleNode;
    use rstest::rstest;

    fn ints(values: &[i64]) -> XdmSequence<SimpleNode> {
        values
            .iter()
            .map(|&i| XdmAtomicValue::Integer(i).into())
            .collect()
    }

    fn dbl(d: f64) -> XdmSequence<SimpleNode> {
        vec![XdmAtomicValue::Double(d).into()]
    }

    #[rstest]
    #[case(dbl(0.0), ints(&[9, 1, 2]))]
    #[case(dbl(2.0), ints(&[1, 9, 2]))]
    #[case(dbl(f64::INFINITY), ints(&[1, 2, 9]))]
    fn insert_before_clamps_position(
        #[case] pos: XdmSequence<SimpleNode>,
        #[case] expected: XdmSequence<SimpleNode>,
    ) {
        let out = with_test_ctx(|ctx| insert_before_fn(ctx, &[ints(&[1, 2]), pos, ints(&[9])]));
        assert_eq!(out.unwrap(), expected);
    }

    #[rstest]
    fn nan_position_is_type_error() {
        with_test_ctx(|ctx| {
            let err = insert_before_fn(ctx, &[ints(&[1, 2]), dbl(f64::NAN), ints(&[9])]).unwrap_err();
            assert_eq!(err.code_enum(), ErrorCode::XPTY0004);
            let err = remove_fn(ctx, &[ints(&[1, 2]), dbl(f64::NAN)]).unwrap_err();
            assert_eq!(err.code_enum(), ErrorCode::XPTY0004);
        });
    }

    #[rstest]
    fn remove_drops_one_item() {
        let out = with_test_ctx(|ctx| remove_fn(ctx, &[ints(&[1, 2, 3]), ints(&[2])]));
        assert_eq!(out.unwrap(), ints(&[1, 3]));
    }
}
