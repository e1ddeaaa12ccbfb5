use super::common::{atomic_seq, comparator, count_value, numeric_operand};
use crate::ast::ArithOp;
use crate::engine::comparison::ValueOrder;
use crate::engine::evaluator::atomize;
use crate::engine::numeric::arithmetic;
use crate::engine::runtime::{CallCtx, Error};
use crate::model::XdmNode;
use crate::xdm::{XdmAtomicValue, XdmSequence};

fn numeric_values<N: XdmNode>(seq: &XdmSequence<N>, what: &str) -> Result<Vec<XdmAtomicValue>, Error> {
    atomize(seq)?
        .into_iter()
        .map(|v| numeric_operand(v, what))
        .collect()
}

fn total(values: Vec<XdmAtomicValue>) -> Result<Option<XdmAtomicValue>, Error> {
    let mut it = values.into_iter();
    let Some(first) = it.next() else {
        return Ok(None);
    };
    it.try_fold(first, |acc, v| arithmetic(ArithOp::Add, &acc, &v))
        .map(Some)
}

/// `fn:sum($arg[, $zero])`: the empty sum is `$zero`, or `0` when omitted.
pub(super) fn sum_fn<N: XdmNode>(
    _ctx: &CallCtx<N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    match total(numeric_values(&args[0], "sum")?)? {
        Some(v) => Ok(atomic_seq(Some(v))),
        None => match args.get(1) {
            Some(zero) => Ok(zero.clone()),
            None => Ok(atomic_seq(Some(XdmAtomicValue::Integer(0)))),
        },
    }
}

pub(super) fn avg_fn<N: XdmNode>(
    _ctx: &CallCtx<N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let values = numeric_values(&args[0], "avg")?;
    let n = count_value(values.len());
    let Some(sum) = total(values)? else {
        return Ok(Vec::new());
    };
    let avg = arithmetic(ArithOp::Div, &sum, &XdmAtomicValue::Integer(n))?;
    Ok(atomic_seq(Some(avg)))
}

fn extreme<N: XdmNode>(
    ctx: &CallCtx<N>,
    args: &[XdmSequence<N>],
    keep: ValueOrder,
) -> Result<XdmSequence<N>, Error> {
    let cmp = comparator(ctx, args, 1)?;
    let mut best: Option<XdmAtomicValue> = None;
    for v in atomize(&args[0])? {
        let v = match v {
            XdmAtomicValue::UntypedAtomic(_) => numeric_operand(v, "min/max")?,
            v => v,
        };
        best = Some(match best {
            None => v,
            // NaN wins once seen.
            Some(b) if b.is_nan() => {
                cmp.compare_for_ordering(&b, &v)?;
                b
            }
            Some(_) if v.is_nan() => v,
            Some(b) => {
                if cmp.compare_for_ordering(&v, &b)? == keep {
                    v
                } else {
                    b
                }
            }
        });
    }
    Ok(atomic_seq(best))
}

pub(super) fn min_fn<N: XdmNode>(
    ctx: &CallCtx<N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    extreme(ctx, args, ValueOrder::Less)
}

pub(super) fn max_fn<N: XdmNode>(
    ctx: &CallCtx<N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    extreme(ctx, args, ValueOrder::Greater)
}
