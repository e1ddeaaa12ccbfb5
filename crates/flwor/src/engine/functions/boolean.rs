use super::common::bool_seq;
use crate::engine::evaluator::ebv;
use crate::engine::runtime::{CallCtx, Error};
use crate::model::XdmNode;
use crate::xdm::XdmSequence;

pub(super) fn fn_true<N: XdmNode>(
    _ctx: &CallCtx<N>,
    _args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    Ok(bool_seq(true))
}

pub(super) fn fn_false<N: XdmNode>(
    _ctx: &CallCtx<N>,
    _args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    Ok(bool_seq(false))
}

pub(super) fn fn_not<N: XdmNode>(
    _ctx: &CallCtx<N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    Ok(bool_seq(!ebv(&args[0])?))
}

pub(super) fn fn_boolean<N: XdmNode>(
    _ctx: &CallCtx<N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    Ok(bool_seq(ebv(&args[0])?))
}
