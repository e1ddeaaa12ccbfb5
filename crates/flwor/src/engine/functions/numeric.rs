use super::common::{atomic_seq, numeric_operand, opt_atomic, round_half_up};
use crate::engine::casting::parse_double;
use crate::engine::numeric::{classify, negate};
use crate::engine::runtime::{CallCtx, Error};
use crate::model::XdmNode;
use crate::xdm::{XdmAtomicValue, XdmSequence};
use rust_decimal::{Decimal, RoundingStrategy};

#[derive(Clone, Copy)]
enum Rounding {
    Floor,
    Ceiling,
    HalfUp,
}

impl Rounding {
    fn double(self, d: f64) -> f64 {
        match self {
            Rounding::Floor => d.floor(),
            Rounding::Ceiling => d.ceil(),
            Rounding::HalfUp => round_half_up(d),
        }
    }

    fn decimal(self, d: Decimal) -> Decimal {
        match self {
            Rounding::Floor => d.floor(),
            Rounding::Ceiling => d.ceil(),
            Rounding::HalfUp if d.is_sign_negative() => {
                d.round_dp_with_strategy(0, RoundingStrategy::MidpointTowardZero)
            }
            Rounding::HalfUp => d.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero),
        }
    }
}

/// Applies `mode` keeping the operand's numeric type; empty stays empty.
fn round_with<N: XdmNode>(args: &[XdmSequence<N>], mode: Rounding, what: &str) -> Result<XdmSequence<N>, Error> {
    let Some(v) = opt_atomic(&args[0], what)? else {
        return Ok(Vec::new());
    };
    let out = match numeric_operand(v, what)? {
        XdmAtomicValue::Integer(i) => XdmAtomicValue::Integer(i),
        XdmAtomicValue::Decimal(d) => XdmAtomicValue::Decimal(mode.decimal(d)),
        XdmAtomicValue::Float(f) => XdmAtomicValue::Float(mode.double(f64::from(f)) as f32),
        XdmAtomicValue::Double(d) => XdmAtomicValue::Double(mode.double(d)),
        other => other,
    };
    Ok(atomic_seq(Some(out)))
}

pub(super) fn abs_fn<N: XdmNode>(
    _ctx: &CallCtx<N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let Some(v) = opt_atomic(&args[0], "abs")? else {
        return Ok(Vec::new());
    };
    let v = numeric_operand(v, "abs")?;
    let negative = match &v {
        XdmAtomicValue::Integer(i) => *i < 0,
        XdmAtomicValue::Decimal(d) => d.is_sign_negative(),
        XdmAtomicValue::Float(f) => f.is_sign_negative(),
        XdmAtomicValue::Double(d) => d.is_sign_negative(),
        _ => false,
    };
    Ok(atomic_seq(Some(if negative { negate(&v)? } else { v })))
}

pub(super) fn floor_fn<N: XdmNode>(
    _ctx: &CallCtx<N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    round_with(args, Rounding::Floor, "floor")
}

pub(super) fn ceiling_fn<N: XdmNode>(
    _ctx: &CallCtx<N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    round_with(args, Rounding::Ceiling, "ceiling")
}

pub(super) fn round_fn<N: XdmNode>(
    _ctx: &CallCtx<N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    round_with(args, Rounding::HalfUp, "round")
}

/// `fn:number`: `NaN` for empty input or values that do not parse.
pub(super) fn number_fn<N: XdmNode>(
    _ctx: &CallCtx<N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let d = match opt_atomic(&args[0], "number")? {
        None => f64::NAN,
        Some(XdmAtomicValue::Boolean(b)) => f64::from(u8::from(b)),
        Some(v) => match classify(&v) {
            Some(n) => n.to_f64(),
            None => parse_double(&v.canonical_string()).unwrap_or(f64::NAN),
        },
    };
    Ok(atomic_seq(Some(XdmAtomicValue::Double(d))))
}
