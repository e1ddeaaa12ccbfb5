//! Numeric classification, promotion and arithmetic.
//!
//! [`NumKind`] carries a value promoted along integer → decimal → float →
//! double. Comparison and arithmetic both go through [`unify_numeric`] so the
//! two paths agree on promotion.

use crate::ast::ArithOp;
use crate::engine::casting::parse_double;
use crate::engine::runtime::{Error, ErrorCode};
use crate::xdm::XdmAtomicValue;
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum NumKind {
    Int(i64),
    Dec(Decimal),
    Float(f32),
    Double(f64),
}

impl NumKind {
    /// Lossy for decimals outside the f64 range.
    pub(crate) fn to_f64(self) -> f64 {
        match self {
            NumKind::Int(i) => i as f64,
            NumKind::Dec(d) => d.to_f64().unwrap_or(f64::NAN),
            NumKind::Float(f) => f64::from(f),
            NumKind::Double(d) => d,
        }
    }

    pub(crate) fn is_nan(self) -> bool {
        match self {
            NumKind::Float(f) => f.is_nan(),
            NumKind::Double(d) => d.is_nan(),
            _ => false,
        }
    }

    fn into_atomic(self) -> XdmAtomicValue {
        match self {
            NumKind::Int(i) => XdmAtomicValue::Integer(i),
            NumKind::Dec(d) => XdmAtomicValue::Decimal(d),
            NumKind::Float(f) => XdmAtomicValue::Float(f),
            NumKind::Double(d) => XdmAtomicValue::Double(d),
        }
    }
}

pub(crate) fn classify(v: &XdmAtomicValue) -> Option<NumKind> {
    match v {
        XdmAtomicValue::Integer(i) => Some(NumKind::Int(*i)),
        XdmAtomicValue::Decimal(d) => Some(NumKind::Dec(*d)),
        XdmAtomicValue::Float(f) => Some(NumKind::Float(*f)),
        XdmAtomicValue::Double(d) => Some(NumKind::Double(*d)),
        _ => None,
    }
}

/// Promote two values to their least common numeric type.
pub(crate) fn unify_numeric(a: NumKind, b: NumKind) -> (NumKind, NumKind) {
    use NumKind::*;
    match (a, b) {
        (Double(x), y) => (Double(x), Double(y.to_f64())),
        (y, Double(x)) => (Double(y.to_f64()), Double(x)),
        (Float(x), Float(y)) => (Float(x), Float(y)),
        (Float(x), y) => (Float(x), Float(y.to_f64() as f32)),
        (y, Float(x)) => (Float(y.to_f64() as f32), Float(x)),
        (Dec(x), Dec(y)) => (Dec(x), Dec(y)),
        (Dec(x), Int(y)) => (Dec(x), Dec(Decimal::from(y))),
        (Int(x), Dec(y)) => (Dec(Decimal::from(x)), Dec(y)),
        (Int(x), Int(y)) => (Int(x), Int(y)),
    }
}

/// Operand of an arithmetic expression: untyped values are cast to `xs:double`.
fn arithmetic_operand(v: &XdmAtomicValue) -> Result<NumKind, Error> {
    if let XdmAtomicValue::UntypedAtomic(s) = v {
        return parse_double(s).map(NumKind::Double);
    }
    classify(v).ok_or_else(|| {
        Error::from_code(
            ErrorCode::XPTY0004,
            format!("arithmetic operand of type {} is not numeric", v.type_of().name()),
        )
    })
}

fn overflow() -> Error {
    Error::from_code(ErrorCode::FOAR0002, "numeric overflow")
}

fn div_by_zero() -> Error {
    Error::from_code(ErrorCode::FOAR0001, "division by zero")
}

pub fn arithmetic(
    op: ArithOp,
    a: &XdmAtomicValue,
    b: &XdmAtomicValue,
) -> Result<XdmAtomicValue, Error> {
    let (ua, ub) = unify_numeric(arithmetic_operand(a)?, arithmetic_operand(b)?);
    match (ua, ub) {
        (NumKind::Int(x), NumKind::Int(y)) => integer_arith(op, x, y),
        (NumKind::Dec(x), NumKind::Dec(y)) => decimal_arith(op, x, y),
        (NumKind::Float(x), NumKind::Float(y)) => {
            float_arith(op, f64::from(x), f64::from(y)).map(|r| match r {
                NumKind::Double(d) => NumKind::Float(d as f32).into_atomic(),
                other => other.into_atomic(),
            })
        }
        (x, y) => float_arith(op, x.to_f64(), y.to_f64()).map(NumKind::into_atomic),
    }
}

fn integer_arith(op: ArithOp, x: i64, y: i64) -> Result<XdmAtomicValue, Error> {
    let v = match op {
        ArithOp::Add => x.checked_add(y).ok_or_else(overflow)?,
        ArithOp::Sub => x.checked_sub(y).ok_or_else(overflow)?,
        ArithOp::Mul => x.checked_mul(y).ok_or_else(overflow)?,
        ArithOp::Div => return decimal_arith(op, Decimal::from(x), Decimal::from(y)),
        ArithOp::IDiv => {
            if y == 0 {
                return Err(div_by_zero());
            }
            x.checked_div(y).ok_or_else(overflow)?
        }
        ArithOp::Mod => {
            if y == 0 {
                return Err(div_by_zero());
            }
            // sign follows the dividend
            x.checked_rem(y).unwrap_or(0)
        }
    };
    Ok(XdmAtomicValue::Integer(v))
}

fn decimal_arith(op: ArithOp, x: Decimal, y: Decimal) -> Result<XdmAtomicValue, Error> {
    let v = match op {
        ArithOp::Add => x.checked_add(y).ok_or_else(overflow)?,
        ArithOp::Sub => x.checked_sub(y).ok_or_else(overflow)?,
        ArithOp::Mul => x.checked_mul(y).ok_or_else(overflow)?,
        ArithOp::Div => {
            if y.is_zero() {
                return Err(div_by_zero());
            }
            x.checked_div(y).ok_or_else(overflow)?
        }
        ArithOp::IDiv => {
            if y.is_zero() {
                return Err(div_by_zero());
            }
            let q = x.checked_div(y).ok_or_else(overflow)?.trunc();
            return q
                .to_i64()
                .map(XdmAtomicValue::Integer)
                .ok_or_else(overflow);
        }
        ArithOp::Mod => {
            if y.is_zero() {
                return Err(div_by_zero());
            }
            x.checked_rem(y).ok_or_else(overflow)?
        }
    };
    Ok(XdmAtomicValue::Decimal(v))
}

/// IEEE arithmetic; the caller narrows to float when both operands were floats.
fn float_arith(op: ArithOp, x: f64, y: f64) -> Result<NumKind, Error> {
    Ok(match op {
        ArithOp::Add => NumKind::Double(x + y),
        ArithOp::Sub => NumKind::Double(x - y),
        ArithOp::Mul => NumKind::Double(x * y),
        ArithOp::Div => NumKind::Double(x / y),
        ArithOp::Mod => NumKind::Double(x % y),
        ArithOp::IDiv => {
            if y == 0.0 {
                return Err(div_by_zero());
            }
            if x.is_nan() || y.is_nan() || x.is_infinite() {
                return Err(Error::from_code(
                    ErrorCode::FOAR0002,
                    "idiv operand is NaN or infinite",
                ));
            }
            let q = (x / y).trunc();
            if q < i64::MIN as f64 || q > i64::MAX as f64 {
                return Err(overflow());
            }
            NumKind::Int(q as i64)
        }
    })
}

pub fn negate(a: &XdmAtomicValue) -> Result<XdmAtomicValue, Error> {
    Ok(match arithmetic_operand(a)? {
        NumKind::Int(i) => XdmAtomicValue::Integer(i.checked_neg().ok_or_else(overflow)?),
        NumKind::Dec(d) => XdmAtomicValue::Decimal(-d),
        NumKind::Float(f) => XdmAtomicValue::Float(-f),
        NumKind::Double(d) => XdmAtomicValue::Double(-d),
    })
}

/// Lossless decimal view used by aggregates; `None` for NaN/INF.
pub(crate) fn to_decimal(n: NumKind) -> Option<Decimal> {
    match n {
        NumKind::Int(i) => Some(Decimal::from(i)),
        NumKind::Dec(d) => Some(d),
        NumKind::Float(f) => Decimal::from_f32(f),
        NumKind::Double(d) => Decimal::from_f64(d),
    }
}
