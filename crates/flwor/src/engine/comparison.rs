//! Value comparison shared by ordering, grouping, switch matching and the
//! value/general comparison operators.
//!
//! All operations work on already atomized values and never evaluate
//! expressions, so they can be called any number of times.

use crate::ast::ComparisonOp;
use crate::engine::casting::{cast_atomic, parse_double};
use crate::engine::collation::{CodepointCollation, Collation};
use crate::engine::numeric::{classify, unify_numeric, NumKind};
use crate::engine::runtime::{Error, ErrorCode};
use crate::xdm::XdmAtomicValue;
use chrono::{FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset};
use core::cmp::Ordering;
use std::sync::Arc;

/// Outcome of an ordering comparison. `Incomparable` is only produced by NaN.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueOrder {
    Less,
    Equal,
    Greater,
    Incomparable,
}

impl From<Ordering> for ValueOrder {
    fn from(o: Ordering) -> Self {
        match o {
            Ordering::Less => ValueOrder::Less,
            Ordering::Equal => ValueOrder::Equal,
            Ordering::Greater => ValueOrder::Greater,
        }
    }
}

/// Comparison families; values of different families never compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Family {
    Numeric,
    Text,
    Boolean,
    QName,
    DateTime,
    Date,
    Time,
    YearMonth,
    DayTime,
}

fn family(v: &XdmAtomicValue) -> Family {
    use XdmAtomicValue as V;
    match v {
        V::Integer(_) | V::Decimal(_) | V::Double(_) | V::Float(_) => Family::Numeric,
        V::String(_) | V::AnyUri(_) | V::UntypedAtomic(_) => Family::Text,
        V::Boolean(_) => Family::Boolean,
        V::QName { .. } => Family::QName,
        V::DateTime(_) => Family::DateTime,
        V::Date { .. } => Family::Date,
        V::Time { .. } => Family::Time,
        V::YearMonthDuration(_) => Family::YearMonth,
        V::DayTimeDuration(_) => Family::DayTime,
    }
}

fn text_of(v: &XdmAtomicValue) -> Option<&str> {
    match v {
        XdmAtomicValue::String(s) | XdmAtomicValue::AnyUri(s) | XdmAtomicValue::UntypedAtomic(s) => {
            Some(s)
        }
        _ => None,
    }
}

/// Hashable projection of an atomic value that agrees with
/// [`Comparator::equals_for_grouping`]: equal values have equal keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum KeyHash {
    Empty,
    Numeric(u64),
    Text(String),
    Boolean(bool),
    QName(Option<String>, String),
    Temporal(u8, i64, u32),
    Duration(u8, i64),
}

#[derive(Clone)]
pub struct Comparator {
    collation: Arc<dyn Collation>,
    implicit_timezone: FixedOffset,
}

impl Default for Comparator {
    fn default() -> Self {
        Self::new(Arc::new(CodepointCollation), chrono::Utc.fix())
    }
}

impl Comparator {
    pub fn new(collation: Arc<dyn Collation>, implicit_timezone: FixedOffset) -> Self {
        Self {
            collation,
            implicit_timezone,
        }
    }

    /// Same timezone, different collation (explicit `collation` of a spec).
    pub fn with_collation(&self, collation: Arc<dyn Collation>) -> Self {
        Self {
            collation,
            implicit_timezone: self.implicit_timezone,
        }
    }

    pub fn collation(&self) -> &Arc<dyn Collation> {
        &self.collation
    }

    pub fn implicit_timezone(&self) -> FixedOffset {
        self.implicit_timezone
    }

    fn type_error(a: &XdmAtomicValue, b: &XdmAtomicValue) -> Error {
        Error::from_code(
            ErrorCode::XPTY0004,
            format!(
                "cannot compare {} with {}",
                a.type_of().name(),
                b.type_of().name()
            ),
        )
    }

    /// (seconds, nanos) instant of a date/time value; no timezone means implicit timezone.
    fn instant(&self, v: &XdmAtomicValue) -> Option<(i64, u32)> {
        let to_pair = |naive: NaiveDateTime, tz: Option<FixedOffset>| {
            let tz = tz.unwrap_or(self.implicit_timezone);
            let utc = naive - chrono::Duration::seconds(i64::from(tz.local_minus_utc()));
            let stamp = utc.and_utc();
            (stamp.timestamp(), stamp.timestamp_subsec_nanos())
        };
        match v {
            XdmAtomicValue::DateTime(dt) => Some((dt.timestamp(), dt.timestamp_subsec_nanos())),
            XdmAtomicValue::Date { date, tz } => Some(to_pair(date.and_time(NaiveTime::MIN), *tz)),
            XdmAtomicValue::Time { time, tz } => {
                let base = NaiveDate::from_ymd_opt(1972, 12, 31)?;
                Some(to_pair(base.and_time(*time), *tz))
            }
            _ => None,
        }
    }

    /// Ordering used by `order by`, `min`/`max` and relational operators.
    /// Untyped values are treated as strings. NaN is `Incomparable`; values of
    /// unrelated families (and QNames) raise `XPTY0004`.
    pub fn compare_for_ordering(
        &self,
        a: &XdmAtomicValue,
        b: &XdmAtomicValue,
    ) -> Result<ValueOrder, Error> {
        use XdmAtomicValue as V;
        let (fa, fb) = (family(a), family(b));
        if fa != fb {
            return Err(Self::type_error(a, b));
        }
        Ok(match fa {
            Family::Numeric => {
                let (Some(x), Some(y)) = (classify(a), classify(b)) else {
                    return Err(Self::type_error(a, b));
                };
                compare_numeric(x, y)
            }
            Family::Text => match (text_of(a), text_of(b)) {
                (Some(x), Some(y)) => self.collation.compare(x, y).into(),
                _ => return Err(Self::type_error(a, b)),
            },
            Family::Boolean => match (a, b) {
                (V::Boolean(x), V::Boolean(y)) => x.cmp(y).into(),
                _ => return Err(Self::type_error(a, b)),
            },
            Family::QName => {
                return Err(Error::from_code(
                    ErrorCode::XPTY0004,
                    "xs:QName values have no ordering",
                ));
            }
            Family::DateTime | Family::Date | Family::Time => {
                match (self.instant(a), self.instant(b)) {
                    (Some(x), Some(y)) => x.cmp(&y).into(),
                    _ => return Err(Self::type_error(a, b)),
                }
            }
            Family::YearMonth | Family::DayTime => match (a, b) {
                (V::YearMonthDuration(x), V::YearMonthDuration(y)) => x.cmp(y).into(),
                (V::DayTimeDuration(x), V::DayTimeDuration(y)) => x.cmp(y).into(),
                _ => return Err(Self::type_error(a, b)),
            },
        })
    }

    /// Equality used for `group by` partitioning: untyped compares as string,
    /// NaN equals NaN, QNames compare by expanded name.
    pub fn equals_for_grouping(
        &self,
        a: &XdmAtomicValue,
        b: &XdmAtomicValue,
    ) -> Result<bool, Error> {
        if a.is_nan() && b.is_nan() {
            return Ok(true);
        }
        if let (
            XdmAtomicValue::QName {
                ns_uri: na,
                local: la,
                ..
            },
            XdmAtomicValue::QName {
                ns_uri: nb,
                local: lb,
                ..
            },
        ) = (a, b)
        {
            return Ok(na == nb && la == lb);
        }
        Ok(self.compare_for_ordering(a, b)? == ValueOrder::Equal)
    }

    /// Switch-case matching: grouping equality where a type error means "no match".
    pub fn equals_for_switch(&self, a: &XdmAtomicValue, b: &XdmAtomicValue) -> bool {
        self.equals_for_grouping(a, b).unwrap_or(false)
    }

    /// Value comparison (`eq ne lt le gt ge`) of two singletons.
    pub fn value_compare(
        &self,
        op: ComparisonOp,
        a: &XdmAtomicValue,
        b: &XdmAtomicValue,
    ) -> Result<bool, Error> {
        if matches!(op, ComparisonOp::Eq | ComparisonOp::Ne)
            && family(a) == Family::QName
            && family(b) == Family::QName
        {
            let eq = self.equals_for_grouping(a, b)?;
            return Ok(eq == (op == ComparisonOp::Eq));
        }
        let ord = self.compare_for_ordering(a, b)?;
        Ok(match (op, ord) {
            (ComparisonOp::Ne, ValueOrder::Incomparable) => true,
            (_, ValueOrder::Incomparable) => false,
            (ComparisonOp::Eq, o) => o == ValueOrder::Equal,
            (ComparisonOp::Ne, o) => o != ValueOrder::Equal,
            (ComparisonOp::Lt, o) => o == ValueOrder::Less,
            (ComparisonOp::Le, o) => o != ValueOrder::Greater,
            (ComparisonOp::Gt, o) => o == ValueOrder::Greater,
            (ComparisonOp::Ge, o) => o != ValueOrder::Less,
        })
    }

    /// One pair of a general comparison (`= != < <= > >=`). An untyped
    /// operand is cast to the type of the other operand (numbers as
    /// `xs:double`); two untyped operands compare as strings.
    pub fn general_compare(
        &self,
        op: ComparisonOp,
        a: &XdmAtomicValue,
        b: &XdmAtomicValue,
    ) -> Result<bool, Error> {
        let (a, b) = self.coerce_untyped(a, b)?;
        self.value_compare(op, &a, &b)
    }

    fn coerce_untyped(
        &self,
        a: &XdmAtomicValue,
        b: &XdmAtomicValue,
    ) -> Result<(XdmAtomicValue, XdmAtomicValue), Error> {
        use XdmAtomicValue as V;
        let coerce = |s: &str, other: &XdmAtomicValue| -> Result<XdmAtomicValue, Error> {
            match other {
                V::UntypedAtomic(_) | V::String(_) | V::AnyUri(_) => Ok(V::String(s.to_string())),
                o if o.is_numeric() => parse_double(s).map(V::Double),
                o => cast_atomic(&V::UntypedAtomic(s.to_string()), o.type_of(), self.implicit_timezone),
            }
        };
        Ok(match (a, b) {
            (V::UntypedAtomic(x), V::UntypedAtomic(y)) => (V::String(x.clone()), V::String(y.clone())),
            (V::UntypedAtomic(x), other) => (coerce(x, other)?, other.clone()),
            (other, V::UntypedAtomic(y)) => (other.clone(), coerce(y, other)?),
            _ => (a.clone(), b.clone()),
        })
    }

    /// Bucket key for hash partitioning. Values of different families get
    /// different keys and are therefore never compared with each other.
    pub(crate) fn grouping_hash(&self, v: &XdmAtomicValue) -> KeyHash {
        use XdmAtomicValue as V;
        match v {
            V::Integer(_) | V::Decimal(_) | V::Double(_) | V::Float(_) => {
                let d = classify(v).map_or(f64::NAN, NumKind::to_f64);
                let bits = if d.is_nan() {
                    f64::NAN.to_bits()
                } else if d == 0.0 {
                    0.0f64.to_bits()
                } else {
                    d.to_bits()
                };
                KeyHash::Numeric(bits)
            }
            V::String(s) | V::AnyUri(s) | V::UntypedAtomic(s) => KeyHash::Text(self.collation.key(s)),
            V::Boolean(b) => KeyHash::Boolean(*b),
            V::QName { ns_uri, local, .. } => KeyHash::QName(ns_uri.clone(), local.clone()),
            V::DateTime(_) | V::Date { .. } | V::Time { .. } => {
                let tag = match family(v) {
                    Family::DateTime => 0,
                    Family::Date => 1,
                    _ => 2,
                };
                let (s, n) = self.instant(v).unwrap_or((0, 0));
                KeyHash::Temporal(tag, s, n)
            }
            V::YearMonthDuration(m) => KeyHash::Duration(0, i64::from(*m)),
            V::DayTimeDuration(s) => KeyHash::Duration(1, *s),
        }
    }
}

fn compare_numeric(x: NumKind, y: NumKind) -> ValueOrder {
    if x.is_nan() || y.is_nan() {
        return ValueOrder::Incomparable;
    }
    match unify_numeric(x, y) {
        (NumKind::Int(a), NumKind::Int(b)) => a.cmp(&b).into(),
        (NumKind::Dec(a), NumKind::Dec(b)) => a.cmp(&b).into(),
        (a, b) => a
            .to_f64()
            .partial_cmp(&b.to_f64())
            .map_or(ValueOrder::Incomparable, ValueOrder::from),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::collation::SimpleCaseCollation;
    use rstest::rstest;
    use rust_decimal::Decimal;

    fn s(v: &str) -> XdmAtomicValue {
        XdmAtomicValue::String(v.into())
    }
    fn u(v: &str) -> XdmAtomicValue {
        XdmAtomicValue::UntypedAtomic(v.into())
    }

    #[rstest]
    #[case(XdmAtomicValue::Integer(1), XdmAtomicValue::Double(1.0), ValueOrder::Equal)]
    #[case(XdmAtomicValue::Integer(2), XdmAtomicValue::Decimal(Decimal::new(25, 1)), ValueOrder::Less)]
    #[case(XdmAtomicValue::Double(f64::NAN), XdmAtomicValue::Integer(1), ValueOrder::Incomparable)]
    #[case(s("b"), u("a"), ValueOrder::Greater)]
    #[case(XdmAtomicValue::Boolean(false), XdmAtomicValue::Boolean(true), ValueOrder::Less)]
    fn ordering(#[case] a: XdmAtomicValue, #[case] b: XdmAtomicValue, #[case] expected: ValueOrder) {
        assert_eq!(Comparator::default().compare_for_ordering(&a, &b).unwrap(), expected);
    }

    #[rstest]
    fn incomparable_families_raise_type_error() {
        let c = Comparator::default();
        let err = c
            .compare_for_ordering(&XdmAtomicValue::Integer(1), &s("1"))
            .unwrap_err();
        assert_eq!(err.code_enum(), ErrorCode::XPTY0004);
        let qn = XdmAtomicValue::QName {
            ns_uri: None,
            prefix: None,
            local: "a".into(),
        };
        assert!(c.compare_for_ordering(&qn, &qn).is_err());
        assert!(c.equals_for_grouping(&qn, &qn).unwrap());
    }

    #[rstest]
    fn nan_groups_with_nan() {
        let c = Comparator::default();
        let nan = XdmAtomicValue::Double(f64::NAN);
        assert!(c.equals_for_grouping(&nan, &XdmAtomicValue::Float(f32::NAN)).unwrap());
        assert!(!c.value_compare(ComparisonOp::Eq, &nan, &nan).unwrap());
        assert!(c.value_compare(ComparisonOp::Ne, &nan, &nan).unwrap());
        assert_eq!(c.grouping_hash(&nan), c.grouping_hash(&XdmAtomicValue::Float(f32::NAN)));
    }

    #[rstest]
    fn switch_equality_swallows_type_errors() {
        let c = Comparator::default();
        assert!(!c.equals_for_switch(&XdmAtomicValue::Integer(1), &s("1")));
        assert!(c.equals_for_switch(&u("x"), &s("x")));
    }

    #[rstest]
    #[case(ComparisonOp::Eq, u("1.0"), XdmAtomicValue::Integer(1), true)]
    #[case(ComparisonOp::Lt, u("10"), XdmAtomicValue::Integer(9), false)]
    #[case(ComparisonOp::Lt, u("10"), u("9"), true)]
    #[case(ComparisonOp::Eq, u("true"), XdmAtomicValue::Boolean(true), true)]
    fn general_comparison_coerces_untyped(
        #[case] op: ComparisonOp,
        #[case] a: XdmAtomicValue,
        #[case] b: XdmAtomicValue,
        #[case] expected: bool,
    ) {
        assert_eq!(Comparator::default().general_compare(op, &a, &b).unwrap(), expected);
    }

    #[rstest]
    fn general_comparison_failed_cast_is_forg0001() {
        let err = Comparator::default()
            .general_compare(ComparisonOp::Eq, &u("abc"), &XdmAtomicValue::Integer(1))
            .unwrap_err();
        assert_eq!(err.code_enum(), ErrorCode::FORG0001);
    }

    #[rstest]
    fn value_comparison_treats_untyped_as_string() {
        let err = Comparator::default()
            .value_compare(ComparisonOp::Eq, &u("1"), &XdmAtomicValue::Integer(1))
            .unwrap_err();
        assert_eq!(err.code_enum(), ErrorCode::XPTY0004);
    }

    #[rstest]
    fn collation_drives_text_equality_and_hash() {
        let c = Comparator::default().with_collation(Arc::new(SimpleCaseCollation));
        assert!(c.equals_for_grouping(&s("ABC"), &s("abc")).unwrap());
        assert_eq!(c.grouping_hash(&s("ABC")), c.grouping_hash(&u("abc")));
    }

    #[rstest]
    fn dates_compare_by_instant() {
        let c = Comparator::default();
        let a = XdmAtomicValue::Date {
            date: NaiveDate::from_ymd_opt(2004, 1, 1).unwrap(),
            tz: FixedOffset::east_opt(3600),
        };
        let b = XdmAtomicValue::Date {
            date: NaiveDate::from_ymd_opt(2004, 1, 1).unwrap(),
            tz: None,
        };
        assert_eq!(c.compare_for_ordering(&a, &b).unwrap(), ValueOrder::Less);
    }
}
