use crate::compiler::ir::{IrExpr, Slot};
use crate::engine::env::Tuple;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime};
use core::fmt;
use rust_decimal::Decimal;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExpandedName {
    pub ns_uri: Option<String>,
    pub local: String,
}

impl ExpandedName {
    pub fn new(ns_uri: Option<String>, local: impl Into<String>) -> Self {
        Self {
            ns_uri,
            local: local.into(),
        }
    }

    /// Name without namespace, e.g. a variable `$x`.
    pub fn local(local: impl Into<String>) -> Self {
        Self::new(None, local)
    }
}

impl fmt::Display for ExpandedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.ns_uri {
            Some(ns) => write!(f, "Q{{{}}}{}", ns, self.local),
            None => f.write_str(&self.local),
        }
    }
}

/// Atomic values understood by the evaluator.
///
/// Durations are stored canonically: year-month durations as total months,
/// day-time durations as total seconds (both may be negative).
#[derive(Debug, Clone, PartialEq)]
pub enum XdmAtomicValue {
    Boolean(bool),
    String(String),
    Integer(i64),
    Decimal(Decimal),
    Double(f64),
    Float(f32),
    AnyUri(String),
    QName {
        ns_uri: Option<String>,
        prefix: Option<String>,
        local: String,
    },
    UntypedAtomic(String),
    DateTime(DateTime<FixedOffset>),
    Date {
        date: NaiveDate,
        tz: Option<FixedOffset>,
    },
    Time {
        time: NaiveTime,
        tz: Option<FixedOffset>,
    },
    YearMonthDuration(i32),
    DayTimeDuration(i64),
}

/// Atomic type names usable in sequence types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AtomicType {
    AnyAtomic,
    Numeric,
    String,
    Boolean,
    Integer,
    Decimal,
    Double,
    Float,
    AnyUri,
    QName,
    UntypedAtomic,
    DateTime,
    Date,
    Time,
    Duration,
    YearMonthDuration,
    DayTimeDuration,
}

impl AtomicType {
    pub fn name(&self) -> &'static str {
        match self {
            AtomicType::AnyAtomic => "xs:anyAtomicType",
            AtomicType::Numeric => "xs:numeric",
            AtomicType::String => "xs:string",
            AtomicType::Boolean => "xs:boolean",
            AtomicType::Integer => "xs:integer",
            AtomicType::Decimal => "xs:decimal",
            AtomicType::Double => "xs:double",
            AtomicType::Float => "xs:float",
            AtomicType::AnyUri => "xs:anyURI",
            AtomicType::QName => "xs:QName",
            AtomicType::UntypedAtomic => "xs:untypedAtomic",
            AtomicType::DateTime => "xs:dateTime",
            AtomicType::Date => "xs:date",
            AtomicType::Time => "xs:time",
            AtomicType::Duration => "xs:duration",
            AtomicType::YearMonthDuration => "xs:yearMonthDuration",
            AtomicType::DayTimeDuration => "xs:dayTimeDuration",
        }
    }

    /// Subtype-or-self test on the small hierarchy modeled here.
    pub fn derives_from(self, ancestor: AtomicType) -> bool {
        use AtomicType as T;
        if self == ancestor || ancestor == T::AnyAtomic {
            return true;
        }
        match ancestor {
            T::Decimal => self == T::Integer,
            T::Numeric => matches!(self, T::Integer | T::Decimal | T::Double | T::Float),
            T::Duration => matches!(self, T::YearMonthDuration | T::DayTimeDuration),
            _ => false,
        }
    }
}

impl XdmAtomicValue {
    pub fn type_of(&self) -> AtomicType {
        match self {
            XdmAtomicValue::Boolean(_) => AtomicType::Boolean,
            XdmAtomicValue::String(_) => AtomicType::String,
            XdmAtomicValue::Integer(_) => AtomicType::Integer,
            XdmAtomicValue::Decimal(_) => AtomicType::Decimal,
            XdmAtomicValue::Double(_) => AtomicType::Double,
            XdmAtomicValue::Float(_) => AtomicType::Float,
            XdmAtomicValue::AnyUri(_) => AtomicType::AnyUri,
            XdmAtomicValue::QName { .. } => AtomicType::QName,
            XdmAtomicValue::UntypedAtomic(_) => AtomicType::UntypedAtomic,
            XdmAtomicValue::DateTime(_) => AtomicType::DateTime,
            XdmAtomicValue::Date { .. } => AtomicType::Date,
            XdmAtomicValue::Time { .. } => AtomicType::Time,
            XdmAtomicValue::YearMonthDuration(_) => AtomicType::YearMonthDuration,
            XdmAtomicValue::DayTimeDuration(_) => AtomicType::DayTimeDuration,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            XdmAtomicValue::Integer(_)
                | XdmAtomicValue::Decimal(_)
                | XdmAtomicValue::Double(_)
                | XdmAtomicValue::Float(_)
        )
    }

    pub fn is_nan(&self) -> bool {
        match self {
            XdmAtomicValue::Double(d) => d.is_nan(),
            XdmAtomicValue::Float(f) => f.is_nan(),
            _ => false,
        }
    }

    /// Canonical lexical form (`fn:string`).
    pub fn canonical_string(&self) -> String {
        match self {
            XdmAtomicValue::Boolean(b) => b.to_string(),
            XdmAtomicValue::String(s)
            | XdmAtomicValue::AnyUri(s)
            | XdmAtomicValue::UntypedAtomic(s) => s.clone(),
            XdmAtomicValue::Integer(i) => i.to_string(),
            XdmAtomicValue::Decimal(d) => d.normalize().to_string(),
            XdmAtomicValue::Double(d) => format_double(*d),
            XdmAtomicValue::Float(f) => format_double(f64::from(*f)),
            XdmAtomicValue::QName { prefix, local, .. } => match prefix {
                Some(p) if !p.is_empty() => format!("{p}:{local}"),
                _ => local.clone(),
            },
            XdmAtomicValue::DateTime(dt) => {
                let base = dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string();
                format!("{base}{}", format_tz(Some(*dt.offset())))
            }
            XdmAtomicValue::Date { date, tz } => {
                format!("{}{}", date.format("%Y-%m-%d"), format_tz(*tz))
            }
            XdmAtomicValue::Time { time, tz } => {
                format!("{}{}", time.format("%H:%M:%S%.f"), format_tz(*tz))
            }
            XdmAtomicValue::YearMonthDuration(months) => format_year_month(*months),
            XdmAtomicValue::DayTimeDuration(secs) => format_day_time(*secs),
        }
    }
}

fn format_double(d: f64) -> String {
    if d.is_nan() {
        return "NaN".to_string();
    }
    if d.is_infinite() {
        return if d > 0.0 { "INF" } else { "-INF" }.to_string();
    }
    if d == 0.0 {
        return if d.is_sign_negative() { "-0" } else { "0" }.to_string();
    }
    let abs = d.abs();
    if (1e-6..1e6).contains(&abs) {
        return format!("{d}");
    }
    let s = format!("{d:E}");
    match s.split_once('E') {
        Some((mantissa, exp)) if !mantissa.contains('.') => format!("{mantissa}.0E{exp}"),
        _ => s,
    }
}

fn format_tz(tz: Option<FixedOffset>) -> String {
    match tz {
        None => String::new(),
        Some(off) if off.local_minus_utc() == 0 => "Z".to_string(),
        Some(off) => {
            let secs = off.local_minus_utc();
            let sign = if secs < 0 { '-' } else { '+' };
            let abs = secs.abs();
            format!("{sign}{:02}:{:02}", abs / 3600, (abs % 3600) / 60)
        }
    }
}

fn format_year_month(months: i32) -> String {
    if months == 0 {
        return "P0M".to_string();
    }
    let sign = if months < 0 { "-" } else { "" };
    let m = months.unsigned_abs();
    let (y, rest) = (m / 12, m % 12);
    let mut out = format!("{sign}P");
    if y > 0 {
        out.push_str(&format!("{y}Y"));
    }
    if rest > 0 {
        out.push_str(&format!("{rest}M"));
    }
    out
}

fn format_day_time(secs: i64) -> String {
    if secs == 0 {
        return "PT0S".to_string();
    }
    let sign = if secs < 0 { "-" } else { "" };
    let s = secs.unsigned_abs();
    let (d, h, m, sec) = (s / 86_400, (s % 86_400) / 3600, (s % 3600) / 60, s % 60);
    let mut out = format!("{sign}P");
    if d > 0 {
        out.push_str(&format!("{d}D"));
    }
    if h > 0 || m > 0 || sec > 0 {
        out.push('T');
        if h > 0 {
            out.push_str(&format!("{h}H"));
        }
        if m > 0 {
            out.push_str(&format!("{m}M"));
        }
        if sec > 0 {
            out.push_str(&format!("{sec}S"));
        }
    }
    out
}

/// Function value: either a reference to a registered function or an inline
/// function closing over the environment it was created in.
pub enum FunctionItem<N> {
    Named {
        name: ExpandedName,
        arity: usize,
    },
    Inline {
        params: Vec<Slot>,
        body: Rc<IrExpr>,
        captured: Tuple<N>,
    },
}

impl<N> FunctionItem<N> {
    pub fn arity(&self) -> usize {
        match self {
            FunctionItem::Named { arity, .. } => *arity,
            FunctionItem::Inline { params, .. } => params.len(),
        }
    }
}

impl<N> fmt::Debug for FunctionItem<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FunctionItem::Named { name, arity } => write!(f, "{name}#{arity}"),
            FunctionItem::Inline { params, .. } => write!(f, "function#{}", params.len()),
        }
    }
}

pub type XdmSequence<N> = Vec<XdmItem<N>>;

#[derive(Debug, Clone)]
pub enum XdmItem<N> {
    Node(N),
    Atomic(XdmAtomicValue),
    Function(Rc<FunctionItem<N>>),
}

impl<N: PartialEq> PartialEq for XdmItem<N> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (XdmItem::Node(a), XdmItem::Node(b)) => a == b,
            (XdmItem::Atomic(a), XdmItem::Atomic(b)) => a == b,
            (XdmItem::Function(a), XdmItem::Function(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl<N> From<XdmAtomicValue> for XdmItem<N> {
    fn from(v: XdmAtomicValue) -> Self {
        XdmItem::Atomic(v)
    }
}

impl<N> fmt::Display for XdmItem<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            XdmItem::Node(_) => write!(f, "<node>"),
            XdmItem::Atomic(a) => f.write_str(&a.canonical_string()),
            XdmItem::Function(func) => write!(f, "{func:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1.5, "1.5")]
    #[case(100.0, "100")]
    #[case(1e6, "1.0E6")]
    #[case(f64::NAN, "NaN")]
    #[case(f64::NEG_INFINITY, "-INF")]
    fn double_canonical_form(#[case] value: f64, #[case] expected: &str) {
        assert_eq!(XdmAtomicValue::Double(value).canonical_string(), expected);
    }

    #[rstest]
    fn durations_render_canonically() {
        assert_eq!(XdmAtomicValue::YearMonthDuration(14).canonical_string(), "P1Y2M");
        assert_eq!(XdmAtomicValue::DayTimeDuration(-90_061).canonical_string(), "-P1DT1H1M1S");
        assert_eq!(XdmAtomicValue::DayTimeDuration(0).canonical_string(), "PT0S");
    }

    #[rstest]
    fn integer_derives_from_numeric_and_decimal() {
        assert!(AtomicType::Integer.derives_from(AtomicType::Decimal));
        assert!(AtomicType::Integer.derives_from(AtomicType::Numeric));
        assert!(!AtomicType::Double.derives_from(AtomicType::Decimal));
    }
}
