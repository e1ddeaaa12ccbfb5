//! Casting between the atomic types of [`XdmAtomicValue`].
//!
//! Used by constructor functions (`xs:double(...)`), by general comparisons
//! (untyped operands take the type of the other side) and by arithmetic.

use crate::engine::runtime::{Error, ErrorCode};
use crate::xdm::{AtomicType, XdmAtomicValue};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use std::str::FromStr;

fn invalid(target: AtomicType, lexical: &str) -> Error {
    Error::from_code(
        ErrorCode::FORG0001,
        format!("cannot cast '{lexical}' to {}", target.name()),
    )
}

/// `xs:double` lexical space: decimal/exponent notation plus `INF`, `-INF`, `NaN`.
pub fn parse_double(s: &str) -> Result<f64, Error> {
    let t = s.trim();
    match t {
        "INF" | "+INF" => return Ok(f64::INFINITY),
        "-INF" => return Ok(f64::NEG_INFINITY),
        "NaN" => return Ok(f64::NAN),
        _ => {}
    }
    // Rust also accepts "inf"/"nan"/"infinity"; those are not valid here.
    let valid = !t.is_empty()
        && t
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'));
    if !valid {
        return Err(invalid(AtomicType::Double, s));
    }
    t.parse::<f64>().map_err(|_| invalid(AtomicType::Double, s))
}

fn parse_integer(s: &str) -> Result<i64, Error> {
    let t = s.trim();
    let digits = t.strip_prefix(['+', '-']).unwrap_or(t);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid(AtomicType::Integer, s));
    }
    t.parse::<i64>().map_err(|_| {
        Error::from_code(ErrorCode::FOAR0002, format!("integer out of range: {t}"))
    })
}

fn parse_decimal(s: &str) -> Result<Decimal, Error> {
    let t = s.trim();
    let body = t.strip_prefix(['+', '-']).unwrap_or(t);
    let valid = !body.is_empty()
        && body != "."
        && body.chars().all(|c| c.is_ascii_digit() || c == '.')
        && body.matches('.').count() <= 1;
    if !valid {
        return Err(invalid(AtomicType::Decimal, s));
    }
    Decimal::from_str(t).map_err(|_| invalid(AtomicType::Decimal, s))
}

fn parse_boolean(s: &str) -> Result<bool, Error> {
    match s.trim() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(invalid(AtomicType::Boolean, s)),
    }
}

/// Splits an optional trailing timezone (`Z`, `+hh:mm`, `-hh:mm`).
fn split_tz(s: &str) -> Result<(&str, Option<FixedOffset>), ()> {
    if let Some(body) = s.strip_suffix('Z') {
        return Ok((body, FixedOffset::east_opt(0)));
    }
    let split = s.len().saturating_sub(6);
    if split > 0 && s.is_char_boundary(split) && s[split..].is_ascii() {
        let (body, tail) = s.split_at(split);
        let bytes = tail.as_bytes();
        if (bytes[0] == b'+' || bytes[0] == b'-') && bytes[3] == b':' {
            let hours: i32 = tail[1..3].parse().map_err(|_| ())?;
            let mins: i32 = tail[4..6].parse().map_err(|_| ())?;
            if hours > 14 || mins > 59 {
                return Err(());
            }
            let secs = (hours * 3600 + mins * 60) * if bytes[0] == b'-' { -1 } else { 1 };
            return Ok((body, Some(FixedOffset::east_opt(secs).ok_or(())?)));
        }
    }
    Ok((s, None))
}

pub fn parse_date(s: &str) -> Result<(NaiveDate, Option<FixedOffset>), Error> {
    let t = s.trim();
    let (body, tz) = split_tz(t).map_err(|()| invalid(AtomicType::Date, s))?;
    let date = NaiveDate::parse_from_str(body, "%Y-%m-%d").map_err(|_| invalid(AtomicType::Date, s))?;
    Ok((date, tz))
}

pub fn parse_time(s: &str) -> Result<(NaiveTime, Option<FixedOffset>), Error> {
    let t = s.trim();
    let (body, tz) = split_tz(t).map_err(|()| invalid(AtomicType::Time, s))?;
    let time = NaiveTime::parse_from_str(body, "%H:%M:%S%.f").map_err(|_| invalid(AtomicType::Time, s))?;
    Ok((time, tz))
}

/// Values without a timezone are placed in `implicit_tz`.
pub fn parse_date_time(s: &str, implicit_tz: FixedOffset) -> Result<DateTime<FixedOffset>, Error> {
    let t = s.trim();
    let (body, tz) = split_tz(t).map_err(|()| invalid(AtomicType::DateTime, s))?;
    let naive = NaiveDateTime::parse_from_str(body, "%Y-%m-%dT%H:%M:%S%.f")
        .map_err(|_| invalid(AtomicType::DateTime, s))?;
    naive
        .and_local_timezone(tz.unwrap_or(implicit_tz))
        .single()
        .ok_or_else(|| invalid(AtomicType::DateTime, s))
}

/// Parses `[-]PnYnM` into total months.
pub fn parse_year_month_duration(s: &str) -> Result<i32, Error> {
    let fail = || invalid(AtomicType::YearMonthDuration, s);
    let t = s.trim();
    let (neg, body) = match t.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, t),
    };
    let body = body.strip_prefix('P').ok_or_else(fail)?;
    if body.is_empty() || body.contains('T') {
        return Err(fail());
    }
    let mut months: i64 = 0;
    let mut num = String::new();
    for c in body.chars() {
        match c {
            '0'..='9' => num.push(c),
            'Y' | 'M' => {
                let n: i64 = num.parse().map_err(|_| fail())?;
                num.clear();
                months += if c == 'Y' { n * 12 } else { n };
            }
            _ => return Err(fail()),
        }
    }
    if !num.is_empty() {
        return Err(fail());
    }
    let months = i32::try_from(months).map_err(|_| fail())?;
    Ok(if neg { -months } else { months })
}

/// Parses `[-]PnDTnHnMnS` into total seconds; fractional seconds are truncated.
pub fn parse_day_time_duration(s: &str) -> Result<i64, Error> {
    let fail = || invalid(AtomicType::DayTimeDuration, s);
    let t = s.trim();
    let (neg, body) = match t.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, t),
    };
    let body = body.strip_prefix('P').ok_or_else(fail)?;
    if body.is_empty() || body.ends_with('T') {
        return Err(fail());
    }
    let mut secs: i64 = 0;
    let mut num = String::new();
    let mut in_time = false;
    for c in body.chars() {
        match c {
            '0'..='9' | '.' => num.push(c),
            'T' => in_time = true,
            'D' if !in_time => {
                secs += num.parse::<i64>().map_err(|_| fail())? * 86_400;
                num.clear();
            }
            'H' | 'M' if in_time => {
                let n = num.parse::<i64>().map_err(|_| fail())?;
                secs += if c == 'H' { n * 3600 } else { n * 60 };
                num.clear();
            }
            'S' if in_time => {
                let n = num.parse::<f64>().map_err(|_| fail())?;
                secs += n.trunc() as i64;
                num.clear();
            }
            _ => return Err(fail()),
        }
    }
    if !num.is_empty() {
        return Err(fail());
    }
    Ok(if neg { -secs } else { secs })
}

fn numeric_to_double(v: &XdmAtomicValue) -> Option<f64> {
    match v {
        XdmAtomicValue::Integer(i) => Some(*i as f64),
        XdmAtomicValue::Decimal(d) => d.to_f64(),
        XdmAtomicValue::Float(f) => Some(f64::from(*f)),
        XdmAtomicValue::Double(d) => Some(*d),
        XdmAtomicValue::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

fn is_string_like(v: &XdmAtomicValue) -> Option<&str> {
    match v {
        XdmAtomicValue::String(s) | XdmAtomicValue::UntypedAtomic(s) => Some(s),
        _ => None,
    }
}

/// Casts `v` to `target`. Lexical failures raise `FORG0001`; casts between
/// unrelated type families raise `XPTY0004`.
pub fn cast_atomic(
    v: &XdmAtomicValue,
    target: AtomicType,
    implicit_tz: FixedOffset,
) -> Result<XdmAtomicValue, Error> {
    use XdmAtomicValue as V;
    if v.type_of() == target || matches!(target, AtomicType::AnyAtomic) {
        return Ok(v.clone());
    }
    let unrelated = || {
        Error::from_code(
            ErrorCode::XPTY0004,
            format!("cannot cast {} to {}", v.type_of().name(), target.name()),
        )
    };
    let text = is_string_like(v);
    Ok(match target {
        AtomicType::String => V::String(v.canonical_string()),
        AtomicType::UntypedAtomic => V::UntypedAtomic(v.canonical_string()),
        AtomicType::AnyUri => match text {
            Some(s) => V::AnyUri(s.trim().to_string()),
            None => return Err(unrelated()),
        },
        AtomicType::Boolean => match text {
            Some(s) => V::Boolean(parse_boolean(s)?),
            None => V::Boolean(match numeric_to_double(v) {
                Some(d) => d != 0.0 && !d.is_nan(),
                None => return Err(unrelated()),
            }),
        },
        AtomicType::Double | AtomicType::Numeric => match text {
            Some(s) => V::Double(parse_double(s)?),
            None => V::Double(numeric_to_double(v).ok_or_else(unrelated)?),
        },
        AtomicType::Float => match text {
            Some(s) => V::Float(parse_double(s)? as f32),
            None => V::Float(numeric_to_double(v).ok_or_else(unrelated)? as f32),
        },
        AtomicType::Decimal => match (text, v) {
            (Some(s), _) => V::Decimal(parse_decimal(s)?),
            (None, V::Integer(i)) => V::Decimal(Decimal::from(*i)),
            (None, V::Boolean(b)) => V::Decimal(Decimal::from(i64::from(*b))),
            (None, _) => {
                let d = numeric_to_double(v).ok_or_else(unrelated)?;
                V::Decimal(
                    Decimal::from_f64(d)
                        .ok_or_else(|| invalid(AtomicType::Decimal, &v.canonical_string()))?,
                )
            }
        },
        AtomicType::Integer => match (text, v) {
            (Some(s), _) => V::Integer(parse_integer(s)?),
            (None, V::Decimal(d)) => V::Integer(
                d.trunc()
                    .to_i64()
                    .ok_or_else(|| Error::from_code(ErrorCode::FOAR0002, "integer overflow"))?,
            ),
            (None, V::Boolean(b)) => V::Integer(i64::from(*b)),
            (None, _) => {
                let d = numeric_to_double(v).ok_or_else(unrelated)?;
                if !d.is_finite() {
                    return Err(invalid(AtomicType::Integer, &v.canonical_string()));
                }
                V::Integer(d.trunc() as i64)
            }
        },
        AtomicType::Date => match (text, v) {
            (Some(s), _) => {
                let (date, tz) = parse_date(s)?;
                V::Date { date, tz }
            }
            (None, V::DateTime(dt)) => V::Date {
                date: dt.date_naive(),
                tz: Some(*dt.offset()),
            },
            _ => return Err(unrelated()),
        },
        AtomicType::Time => match (text, v) {
            (Some(s), _) => {
                let (time, tz) = parse_time(s)?;
                V::Time { time, tz }
            }
            (None, V::DateTime(dt)) => V::Time {
                time: dt.time(),
                tz: Some(*dt.offset()),
            },
            _ => return Err(unrelated()),
        },
        AtomicType::DateTime => match text {
            Some(s) => V::DateTime(parse_date_time(s, implicit_tz)?),
            None => return Err(unrelated()),
        },
        AtomicType::YearMonthDuration => match text {
            Some(s) => V::YearMonthDuration(parse_year_month_duration(s)?),
            None => return Err(unrelated()),
        },
        AtomicType::DayTimeDuration | AtomicType::Duration => match text {
            Some(s) => V::DayTimeDuration(parse_day_time_duration(s)?),
            None => return Err(unrelated()),
        },
        AtomicType::QName | AtomicType::AnyAtomic => return Err(unrelated()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    #[rstest]
    #[case("1.5e2", 150.0)]
    #[case(" 42 ", 42.0)]
    #[case("-INF", f64::NEG_INFINITY)]
    fn doubles_parse(#[case] s: &str, #[case] expected: f64) {
        assert_eq!(parse_double(s).unwrap(), expected);
    }

    #[rstest]
    #[case("inf")]
    #[case("abc")]
    #[case("")]
    fn invalid_doubles_are_forg0001(#[case] s: &str) {
        assert_eq!(parse_double(s).unwrap_err().code_enum(), ErrorCode::FORG0001);
    }

    #[rstest]
    #[case("P1Y2M", 14)]
    #[case("-P3M", -3)]
    fn year_month_durations(#[case] s: &str, #[case] months: i32) {
        assert_eq!(parse_year_month_duration(s).unwrap(), months);
    }

    #[rstest]
    #[case("P1DT1H", 90_000)]
    #[case("PT1.9S", 1)]
    #[case("-PT2M", -120)]
    fn day_time_durations(#[case] s: &str, #[case] secs: i64) {
        assert_eq!(parse_day_time_duration(s).unwrap(), secs);
    }

    #[rstest]
    fn untyped_casts_to_date_with_timezone() {
        let v = cast_atomic(
            &XdmAtomicValue::UntypedAtomic("2004-03-05+01:00".into()),
            AtomicType::Date,
            utc(),
        )
        .unwrap();
        assert_eq!(v.canonical_string(), "2004-03-05+01:00");
    }

    #[rstest]
    #[case("a€€x", AtomicType::Date)]
    #[case("€€€", AtomicType::Date)]
    #[case("12:00:00€+01", AtomicType::Time)]
    #[case("2004-03-05T00:00:00+0€", AtomicType::DateTime)]
    fn multibyte_text_near_timezone_is_forg0001(#[case] s: &str, #[case] target: AtomicType) {
        let err = cast_atomic(&XdmAtomicValue::String(s.into()), target, utc()).unwrap_err();
        assert_eq!(err.code_enum(), ErrorCode::FORG0001);
    }

    #[rstest]
    fn boolean_to_date_is_type_error() {
        let err = cast_atomic(&XdmAtomicValue::Boolean(true), AtomicType::Date, utc()).unwrap_err();
        assert_eq!(err.code_enum(), ErrorCode::XPTY0004);
    }
}
