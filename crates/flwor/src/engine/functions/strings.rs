use super::common::{
    atomic_seq, bool_seq, collation_arg, count_value, int_seq, item_string, opt_atomic,
    position_arg, string_arg, string_seq,
};
use crate::engine::runtime::{CallCtx, Error, ErrorCode};
use crate::model::XdmNode;
use crate::xdm::{XdmAtomicValue, XdmSequence};
use core::cmp::Ordering;
use itertools::Itertools;
use unicode_normalization::UnicodeNormalization;

pub(super) fn string_fn<N: XdmNode>(
    _ctx: &CallCtx<N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    match args[0].as_slice() {
        [] => Ok(string_seq("")),
        [item] => Ok(string_seq(item_string(item)?)),
        items => Err(Error::from_code(
            ErrorCode::XPTY0004,
            format!("string expects at most one item, got {}", items.len()),
        )),
    }
}

pub(super) fn concat_fn<N: XdmNode>(
    _ctx: &CallCtx<N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let mut out = String::new();
    for a in args {
        out.push_str(&string_arg(a, "concat")?);
    }
    Ok(string_seq(out))
}

pub(super) fn string_join_fn<N: XdmNode>(
    _ctx: &CallCtx<N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let sep = match args.get(1) {
        Some(s) => string_arg(s, "string-join separator")?,
        None => String::new(),
    };
    let parts = args[0]
        .iter()
        .map(item_string)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(string_seq(parts.iter().join(&sep)))
}

pub(super) fn string_length_fn<N: XdmNode>(
    _ctx: &CallCtx<N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let s = string_arg(&args[0], "string-length")?;
    Ok(int_seq(count_value(s.chars().count())))
}

pub(super) fn upper_case_fn<N: XdmNode>(
    _ctx: &CallCtx<N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    Ok(string_seq(string_arg(&args[0], "upper-case")?.to_uppercase()))
}

pub(super) fn lower_case_fn<N: XdmNode>(
    _ctx: &CallCtx<N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    Ok(string_seq(string_arg(&args[0], "lower-case")?.to_lowercase()))
}

pub(super) fn normalize_space_fn<N: XdmNode>(
    _ctx: &CallCtx<N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let s = string_arg(&args[0], "normalize-space")?;
    Ok(string_seq(s.split_ascii_whitespace().join(" ")))
}

/// `fn:normalize-unicode($arg[, $form])`; the form defaults to NFC.
pub(super) fn normalize_unicode_fn<N: XdmNode>(
    _ctx: &CallCtx<N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let s = string_arg(&args[0], "normalize-unicode")?;
    let form = match args.get(1) {
        Some(f) => string_arg(f, "normalization form")?.trim().to_uppercase(),
        None => "NFC".to_string(),
    };
    let out: String = match form.as_str() {
        "NFC" => s.nfc().collect(),
        "NFD" => s.nfd().collect(),
        "NFKC" => s.nfkc().collect(),
        "NFKD" => s.nfkd().collect(),
        "" => s,
        other => {
            return Err(Error::from_code(
                ErrorCode::FORG0001,
                format!("unsupported normalization form {other}"),
            ));
        }
    };
    Ok(string_seq(out))
}

/// Shared body of `contains`, `starts-with` and `ends-with`: both operands
/// are compared through the collation key.
fn key_predicate<N: XdmNode>(
    ctx: &CallCtx<N>,
    args: &[XdmSequence<N>],
    what: &str,
    test: fn(&str, &str) -> bool,
) -> Result<XdmSequence<N>, Error> {
    let s = string_arg(&args[0], what)?;
    let sub = string_arg(&args[1], what)?;
    let coll = collation_arg(ctx, args, 2)?;
    Ok(bool_seq(test(&coll.key(&s), &coll.key(&sub))))
}

pub(super) fn contains_fn<N: XdmNode>(
    ctx: &CallCtx<N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    key_predicate(ctx, args, "contains", |s, sub| s.contains(sub))
}

pub(super) fn starts_with_fn<N: XdmNode>(
    ctx: &CallCtx<N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    key_predicate(ctx, args, "starts-with", |s, sub| s.starts_with(sub))
}

pub(super) fn ends_with_fn<N: XdmNode>(
    ctx: &CallCtx<N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    key_predicate(ctx, args, "ends-with", |s, sub| s.ends_with(sub))
}

/// Characters at positions `p` with `round(start) <= p < round(start) + round(length)`.
pub(super) fn substring_fn<N: XdmNode>(
    _ctx: &CallCtx<N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let s = string_arg(&args[0], "substring")?;
    let start = position_arg(&args[1], "substring start")?;
    let end = match args.get(2) {
        Some(len) => start + position_arg(len, "substring length")?,
        None => f64::INFINITY,
    };
    let out: String = s
        .chars()
        .enumerate()
        .filter(|(i, _)| {
            let p = (i + 1) as f64;
            p >= start && p < end
        })
        .map(|(_, c)| c)
        .collect();
    Ok(string_seq(out))
}

/// `fn:compare`: -1, 0 or 1 under the collation; empty if either operand is empty.
pub(super) fn compare_fn<N: XdmNode>(
    ctx: &CallCtx<N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let (Some(a), Some(b)) = (
        opt_atomic(&args[0], "compare")?,
        opt_atomic(&args[1], "compare")?,
    ) else {
        return Ok(Vec::new());
    };
    let coll = collation_arg(ctx, args, 2)?;
    let ord = match coll.compare(&a.canonical_string(), &b.canonical_string()) {
        Ordering::Less => -1,
        Ordering::Equal => 0,
        Ordering::Greater => 1,
    };
    Ok(atomic_seq(Some(XdmAtomicValue::Integer(ord))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::common::with_test_ctx;
    use crate::engine::collation::SIMPLE_CASE_URI;
    use crate::model::simple::SimpleNode;
    use rstest::rstest;

    fn s(v: &str) -> XdmSequence<SimpleNode> {
        string_seq(v)
    }

    #[rstest]
    fn contains_honours_case_insensitive_collation() {
        let got = with_test_ctx(|ctx| contains_fn(ctx, &[s("Hello"), s("hELL"), s(SIMPLE_CASE_URI)]).unwrap());
        assert_eq!(got, bool_seq(true));
    }

    #[rstest]
    fn unknown_collation_is_reported() {
        let err = with_test_ctx(|ctx| contains_fn(ctx, &[s("a"), s("a"), s("urn:nope")]).unwrap_err());
        assert_eq!(err.code_enum(), ErrorCode::FOCH0002);
    }

    #[rstest]
    #[case("motor car", 6.0, None, " car")]
    #[case("metadata", 4.0, Some(3.0), "ada")]
    #[case("12345", 1.5, Some(2.6), "234")]
    fn substring_rounds_positions(
        #[case] input: &str,
        #[case] start: f64,
        #[case] len: Option<f64>,
        #[case] expected: &str,
    ) {
        let mut args = vec![s(input), atomic_seq(Some(XdmAtomicValue::Double(start)))];
        if let Some(l) = len {
            args.push(atomic_seq(Some(XdmAtomicValue::Double(l))));
        }
        let got = with_test_ctx(|ctx| substring_fn(ctx, &args).unwrap());
        assert_eq!(got, s(expected));
    }

    #[rstest]
    fn string_join_uses_separator() {
        let items: XdmSequence<SimpleNode> = vec![
            XdmAtomicValue::Integer(1).into(),
            XdmAtomicValue::String("b".into()).into(),
        ];
        let got = with_test_ctx(|ctx| string_join_fn(ctx, &[items, s("-")]).unwrap());
        assert_eq!(got, s("1-b"));
    }

    #[rstest]
    fn normalize_space_collapses_whitespace() {
        let got = with_test_ctx(|ctx| normalize_space_fn(ctx, &[s("  a \t b\n")]).unwrap());
        assert_eq!(got, s("a b"));
    }
}
