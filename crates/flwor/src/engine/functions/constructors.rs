use super::common::{atomic_seq, opt_atomic, string_arg};
use crate::engine::casting::cast_atomic;
use crate::engine::runtime::{CallCtx, Error, ErrorCode};
use crate::model::XdmNode;
use crate::xdm::{AtomicType, XdmAtomicValue, XdmSequence};

/// Types with an `xs:*` constructor function.
pub(super) const CONSTRUCTIBLE: [AtomicType; 13] = [
    AtomicType::String,
    AtomicType::Boolean,
    AtomicType::Integer,
    AtomicType::Decimal,
    AtomicType::Double,
    AtomicType::Float,
    AtomicType::AnyUri,
    AtomicType::UntypedAtomic,
    AtomicType::DateTime,
    AtomicType::Date,
    AtomicType::Time,
    AtomicType::YearMonthDuration,
    AtomicType::DayTimeDuration,
];

/// Local name of the constructor, e.g. `integer` for `xs:integer`.
pub(super) fn local_name(ty: AtomicType) -> &'static str {
    let name = ty.name();
    name.strip_prefix("xs:").unwrap_or(name)
}

/// Body of `xs:T($arg)`: empty in, empty out; otherwise `$arg cast as T`.
pub(super) fn construct<N: XdmNode>(
    ctx: &CallCtx<N>,
    args: &[XdmSequence<N>],
    target: AtomicType,
) -> Result<XdmSequence<N>, Error> {
    let Some(v) = opt_atomic(&args[0], target.name())? else {
        return Ok(Vec::new());
    };
    Ok(atomic_seq(Some(cast_atomic(&v, target, ctx.implicit_timezone)?)))
}

/// `fn:QName($uri, $lexical)`.
pub(super) fn qname_fn<N: XdmNode>(
    _ctx: &CallCtx<N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let uri = string_arg(&args[0], "QName namespace")?;
    let lexical = string_arg(&args[1], "QName lexical")?;
    let (prefix, local) = match lexical.split_once(':') {
        Some((p, l)) => (Some(p.to_string()), l.to_string()),
        None => (None, lexical.clone()),
    };
    let is_ncname = |s: &str| {
        let mut chars = s.chars();
        chars
            .next()
            .is_some_and(|c| c.is_alphabetic() || c == '_')
            && chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
    };
    if !is_ncname(&local) || prefix.as_deref().is_some_and(|p| !is_ncname(p)) {
        return Err(Error::from_code(
            ErrorCode::FORG0001,
            format!("invalid lexical QName {lexical:?}"),
        ));
    }
    if uri.is_empty() && prefix.is_some() {
        return Err(Error::from_code(
            ErrorCode::FORG0001,
            format!("prefixed QName {lexical:?} needs a namespace URI"),
        ));
    }
    Ok(atomic_seq(Some(XdmAtomicValue::QName {
        ns_uri: (!uri.is_empty()).then_some(uri),
        prefix,
        local,
    })))
}
