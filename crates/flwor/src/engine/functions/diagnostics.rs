use super::common::{item_string, opt_atomic, string_arg};
use crate::engine::runtime::{CallCtx, Error, ErrorCode};
use crate::model::XdmNode;
use crate::xdm::{ExpandedName, XdmAtomicValue, XdmSequence};
use tracing::debug;

/// `fn:error([$code[, $description[, $object]]])`. An empty code means `err:FOER0000`.
pub(super) fn error_fn<N: XdmNode>(
    _ctx: &CallCtx<N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let code = match args.first() {
        Some(seq) => match opt_atomic(seq, "error code")? {
            Some(XdmAtomicValue::QName { ns_uri, local, .. }) => Some(ExpandedName::new(ns_uri, local)),
            Some(other) => {
                return Err(Error::from_code(
                    ErrorCode::XPTY0004,
                    format!("error code must be an xs:QName, got {}", other.type_of().name()),
                ));
            }
            None => None,
        },
        None => None,
    };
    let message = match args.get(1) {
        Some(seq) => string_arg(seq, "error description")?,
        None => "error raised by fn:error".to_string(),
    };
    Err(match code {
        Some(qn) => Error::new_qname(qn, message),
        None => Error::from_code(ErrorCode::FOER0000, message),
    })
}

/// `fn:trace($value[, $label])`: logs the value and returns it unchanged.
pub(super) fn trace_fn<N: XdmNode>(
    _ctx: &CallCtx<N>,
    args: &[XdmSequence<N>],
) -> Result<XdmSequence<N>, Error> {
    let label = match args.get(1) {
        Some(seq) => string_arg(seq, "trace label")?,
        None => String::new(),
    };
    let rendered = args[0]
        .iter()
        .map(|i| item_string(i).unwrap_or_else(|_| i.to_string()))
        .collect::<Vec<_>>();
    debug!(label = %label, items = args[0].len(), value = ?rendered, "fn:trace");
    Ok(args[0].clone())
}
