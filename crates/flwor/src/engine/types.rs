//! Sequence-type matching for `instance of`, typeswitch cases and the `as`
//! declarations of variables and clause bindings.
//!
//! Matching is structural: no function conversion rules are applied, so
//! `1 instance of xs:double` is false and `let $x as xs:double := 1` fails.

use crate::ast::Occurrence;
use crate::compiler::ir::{ItemTypeIR, SeqTypeIR};
use crate::engine::runtime::{Error, ErrorCode};
use crate::model::XdmNode;
use crate::xdm::XdmItem;

pub fn matches_item<N: XdmNode>(item: &XdmItem<N>, ty: &ItemTypeIR) -> bool {
    match (ty, item) {
        (ItemTypeIR::AnyItem, _) => true,
        (ItemTypeIR::Atomic(t), XdmItem::Atomic(v)) => v.type_of().derives_from(*t),
        (ItemTypeIR::AnyNode, XdmItem::Node(_)) => true,
        (ItemTypeIR::Kind { kind, name }, XdmItem::Node(n)) => {
            if n.kind() != *kind {
                return false;
            }
            match name {
                None => true,
                Some(want) => n
                    .name()
                    .is_some_and(|q| q.local == want.local && q.ns_uri == want.ns_uri),
            }
        }
        (ItemTypeIR::AnyFunction, XdmItem::Function(_)) => true,
        _ => false,
    }
}

pub fn matches_seq<N: XdmNode>(seq: &[XdmItem<N>], ty: &SeqTypeIR) -> bool {
    match ty {
        SeqTypeIR::EmptySequence => seq.is_empty(),
        SeqTypeIR::Typed { item, occ } => {
            let count_ok = match occ {
                Occurrence::One => seq.len() == 1,
                Occurrence::ZeroOrOne => seq.len() <= 1,
                Occurrence::ZeroOrMore => true,
                Occurrence::OneOrMore => !seq.is_empty(),
            };
            count_ok && seq.iter().all(|i| matches_item(i, item))
        }
    }
}

pub fn describe(ty: &SeqTypeIR) -> String {
    match ty {
        SeqTypeIR::EmptySequence => "empty-sequence()".to_string(),
        SeqTypeIR::Typed { item, occ } => {
            let base = match item {
                ItemTypeIR::AnyItem => "item()".to_string(),
                ItemTypeIR::Atomic(t) => t.name().to_string(),
                ItemTypeIR::AnyNode => "node()".to_string(),
                ItemTypeIR::Kind { kind, name } => match name {
                    Some(n) => format!("{kind:?}({n})").to_lowercase(),
                    None => format!("{kind:?}()").to_lowercase(),
                },
                ItemTypeIR::AnyFunction => "function(*)".to_string(),
            };
            let suffix = match occ {
                Occurrence::One => "",
                Occurrence::ZeroOrOne => "?",
                Occurrence::ZeroOrMore => "*",
                Occurrence::OneOrMore => "+",
            };
            format!("{base}{suffix}")
        }
    }
}

/// `XPTY0004` unless `seq` matches `ty`; `what` names the checked binding.
pub fn check_seq<N: XdmNode>(seq: &[XdmItem<N>], ty: &SeqTypeIR, what: &str) -> Result<(), Error> {
    if matches_seq(seq, ty) {
        Ok(())
    } else {
        Err(Error::from_code(
            ErrorCode::XPTY0004,
            format!(
                "{what}: a sequence of {} item(s) does not match {}",
                seq.len(),
                describe(ty)
            ),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NodeKind;
    use crate::model::simple::{SimpleNode, elem};
    use crate::xdm::{AtomicType, ExpandedName, XdmAtomicValue};
    use rstest::rstest;

    type I = XdmItem<SimpleNode>;

    fn int(i: i64) -> I {
        XdmItem::Atomic(XdmAtomicValue::Integer(i))
    }

    fn typed(item: ItemTypeIR, occ: Occurrence) -> SeqTypeIR {
        SeqTypeIR::Typed { item, occ }
    }

    #[rstest]
    #[case(vec![], Occurrence::ZeroOrOne, true)]
    #[case(vec![], Occurrence::One, false)]
    #[case(vec![int(1), int(2)], Occurrence::ZeroOrMore, true)]
    #[case(vec![int(1), int(2)], Occurrence::ZeroOrOne, false)]
    #[case(vec![], Occurrence::OneOrMore, false)]
    fn occurrence_indicators(#[case] seq: Vec<I>, #[case] occ: Occurrence, #[case] expected: bool) {
        let ty = typed(ItemTypeIR::Atomic(AtomicType::Integer), occ);
        assert_eq!(matches_seq(&seq, &ty), expected);
    }

    #[rstest]
    fn integer_is_decimal_but_not_double() {
        let one = [int(1)];
        assert!(matches_seq(&one, &typed(ItemTypeIR::Atomic(AtomicType::Decimal), Occurrence::One)));
        assert!(matches_seq(&one, &typed(ItemTypeIR::Atomic(AtomicType::Numeric), Occurrence::One)));
        assert!(!matches_seq(&one, &typed(ItemTypeIR::Atomic(AtomicType::Double), Occurrence::One)));
    }

    #[rstest]
    fn element_name_test() {
        let e = elem("a").build();
        let items = [XdmItem::Node(e)];
        let named = |n: &str| ItemTypeIR::Kind {
            kind: NodeKind::Element,
            name: Some(ExpandedName::local(n)),
        };
        assert!(matches_seq(&items, &typed(named("a"), Occurrence::One)));
        assert!(!matches_seq(&items, &typed(named("b"), Occurrence::One)));
        assert!(!matches_seq(&items, &typed(ItemTypeIR::Atomic(AtomicType::AnyAtomic), Occurrence::One)));
    }

    #[rstest]
    fn check_reports_type_error() {
        let err = check_seq(&[int(1)], &SeqTypeIR::EmptySequence, "$x").unwrap_err();
        assert_eq!(err.code_enum(), ErrorCode::XPTY0004);
    }
}
