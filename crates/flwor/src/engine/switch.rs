//! Case selection for `switch` and `typeswitch`.
//!
//! The matchers only pick a branch. Case values are requested through a
//! callback one at a time, so a case that is never reached is never
//! evaluated, and the selected branch is evaluated by the caller.

use crate::compiler::ir::TypeswitchCaseIR;
use crate::engine::comparison::Comparator;
use crate::engine::runtime::{Error, ErrorCode};
use crate::engine::types::matches_seq;
use crate::model::XdmNode;
use crate::xdm::{XdmAtomicValue, XdmItem};

/// Outcome of case selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selected {
    Case(usize),
    Default,
}

fn at_most_one(mut values: Vec<XdmAtomicValue>, what: &str) -> Result<Option<XdmAtomicValue>, Error> {
    match values.len() {
        0 => Ok(None),
        1 => Ok(values.pop()),
        n => Err(Error::from_code(
            ErrorCode::XPTY0004,
            format!("{what} must be a single atomic value, got {n} items"),
        )),
    }
}

/// Select the switch branch for an atomized `operand`.
///
/// `case_counts[i]` is the number of values of case `i`; `case_value(i, j)`
/// evaluates and atomizes value `j` of case `i`. An empty operand matches
/// only an empty case value; otherwise values match under
/// [`Comparator::equals_for_switch`].
pub fn select_switch<F>(
    comparator: &Comparator,
    operand: Vec<XdmAtomicValue>,
    case_counts: &[usize],
    mut case_value: F,
) -> Result<Selected, Error>
where
    F: FnMut(usize, usize) -> Result<Vec<XdmAtomicValue>, Error>,
{
    let operand = at_most_one(operand, "switch operand")?;
    for (case, &count) in case_counts.iter().enumerate() {
        for value in 0..count {
            let candidate = at_most_one(case_value(case, value)?, "switch case value")?;
            let hit = match (&operand, &candidate) {
                (None, None) => true,
                (Some(a), Some(b)) => comparator.equals_for_switch(a, b),
                _ => false,
            };
            if hit {
                return Ok(Selected::Case(case));
            }
        }
    }
    Ok(Selected::Default)
}

/// First typeswitch case one of whose sequence types matches `operand`.
pub fn select_typeswitch<N: XdmNode>(operand: &[XdmItem<N>], cases: &[TypeswitchCaseIR]) -> Selected {
    cases
        .iter()
        .position(|c| c.types.iter().any(|t| matches_seq(operand, t)))
        .map_or(Selected::Default, Selected::Case)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::cell::Cell;

    fn int(i: i64) -> XdmAtomicValue {
        XdmAtomicValue::Integer(i)
    }

    #[rstest]
    fn stops_at_first_matching_case() {
        let calls = Cell::new(0);
        let values = [[int(42)], [int(25)], [int(7)]];
        let picked = select_switch(&Comparator::default(), vec![int(25)], &[1, 1, 1], |c, v| {
            calls.set(calls.get() + 1);
            Ok(values[c][v..=v].to_vec())
        })
        .unwrap();
        assert_eq!(picked, Selected::Case(1));
        assert_eq!(calls.get(), 2);
    }

    #[rstest]
    fn empty_operand_matches_only_empty_case() {
        let picked = select_switch(&Comparator::default(), vec![], &[1, 1], |c, _| {
            Ok(if c == 0 { vec![int(1)] } else { vec![] })
        })
        .unwrap();
        assert_eq!(picked, Selected::Case(1));
    }

    #[rstest]
    fn type_mismatch_is_no_match() {
        let picked = select_switch(
            &Comparator::default(),
            vec![XdmAtomicValue::String("1".into())],
            &[1],
            |_, _| Ok(vec![int(1)]),
        )
        .unwrap();
        assert_eq!(picked, Selected::Default);
    }

    #[rstest]
    fn nan_operand_matches_nan_case() {
        let picked = select_switch(
            &Comparator::default(),
            vec![XdmAtomicValue::Double(f64::NAN)],
            &[1],
            |_, _| Ok(vec![XdmAtomicValue::Float(f32::NAN)]),
        )
        .unwrap();
        assert_eq!(picked, Selected::Case(0));
    }

    #[rstest]
    fn multi_item_operand_is_type_error() {
        let err = select_switch(&Comparator::default(), vec![int(1), int(2)], &[], |_, _| {
            Ok(vec![])
        })
        .unwrap_err();
        assert_eq!(err.code_enum(), ErrorCode::XPTY0004);
    }
}
