use super::Stage;
use crate::ast::EmptyOrder;
use crate::compiler::ir::{OrderByIR, OrderSpecIR};
use crate::engine::comparison::{Comparator, ValueOrder};
use crate::engine::env::Tuple;
use crate::engine::evaluator::Vm;
use crate::engine::runtime::{Error, ErrorCode};
use crate::model::XdmNode;
use crate::xdm::XdmAtomicValue;
use core::cmp::Ordering;
use smallvec::SmallVec;
use tracing::debug;

type SortKey = SmallVec<[Option<XdmAtomicValue>; 2]>;

enum State<N> {
    Pending,
    Emitting(std::vec::IntoIter<(SortKey, Tuple<N>)>),
    Done,
}

/// `[stable] order by`: drains its input and emits it sorted. The sort is
/// always stable, so tuples with equal keys keep their input order.
pub(crate) struct OrderByStage<'a, N> {
    vm: Vm<'a, N>,
    ir: &'a OrderByIR,
    comparators: Vec<Comparator>,
    input: Box<Stage<'a, N>>,
    state: State<N>,
}

/// Position class of a key value: empty and NaN sort apart from other values.
fn rank(v: Option<&XdmAtomicValue>, empty: EmptyOrder) -> u8 {
    match (v, empty) {
        (None, EmptyOrder::Least) => 0,
        (None, EmptyOrder::Greatest) => 2,
        (Some(v), _) if v.is_nan() => 1,
        (Some(_), EmptyOrder::Least) => 2,
        (Some(_), EmptyOrder::Greatest) => 0,
    }
}

fn compare_key(
    cmp: &Comparator,
    spec: &OrderSpecIR,
    a: Option<&XdmAtomicValue>,
    b: Option<&XdmAtomicValue>,
) -> Result<Ordering, Error> {
    let (ra, rb) = (rank(a, spec.empty), rank(b, spec.empty));
    let ord = match (a, b) {
        (Some(x), Some(y)) if ra == rb && !x.is_nan() => match cmp.compare_for_ordering(x, y)? {
            ValueOrder::Less => Ordering::Less,
            ValueOrder::Greater => Ordering::Greater,
            ValueOrder::Equal | ValueOrder::Incomparable => Ordering::Equal,
        },
        _ => ra.cmp(&rb),
    };
    Ok(if spec.descending { ord.reverse() } else { ord })
}

impl<'a, N: XdmNode> OrderByStage<'a, N> {
    pub(crate) fn new(
        vm: &Vm<'a, N>,
        ir: &'a OrderByIR,
        input: Box<Stage<'a, N>>,
    ) -> Result<Self, Error> {
        let comparators = ir
            .specs
            .iter()
            .map(|s| vm.comparator_for(s.collation.as_deref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            vm: vm.clone(),
            ir,
            comparators,
            input,
            state: State::Pending,
        })
    }

    pub(crate) fn advance(&mut self) -> Result<Option<Tuple<N>>, Error> {
        if matches!(self.state, State::Pending) {
            let sorted = self.sort()?;
            self.state = State::Emitting(sorted.into_iter());
        }
        match &mut self.state {
            State::Emitting(it) => Ok(it.next().map(|(_, t)| t)),
            _ => Ok(None),
        }
    }

    pub(crate) fn reset(&mut self) {
        self.state = State::Done;
        self.input.reset();
    }

    fn key_of(&self, tuple: &Tuple<N>) -> Result<SortKey, Error> {
        let mut key = SortKey::new();
        for spec in &self.ir.specs {
            let mut values = self.vm.atomized(&spec.key, tuple)?;
            if values.len() > 1 {
                return Err(Error::from_code(
                    ErrorCode::XPTY0004,
                    format!("order key must be a single atomic value, got {} items", values.len()),
                ));
            }
            key.push(values.pop());
        }
        Ok(key)
    }

    fn sort(&mut self) -> Result<Vec<(SortKey, Tuple<N>)>, Error> {
        let mut rows = Vec::new();
        while let Some(tuple) = self.input.advance()? {
            let key = self.key_of(&tuple)?;
            rows.push((key, tuple));
        }
        debug!(tuples = rows.len(), keys = self.ir.specs.len(), "order by drained input");
        let mut failure: Option<Error> = None;
        rows.sort_by(|(a, _), (b, _)| {
            if failure.is_some() {
                return Ordering::Equal;
            }
            for ((spec, cmp), (x, y)) in self.ir.specs.iter().zip(&self.comparators).zip(a.iter().zip(b)) {
                match compare_key(cmp, spec, x.as_ref(), y.as_ref()) {
                    Ok(Ordering::Equal) => {}
                    Ok(ord) => return ord,
                    Err(e) => {
                        failure = Some(e);
                        return Ordering::Equal;
                    }
                }
            }
            Ordering::Equal
        });
        match failure {
            Some(e) => Err(e),
            None => Ok(rows),
        }
    }
}
