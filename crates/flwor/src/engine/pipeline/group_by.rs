use super::Stage;
use crate::compiler::ir::{GroupByIR, Slot};
use crate::engine::comparison::{Comparator, KeyHash};
use crate::engine::env::Tuple;
use crate::engine::evaluator::{Vm, atomize};
use crate::engine::runtime::{Error, ErrorCode};
use crate::model::XdmNode;
use crate::xdm::{XdmAtomicValue, XdmSequence};
use smallvec::SmallVec;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::debug;

type Key = SmallVec<[Option<XdmAtomicValue>; 2]>;

struct Partition<N> {
    key: Key,
    members: Vec<Tuple<N>>,
}

enum State<N> {
    Pending,
    Emitting(std::vec::IntoIter<Tuple<N>>),
    Done,
}

/// `group by`: drains its input, partitions tuples by key equality and
/// emits one tuple per partition in order of first key occurrence.
pub(crate) struct GroupByStage<'a, N> {
    ir: &'a GroupByIR,
    /// One comparator per key, carrying the key's collation.
    comparators: Vec<Comparator>,
    input: Box<Stage<'a, N>>,
    state: State<N>,
}

impl<'a, N: XdmNode> GroupByStage<'a, N> {
    pub(crate) fn new(
        vm: &Vm<'a, N>,
        ir: &'a GroupByIR,
        input: Box<Stage<'a, N>>,
    ) -> Result<Self, Error> {
        let comparators = ir
            .keys
            .iter()
            .map(|k| vm.comparator_for(k.collation.as_deref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            ir,
            comparators,
            input,
            state: State::Pending,
        })
    }

    pub(crate) fn advance(&mut self) -> Result<Option<Tuple<N>>, Error> {
        if matches!(self.state, State::Pending) {
            let groups = self.partition()?;
            self.state = State::Emitting(groups.into_iter());
        }
        match &mut self.state {
            State::Emitting(it) => Ok(it.next()),
            _ => Ok(None),
        }
    }

    pub(crate) fn reset(&mut self) {
        self.state = State::Done;
        self.input.reset();
    }

    fn key_of(&self, tuple: &Tuple<N>) -> Result<Key, Error> {
        let mut key = Key::new();
        for k in &self.ir.keys {
            let mut values = atomize(tuple.get(k.slot)?)?;
            if values.len() > 1 {
                return Err(Error::from_code(
                    ErrorCode::XPTY0004,
                    format!("grouping key must be a single atomic value, got {} items", values.len()),
                ));
            }
            key.push(values.pop());
        }
        Ok(key)
    }

    fn same_key(&self, a: &Key, b: &Key) -> Result<bool, Error> {
        for ((x, y), cmp) in a.iter().zip(b).zip(&self.comparators) {
            let eq = match (x, y) {
                (None, None) => true,
                (Some(x), Some(y)) => cmp.equals_for_grouping(x, y)?,
                _ => false,
            };
            if !eq {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn partition(&mut self) -> Result<Vec<Tuple<N>>, Error> {
        let mut partitions: Vec<Partition<N>> = Vec::new();
        let mut buckets: HashMap<SmallVec<[KeyHash; 2]>, SmallVec<[usize; 1]>> = HashMap::new();
        let mut drained = 0usize;
        while let Some(tuple) = self.input.advance()? {
            drained += 1;
            let key = self.key_of(&tuple)?;
            let hash = key
                .iter()
                .zip(&self.comparators)
                .map(|(v, cmp)| v.as_ref().map_or(KeyHash::Empty, |v| cmp.grouping_hash(v)))
                .collect();
            let bucket = buckets.entry(hash).or_default();
            let mut found = None;
            for &idx in bucket.iter() {
                if self.same_key(&partitions[idx].key, &key)? {
                    found = Some(idx);
                    break;
                }
            }
            match found {
                Some(idx) => partitions[idx].members.push(tuple),
                None => {
                    bucket.push(partitions.len());
                    partitions.push(Partition {
                        key,
                        members: vec![tuple],
                    });
                }
            }
        }
        debug!(tuples = drained, groups = partitions.len(), "group by drained input");
        partitions.into_iter().map(|p| self.merge(p)).collect()
    }

    /// Output tuple of a partition: keys hold the atomized key value, every
    /// other variable of the FLWOR the concatenation of its member values.
    fn merge(&self, p: Partition<N>) -> Result<Tuple<N>, Error> {
        let mut out = p.members[0].clone();
        for (k, value) in self.ir.keys.iter().zip(p.key) {
            let seq: XdmSequence<N> = value.into_iter().map(Into::into).collect();
            out.bind(k.slot, Rc::new(seq));
        }
        for &slot in &self.ir.rebound {
            out.bind(slot, Rc::new(concat(&p.members, slot)?));
        }
        Ok(out)
    }
}

fn concat<N: XdmNode>(members: &[Tuple<N>], slot: Slot) -> Result<XdmSequence<N>, Error> {
    let mut out = Vec::new();
    for t in members {
        out.extend(t.get(slot)?.iter().cloned());
    }
    Ok(out)
}
