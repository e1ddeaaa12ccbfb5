use super::Stage;
use crate::compiler::ir::Slot;
use crate::engine::env::Tuple;
use crate::engine::runtime::Error;
use crate::model::XdmNode;
use crate::xdm::XdmAtomicValue;
use std::rc::Rc;

/// `count $c`: binds the 1-based ordinal of each tuple in the stream.
pub(crate) struct CountStage<'a, N> {
    slot: Slot,
    input: Box<Stage<'a, N>>,
    seen: i64,
}

impl<'a, N: XdmNode> CountStage<'a, N> {
    pub(crate) fn new(slot: Slot, input: Box<Stage<'a, N>>) -> Self {
        Self {
            slot,
            input,
            seen: 0,
        }
    }

    pub(crate) fn advance(&mut self) -> Result<Option<Tuple<N>>, Error> {
        let Some(tuple) = self.input.advance()? else {
            return Ok(None);
        };
        self.seen += 1;
        let ordinal = Rc::new(vec![XdmAtomicValue::Integer(self.seen).into()]);
        Ok(Some(tuple.with_binding(self.slot, ordinal)))
    }

    pub(crate) fn reset(&mut self) {
        self.seen = 0;
        self.input.reset();
    }
}
