use super::Stage;
use crate::compiler::ir::LetIR;
use crate::engine::env::Tuple;
use crate::engine::evaluator::Vm;
use crate::engine::runtime::Error;
use crate::engine::types::check_seq;
use crate::model::XdmNode;
use std::rc::Rc;

/// `let $x [as T] := E`: binds the whole sequence, one output per input.
pub(crate) struct LetStage<'a, N> {
    vm: Vm<'a, N>,
    ir: &'a LetIR,
    input: Box<Stage<'a, N>>,
}

impl<'a, N: XdmNode> LetStage<'a, N> {
    pub(crate) fn new(vm: Vm<'a, N>, ir: &'a LetIR, input: Box<Stage<'a, N>>) -> Self {
        Self { vm, ir, input }
    }

    pub(crate) fn advance(&mut self) -> Result<Option<Tuple<N>>, Error> {
        let Some(tuple) = self.input.advance()? else {
            return Ok(None);
        };
        let value = self.vm.eval(&self.ir.value, &tuple)?;
        if let Some(ty) = &self.ir.ty {
            check_seq(&value, ty, "let binding")?;
        }
        Ok(Some(tuple.with_binding(self.ir.var, Rc::new(value))))
    }

    pub(crate) fn reset(&mut self) {
        self.input.reset();
    }
}
