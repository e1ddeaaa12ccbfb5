use super::Stage;
use crate::compiler::ir::IrExpr;
use crate::engine::env::Tuple;
use crate::engine::evaluator::Vm;
use crate::engine::runtime::Error;
use crate::model::XdmNode;

/// `where E`: keeps tuples whose condition has a true effective boolean value.
pub(crate) struct WhereStage<'a, N> {
    vm: Vm<'a, N>,
    cond: &'a IrExpr,
    input: Box<Stage<'a, N>>,
}

impl<'a, N: XdmNode> WhereStage<'a, N> {
    pub(crate) fn new(vm: Vm<'a, N>, cond: &'a IrExpr, input: Box<Stage<'a, N>>) -> Self {
        Self { vm, cond, input }
    }

    pub(crate) fn advance(&mut self) -> Result<Option<Tuple<N>>, Error> {
        while let Some(tuple) = self.input.advance()? {
            if self.vm.ebv_of(self.cond, &tuple)? {
                return Ok(Some(tuple));
            }
        }
        Ok(None)
    }

    pub(crate) fn reset(&mut self) {
        self.input.reset();
    }
}
