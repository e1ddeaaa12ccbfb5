use super::Stage;
use crate::compiler::ir::ForIR;
use crate::engine::env::Tuple;
use crate::engine::evaluator::{ItemStream, Vm};
use crate::engine::runtime::Error;
use crate::engine::types::check_seq;
use crate::model::XdmNode;
use crate::xdm::{XdmAtomicValue, XdmSequence};
use std::rc::Rc;

/// Expansion of one input tuple: the binding sequence is pulled lazily.
struct Expansion<'a, N> {
    tuple: Tuple<N>,
    items: ItemStream<'a, N>,
    position: i64,
}

/// `for $x [allowing empty] [at $p] in E`: one output tuple per item of `E`.
pub(crate) struct ForStage<'a, N> {
    vm: Vm<'a, N>,
    ir: &'a ForIR,
    input: Box<Stage<'a, N>>,
    current: Option<Expansion<'a, N>>,
}

impl<'a, N: XdmNode> ForStage<'a, N> {
    pub(crate) fn new(vm: Vm<'a, N>, ir: &'a ForIR, input: Box<Stage<'a, N>>) -> Self {
        Self {
            vm,
            ir,
            input,
            current: None,
        }
    }

    fn emit(&self, base: &Tuple<N>, value: XdmSequence<N>, position: i64) -> Result<Tuple<N>, Error> {
        if let Some(ty) = &self.ir.ty {
            check_seq(&value, ty, "for binding")?;
        }
        let mut out = base.with_binding(self.ir.var, Rc::new(value));
        if let Some(pos) = self.ir.position {
            out.bind(pos, Rc::new(vec![XdmAtomicValue::Integer(position).into()]));
        }
        Ok(out)
    }

    pub(crate) fn advance(&mut self) -> Result<Option<Tuple<N>>, Error> {
        loop {
            if let Some(exp) = self.current.as_mut() {
                match exp.items.next().transpose()? {
                    Some(item) => {
                        exp.position += 1;
                        let (tuple, position) = (exp.tuple.clone(), exp.position);
                        return self.emit(&tuple, vec![item], position).map(Some);
                    }
                    None => {
                        let exp = self.current.take();
                        if let Some(exp) = exp
                            && exp.position == 0
                            && self.ir.allowing_empty
                        {
                            // Outer iteration: empty binding, position 0.
                            return self.emit(&exp.tuple, Vec::new(), 0).map(Some);
                        }
                    }
                }
            }
            let Some(tuple) = self.input.advance()? else {
                return Ok(None);
            };
            let items = self.vm.eval_stream(&self.ir.source, &tuple)?;
            self.current = Some(Expansion {
                tuple,
                items,
                position: 0,
            });
        }
    }

    pub(crate) fn reset(&mut self) {
        self.current = None;
        self.input.reset();
    }
}
