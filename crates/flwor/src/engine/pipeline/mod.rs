//! Clause pipeline of a FLWOR expression.
//!
//! Each clause becomes a [`Stage`] pulling tuples from its input stage. The
//! chain starts with a source stage emitting the tuple of the enclosing
//! expression once. `For`, `Let`, `Window`, `Where` and `Count` stream;
//! `GroupBy` and `OrderBy` drain their input on the first pull.

use crate::compiler::ir::{ClauseIR, FlworIR};
use crate::engine::env::Tuple;
use crate::engine::evaluator::{ItemStream, Vm};
use crate::engine::runtime::Error;
use crate::model::XdmNode;
use crate::xdm::XdmItem;
use tracing::debug;

mod count;
mod for_clause;
mod group_by;
mod let_clause;
mod order_by;
mod where_clause;
mod window;

use count::CountStage;
use for_clause::ForStage;
use group_by::GroupByStage;
use let_clause::LetStage;
use order_by::OrderByStage;
use where_clause::WhereStage;
use window::WindowStage;

pub(crate) enum Stage<'a, N> {
    Source(Option<Tuple<N>>),
    For(ForStage<'a, N>),
    Let(LetStage<'a, N>),
    Window(WindowStage<'a, N>),
    Where(WhereStage<'a, N>),
    Count(CountStage<'a, N>),
    GroupBy(GroupByStage<'a, N>),
    OrderBy(OrderByStage<'a, N>),
}

impl<'a, N: XdmNode> Stage<'a, N> {
    /// Next output tuple, `None` once the stage is exhausted.
    pub(crate) fn advance(&mut self) -> Result<Option<Tuple<N>>, Error> {
        match self {
            Stage::Source(t) => Ok(t.take()),
            Stage::For(s) => s.advance(),
            Stage::Let(s) => s.advance(),
            Stage::Window(s) => s.advance(),
            Stage::Where(s) => s.advance(),
            Stage::Count(s) => s.advance(),
            Stage::GroupBy(s) => s.advance(),
            Stage::OrderBy(s) => s.advance(),
        }
    }

    /// Drops buffered tuples and pending expansions. A reset stage yields
    /// nothing more; the whole chain is reset when evaluation aborts.
    pub(crate) fn reset(&mut self) {
        match self {
            Stage::Source(t) => *t = None,
            Stage::For(s) => s.reset(),
            Stage::Let(s) => s.reset(),
            Stage::Window(s) => s.reset(),
            Stage::Where(s) => s.reset(),
            Stage::Count(s) => s.reset(),
            Stage::GroupBy(s) => s.reset(),
            Stage::OrderBy(s) => s.reset(),
        }
    }
}

/// Builds the stage chain for `flwor` on top of the enclosing tuple.
/// Collations named by `group by`/`order by` are resolved here.
pub(crate) fn build<'a, N: XdmNode>(
    vm: &Vm<'a, N>,
    flwor: &'a FlworIR,
    input: Tuple<N>,
) -> Result<Stage<'a, N>, Error> {
    let mut stage = Stage::Source(Some(input));
    for clause in &flwor.clauses {
        let upstream = Box::new(stage);
        stage = match clause {
            ClauseIR::For(ir) => Stage::For(ForStage::new(vm.clone(), ir, upstream)),
            ClauseIR::Let(ir) => Stage::Let(LetStage::new(vm.clone(), ir, upstream)),
            ClauseIR::Window(ir) => Stage::Window(WindowStage::new(vm.clone(), ir, upstream)),
            ClauseIR::Where(cond) => Stage::Where(WhereStage::new(vm.clone(), cond, upstream)),
            ClauseIR::Count(slot) => Stage::Count(CountStage::new(*slot, upstream)),
            ClauseIR::GroupBy(ir) => Stage::GroupBy(GroupByStage::new(vm, ir, upstream)?),
            ClauseIR::OrderBy(ir) => Stage::OrderBy(OrderByStage::new(vm, ir, upstream)?),
        };
    }
    debug!(clauses = flwor.clauses.len(), "built clause pipeline");
    Ok(stage)
}

/// Items of a FLWOR expression: the return expression evaluated for each
/// tuple of the pipeline, concatenated in stream order.
pub(crate) struct FlworStream<'a, N> {
    vm: Vm<'a, N>,
    flwor: &'a FlworIR,
    pipeline: Stage<'a, N>,
    current: Option<ItemStream<'a, N>>,
    done: bool,
}

impl<'a, N: XdmNode> FlworStream<'a, N> {
    pub(crate) fn new(vm: Vm<'a, N>, flwor: &'a FlworIR, input: Tuple<N>) -> Result<Self, Error> {
        let pipeline = build(&vm, flwor, input)?;
        Ok(Self {
            vm,
            flwor,
            pipeline,
            current: None,
            done: false,
        })
    }

    fn abort(&mut self, e: Error) -> Option<Result<XdmItem<N>, Error>> {
        debug!(code = %e.format_code(), "clause pipeline aborted");
        self.pipeline.reset();
        self.current = None;
        self.done = true;
        Some(Err(e))
    }
}

impl<N: XdmNode> Iterator for FlworStream<'_, N> {
    type Item = Result<XdmItem<N>, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(items) = self.current.as_mut() {
                match items.next() {
                    Some(Ok(item)) => return Some(Ok(item)),
                    Some(Err(e)) => return self.abort(e),
                    None => self.current = None,
                }
            }
            if self.done {
                return None;
            }
            match self.pipeline.advance() {
                Ok(Some(tuple)) => match self.vm.eval_stream(&self.flwor.return_expr, &tuple) {
                    Ok(items) => self.current = Some(items),
                    Err(e) => return self.abort(e),
                },
                Ok(None) => {
                    self.done = true;
                    return None;
                }
                Err(e) => return self.abort(e),
            }
        }
    }
}
