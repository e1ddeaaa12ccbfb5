use super::Stage;
use crate::ast::WindowKind;
use crate::compiler::ir::{WindowConditionIR, WindowEndIR, WindowIR};
use crate::engine::env::Tuple;
use crate::engine::evaluator::Vm;
use crate::engine::runtime::Error;
use crate::engine::types::check_seq;
use crate::model::XdmNode;
use crate::xdm::{XdmAtomicValue, XdmItem, XdmSequence};
use std::rc::Rc;

/// Window search state for one input tuple.
struct Cursor<N> {
    tuple: Tuple<N>,
    items: XdmSequence<N>,
    /// First item that may still open a window.
    next_start: usize,
}

/// `for tumbling|sliding window $w in E start ... [only] end ...`
pub(crate) struct WindowStage<'a, N> {
    vm: Vm<'a, N>,
    ir: &'a WindowIR,
    input: Box<Stage<'a, N>>,
    current: Option<Cursor<N>>,
}

/// Binds the `current`, `at`, `previous` and `next` variables of a condition for item `i`.
fn bind_vars<N: XdmNode>(
    base: &Tuple<N>,
    cond: &WindowConditionIR,
    items: &[XdmItem<N>],
    i: usize,
) -> Tuple<N> {
    let around = |k: Option<usize>| -> Rc<XdmSequence<N>> {
        Rc::new(k.and_then(|k| items.get(k)).cloned().into_iter().collect())
    };
    let mut t = base.clone();
    if let Some(slot) = cond.current {
        t.bind(slot, around(Some(i)));
    }
    if let Some(slot) = cond.position {
        let pos = i64::try_from(i + 1).unwrap_or(i64::MAX);
        t.bind(slot, Rc::new(vec![XdmAtomicValue::Integer(pos).into()]));
    }
    if let Some(slot) = cond.previous {
        t.bind(slot, around(i.checked_sub(1)));
    }
    if let Some(slot) = cond.next {
        t.bind(slot, around(Some(i + 1)));
    }
    t
}

/// First item at or after `from` satisfying the end condition.
fn find_end<N: XdmNode>(
    vm: &Vm<'_, N>,
    end: &WindowEndIR,
    start: &Tuple<N>,
    items: &[XdmItem<N>],
    from: usize,
) -> Result<Option<(usize, Tuple<N>)>, Error> {
    for e in from..items.len() {
        let t = bind_vars(start, &end.condition, items, e);
        if vm.ebv_of(&end.condition.when, &t)? {
            return Ok(Some((e, t)));
        }
    }
    Ok(None)
}

fn next_window<N: XdmNode>(
    vm: &Vm<'_, N>,
    ir: &WindowIR,
    cur: &mut Cursor<N>,
) -> Result<Option<Tuple<N>>, Error> {
    let n = cur.items.len();
    while cur.next_start < n {
        let s = cur.next_start;
        let start = bind_vars(&cur.tuple, &ir.start, &cur.items, s);
        if !vm.ebv_of(&ir.start.when, &start)? {
            cur.next_start += 1;
            continue;
        }
        // Only tumbling windows may omit the end condition.
        let closed = match &ir.end {
            None => {
                let mut e = s + 1;
                while e < n {
                    let probe = bind_vars(&cur.tuple, &ir.start, &cur.items, e);
                    if vm.ebv_of(&ir.start.when, &probe)? {
                        break;
                    }
                    e += 1;
                }
                cur.next_start = e;
                Some((e - 1, start))
            }
            Some(end) => {
                let found = find_end(vm, end, &start, &cur.items, s)?;
                cur.next_start = match (ir.kind, &found) {
                    (WindowKind::Tumbling, Some((e, _))) => e + 1,
                    (WindowKind::Tumbling, None) => n,
                    (WindowKind::Sliding, _) => s + 1,
                };
                match found {
                    Some(hit) => Some(hit),
                    None if end.only => None,
                    // Unclosed window: end variables describe its last item.
                    None => Some((n - 1, bind_vars(&start, &end.condition, &cur.items, n - 1))),
                }
            }
        };
        let Some((e, mut out)) = closed else {
            continue;
        };
        let window = cur.items[s..=e].to_vec();
        if let Some(ty) = &ir.ty {
            check_seq(&window, ty, "window binding")?;
        }
        out.bind(ir.var, Rc::new(window));
        return Ok(Some(out));
    }
    Ok(None)
}

impl<'a, N: XdmNode> WindowStage<'a, N> {
    pub(crate) fn new(vm: Vm<'a, N>, ir: &'a WindowIR, input: Box<Stage<'a, N>>) -> Self {
        Self {
            vm,
            ir,
            input,
            current: None,
        }
    }

    pub(crate) fn advance(&mut self) -> Result<Option<Tuple<N>>, Error> {
        loop {
            if let Some(cur) = self.current.as_mut() {
                if let Some(t) = next_window(&self.vm, self.ir, cur)? {
                    return Ok(Some(t));
                }
                self.current = None;
            }
            let Some(tuple) = self.input.advance()? else {
                return Ok(None);
            };
            let items = self.vm.eval(&self.ir.source, &tuple)?;
            self.current = Some(Cursor {
                tuple,
                items,
                next_start: 0,
            });
        }
    }

    pub(crate) fn reset(&mut self) {
        self.current = None;
        self.input.reset();
    }
}
