//! Expression evaluation and the query driver.
//!
//! [`evaluate_stream`] returns a pull-based iterator: FLWOR expressions,
//! sequences, ranges and branches are produced lazily, so a consumer that
//! stops early leaves the remaining tuples unevaluated. Everything else is
//! evaluated to a materialized [`XdmSequence`].

use crate::ast::{ComparisonOp, Expr, NodeComp};
use crate::compiler::compile_expr;
use crate::compiler::ir::{CompiledQuery, GlobalIR, GlobalInit, IrExpr, SwitchIR, TypeswitchIR};
use crate::consts::FNS;
use crate::engine::casting::cast_atomic;
use crate::engine::collation::{CodepointCollation, Collation};
use crate::engine::comparison::Comparator;
use crate::engine::env::{Binding, Focus, Tuple};
use crate::engine::numeric;
use crate::engine::pipeline::FlworStream;
use crate::engine::runtime::{
    CallCtx, DynamicContext, Error, ErrorCode, ResolveError, StaticContext,
};
use crate::engine::switch::{Selected, select_switch, select_typeswitch};
use crate::engine::types::{check_seq, matches_item, matches_seq};
use crate::model::XdmNode;
use crate::xdm::{AtomicType, ExpandedName, FunctionItem, XdmAtomicValue, XdmItem, XdmSequence};
use core::cmp::Ordering;
use smallvec::SmallVec;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use tracing::{debug, trace};

/// Lazily produced items. The first error ends the useful part of the stream.
pub type ItemStream<'a, N> = Box<dyn Iterator<Item = Result<XdmItem<N>, Error>> + 'a>;

/// Evaluate a compiled query to a fully materialized sequence. Either the
/// whole result or the first error is returned, never partial output.
pub fn evaluate<N: XdmNode>(
    query: &CompiledQuery,
    dyn_ctx: &DynamicContext<N>,
) -> Result<XdmSequence<N>, Error> {
    evaluate_stream(query, dyn_ctx)?.collect()
}

/// Convenience: compile with the default static context, then evaluate.
pub fn evaluate_expr<N: XdmNode>(
    expr: &Expr,
    dyn_ctx: &DynamicContext<N>,
) -> Result<XdmSequence<N>, Error> {
    let compiled = compile_expr(expr, &StaticContext::default())?;
    evaluate(&compiled, dyn_ctx)
}

/// Evaluate a compiled query lazily.
///
/// Errors in the prolog (context item, default collation) are returned
/// directly; errors raised while pulling are yielded once, after which the
/// stream is exhausted.
pub fn evaluate_stream<'a, N: XdmNode>(
    query: &'a CompiledQuery,
    dyn_ctx: &'a DynamicContext<N>,
) -> Result<ResultStream<'a, N>, Error> {
    let vm = Vm::new(query, dyn_ctx)?;
    vm.init_focus()?;
    let root = vm.root_tuple();
    let inner = vm.eval_stream(&query.body, &root)?;
    Ok(ResultStream { inner, done: false })
}

pub struct ResultStream<'a, N> {
    inner: ItemStream<'a, N>,
    done: bool,
}

impl<N> Iterator for ResultStream<'_, N> {
    type Item = Result<XdmItem<N>, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.inner.next() {
            Some(Err(e)) => {
                self.done = true;
                Some(Err(e))
            }
            None => {
                self.done = true;
                None
            }
            item => item,
        }
    }
}

// ===== value helpers =====

/// Atomization: nodes yield their typed value, function items are an error.
pub fn atomize<N: XdmNode>(seq: &[XdmItem<N>]) -> Result<Vec<XdmAtomicValue>, Error> {
    let mut out = Vec::with_capacity(seq.len());
    for item in seq {
        match item {
            XdmItem::Atomic(a) => out.push(a.clone()),
            XdmItem::Node(n) => out.extend(n.typed_value()),
            XdmItem::Function(f) => {
                return Err(Error::from_code(
                    ErrorCode::FOTY0013,
                    format!("function item {f:?} cannot be atomized"),
                ));
            }
        }
    }
    Ok(out)
}

/// Effective boolean value.
pub fn ebv<N>(seq: &[XdmItem<N>]) -> Result<bool, Error> {
    use XdmAtomicValue as V;
    match seq {
        [] => Ok(false),
        [XdmItem::Node(_), ..] => Ok(true),
        [XdmItem::Atomic(v)] => match v {
            V::Boolean(b) => Ok(*b),
            V::String(s) | V::AnyUri(s) | V::UntypedAtomic(s) => Ok(!s.is_empty()),
            V::Integer(i) => Ok(*i != 0),
            V::Decimal(d) => Ok(!d.is_zero()),
            V::Double(d) => Ok(*d != 0.0 && !d.is_nan()),
            V::Float(f) => Ok(*f != 0.0 && !f.is_nan()),
            other => Err(Error::from_code(
                ErrorCode::FORG0006,
                format!(
                    "effective boolean value is not defined for {}",
                    other.type_of().name()
                ),
            )),
        },
        [XdmItem::Function(_)] => Err(Error::from_code(
            ErrorCode::FORG0006,
            "effective boolean value is not defined for function items",
        )),
        _ => Err(Error::from_code(
            ErrorCode::FORG0006,
            "effective boolean value of a sequence of two or more items starting with an atomic value",
        )),
    }
}

fn atomic<N>(v: XdmAtomicValue) -> XdmSequence<N> {
    vec![XdmItem::Atomic(v)]
}

fn boolean<N>(b: bool) -> XdmSequence<N> {
    atomic(XdmAtomicValue::Boolean(b))
}

fn int_of(n: usize) -> XdmAtomicValue {
    XdmAtomicValue::Integer(i64::try_from(n).unwrap_or(i64::MAX))
}

fn type_error(msg: impl Into<String>) -> Error {
    Error::from_code(ErrorCode::XPTY0004, msg)
}

#[derive(Debug, Clone, Copy)]
enum LazyBuiltin {
    Exists,
    Empty,
    Head,
}

fn lazy_builtin(name: &ExpandedName, argc: usize) -> Option<LazyBuiltin> {
    if argc != 1 || name.ns_uri.as_deref() != Some(FNS) {
        return None;
    }
    match name.local.as_str() {
        "exists" => Some(LazyBuiltin::Exists),
        "empty" => Some(LazyBuiltin::Empty),
        "head" => Some(LazyBuiltin::Head),
        _ => None,
    }
}

// ===== VM =====

enum GlobalState<N> {
    Unevaluated,
    InProgress,
    Done(Binding<N>),
}

struct VmInner<'a, N> {
    query: &'a CompiledQuery,
    dyn_ctx: &'a DynamicContext<N>,
    comparator: Comparator,
    globals: RefCell<Vec<GlobalState<N>>>,
    /// Focus of the query body and of global initializers; `Pending` while
    /// the context item declaration is evaluated.
    main_focus: RefCell<Focus<N>>,
}

/// Shared evaluation state of one query run. Cheap to clone; pipeline stages
/// and lazy streams each hold a handle.
pub(crate) struct Vm<'a, N>(Rc<VmInner<'a, N>>);

impl<N> Clone for Vm<'_, N> {
    fn clone(&self) -> Self {
        Vm(Rc::clone(&self.0))
    }
}

impl<'a, N: XdmNode> Vm<'a, N> {
    fn new(query: &'a CompiledQuery, dyn_ctx: &'a DynamicContext<N>) -> Result<Self, Error> {
        let codepoint: Arc<dyn Collation> = Arc::new(CodepointCollation);
        let uri = dyn_ctx
            .default_collation
            .as_deref()
            .or(query.static_ctx.default_collation.as_deref());
        let collation = dyn_ctx.collations.resolve(uri, &codepoint)?;
        let comparator = Comparator::new(collation, dyn_ctx.implicit_timezone());
        debug!(
            frame_size = query.frame_size,
            globals = query.globals.len(),
            collation = comparator.collation().uri(),
            "starting evaluation"
        );
        let globals = query.globals.iter().map(|_| GlobalState::Unevaluated).collect();
        Ok(Vm(Rc::new(VmInner {
            query,
            dyn_ctx,
            comparator,
            globals: RefCell::new(globals),
            main_focus: RefCell::new(Focus::Pending),
        })))
    }

    pub(crate) fn comparator(&self) -> &Comparator {
        &self.0.comparator
    }

    /// Comparator for an explicit collation URI; `None` keeps the default.
    /// Unknown URIs raise `FOCH0002`.
    pub(crate) fn comparator_for(&self, uri: Option<&str>) -> Result<Comparator, Error> {
        if uri.is_none() {
            return Ok(self.0.comparator.clone());
        }
        let collation = self
            .0
            .dyn_ctx
            .collations
            .resolve(uri, self.0.comparator.collation())?;
        Ok(self.0.comparator.with_collation(collation))
    }

    fn root_tuple(&self) -> Tuple<N> {
        Tuple::new(self.0.query.frame_size, self.0.main_focus.borrow().clone())
    }

    fn init_focus(&self) -> Result<(), Error> {
        let focus = match &self.0.query.context_item {
            None => match &self.0.dyn_ctx.context_item {
                Some(item) => Focus::Item {
                    item: item.clone(),
                    position: 1,
                    size: 1,
                },
                None => Focus::Absent,
            },
            Some(decl) => {
                let pending = Tuple::new(self.0.query.frame_size, Focus::Pending);
                let value = match &decl.init {
                    GlobalInit::Expr(e) => Some(self.eval(e, &pending)?),
                    GlobalInit::External(default) => {
                        match (&self.0.dyn_ctx.context_item, default) {
                            (Some(item), _) => Some(vec![item.clone()]),
                            (None, Some(e)) => Some(self.eval(e, &pending)?),
                            (None, None) => None,
                        }
                    }
                };
                match value {
                    None => Focus::Absent,
                    Some(mut seq) => {
                        let item = match seq.pop() {
                            Some(item) if seq.is_empty() => item,
                            _ => return Err(type_error("the context item must be a single item")),
                        };
                        if let Some(ty) = &decl.ty
                            && !matches_item(&item, ty)
                        {
                            return Err(type_error(
                                "the context item does not match its declared type",
                            ));
                        }
                        Focus::Item {
                            item,
                            position: 1,
                            size: 1,
                        }
                    }
                }
            }
        };
        *self.0.main_focus.borrow_mut() = focus;
        Ok(())
    }

    fn global(&self, idx: usize) -> Result<Binding<N>, Error> {
        let decl = &self.0.query.globals[idx];
        match &self.0.globals.borrow()[idx] {
            GlobalState::Done(v) => return Ok(Rc::clone(v)),
            GlobalState::InProgress => {
                return Err(Error::from_code(
                    ErrorCode::XQDY0054,
                    format!("circular initialization of ${}", decl.name),
                ));
            }
            GlobalState::Unevaluated => {}
        }
        self.0.globals.borrow_mut()[idx] = GlobalState::InProgress;
        trace!(name = %decl.name, "initializing global variable");
        let result = self.init_global(decl);
        let mut globals = self.0.globals.borrow_mut();
        match result {
            Ok(value) => {
                let binding = Rc::new(value);
                globals[idx] = GlobalState::Done(Rc::clone(&binding));
                Ok(binding)
            }
            Err(e) => {
                globals[idx] = GlobalState::Unevaluated;
                Err(e)
            }
        }
    }

    fn init_global(&self, decl: &GlobalIR) -> Result<XdmSequence<N>, Error> {
        let value = match &decl.init {
            GlobalInit::Expr(e) => self.eval(e, &self.root_tuple())?,
            GlobalInit::External(default) => match self.0.dyn_ctx.variables.get(&decl.name) {
                Some(v) => v.clone(),
                None => match default {
                    Some(e) => self.eval(e, &self.root_tuple())?,
                    None => {
                        return Err(Error::from_code(
                            ErrorCode::XPDY0002,
                            format!("no value supplied for external variable ${}", decl.name),
                        ));
                    }
                },
            },
        };
        if let Some(ty) = &decl.ty {
            check_seq(&value, ty, &format!("${}", decl.name))?;
        }
        Ok(value)
    }

    // ===== evaluation =====

    /// Stream the items of `expr`. Variants without a lazy form are
    /// materialized by [`Vm::eval`].
    pub(crate) fn eval_stream<'e>(
        &self,
        expr: &'e IrExpr,
        t: &Tuple<N>,
    ) -> Result<ItemStream<'e, N>, Error>
    where
        'a: 'e,
    {
        match expr {
            IrExpr::Flwor(f) => {
                let vm: Vm<'e, N> = self.clone();
                Ok(Box::new(FlworStream::new(vm, f, t.clone())?))
            }
            IrExpr::Sequence(parts) => {
                let vm: Vm<'e, N> = self.clone();
                let t = t.clone();
                Ok(Box::new(parts.iter().flat_map(move |p| -> ItemStream<'e, N> {
                    match vm.eval_stream(p, &t) {
                        Ok(s) => s,
                        Err(e) => Box::new(std::iter::once(Err(e))),
                    }
                })))
            }
            IrExpr::Range(lo, hi) => {
                let (Some(lo), Some(hi)) = (self.range_bound(lo, t)?, self.range_bound(hi, t)?)
                else {
                    return Ok(Box::new(std::iter::empty()));
                };
                Ok(Box::new(
                    (lo..=hi).map(|i| Ok::<_, Error>(XdmItem::Atomic(XdmAtomicValue::Integer(i)))),
                ))
            }
            IrExpr::Local(slot) => Ok(share(Rc::clone(t.get(*slot)?))),
            IrExpr::Global(idx) => Ok(share(self.global(*idx)?)),
            IrExpr::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let branch = if self.ebv_of(cond, t)? {
                    then_branch
                } else {
                    else_branch
                };
                self.eval_stream(branch, t)
            }
            IrExpr::Switch(s) => {
                let branch = self.switch_branch(s, t)?;
                self.eval_stream(branch, t)
            }
            IrExpr::Typeswitch(ts) => {
                let (branch, bound) = self.typeswitch_branch(ts, t)?;
                self.eval_stream(branch, &bound)
            }
            IrExpr::Unordered(inner) => self.eval_stream(inner, t),
            IrExpr::Call { name, args } => match lazy_builtin(name, args.len()) {
                Some(kind) => {
                    let mut items = self.eval_stream(&args[0], t)?;
                    let first = items.next().transpose()?;
                    let out: XdmSequence<N> = match kind {
                        LazyBuiltin::Exists => boolean(first.is_some()),
                        LazyBuiltin::Empty => boolean(first.is_none()),
                        LazyBuiltin::Head => first.into_iter().collect(),
                    };
                    Ok(Box::new(out.into_iter().map(Ok)))
                }
                None => Ok(Box::new(self.eval(expr, t)?.into_iter().map(Ok))),
            },
            _ => Ok(Box::new(self.eval(expr, t)?.into_iter().map(Ok))),
        }
    }

    pub(crate) fn eval(&self, expr: &IrExpr, t: &Tuple<N>) -> Result<XdmSequence<N>, Error> {
        use IrExpr as E;
        Ok(match expr {
            E::Literal(v) => atomic(v.clone()),
            E::Empty => Vec::new(),
            E::Local(slot) => t.get(*slot)?.as_ref().clone(),
            E::Global(idx) => self.global(*idx)?.as_ref().clone(),
            E::ContextItem => vec![t.focus().item()?],
            E::Position => atomic(int_of(t.focus().position()?)),
            E::Last => atomic(int_of(t.focus().size()?)),
            E::Flwor(_) | E::Sequence(_) | E::Range(..) => {
                return self.eval_stream(expr, t)?.collect();
            }
            E::Arith { op, left, right } => {
                let a = self.atomize_opt(left, t, "arithmetic operand")?;
                let b = self.atomize_opt(right, t, "arithmetic operand")?;
                match (a, b) {
                    (Some(a), Some(b)) => atomic(numeric::arithmetic(*op, &a, &b)?),
                    _ => Vec::new(),
                }
            }
            E::Negate(inner) => match self.atomize_opt(inner, t, "unary minus operand")? {
                Some(v) => atomic(numeric::negate(&v)?),
                None => Vec::new(),
            },
            E::And(a, b) => boolean(self.ebv_of(a, t)? && self.ebv_of(b, t)?),
            E::Or(a, b) => boolean(self.ebv_of(a, t)? || self.ebv_of(b, t)?),
            E::ValueCompare { op, left, right } => {
                let a = self.atomize_opt(left, t, "value comparison operand")?;
                let b = self.atomize_opt(right, t, "value comparison operand")?;
                match (a, b) {
                    (Some(a), Some(b)) => boolean(self.0.comparator.value_compare(*op, &a, &b)?),
                    _ => Vec::new(),
                }
            }
            E::GeneralCompare { op, left, right } => {
                boolean(self.general_compare(*op, left, right, t)?)
            }
            E::NodeCompare { op, left, right } => {
                let (Some(a), Some(b)) = (self.single_node(left, t)?, self.single_node(right, t)?)
                else {
                    return Ok(Vec::new());
                };
                boolean(match op {
                    NodeComp::Is => a == b,
                    NodeComp::Precedes => a.compare_document_order(&b)? == Ordering::Less,
                    NodeComp::Follows => a.compare_document_order(&b)? == Ordering::Greater,
                })
            }
            E::If {
                cond,
                then_branch,
                else_branch,
            } => {
                if self.ebv_of(cond, t)? {
                    self.eval(then_branch, t)?
                } else {
                    self.eval(else_branch, t)?
                }
            }
            E::Call { name, args } => {
                if lazy_builtin(name, args.len()).is_some() {
                    return self.eval_stream(expr, t)?.collect();
                }
                let argv = args
                    .iter()
                    .map(|a| self.eval(a, t))
                    .collect::<Result<Vec<_>, _>>()?;
                self.call_named(name, &argv)?
            }
            E::Filter { base, predicates } => {
                let mut seq = self.eval(base, t)?;
                for p in predicates {
                    seq = self.apply_predicate(seq, p, t)?;
                }
                seq
            }
            E::Switch(s) => {
                let branch = self.switch_branch(s, t)?;
                self.eval(branch, t)?
            }
            E::Typeswitch(ts) => {
                let (branch, bound) = self.typeswitch_branch(ts, t)?;
                self.eval(branch, &bound)?
            }
            E::InstanceOf { expr, ty } => boolean(matches_seq(&self.eval(expr, t)?, ty)),
            E::Cast {
                expr,
                target,
                optional,
            } => {
                let mut values = atomize(&self.eval(expr, t)?)?;
                match values.len() {
                    0 if *optional => Vec::new(),
                    0 => {
                        return Err(type_error(format!(
                            "empty sequence cannot be cast to {}",
                            target.name()
                        )));
                    }
                    1 => {
                        let v = values.remove(0);
                        atomic(cast_atomic(&v, *target, self.0.comparator.implicit_timezone())?)
                    }
                    n => {
                        return Err(type_error(format!(
                            "cast to {} expects one item, got {n}",
                            target.name()
                        )));
                    }
                }
            }
            E::InlineFunction { params, body } => {
                vec![XdmItem::Function(Rc::new(FunctionItem::Inline {
                    params: params.clone(),
                    body: Rc::clone(body),
                    captured: t.with_focus(Focus::Absent),
                }))]
            }
            E::FunctionRef { name, arity } => {
                self.0
                    .dyn_ctx
                    .functions
                    .resolve(name, *arity)
                    .map_err(ResolveError::into_error)?;
                vec![XdmItem::Function(Rc::new(FunctionItem::Named {
                    name: name.clone(),
                    arity: *arity,
                }))]
            }
            E::DynamicCall { func, args } => {
                let target = self.eval(func, t)?;
                let func = match target.as_slice() {
                    [XdmItem::Function(f)] => Rc::clone(f),
                    _ => {
                        return Err(type_error(
                            "the target of a dynamic call must be a single function item",
                        ));
                    }
                };
                if func.arity() != args.len() {
                    return Err(type_error(format!(
                        "{func:?} called with {} argument(s)",
                        args.len()
                    )));
                }
                let argv = args
                    .iter()
                    .map(|a| self.eval(a, t))
                    .collect::<Result<Vec<_>, _>>()?;
                self.call_function(&func, argv)?
            }
            E::Unordered(inner) => self.eval(inner, t)?,
        })
    }

    pub(crate) fn ebv_of(&self, expr: &IrExpr, t: &Tuple<N>) -> Result<bool, Error> {
        ebv(&self.eval(expr, t)?)
    }

    pub(crate) fn atomized(&self, expr: &IrExpr, t: &Tuple<N>) -> Result<Vec<XdmAtomicValue>, Error> {
        atomize(&self.eval(expr, t)?)
    }

    fn atomize_opt(
        &self,
        expr: &IrExpr,
        t: &Tuple<N>,
        what: &str,
    ) -> Result<Option<XdmAtomicValue>, Error> {
        let mut values = self.atomized(expr, t)?;
        match values.len() {
            0 => Ok(None),
            1 => Ok(values.pop()),
            n => Err(type_error(format!("{what} must be a single atomic value, got {n} items"))),
        }
    }

    fn range_bound(&self, expr: &IrExpr, t: &Tuple<N>) -> Result<Option<i64>, Error> {
        let tz = self.0.comparator.implicit_timezone();
        match self.atomize_opt(expr, t, "range bound")? {
            None => Ok(None),
            Some(XdmAtomicValue::Integer(i)) => Ok(Some(i)),
            Some(v @ XdmAtomicValue::UntypedAtomic(_)) => {
                match cast_atomic(&v, AtomicType::Integer, tz)? {
                    XdmAtomicValue::Integer(i) => Ok(Some(i)),
                    _ => Err(type_error("range bound must be an integer")),
                }
            }
            Some(v) => Err(type_error(format!(
                "range bound must be xs:integer, got {}",
                v.type_of().name()
            ))),
        }
    }

    fn single_node(&self, expr: &IrExpr, t: &Tuple<N>) -> Result<Option<N>, Error> {
        let mut seq = self.eval(expr, t)?;
        match (seq.pop(), seq.is_empty()) {
            (None, _) => Ok(None),
            (Some(XdmItem::Node(n)), true) => Ok(Some(n)),
            _ => Err(type_error("node comparison operands must be single nodes")),
        }
    }

    fn general_compare(
        &self,
        op: ComparisonOp,
        left: &IrExpr,
        right: &IrExpr,
        t: &Tuple<N>,
    ) -> Result<bool, Error> {
        let l = self.atomized(left, t)?;
        if l.is_empty() {
            return Ok(false);
        }
        let r = self.atomized(right, t)?;
        for a in &l {
            for b in &r {
                if self.0.comparator.general_compare(op, a, b)? {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    fn apply_predicate(
        &self,
        seq: XdmSequence<N>,
        pred: &IrExpr,
        t: &Tuple<N>,
    ) -> Result<XdmSequence<N>, Error> {
        let size = seq.len();
        let mut out = Vec::new();
        for (i, item) in seq.into_iter().enumerate() {
            let focused = t.with_focus(Focus::Item {
                item: item.clone(),
                position: i + 1,
                size,
            });
            let r = self.eval(pred, &focused)?;
            let keep = match r.as_slice() {
                [XdmItem::Atomic(v)] if v.is_numeric() => {
                    self.0
                        .comparator
                        .value_compare(ComparisonOp::Eq, v, &int_of(i + 1))?
                }
                _ => ebv(&r)?,
            };
            if keep {
                out.push(item);
            }
        }
        Ok(out)
    }

    fn switch_branch<'s>(&self, s: &'s SwitchIR, t: &Tuple<N>) -> Result<&'s IrExpr, Error> {
        let operand = self.atomized(&s.operand, t)?;
        let counts: SmallVec<[usize; 8]> = s.cases.iter().map(|c| c.values.len()).collect();
        let picked = select_switch(&self.0.comparator, operand, &counts, |case, value| {
            self.atomized(&s.cases[case].values[value], t)
        })?;
        Ok(match picked {
            Selected::Case(i) => &s.cases[i].ret,
            Selected::Default => &s.default,
        })
    }

    fn typeswitch_branch<'s>(
        &self,
        ts: &'s TypeswitchIR,
        t: &Tuple<N>,
    ) -> Result<(&'s IrExpr, Tuple<N>), Error> {
        let operand = self.eval(&ts.operand, t)?;
        let (var, branch) = match select_typeswitch(&operand, &ts.cases) {
            Selected::Case(i) => (ts.cases[i].var, &ts.cases[i].ret),
            Selected::Default => (ts.default_var, &ts.default),
        };
        let bound = match var {
            Some(slot) => t.with_binding(slot, Rc::new(operand)),
            None => t.clone(),
        };
        Ok((branch, bound))
    }

    // ===== functions =====

    fn call_named(&self, name: &ExpandedName, args: &[XdmSequence<N>]) -> Result<XdmSequence<N>, Error> {
        let f = self
            .0
            .dyn_ctx
            .functions
            .resolve(name, args.len())
            .map_err(ResolveError::into_error)?;
        let ctx = CallCtx {
            dyn_ctx: self.0.dyn_ctx,
            static_ctx: &self.0.query.static_ctx,
            default_collation: Arc::clone(self.0.comparator.collation()),
            implicit_timezone: self.0.comparator.implicit_timezone(),
        };
        (f)(&ctx, args)
    }

    fn call_function(
        &self,
        func: &FunctionItem<N>,
        args: Vec<XdmSequence<N>>,
    ) -> Result<XdmSequence<N>, Error> {
        match func {
            FunctionItem::Named { name, .. } => self.call_named(name, &args),
            FunctionItem::Inline {
                params,
                body,
                captured,
            } => {
                let mut frame = captured.clone();
                for (slot, value) in params.iter().zip(args) {
                    frame.bind(*slot, Rc::new(value));
                }
                self.eval(body, &frame)
            }
        }
    }
}

/// Stream over a shared binding without copying it.
fn share<'e, N: XdmNode>(binding: Binding<N>) -> ItemStream<'e, N> {
    Box::new((0..binding.len()).map(move |i| Ok(binding[i].clone())))
}
