//! Lowering of the query AST to [`ir`]: prefixes are resolved, variables are
//! assigned tuple slots and static errors are raised before any data is seen.

use crate::ast::{self, EmptyOrder, Expr, Module};
use crate::consts::{FNS, XS};
use crate::engine::runtime::{Error, ErrorCode, StaticContext};
use crate::model::NodeKind;
use crate::xdm::{AtomicType, ExpandedName, XdmAtomicValue};
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::{Arc, OnceLock};
use string_cache::DefaultAtom;
use tracing::debug;

pub mod ir;

use ir::{
    ClauseIR, CompiledQuery, ContextItemIR, FlworIR, ForIR, GlobalIR, GlobalInit, GroupByIR,
    GroupingKeyIR, IrExpr, ItemTypeIR, LetIR, OrderByIR, OrderSpecIR, SeqTypeIR, Slot, SwitchCaseIR,
    SwitchIR, TypeswitchCaseIR, TypeswitchIR, WindowConditionIR, WindowEndIR, WindowIR,
};

static DEFAULT_STATIC_CONTEXT: OnceLock<StaticContext> = OnceLock::new();

fn default_static_ctx() -> &'static StaticContext {
    DEFAULT_STATIC_CONTEXT.get_or_init(StaticContext::default)
}

/// Compile a module using the default static context.
pub fn compile(module: &Module) -> Result<CompiledQuery, Error> {
    compile_with_context(module, default_static_ctx())
}

/// Compile a bare expression (no prolog).
pub fn compile_expr(expr: &Expr, static_ctx: &StaticContext) -> Result<CompiledQuery, Error> {
    compile_with_context(&Module::main(expr.clone()), static_ctx)
}

pub fn compile_with_context(
    module: &Module,
    static_ctx: &StaticContext,
) -> Result<CompiledQuery, Error> {
    let mut ns = Rc::new(NsScope::Root(static_ctx.namespaces.by_prefix.clone()));
    for (prefix, uri) in &module.namespaces {
        if prefix == "xml" || prefix == "xmlns" {
            return Err(Error::from_code(
                ErrorCode::XPST0081,
                format!("prefix '{prefix}' cannot be redeclared"),
            ));
        }
        ns = Rc::new(NsScope::Bind {
            prefix: prefix.clone(),
            uri: uri.clone(),
            parent: ns,
        });
    }
    let default_fn_ns = module
        .default_function_namespace
        .clone()
        .or_else(|| static_ctx.default_function_namespace.clone());
    let mut c = Compiler {
        static_ctx,
        ns,
        default_fn_ns,
        scopes: Vec::new(),
        flwor_base: Vec::new(),
        next_slot: 0,
        frame_size: 0,
        global_index: HashMap::new(),
    };
    let globals = c.lower_globals(module)?;
    let context_item = match &module.context_item {
        Some(decl) => Some(Rc::new(ContextItemIR {
            ty: decl.ty.as_ref().map(|t| c.lower_item_type(t)).transpose()?,
            init: c.lower_var_value(&decl.value)?,
        })),
        None => None,
    };
    let body = c.lower_expr(&module.body)?;
    debug!(
        frame_size = c.frame_size,
        globals = globals.len(),
        context_item = context_item.is_some(),
        "compiled query"
    );
    Ok(CompiledQuery {
        globals: globals.into(),
        context_item,
        body: Rc::new(body),
        frame_size: c.frame_size,
        static_ctx: Arc::new(static_ctx.clone()),
    })
}

/// Immutable, lexically scoped prefix bindings.
enum NsScope {
    Root(HashMap<String, String>),
    Bind {
        prefix: String,
        uri: String,
        parent: Rc<NsScope>,
    },
}

impl NsScope {
    fn lookup(&self, prefix: &str) -> Option<&str> {
        match self {
            NsScope::Root(map) => map.get(prefix).map(String::as_str),
            NsScope::Bind {
                prefix: p,
                uri,
                parent,
            } => {
                if p == prefix {
                    Some(uri)
                } else {
                    parent.lookup(prefix)
                }
            }
        }
    }
}

/// Interned variable name used for scope lookups.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct VarKey(Option<DefaultAtom>, DefaultAtom);

impl From<&ExpandedName> for VarKey {
    fn from(n: &ExpandedName) -> Self {
        VarKey(
            n.ns_uri.as_deref().map(DefaultAtom::from),
            DefaultAtom::from(n.local.as_str()),
        )
    }
}

struct Compiler<'a> {
    static_ctx: &'a StaticContext,
    ns: Rc<NsScope>,
    default_fn_ns: Option<String>,
    /// Lexical variable stack; later entries shadow earlier ones.
    scopes: Vec<(VarKey, Slot)>,
    /// `scopes.len()` at the start of each enclosing FLWOR.
    flwor_base: Vec<usize>,
    next_slot: Slot,
    frame_size: usize,
    global_index: HashMap<VarKey, usize>,
}

type CResult<T> = Result<T, Error>;

fn static_err(code: ErrorCode, msg: impl Into<String>) -> Error {
    Error::from_code(code, msg)
}

impl Compiler<'_> {
    // ===== names =====

    fn resolve_prefix(&self, prefix: &str) -> CResult<String> {
        self.ns
            .lookup(prefix)
            .map(str::to_string)
            .ok_or_else(|| static_err(ErrorCode::XPST0081, format!("unknown namespace prefix '{prefix}'")))
    }

    /// Variable names: no prefix means no namespace.
    fn var_name(&self, q: &ast::QName) -> CResult<ExpandedName> {
        let ns = match &q.prefix {
            Some(p) => Some(self.resolve_prefix(p)?),
            None => None,
        };
        Ok(ExpandedName::new(ns, q.local.clone()))
    }

    /// Function names: no prefix means the default function namespace.
    fn function_name(&self, q: &ast::QName) -> CResult<ExpandedName> {
        let ns = match &q.prefix {
            Some(p) => Some(self.resolve_prefix(p)?),
            None => self.default_fn_ns.clone(),
        };
        Ok(ExpandedName::new(ns, q.local.clone()))
    }

    // ===== slots and scopes =====

    fn alloc_slot(&mut self) -> Slot {
        let s = self.next_slot;
        self.next_slot += 1;
        self.frame_size = self.frame_size.max(self.next_slot);
        s
    }

    fn declare(&mut self, q: &ast::QName) -> CResult<Slot> {
        let name = self.var_name(q)?;
        let slot = self.alloc_slot();
        self.scopes.push((VarKey::from(&name), slot));
        Ok(slot)
    }

    fn lookup_local(&self, key: &VarKey, from: usize) -> Option<Slot> {
        self.scopes[from..]
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, s)| *s)
    }

    /// Runs `f` in a nested scope; slots allocated inside are released afterwards.
    fn scoped<T>(&mut self, f: impl FnOnce(&mut Self) -> CResult<T>) -> CResult<T> {
        let (depth, slot) = (self.scopes.len(), self.next_slot);
        let out = f(self);
        self.scopes.truncate(depth);
        self.next_slot = slot;
        out
    }

    // ===== prolog =====

    fn lower_globals(&mut self, module: &Module) -> CResult<Vec<GlobalIR>> {
        let mut names = Vec::new();
        for decl in &module.variables {
            let name = self.var_name(&decl.name)?;
            let key = VarKey::from(&name);
            if self.global_index.contains_key(&key) {
                return Err(static_err(
                    ErrorCode::XPST0003,
                    format!("variable ${name} declared twice"),
                ));
            }
            self.global_index.insert(key, names.len());
            names.push(name);
        }
        let mut host_vars: Vec<&ExpandedName> = self
            .static_ctx
            .in_scope_variables
            .iter()
            .filter(|n| !self.global_index.contains_key(&VarKey::from(*n)))
            .collect();
        host_vars.sort_by(|a, b| a.to_string().cmp(&b.to_string()));
        let mut globals = Vec::with_capacity(names.len() + host_vars.len());
        for (decl, name) in module.variables.iter().zip(names) {
            let ty = decl.ty.as_ref().map(|t| self.lower_seq_type(t)).transpose()?;
            let init = self.lower_var_value(&decl.value)?;
            globals.push(GlobalIR { name, ty, init });
        }
        for name in host_vars {
            self.global_index.insert(VarKey::from(name), globals.len());
            globals.push(GlobalIR {
                name: name.clone(),
                ty: None,
                init: GlobalInit::External(None),
            });
        }
        Ok(globals)
    }

    fn lower_var_value(&mut self, v: &ast::VarValue) -> CResult<GlobalInit> {
        Ok(match v {
            ast::VarValue::Expr(e) => GlobalInit::Expr(self.scoped(|c| c.lower_expr(e))?),
            ast::VarValue::External(default) => GlobalInit::External(match default {
                Some(e) => Some(self.scoped(|c| c.lower_expr(e))?),
                None => None,
            }),
        })
    }

    // ===== types =====

    fn atomic_type(&self, q: &ast::QName) -> CResult<AtomicType> {
        let ns = match &q.prefix {
            Some(p) => Some(self.resolve_prefix(p)?),
            None => None,
        };
        let unknown = || static_err(ErrorCode::XPST0051, format!("unknown atomic type {}", q.local));
        if ns.as_deref() != Some(XS) {
            return Err(unknown());
        }
        Ok(match q.local.as_str() {
            "anyAtomicType" => AtomicType::AnyAtomic,
            "numeric" => AtomicType::Numeric,
            "string" => AtomicType::String,
            "boolean" => AtomicType::Boolean,
            "integer" => AtomicType::Integer,
            "decimal" => AtomicType::Decimal,
            "double" => AtomicType::Double,
            "float" => AtomicType::Float,
            "anyURI" => AtomicType::AnyUri,
            "QName" => AtomicType::QName,
            "untypedAtomic" => AtomicType::UntypedAtomic,
            "dateTime" => AtomicType::DateTime,
            "date" => AtomicType::Date,
            "time" => AtomicType::Time,
            "duration" => AtomicType::Duration,
            "yearMonthDuration" => AtomicType::YearMonthDuration,
            "dayTimeDuration" => AtomicType::DayTimeDuration,
            _ => return Err(unknown()),
        })
    }

    fn lower_item_type(&self, t: &ast::ItemType) -> CResult<ItemTypeIR> {
        Ok(match t {
            ast::ItemType::Item => ItemTypeIR::AnyItem,
            ast::ItemType::AnyFunction => ItemTypeIR::AnyFunction,
            ast::ItemType::Atomic(q) => ItemTypeIR::Atomic(self.atomic_type(q)?),
            ast::ItemType::Kind(k) => {
                let (kind, name) = match k {
                    ast::KindTest::AnyKind => return Ok(ItemTypeIR::AnyNode),
                    ast::KindTest::Document => (NodeKind::Document, None),
                    ast::KindTest::Element(n) => (NodeKind::Element, n.as_ref()),
                    ast::KindTest::Attribute(n) => (NodeKind::Attribute, n.as_ref()),
                    ast::KindTest::Text => (NodeKind::Text, None),
                    ast::KindTest::Comment => (NodeKind::Comment, None),
                    ast::KindTest::ProcessingInstruction => (NodeKind::ProcessingInstruction, None),
                };
                ItemTypeIR::Kind {
                    kind,
                    name: name.map(|q| self.var_name(q)).transpose()?,
                }
            }
        })
    }

    fn lower_seq_type(&self, t: &ast::SequenceType) -> CResult<SeqTypeIR> {
        Ok(match t {
            ast::SequenceType::EmptySequence => SeqTypeIR::EmptySequence,
            ast::SequenceType::Typed { item, occ } => SeqTypeIR::Typed {
                item: self.lower_item_type(item)?,
                occ: *occ,
            },
        })
    }

    fn lower_opt_type(&self, t: Option<&ast::SequenceType>) -> CResult<Option<SeqTypeIR>> {
        t.map(|t| self.lower_seq_type(t)).transpose()
    }

    // ===== expressions =====

    fn boxed(&mut self, e: &Expr) -> CResult<Box<IrExpr>> {
        Ok(Box::new(self.lower_expr(e)?))
    }

    fn lower_exprs(&mut self, es: &[Expr]) -> CResult<Vec<IrExpr>> {
        es.iter().map(|e| self.lower_expr(e)).collect()
    }

    fn lower_expr(&mut self, e: &Expr) -> CResult<IrExpr> {
        use ast::Literal as L;
        Ok(match e {
            Expr::Literal(l) => match l {
                L::Integer(i) => IrExpr::Literal(XdmAtomicValue::Integer(*i)),
                L::Decimal(d) => IrExpr::Literal(XdmAtomicValue::Decimal(*d)),
                L::Double(d) => IrExpr::Literal(XdmAtomicValue::Double(*d)),
                L::String(s) => IrExpr::Literal(XdmAtomicValue::String(s.clone())),
                L::Boolean(b) => IrExpr::Literal(XdmAtomicValue::Boolean(*b)),
                L::UntypedAtomic(s) => IrExpr::Literal(XdmAtomicValue::UntypedAtomic(s.clone())),
                L::EmptySequence => IrExpr::Empty,
            },
            Expr::VarRef(q) => {
                let name = self.var_name(q)?;
                let key = VarKey::from(&name);
                if let Some(slot) = self.lookup_local(&key, 0) {
                    IrExpr::Local(slot)
                } else if let Some(idx) = self.global_index.get(&key) {
                    IrExpr::Global(*idx)
                } else {
                    return Err(static_err(
                        ErrorCode::XPST0008,
                        format!("variable ${name} is not declared"),
                    ));
                }
            }
            Expr::ContextItem => IrExpr::ContextItem,
            Expr::Sequence(items) => match items.len() {
                0 => IrExpr::Empty,
                1 => self.lower_expr(&items[0])?,
                _ => IrExpr::Sequence(self.lower_exprs(items)?),
            },
            Expr::Range { start, end } => IrExpr::Range(self.boxed(start)?, self.boxed(end)?),
            Expr::Arithmetic { left, op, right } => IrExpr::Arith {
                op: *op,
                left: self.boxed(left)?,
                right: self.boxed(right)?,
            },
            Expr::Negate(inner) => IrExpr::Negate(self.boxed(inner)?),
            Expr::And(a, b) => IrExpr::And(self.boxed(a)?, self.boxed(b)?),
            Expr::Or(a, b) => IrExpr::Or(self.boxed(a)?, self.boxed(b)?),
            Expr::ValueComparison { left, op, right } => IrExpr::ValueCompare {
                op: *op,
                left: self.boxed(left)?,
                right: self.boxed(right)?,
            },
            Expr::GeneralComparison { left, op, right } => IrExpr::GeneralCompare {
                op: *op,
                left: self.boxed(left)?,
                right: self.boxed(right)?,
            },
            Expr::NodeComparison { left, op, right } => IrExpr::NodeCompare {
                op: *op,
                left: self.boxed(left)?,
                right: self.boxed(right)?,
            },
            Expr::IfThenElse {
                cond,
                then_expr,
                else_expr,
            } => IrExpr::If {
                cond: self.boxed(cond)?,
                then_branch: self.boxed(then_expr)?,
                else_branch: self.boxed(else_expr)?,
            },
            Expr::FunctionCall { name, args } => {
                let en = self.function_name(name)?;
                if en.ns_uri.as_deref() == Some(FNS) && args.is_empty() {
                    match en.local.as_str() {
                        "position" => return Ok(IrExpr::Position),
                        "last" => return Ok(IrExpr::Last),
                        _ => {}
                    }
                }
                IrExpr::Call {
                    name: en,
                    args: self.lower_exprs(args)?,
                }
            }
            Expr::Filter { base, predicates } => IrExpr::Filter {
                base: self.boxed(base)?,
                predicates: self.lower_exprs(predicates)?,
            },
            Expr::Flwor(f) => IrExpr::Flwor(Rc::new(self.scoped(|c| c.lower_flwor(f))?)),
            Expr::Switch(s) => IrExpr::Switch(Rc::new(self.lower_switch(s)?)),
            Expr::Typeswitch(t) => IrExpr::Typeswitch(Rc::new(self.lower_typeswitch(t)?)),
            Expr::InstanceOf { expr, ty } => IrExpr::InstanceOf {
                expr: self.boxed(expr)?,
                ty: self.lower_seq_type(ty)?,
            },
            Expr::CastAs { expr, ty } => {
                let target = self.atomic_type(&ty.atomic)?;
                if matches!(target, AtomicType::AnyAtomic | AtomicType::Numeric) {
                    return Err(static_err(
                        ErrorCode::XPST0051,
                        format!("{} is not a valid cast target", target.name()),
                    ));
                }
                IrExpr::Cast {
                    expr: self.boxed(expr)?,
                    target,
                    optional: ty.optional,
                }
            }
            Expr::InlineFunction { params, body } => self.scoped(|c| {
                let mut slots = Vec::with_capacity(params.len());
                for p in params {
                    slots.push(c.declare(p)?);
                }
                Ok(IrExpr::InlineFunction {
                    params: slots,
                    body: Rc::new(c.lower_expr(body)?),
                })
            })?,
            Expr::NamedFunctionRef { name, arity } => IrExpr::FunctionRef {
                name: self.function_name(name)?,
                arity: *arity,
            },
            Expr::DynamicCall { func, args } => IrExpr::DynamicCall {
                func: self.boxed(func)?,
                args: self.lower_exprs(args)?,
            },
            Expr::Unordered(inner) => IrExpr::Unordered(self.boxed(inner)?),
        })
    }

    // ===== FLWOR =====

    /// Caller wraps this in [`Compiler::scoped`].
    fn lower_flwor(&mut self, f: &ast::Flwor) -> CResult<FlworIR> {
        match f.clauses.first() {
            Some(ast::Clause::For(_) | ast::Clause::Let(_) | ast::Clause::Window(_)) => {}
            _ => {
                return Err(static_err(
                    ErrorCode::XPST0003,
                    "a FLWOR expression must start with for, let or window",
                ));
            }
        }
        self.flwor_base.push(self.scopes.len());
        let out = self.lower_clauses(f);
        self.flwor_base.pop();
        out
    }

    fn lower_clauses(&mut self, f: &ast::Flwor) -> CResult<FlworIR> {
        let mut clauses = Vec::with_capacity(f.clauses.len());
        for clause in &f.clauses {
            match clause {
                ast::Clause::For(b) => {
                    if let Some(pos) = &b.position
                        && self.var_name(pos)? == self.var_name(&b.var)?
                    {
                        return Err(static_err(
                            ErrorCode::XQST0089,
                            format!("positional variable ${} equals the bound variable", pos.local),
                        ));
                    }
                    let source = self.lower_expr(&b.in_expr)?;
                    let ty = self.lower_opt_type(b.ty.as_ref())?;
                    let var = self.declare(&b.var)?;
                    let position = b.position.as_ref().map(|p| self.declare(p)).transpose()?;
                    clauses.push(ClauseIR::For(Rc::new(ForIR {
                        var,
                        position,
                        allowing_empty: b.allowing_empty,
                        ty,
                        source,
                    })));
                }
                ast::Clause::Let(b) => {
                    let value = self.lower_expr(&b.value)?;
                    let ty = self.lower_opt_type(b.ty.as_ref())?;
                    let var = self.declare(&b.var)?;
                    clauses.push(ClauseIR::Let(Rc::new(LetIR { var, ty, value })));
                }
                ast::Clause::Window(w) => {
                    clauses.push(ClauseIR::Window(Rc::new(self.lower_window(w)?)));
                }
                ast::Clause::Where(cond) => {
                    clauses.push(ClauseIR::Where(Rc::new(self.lower_expr(cond)?)));
                }
                ast::Clause::Count(q) => {
                    let slot = self.declare(q)?;
                    clauses.push(ClauseIR::Count(slot));
                }
                ast::Clause::GroupBy(specs) => self.lower_group_by(specs, &mut clauses)?,
                ast::Clause::OrderBy(ob) => {
                    let mut specs = Vec::with_capacity(ob.specs.len());
                    for s in &ob.specs {
                        specs.push(OrderSpecIR {
                            key: self.lower_expr(&s.key)?,
                            descending: s.descending,
                            empty: s.empty.unwrap_or(self.static_ctx.default_empty_order),
                            collation: s.collation.clone(),
                        });
                    }
                    if specs.is_empty() {
                        return Err(static_err(ErrorCode::XPST0003, "order by without specs"));
                    }
                    clauses.push(ClauseIR::OrderBy(Rc::new(OrderByIR { specs })));
                }
            }
        }
        let return_expr = self.lower_expr(&f.return_expr)?;
        Ok(FlworIR {
            clauses,
            return_expr,
        })
    }

    fn lower_group_by(
        &mut self,
        specs: &[ast::GroupingSpec],
        clauses: &mut Vec<ClauseIR>,
    ) -> CResult<()> {
        if specs.is_empty() {
            return Err(static_err(ErrorCode::XPST0003, "group by without grouping specs"));
        }
        let base = self.flwor_base.last().copied().unwrap_or(0);
        // Every `$k := E` becomes a let first; the key names are then resolved
        // in the resulting scope, so `group by $y, $y := E` has a single key:
        // the last binding of $y.
        for spec in specs {
            if let Some(value) = &spec.value {
                let value = self.lower_expr(value)?;
                let var = self.declare(&spec.var)?;
                clauses.push(ClauseIR::Let(Rc::new(LetIR {
                    var,
                    ty: None,
                    value,
                })));
            }
        }
        let mut keys: Vec<GroupingKeyIR> = Vec::with_capacity(specs.len());
        for spec in specs {
            let name = self.var_name(&spec.var)?;
            let slot = self.lookup_local(&VarKey::from(&name), base).ok_or_else(|| {
                static_err(
                    ErrorCode::XQST0094,
                    format!("grouping variable ${name} is not bound by this FLWOR"),
                )
            })?;
            if keys.iter().any(|k| k.slot == slot) {
                continue;
            }
            keys.push(GroupingKeyIR {
                slot,
                collation: spec.collation.clone(),
            });
        }
        let mut rebound: Vec<Slot> = Vec::new();
        let mut seen: Vec<&VarKey> = Vec::new();
        for (key, slot) in self.scopes[base..].iter().rev() {
            if seen.contains(&key) {
                continue;
            }
            seen.push(key);
            if !keys.iter().any(|k| k.slot == *slot) {
                rebound.push(*slot);
            }
        }
        rebound.sort_unstable();
        clauses.push(ClauseIR::GroupBy(Rc::new(GroupByIR { keys, rebound })));
        Ok(())
    }

    fn lower_window(&mut self, w: &ast::WindowClause) -> CResult<WindowIR> {
        let mut names = vec![self.var_name(&w.var)?];
        let mut cond_vars = vec![&w.start.vars];
        if let Some(end) = &w.end {
            cond_vars.push(&end.condition.vars);
        }
        for vars in cond_vars {
            for q in [&vars.current, &vars.position, &vars.previous, &vars.next]
                .into_iter()
                .flatten()
            {
                let n = self.var_name(q)?;
                if names.contains(&n) {
                    return Err(static_err(
                        ErrorCode::XQST0103,
                        format!("window variable ${n} is declared more than once"),
                    ));
                }
                names.push(n);
            }
        }
        if w.kind == ast::WindowKind::Sliding && w.end.is_none() {
            return Err(static_err(
                ErrorCode::XPST0003,
                "sliding window requires an end condition",
            ));
        }
        let source = self.lower_expr(&w.in_expr)?;
        let ty = self.lower_opt_type(w.ty.as_ref())?;
        let start = self.lower_window_condition(&w.start)?;
        let end = match &w.end {
            Some(e) => Some(WindowEndIR {
                only: e.only,
                condition: self.lower_window_condition(&e.condition)?,
            }),
            None => None,
        };
        let var = self.declare(&w.var)?;
        Ok(WindowIR {
            kind: w.kind,
            var,
            ty,
            source,
            start,
            end,
        })
    }

    fn lower_window_condition(&mut self, c: &ast::WindowCondition) -> CResult<WindowConditionIR> {
        let v = &c.vars;
        let current = v.current.as_ref().map(|q| self.declare(q)).transpose()?;
        let position = v.position.as_ref().map(|q| self.declare(q)).transpose()?;
        let previous = v.previous.as_ref().map(|q| self.declare(q)).transpose()?;
        let next = v.next.as_ref().map(|q| self.declare(q)).transpose()?;
        Ok(WindowConditionIR {
            current,
            position,
            previous,
            next,
            when: self.lower_expr(&c.when)?,
        })
    }

    // ===== switch / typeswitch =====

    fn lower_switch(&mut self, s: &ast::Switch) -> CResult<SwitchIR> {
        if s.cases.is_empty() || s.cases.iter().any(|c| c.values.is_empty()) {
            return Err(static_err(ErrorCode::XPST0003, "switch requires at least one case"));
        }
        let operand = self.lower_expr(&s.operand)?;
        let mut cases = Vec::with_capacity(s.cases.len());
        for case in &s.cases {
            cases.push(SwitchCaseIR {
                values: self.lower_exprs(&case.values)?,
                ret: self.lower_expr(&case.ret)?,
            });
        }
        Ok(SwitchIR {
            operand,
            cases,
            default: self.lower_expr(&s.default)?,
        })
    }

    fn lower_typeswitch(&mut self, t: &ast::Typeswitch) -> CResult<TypeswitchIR> {
        if t.cases.is_empty() || t.cases.iter().any(|c| c.types.is_empty()) {
            return Err(static_err(ErrorCode::XPST0003, "typeswitch requires at least one case"));
        }
        let operand = self.lower_expr(&t.operand)?;
        let mut cases = Vec::with_capacity(t.cases.len());
        for case in &t.cases {
            let types = case
                .types
                .iter()
                .map(|ty| self.lower_seq_type(ty))
                .collect::<CResult<Vec<_>>>()?;
            let (var, ret) = self.scoped(|c| {
                let var = case.var.as_ref().map(|q| c.declare(q)).transpose()?;
                Ok((var, c.lower_expr(&case.ret)?))
            })?;
            cases.push(TypeswitchCaseIR { var, types, ret });
        }
        let (default_var, default) = self.scoped(|c| {
            let var = t.default_var.as_ref().map(|q| c.declare(q)).transpose()?;
            Ok((var, c.lower_expr(&t.default)?))
        })?;
        Ok(TypeswitchIR {
            operand,
            cases,
            default_var,
            default,
        })
    }
}
