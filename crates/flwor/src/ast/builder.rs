//! Terse AST constructors.
//!
//! ```
//! use xquery_flwor::builder::*;
//!
//! // for $x at $p in (1 to 3) where $x gt 1 return $p
//! let q = flwor()
//!     .for_binding(ForBinding::new("x", range(int(1), int(3))).at("p"))
//!     .where_(var("x").val_gt(int(1)))
//!     .return_(var("p"));
//! # let _ = q;
//! ```
pub use super::{
    ArithOp, Clause, ComparisonOp, ContextItemDecl, EmptyOrder, Expr, Flwor, ForBinding,
    GroupingSpec, ItemType, KindTest, LetBinding, Literal, Module, NodeComp, Occurrence,
    OrderByClause, OrderSpec, QName, SequenceType, SingleType, Switch, SwitchCase, Typeswitch,
    TypeswitchCase, VarDecl, VarValue, WindowClause, WindowCondition, WindowEnd, WindowKind,
    WindowVars,
};

// ===== literals and primaries =====

pub fn int(i: i64) -> Expr {
    Expr::Literal(Literal::Integer(i))
}
pub fn dec(d: rust_decimal::Decimal) -> Expr {
    Expr::Literal(Literal::Decimal(d))
}
pub fn dbl(d: f64) -> Expr {
    Expr::Literal(Literal::Double(d))
}
pub fn string(s: &str) -> Expr {
    Expr::Literal(Literal::String(s.to_string()))
}
pub fn untyped(s: &str) -> Expr {
    Expr::Literal(Literal::UntypedAtomic(s.to_string()))
}
pub fn boolean(b: bool) -> Expr {
    Expr::Literal(Literal::Boolean(b))
}
pub fn empty() -> Expr {
    Expr::Literal(Literal::EmptySequence)
}
pub fn var(name: &str) -> Expr {
    Expr::VarRef(name.into())
}
/// The context item `.`
pub fn dot() -> Expr {
    Expr::ContextItem
}
pub fn seq(items: Vec<Expr>) -> Expr {
    Expr::Sequence(items)
}
pub fn range(start: Expr, end: Expr) -> Expr {
    Expr::Range {
        start: Box::new(start),
        end: Box::new(end),
    }
}
pub fn call(name: &str, args: Vec<Expr>) -> Expr {
    Expr::FunctionCall {
        name: name.into(),
        args,
    }
}
pub fn if_then_else(cond: Expr, then_expr: Expr, else_expr: Expr) -> Expr {
    Expr::IfThenElse {
        cond: Box::new(cond),
        then_expr: Box::new(then_expr),
        else_expr: Box::new(else_expr),
    }
}
pub fn filter(base: Expr, predicates: Vec<Expr>) -> Expr {
    Expr::Filter {
        base: Box::new(base),
        predicates,
    }
}
pub fn inline_fn(params: &[&str], body: Expr) -> Expr {
    Expr::InlineFunction {
        params: params.iter().map(|p| QName::from(*p)).collect(),
        body: Box::new(body),
    }
}
pub fn func_ref(name: &str, arity: usize) -> Expr {
    Expr::NamedFunctionRef {
        name: name.into(),
        arity,
    }
}
pub fn dynamic_call(func: Expr, args: Vec<Expr>) -> Expr {
    Expr::DynamicCall {
        func: Box::new(func),
        args,
    }
}
pub fn instance_of(expr: Expr, ty: SequenceType) -> Expr {
    Expr::InstanceOf {
        expr: Box::new(expr),
        ty,
    }
}
/// `expr cast as T` (`T?` when `optional`).
pub fn cast_as(expr: Expr, atomic: &str, optional: bool) -> Expr {
    Expr::CastAs {
        expr: Box::new(expr),
        ty: SingleType {
            atomic: atomic.into(),
            optional,
        },
    }
}
pub fn unordered(expr: Expr) -> Expr {
    Expr::Unordered(Box::new(expr))
}

// Operator methods; named to avoid clashing with `std::ops`.
impl Expr {
    fn arith(self, op: ArithOp, rhs: Expr) -> Expr {
        Expr::Arithmetic {
            left: Box::new(self),
            op,
            right: Box::new(rhs),
        }
    }
    pub fn plus(self, rhs: Expr) -> Expr {
        self.arith(ArithOp::Add, rhs)
    }
    pub fn minus(self, rhs: Expr) -> Expr {
        self.arith(ArithOp::Sub, rhs)
    }
    pub fn times(self, rhs: Expr) -> Expr {
        self.arith(ArithOp::Mul, rhs)
    }
    pub fn divide(self, rhs: Expr) -> Expr {
        self.arith(ArithOp::Div, rhs)
    }
    pub fn idiv(self, rhs: Expr) -> Expr {
        self.arith(ArithOp::IDiv, rhs)
    }
    pub fn modulo(self, rhs: Expr) -> Expr {
        self.arith(ArithOp::Mod, rhs)
    }
    pub fn negated(self) -> Expr {
        Expr::Negate(Box::new(self))
    }
    pub fn and(self, rhs: Expr) -> Expr {
        Expr::And(Box::new(self), Box::new(rhs))
    }
    pub fn or(self, rhs: Expr) -> Expr {
        Expr::Or(Box::new(self), Box::new(rhs))
    }
    pub fn value_cmp(self, op: ComparisonOp, rhs: Expr) -> Expr {
        Expr::ValueComparison {
            left: Box::new(self),
            op,
            right: Box::new(rhs),
        }
    }
    pub fn general_cmp(self, op: ComparisonOp, rhs: Expr) -> Expr {
        Expr::GeneralComparison {
            left: Box::new(self),
            op,
            right: Box::new(rhs),
        }
    }
    pub fn node_cmp(self, op: NodeComp, rhs: Expr) -> Expr {
        Expr::NodeComparison {
            left: Box::new(self),
            op,
            right: Box::new(rhs),
        }
    }
    /// `self eq rhs`
    pub fn val_eq(self, rhs: Expr) -> Expr {
        self.value_cmp(ComparisonOp::Eq, rhs)
    }
    /// `self gt rhs`
    pub fn val_gt(self, rhs: Expr) -> Expr {
        self.value_cmp(ComparisonOp::Gt, rhs)
    }
}

// ===== types =====

fn typed(item: ItemType) -> SequenceType {
    SequenceType::Typed {
        item,
        occ: Occurrence::One,
    }
}

/// Exactly one atomic value of the named type, e.g. `atomic_type("xs:integer")`.
pub fn atomic_type(name: &str) -> SequenceType {
    typed(ItemType::Atomic(name.into()))
}
pub fn item_type() -> SequenceType {
    typed(ItemType::Item)
}
pub fn kind_type(kind: KindTest) -> SequenceType {
    typed(ItemType::Kind(kind))
}
pub fn function_type() -> SequenceType {
    typed(ItemType::AnyFunction)
}
pub fn empty_type() -> SequenceType {
    SequenceType::EmptySequence
}

impl SequenceType {
    fn with_occ(self, occ: Occurrence) -> Self {
        match self {
            SequenceType::Typed { item, .. } => SequenceType::Typed { item, occ },
            e => e,
        }
    }
    /// `T?`
    pub fn optional(self) -> Self {
        self.with_occ(Occurrence::ZeroOrOne)
    }
    /// `T*`
    pub fn star(self) -> Self {
        self.with_occ(Occurrence::ZeroOrMore)
    }
    /// `T+`
    pub fn one_or_more(self) -> Self {
        self.with_occ(Occurrence::OneOrMore)
    }
}

// ===== FLWOR =====

#[derive(Default)]
pub struct FlworBuilder {
    clauses: Vec<Clause>,
}

pub fn flwor() -> FlworBuilder {
    FlworBuilder::default()
}

impl FlworBuilder {
    pub fn clause(mut self, clause: Clause) -> Self {
        self.clauses.push(clause);
        self
    }
    /// `for $var in in_expr`
    pub fn for_(self, var: &str, in_expr: Expr) -> Self {
        self.clause(Clause::For(ForBinding::new(var, in_expr)))
    }
    pub fn for_binding(self, binding: ForBinding) -> Self {
        self.clause(Clause::For(binding))
    }
    pub fn let_(self, var: &str, value: Expr) -> Self {
        self.clause(Clause::Let(LetBinding::new(var, value)))
    }
    pub fn let_binding(self, binding: LetBinding) -> Self {
        self.clause(Clause::Let(binding))
    }
    pub fn window(self, window: WindowClause) -> Self {
        self.clause(Clause::Window(window))
    }
    pub fn where_(self, cond: Expr) -> Self {
        self.clause(Clause::Where(cond))
    }
    pub fn group_by(self, specs: Vec<GroupingSpec>) -> Self {
        self.clause(Clause::GroupBy(specs))
    }
    pub fn order_by(self, specs: Vec<OrderSpec>) -> Self {
        self.clause(Clause::OrderBy(OrderByClause {
            stable: false,
            specs,
        }))
    }
    pub fn stable_order_by(self, specs: Vec<OrderSpec>) -> Self {
        self.clause(Clause::OrderBy(OrderByClause { stable: true, specs }))
    }
    pub fn count(self, var: &str) -> Self {
        self.clause(Clause::Count(var.into()))
    }
    pub fn return_(self, expr: Expr) -> Expr {
        Expr::Flwor(Box::new(Flwor {
            clauses: self.clauses,
            return_expr: expr,
        }))
    }
}

impl ForBinding {
    pub fn new(var: &str, in_expr: Expr) -> Self {
        Self {
            var: var.into(),
            ty: None,
            allowing_empty: false,
            position: None,
            in_expr,
        }
    }
    pub fn allowing_empty(mut self) -> Self {
        self.allowing_empty = true;
        self
    }
    /// Positional variable: `at $pos`.
    pub fn at(mut self, pos: &str) -> Self {
        self.position = Some(pos.into());
        self
    }
    pub fn typed(mut self, ty: SequenceType) -> Self {
        self.ty = Some(ty);
        self
    }
}

impl LetBinding {
    pub fn new(var: &str, value: Expr) -> Self {
        Self {
            var: var.into(),
            ty: None,
            value,
        }
    }
    pub fn typed(mut self, ty: SequenceType) -> Self {
        self.ty = Some(ty);
        self
    }
}

impl GroupingSpec {
    /// `group by $name` over an existing variable.
    pub fn var(name: &str) -> Self {
        Self {
            var: name.into(),
            value: None,
            collation: None,
        }
    }
    /// `group by $name := value`
    pub fn value(mut self, value: Expr) -> Self {
        self.value = Some(value);
        self
    }
    pub fn collation(mut self, uri: &str) -> Self {
        self.collation = Some(uri.to_string());
        self
    }
}

impl OrderSpec {
    pub fn new(key: Expr) -> Self {
        Self {
            key,
            descending: false,
            empty: None,
            collation: None,
        }
    }
    pub fn descending(mut self) -> Self {
        self.descending = true;
        self
    }
    pub fn empty_greatest(mut self) -> Self {
        self.empty = Some(EmptyOrder::Greatest);
        self
    }
    pub fn empty_least(mut self) -> Self {
        self.empty = Some(EmptyOrder::Least);
        self
    }
    pub fn collation(mut self, uri: &str) -> Self {
        self.collation = Some(uri.to_string());
        self
    }
}

impl WindowCondition {
    pub fn when(expr: Expr) -> Self {
        Self {
            vars: WindowVars::default(),
            when: expr,
        }
    }
    /// The condition's current item variable.
    pub fn current(mut self, name: &str) -> Self {
        self.vars.current = Some(name.into());
        self
    }
    pub fn at(mut self, name: &str) -> Self {
        self.vars.position = Some(name.into());
        self
    }
    pub fn previous(mut self, name: &str) -> Self {
        self.vars.previous = Some(name.into());
        self
    }
    pub fn next(mut self, name: &str) -> Self {
        self.vars.next = Some(name.into());
        self
    }
}

impl WindowClause {
    fn new(kind: WindowKind, var: &str, in_expr: Expr, start: WindowCondition) -> Self {
        Self {
            kind,
            var: var.into(),
            ty: None,
            in_expr,
            start,
            end: None,
        }
    }
    pub fn tumbling(var: &str, in_expr: Expr, start: WindowCondition) -> Self {
        Self::new(WindowKind::Tumbling, var, in_expr, start)
    }
    pub fn sliding(var: &str, in_expr: Expr, start: WindowCondition) -> Self {
        Self::new(WindowKind::Sliding, var, in_expr, start)
    }
    pub fn end(mut self, condition: WindowCondition) -> Self {
        self.end = Some(WindowEnd {
            only: false,
            condition,
        });
        self
    }
    pub fn only_end(mut self, condition: WindowCondition) -> Self {
        self.end = Some(WindowEnd {
            only: true,
            condition,
        });
        self
    }
    pub fn typed(mut self, ty: SequenceType) -> Self {
        self.ty = Some(ty);
        self
    }
}

// ===== switch / typeswitch =====

pub struct SwitchBuilder {
    operand: Expr,
    cases: Vec<SwitchCase>,
}

pub fn switch(operand: Expr) -> SwitchBuilder {
    SwitchBuilder {
        operand,
        cases: Vec::new(),
    }
}

impl SwitchBuilder {
    /// `case v1 case v2 ... return ret`
    pub fn case(mut self, values: Vec<Expr>, ret: Expr) -> Self {
        self.cases.push(SwitchCase { values, ret });
        self
    }
    pub fn default(self, default: Expr) -> Expr {
        Expr::Switch(Box::new(Switch {
            operand: self.operand,
            cases: self.cases,
            default,
        }))
    }
}

pub struct TypeswitchBuilder {
    operand: Expr,
    cases: Vec<TypeswitchCase>,
}

pub fn typeswitch(operand: Expr) -> TypeswitchBuilder {
    TypeswitchBuilder {
        operand,
        cases: Vec::new(),
    }
}

impl TypeswitchBuilder {
    pub fn case(mut self, var: Option<&str>, types: Vec<SequenceType>, ret: Expr) -> Self {
        self.cases.push(TypeswitchCase {
            var: var.map(QName::from),
            types,
            ret,
        });
        self
    }
    pub fn default(self, var: Option<&str>, default: Expr) -> Expr {
        Expr::Typeswitch(Box::new(Typeswitch {
            operand: self.operand,
            cases: self.cases,
            default_var: var.map(QName::from),
            default,
        }))
    }
}

// ===== prolog =====

impl Module {
    pub fn declare_namespace(mut self, prefix: &str, uri: &str) -> Self {
        self.namespaces.push((prefix.to_string(), uri.to_string()));
        self
    }
    pub fn default_function_namespace(mut self, uri: &str) -> Self {
        self.default_function_namespace = Some(uri.to_string());
        self
    }
    pub fn declare_variable(mut self, name: &str, ty: Option<SequenceType>, value: Expr) -> Self {
        self.variables.push(VarDecl {
            name: name.into(),
            ty,
            value: VarValue::Expr(value),
        });
        self
    }
    pub fn declare_external(
        mut self,
        name: &str,
        ty: Option<SequenceType>,
        default: Option<Expr>,
    ) -> Self {
        self.variables.push(VarDecl {
            name: name.into(),
            ty,
            value: VarValue::External(default),
        });
        self
    }
    pub fn declare_context_item(mut self, ty: Option<ItemType>, value: VarValue) -> Self {
        self.context_item = Some(ContextItemDecl { ty, value });
        self
    }
}
