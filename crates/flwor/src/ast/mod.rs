//! Query AST handed over by the parser.
//!
//! Names are still lexical (`prefix:local`); the compiler resolves prefixes
//! and variable references. [`builder`] offers terse constructors for hosts
//! and tests that assemble trees by hand.

pub mod builder;

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Integer(i64),
    Decimal(rust_decimal::Decimal),
    Double(f64),
    String(String),
    Boolean(bool),
    UntypedAtomic(String),
    EmptySequence,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    IDiv,
    Mod,
}

/// Shared by value comparisons (`eq`, `lt`, ...) and general comparisons (`=`, `<`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeComp {
    Is,
    Precedes,
    Follows,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    pub prefix: Option<String>,
    pub local: String,
}

impl QName {
    pub fn new(prefix: Option<&str>, local: &str) -> Self {
        Self {
            prefix: prefix.map(str::to_string),
            local: local.to_string(),
        }
    }
}

impl From<&str> for QName {
    /// `"p:x"` becomes prefix `p`, local `x`; `"x"` has no prefix.
    fn from(s: &str) -> Self {
        match s.split_once(':') {
            Some((p, l)) => QName::new(Some(p), l),
            None => QName::new(None, s),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    VarRef(QName),
    ContextItem,
    Sequence(Vec<Expr>),
    Range {
        start: Box<Expr>,
        end: Box<Expr>,
    },
    Arithmetic {
        left: Box<Expr>,
        op: ArithOp,
        right: Box<Expr>,
    },
    Negate(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    ValueComparison {
        left: Box<Expr>,
        op: ComparisonOp,
        right: Box<Expr>,
    },
    GeneralComparison {
        left: Box<Expr>,
        op: ComparisonOp,
        right: Box<Expr>,
    },
    NodeComparison {
        left: Box<Expr>,
        op: NodeComp,
        right: Box<Expr>,
    },
    IfThenElse {
        cond: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },
    FunctionCall {
        name: QName,
        args: Vec<Expr>,
    },
    /// `base[p1][p2]...`
    Filter {
        base: Box<Expr>,
        predicates: Vec<Expr>,
    },
    Flwor(Box<Flwor>),
    Switch(Box<Switch>),
    Typeswitch(Box<Typeswitch>),
    InstanceOf {
        expr: Box<Expr>,
        ty: SequenceType,
    },
    CastAs {
        expr: Box<Expr>,
        ty: SingleType,
    },
    InlineFunction {
        params: Vec<QName>,
        body: Box<Expr>,
    },
    /// `name#arity`
    NamedFunctionRef {
        name: QName,
        arity: usize,
    },
    DynamicCall {
        func: Box<Expr>,
        args: Vec<Expr>,
    },
    Unordered(Box<Expr>),
}

// ===== FLWOR =====

#[derive(Debug, Clone, PartialEq)]
pub struct Flwor {
    pub clauses: Vec<Clause>,
    pub return_expr: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    For(ForBinding),
    Let(LetBinding),
    Window(WindowClause),
    Where(Expr),
    GroupBy(Vec<GroupingSpec>),
    OrderBy(OrderByClause),
    Count(QName),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForBinding {
    pub var: QName,
    pub ty: Option<SequenceType>,
    pub allowing_empty: bool,
    pub position: Option<QName>,
    pub in_expr: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LetBinding {
    pub var: QName,
    pub ty: Option<SequenceType>,
    pub value: Expr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowKind {
    Tumbling,
    Sliding,
}

/// Variables of a window `start`/`end` condition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WindowVars {
    pub current: Option<QName>,
    pub position: Option<QName>,
    pub previous: Option<QName>,
    pub next: Option<QName>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WindowCondition {
    pub vars: WindowVars,
    pub when: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WindowEnd {
    /// `only end`: windows that never meet the end condition are dropped.
    pub only: bool,
    pub condition: WindowCondition,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WindowClause {
    pub kind: WindowKind,
    pub var: QName,
    pub ty: Option<SequenceType>,
    pub in_expr: Expr,
    pub start: WindowCondition,
    pub end: Option<WindowEnd>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupingSpec {
    pub var: QName,
    /// `group by $k := E`
    pub value: Option<Expr>,
    pub collation: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EmptyOrder {
    #[default]
    Least,
    Greatest,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderSpec {
    pub key: Expr,
    pub descending: bool,
    /// `None` uses the default from the static context.
    pub empty: Option<EmptyOrder>,
    pub collation: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderByClause {
    pub stable: bool,
    pub specs: Vec<OrderSpec>,
}

// ===== switch / typeswitch =====

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCase {
    pub values: Vec<Expr>,
    pub ret: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Switch {
    pub operand: Expr,
    pub cases: Vec<SwitchCase>,
    pub default: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeswitchCase {
    pub var: Option<QName>,
    /// Alternatives of a union case (`case A | B`).
    pub types: Vec<SequenceType>,
    pub ret: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Typeswitch {
    pub operand: Expr,
    pub cases: Vec<TypeswitchCase>,
    pub default_var: Option<QName>,
    pub default: Expr,
}

// ===== Types =====

#[derive(Debug, Clone, PartialEq)]
pub struct SingleType {
    pub atomic: QName,
    pub optional: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occurrence {
    One,
    ZeroOrOne,
    ZeroOrMore,
    OneOrMore,
}

#[derive(Debug, Clone, PartialEq)]
pub enum KindTest {
    AnyKind,
    Document,
    Element(Option<QName>),
    Attribute(Option<QName>),
    Text,
    Comment,
    ProcessingInstruction,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ItemType {
    Item,
    Atomic(QName),
    Kind(KindTest),
    AnyFunction,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SequenceType {
    EmptySequence,
    Typed { item: ItemType, occ: Occurrence },
}

// ===== Prolog =====

#[derive(Debug, Clone, PartialEq)]
pub enum VarValue {
    Expr(Expr),
    /// `external`, with an optional default value.
    External(Option<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub name: QName,
    pub ty: Option<SequenceType>,
    pub value: VarValue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContextItemDecl {
    pub ty: Option<ItemType>,
    pub value: VarValue,
}

/// A main module: prolog declarations followed by the query body.
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    pub namespaces: Vec<(String, String)>,
    pub default_function_namespace: Option<String>,
    pub context_item: Option<ContextItemDecl>,
    pub variables: Vec<VarDecl>,
    pub body: Expr,
}

impl Module {
    /// Module without prolog.
    pub fn main(body: Expr) -> Self {
        Self {
            namespaces: Vec::new(),
            default_function_namespace: None,
            context_item: None,
            variables: Vec::new(),
            body,
        }
    }
}

impl From<Expr> for Module {
    fn from(body: Expr) -> Self {
        Module::main(body)
    }
}
