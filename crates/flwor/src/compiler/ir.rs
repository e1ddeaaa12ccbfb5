use crate::ast::{ArithOp, ComparisonOp, EmptyOrder, NodeComp, Occurrence, WindowKind};
use crate::engine::runtime::StaticContext;
use crate::model::NodeKind;
use crate::xdm::{AtomicType, ExpandedName, XdmAtomicValue};
use std::rc::Rc;
use std::sync::Arc;

/// Index into a tuple's slot vector.
pub type Slot = usize;

#[derive(Debug, Clone, PartialEq)]
pub enum IrExpr {
    Literal(XdmAtomicValue),
    Empty,
    Local(Slot),
    /// Index into [`CompiledQuery::globals`].
    Global(usize),
    ContextItem,
    Position,
    Last,
    Sequence(Vec<IrExpr>),
    Range(Box<IrExpr>, Box<IrExpr>),
    Arith {
        op: ArithOp,
        left: Box<IrExpr>,
        right: Box<IrExpr>,
    },
    Negate(Box<IrExpr>),
    And(Box<IrExpr>, Box<IrExpr>),
    Or(Box<IrExpr>, Box<IrExpr>),
    ValueCompare {
        op: ComparisonOp,
        left: Box<IrExpr>,
        right: Box<IrExpr>,
    },
    GeneralCompare {
        op: ComparisonOp,
        left: Box<IrExpr>,
        right: Box<IrExpr>,
    },
    NodeCompare {
        op: NodeComp,
        left: Box<IrExpr>,
        right: Box<IrExpr>,
    },
    If {
        cond: Box<IrExpr>,
        then_branch: Box<IrExpr>,
        else_branch: Box<IrExpr>,
    },
    Call {
        name: ExpandedName,
        args: Vec<IrExpr>,
    },
    Filter {
        base: Box<IrExpr>,
        predicates: Vec<IrExpr>,
    },
    Flwor(Rc<FlworIR>),
    Switch(Rc<SwitchIR>),
    Typeswitch(Rc<TypeswitchIR>),
    InstanceOf {
        expr: Box<IrExpr>,
        ty: SeqTypeIR,
    },
    Cast {
        expr: Box<IrExpr>,
        target: AtomicType,
        optional: bool,
    },
    InlineFunction {
        params: Vec<Slot>,
        body: Rc<IrExpr>,
    },
    FunctionRef {
        name: ExpandedName,
        arity: usize,
    },
    DynamicCall {
        func: Box<IrExpr>,
        args: Vec<IrExpr>,
    },
    Unordered(Box<IrExpr>),
}

// ===== types =====

#[derive(Debug, Clone, PartialEq)]
pub enum ItemTypeIR {
    AnyItem,
    Atomic(AtomicType),
    AnyNode,
    Kind {
        kind: NodeKind,
        name: Option<ExpandedName>,
    },
    AnyFunction,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SeqTypeIR {
    EmptySequence,
    Typed { item: ItemTypeIR, occ: Occurrence },
}

// ===== FLWOR =====

#[derive(Debug, Clone, PartialEq)]
pub struct FlworIR {
    pub clauses: Vec<ClauseIR>,
    pub return_expr: IrExpr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClauseIR {
    For(Rc<ForIR>),
    Let(Rc<LetIR>),
    Window(Rc<WindowIR>),
    Where(Rc<IrExpr>),
    Count(Slot),
    GroupBy(Rc<GroupByIR>),
    OrderBy(Rc<OrderByIR>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForIR {
    pub var: Slot,
    pub position: Option<Slot>,
    pub allowing_empty: bool,
    pub ty: Option<SeqTypeIR>,
    pub source: IrExpr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LetIR {
    pub var: Slot,
    pub ty: Option<SeqTypeIR>,
    pub value: IrExpr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WindowConditionIR {
    pub current: Option<Slot>,
    pub position: Option<Slot>,
    pub previous: Option<Slot>,
    pub next: Option<Slot>,
    pub when: IrExpr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WindowEndIR {
    pub only: bool,
    pub condition: WindowConditionIR,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WindowIR {
    pub kind: WindowKind,
    pub var: Slot,
    pub ty: Option<SeqTypeIR>,
    pub source: IrExpr,
    pub start: WindowConditionIR,
    pub end: Option<WindowEndIR>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupingKeyIR {
    pub slot: Slot,
    pub collation: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupByIR {
    pub keys: Vec<GroupingKeyIR>,
    /// Variables of the same FLWOR that are not keys; rebound to the
    /// concatenation of their values across each partition.
    pub rebound: Vec<Slot>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderSpecIR {
    pub key: IrExpr,
    pub descending: bool,
    pub empty: EmptyOrder,
    pub collation: Option<String>,
}

/// Every sort is stable, so `stable order by` and `order by` lower alike.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderByIR {
    pub specs: Vec<OrderSpecIR>,
}

// ===== switch / typeswitch =====

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCaseIR {
    pub values: Vec<IrExpr>,
    pub ret: IrExpr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchIR {
    pub operand: IrExpr,
    pub cases: Vec<SwitchCaseIR>,
    pub default: IrExpr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeswitchCaseIR {
    pub var: Option<Slot>,
    pub types: Vec<SeqTypeIR>,
    pub ret: IrExpr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeswitchIR {
    pub operand: IrExpr,
    pub cases: Vec<TypeswitchCaseIR>,
    pub default_var: Option<Slot>,
    pub default: IrExpr,
}

// ===== prolog =====

#[derive(Debug, Clone, PartialEq)]
pub enum GlobalInit {
    Expr(IrExpr),
    /// Supplied by the dynamic context; the default applies when it is absent.
    External(Option<IrExpr>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct GlobalIR {
    pub name: ExpandedName,
    pub ty: Option<SeqTypeIR>,
    pub init: GlobalInit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContextItemIR {
    pub ty: Option<ItemTypeIR>,
    pub init: GlobalInit,
}

/// Result of compilation; cheap to clone and reusable across evaluations.
#[derive(Debug, Clone)]
pub struct CompiledQuery {
    pub globals: Rc<[GlobalIR]>,
    pub context_item: Option<Rc<ContextItemIR>>,
    pub body: Rc<IrExpr>,
    /// Slots needed by the largest tuple of this query.
    pub frame_size: usize,
    pub static_ctx: Arc<StaticContext>,
}
