//! Clause-pipeline evaluator for XQuery FLWOR, switch and typeswitch expressions.
//!
//! The crate consumes an already parsed [`ast::Module`], resolves variable names
//! to slots ([`compiler`]) and evaluates the result as a lazy, pull-based tuple
//! pipeline ([`engine`]). Values follow a reduced XDM model ([`xdm`]); nodes are
//! provided by the host through the [`model::XdmNode`] trait.

pub mod ast;
pub mod compiler;
pub mod consts;
pub mod engine;
pub mod model;
pub mod xdm;

pub use ast::builder;
pub use compiler::ir::CompiledQuery;
pub use compiler::{compile, compile_expr, compile_with_context};
pub use engine::evaluator::{ResultStream, evaluate, evaluate_expr, evaluate_stream};
pub use engine::runtime::{
    DynamicContext, DynamicContextBuilder, Error, ErrorCode, StaticContext, StaticContextBuilder,
};
pub use model::simple::{SimpleNode, SimpleNodeBuilder, attr, doc as simple_doc, elem, text};
pub use model::{NodeKind, QName, XdmNode};
pub use xdm::{AtomicType, ExpandedName, XdmAtomicValue, XdmItem, XdmSequence};
