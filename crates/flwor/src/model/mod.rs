//! Node contract for the tree collaborator.
//!
//! The evaluator never navigates trees itself: it only atomizes nodes and asks
//! for document order when a node comparison (`is`, `<<`, `>>`) is evaluated.

use crate::engine::runtime::{Error, ErrorCode};
use crate::xdm::XdmAtomicValue;
use core::cmp::Ordering;

pub mod simple;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Document,
    Element,
    Attribute,
    Text,
    Comment,
    ProcessingInstruction,
    Namespace,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    pub prefix: Option<String>,
    pub local: String,
    pub ns_uri: Option<String>,
}

/// Fallback comparator for document order based on ancestry and stable sibling order.
///
/// - If one node is an ancestor of the other, the ancestor precedes the descendant.
/// - Among siblings, attributes come first, then namespaces, then child nodes; within
///   each group the order provided by the adapter is preserved.
/// - Nodes of different roots cannot be ordered here (`err:FOER0000`); adapters with
///   multi-root trees override [`XdmNode::compare_document_order`].
pub fn try_compare_by_ancestry<N: XdmNode>(a: &N, b: &N) -> Result<Ordering, Error> {
    if a == b {
        return Ok(Ordering::Equal);
    }
    fn path_to_root<N: XdmNode>(mut n: N) -> Vec<N> {
        let mut p = vec![n.clone()];
        while let Some(parent) = n.parent() {
            p.push(parent.clone());
            n = parent;
        }
        p.reverse();
        p
    }
    let pa = path_to_root(a.clone());
    let pb = path_to_root(b.clone());
    let len = core::cmp::min(pa.len(), pb.len());
    let mut i = 0usize;
    while i < len && pa[i] == pb[i] {
        i += 1;
    }
    if i == len {
        return Ok(if pa.len() < pb.len() {
            Ordering::Less
        } else {
            Ordering::Greater
        });
    }
    if i == 0 {
        return Err(Error::from_code(
            ErrorCode::FOER0000,
            "document order requires adapter: nodes from different roots",
        ));
    }
    let parent = &pa[i - 1];
    let mut sibs: Vec<N> = Vec::new();
    sibs.extend(parent.attributes());
    sibs.extend(parent.namespaces());
    sibs.extend(parent.children());
    let posa = sibs.iter().position(|n| n == &pa[i]);
    let posb = sibs.iter().position(|n| n == &pb[i]);
    Ok(match (posa, posb) {
        (Some(x), Some(y)) => x.cmp(&y),
        _ => Ordering::Equal,
    })
}

pub trait XdmNode: Clone + Eq + core::fmt::Debug + Send + Sync + 'static {
    fn kind(&self) -> NodeKind;
    fn name(&self) -> Option<QName>;
    fn string_value(&self) -> String;

    /// Typed value used by atomization. Untyped trees yield `xs:untypedAtomic`.
    fn typed_value(&self) -> Vec<XdmAtomicValue> {
        vec![XdmAtomicValue::UntypedAtomic(self.string_value())]
    }

    fn parent(&self) -> Option<Self>;
    fn children(&self) -> Vec<Self>;
    fn attributes(&self) -> Vec<Self>;
    fn namespaces(&self) -> Vec<Self> {
        Vec::new()
    }

    fn compare_document_order(&self, other: &Self) -> Result<Ordering, Error> {
        try_compare_by_ancestry(self, other)
    }
}
