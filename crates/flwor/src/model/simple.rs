//! Simple in-memory tree implementing [`XdmNode`], used in tests and quick prototypes.
//!
//! ```
//! use xquery_flwor::model::simple::{attr, elem, text};
//! use xquery_flwor::XdmNode;
//!
//! // <emp gender="female">Jane</emp>
//! let emp = elem("emp").attr(attr("gender", "female")).child(text("Jane")).build();
//! assert_eq!(emp.string_value(), "Jane");
//! assert_eq!(emp.attributes()[0].string_value(), "female");
//! ```
use std::fmt;
use std::sync::{Arc, Weak};

use crate::model::{NodeKind, QName, XdmNode};

struct Inner {
    kind: NodeKind,
    name: Option<QName>,
    value: String,
    parent: Weak<Inner>,
    attributes: Vec<SimpleNode>,
    children: Vec<SimpleNode>,
}

/// Arc-backed immutable node; equality is node identity.
#[derive(Clone)]
pub struct SimpleNode(Arc<Inner>);

impl PartialEq for SimpleNode {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}
impl Eq for SimpleNode {}

impl fmt::Debug for SimpleNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimpleNode")
            .field("kind", &self.0.kind)
            .field("name", &self.0.name.as_ref().map(|n| n.local.as_str()))
            .field("value", &self.0.value)
            .finish()
    }
}

pub struct SimpleNodeBuilder {
    kind: NodeKind,
    name: Option<QName>,
    value: String,
    attributes: Vec<SimpleNodeBuilder>,
    children: Vec<SimpleNodeBuilder>,
}

impl SimpleNodeBuilder {
    fn new(kind: NodeKind, name: Option<&str>, value: &str) -> Self {
        Self {
            kind,
            name: name.map(|local| QName {
                prefix: None,
                local: local.to_string(),
                ns_uri: None,
            }),
            value: value.to_string(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn attr(mut self, attr: SimpleNodeBuilder) -> Self {
        debug_assert!(attr.kind == NodeKind::Attribute);
        self.attributes.push(attr);
        self
    }

    pub fn child(mut self, child: SimpleNodeBuilder) -> Self {
        self.children.push(child);
        self
    }

    pub fn children<I: IntoIterator<Item = SimpleNodeBuilder>>(mut self, it: I) -> Self {
        self.children.extend(it);
        self
    }

    pub fn build(self) -> SimpleNode {
        self.build_under(Weak::new())
    }

    fn build_under(self, parent: Weak<Inner>) -> SimpleNode {
        let SimpleNodeBuilder {
            kind,
            name,
            value,
            attributes,
            children,
        } = self;
        SimpleNode(Arc::new_cyclic(|me: &Weak<Inner>| {
            let attributes: Vec<SimpleNode> =
                attributes.into_iter().map(|a| a.build_under(me.clone())).collect();
            let children: Vec<SimpleNode> =
                children.into_iter().map(|c| c.build_under(me.clone())).collect();
            let value = match kind {
                NodeKind::Element | NodeKind::Document => {
                    children.iter().map(|c| c.text_content()).collect()
                }
                _ => value,
            };
            Inner {
                kind,
                name,
                value,
                parent,
                attributes,
                children,
            }
        }))
    }
}

impl SimpleNode {
    fn text_content(&self) -> String {
        match self.0.kind {
            NodeKind::Text | NodeKind::Element | NodeKind::Document => self.0.value.clone(),
            _ => String::new(),
        }
    }
}

pub fn doc() -> SimpleNodeBuilder {
    SimpleNodeBuilder::new(NodeKind::Document, None, "")
}
pub fn elem(name: &str) -> SimpleNodeBuilder {
    SimpleNodeBuilder::new(NodeKind::Element, Some(name), "")
}
pub fn attr(name: &str, value: &str) -> SimpleNodeBuilder {
    SimpleNodeBuilder::new(NodeKind::Attribute, Some(name), value)
}
pub fn text(value: &str) -> SimpleNodeBuilder {
    SimpleNodeBuilder::new(NodeKind::Text, None, value)
}
pub fn comment(value: &str) -> SimpleNodeBuilder {
    SimpleNodeBuilder::new(NodeKind::Comment, None, value)
}

impl XdmNode for SimpleNode {
    fn kind(&self) -> NodeKind {
        self.0.kind
    }
    fn name(&self) -> Option<QName> {
        self.0.name.clone()
    }
    fn string_value(&self) -> String {
        self.0.value.clone()
    }
    fn parent(&self) -> Option<Self> {
        self.0.parent.upgrade().map(SimpleNode)
    }
    fn children(&self) -> Vec<Self> {
        self.0.children.clone()
    }
    fn attributes(&self) -> Vec<Self> {
        self.0.attributes.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cmp::Ordering;
    use rstest::rstest;

    #[rstest]
    fn element_string_value_concatenates_descendant_text() {
        let root = elem("r")
            .child(elem("a").child(text("x")))
            .child(text("y"))
            .child(comment("ignored"))
            .build();
        assert_eq!(root.string_value(), "xy");
    }

    #[rstest]
    fn attributes_precede_children_in_document_order() {
        let r = elem("r").attr(attr("a", "1")).child(elem("c")).build();
        let a = r.attributes()[0].clone();
        let c = r.children()[0].clone();
        assert_eq!(a.compare_document_order(&c).unwrap(), Ordering::Less);
        assert_eq!(r.compare_document_order(&c).unwrap(), Ordering::Less);
        assert_eq!(c.parent(), Some(r));
    }
}
