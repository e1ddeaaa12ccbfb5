//! Tuples: slot-indexed variable bindings plus the focus.
//!
//! Bindings are `Rc`-shared; deriving a tuple copies only the slot vector, so
//! untouched bindings are shared between a tuple and everything derived from it.

use crate::compiler::ir::Slot;
use crate::engine::runtime::{Error, ErrorCode};
use crate::xdm::{XdmItem, XdmSequence};
use smallvec::SmallVec;
use std::rc::Rc;

pub type Binding<N> = Rc<XdmSequence<N>>;

/// Context item, position and size.
#[derive(Debug, Clone)]
pub enum Focus<N> {
    Absent,
    /// The context item is being initialized; observing it is a cycle.
    Pending,
    Item {
        item: XdmItem<N>,
        position: usize,
        size: usize,
    },
}

impl<N: Clone> Focus<N> {
    fn unavailable(&self, what: &str) -> Error {
        match self {
            Focus::Pending => Error::from_code(
                ErrorCode::XQDY0054,
                format!("{what} depends on the context item being initialized"),
            ),
            _ => Error::from_code(ErrorCode::XPDY0002, format!("{what} is absent")),
        }
    }

    pub fn item(&self) -> Result<XdmItem<N>, Error> {
        match self {
            Focus::Item { item, .. } => Ok(item.clone()),
            other => Err(other.unavailable("context item")),
        }
    }

    pub fn position(&self) -> Result<usize, Error> {
        match self {
            Focus::Item { position, .. } => Ok(*position),
            other => Err(other.unavailable("context position")),
        }
    }

    pub fn size(&self) -> Result<usize, Error> {
        match self {
            Focus::Item { size, .. } => Ok(*size),
            other => Err(other.unavailable("context size")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Tuple<N> {
    slots: SmallVec<[Option<Binding<N>>; 8]>,
    focus: Focus<N>,
}

impl<N: Clone> Tuple<N> {
    pub fn new(frame_size: usize, focus: Focus<N>) -> Self {
        Self {
            slots: SmallVec::from_elem(None, frame_size),
            focus,
        }
    }

    /// Value bound at `slot`. Unbound slots are a compiler bug, reported as `XPST0008`.
    pub fn get(&self, slot: Slot) -> Result<&Binding<N>, Error> {
        self.slots
            .get(slot)
            .and_then(Option::as_ref)
            .ok_or_else(|| {
                Error::from_code(ErrorCode::XPST0008, format!("slot {slot} is not bound"))
            })
    }

    pub fn bind(&mut self, slot: Slot, value: Binding<N>) {
        if slot >= self.slots.len() {
            self.slots.resize(slot + 1, None);
        }
        self.slots[slot] = Some(value);
    }

    /// A copy of this tuple with one more binding.
    pub fn with_binding(&self, slot: Slot, value: Binding<N>) -> Self {
        let mut t = self.clone();
        t.bind(slot, value);
        t
    }

    pub fn with_focus(&self, focus: Focus<N>) -> Self {
        Self {
            slots: self.slots.clone(),
            focus,
        }
    }

    pub fn focus(&self) -> &Focus<N> {
        &self.focus
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::simple::SimpleNode;
    use crate::xdm::XdmAtomicValue;
    use rstest::rstest;

    type T = Tuple<SimpleNode>;

    fn one(i: i64) -> Binding<SimpleNode> {
        Rc::new(vec![XdmItem::Atomic(XdmAtomicValue::Integer(i))])
    }

    #[rstest]
    fn derived_tuples_share_untouched_bindings() {
        let base = T::new(2, Focus::Absent).with_binding(0, one(1));
        let next = base.with_binding(1, one(2));
        assert!(Rc::ptr_eq(base.get(0).unwrap(), next.get(0).unwrap()));
        assert!(base.get(1).is_err());
    }

    #[rstest]
    fn pending_focus_reports_circularity() {
        let t = T::new(0, Focus::Pending);
        assert_eq!(t.focus().item().unwrap_err().code_enum(), ErrorCode::XQDY0054);
        let t = T::new(0, Focus::Absent);
        assert_eq!(t.focus().position().unwrap_err().code_enum(), ErrorCode::XPDY0002);
    }
}
