//! Per-row state indexed by identity.
//!
//! Slot `i` describes the widget row holding the item with identity `i`.
//! Row capabilities (recompiling cells, the expanded flag) are looked up
//! here instead of being attached to host items. Only rows created through
//! the widget's row hook get a node; detail rows never do.

use crate::dom::Node;
use crate::reconcile::Reconciliation;

#[derive(Debug, Clone, Default)]
struct RowSlot {
    node: Option<Node>,
    compiled: bool,
    expanded: bool,
}

#[derive(Debug, Default)]
pub struct RowRegistry {
    slots: Vec<RowSlot>,
}

impl RowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Forget every row and make room for `len` fresh ones.
    pub fn reset(&mut self, len: usize) {
        self.slots.clear();
        self.slots.resize_with(len, RowSlot::default);
    }

    /// Mirror a reconciliation: drop deleted slots, open slots for insertions.
    pub fn apply<T>(&mut self, ops: &Reconciliation<T>) {
        for &position in ops.deleted.iter().rev() {
            if position < self.slots.len() {
                self.slots.remove(position);
            }
        }
        for insertion in &ops.inserted {
            let at = insertion.position.min(self.slots.len());
            self.slots.insert(at, RowSlot::default());
        }
        self.slots.resize_with(ops.len, RowSlot::default);
    }

    /// Record the node created for a row; it is not compiled yet.
    pub fn attach(&mut self, position: usize, node: Node) {
        if position >= self.slots.len() {
            self.slots.resize_with(position + 1, RowSlot::default);
        }
        let slot = &mut self.slots[position];
        slot.node = Some(node);
        slot.compiled = false;
    }

    /// Mark the row compiled if `node` is still its node.
    pub fn mark_compiled(&mut self, position: usize, node: &Node) -> bool {
        match self.slots.get_mut(position) {
            Some(slot) if slot.node.as_ref().is_some_and(|n| n.same(node)) => {
                slot.compiled = true;
                true
            }
            _ => false,
        }
    }

    /// Node of a compiled row. Rows without one have no cell capabilities.
    pub fn compiled_node(&self, position: usize) -> Option<&Node> {
        self.slots
            .get(position)
            .filter(|slot| slot.compiled)
            .and_then(|slot| slot.node.as_ref())
    }

    /// Positions of every compiled row.
    pub fn compiled_positions(&self) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.compiled && slot.node.is_some())
            .map(|(position, _)| position)
            .collect()
    }

    pub fn is_expanded(&self, position: usize) -> bool {
        self.slots.get(position).is_some_and(|slot| slot.expanded)
    }

    pub fn set_expanded(&mut self, position: usize, expanded: bool) {
        if let Some(slot) = self.slots.get_mut(position) {
            slot.expanded = expanded;
        }
    }
}
