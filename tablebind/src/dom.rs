//! Minimal shared element tree.
//!
//! Nodes stand in for the widget's rendered rows and cells. They are handles:
//! cloning a [`Node`] yields another reference to the same element, so the
//! widget, the scheduler and the compiler all observe the same state.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Attribute holding the identity index of a rendered row.
pub const ROW_INDEX_ATTR: &str = "tb-row";
/// Attribute holding the binding expression a row was rendered from.
pub const BINDING_ATTR: &str = "tb-binding";
/// Marks a cell whose template has not been compiled yet.
pub const PENDING_CELL_ATTR: &str = "tb-pending";
/// Marks a child (detail) row container.
pub const CHILD_ATTR: &str = "child";

static NEXT_ID: AtomicU64 = AtomicU64::new(0);

fn generate_id(prefix: &str) -> String {
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}-{id}")
}

#[derive(Debug)]
struct NodeData {
    id: String,
    tag: String,
    attributes: BTreeMap<String, String>,
    style: String,
    visible: bool,
    markup: String,
    children: Vec<Node>,
}

/// Shared handle to an element.
#[derive(Debug, Clone)]
pub struct Node {
    inner: Arc<RwLock<NodeData>>,
}

impl Node {
    /// Create an empty, visible element with the given tag.
    pub fn new(tag: impl Into<String>) -> Self {
        let tag = tag.into();
        Self {
            inner: Arc::new(RwLock::new(NodeData {
                id: generate_id(&tag),
                tag,
                attributes: BTreeMap::new(),
                style: String::new(),
                visible: true,
                markup: String::new(),
                children: Vec::new(),
            })),
        }
    }

    /// Create a table row element.
    pub fn row() -> Self {
        Self::new("tr")
    }

    /// Create a table cell element.
    pub fn cell() -> Self {
        Self::new("td")
    }

    fn read(&self) -> RwLockReadGuard<'_, NodeData> {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, NodeData> {
        self.inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Generated element id.
    pub fn id(&self) -> String {
        self.read().id.clone()
    }

    pub fn tag(&self) -> String {
        self.read().tag.clone()
    }

    /// Returns `true` if both handles point at the same element.
    pub fn same(&self, other: &Node) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn set_attribute(&self, key: impl Into<String>, value: impl Into<String>) {
        self.write().attributes.insert(key.into(), value.into());
    }

    pub fn attribute(&self, key: &str) -> Option<String> {
        self.read().attributes.get(key).cloned()
    }

    pub fn has_attribute(&self, key: &str) -> bool {
        self.read().attributes.contains_key(key)
    }

    pub fn remove_attribute(&self, key: &str) -> Option<String> {
        self.write().attributes.remove(key)
    }

    /// Replace the inline style.
    pub fn set_style(&self, css: impl Into<String>) {
        self.write().style = css.into();
    }

    pub fn style(&self) -> String {
        self.read().style.clone()
    }

    pub fn set_visible(&self, visible: bool) {
        self.write().visible = visible;
    }

    pub fn is_visible(&self) -> bool {
        self.read().visible
    }

    /// Replace the element's inner markup.
    pub fn set_markup(&self, markup: impl Into<String>) {
        self.write().markup = markup.into();
    }

    pub fn markup(&self) -> String {
        self.read().markup.clone()
    }

    pub fn append_child(&self, child: Node) {
        self.write().children.push(child);
    }

    /// Replace all children.
    pub fn set_children(&self, children: Vec<Node>) {
        self.write().children = children;
    }

    pub fn children(&self) -> Vec<Node> {
        self.read().children.clone()
    }

    /// All descendants matching `pred`, depth first.
    pub fn find_all(&self, pred: impl Fn(&Node) -> bool) -> Vec<Node> {
        let mut found = Vec::new();
        let mut stack: Vec<Node> = self.children().into_iter().rev().collect();
        while let Some(node) = stack.pop() {
            if pred(&node) {
                found.push(node.clone());
            }
            stack.extend(node.children().into_iter().rev());
        }
        found
    }

    /// Cells under this element still waiting for compilation.
    pub fn pending_cells(&self) -> Vec<Node> {
        self.find_all(|n| n.has_attribute(PENDING_CELL_ATTR))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_state() {
        let a = Node::row();
        let b = a.clone();
        b.set_visible(false);
        assert!(!a.is_visible());
        assert!(a.same(&b));
        assert!(!a.same(&Node::row()));
    }

    #[test]
    fn test_pending_cells_are_found_depth_first() {
        let row = Node::row();
        let first = Node::cell();
        first.set_attribute(PENDING_CELL_ATTR, "");
        let second = Node::cell();
        let nested = Node::new("span");
        nested.set_attribute(PENDING_CELL_ATTR, "");
        second.append_child(nested.clone());
        row.append_child(first.clone());
        row.append_child(second);

        let pending = row.pending_cells();
        assert_eq!(pending.len(), 2);
        assert!(pending[0].same(&first));
        assert!(pending[1].same(&nested));
    }

    #[test]
    fn test_ids_are_unique_and_prefixed() {
        let a = Node::cell();
        let b = Node::cell();
        assert!(a.id().starts_with("td-"));
        assert_ne!(a.id(), b.id());
    }
}
