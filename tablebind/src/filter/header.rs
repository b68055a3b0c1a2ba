//! Filter row shown under the table header.

use crate::dom::Node;

use super::FilterKind;

pub const FILTER_KIND_ATTR: &str = "filter-kind";
pub const FILTER_COLUMN_ATTR: &str = "filter-column";

/// One filter cell per column; only cells of visible columns are attached.
#[derive(Debug, Clone)]
pub struct FilterHeader {
    row: Node,
    cells: Vec<Node>,
}

impl FilterHeader {
    pub fn new(kinds: &[FilterKind]) -> Self {
        let row = Node::row();
        row.set_attribute("class", "table-filter");
        let cells = kinds
            .iter()
            .enumerate()
            .map(|(column, kind)| {
                let cell = Node::cell();
                if *kind != FilterKind::None {
                    cell.set_attribute(FILTER_KIND_ATTR, kind.as_str());
                    cell.set_attribute(FILTER_COLUMN_ATTR, column.to_string());
                }
                cell
            })
            .collect();
        Self { row, cells }
    }

    pub fn row(&self) -> &Node {
        &self.row
    }

    pub fn cell(&self, column: usize) -> Option<&Node> {
        self.cells.get(column)
    }

    /// Re-attach the cells of the columns `visible` accepts, in column order.
    pub fn relayout(&self, visible: impl Fn(usize) -> bool) {
        let attached = self
            .cells
            .iter()
            .enumerate()
            .filter(|(column, _)| visible(*column))
            .map(|(_, cell)| cell.clone())
            .collect();
        self.row.set_children(attached);
    }
}
