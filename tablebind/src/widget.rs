//! Seams to the external collaborators: the widget, the template compiler,
//! the template store and the host scope.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::binding::BindingChain;
use crate::collection::{Collection, RowItem};
use crate::config::{CellValue, RenderKind, TableOptions};
use crate::dom::Node;
use crate::error::CompileError;

// =============================================================================
// Scope
// =============================================================================

/// Scope a row's templates are compiled against.
pub struct RowScope<T, S> {
    /// The host scope the table lives in.
    pub parent: S,
    /// Names the row and its enclosing rows are exposed under.
    pub bindings: Arc<BindingChain>,
    /// The row's item.
    pub item: RowItem<T>,
    /// Set for expanded detail rows, which get no row capabilities.
    pub child: bool,
}

impl<T, S: Clone> Clone for RowScope<T, S> {
    fn clone(&self) -> Self {
        Self {
            parent: self.parent.clone(),
            bindings: Arc::clone(&self.bindings),
            item: self.item.clone(),
            child: self.child,
        }
    }
}

impl<T, S> fmt::Debug for RowScope<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowScope")
            .field("binding", &self.bindings.own.name)
            .field("identity", &self.item.identity())
            .field("child", &self.child)
            .finish_non_exhaustive()
    }
}

/// Host application scope a table is declared in.
pub trait HostScope<T>: Clone {
    /// Resolve a collection path.
    ///
    /// `None` covers a missing, null or non-list value; the table ignores it.
    fn collection(&self, path: &str) -> Option<Collection<T>>;
}

// =============================================================================
// Templates
// =============================================================================

/// Binds a node's template expressions to a scope.
pub trait TemplateCompiler<T, S> {
    fn compile(&self, node: &Node, scope: &RowScope<T, S>) -> Result<(), CompileError>;
}

/// Looks up template markup by id.
pub trait TemplateSource {
    fn template(&self, id: &str) -> Option<String>;
}

impl TemplateSource for HashMap<String, String> {
    fn template(&self, id: &str) -> Option<String> {
        self.get(id).cloned()
    }
}

// =============================================================================
// Widget
// =============================================================================

/// Callbacks the widget invokes while rendering and searching.
///
/// The controller passes an implementation into every call that may create
/// rows or run a search; the widget must not keep it.
pub trait TableHooks<T> {
    /// A row node was created for the item at `position`.
    fn created_row(&mut self, position: usize, item: &RowItem<T>, row: &Node);

    /// A cell node was created for `column`.
    fn created_cell(&mut self, column: usize, cell: &Node, value: &CellValue);

    /// Text for a cell rendered for `kind`.
    fn render(&self, column: usize, kind: RenderKind, value: &CellValue, item: &T) -> String;

    /// Table-wide custom search predicate, consulted after the native search.
    fn custom_search(&self, row: &[CellValue]) -> bool;

    /// A search pass finished; `matched` are the rows that passed, in order.
    fn searched(&mut self, matched: &[RowItem<T>]);
}

/// A stateful tabular widget.
///
/// Positions are row indices in the widget's data order, which the
/// controller keeps equal to the items' identities.
pub trait TableWidget<T> {
    /// Whether the widget's root is still attached to its document.
    fn is_live(&self) -> bool;

    /// Tear down the widget and its root.
    fn destroy(&mut self);

    /// Remove every row.
    fn clear(&mut self);

    /// Append rows.
    fn add_rows(&mut self, items: &[RowItem<T>]);

    /// Insert one row at `position`.
    fn insert_row(&mut self, position: usize, item: RowItem<T>);

    /// Remove rows at the given positions (ascending).
    fn remove_rows(&mut self, positions: &[usize]);

    fn row_count(&self) -> usize;

    /// Rendered node of a row, if it has been created.
    fn row_node(&self, position: usize) -> Option<Node>;

    /// Re-read a row's data and re-render its cells.
    fn invalidate_row(&mut self, position: usize, hooks: &mut dyn TableHooks<T>);

    fn child_shown(&self, position: usize) -> bool;

    fn show_child(&mut self, position: usize, content: Node);

    fn hide_child(&mut self, position: usize);

    /// Drop a row's child content entirely.
    fn remove_child(&mut self, position: usize);

    fn column_visible(&self, column: usize) -> bool;

    /// Show or hide a column, creating cells for it if needed.
    fn set_column_visible(&mut self, column: usize, visible: bool, hooks: &mut dyn TableHooks<T>);

    /// Native substring search on one column. Applied on the next draw.
    fn set_column_search(&mut self, column: usize, text: &str);

    /// Native substring search across all columns. Applied on the next draw.
    fn set_search(&mut self, text: &str);

    /// Attach an extra header row below the column titles.
    fn mount_header(&mut self, row: Node);

    /// Search, then render the matching rows.
    fn draw(&mut self, hooks: &mut dyn TableHooks<T>);
}

/// Builds widgets.
pub trait WidgetFactory<T> {
    fn create(&mut self, options: &TableOptions<T>) -> Box<dyn TableWidget<T>>;
}
