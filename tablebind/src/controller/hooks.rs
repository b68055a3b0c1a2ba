//! Hooks the controller hands to the widget.

use std::sync::Arc;

use log::trace;

use crate::binding::BindingChain;
use crate::collection::RowItem;
use crate::config::{CellValue, ColumnDef, RenderKind, RowAttribute};
use crate::dom::{BINDING_ATTR, Node, PENDING_CELL_ATTR, ROW_INDEX_ATTR};
use crate::filter::FilterState;
use crate::scheduler::CompileScheduler;
use crate::widget::{RowScope, TableHooks};

use super::rows::RowRegistry;

/// Borrowed view of the controller used while the widget renders.
pub(crate) struct Hooks<'a, T, S> {
    pub columns: &'a [ColumnDef<T>],
    /// Resolved template markup per column.
    pub templates: &'a [Option<String>],
    pub row_binding: &'a [RowAttribute],
    pub expression: &'a str,
    pub bindings: &'a Arc<BindingChain>,
    pub scope: &'a S,
    pub scheduler: &'a mut CompileScheduler<RowScope<T, S>>,
    pub rows: &'a mut RowRegistry,
    pub filters: &'a mut FilterState,
    /// Custom predicates are registered.
    pub predicates: bool,
    /// Search passes refresh the text filter suggestions.
    pub track_search: bool,
}

impl<T, S: Clone> TableHooks<T> for Hooks<'_, T, S> {
    fn created_row(&mut self, position: usize, item: &RowItem<T>, row: &Node) {
        for attribute in self.row_binding {
            row.set_attribute(attribute.key.clone(), attribute.value.clone());
        }
        row.set_attribute(ROW_INDEX_ATTR, position.to_string());
        row.set_attribute(BINDING_ATTR, self.expression);

        trace!("Created row {}", position);
        self.rows.attach(position, row.clone());
        self.scheduler.enqueue(
            row.clone(),
            RowScope {
                parent: self.scope.clone(),
                bindings: Arc::clone(self.bindings),
                item: item.clone(),
                child: false,
            },
        );
    }

    fn created_cell(&mut self, column: usize, cell: &Node, value: &CellValue) {
        if let Some(css) = self.columns.get(column).and_then(|c| c.style.css(value)) {
            cell.set_style(css);
        }
        cell.set_attribute(PENDING_CELL_ATTR, "");
    }

    fn render(&self, column: usize, kind: RenderKind, value: &CellValue, item: &T) -> String {
        // template cells get placeholder markup; the widget's cached value stays intact
        if kind == RenderKind::Display {
            if let Some(Some(markup)) = self.templates.get(column) {
                return markup.clone();
            }
        }
        match self.columns.get(column) {
            Some(def) => def.render_value(value, kind, item),
            None => value.to_string(),
        }
    }

    fn custom_search(&self, row: &[CellValue]) -> bool {
        !self.predicates || self.filters.passes(row)
    }

    fn searched(&mut self, matched: &[RowItem<T>]) {
        if !self.track_search {
            return;
        }
        for column in self.filters.text_columns() {
            let Some(def) = self.columns.get(column) else {
                continue;
            };
            let values: Vec<String> = matched
                .iter()
                .map(|item| {
                    item.with(|value| {
                        let cell = def.value(value);
                        def.render_value(&cell, RenderKind::Filter, value)
                    })
                })
                .collect();
            self.filters.set_options(column, values);
        }
    }
}
