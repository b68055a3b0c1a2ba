//! Headless in-memory implementations of the collaborator traits.
//!
//! [`MemoryTable`] behaves like a small tabular widget: it keeps rows in data
//! order, searches on every draw and creates row and cell nodes lazily for
//! rows that pass the search. Handles are cheap to clone so a test can keep
//! one while the controller owns the boxed widget.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use log::trace;

use crate::collection::{Collection, RowItem};
use crate::config::{CellValue, ColumnDef, RenderKind, TableOptions};
use crate::dom::Node;
use crate::error::CompileError;
use crate::widget::{HostScope, RowScope, TableHooks, TableWidget, TemplateCompiler, WidgetFactory};

// =============================================================================
// MemoryTable
// =============================================================================

#[derive(Debug)]
struct MemoryRow<T> {
    item: RowItem<T>,
    node: Option<Node>,
    cells: Vec<Option<Node>>,
    child: Option<Node>,
    child_shown: bool,
}

impl<T> MemoryRow<T> {
    fn new(item: RowItem<T>, columns: usize) -> Self {
        Self {
            item,
            node: None,
            cells: vec![None; columns],
            child: None,
            child_shown: false,
        }
    }
}

struct TableData<T> {
    columns: Vec<ColumnDef<T>>,
    visible: Vec<bool>,
    rows: Vec<MemoryRow<T>>,
    column_search: Vec<String>,
    search: String,
    header: Option<Node>,
    attached: bool,
    destroyed: bool,
    displayed: Vec<usize>,
    draws: usize,
}

impl<T> TableData<T> {
    fn create_cell(&mut self, position: usize, column: usize, hooks: &mut dyn TableHooks<T>) -> Node {
        let def = &self.columns[column];
        let item = &self.rows[position].item;
        let (value, markup) = item.with(|v| {
            let value = def.value(v);
            let markup = hooks.render(column, RenderKind::Display, &value, v);
            (value, markup)
        });
        let cell = Node::cell();
        cell.set_markup(markup);
        hooks.created_cell(column, &cell, &value);
        self.rows[position].cells[column] = Some(cell.clone());
        cell
    }

    fn create_row(&mut self, position: usize, hooks: &mut dyn TableHooks<T>) {
        let node = Node::row();
        for column in 0..self.columns.len() {
            if self.visible[column] {
                self.create_cell(position, column, hooks);
            }
        }
        self.rows[position].node = Some(node.clone());
        self.layout_row(position);
        let item = self.rows[position].item.clone();
        hooks.created_row(position, &item, &node);
    }

    /// Put the visible cells of a row into its node, in column order.
    fn layout_row(&self, position: usize) {
        let row = &self.rows[position];
        let Some(node) = &row.node else {
            return;
        };
        let cells = row
            .cells
            .iter()
            .zip(&self.visible)
            .filter(|(_, visible)| **visible)
            .filter_map(|(cell, _)| cell.clone())
            .collect();
        node.set_children(cells);
    }

    fn matches(&self, position: usize, hooks: &dyn TableHooks<T>) -> (bool, Vec<CellValue>) {
        let item = &self.rows[position].item;
        let (values, texts): (Vec<CellValue>, Vec<String>) = item.with(|v| {
            self.columns
                .iter()
                .enumerate()
                .map(|(column, def)| {
                    let value = def.value(v);
                    let text = hooks.render(column, RenderKind::Filter, &value, v).to_lowercase();
                    (value, text)
                })
                .unzip()
        });

        let columns_pass = self
            .column_search
            .iter()
            .zip(&texts)
            .all(|(search, text)| search.is_empty() || text.contains(&search.to_lowercase()));
        let global = self.search.to_lowercase();
        let global_pass = global.is_empty() || texts.iter().any(|text| text.contains(&global));
        (columns_pass && global_pass, values)
    }
}

/// In-memory widget.
pub struct MemoryTable<T> {
    inner: Arc<Mutex<TableData<T>>>,
}

impl<T> Clone for MemoryTable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> MemoryTable<T> {
    pub fn new(options: &TableOptions<T>) -> Self {
        let columns = options.columns.clone();
        let visible = columns.iter().map(|c| c.visible).collect();
        let column_search = vec![String::new(); columns.len()];
        Self {
            inner: Arc::new(Mutex::new(TableData {
                columns,
                visible,
                rows: Vec::new(),
                column_search,
                search: String::new(),
                header: None,
                attached: true,
                destroyed: false,
                displayed: Vec::new(),
                draws: 0,
            })),
        }
    }

    fn data(&self) -> MutexGuard<'_, TableData<T>> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Detach the root from its document, making the instance stale.
    pub fn detach(&self) {
        self.data().attached = false;
    }

    pub fn is_destroyed(&self) -> bool {
        self.data().destroyed
    }

    /// Items in data order.
    pub fn items(&self) -> Vec<RowItem<T>> {
        self.data().rows.iter().map(|row| row.item.clone()).collect()
    }

    /// Positions shown by the last draw.
    pub fn displayed(&self) -> Vec<usize> {
        self.data().displayed.clone()
    }

    /// Row nodes shown by the last draw.
    pub fn displayed_nodes(&self) -> Vec<Node> {
        let data = self.data();
        data.displayed
            .iter()
            .filter_map(|&p| data.rows.get(p).and_then(|row| row.node.clone()))
            .collect()
    }

    pub fn draw_count(&self) -> usize {
        self.data().draws
    }

    /// Native search text of a column.
    pub fn column_search_text(&self, column: usize) -> String {
        self.data().column_search.get(column).cloned().unwrap_or_default()
    }

    pub fn search_text(&self) -> String {
        self.data().search.clone()
    }

    pub fn header(&self) -> Option<Node> {
        self.data().header.clone()
    }

    /// Child content of a row, shown or not.
    pub fn child(&self, position: usize) -> Option<Node> {
        self.data().rows.get(position).and_then(|row| row.child.clone())
    }
}

impl<T> TableWidget<T> for MemoryTable<T> {
    fn is_live(&self) -> bool {
        let data = self.data();
        data.attached && !data.destroyed
    }

    fn destroy(&mut self) {
        let mut data = self.data();
        data.destroyed = true;
        data.rows.clear();
        data.displayed.clear();
        data.header = None;
    }

    fn clear(&mut self) {
        let mut data = self.data();
        data.rows.clear();
        data.displayed.clear();
    }

    fn add_rows(&mut self, items: &[RowItem<T>]) {
        let mut data = self.data();
        let columns = data.columns.len();
        data.rows
            .extend(items.iter().map(|item| MemoryRow::new(item.clone(), columns)));
    }

    fn insert_row(&mut self, position: usize, item: RowItem<T>) {
        let mut data = self.data();
        let columns = data.columns.len();
        let at = position.min(data.rows.len());
        data.rows.insert(at, MemoryRow::new(item, columns));
    }

    fn remove_rows(&mut self, positions: &[usize]) {
        let mut data = self.data();
        for &position in positions.iter().rev() {
            if position < data.rows.len() {
                data.rows.remove(position);
            }
        }
    }

    fn row_count(&self) -> usize {
        self.data().rows.len()
    }

    fn row_node(&self, position: usize) -> Option<Node> {
        self.data().rows.get(position).and_then(|row| row.node.clone())
    }

    fn invalidate_row(&mut self, position: usize, hooks: &mut dyn TableHooks<T>) {
        let data = self.data();
        let Some(row) = data.rows.get(position) else {
            return;
        };
        for (column, cell) in row.cells.iter().enumerate() {
            let Some(cell) = cell else {
                continue;
            };
            let def = &data.columns[column];
            let markup = row.item.with(|v| {
                let value = def.value(v);
                hooks.render(column, RenderKind::Display, &value, v)
            });
            cell.set_markup(markup);
        }
    }

    fn child_shown(&self, position: usize) -> bool {
        self.data().rows.get(position).is_some_and(|row| row.child_shown)
    }

    fn show_child(&mut self, position: usize, content: Node) {
        if let Some(row) = self.data().rows.get_mut(position) {
            row.child = Some(content);
            row.child_shown = true;
        }
    }

    fn hide_child(&mut self, position: usize) {
        if let Some(row) = self.data().rows.get_mut(position) {
            row.child_shown = false;
        }
    }

    fn remove_child(&mut self, position: usize) {
        if let Some(row) = self.data().rows.get_mut(position) {
            row.child = None;
            row.child_shown = false;
        }
    }

    fn column_visible(&self, column: usize) -> bool {
        self.data().visible.get(column).copied().unwrap_or(false)
    }

    fn set_column_visible(&mut self, column: usize, visible: bool, hooks: &mut dyn TableHooks<T>) {
        let mut data = self.data();
        if column >= data.visible.len() || data.visible[column] == visible {
            return;
        }
        data.visible[column] = visible;
        for position in 0..data.rows.len() {
            if data.rows[position].node.is_none() {
                continue;
            }
            if visible && data.rows[position].cells[column].is_none() {
                data.create_cell(position, column, hooks);
            }
            data.layout_row(position);
        }
        trace!("Column {} visible: {}", column, visible);
    }

    fn set_column_search(&mut self, column: usize, text: &str) {
        if let Some(search) = self.data().column_search.get_mut(column) {
            *search = text.to_string();
        }
    }

    fn set_search(&mut self, text: &str) {
        self.data().search = text.to_string();
    }

    fn mount_header(&mut self, row: Node) {
        self.data().header = Some(row);
    }

    fn draw(&mut self, hooks: &mut dyn TableHooks<T>) {
        let mut data = self.data();
        data.draws += 1;

        let mut displayed = Vec::new();
        let mut matched = Vec::new();
        for position in 0..data.rows.len() {
            let (native, values) = data.matches(position, hooks);
            if native && hooks.custom_search(&values) {
                displayed.push(position);
                matched.push(data.rows[position].item.clone());
            }
        }
        hooks.searched(&matched);

        for &position in &displayed {
            if data.rows[position].node.is_none() {
                data.create_row(position, hooks);
            }
        }
        trace!("Drew {} of {} rows", displayed.len(), data.rows.len());
        data.displayed = displayed;
    }
}

/// Builds [`MemoryTable`]s and keeps a handle to each one.
pub struct MemoryTableFactory<T> {
    created: Arc<Mutex<Vec<MemoryTable<T>>>>,
}

impl<T> Clone for MemoryTableFactory<T> {
    fn clone(&self) -> Self {
        Self {
            created: Arc::clone(&self.created),
        }
    }
}

impl<T> Default for MemoryTableFactory<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> MemoryTableFactory<T> {
    pub fn new() -> Self {
        Self {
            created: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Every table built so far, oldest first.
    pub fn tables(&self) -> Vec<MemoryTable<T>> {
        self.created
            .lock()
            .map(|tables| tables.clone())
            .unwrap_or_default()
    }

    /// The most recently built table.
    pub fn last(&self) -> Option<MemoryTable<T>> {
        self.tables().pop()
    }
}

impl<T: 'static> WidgetFactory<T> for MemoryTableFactory<T> {
    fn create(&mut self, options: &TableOptions<T>) -> Box<dyn TableWidget<T>> {
        let table = MemoryTable::new(options);
        if let Ok(mut created) = self.created.lock() {
            created.push(table.clone());
        }
        Box::new(table)
    }
}

// =============================================================================
// RecordingCompiler
// =============================================================================

/// One compile call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileRecord {
    pub node: String,
    pub tag: String,
    pub identity: Option<usize>,
    pub child: bool,
}

/// Compiler that records what it was asked to compile.
///
/// Nodes whose tag was passed to [`RecordingCompiler::fail_tag`] fail.
#[derive(Debug, Clone, Default)]
pub struct RecordingCompiler {
    records: Arc<Mutex<Vec<CompileRecord>>>,
    failing: Arc<Mutex<Vec<String>>>,
}

impl RecordingCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_tag(&self, tag: impl Into<String>) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.push(tag.into());
        }
    }

    pub fn records(&self) -> Vec<CompileRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    /// How many times `node` was compiled.
    pub fn count(&self, node: &Node) -> usize {
        let id = node.id();
        self.records().iter().filter(|r| r.node == id).count()
    }

    pub fn clear(&self) {
        if let Ok(mut records) = self.records.lock() {
            records.clear();
        }
    }
}

impl<T, S> TemplateCompiler<T, S> for RecordingCompiler {
    fn compile(&self, node: &Node, scope: &RowScope<T, S>) -> Result<(), CompileError> {
        let tag = node.tag();
        let fails = self
            .failing
            .lock()
            .map(|failing| failing.contains(&tag))
            .unwrap_or(false);
        if fails {
            return Err(CompileError::new(node.id(), format!("cannot compile <{tag}>")));
        }
        if let Ok(mut records) = self.records.lock() {
            records.push(CompileRecord {
                node: node.id(),
                tag,
                identity: scope.item.identity(),
                child: scope.child,
            });
        }
        Ok(())
    }
}

// =============================================================================
// MapScope
// =============================================================================

/// Host scope backed by a path to collection map.
pub struct MapScope<T> {
    collections: Arc<RwLock<HashMap<String, Collection<T>>>>,
}

impl<T> Clone for MapScope<T> {
    fn clone(&self) -> Self {
        Self {
            collections: Arc::clone(&self.collections),
        }
    }
}

impl<T> Default for MapScope<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> MapScope<T> {
    pub fn new() -> Self {
        Self {
            collections: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Bind `collection` at `path`, replacing what was there.
    pub fn bind(&self, path: impl Into<String>, collection: Collection<T>) {
        self.collections
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(path.into(), collection);
    }

    pub fn unbind(&self, path: &str) -> Option<Collection<T>> {
        self.collections
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(path)
    }
}

impl<T> HostScope<T> for MapScope<T> {
    fn collection(&self, path: &str) -> Option<Collection<T>> {
        self.collections
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(path)
            .cloned()
    }
}
