//! Table controller.
//!
//! Owns the widget for one bound collection and keeps the two in sync. All
//! work happens in [`TableController::digest`]: a due compile flush runs
//! first, then the source watch (a different collection is bound), the
//! content watch (the bound collection changed) and finally the filter
//! watches.

mod hooks;
mod rows;

use std::sync::Arc;
use std::time::Instant;

use log::{debug, info, warn};
use uuid::Uuid;

use crate::binding::BindingChain;
use crate::collection::{Collection, RowItem};
use crate::config::TableOptions;
use crate::dom::{BINDING_ATTR, CHILD_ATTR, Node, PENDING_CELL_ATTR, ROW_INDEX_ATTR};
use crate::error::{ConfigError, FilterError};
use crate::filter::{FilterChange, FilterHeader, FilterState, FilterValue, RangeBound};
use crate::lifecycle::{Lifecycle, LifecycleHooks, Subscription};
use crate::reconcile::{assign_identities, reconcile};
use crate::scheduler::{Clock, CompileScheduler, SystemClock};
use crate::widget::{HostScope, RowScope, TableWidget, TemplateCompiler, TemplateSource, WidgetFactory};

use hooks::Hooks;
pub use rows::RowRegistry;

// =============================================================================
// TableId
// =============================================================================

/// Unique id of a bound table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TableId(Uuid);

impl TableId {
    /// Create a new unique table id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TableId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TableId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Setup
// =============================================================================

/// Everything a [`TableController`] is built from.
pub struct TableSetup<T, S> {
    expression: String,
    parents: Option<String>,
    options: TableOptions<T>,
    scope: S,
    factory: Box<dyn WidgetFactory<T>>,
    compiler: Box<dyn TemplateCompiler<T, S>>,
    templates: Box<dyn TemplateSource>,
    clock: Arc<dyn Clock>,
    hooks: LifecycleHooks,
}

impl<T: 'static, S: HostScope<T> + 'static> TableSetup<T, S> {
    /// Start a setup from the binding expression (`item in collection`).
    pub fn new(
        expression: impl Into<String>,
        options: TableOptions<T>,
        scope: S,
        factory: impl WidgetFactory<T> + 'static,
        compiler: impl TemplateCompiler<T, S> + 'static,
    ) -> Self {
        Self {
            expression: expression.into(),
            parents: None,
            options,
            scope,
            factory: Box::new(factory),
            compiler: Box::new(compiler),
            templates: Box::new(std::collections::HashMap::<String, String>::new()),
            clock: Arc::new(SystemClock),
            hooks: LifecycleHooks::default(),
        }
    }

    /// Bindings of enclosing tables, `|` separated.
    pub fn with_parents(mut self, chain: impl Into<String>) -> Self {
        self.parents = Some(chain.into());
        self
    }

    pub fn with_templates(mut self, templates: impl TemplateSource + 'static) -> Self {
        self.templates = Box::new(templates);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_hooks(mut self, hooks: LifecycleHooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Validate and build the controller.
    pub fn build(self) -> Result<TableController<T, S>, ConfigError> {
        TableController::new(self)
    }
}

// =============================================================================
// TableController
// =============================================================================

/// What one digest did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DigestReport {
    /// Rows compiled by the flush.
    pub compiled: usize,
    /// A collection was (re)bound.
    pub initialized: bool,
    /// The bound collection was reconciled.
    pub reconciled: bool,
    /// Filter changes applied to the widget.
    pub filters_applied: usize,
}

impl DigestReport {
    /// Nothing happened.
    pub fn is_idle(&self) -> bool {
        *self == Self::default()
    }
}

/// Keeps a widget in sync with a bound collection.
pub struct TableController<T, S> {
    id: TableId,
    expression: String,
    bindings: Arc<BindingChain>,
    options: TableOptions<T>,
    templates: Vec<Option<String>>,
    child_markup: Option<String>,
    scope: S,
    factory: Box<dyn WidgetFactory<T>>,
    compiler: Box<dyn TemplateCompiler<T, S>>,
    widget: Option<Box<dyn TableWidget<T>>>,
    scheduler: CompileScheduler<RowScope<T, S>>,
    rows: RowRegistry,
    filters: FilterState,
    header: Option<FilterHeader>,
    lifecycle: Lifecycle,
    source: Option<Collection<T>>,
    old_len: usize,
    seen_version: u64,
}

impl<T: 'static, S: HostScope<T> + 'static> TableController<T, S> {
    /// Validate a setup and build the controller.
    ///
    /// Fails on a malformed binding expression or a template id the
    /// template source cannot resolve.
    pub fn new(setup: TableSetup<T, S>) -> Result<Self, ConfigError> {
        let bindings = BindingChain::parse(&setup.expression, setup.parents.as_deref())?;

        let templates = setup
            .options
            .columns
            .iter()
            .map(|column| {
                column
                    .template
                    .as_deref()
                    .map(|id| {
                        setup
                            .templates
                            .template(id)
                            .ok_or_else(|| ConfigError::unknown_template(id))
                    })
                    .transpose()
            })
            .collect::<Result<Vec<_>, _>>()?;
        let child_markup = setup
            .options
            .child_template
            .as_deref()
            .map(|id| {
                setup
                    .templates
                    .template(id)
                    .ok_or_else(|| ConfigError::unknown_template(id))
            })
            .transpose()?;

        let kinds = setup.options.columns.iter().map(|c| c.filter).collect::<Vec<_>>();
        let filters = FilterState::new(kinds.clone());

        let mut lifecycle = Lifecycle::new(setup.hooks);
        lifecycle.subscribe(Subscription::Source);
        lifecycle.subscribe(Subscription::Contents);
        let header = if setup.options.column_filters {
            for (column, _) in filters.configured() {
                lifecycle.subscribe(Subscription::Filter(column));
            }
            Some(FilterHeader::new(&kinds))
        } else {
            None
        };

        let scheduler = CompileScheduler::new(setup.options.compile_delay, setup.clock);
        debug!("Bound table to {}", bindings.own);

        Ok(Self {
            id: TableId::new(),
            expression: setup.expression,
            bindings: Arc::new(bindings),
            options: setup.options,
            templates,
            child_markup,
            scope: setup.scope,
            factory: setup.factory,
            compiler: setup.compiler,
            widget: None,
            scheduler,
            rows: RowRegistry::new(),
            filters,
            header,
            lifecycle,
            source: None,
            old_len: 0,
            seen_version: 0,
        })
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn id(&self) -> TableId {
        self.id
    }

    pub fn bindings(&self) -> &BindingChain {
        &self.bindings
    }

    pub fn options(&self) -> &TableOptions<T> {
        &self.options
    }

    pub fn widget(&self) -> Option<&(dyn TableWidget<T> + 'static)> {
        self.widget.as_deref()
    }

    pub fn is_initialized(&self) -> bool {
        self.widget.is_some()
    }

    /// The currently bound collection.
    pub fn collection(&self) -> Option<&Collection<T>> {
        self.source.as_ref()
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn filter_header(&self) -> Option<&FilterHeader> {
        self.header.as_ref()
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    /// Rows waiting for the next compile flush.
    pub fn pending_compiles(&self) -> usize {
        self.scheduler.pending()
    }

    /// When the scheduled compile flush is due.
    pub fn next_flush(&self) -> Option<Instant> {
        self.scheduler.deadline()
    }

    /// Compile flushes run so far.
    pub fn flush_count(&self) -> u64 {
        self.scheduler.flush_count()
    }

    pub fn is_expanded(&self, item: &RowItem<T>) -> bool {
        item.identity().is_some_and(|p| self.rows.is_expanded(p))
    }

    /// Whether the item's row has been compiled and can recompile its cells.
    pub fn is_compiled(&self, item: &RowItem<T>) -> bool {
        item.identity()
            .is_some_and(|p| self.rows.compiled_node(p).is_some())
    }

    // -------------------------------------------------------------------------
    // Digest
    // -------------------------------------------------------------------------

    /// Run one update cycle.
    pub fn digest(&mut self) -> DigestReport {
        let mut report = DigestReport::default();
        if self.lifecycle.is_disposed() {
            return report;
        }

        report.compiled = self.flush_compiles(false);

        if self.lifecycle.is_active(Subscription::Source) {
            if let Some(collection) = self.scope.collection(&self.bindings.own.collection) {
                let rebound = self
                    .source
                    .as_ref()
                    .is_none_or(|current| !current.same(&collection));
                if rebound {
                    self.initialize(collection);
                    report.initialized = true;
                }
            }
        }

        if self.lifecycle.is_active(Subscription::Contents) && !report.initialized {
            let changed = self
                .source
                .as_ref()
                .is_some_and(|source| source.version() != self.seen_version);
            if changed {
                self.reconcile_contents();
                report.reconciled = true;
            }
        }

        report.filters_applied = self.apply_filter_changes();
        report
    }

    /// Compile every queued row now, due or not.
    pub fn flush(&mut self) -> usize {
        self.flush_compiles(true)
    }

    fn flush_compiles(&mut self, force: bool) -> usize {
        let compiler = &self.compiler;
        let rows = &mut self.rows;
        let compile = |node: &Node, scope: &RowScope<T, S>| match compiler.compile(node, scope) {
            Ok(()) => {
                for cell in node.pending_cells() {
                    cell.remove_attribute(PENDING_CELL_ATTR);
                }
                if let Some(position) = scope.item.identity() {
                    rows.mark_compiled(position, node);
                }
            }
            Err(err) => warn!("{err}"),
        };
        if force {
            self.scheduler.flush_with(compile)
        } else {
            self.scheduler.flush_due_with(compile)
        }
    }

    fn hooks(&mut self) -> (Option<&mut (dyn TableWidget<T> + 'static)>, Hooks<'_, T, S>) {
        let predicates = self.options.column_filters;
        let track_search = self.lifecycle.is_active(Subscription::Search);
        let hooks = Hooks {
            columns: &self.options.columns,
            templates: &self.templates,
            row_binding: &self.options.row_binding,
            expression: &self.expression,
            bindings: &self.bindings,
            scope: &self.scope,
            scheduler: &mut self.scheduler,
            rows: &mut self.rows,
            filters: &mut self.filters,
            predicates,
            track_search,
        };
        (self.widget.as_deref_mut(), hooks)
    }

    fn draw(&mut self) {
        let (widget, mut hooks) = self.hooks();
        if let Some(widget) = widget {
            widget.draw(&mut hooks);
        }
    }

    /// Bind a collection snapshot, creating the widget if needed.
    ///
    /// A widget whose root was detached is destroyed and rebuilt; a live
    /// one is cleared and refilled.
    pub fn initialize(&mut self, collection: Collection<T>) {
        let items = collection.snapshot();
        assign_identities(&items);

        let stale = self.widget.as_ref().is_some_and(|w| !w.is_live());
        if stale {
            info!("Table {} lost its root, rebuilding", self.id);
            if let Some(mut widget) = self.widget.take() {
                widget.destroy();
            }
            self.lifecycle.hooks.call_on_stale(&self.id);
        }

        self.rows.reset(items.len());
        if let Some(widget) = self.widget.as_deref_mut() {
            debug!("Refilling table {} with {} rows", self.id, items.len());
            widget.clear();
            widget.add_rows(&items);
        } else {
            debug!("Creating table {} with {} rows", self.id, items.len());
            let mut widget = self.factory.create(&self.options);
            if let Some(header) = &self.header {
                header.relayout(|column| widget.column_visible(column));
                widget.mount_header(header.row().clone());
            }
            widget.add_rows(&items);
            for column in self.filters.text_columns() {
                if !self.lifecycle.is_active(Subscription::Filter(column)) {
                    continue;
                }
                if let Some(text) = self.filters.search_text(column).filter(|t| !t.is_empty()) {
                    widget.set_column_search(column, text);
                }
            }
            self.widget = Some(widget);
            self.lifecycle.subscribe(Subscription::ColumnVisibility);
            if self.options.column_filters {
                self.lifecycle.subscribe(Subscription::Search);
            }
            self.lifecycle.hooks.call_on_create(&self.id);
        }

        self.old_len = items.len();
        self.seen_version = collection.version();
        self.source = Some(collection);
        self.draw();
    }

    fn reconcile_contents(&mut self) {
        let Some(source) = self.source.clone() else {
            return;
        };
        let items = source.snapshot();
        let ops = reconcile(self.old_len, &items);
        debug!(
            "Reconciled table {}: {} deleted, {} inserted",
            self.id,
            ops.deleted.len(),
            ops.inserted.len()
        );

        if let Some(widget) = self.widget.as_deref_mut() {
            for &position in &ops.deleted {
                widget.remove_child(position);
            }
            widget.remove_rows(&ops.deleted);
            for insertion in &ops.inserted {
                widget.insert_row(insertion.position, insertion.item.clone());
            }
        }
        ops.assign_identities(&items);
        self.rows.apply(&ops);

        self.old_len = items.len();
        self.seen_version = source.version();
        self.draw();
    }

    fn apply_filter_changes(&mut self) -> usize {
        // kept pending until there is a widget to apply them to
        if self.widget.is_none() || !self.filters.has_changes() {
            return 0;
        }
        let changes: Vec<_> = self
            .filters
            .take_changes()
            .into_iter()
            .filter(|change| {
                let column = match change {
                    FilterChange::Search { column, .. }
                    | FilterChange::Predicate { column } => *column,
                };
                self.lifecycle.is_active(Subscription::Filter(column))
            })
            .collect();
        if changes.is_empty() {
            return 0;
        }
        let Some(widget) = self.widget.as_deref_mut() else {
            return 0;
        };
        for change in &changes {
            match change {
                FilterChange::Search { column, text } => {
                    widget.set_column_search(*column, text);
                }
                FilterChange::Predicate { column } => {
                    widget.set_column_search(*column, "");
                }
            }
        }
        self.draw();
        changes.len()
    }

    // -------------------------------------------------------------------------
    // Row API
    // -------------------------------------------------------------------------

    /// Append an item to the bound collection.
    ///
    /// The widget picks it up on the next digest.
    pub fn add_row(&self, item: RowItem<T>) {
        item.clear_identity();
        match &self.source {
            Some(source) => source.push(item),
            None => debug!("add_row before a collection was bound"),
        }
    }

    /// Append several items.
    pub fn add_all(&self, items: impl IntoIterator<Item = RowItem<T>>) {
        for item in items {
            self.add_row(item);
        }
    }

    /// Remove an item by reference. Absent items are ignored.
    pub fn remove_row(&self, item: &RowItem<T>) {
        let removed = self
            .source
            .as_ref()
            .is_some_and(|source| source.remove_item(item));
        if removed {
            item.clear_identity();
        }
    }

    /// Remove several items in one pass, returning how many were removed.
    ///
    /// Attached items are matched by identity (confirmed by reference so a
    /// foreign table's tag cannot match), detached ones by reference.
    pub fn remove_all(&self, items: &[RowItem<T>]) -> usize {
        let Some(source) = &self.source else {
            return 0;
        };
        let mut by_identity = std::collections::HashMap::with_capacity(items.len());
        let mut by_reference = std::collections::HashSet::new();
        for item in items {
            match item.identity() {
                Some(identity) => {
                    by_identity.insert(identity, item.addr());
                }
                None => {
                    by_reference.insert(item.addr());
                }
            }
        }

        source.update(|current| {
            let before = current.len();
            current.retain(|item| {
                let hit = match item.identity() {
                    Some(identity) => by_identity.get(&identity) == Some(&item.addr()),
                    None => by_reference.contains(&item.addr()),
                };
                if hit {
                    item.clear_identity();
                }
                !hit
            });
            before - current.len()
        })
    }

    /// Re-read an item's row and recompile its cells.
    pub fn update_row(&mut self, item: &RowItem<T>) {
        let Some(position) = item.identity() else {
            return;
        };
        {
            let (widget, mut hooks) = self.hooks();
            if let Some(widget) = widget {
                widget.invalidate_row(position, &mut hooks);
            }
        }
        let Some(node) = self.rows.compiled_node(position).cloned() else {
            return;
        };
        let scope = self.row_scope(item.clone(), false);
        for cell in node.children() {
            if let Err(err) = self.compiler.compile(&cell, &scope) {
                warn!("{err}");
            }
            cell.remove_attribute(PENDING_CELL_ATTR);
        }
    }

    /// Toggle an item's detail row. Returns whether it is now shown.
    pub fn expand_row(&mut self, item: &RowItem<T>) -> bool {
        let Some(position) = item.identity() else {
            return false;
        };
        let Some(widget) = self.widget.as_deref_mut() else {
            return false;
        };

        if widget.child_shown(position) {
            widget.hide_child(position);
            self.rows.set_expanded(position, false);
            return false;
        }
        if position >= widget.row_count() {
            debug!("expand_row on table {} past its rows at {}", self.id, position);
            return false;
        }

        let Some(markup) = &self.child_markup else {
            warn!("expand_row on table {} without a child template", self.id);
            return false;
        };
        let content = Node::new("div");
        content.set_attribute(ROW_INDEX_ATTR, position.to_string());
        content.set_attribute(BINDING_ATTR, self.expression.as_str());
        content.set_attribute(CHILD_ATTR, "true");
        content.set_markup(markup.as_str());

        let scope = RowScope {
            parent: self.scope.clone(),
            bindings: Arc::clone(&self.bindings),
            item: item.clone(),
            child: true,
        };
        if let Err(err) = self.compiler.compile(&content, &scope) {
            warn!("{err}");
        }
        widget.show_child(position, content);
        let shown = widget.child_shown(position);
        self.rows.set_expanded(position, shown);
        shown
    }

    fn row_scope(&self, item: RowItem<T>, child: bool) -> RowScope<T, S> {
        RowScope {
            parent: self.scope.clone(),
            bindings: Arc::clone(&self.bindings),
            item,
            child,
        }
    }

    // -------------------------------------------------------------------------
    // Search and filters
    // -------------------------------------------------------------------------

    /// Global search across all columns.
    pub fn search(&mut self, text: &str) {
        if let Some(widget) = self.widget.as_deref_mut() {
            widget.set_search(text);
        }
        self.draw();
    }

    /// Current filter value of a column.
    pub fn filter_value(&self, column: usize) -> Result<Option<FilterValue>, FilterError> {
        self.filters.value(column)
    }

    /// Set a column's filter value. Applied on the next digest.
    pub fn set_filter_value(&mut self, column: usize, value: FilterValue) -> Result<(), FilterError> {
        self.filters.set_value(column, value)
    }

    /// Set one bound of a date range filter. Applied on the next digest.
    pub fn set_filter_bound(
        &mut self,
        column: usize,
        bound: RangeBound,
        date: Option<chrono::NaiveDate>,
    ) -> Result<(), FilterError> {
        self.filters.set_range_bound(column, bound, date)
    }

    /// Text filter suggestions for `query`.
    pub fn suggestions(&self, column: usize, query: &str) -> Vec<String> {
        self.filters.suggestions(column, query)
    }

    // -------------------------------------------------------------------------
    // Column visibility
    // -------------------------------------------------------------------------

    /// Show or hide a column and handle the resulting visibility event.
    pub fn set_column_visible(&mut self, column: usize, visible: bool) {
        {
            let (widget, mut hooks) = self.hooks();
            match widget {
                Some(widget) => widget.set_column_visible(column, visible, &mut hooks),
                None => return,
            }
        }
        self.column_visibility_changed(column, visible);
    }

    /// Visibility event from the widget.
    ///
    /// Cells of a hidden column are not rendered at all, so when it becomes
    /// visible its new cells in already compiled rows are compiled here.
    /// Returns the number of cells compiled.
    pub fn column_visibility_changed(&mut self, column: usize, visible: bool) -> usize {
        if !self.lifecycle.is_active(Subscription::ColumnVisibility) {
            return 0;
        }
        let Some(widget) = self.widget.as_deref() else {
            return 0;
        };

        if let Some(header) = &self.header {
            header.relayout(|c| widget.column_visible(c));
        }
        if !visible {
            return 0;
        }

        let source = self.source.as_ref().map(Collection::snapshot).unwrap_or_default();
        let mut compiled = 0;
        for position in self.rows.compiled_positions() {
            let (Some(node), Some(item)) = (widget.row_node(position), source.get(position)) else {
                continue;
            };
            let scope = self.row_scope(item.clone(), false);
            for cell in node.pending_cells() {
                match self.compiler.compile(&cell, &scope) {
                    Ok(()) => {
                        cell.remove_attribute(PENDING_CELL_ATTR);
                        compiled += 1;
                    }
                    Err(err) => warn!("{err}"),
                }
            }
        }
        debug!("Compiled {} cells after column {} became visible", compiled, column);
        compiled
    }

    // -------------------------------------------------------------------------
    // Teardown
    // -------------------------------------------------------------------------

    /// Release every subscription and destroy the widget.
    ///
    /// Rows still queued are compiled first.
    pub fn teardown(&mut self) {
        if self.lifecycle.is_disposed() {
            return;
        }
        self.flush_compiles(true);
        self.lifecycle.dispose();
        if let Some(mut widget) = self.widget.take() {
            widget.destroy();
        }
        self.lifecycle.hooks.call_on_teardown(&self.id);
        info!("Table {} torn down", self.id);
    }
}
