//! Table configuration.
//!
//! [`TableOptions`] is what the controller is built from. The static part of
//! it can also be loaded from JSON as [`TableSettings`].

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::filter::FilterKind;
use crate::scheduler::DEFAULT_COMPILE_DELAY;

// =============================================================================
// Cell values
// =============================================================================

/// Raw value of one cell, as produced by a column's data accessor.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Number(n) => write!(f, "{n}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            CellValue::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

impl From<NaiveDate> for CellValue {
    fn from(d: NaiveDate) -> Self {
        CellValue::Date(d)
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(dt: NaiveDateTime) -> Self {
        CellValue::DateTime(dt)
    }
}

impl<V: Into<CellValue>> From<Option<V>> for CellValue {
    fn from(v: Option<V>) -> Self {
        v.map(Into::into).unwrap_or_default()
    }
}

/// Purpose a cell is being rendered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderKind {
    /// Markup placed in the cell.
    Display,
    /// Text matched by searches and collected for filter suggestions.
    Filter,
    /// Key used for ordering.
    Sort,
}

// =============================================================================
// Columns
// =============================================================================

type DataFn<T> = Arc<dyn Fn(&T) -> CellValue + Send + Sync>;
type RenderFn<T> = Arc<dyn Fn(&CellValue, RenderKind, &T) -> String + Send + Sync>;
type StyleFn = Arc<dyn Fn(&CellValue) -> String + Send + Sync>;

/// Inline style applied to every cell of a column when it is created.
#[derive(Clone, Default)]
pub enum CellStyle {
    #[default]
    None,
    /// Literal CSS text.
    Static(String),
    /// CSS computed from the cell's value.
    Computed(StyleFn),
}

impl CellStyle {
    pub fn computed(f: impl Fn(&CellValue) -> String + Send + Sync + 'static) -> Self {
        CellStyle::Computed(Arc::new(f))
    }

    /// CSS for a cell holding `value`, if any.
    pub fn css(&self, value: &CellValue) -> Option<String> {
        match self {
            CellStyle::None => None,
            CellStyle::Static(css) => Some(css.clone()),
            CellStyle::Computed(f) => Some(f(value)),
        }
    }
}

impl fmt::Debug for CellStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellStyle::None => f.write_str("None"),
            CellStyle::Static(css) => f.debug_tuple("Static").field(css).finish(),
            CellStyle::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

/// A table column definition.
pub struct ColumnDef<T> {
    /// Header text.
    pub title: String,
    /// Extracts the cell value from a row item.
    pub data: DataFn<T>,
    /// Optional custom rendering of the value.
    pub render: Option<RenderFn<T>>,
    /// Id of a template rendered into the cell and compiled later.
    pub template: Option<String>,
    pub style: CellStyle,
    pub filter: FilterKind,
    /// Initial visibility.
    pub visible: bool,
}

impl<T> Clone for ColumnDef<T> {
    fn clone(&self) -> Self {
        Self {
            title: self.title.clone(),
            data: Arc::clone(&self.data),
            render: self.render.clone(),
            template: self.template.clone(),
            style: self.style.clone(),
            filter: self.filter,
            visible: self.visible,
        }
    }
}

impl<T> fmt::Debug for ColumnDef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnDef")
            .field("title", &self.title)
            .field("template", &self.template)
            .field("style", &self.style)
            .field("filter", &self.filter)
            .field("visible", &self.visible)
            .finish_non_exhaustive()
    }
}

impl<T> ColumnDef<T> {
    /// Create a column with a title and a data accessor.
    pub fn new(
        title: impl Into<String>,
        data: impl Fn(&T) -> CellValue + Send + Sync + 'static,
    ) -> Self {
        Self {
            title: title.into(),
            data: Arc::new(data),
            render: None,
            template: None,
            style: CellStyle::None,
            filter: FilterKind::None,
            visible: true,
        }
    }

    /// Render the cell through a custom function.
    pub fn render(
        mut self,
        f: impl Fn(&CellValue, RenderKind, &T) -> String + Send + Sync + 'static,
    ) -> Self {
        self.render = Some(Arc::new(f));
        self
    }

    /// Render the cell from a template, compiled after the row is created.
    pub fn template(mut self, id: impl Into<String>) -> Self {
        self.template = Some(id.into());
        self
    }

    pub fn style(mut self, css: impl Into<String>) -> Self {
        self.style = CellStyle::Static(css.into());
        self
    }

    pub fn style_with(mut self, f: impl Fn(&CellValue) -> String + Send + Sync + 'static) -> Self {
        self.style = CellStyle::computed(f);
        self
    }

    pub fn filter(mut self, kind: FilterKind) -> Self {
        self.filter = kind;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Value of this column for `item`.
    pub fn value(&self, item: &T) -> CellValue {
        (self.data)(item)
    }

    /// Render `value` without template substitution.
    pub fn render_value(&self, value: &CellValue, kind: RenderKind, item: &T) -> String {
        match &self.render {
            Some(render) => render(value, kind, item),
            None => value.to_string(),
        }
    }
}

// =============================================================================
// Options
// =============================================================================

/// Attribute copied onto every created row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowAttribute {
    pub key: String,
    pub value: String,
}

impl RowAttribute {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Options a bound table is built from.
///
/// # Example
///
/// ```
/// use tablebind::{CellValue, ColumnDef, FilterKind, TableOptions};
///
/// struct Request { name: String }
///
/// let options = TableOptions::new(vec![
///     ColumnDef::new("Name", |r: &Request| CellValue::from(r.name.as_str()))
///         .filter(FilterKind::Text),
/// ])
/// .with_column_filters(true)
/// .with_child_template("request-detail.html");
/// ```
pub struct TableOptions<T> {
    pub columns: Vec<ColumnDef<T>>,
    /// Template id rendered into expanded child rows.
    pub child_template: Option<String>,
    pub row_binding: Vec<RowAttribute>,
    /// Enables the per-column filter subsystem.
    pub column_filters: bool,
    /// Delay between the first queued row and the compile flush.
    ///
    /// Default: 2 ms
    pub compile_delay: Duration,
    /// Options passed through to the widget untouched.
    pub widget: serde_json::Map<String, serde_json::Value>,
}

impl<T> Clone for TableOptions<T> {
    fn clone(&self) -> Self {
        Self {
            columns: self.columns.clone(),
            child_template: self.child_template.clone(),
            row_binding: self.row_binding.clone(),
            column_filters: self.column_filters,
            compile_delay: self.compile_delay,
            widget: self.widget.clone(),
        }
    }
}

impl<T> fmt::Debug for TableOptions<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableOptions")
            .field("columns", &self.columns)
            .field("child_template", &self.child_template)
            .field("row_binding", &self.row_binding)
            .field("column_filters", &self.column_filters)
            .field("compile_delay", &self.compile_delay)
            .field("widget", &self.widget)
            .finish()
    }
}

impl<T> TableOptions<T> {
    pub fn new(columns: Vec<ColumnDef<T>>) -> Self {
        Self {
            columns,
            child_template: None,
            row_binding: Vec::new(),
            column_filters: false,
            compile_delay: DEFAULT_COMPILE_DELAY,
            widget: serde_json::Map::new(),
        }
    }

    pub fn with_child_template(mut self, id: impl Into<String>) -> Self {
        self.child_template = Some(id.into());
        self
    }

    pub fn with_row_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.row_binding.push(RowAttribute::new(key, value));
        self
    }

    pub fn with_column_filters(mut self, enabled: bool) -> Self {
        self.column_filters = enabled;
        self
    }

    pub fn with_compile_delay(mut self, delay: Duration) -> Self {
        self.compile_delay = delay;
        self
    }

    /// Set a pass-through widget option.
    pub fn with_widget_option(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.widget.insert(key.into(), value);
        self
    }

    /// Overlay settings loaded from a document.
    ///
    /// Per-column filter types are applied by index; extra entries are ignored.
    pub fn apply_settings(mut self, settings: TableSettings) -> Self {
        if settings.child_template.is_some() {
            self.child_template = settings.child_template;
        }
        self.row_binding.extend(settings.row_binding);
        self.column_filters |= settings.column_filters;
        if let Some(ms) = settings.compile_delay_ms {
            self.compile_delay = Duration::from_millis(ms);
        }
        for (column, kind) in self.columns.iter_mut().zip(settings.column_filter_kinds) {
            if let Some(kind) = kind {
                column.filter = kind;
            }
        }
        self.widget.extend(settings.widget);
        self
    }
}

/// Serializable part of [`TableOptions`].
///
/// ```
/// use tablebind::TableSettings;
///
/// let settings = TableSettings::from_json(r#"{
///     "childTemplate": "detail.html",
///     "rowBinding": [{ "key": "class", "value": "clickable" }],
///     "columnFilters": true,
///     "columnFilterKinds": [null, "dateRange"]
/// }"#).unwrap();
/// assert!(settings.column_filters);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TableSettings {
    pub child_template: Option<String>,
    pub row_binding: Vec<RowAttribute>,
    pub column_filters: bool,
    pub compile_delay_ms: Option<u64>,
    /// Filter type per column index.
    pub column_filter_kinds: Vec<Option<FilterKind>>,
    /// Pass-through widget options.
    pub widget: serde_json::Map<String, serde_json::Value>,
}

impl TableSettings {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_value_display() {
        assert_eq!(CellValue::Empty.to_string(), "");
        assert_eq!(CellValue::from("a").to_string(), "a");
        let date = NaiveDate::from_ymd_opt(2020, 6, 15).unwrap();
        assert_eq!(CellValue::from(date).to_string(), "2020-06-15");
        assert_eq!(CellValue::from(None::<&str>), CellValue::Empty);
    }

    #[test]
    fn test_cell_style_css() {
        let value = CellValue::Number(3.0);
        assert_eq!(CellStyle::None.css(&value), None);
        assert_eq!(
            CellStyle::Static("color: red".into()).css(&value),
            Some("color: red".into())
        );
        let computed = CellStyle::computed(|v| format!("width: {v}px"));
        assert_eq!(computed.css(&value), Some("width: 3px".into()));
    }

    #[test]
    fn test_render_value_falls_back_to_display() {
        let column = ColumnDef::new("n", |n: &u32| CellValue::Number(f64::from(*n)));
        assert_eq!(column.render_value(&column.value(&4), RenderKind::Display, &4), "4");

        let column = column.render(|v, kind, _| match kind {
            RenderKind::Display => format!("<b>{v}</b>"),
            _ => v.to_string(),
        });
        assert_eq!(column.render_value(&CellValue::Number(4.0), RenderKind::Display, &4), "<b>4</b>");
        assert_eq!(column.render_value(&CellValue::Number(4.0), RenderKind::Filter, &4), "4");
    }

    #[test]
    fn test_settings_overlay() {
        let settings = TableSettings::from_json(
            r#"{ "childTemplate": "d.html", "compileDelayMs": 5, "columnFilters": true,
                 "columnFilterKinds": [null, "date"], "widget": { "paging": false } }"#,
        )
        .unwrap();
        let options = TableOptions::new(vec![
            ColumnDef::new("a", |_: &()| CellValue::Empty),
            ColumnDef::new("b", |_: &()| CellValue::Empty),
        ])
        .apply_settings(settings);

        assert_eq!(options.child_template.as_deref(), Some("d.html"));
        assert_eq!(options.compile_delay, Duration::from_millis(5));
        assert!(options.column_filters);
        assert_eq!(options.columns[0].filter, FilterKind::None);
        assert_eq!(options.columns[1].filter, FilterKind::Date);
        assert_eq!(options.widget["paging"], serde_json::Value::Bool(false));
    }

    #[test]
    fn test_settings_reject_unknown_filter_kind() {
        let err = TableSettings::from_json(r#"{ "columnFilterKinds": ["fuzzy"] }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Settings(_)));
    }
}
