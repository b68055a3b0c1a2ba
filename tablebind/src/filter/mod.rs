//! Per-column filters.
//!
//! Each column is configured once with a [`FilterKind`]. Text filters go
//! through the widget's native column search and offer suggestions drawn from
//! the rows currently matching the search. Date and date range filters are
//! evaluated by the table-wide custom search predicates in this module.
//!
//! [`FilterState`] knows nothing about the widget; the controller feeds it
//! search results and applies the changes it reports.

mod header;
mod predicate;

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

use chrono::NaiveDate;
use log::trace;
use nucleo_matcher::pattern::{Atom, AtomKind, CaseMatching, Normalization};
use nucleo_matcher::{Config, Matcher, Utf32Str};
use serde::{Deserialize, Serialize};

use crate::config::CellValue;
use crate::error::FilterError;

pub use header::FilterHeader;
pub use predicate::{cell_date, date_matches, parse_date, range_matches};

/// Most suggestions returned for one query.
pub const MAX_SUGGESTIONS: usize = 100;

/// Filter type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterKind {
    #[default]
    None,
    Text,
    Date,
    DateRange,
}

impl FilterKind {
    /// Date kinds are matched by custom predicates instead of text search.
    pub fn is_date(self) -> bool {
        matches!(self, FilterKind::Date | FilterKind::DateRange)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FilterKind::None => "none",
            FilterKind::Text => "text",
            FilterKind::Date => "date",
            FilterKind::DateRange => "dateRange",
        }
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bounds of a date range filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DateRange {
    pub min: Option<NaiveDate>,
    pub max: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(min: Option<NaiveDate>, max: Option<NaiveDate>) -> Self {
        Self { min, max }
    }

    /// Both bounds are set.
    pub fn is_active(&self) -> bool {
        self.min.is_some() && self.max.is_some()
    }
}

/// Value held by a column filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    Text(String),
    Date(Option<NaiveDate>),
    DateRange(DateRange),
}

/// Which end of a date range to set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeBound {
    Min,
    Max,
}

/// A filter change the widget has to apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterChange {
    /// Run the widget's column search with this text.
    Search { column: usize, text: String },
    /// Clear the widget's column search; matching is up to the predicates.
    Predicate { column: usize },
}

/// Filter configuration and values for every column of a table.
#[derive(Debug, Clone, Default)]
pub struct FilterState {
    kinds: Vec<FilterKind>,
    search_text: HashMap<usize, String>,
    values: HashMap<usize, FilterValue>,
    options: HashMap<usize, Vec<String>>,
    changed: BTreeSet<usize>,
}

impl FilterState {
    /// Create state for columns of the given kinds.
    pub fn new(kinds: Vec<FilterKind>) -> Self {
        let mut values = HashMap::new();
        let mut options = HashMap::new();
        for (column, kind) in kinds.iter().enumerate() {
            match kind {
                FilterKind::Text => {
                    options.insert(column, Vec::new());
                }
                FilterKind::Date => {
                    values.insert(column, FilterValue::Date(None));
                }
                FilterKind::DateRange => {
                    values.insert(column, FilterValue::DateRange(DateRange::default()));
                }
                FilterKind::None => {}
            }
        }
        Self {
            kinds,
            search_text: HashMap::new(),
            values,
            options,
            changed: BTreeSet::new(),
        }
    }

    pub fn kind(&self, column: usize) -> Result<FilterKind, FilterError> {
        self.kinds
            .get(column)
            .copied()
            .ok_or(FilterError::UnknownColumn(column))
    }

    /// Columns configured with a filter, with their kind.
    pub fn configured(&self) -> impl Iterator<Item = (usize, FilterKind)> + '_ {
        self.kinds
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, kind)| *kind != FilterKind::None)
    }

    /// Current value of a column's filter.
    ///
    /// Date kinds read the typed value; every other column reads its free
    /// search text.
    pub fn value(&self, column: usize) -> Result<Option<FilterValue>, FilterError> {
        if self.kind(column)?.is_date() {
            Ok(self.values.get(&column).cloned())
        } else {
            Ok(self
                .search_text
                .get(&column)
                .map(|text| FilterValue::Text(text.clone())))
        }
    }

    /// Set a column's filter value.
    ///
    /// The value must match the column's kind: `Date` and `DateRange` for
    /// the date kinds, `Text` for everything else.
    pub fn set_value(&mut self, column: usize, value: FilterValue) -> Result<(), FilterError> {
        let kind = self.kind(column)?;
        let mismatch = FilterError::TypeMismatch {
            column,
            expected: kind,
        };
        match (kind, value) {
            (FilterKind::Date, value @ FilterValue::Date(_))
            | (FilterKind::DateRange, value @ FilterValue::DateRange(_)) => {
                if self.values.get(&column) != Some(&value) {
                    self.values.insert(column, value);
                    self.changed.insert(column);
                }
                Ok(())
            }
            (FilterKind::Date | FilterKind::DateRange, _) => Err(mismatch),
            (_, FilterValue::Text(text)) => {
                if self.search_text.get(&column) != Some(&text) {
                    self.search_text.insert(column, text);
                    self.changed.insert(column);
                }
                Ok(())
            }
            (_, _) => Err(mismatch),
        }
    }

    /// Set one bound of a date range filter.
    pub fn set_range_bound(
        &mut self,
        column: usize,
        bound: RangeBound,
        date: Option<NaiveDate>,
    ) -> Result<(), FilterError> {
        let mut range = match self.value(column)? {
            Some(FilterValue::DateRange(range)) => range,
            _ => {
                return Err(FilterError::TypeMismatch {
                    column,
                    expected: self.kind(column)?,
                });
            }
        };
        match bound {
            RangeBound::Min => range.min = date,
            RangeBound::Max => range.max = date,
        }
        self.set_value(column, FilterValue::DateRange(range))
    }

    /// Free search text of a column.
    pub fn search_text(&self, column: usize) -> Option<&str> {
        self.search_text.get(&column).map(String::as_str)
    }

    /// Drain the columns changed since the last call.
    pub fn take_changes(&mut self) -> Vec<FilterChange> {
        let changed = std::mem::take(&mut self.changed);
        changed
            .into_iter()
            .map(|column| match self.kinds.get(column) {
                Some(kind) if kind.is_date() => FilterChange::Predicate { column },
                _ => FilterChange::Search {
                    column,
                    text: self.search_text.get(&column).cloned().unwrap_or_default(),
                },
            })
            .collect()
    }

    pub fn has_changes(&self) -> bool {
        !self.changed.is_empty()
    }

    // -------------------------------------------------------------------------
    // Predicates
    // -------------------------------------------------------------------------

    /// Every active single-date filter matches its cell.
    pub fn passes_date_filters(&self, row: &[CellValue]) -> bool {
        self.configured()
            .filter(|(_, kind)| *kind == FilterKind::Date)
            .all(|(column, _)| {
                let wanted = match self.values.get(&column) {
                    Some(FilterValue::Date(date)) => *date,
                    _ => None,
                };
                let cell = row.get(column).unwrap_or(&CellValue::Empty);
                date_matches(cell, wanted)
            })
    }

    /// Every active date range filter contains its cell.
    pub fn passes_range_filters(&self, row: &[CellValue]) -> bool {
        self.configured()
            .filter(|(_, kind)| *kind == FilterKind::DateRange)
            .all(|(column, _)| {
                let range = match self.values.get(&column) {
                    Some(FilterValue::DateRange(range)) => *range,
                    _ => DateRange::default(),
                };
                let cell = row.get(column).unwrap_or(&CellValue::Empty);
                range_matches(cell, &range)
            })
    }

    /// Custom search pass for one row.
    pub fn passes(&self, row: &[CellValue]) -> bool {
        self.passes_date_filters(row) && self.passes_range_filters(row)
    }

    // -------------------------------------------------------------------------
    // Suggestions
    // -------------------------------------------------------------------------

    /// Text filter columns.
    pub fn text_columns(&self) -> Vec<usize> {
        self.configured()
            .filter(|(_, kind)| *kind == FilterKind::Text)
            .map(|(column, _)| column)
            .collect()
    }

    /// Replace a text column's suggestions with the distinct non-empty values.
    pub fn set_options(&mut self, column: usize, values: impl IntoIterator<Item = String>) {
        let mut seen = HashSet::new();
        let options: Vec<String> = values
            .into_iter()
            .filter(|v| !v.is_empty() && seen.insert(v.clone()))
            .collect();
        trace!("Column {} has {} filter options", column, options.len());
        self.options.insert(column, options);
    }

    /// Suggestions of a text column.
    pub fn options(&self, column: usize) -> &[String] {
        self.options.get(&column).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Suggestions containing `query`, ignoring case, in option order.
    pub fn suggestions(&self, column: usize, query: &str) -> Vec<String> {
        let options = self.options(column);
        if query.is_empty() {
            return options.iter().take(MAX_SUGGESTIONS).cloned().collect();
        }

        let mut matcher = Matcher::new(Config::DEFAULT);
        // one atom, so whitespace stays part of the needle
        let atom = Atom::new(
            query,
            CaseMatching::Ignore,
            Normalization::Never,
            AtomKind::Substring,
            true,
        );
        let mut buf = Vec::new();
        options
            .iter()
            .filter(|option| {
                let haystack = Utf32Str::new(option, &mut buf);
                atom.score(haystack, &mut matcher).is_some()
            })
            .take(MAX_SUGGESTIONS)
            .cloned()
            .collect()
    }
}
