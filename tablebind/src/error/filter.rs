//! Column filter error types

use crate::filter::FilterKind;

/// Errors from reading or writing column filter values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilterError {
    /// Column index is past the configured columns.
    #[error("Column {0} does not exist")]
    UnknownColumn(usize),

    /// The value does not match the column's filter type.
    #[error("Column {column} uses a {expected} filter")]
    TypeMismatch { column: usize, expected: FilterKind },
}
