//! Configuration error types

/// Errors detected while setting up a bound table.
///
/// These are fatal: a controller is never constructed from a configuration
/// that produced one.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// The binding expression is not of the form `item in collection`.
    #[error("Expected expression in form of \"_item_ in _collection_[ track by _id_]\" but got \"{expression}\"")]
    MalformedBinding { expression: String },

    /// A column or child template references an id the template source does not know.
    #[error("Unknown template: {id}")]
    UnknownTemplate { id: String },

    /// The settings document could not be parsed.
    #[error("Invalid table settings: {0}")]
    Settings(String),
}

impl ConfigError {
    /// Creates a malformed binding error for the given expression.
    pub fn malformed(expression: impl Into<String>) -> Self {
        Self::MalformedBinding {
            expression: expression.into(),
        }
    }

    /// Creates an unknown template error.
    pub fn unknown_template(id: impl Into<String>) -> Self {
        Self::UnknownTemplate { id: id.into() }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        Self::Settings(err.to_string())
    }
}
