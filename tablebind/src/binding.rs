//! Binding expressions.
//!
//! A table is bound with an expression of the form `item in collection`,
//! optionally followed by `track by ...` which is ignored. Nested tables also
//! carry the bindings of their parents as a `|` separated chain so templates
//! can refer to the enclosing rows.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::ConfigError;

static BINDING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*(\S.*?)\s+in\s+(\S+)").expect("binding pattern is valid")
});

/// A parsed `item in collection` expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    /// Name the current row is exposed under in templates.
    pub name: String,
    /// Path of the collection on the host scope.
    pub collection: String,
}

impl Binding {
    /// Parse a binding expression.
    pub fn parse(expression: &str) -> Result<Self, ConfigError> {
        let captures = BINDING_RE
            .captures(expression)
            .ok_or_else(|| ConfigError::malformed(expression))?;
        Ok(Self {
            name: captures[1].trim().to_string(),
            collection: captures[2].to_string(),
        })
    }
}

impl FromStr for Binding {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} in {}", self.name, self.collection)
    }
}

/// The table's own binding plus the bindings of enclosing tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingChain {
    pub own: Binding,
    /// Outermost first.
    pub parents: Vec<Binding>,
}

impl BindingChain {
    /// Parse the own expression and an optional `|` separated parent chain.
    ///
    /// Every link must be well formed.
    pub fn parse(expression: &str, parents: Option<&str>) -> Result<Self, ConfigError> {
        let own = Binding::parse(expression)?;
        let parents = match parents {
            Some(chain) if !chain.trim().is_empty() => chain
                .split('|')
                .filter(|link| !link.trim().is_empty())
                .map(Binding::parse)
                .collect::<Result<Vec<_>, _>>()?,
            _ => Vec::new(),
        };
        Ok(Self { own, parents })
    }

    /// Chain to hand to a table nested inside this one's rows.
    pub fn nested_chain(&self) -> String {
        self.parents
            .iter()
            .chain(std::iter::once(&self.own))
            .map(Binding::to_string)
            .collect::<Vec<_>>()
            .join("|")
    }
}
