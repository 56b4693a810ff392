//! Query parameters: recognition, binding and list expansion.

mod binding;
mod expand;
mod recognizer;

use std::collections::BTreeSet;
use std::fmt;

pub use binding::{BindValue, ParameterBindings};
pub use expand::{determine_bind_value_max_count, expand_parameter_lists, ExpansionOptions};
pub use recognizer::recognize;

/// Identifies one query parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParameterKey {
    /// A `?` or `?N` parameter; plain `?` parameters are numbered from 1 in
    /// order of appearance.
    Positional(u32),
    /// A `:name` parameter.
    Named(String),
}

impl fmt::Display for ParameterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Positional(position) => write!(f, "?{position}"),
            Self::Named(name) => write!(f, ":{name}"),
        }
    }
}

impl From<u32> for ParameterKey {
    fn from(position: u32) -> Self {
        Self::Positional(position)
    }
}

impl From<&str> for ParameterKey {
    fn from(name: &str) -> Self {
        Self::Named(name.to_string())
    }
}

impl From<String> for ParameterKey {
    fn from(name: String) -> Self {
        Self::Named(name)
    }
}

/// One placeholder found in a statement.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParameterOccurrence {
    pub key: ParameterKey,
    /// Byte offset of the `?` in the adjusted SQL; `None` when the
    /// occurrence cannot be substituted in place.
    pub source_position: Option<usize>,
}

/// The result of recognizing parameters in a statement.
///
/// The adjusted SQL has every parameter rewritten to a bare `?`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterInterpretation {
    adjusted_sql: String,
    occurrences: Vec<ParameterOccurrence>,
    parameters: BTreeSet<ParameterKey>,
}

impl ParameterInterpretation {
    #[must_use]
    pub fn adjusted_sql(&self) -> &str {
        &self.adjusted_sql
    }

    /// Occurrences in order of first appearance.
    #[must_use]
    pub fn occurrences(&self) -> &[ParameterOccurrence] {
        &self.occurrences
    }

    /// Distinct parameters declared by the statement.
    #[must_use]
    pub const fn parameters(&self) -> &BTreeSet<ParameterKey> {
        &self.parameters
    }

    #[must_use]
    pub fn has_parameters(&self) -> bool {
        !self.parameters.is_empty()
    }
}
