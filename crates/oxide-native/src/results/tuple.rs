//! Tuple results.

use super::typed::FromResultValue;
use super::value::ResultValue;
use crate::error::{QueryError, Result};

/// One tuple element and the alias it was selected under.
#[derive(Debug, Clone, PartialEq)]
pub struct TupleElement {
    pub alias: Option<String>,
    pub value: ResultValue,
}

/// A row whose results are addressed by position or alias.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tuple {
    elements: Vec<TupleElement>,
}

impl Tuple {
    #[must_use]
    pub const fn new(elements: Vec<TupleElement>) -> Self {
        Self { elements }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&ResultValue> {
        self.elements.get(index).map(|e| &e.value)
    }

    /// Finds an element by alias, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::UnknownTupleAlias`] when no element carries
    /// `alias`.
    pub fn get_by_alias(&self, alias: &str) -> Result<&ResultValue> {
        self.elements
            .iter()
            .find(|e| e.alias.as_deref().is_some_and(|a| a.eq_ignore_ascii_case(alias)))
            .map(|e| &e.value)
            .ok_or_else(|| QueryError::UnknownTupleAlias(alias.to_string()))
    }

    /// Converts the element under `alias`.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::UnknownTupleAlias`] or a conversion error.
    pub fn get_as<T: FromResultValue>(&self, alias: &str) -> Result<T> {
        T::from_result_value(self.get_by_alias(alias)?.clone())
    }

    #[must_use]
    pub fn values(&self) -> impl Iterator<Item = &ResultValue> {
        self.elements.iter().map(|e| &e.value)
    }

    #[must_use]
    pub fn elements(&self) -> &[TupleElement] {
        &self.elements
    }
}

#[cfg(test)]
mod tests {
    use oxide_dialect::SqlValue;

    use super::*;

    fn tuple() -> Tuple {
        Tuple::new(vec![
            TupleElement {
                alias: Some("name".to_string()),
                value: ResultValue::Scalar(SqlValue::Text("Ada".to_string())),
            },
            TupleElement {
                alias: None,
                value: ResultValue::Scalar(SqlValue::Int(36)),
            },
        ])
    }

    #[test]
    fn test_access_by_position_and_alias() {
        let t = tuple();
        assert_eq!(t.len(), 2);
        assert_eq!(t.get(1), Some(&ResultValue::Scalar(SqlValue::Int(36))));
        assert_eq!(t.get(2), None);
        assert_eq!(t.get_as::<String>("NAME").unwrap(), "Ada");
    }

    #[test]
    fn test_unknown_alias() {
        assert!(matches!(
            tuple().get_by_alias("age"),
            Err(QueryError::UnknownTupleAlias(alias)) if alias == "age"
        ));
    }
}
