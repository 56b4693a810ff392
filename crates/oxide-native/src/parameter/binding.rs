//! Values bound to query parameters.

use std::collections::{BTreeSet, HashMap};

use oxide_dialect::{SqlValue, ToSqlValue};

use super::expand::{determine_bind_value_max_count, ExpansionOptions};
use super::{ParameterKey, ParameterOccurrence};
use crate::error::{QueryError, Result};

/// A single value or a list bound to one parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum BindValue {
    Single(SqlValue),
    Multi(Vec<SqlValue>),
}

impl BindValue {
    #[must_use]
    pub const fn is_multi_valued(&self) -> bool {
        matches!(self, Self::Multi(_))
    }

    /// Number of values bound.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::Multi(values) => values.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Bindings for the parameters a statement declares.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterBindings {
    declared: BTreeSet<ParameterKey>,
    values: HashMap<ParameterKey, BindValue>,
}

impl ParameterBindings {
    #[must_use]
    pub fn new(declared: BTreeSet<ParameterKey>) -> Self {
        Self {
            declared,
            values: HashMap::new(),
        }
    }

    /// Binds a single value.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::UnknownParameter`] when the statement does not
    /// declare `key`.
    pub fn bind(&mut self, key: impl Into<ParameterKey>, value: impl ToSqlValue) -> Result<()> {
        self.set(key.into(), BindValue::Single(value.to_sql_value()))
    }

    /// Binds a list of values; the placeholder expands to one slot per value.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::UnknownParameter`] when the statement does not
    /// declare `key`.
    pub fn bind_list<I, V>(&mut self, key: impl Into<ParameterKey>, values: I) -> Result<()>
    where
        I: IntoIterator<Item = V>,
        V: ToSqlValue,
    {
        let values = values.into_iter().map(ToSqlValue::to_sql_value).collect();
        self.set(key.into(), BindValue::Multi(values))
    }

    fn set(&mut self, key: ParameterKey, value: BindValue) -> Result<()> {
        if !self.declared.contains(&key) {
            return Err(QueryError::UnknownParameter(key.to_string()));
        }
        self.values.insert(key, value);
        Ok(())
    }

    #[must_use]
    pub fn get(&self, key: &ParameterKey) -> Option<&BindValue> {
        self.values.get(key)
    }

    /// Plans are only shared when no binding changes the SQL text.
    #[must_use]
    pub fn has_any_multi_valued(&self) -> bool {
        self.values.values().any(BindValue::is_multi_valued)
    }

    /// Checks that every declared parameter has a value.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::MissingBinding`] for the first unbound parameter.
    pub fn validate(&self) -> Result<()> {
        match self.declared.iter().find(|key| !self.values.contains_key(key)) {
            Some(key) => Err(QueryError::MissingBinding(key.to_string())),
            None => Ok(()),
        }
    }

    /// Values in placeholder order after list expansion.
    ///
    /// Padded slots repeat the last value of the list; empty lists contribute
    /// nothing since they render as a `null` literal.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::MissingBinding`] for an unbound occurrence and
    /// [`QueryError::ListNotExpandable`] when several values are bound to an
    /// occurrence that is not rewritten.
    pub fn flatten(
        &self,
        occurrences: &[ParameterOccurrence],
        options: ExpansionOptions,
    ) -> Result<Vec<SqlValue>> {
        let mut flat = Vec::with_capacity(occurrences.len());
        for occurrence in occurrences {
            match self.values.get(&occurrence.key) {
                None => return Err(QueryError::MissingBinding(occurrence.key.to_string())),
                Some(BindValue::Single(value)) => flat.push(value.clone()),
                // the statement keeps a single placeholder here
                Some(BindValue::Multi(values)) if occurrence.source_position.is_none() => {
                    match values.as_slice() {
                        [value] => flat.push(value.clone()),
                        _ => return Err(QueryError::ListNotExpandable(occurrence.key.to_string())),
                    }
                }
                Some(BindValue::Multi(values)) => {
                    let slots = determine_bind_value_max_count(
                        options.padding,
                        options.in_expression_limit,
                        values.len(),
                    );
                    flat.extend(values.iter().cloned());
                    if let Some(last) = values.last() {
                        let padding = slots.saturating_sub(values.len());
                        flat.extend(std::iter::repeat_n(last, padding).cloned());
                    }
                }
            }
        }
        Ok(flat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameter::recognize;

    fn bindings_for(sql: &str) -> (ParameterBindings, Vec<ParameterOccurrence>) {
        let p = recognize(sql).unwrap();
        (
            ParameterBindings::new(p.parameters().clone()),
            p.occurrences().to_vec(),
        )
    }

    #[test]
    fn test_unknown_parameter_is_rejected() {
        let (mut bindings, _) = bindings_for("select * from t where id = :id");
        assert!(bindings.bind("id", 1_i64).is_ok());
        assert!(matches!(
            bindings.bind("other", 1_i64),
            Err(QueryError::UnknownParameter(_))
        ));
        assert!(bindings.bind(1_u32, 1_i64).is_err());
    }

    #[test]
    fn test_missing_binding() {
        let (mut bindings, occurrences) = bindings_for("select * from t where a = ? and b = ?");
        bindings.bind(1_u32, "x").unwrap();
        assert!(matches!(
            bindings.validate(),
            Err(QueryError::MissingBinding(name)) if name == "?2"
        ));
        assert!(bindings.flatten(&occurrences, ExpansionOptions::default()).is_err());
    }

    #[test]
    fn test_flatten_repeats_last_value_for_padding() {
        let (mut bindings, occurrences) =
            bindings_for("select * from t where a = :a and b in (:ids)");
        bindings.bind("a", "x").unwrap();
        bindings.bind_list("ids", [1_i64, 2, 3]).unwrap();
        assert!(bindings.has_any_multi_valued());

        let flat = bindings
            .flatten(
                &occurrences,
                ExpansionOptions {
                    padding: true,
                    in_expression_limit: 0,
                },
            )
            .unwrap();
        assert_eq!(
            flat,
            vec![
                SqlValue::Text("x".to_string()),
                SqlValue::Int(1),
                SqlValue::Int(2),
                SqlValue::Int(3),
                SqlValue::Int(3),
            ]
        );
    }

    #[test]
    fn test_empty_list_binds_nothing() {
        let (mut bindings, occurrences) = bindings_for("select * from t where b in (:ids)");
        bindings.bind_list("ids", Vec::<i64>::new()).unwrap();
        let flat = bindings
            .flatten(&occurrences, ExpansionOptions::default())
            .unwrap();
        assert!(flat.is_empty());
    }
}
