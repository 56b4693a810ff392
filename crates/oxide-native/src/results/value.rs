//! Materialized row values.

use std::fmt;
use std::sync::Arc;

use oxide_dialect::SqlValue;

use super::tuple::Tuple;
use super::typed::FromResultValue;
use crate::error::{QueryError, Result};

/// One materialized result, or one component of it.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultValue {
    Null,
    /// A non-null column value.
    Scalar(SqlValue),
    /// An embeddable value.
    Composite(Composite),
    /// An entity, shared by every row that references the same identifier.
    Entity(Arc<EntityInstance>),
    /// Arguments collected for a constructor-style result.
    Instantiation {
        target: String,
        arguments: Vec<ResultValue>,
    },
    /// All results of a row when the mapping declares more than one.
    Row(Vec<ResultValue>),
    Tuple(Tuple),
}

impl ResultValue {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Wraps a column value, mapping SQL `NULL` to [`ResultValue::Null`].
    #[must_use]
    pub fn from_sql(value: SqlValue) -> Self {
        if value.is_null() {
            Self::Null
        } else {
            Self::Scalar(value)
        }
    }

    #[must_use]
    pub const fn as_entity(&self) -> Option<&Arc<EntityInstance>> {
        match self {
            Self::Entity(entity) => Some(entity),
            _ => None,
        }
    }

    /// Short description used in conversion errors.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Null => "null".to_string(),
            Self::Scalar(value) => value.kind().to_string(),
            Self::Composite(c) => format!("embeddable {}", c.name),
            Self::Entity(e) => format!("entity {}", e.entity),
            Self::Instantiation { target, .. } => format!("instantiation of {target}"),
            Self::Row(values) => format!("row of {}", values.len()),
            Self::Tuple(t) => format!("tuple of {}", t.len()),
        }
    }

    /// Converts into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Conversion`] when the value has another shape.
    pub fn get<T: FromResultValue>(self) -> Result<T> {
        T::from_result_value(self)
    }

    /// Stable text form of an identifier, used as an identity map key.
    pub(crate) fn identity_key(&self) -> String {
        format!("{self}")
    }
}

impl fmt::Display for ResultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Scalar(value) => f.write_str(&value.to_sql_inline()),
            Self::Composite(c) => {
                write!(f, "{}(", c.name)?;
                for (i, (name, value)) in c.values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{name}={value}")?;
                }
                f.write_str(")")
            }
            Self::Entity(e) => write!(f, "{}#{}", e.entity, e.id),
            Self::Instantiation { target, arguments } => {
                write!(f, "{target}(")?;
                write_list(f, arguments)?;
                f.write_str(")")
            }
            Self::Row(values) => {
                f.write_str("[")?;
                write_list(f, values)?;
                f.write_str("]")
            }
            Self::Tuple(t) => {
                f.write_str("(")?;
                write_list(f, t.values())?;
                f.write_str(")")
            }
        }
    }
}

fn write_list<'a>(
    f: &mut fmt::Formatter<'_>,
    values: impl IntoIterator<Item = &'a ResultValue>,
) -> fmt::Result {
    for (i, value) in values.into_iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{value}")?;
    }
    Ok(())
}

/// An embeddable value: named components in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct Composite {
    pub name: String,
    pub values: Vec<(String, ResultValue)>,
}

impl Composite {
    #[must_use]
    pub fn value(&self, name: &str) -> Option<&ResultValue> {
        self.values.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Converts one component.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::UnknownAttribute`] for a missing component and
    /// conversion errors from `T`.
    pub fn attribute<T: FromResultValue>(&self, name: &str) -> Result<T> {
        let value = self
            .value(name)
            .ok_or_else(|| QueryError::UnknownAttribute {
                entity: self.name.clone(),
                attribute: name.to_string(),
            })?;
        T::from_result_value(value.clone())
    }
}

/// An entity read from a result set.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityInstance {
    pub entity: String,
    pub id: ResultValue,
    /// Identifier attribute name; `None` for identifiers without one.
    pub id_attribute: Option<String>,
    pub attributes: Vec<(String, ResultValue)>,
}

impl EntityInstance {
    /// Looks up an attribute, the identifier attribute included.
    #[must_use]
    pub fn value(&self, name: &str) -> Option<&ResultValue> {
        if self.id_attribute.as_deref() == Some(name) {
            return Some(&self.id);
        }
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Converts one attribute.
    ///
    /// An attribute that was not read (a lazy collection) converts from
    /// null.
    ///
    /// # Errors
    ///
    /// Returns conversion errors from `T`.
    pub fn attribute<T: FromResultValue>(&self, name: &str) -> Result<T> {
        T::from_result_value(self.value(name).cloned().unwrap_or(ResultValue::Null))
    }
}

/// Unwraps an entity value for a derived conversion.
///
/// # Errors
///
/// Returns [`QueryError::Conversion`] unless `value` is an instance of
/// `entity`.
pub fn expect_entity(value: ResultValue, entity: &str) -> Result<Arc<EntityInstance>> {
    match value {
        ResultValue::Entity(instance) if instance.entity == entity => Ok(instance),
        other => Err(QueryError::Conversion {
            target: entity.to_string(),
            value: other.describe(),
        }),
    }
}

/// Unwraps an embeddable value for a derived conversion.
///
/// # Errors
///
/// Returns [`QueryError::Conversion`] unless `value` is a composite.
pub fn expect_composite(value: ResultValue, embeddable: &str) -> Result<Composite> {
    match value {
        ResultValue::Composite(composite) => Ok(composite),
        other => Err(QueryError::Conversion {
            target: embeddable.to_string(),
            value: other.describe(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book() -> EntityInstance {
        EntityInstance {
            entity: "Book".to_string(),
            id: ResultValue::Scalar(SqlValue::Int(7)),
            id_attribute: Some("id".to_string()),
            attributes: vec![(
                "title".to_string(),
                ResultValue::Scalar(SqlValue::Text("Dune".to_string())),
            )],
        }
    }

    #[test]
    fn test_entity_attribute_lookup() {
        let book = book();
        assert_eq!(book.attribute::<i64>("id").unwrap(), 7);
        assert_eq!(book.attribute::<String>("title").unwrap(), "Dune");
        assert_eq!(book.attribute::<Option<String>>("missing").unwrap(), None);
    }

    #[test]
    fn test_display() {
        let value = ResultValue::Row(vec![
            ResultValue::Entity(Arc::new(book())),
            ResultValue::Null,
            ResultValue::Scalar(SqlValue::Text("x".to_string())),
        ]);
        assert_eq!(value.to_string(), "[Book#7, null, 'x']");
    }

    #[test]
    fn test_expect_entity_checks_name() {
        let value = ResultValue::Entity(Arc::new(book()));
        assert!(expect_entity(value.clone(), "Book").is_ok());
        assert!(matches!(
            expect_entity(value, "Author"),
            Err(QueryError::Conversion { .. })
        ));
    }
}
